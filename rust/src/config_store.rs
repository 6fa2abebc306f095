use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use toml::map::Map;
use toml::Value;
use tracing::info;

pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Settings for the outbound generation call, resolved from `[generation]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    pub model: String,
    pub api_base_url: String,
    pub api_key_env: String,
}

#[derive(Debug)]
pub struct ConfigStore {
    pub path: PathBuf,
    doc: Value,
}

impl ConfigStore {
    /// Loads the TOML document at `path`, creating it with defaults when it
    /// does not exist yet. The normalized document is written back.
    pub fn new(path: PathBuf) -> Result<Self> {
        let doc = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<Value>(&text)
                .with_context(|| format!("failed to parse TOML: {}", path.display()))?
        } else {
            info!(path = %path.display(), "config not found, writing defaults");
            Value::Table(Map::new())
        };

        let mut store = Self { path, doc };
        store.normalize_doc();
        store.save()?;
        Ok(store)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir: {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(&self.doc).context("failed to serialize TOML")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write config: {}", self.path.display()))
    }

    pub fn server_port(&self) -> u16 {
        self.table("app")
            .and_then(|t| t.get("server_port"))
            .and_then(Value::as_integer)
            .and_then(|v| u16::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    pub fn generation(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.generation_str("model", DEFAULT_MODEL),
            api_base_url: self
                .generation_str("api_base_url", DEFAULT_API_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key_env: self.generation_str("api_key_env", DEFAULT_API_KEY_ENV),
        }
    }

    fn generation_str(&self, key: &str, default: &str) -> String {
        self.table("generation")
            .and_then(|t| t.get(key))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    fn normalize_doc(&mut self) {
        if !self.doc.is_table() {
            self.doc = Value::Table(Map::new());
        }

        {
            let app = self.ensure_table_mut("app");
            let port = app
                .get("server_port")
                .and_then(Value::as_integer)
                .filter(|v| (1..=65_535).contains(v))
                .unwrap_or(i64::from(DEFAULT_SERVER_PORT));
            app.insert("server_port".to_string(), Value::Integer(port));
        }

        {
            let generation = self.ensure_table_mut("generation");
            for (key, default) in [
                ("model", DEFAULT_MODEL),
                ("api_base_url", DEFAULT_API_BASE_URL),
                ("api_key_env", DEFAULT_API_KEY_ENV),
            ] {
                let value = generation
                    .get(key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(default)
                    .to_string();
                generation.insert(key.to_string(), Value::String(value));
            }
        }
    }

    fn table(&self, name: &str) -> Option<&Map<String, Value>> {
        self.doc
            .as_table()
            .and_then(|root| root.get(name))
            .and_then(Value::as_table)
    }

    fn ensure_table_mut(&mut self, name: &str) -> &mut Map<String, Value> {
        if !self.doc.is_table() {
            self.doc = Value::Table(Map::new());
        }
        let root = self
            .doc
            .as_table_mut()
            .expect("root should be table after normalization");
        let table = root
            .entry(name.to_string())
            .or_insert_with(|| Value::Table(Map::new()));
        if !table.is_table() {
            *table = Value::Table(Map::new());
        }
        table
            .as_table_mut()
            .expect("table should exist after normalization")
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigStore, DEFAULT_API_KEY_ENV, DEFAULT_MODEL, DEFAULT_SERVER_PORT};
    use std::fs;
    use std::path::PathBuf;

    fn fixture_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "asb_config_store_test_{}_{}.toml",
            name,
            std::process::id()
        ));
        path
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let path = fixture_path("missing");
        fs::remove_file(&path).ok();

        let store = ConfigStore::new(path.clone()).expect("load store");
        assert_eq!(store.server_port(), DEFAULT_SERVER_PORT);
        let generation = store.generation();
        assert_eq!(generation.model, DEFAULT_MODEL);
        assert_eq!(generation.api_key_env, DEFAULT_API_KEY_ENV);

        let saved = fs::read_to_string(&path).expect("read saved");
        assert!(saved.contains("[app]"));
        assert!(saved.contains("[generation]"));
        assert!(saved.contains("server_port = 3000"));

        fs::remove_file(path).ok();
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let path = fixture_path("invalid");
        fs::write(
            &path,
            r#"
[app]
server_port = 70000

[generation]
model = "   "
api_base_url = "http://127.0.0.1:9/v1beta/"
"#,
        )
        .expect("fixture write");

        let store = ConfigStore::new(path.clone()).expect("load store");
        assert_eq!(store.server_port(), DEFAULT_SERVER_PORT);
        let generation = store.generation();
        assert_eq!(generation.model, DEFAULT_MODEL);
        assert_eq!(generation.api_base_url, "http://127.0.0.1:9/v1beta");

        fs::remove_file(path).ok();
    }

    #[test]
    fn keeps_custom_settings_across_reload() {
        let path = fixture_path("custom");
        fs::write(
            &path,
            r#"
[app]
server_port = 4100

[generation]
model = "gemini-2.0-flash"
api_key_env = "SITE_BUILDER_KEY"
"#,
        )
        .expect("fixture write");

        ConfigStore::new(path.clone()).expect("first load");
        let store = ConfigStore::new(path.clone()).expect("second load");
        assert_eq!(store.server_port(), 4100);
        assert_eq!(store.generation().model, "gemini-2.0-flash");
        assert_eq!(store.generation().api_key_env, "SITE_BUILDER_KEY");

        fs::remove_file(path).ok();
    }
}
