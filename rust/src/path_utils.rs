use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "site_builder.toml";

/// Directory that owns the config file: the executable's directory when a
/// config sits there, else the working directory when one sits there, else
/// the executable's directory.
pub fn get_base_dir() -> PathBuf {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if find_config_candidate(&exe_dir).is_some() {
        return exe_dir;
    }

    if let Ok(cwd) = env::current_dir() {
        if find_config_candidate(&cwd).is_some() {
            return cwd;
        }
    }

    exe_dir
}

pub fn resolve_config_path(raw: Option<String>, base_dir: &Path) -> PathBuf {
    if let Some(raw) = raw {
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            return path;
        }
        return env::current_dir()
            .map(|cwd| cwd.join(&path))
            .unwrap_or(path);
    }

    find_config_candidate(base_dir).unwrap_or_else(|| base_dir.join(CONFIG_FILE_NAME))
}

fn find_config_candidate(base_dir: &Path) -> Option<PathBuf> {
    [
        base_dir.join(CONFIG_FILE_NAME),
        base_dir.join("config").join(CONFIG_FILE_NAME),
    ]
    .into_iter()
    .find(|path| path.is_file())
}
