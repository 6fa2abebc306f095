use anyhow::{anyhow, Context, Result};
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::download::export_artifact;
use crate::generation::GenerationClient;
use crate::main_ui_html::build_main_ui_html;
use crate::session::{
    run_generation, GenerationOutcome, Notice, Rejection, SessionId, SessionRegistry, Workbench,
};

pub struct AppState {
    pub sessions: SessionRegistry,
    pub client: Arc<dyn GenerationClient>,
    pub server_port: AtomicU16,
}

type ApiResponse = (StatusCode, Json<Value>);

impl AppState {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            client,
            server_port: AtomicU16::new(0),
        }
    }

    fn session(&self, id: SessionId) -> std::result::Result<Arc<Mutex<Workbench>>, ApiResponse> {
        match self.sessions.get(id) {
            Ok(Some(bench)) => Ok(bench),
            Ok(None) => {
                warn!(session = id, "unknown session");
                Err(err_json(StatusCode::NOT_FOUND, "session not found"))
            }
            Err(_) => Err(err_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "session registry lock error",
            )),
        }
    }
}

pub struct AppServer {
    port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl AppServer {
    pub fn start(state: Arc<AppState>, preferred_port: u16) -> Result<Self> {
        let listener = bind_listener(preferred_port)?;
        let port = listener
            .local_addr()
            .context("failed to inspect server local address")?
            .port();
        listener
            .set_nonblocking(true)
            .context("failed to set listener non-blocking")?;

        state.server_port.store(port, Ordering::Relaxed);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let thread_handle = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build();
            let runtime = match runtime {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!(error = %err, "failed to build server runtime");
                    return;
                }
            };

            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(err) => {
                        error!(error = %err, "failed to adopt listener");
                        return;
                    }
                };

                let app = build_router(state);
                let server = axum::serve(listener, app).with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                });
                if let Err(err) = server.await {
                    error!(error = %err, "server terminated");
                }
            });
        });

        info!(port, "site builder server listening");
        Ok(Self {
            port,
            shutdown_tx: Some(shutdown_tx),
            thread_handle: Some(thread_handle),
        })
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }
}

impl Drop for AppServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Deserialize)]
struct PromptReq {
    session_id: SessionId,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct DownloadReq {
    session_id: SessionId,
}

fn lock_error() -> ApiResponse {
    err_json(StatusCode::INTERNAL_SERVER_ERROR, "workbench lock error")
}

fn build_router(state: Arc<AppState>) -> Router {
    let port = state.server_port.load(Ordering::Relaxed);
    let local_origin = HeaderValue::from_str(&format!("http://127.0.0.1:{port}"))
        .expect("127.0.0.1 origin should be valid");
    let localhost_origin = HeaderValue::from_str(&format!("http://localhost:{port}"))
        .expect("localhost origin should be valid");

    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("null"),
            local_origin,
            localhost_origin,
        ])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(get_main_page))
        .route("/ping", get(get_ping))
        .route("/app/init", get(get_app_init))
        .route("/app/prompt", post(post_app_prompt))
        .route("/app/generate", post(post_app_generate))
        .route("/app/download", get(get_app_download))
        .layer(cors)
        .with_state(state)
}

async fn get_main_page() -> Html<String> {
    Html(build_main_ui_html())
}

async fn get_ping() -> ApiResponse {
    ok_json(json!({}))
}

async fn get_app_init(State(state): State<Arc<AppState>>) -> ApiResponse {
    let (session_id, bench) = match state.sessions.open() {
        Ok(opened) => opened,
        Err(_) => {
            return err_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "session registry lock error",
            )
        }
    };
    let snapshot = match bench.lock() {
        Ok(bench) => bench.snapshot(),
        Err(_) => return lock_error(),
    };

    let notices: serde_json::Map<String, Value> = Notice::ALL
        .iter()
        .map(|notice| (notice.key().to_string(), json!(notice)))
        .collect();

    ok_json(json!({
        "session_id": session_id,
        "snapshot": snapshot,
        "notices": notices,
    }))
}

async fn post_app_prompt(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PromptReq>,
) -> ApiResponse {
    let bench = match state.session(payload.session_id) {
        Ok(bench) => bench,
        Err(resp) => return resp,
    };
    let snapshot = {
        let mut bench = match bench.lock() {
            Ok(guard) => guard,
            Err(_) => return lock_error(),
        };
        bench.set_prompt(&payload.prompt);
        bench.snapshot()
    };

    ok_json(json!({ "snapshot": snapshot }))
}

async fn post_app_generate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PromptReq>,
) -> ApiResponse {
    let bench = match state.session(payload.session_id) {
        Ok(bench) => bench,
        Err(resp) => return resp,
    };
    match run_generation(&bench, state.client.as_ref(), &payload.prompt).await {
        Ok(outcome) => outcome_json(outcome),
        Err(err) => err_json(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

async fn get_app_download(
    State(state): State<Arc<AppState>>,
    Query(payload): Query<DownloadReq>,
) -> Response {
    let bench = match state.session(payload.session_id) {
        Ok(bench) => bench,
        Err(resp) => return resp.into_response(),
    };
    let file = match bench.lock() {
        Ok(bench) => export_artifact(bench.artifact()),
        Err(_) => return lock_error().into_response(),
    };

    match file {
        Some(file) => {
            info!(bytes = file.body.len(), "serving website download");
            file.into_response()
        }
        None => err_json(StatusCode::CONFLICT, "no generated website to download").into_response(),
    }
}

fn outcome_json(outcome: GenerationOutcome) -> ApiResponse {
    let status = match outcome.rejection {
        None => StatusCode::OK,
        Some(Rejection::InputRejected) => StatusCode::BAD_REQUEST,
        Some(Rejection::Busy) => StatusCode::CONFLICT,
        Some(Rejection::GenerationFailed) => StatusCode::BAD_GATEWAY,
    };

    let notice = outcome.notice();
    let error = match outcome.rejection {
        None => Value::Null,
        Some(_) => Value::String(notice.message().to_string()),
    };

    (
        status,
        Json(json!({
            "ok": outcome.succeeded(),
            "error": error,
            "notice": notice,
            "snapshot": outcome.snapshot,
        })),
    )
}

fn ok_json(payload: Value) -> ApiResponse {
    let mut body = serde_json::Map::new();
    body.insert("ok".to_string(), Value::Bool(true));

    if let Some(obj) = payload.as_object() {
        for (key, value) in obj {
            body.insert(key.clone(), value.clone());
        }
    } else if !payload.is_null() {
        body.insert("data".to_string(), payload);
    }

    (StatusCode::OK, Json(Value::Object(body)))
}

fn err_json(status: StatusCode, message: &str) -> ApiResponse {
    (
        status,
        Json(json!({
            "ok": false,
            "error": message,
        })),
    )
}

fn bind_listener(preferred_port: u16) -> Result<TcpListener> {
    for offset in 0..200u16 {
        let port = preferred_port.saturating_add(offset);
        if port == 0 {
            continue;
        }

        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            return Ok(listener);
        }
    }

    Err(anyhow!("failed to bind server port"))
}
