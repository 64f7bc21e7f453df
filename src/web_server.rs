use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    serve, Json, Router,
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::api::{ChatRequest, ChatResponse, ErrorResponse, CHAT_PATH};
use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::mode::Mode;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(templates_dir: impl Into<PathBuf>, dispatcher: Dispatcher) -> Self {
        Self {
            templates: Arc::new(create_minijinja_env(templates_dir.into())),
            dispatcher,
        }
    }
}

// Templates are re-read whenever the directory changes
fn create_minijinja_env(templates_dir: PathBuf) -> AutoReloader {
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, Response> {
    state
        .templates
        .acquire_env()
        .and_then(|env| {
            env.get_template("index.html").and_then(|tmpl| {
                let modes: Vec<&str> = Mode::ALL.iter().map(Mode::as_str).collect();
                let context = minijinja::context! {
                    title => "Chat",
                    modes => modes,
                    default_mode => Mode::default().as_str(),
                    chat_path => CHAT_PATH,
                };
                tmpl.render(context)
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
                .into_response()
        })
}

async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Rejected chat request: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let mode = Mode::parse_lenient(request.mode.as_deref());
    match state.dispatcher.dispatch(&request.message, mode).await {
        Ok(reply) => Json(ChatResponse {
            reply: reply.reply,
            sources: reply.sources,
        })
        .into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to get a response from the AI backend: {}", e),
        ),
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

/// Builds the application router. Split out so handlers can be tested
/// without binding a socket.
pub fn router(state: AppState, static_dir: impl Into<PathBuf>) -> Router {
    let static_dir: PathBuf = static_dir.into();
    let static_files_service =
        ServeDir::new(static_dir).not_found_service(tower::service_fn(|_| async {
            Ok::<_, std::convert::Infallible>(
                (StatusCode::NOT_FOUND, "Not Found").into_response(),
            )
        }));

    Router::new()
        .route("/", get(index_handler))
        .route(CHAT_PATH, post(chat_handler))
        .nest_service("/static", static_files_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(config: ServerConfig) -> Result<()> {
    let backend = config.build_backend()?;
    let state = AppState::new(config.templates_dir.clone(), Dispatcher::new(backend));
    let app = router(state, config.static_dir.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {:?}", e);
            }
            info!("Ctrl-C received, shutting down web server...");
        })
        .await
        .context("Web server failed")?;

    Ok(())
}
