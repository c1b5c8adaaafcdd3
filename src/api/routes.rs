//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::connection::{ConnectError, ConnectOutcome, SharedConnectionController};
use crate::playground::{
    default_presets, Credential, PlaygroundAction, Preset, SessionConfig, SharedPlaygroundStore,
    ValidationError,
};

use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub controller: SharedConnectionController,
    pub store: SharedPlaygroundStore,
}

/// Build the control API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/connection", get(get_connection))
        .route("/api/connect", post(connect))
        .route("/api/disconnect", post(disconnect))
        .route("/api/reconnect", post(reconnect))
        .route("/api/config", get(get_config).put(update_config))
        .route("/api/instructions", put(update_instructions))
        .route("/api/credential", delete(revoke_credential))
        .route("/api/presets", get(list_presets))
        .route("/api/presets/:id/select", post(select_preset))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server. Returns after a shutdown signal or once `shutdown`
/// is cancelled; `shutdown` is cancelled on the way out either way.
pub async fn serve(state: Arc<AppState>, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Control API listening on {}", addr);

    let controller = Arc::clone(&state.controller);
    let app = router(state);
    let token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown_signal() => {},
                _ = token.cancelled() => {},
            }
        })
        .await?;

    shutdown.cancel();
    controller.disconnect();
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, closing the session...");
}

fn connect_error(e: ConnectError) -> (StatusCode, String) {
    let status = match e {
        ConnectError::MissingCredential => StatusCode::BAD_REQUEST,
        ConnectError::Context(_) | ConnectError::Token(_) => StatusCode::BAD_GATEWAY,
        ConnectError::Cancelled => StatusCode::CONFLICT,
    };
    (status, e.to_string())
}

fn validation_error(e: ValidationError) -> (StatusCode, String) {
    let status = match e {
        ValidationError::UnknownPreset(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, e.to_string())
}

fn connection_response(state: &AppState) -> ConnectionResponse {
    ConnectionResponse {
        phase: state.controller.phase(),
        details: state.controller.details(),
        needs_reconnect: state.controller.needs_reconnect(),
    }
}

fn connect_response(state: &AppState, outcome: &ConnectOutcome) -> ConnectResponse {
    ConnectResponse {
        outcome: ConnectResponse::outcome_name(outcome).to_string(),
        connection: connection_response(state),
    }
}

/// GET /api/health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/connection
async fn get_connection(State(state): State<Arc<AppState>>) -> Json<ConnectionResponse> {
    Json(connection_response(&state))
}

/// POST /api/connect
async fn connect(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConnectResponse>, (StatusCode, String)> {
    let outcome = state.controller.connect().await.map_err(connect_error)?;
    Ok(Json(connect_response(&state, &outcome)))
}

/// POST /api/disconnect
async fn disconnect(State(state): State<Arc<AppState>>) -> Json<ConnectionResponse> {
    state.controller.disconnect();
    Json(connection_response(&state))
}

/// POST /api/reconnect
/// Drop the current session and open a new one with the current configuration.
async fn reconnect(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConnectResponse>, (StatusCode, String)> {
    let outcome = state.controller.reconnect().await.map_err(connect_error)?;
    Ok(Json(connect_response(&state, &outcome)))
}

/// GET /api/config
async fn get_config(State(state): State<Arc<AppState>>) -> Json<SessionConfig> {
    Json(state.store.session_config())
}

/// PUT /api/config
async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(config): Json<SessionConfig>,
) -> Result<Json<SessionConfig>, (StatusCode, String)> {
    state
        .store
        .dispatch(PlaygroundAction::SetSessionConfig(config))
        .map_err(validation_error)?;
    Ok(Json(state.store.session_config()))
}

/// PUT /api/instructions
async fn update_instructions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateInstructionsRequest>,
) -> Result<Json<InstructionsResponse>, (StatusCode, String)> {
    let changed = state
        .store
        .dispatch(PlaygroundAction::SetInstructions(req.instructions))
        .map_err(validation_error)?;
    Ok(Json(InstructionsResponse {
        instructions: state.store.snapshot().instructions,
        changed,
    }))
}

/// DELETE /api/credential
/// Revoke the stored credential. A live session is torn down.
async fn revoke_credential(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .store
        .dispatch(PlaygroundAction::SetCredential(Credential::Revoked))
        .map_err(validation_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/presets
async fn list_presets(State(state): State<Arc<AppState>>) -> Json<PresetsResponse> {
    let snapshot = state.store.snapshot();
    let mut presets = snapshot.user_presets.clone();
    presets.extend(
        default_presets()
            .into_iter()
            .filter(|d| !snapshot.user_presets.iter().any(|u| u.id == d.id)),
    );
    Json(PresetsResponse {
        selected_preset_id: snapshot.selected_preset_id,
        presets,
    })
}

/// POST /api/presets/:id/select
async fn select_preset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Preset>, (StatusCode, String)> {
    state
        .store
        .dispatch(PlaygroundAction::SelectPreset(id.clone()))
        .map_err(validation_error)?;
    state
        .store
        .snapshot()
        .find_preset(&id)
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown preset: {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionController, ConnectionPhase};
    use crate::identity::PageParams;
    use crate::playground::{PlaygroundState, PlaygroundStore, VoiceId};
    use crate::testing::{MockContext, MockTokens};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;
    use url::Url;

    struct TestApp {
        state: Arc<AppState>,
        tokens: Arc<MockTokens>,
    }

    fn app(query: &str) -> TestApp {
        let url = Url::parse(&format!("https://play.example/?{query}")).unwrap();
        let store = Arc::new(PlaygroundStore::new(PlaygroundState::default()));
        let tokens = Arc::new(MockTokens::default());
        let controller = Arc::new(ConnectionController::new(
            Arc::clone(&store),
            PageParams::from_url(&url),
            Arc::new(MockContext::default()),
            tokens.clone(),
        ));
        let state = Arc::new(AppState {
            config: Config::new(url),
            controller,
            store,
        });
        TestApp { state, tokens }
    }

    async fn call(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = router(Arc::clone(&app.state))
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app("apiKey=k");
        let (status, body) = call(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn connect_hides_the_token() {
        let app = app("apiKey=k");
        let (status, body) = call(&app, "POST", "/api/connect", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "connected");

        let (_, body) = call(&app, "GET", "/api/connection", None).await;
        assert_eq!(body["phase"], "connected");
        assert_eq!(body["details"]["connected"], true);
        assert_eq!(body["details"]["url"], "wss://rtc.example/1");
        assert!(body["details"].get("token").is_none());
        assert!(body["details"].get("context_section").is_none());
        assert!(body.get("needs_reconnect").is_none());
        assert_eq!(body["needsReconnect"], false);

        let (_, body) = call(&app, "POST", "/api/connect", None).await;
        assert_eq!(body["outcome"], "already_connected");
    }

    #[tokio::test]
    async fn connect_errors_map_to_status_codes() {
        let app_without_key = app("goqiiUserId=7");
        let (status, _) = call(&app_without_key, "POST", "/api/connect", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let failing = app("apiKey=k");
        failing.tokens.fail.store(true, Ordering::SeqCst);
        let (status, _) = call(&failing, "POST", "/api/connect", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(failing.state.controller.phase(), ConnectionPhase::Idle);
    }

    #[tokio::test]
    async fn config_updates_are_validated() {
        let app = app("apiKey=k");
        let mut config = json!(app.state.store.session_config());

        config["temperature"] = json!(2.0);
        let (status, _) = call(&app, "PUT", "/api/config", Some(config.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        config["temperature"] = json!(1.0);
        config["voice"] = json!("Kore");
        let (status, body) = call(&app, "PUT", "/api/config", Some(config)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["voice"], "Kore");
        assert_eq!(app.state.store.session_config().voice, VoiceId::Kore);
    }

    #[tokio::test]
    async fn voice_change_is_reported_and_reconnect_applies_it() {
        let app = app("apiKey=k");
        call(&app, "POST", "/api/connect", None).await;

        let mut config = json!(app.state.store.session_config());
        config["voice"] = json!("Charon");
        call(&app, "PUT", "/api/config", Some(config)).await;

        let (_, body) = call(&app, "GET", "/api/connection", None).await;
        assert_eq!(body["needsReconnect"], true);

        let (status, body) = call(&app, "POST", "/api/reconnect", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "connected");
        assert_eq!(body["connection"]["details"]["voice"], "Charon");
        assert_eq!(body["connection"]["needsReconnect"], false);
    }

    #[tokio::test]
    async fn disconnect_and_revoke() {
        let app = app("apiKey=k");
        call(&app, "POST", "/api/connect", None).await;

        let (status, body) = call(&app, "POST", "/api/disconnect", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "idle");
        assert_eq!(body["details"]["connected"], false);

        let (status, _) = call(&app, "DELETE", "/api/credential", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(app.state.store.credential(), Credential::Revoked);
    }

    #[tokio::test]
    async fn instructions_and_presets() {
        let app = app("apiKey=k");
        let (status, body) = call(
            &app,
            "PUT",
            "/api/instructions",
            Some(json!({ "instructions": "Be brief." })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], true);

        let (_, body) = call(&app, "GET", "/api/presets", None).await;
        assert_eq!(body["selectedPresetId"], "helpful-ai");
        assert_eq!(body["presets"].as_array().unwrap().len(), default_presets().len());

        let (status, body) = call(&app, "POST", "/api/presets/nutrition-coach/select", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionConfig"]["voice"], "Kore");
        assert_ne!(app.state.store.snapshot().instructions, "Be brief.");

        let (status, _) = call(&app, "POST", "/api/presets/missing/select", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
