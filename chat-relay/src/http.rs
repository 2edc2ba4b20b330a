use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, WebSocketUpgrade},
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::debug;

use crate::{
    hub::ChatHub,
    message::{NewUserRequest, RegistrationReply},
    registry::RegisterError,
    session,
};

/// Builds the relay's router.
///
/// `GET /ping-server` and `POST /new-user` are plain HTTP; any other path
/// accepts a WebSocket upgrade.
pub fn router(hub: Arc<ChatHub>) -> Router {
    Router::new()
        .route("/ping-server", get(ping))
        .route("/new-user", post(new_user))
        .fallback(upgrade)
        .layer(SetResponseHeaderLayer::if_not_present(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(hub)
}

async fn ping() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// The body is read as JSON whatever its declared content type.
async fn new_user(State(hub): State<Arc<ChatHub>>, body: Bytes) -> Response {
    let Some(name) = requested_name(&body) else {
        debug!(bytes = body.len(), "registration without a name");
        return RegisterError::MissingName.into_response();
    };

    match hub.register(&name).await {
        Ok(user) => Json(RegistrationReply::Ok { user }).into_response(),
        Err(err) => err.into_response(),
    }
}

fn requested_name(body: &[u8]) -> Option<String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    serde_json::from_slice::<NewUserRequest>(body)
        .ok()
        .and_then(|request| request.name)
}

async fn upgrade(State(hub): State<Arc<ChatHub>>, ws: Option<WebSocketUpgrade>) -> Response {
    match ws {
        Some(ws) => ws.on_upgrade(move |socket| session::run(socket, hub)),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

impl IntoResponse for RegisterError {
    fn into_response(self) -> Response {
        let status = match self {
            RegisterError::MissingName => StatusCode::BAD_REQUEST,
            RegisterError::NameTaken => StatusCode::CONFLICT,
        };
        let reply = RegistrationReply::Error {
            message: self.message().to_string(),
        };
        (status, Json(reply)).into_response()
    }
}
