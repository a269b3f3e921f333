//! HTTP server: router, handlers, and the serve loop.
//!
//! Handlers share no mutable in-process state; every request reads or
//! rewrites the backing store on its own. Whole-document writes make the
//! consistency model last-writer-wins, which is fine for the single-user
//! deployment this serves.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::records::{is_valid_date_key, next_records, parse_record_map, DayRecord, RecordMap, TaskKey};
use crate::store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RecordStore>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordsResponse {
    pub records: RecordMap,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub record: DayRecord,
    pub records: RecordMap,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PutResponse {
    pub success: bool,
    pub records: RecordMap,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth", post(login))
        .route("/auth/check", get(check_session))
        .route("/auth/logout", post(logout))
        .route(
            "/records",
            get(get_records).post(toggle_record).put(put_records),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and run until ctrl-c or SIGTERM.
pub async fn serve(config: Arc<Config>, store: Arc<dyn RecordStore>) -> Result<()> {
    let app = router(AppState {
        config: config.clone(),
        store,
    });
    let listener = TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, env = %config.env, "daka server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("daka server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

fn require_session(headers: &HeaderMap) -> Result<()> {
    if auth::is_authed(headers) {
        Ok(())
    } else {
        Err(Error::Unauthorized)
    }
}

/// POST /auth: exchange the password for a session cookie.
async fn login(State(state): State<AppState>, body: Option<Json<Value>>) -> Response {
    let password = body
        .as_ref()
        .and_then(|Json(value)| value.get("password"))
        .and_then(Value::as_str);
    let Some(password) = password else {
        return Error::Validation("password is required".to_string()).into_response();
    };
    match auth::verify_password(&state.config, password) {
        Ok(true) => (
            StatusCode::OK,
            [(header::SET_COOKIE, auth::session_cookie(&state.config))],
            Json(AuthResponse { ok: true }),
        )
            .into_response(),
        Ok(false) => (
            StatusCode::UNAUTHORIZED,
            Json(crate::error::ErrorBody {
                error: "invalid password".to_string(),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// GET /auth/check: report whether the request carries a live session.
async fn check_session(headers: HeaderMap) -> Response {
    if auth::is_authed(&headers) {
        (StatusCode::OK, Json(AuthResponse { ok: true })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(AuthResponse { ok: false })).into_response()
    }
}

/// POST /auth/logout: expire the session cookie.
async fn logout() -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, auth::expired_cookie())],
        Json(AuthResponse { ok: true }),
    )
        .into_response()
}

/// GET /records: the full record map.
async fn get_records(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RecordsResponse>> {
    require_session(&headers)?;
    let records = state.store.read().await?;
    Ok(Json(RecordsResponse { records }))
}

/// POST /records: toggle or set a single task on a date.
async fn toggle_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<ToggleResponse>> {
    require_session(&headers)?;
    let body = body.map(|Json(value)| value).unwrap_or(Value::Null);

    let date = body
        .get("date")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Validation("date is required".to_string()))?;
    if !is_valid_date_key(date) {
        return Err(Error::Validation(format!(
            "invalid date '{date}': expected YYYY-MM-DD"
        )));
    }
    let task = body
        .get("task")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Validation("task is required".to_string()))?;
    let task: TaskKey = task
        .parse()
        .map_err(|_| Error::Validation(format!("invalid task '{task}'")))?;
    // A non-boolean value is ignored rather than rejected; the toggle
    // semantics take over.
    let value = body.get("value").and_then(Value::as_bool);

    let records = state.store.read().await?;
    let (next, day) = next_records(&records, date, task, value);
    let written = state.store.write(&next).await?;
    Ok(Json(ToggleResponse {
        record: day,
        records: written,
    }))
}

/// PUT /records: replace the whole record map.
async fn put_records(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<PutResponse>> {
    require_session(&headers)?;
    let body = body.map(|Json(value)| value).unwrap_or(Value::Null);

    let payload = body
        .get("records")
        .ok_or_else(|| Error::Validation("records payload is required".to_string()))?;
    let records = parse_record_map(payload)?;
    let written = state.store.write(&records).await?;
    Ok(Json(PutResponse {
        success: true,
        records: written,
    }))
}
