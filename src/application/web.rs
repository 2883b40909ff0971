use crate::entities::{Diary, DiaryError, GroupedEntries};
use anyhow::{Context, Result, anyhow};
use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[derive(Debug, Deserialize)]
pub struct DiaryForm {
    /// A missing field is treated like an empty submission
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub since: String,
    pub until: String,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for DiaryError {
    fn into_response(self) -> Response {
        let status = match &self {
            DiaryError::EmptyText => StatusCode::BAD_REQUEST,
            DiaryError::Storage(e) => {
                log::error!("Diary storage failure: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = StatusResponse {
            status: "error",
            message: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(diary: Arc<Diary>) -> Router {
    Router::new()
        .route("/", get(serve_form))
        .route("/diary", post(save_diary))
        .route("/api/diary", get(get_diary))
        .with_state(diary)
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
pub async fn serve(diary: Arc<Diary>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!("Diary form listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(diary))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    log::info!("Server shut down gracefully");
    Ok(())
}

async fn serve_form() -> Html<&'static str> {
    Html(include_str!("./static/diary_input.html"))
}

async fn save_diary(
    State(diary): State<Arc<Diary>>,
    Form(form): Form<DiaryForm>,
) -> Result<impl IntoResponse, DiaryError> {
    let saved = tokio::task::spawn_blocking(move || diary.submit(&form.text))
        .await
        .map_err(|e| anyhow!("diary task failed: {}", e))?;
    saved?;

    Ok((
        StatusCode::CREATED,
        Json(StatusResponse {
            status: "saved",
            message: None,
        }),
    ))
}

async fn get_diary(
    State(diary): State<Arc<Diary>>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<GroupedEntries>, DiaryError> {
    let grouped =
        tokio::task::spawn_blocking(move || diary.get_between(&range.since, &range.until))
            .await
            .map_err(|e| anyhow!("diary task failed: {}", e))??;

    Ok(Json(grouped))
}

/// Listen for SIGTERM and SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => log::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
