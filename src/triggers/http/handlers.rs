//! HTTP send handlers

use axum::{extract::State, Json};

use crate::error::{AppError, Result};
use crate::notification::DispatchSummary;
use crate::server::AppState;

use super::content::{CommandRequest, SendFields};
use super::models::SendResponse;

const SEND_COMMAND: &str = "send";

/// Run a named command. `send` is the only one.
#[tracing::instrument(name = "http.command", skip(state, request), fields(command = ?request.command))]
pub async fn do_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<SendResponse>> {
    let command = request
        .command
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::validation("Missing 'command' field in request"))?;

    if command != SEND_COMMAND {
        return Err(AppError::validation(format!("Unknown command: {}", command)));
    }

    let summary = state.push.send_detached(request.fields.into_request()).await?;
    Ok(Json(SendResponse::from(&summary)))
}

/// Send a notification and return the full per-target summary
#[tracing::instrument(name = "http.send_notification", skip(state, request))]
pub async fn send_notification(
    State(state): State<AppState>,
    Json(request): Json<SendFields>,
) -> Result<Json<DispatchSummary>> {
    let summary = state.push.send_detached(request.into_request()).await?;
    Ok(Json(summary))
}
