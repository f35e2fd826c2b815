//! HTTP route handlers: health, tickets, labels, followers, archive,
//! comments and history.
//!
//! Bodies are taken as raw bytes so that an empty body (common on DELETE)
//! reads as `{}` and a missing `Content-Type` is not an error. Every
//! mutating route accepts an optional `author`; absent or blank authors
//! are recorded as `Sistema`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chamados_core::{
    Actor, NewComment, NewTicket, Prioridade, Status, Ticket, TicketComment, TicketHistoryEntry,
    TicketPatch, ValidationError,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::json_error;
use super::state::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Parse a JSON body, treating an empty one as `{}`.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"{}")?);
    }
    Ok(serde_json::from_slice(body)?)
}

fn require_value(field: &'static str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field }.into());
    }
    Ok(())
}

// ── Request bodies ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AuthorBody {
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: Status,
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriorityBody {
    prioridade: Prioridade,
    author: Option<String>,
}

/// `responsavel: null`, `""` or an absent key all unassign.
#[derive(Debug, Deserialize)]
struct AssigneeBody {
    responsavel: Option<String>,
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EvidenciasBody {
    evidencias: Vec<String>,
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EtiquetaBody {
    etiqueta: String,
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeguidorBody {
    seguidor: String,
    author: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ShareLink {
    share_url: String,
    ticket_number: u64,
}

// ── Service routes ────────────────────────────────────────────────────────────

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

// ── Tickets ───────────────────────────────────────────────────────────────────

/// POST /api/tickets
pub(crate) async fn handle_create_ticket(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Ticket> {
    let input: NewTicket = parse_body(&body)?;
    let ticket = state.store.create_ticket(input).await?;
    tracing::info!(
        ticket = %ticket.id,
        number = ticket.ticket_number,
        solicitante = %ticket.solicitante(),
        "ticket filed"
    );
    Ok(Json(ticket))
}

/// GET /api/tickets
pub(crate) async fn handle_list_tickets(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Ticket>> {
    Ok(Json(state.store.list_active_tickets().await?))
}

/// GET /api/tickets-archived
pub(crate) async fn handle_list_archived(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<Ticket>> {
    Ok(Json(state.store.list_archived_tickets().await?))
}

/// GET /api/tickets/{id}
pub(crate) async fn handle_get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Ticket> {
    state
        .store
        .get_ticket(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// PATCH /api/tickets/{id}/status
pub(crate) async fn handle_update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Ticket> {
    let req: StatusBody = parse_body(&body)?;
    let actor = Actor::from_author(req.author);
    Ok(Json(state.store.update_status(&id, req.status, &actor).await?))
}

/// PATCH /api/tickets/{id}/priority
pub(crate) async fn handle_update_priority(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Ticket> {
    let req: PriorityBody = parse_body(&body)?;
    let actor = Actor::from_author(req.author);
    Ok(Json(
        state
            .store
            .update_priority(&id, req.prioridade, &actor)
            .await?,
    ))
}

/// PATCH /api/tickets/{id}/assignee
pub(crate) async fn handle_update_assignee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Ticket> {
    let req: AssigneeBody = parse_body(&body)?;
    let responsavel = req.responsavel.filter(|r| !r.trim().is_empty());
    let actor = Actor::from_author(req.author);
    Ok(Json(
        state
            .store
            .update_responsavel(&id, responsavel, &actor)
            .await?,
    ))
}

/// PATCH /api/tickets/{id}
///
/// The body is a flat object: `author` plus any patchable ticket fields.
/// Keys the patch does not know, server-owned ones included, are a 400.
pub(crate) async fn handle_update_fields(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Ticket> {
    let mut fields: serde_json::Map<String, serde_json::Value> = parse_body(&body)?;
    let author = match fields.remove("author") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(name)) => Some(name),
        Some(_) => {
            return Err(ApiError::BadRequest(
                "field 'author' must be a string".to_string(),
            ))
        }
    };
    let patch: TicketPatch = serde_json::from_value(serde_json::Value::Object(fields))?;
    let actor = Actor::from_author(author);
    Ok(Json(state.store.update_fields(&id, patch, &actor).await?))
}

/// PATCH /api/tickets/{id}/evidencias
pub(crate) async fn handle_update_evidencias(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Ticket> {
    let req: EvidenciasBody = parse_body(&body)?;
    let actor = Actor::from_author(req.author);
    Ok(Json(
        state
            .store
            .update_evidencias(&id, req.evidencias, &actor)
            .await?,
    ))
}

// ── Labels and followers ──────────────────────────────────────────────────────

/// POST /api/tickets/{id}/etiquetas
pub(crate) async fn handle_add_etiqueta(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Ticket> {
    let req: EtiquetaBody = parse_body(&body)?;
    require_value("etiqueta", &req.etiqueta)?;
    let actor = Actor::from_author(req.author);
    Ok(Json(state.store.add_etiqueta(&id, &req.etiqueta, &actor).await?))
}

/// DELETE /api/tickets/{id}/etiquetas/{etiqueta}
pub(crate) async fn handle_remove_etiqueta(
    State(state): State<Arc<AppState>>,
    Path((id, etiqueta)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Ticket> {
    let req: AuthorBody = parse_body(&body)?;
    let actor = Actor::from_author(req.author);
    Ok(Json(state.store.remove_etiqueta(&id, &etiqueta, &actor).await?))
}

/// POST /api/tickets/{id}/seguir
pub(crate) async fn handle_add_seguidor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Ticket> {
    let req: SeguidorBody = parse_body(&body)?;
    require_value("seguidor", &req.seguidor)?;
    let actor = Actor::from_author(req.author);
    Ok(Json(state.store.add_seguidor(&id, &req.seguidor, &actor).await?))
}

/// DELETE /api/tickets/{id}/seguir/{seguidor}
pub(crate) async fn handle_remove_seguidor(
    State(state): State<Arc<AppState>>,
    Path((id, seguidor)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Ticket> {
    let req: AuthorBody = parse_body(&body)?;
    let actor = Actor::from_author(req.author);
    Ok(Json(state.store.remove_seguidor(&id, &seguidor, &actor).await?))
}

// ── Share and archive ─────────────────────────────────────────────────────────

/// GET /api/tickets/{id}/share
///
/// Deep link into the board built from the request's own host, so it is
/// right behind whatever proxy the client went through.
pub(crate) async fn handle_share(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<ShareLink> {
    let ticket = state.store.get_ticket(&id).await?.ok_or(ApiError::NotFound)?;

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");

    Ok(Json(ShareLink {
        share_url: format!("{scheme}://{host}/kanban?ticket={}", ticket.id),
        ticket_number: ticket.ticket_number,
    }))
}

/// POST /api/tickets/{id}/archive
pub(crate) async fn handle_archive(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Ticket> {
    Ok(Json(state.store.archive_ticket(&id).await?))
}

// ── Comments and history ──────────────────────────────────────────────────────

/// POST /api/tickets/{id}/comments
pub(crate) async fn handle_add_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<TicketComment> {
    let comment: NewComment = parse_body(&body)?;
    Ok(Json(state.store.add_comment(&id, comment).await?))
}

/// GET /api/tickets/{id}/comments
pub(crate) async fn handle_list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<TicketComment>> {
    Ok(Json(state.store.list_comments(&id).await?))
}

/// GET /api/tickets/{id}/history
pub(crate) async fn handle_list_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<TicketHistoryEntry>> {
    Ok(Json(state.store.list_history(&id).await?))
}
