use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::actor::Actor;
use crate::app::engagement::{EngagementService, VoteRecorded};
use crate::app::moderation::{FlagRecorded, ModerationService};
use crate::app::submissions::{InterpretationCreated, ReplyCreated, SubmissionService};
use crate::app::views::ReadService;
use crate::domain::counts::Counts;
use crate::domain::interpretation::{InterpretationView, ReplyView};
use crate::domain::subject::{SubjectKind, SubjectRef, Visibility};
use crate::domain::verse::{Reference, Verse, VerseCoordinate};
use crate::http::{AdminToken, AppError};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let (timestamp, id) = cursor
        .split_once('/')
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.store.ping().await.is_ok();
    let redis = match &state.rate_limiter {
        Some(limiter) => limiter.cache().ping().await.is_ok(),
        None => true,
    };
    let status = if store && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

fn engagement(state: &AppState) -> EngagementService {
    EngagementService::new(state.store.clone(), state.locks.clone())
}

fn moderation(state: &AppState) -> ModerationService {
    ModerationService::new(
        state.store.clone(),
        state.locks.clone(),
        state.gate.clone(),
        state.policy,
    )
}

fn submissions(state: &AppState) -> SubmissionService {
    SubmissionService::new(
        state.store.clone(),
        state.locks.clone(),
        state.gate.clone(),
        state.references.clone(),
    )
}

// Verses

#[derive(Deserialize)]
pub struct VerseLookupQuery {
    pub book: String,
    pub chapter: i32,
    pub verse: i32,
}

pub async fn lookup_verse(
    State(state): State<AppState>,
    Query(query): Query<VerseLookupQuery>,
) -> Result<Json<Verse>, AppError> {
    let coordinate = VerseCoordinate {
        book: query.book.trim().to_string(),
        chapter: query.chapter,
        verse: query.verse,
    };
    let verse = ReadService::new(state.store.clone())
        .lookup_verse(&coordinate)
        .await?;
    Ok(Json(verse))
}

pub async fn list_interpretations(
    Path(verse_id): Path<Uuid>,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<InterpretationView>>, AppError> {
    let limit = query.limit.unwrap_or(30);
    if !(1..=200).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 200"));
    }
    let cursor = parse_cursor(query.cursor)?;

    let mut items = ReadService::new(state.store.clone())
        .list_interpretations(verse_id, cursor, limit + 1)
        .await?;

    let next_cursor = if items.len() > limit as usize {
        items.truncate(limit as usize);
        items
            .last()
            .map(|view| (view.interpretation.created_at, view.interpretation.id))
    } else {
        None
    };

    Ok(Json(ListResponse {
        items,
        next_cursor: encode_cursor(next_cursor),
    }))
}

#[derive(Deserialize)]
pub struct SubmitTextRequest {
    pub text: String,
}

pub async fn create_interpretation(
    Path(verse_id): Path<Uuid>,
    actor: Actor,
    State(state): State<AppState>,
    Json(payload): Json<SubmitTextRequest>,
) -> Result<(StatusCode, Json<InterpretationCreated>), AppError> {
    let created = submissions(&state)
        .submit_interpretation(actor, verse_id, &payload.text)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn inbound_references(
    Path(verse_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Reference>>, AppError> {
    let references = ReadService::new(state.store.clone())
        .inbound_references(verse_id)
        .await?;
    Ok(Json(references))
}

// Interpretations and replies

pub async fn delete_interpretation(
    Path(id): Path<Uuid>,
    actor: Actor,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    submissions(&state).delete_interpretation(actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_reply(
    Path(id): Path<Uuid>,
    actor: Actor,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    submissions(&state).delete_reply(actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_replies(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ListResponse<ReplyView>>, AppError> {
    let items = ReadService::new(state.store.clone()).list_replies(id).await?;
    Ok(Json(ListResponse {
        items,
        next_cursor: None,
    }))
}

pub async fn create_reply(
    Path(id): Path<Uuid>,
    actor: Actor,
    State(state): State<AppState>,
    Json(payload): Json<SubmitTextRequest>,
) -> Result<(StatusCode, Json<ReplyCreated>), AppError> {
    let created = submissions(&state)
        .submit_reply(actor, id, &payload.text)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn upvote_interpretation(
    Path(id): Path<Uuid>,
    actor: Actor,
    State(state): State<AppState>,
) -> Result<Json<VoteRecorded>, AppError> {
    let recorded = engagement(&state)
        .cast_vote(actor, SubjectRef::interpretation(id))
        .await?;
    Ok(Json(recorded))
}

pub async fn upvote_reply(
    Path(id): Path<Uuid>,
    actor: Actor,
    State(state): State<AppState>,
) -> Result<Json<VoteRecorded>, AppError> {
    let recorded = engagement(&state)
        .cast_vote(actor, SubjectRef::reply(id))
        .await?;
    Ok(Json(recorded))
}

#[derive(Deserialize)]
pub struct FlagRequest {
    pub reason: Option<String>,
    pub explanation: Option<String>,
}

pub async fn flag_interpretation(
    Path(id): Path<Uuid>,
    actor: Actor,
    State(state): State<AppState>,
    Json(payload): Json<FlagRequest>,
) -> Result<Json<FlagRecorded>, AppError> {
    flag(state, actor, SubjectRef::interpretation(id), payload).await
}

pub async fn flag_reply(
    Path(id): Path<Uuid>,
    actor: Actor,
    State(state): State<AppState>,
    Json(payload): Json<FlagRequest>,
) -> Result<Json<FlagRecorded>, AppError> {
    flag(state, actor, SubjectRef::reply(id), payload).await
}

async fn flag(
    state: AppState,
    actor: Actor,
    subject: SubjectRef,
    payload: FlagRequest,
) -> Result<Json<FlagRecorded>, AppError> {
    let recorded = moderation(&state)
        .cast_flag(
            actor,
            subject,
            payload.reason.as_deref(),
            payload.explanation.as_deref(),
        )
        .await?;
    Ok(Json(recorded))
}

pub async fn interpretation_counts(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Counts>, AppError> {
    let counts = ReadService::new(state.store.clone())
        .counts(SubjectRef::interpretation(id))
        .await?;
    Ok(Json(counts))
}

pub async fn reply_counts(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Counts>, AppError> {
    let counts = ReadService::new(state.store.clone())
        .counts(SubjectRef::reply(id))
        .await?;
    Ok(Json(counts))
}

// Admin

#[derive(Serialize)]
pub struct ReconcileResponse {
    pub counts: Counts,
    pub visibility: Visibility,
}

pub async fn recompute_counts(
    _admin: AdminToken,
    Path((kind, id)): Path<(String, Uuid)>,
    State(state): State<AppState>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let kind = SubjectKind::from_db(&kind)
        .ok_or_else(|| AppError::bad_request("kind must be interpretation or reply"))?;
    let (counts, visibility) = moderation(&state)
        .reconcile(SubjectRef { kind, id })
        .await?;
    tracing::info!(
        subject_id = %id,
        kind = kind.as_db(),
        upvotes = counts.upvote_count,
        reports = counts.report_count,
        "counts reconciled"
    );
    Ok(Json(ReconcileResponse { counts, visibility }))
}
