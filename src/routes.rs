//! HTTP surface: loads groups from the store, runs them through the ledger
//! and writes them back.
use actix_web::{
    delete, get, http::StatusCode, patch, post, put, web, HttpRequest, HttpResponse,
    ResponseError,
};
use bson::oid::ObjectId;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::auth::{check_session, Session};
use crate::error::{LedgerError, LedgerResult};
use crate::group::{EventDraft, WeightEntry};
use crate::schemas::{Group, Member, MemberId};
use crate::settings::Auth;
use crate::settlement::settle;
use crate::split::Weight;
use crate::store::{GroupStore, StoreError};
use crate::summary::summarize;

pub struct AppState {
    store: Arc<dyn GroupStore>,
    auth: Auth,
    precision: u32,
    // Serializes load-modify-replace cycles
    writes: Mutex<()>,
}

impl AppState {
    pub fn new(store: Arc<dyn GroupStore>, auth: Auth, precision: u32) -> Self {
        Self {
            store,
            auth,
            precision,
            writes: Mutex::new(()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Ledger(LedgerError::InvalidSplitInput(_)) => "invalid_split_input",
            ApiError::Ledger(LedgerError::InvalidSplitTotal(_)) => "invalid_split_total",
            ApiError::Ledger(LedgerError::InvalidWeight(_)) => "invalid_weight",
            ApiError::Ledger(LedgerError::UnknownMember(_)) => "unknown_member",
            ApiError::Ledger(LedgerError::SplitMismatch { .. }) => "split_mismatch",
            ApiError::Ledger(LedgerError::ExistingKey(_)) => "conflict",
            ApiError::Ledger(LedgerError::KeyNotFound(_)) => "not_found",
            ApiError::Ledger(LedgerError::MemberInUse(_)) => "member_in_use",
            ApiError::Store(StoreError::NotFound(_)) => "not_found",
            ApiError::Store(StoreError::Conflict(_)) => "conflict",
            ApiError::Store(StoreError::Mongo(_)) => "database_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(LedgerError::KeyNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Ledger(LedgerError::ExistingKey(_) | LedgerError::MemberInUse(_)) => {
                StatusCode::CONFLICT
            }
            ApiError::Ledger(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Store(StoreError::Mongo(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        HttpResponse::build(status).json(ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        })
    }
}

type ApiResult = Result<HttpResponse, ApiError>;

fn session(request: &HttpRequest, state: &AppState) -> Result<Session, ApiError> {
    check_session(request, &state.auth).ok_or(ApiError::Unauthorized)
}

fn session_for_group(
    request: &HttpRequest,
    state: &AppState,
    group_id: &str,
) -> Result<Session, ApiError> {
    let session = session(request, state)?;
    if !session.can_access(group_id) {
        return Err(ApiError::Forbidden(format!("no access to group \"{group_id}\"")));
    }
    Ok(session)
}

fn service_only(request: &HttpRequest, state: &AppState) -> Result<(), ApiError> {
    match session(request, state)? {
        Session::Service => Ok(()),
        Session::Member { .. } => Err(ApiError::Forbidden(
            "this operation needs the service token".to_string(),
        )),
    }
}

/// Loads a group, applies `change` and stores the result. Nothing is written
/// when `change` fails.
async fn mutate<T>(
    state: &AppState,
    group_id: &str,
    change: impl FnOnce(&mut Group) -> LedgerResult<T>,
) -> Result<(Group, T), ApiError> {
    let _guard = state.writes.lock().await;
    let mut group = state.store.get(group_id).await?;
    let value = change(&mut group)?;
    state.store.replace(&group).await?;
    Ok((group, value))
}

#[derive(Debug, Deserialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
pub struct GroupDetails {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub member: Option<MemberId>,
}

#[derive(Debug, Deserialize)]
pub struct EqualSplitPreview {
    pub group_id: String,
    pub amount: Decimal,
    pub payer: Option<MemberId>,
    pub members: Option<Vec<MemberId>>,
}

#[derive(Debug, Deserialize)]
pub struct WeightedSplitPreview {
    pub group_id: String,
    pub amount: Decimal,
    pub payer: Option<MemberId>,
    pub weights: Vec<WeightEntry>,
}

#[get("/groups")]
async fn list_groups(state: web::Data<AppState>, request: HttpRequest) -> ApiResult {
    service_only(&request, &state)?;
    Ok(HttpResponse::Ok().json(state.store.list().await?))
}

#[put("/groups/{id}")]
async fn add_group(
    state: web::Data<AppState>,
    request: HttpRequest,
    id: web::Path<String>,
    json: web::Json<NewGroup>,
) -> ApiResult {
    service_only(&request, &state)?;
    let json = json.into_inner();
    let mut group = Group::new(id.into_inner(), json.name);
    group.description = json.description;
    for member in json.members {
        group.add_member(member, state.precision)?;
    }

    state.store.insert(group.clone()).await?;
    tracing::info!(group = %group.id, members = group.members.len(), "group added");
    Ok(HttpResponse::Created().json(group))
}

#[get("/groups/{id}")]
async fn get_group(
    state: web::Data<AppState>,
    request: HttpRequest,
    id: web::Path<String>,
) -> ApiResult {
    session_for_group(&request, &state, &id)?;
    Ok(HttpResponse::Ok().json(state.store.get(&id).await?))
}

#[patch("/groups/{id}")]
async fn edit_group(
    state: web::Data<AppState>,
    request: HttpRequest,
    id: web::Path<String>,
    json: web::Json<GroupDetails>,
) -> ApiResult {
    session_for_group(&request, &state, &id)?;
    let json = json.into_inner();
    let (group, ()) = mutate(&state, &id, |group| {
        group.update_details(json.name, json.description);
        Ok(())
    })
    .await?;
    Ok(HttpResponse::Ok().json(group))
}

#[delete("/groups/{id}")]
async fn delete_group(
    state: web::Data<AppState>,
    request: HttpRequest,
    id: web::Path<String>,
) -> ApiResult {
    service_only(&request, &state)?;
    let _guard = state.writes.lock().await;
    state.store.delete(&id).await?;
    tracing::info!(group = %id, "group deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[post("/groups/{id}/members")]
async fn add_member(
    state: web::Data<AppState>,
    request: HttpRequest,
    id: web::Path<String>,
    member: web::Json<Member>,
) -> ApiResult {
    session_for_group(&request, &state, &id)?;
    let precision = state.precision;
    let (group, ()) = mutate(&state, &id, |group| {
        group.add_member(member.into_inner(), precision)
    })
    .await?;
    Ok(HttpResponse::Created().json(group))
}

#[delete("/groups/{id}/members/{member_id}")]
async fn remove_member(
    state: web::Data<AppState>,
    request: HttpRequest,
    path: web::Path<(String, String)>,
) -> ApiResult {
    let (id, member_id) = path.into_inner();
    session_for_group(&request, &state, &id)?;
    let precision = state.precision;
    let (_, removed) = mutate(&state, &id, |group| {
        group.remove_member(&member_id, precision)
    })
    .await?;
    Ok(HttpResponse::Ok().json(removed))
}

#[post("/groups/{id}/events")]
async fn add_event(
    state: web::Data<AppState>,
    request: HttpRequest,
    id: web::Path<String>,
    draft: web::Json<EventDraft>,
) -> ApiResult {
    session_for_group(&request, &state, &id)?;
    let precision = state.precision;
    let (_, event) = mutate(&state, &id, |group| {
        let event = group.build_event(
            ObjectId::new().to_hex(),
            Utc::now(),
            draft.into_inner(),
            precision,
        )?;
        group.add_event(event.clone(), precision)?;
        Ok(event)
    })
    .await?;
    Ok(HttpResponse::Created().json(event))
}

#[put("/groups/{id}/events/{event_id}")]
async fn edit_event(
    state: web::Data<AppState>,
    request: HttpRequest,
    path: web::Path<(String, String)>,
    draft: web::Json<EventDraft>,
) -> ApiResult {
    let (id, event_id) = path.into_inner();
    session_for_group(&request, &state, &id)?;
    let precision = state.precision;
    let (_, event) = mutate(&state, &id, |group| {
        let timestamp = group
            .event(&event_id)
            .map(|existing| existing.timestamp)
            .ok_or_else(|| LedgerError::KeyNotFound(event_id.clone()))?;
        let event = group.build_event(event_id.as_str(), timestamp, draft.into_inner(), precision)?;
        group.edit_event(&event_id, event.clone(), precision)?;
        Ok(event)
    })
    .await?;
    Ok(HttpResponse::Ok().json(event))
}

#[delete("/groups/{id}/events/{event_id}")]
async fn delete_event(
    state: web::Data<AppState>,
    request: HttpRequest,
    path: web::Path<(String, String)>,
) -> ApiResult {
    let (id, event_id) = path.into_inner();
    session_for_group(&request, &state, &id)?;
    let precision = state.precision;
    let (_, removed) = mutate(&state, &id, |group| {
        group.delete_event(&event_id, precision)
    })
    .await?;
    Ok(HttpResponse::Ok().json(removed))
}

#[get("/groups/{id}/settlement")]
async fn get_settlement(
    state: web::Data<AppState>,
    request: HttpRequest,
    id: web::Path<String>,
) -> ApiResult {
    session_for_group(&request, &state, &id)?;
    let group = state.store.get(&id).await?;
    Ok(HttpResponse::Ok().json(settle(&group, state.precision)?))
}

#[get("/groups/{id}/summary")]
async fn get_summary(
    state: web::Data<AppState>,
    request: HttpRequest,
    id: web::Path<String>,
    query: web::Query<SummaryQuery>,
) -> ApiResult {
    let session = session_for_group(&request, &state, &id)?;
    let current_user = match (session.member_id(), query.member.as_deref()) {
        (Some(member), _) => member.to_string(),
        (None, Some(member)) => member.to_string(),
        (None, None) => {
            return Err(ApiError::BadRequest(
                "a member is needed to compute the summary".to_string(),
            ))
        }
    };
    let group = state.store.get(&id).await?;
    Ok(HttpResponse::Ok().json(summarize(&group, &current_user)))
}

#[post("/split/equal")]
async fn preview_equal_split(
    state: web::Data<AppState>,
    request: HttpRequest,
    json: web::Json<EqualSplitPreview>,
) -> ApiResult {
    let json = json.into_inner();
    session_for_group(&request, &state, &json.group_id)?;
    let group = state.store.get(&json.group_id).await?;
    let members = json.members.unwrap_or_else(|| group.member_ids());
    let split = match json.payer {
        Some(payer) => group.equal_split(json.amount, &payer, &members, state.precision)?,
        None => group.splitter(state.precision).equal(json.amount, &members)?,
    };
    Ok(HttpResponse::Ok().json(split))
}

#[post("/split/weighted")]
async fn preview_weighted_split(
    state: web::Data<AppState>,
    request: HttpRequest,
    json: web::Json<WeightedSplitPreview>,
) -> ApiResult {
    let json = json.into_inner();
    session_for_group(&request, &state, &json.group_id)?;
    let group = state.store.get(&json.group_id).await?;
    let weights: Vec<Weight> = json
        .weights
        .into_iter()
        .map(|entry| (entry.member, entry.percent))
        .collect();
    let split = match json.payer {
        Some(payer) => group.weighted_split(json.amount, &payer, &weights, state.precision)?,
        None => group.splitter(state.precision).weighted(json.amount, &weights)?,
    };
    Ok(HttpResponse::Ok().json(split))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_groups)
        .service(add_group)
        .service(get_group)
        .service(edit_group)
        .service(delete_group)
        .service(add_member)
        .service(remove_member)
        .service(add_event)
        .service(edit_event)
        .service(delete_event)
        .service(get_settlement)
        .service(get_summary)
        .service(preview_equal_split)
        .service(preview_weighted_split);
}
