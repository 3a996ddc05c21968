//! Request handlers
//!
//! Mutations go through the orchestrator; list and get read the store; search
//! reads the index. Index sync outcomes are logged, never returned.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use nutrition_core::prelude::*;
use nutrition_core::MAX_PAGE_SIZE;
use nutrition_sync::Mutation;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Offset pagination parameters
#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    MAX_PAGE_SIZE
}

#[derive(Serialize)]
pub struct Welcome {
    pub message: String,
    pub name: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub message: String,
    pub store: bool,
    pub search_index: bool,
}

const APP_NAME: &str = "Food Nutrition API";

pub async fn root() -> Json<Welcome> {
    let version = env!("CARGO_PKG_VERSION");
    Json(Welcome {
        message: format!("Welcome to {}! API version: {}", APP_NAME, version),
        name: APP_NAME,
        version,
    })
}

/// Always 200 while the process serves; `status` is "ok" only when the store answers
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let report = state.orchestrator.health().await;
    let (status, message) = match (report.store, report.index) {
        (true, true) => ("ok", format!("{} is healthy.", APP_NAME)),
        (true, false) => ("ok", format!("{} is serving; search index unreachable.", APP_NAME)),
        (false, _) => ("degraded", format!("{} cannot reach its record store.", APP_NAME)),
    };
    Json(Health {
        status,
        message,
        store: report.store,
        search_index: report.index,
    })
}

pub async fn create_record(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewRecord>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<NutritionRecord>)> {
    let Json(input) = payload?;
    let mutation = state.orchestrator.create(input).await?;
    Ok((StatusCode::CREATED, Json(settled(mutation))))
}

pub async fn get_record(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<NutritionRecord>> {
    let Path(id) = id?;
    Ok(Json(state.orchestrator.get(id).await?))
}

pub async fn list_records(
    State(state): State<AppState>,
    page: std::result::Result<Query<Page>, QueryRejection>,
) -> ApiResult<Json<Vec<NutritionRecord>>> {
    let Query(page) = page?;
    let limit = page.limit.min(MAX_PAGE_SIZE);
    Ok(Json(state.orchestrator.list(page.skip, limit).await?))
}

pub async fn update_record(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<RecordPatch>, JsonRejection>,
) -> ApiResult<Json<NutritionRecord>> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    let mutation = state.orchestrator.update(id, patch).await?;
    Ok(Json(settled(mutation)))
}

pub async fn delete_record(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<NutritionRecord>> {
    let Path(id) = id?;
    let mutation = state.orchestrator.delete(id).await?;
    Ok(Json(settled(mutation)))
}

pub async fn search_records(
    State(state): State<AppState>,
    query: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<IndexDocument>>> {
    let Query(query) = query?;
    Ok(Json(state.orchestrator.search(&query.capped()).await))
}

fn settled(mutation: Mutation) -> NutritionRecord {
    debug!(id = mutation.record.id, sync = %mutation.sync, "Mutation settled");
    mutation.record
}
