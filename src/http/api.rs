//! Axum handlers for the course content and question routes.
//!
//! Form endpoints accept urlencoded and multipart bodies; repeated fields
//! (e.g. `content_parts`) are collected in the order they appear.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::content::{Deleted, Module};
use crate::metrics::MetricsSnapshot;

use super::AppState;
use super::error::ApiError;
use super::extract::{ApiPath, ApiQuery, FormFields};

const DEFAULT_KEY_PREFIX: &str = "content";
const WELCOME: &str = "Welcome to the course chatbot API";

// ── Request / response types ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct GetContentParams {
    module_title: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct DeleteContentParams {
    key: Option<String>,
}

/// Success envelope shared by every content route.
#[derive(Debug, Serialize)]
pub(super) struct ApiResponse<T> {
    status: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self { status: true, message: message.into(), data: Some(data) })
    }
}

impl ApiResponse<()> {
    fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self { status: true, message: message.into(), data: None })
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum ContentData {
    One(Module),
    All(Vec<Module>),
}

#[derive(Debug, Serialize)]
pub(super) struct Answer {
    response: String,
}

/// Query values that are present but empty count as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /
pub(super) async fn root() -> Json<Value> {
    Json(json!({ "message": WELCOME }))
}

/// POST {prefix}/update-content
pub(super) async fn update_content(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<ApiResponse<Module>>, ApiError> {
    let module_title = form.required("module_title")?;
    if module_title.trim().is_empty() {
        return Err(ApiError::Validation("Module title must be provided.".into()));
    }
    let key_prefix = form.first("key_prefix").unwrap_or(DEFAULT_KEY_PREFIX);
    let content_parts = form.all("content_parts");

    let added = content_parts.len();
    let module = state
        .gateway
        .store()
        .upsert_content(module_title, key_prefix, content_parts)
        .await;

    info!(%module_title, %key_prefix, added, "module content updated");
    Ok(ApiResponse::ok("Module content updated successfully", module))
}

/// GET {prefix}/get-content
pub(super) async fn get_content(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<GetContentParams>,
) -> Result<Json<ApiResponse<ContentData>>, ApiError> {
    let store = state.gateway.store();
    match non_empty(params.module_title) {
        Some(title) => {
            let module = store
                .find_module(&title)
                .await
                .ok_or_else(|| ApiError::NotFound("Module not found".into()))?;
            Ok(ApiResponse::ok("Module content fetched successfully", ContentData::One(module)))
        }
        None => {
            let modules = store.list_modules().await;
            Ok(ApiResponse::ok("Content fetched successfully", ContentData::All(modules)))
        }
    }
}

/// DELETE {prefix}/delete-content/{module_title}
pub(super) async fn delete_content(
    State(state): State<AppState>,
    ApiPath(module_title): ApiPath<String>,
    ApiQuery(params): ApiQuery<DeleteContentParams>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let key = non_empty(params.key);
    let deleted = state
        .gateway
        .store()
        .delete(&module_title, key.as_deref())
        .await?;

    let message = match (deleted, key) {
        (Deleted::Items(removed), Some(key)) => {
            info!(%module_title, %key, removed, "content deleted");
            format!("Content with key '{key}' deleted successfully")
        }
        _ => {
            info!(%module_title, "module deleted");
            format!("Module '{module_title}' deleted successfully")
        }
    };
    Ok(ApiResponse::message(message))
}

/// PUT {prefix}/edit-content
pub(super) async fn edit_content(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<ApiResponse<Module>>, ApiError> {
    let module_title = form.required("module_title")?;
    let key = form.required("key")?;
    let new_value = form.required("new_value")?;

    let module = state.gateway.store().edit(module_title, key, new_value).await?;

    info!(%module_title, %key, "content edited");
    Ok(ApiResponse::ok("Content updated successfully", module))
}

/// POST {prefix}/ask-question
pub(super) async fn ask_question(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<ApiResponse<Answer>>, ApiError> {
    let query = form.required("query")?;
    if query.trim().is_empty() {
        return Err(ApiError::Validation("Query cannot be empty.".into()));
    }

    let response = state.gateway.answer(query).await?;
    if response.is_empty() {
        return Err(ApiError::Generation("Error generating response.".into()));
    }

    Ok(ApiResponse::ok("Query answered", Answer { response }))
}

/// Fallback for unmatched routes.
pub(super) async fn not_found() -> ApiError {
    ApiError::NotFound("Not Found".into())
}

/// GET {prefix}/metrics
pub(super) async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot().await)
}
