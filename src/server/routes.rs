use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use crate::hunter::{HunterDraft, HunterPatch, StoredDocument};
use crate::server::AppState;
use crate::storage::HunterRepository;
use crate::Error;

const LIST_FAILED: &str = "Failed to fetch hunters";
const FIND_FAILED: &str = "Failed to search for the hunter";
const CREATE_FAILED: &str = "Failed to create the hunter";
const UPDATE_FAILED: &str = "Failed to update the hunter";
const DELETE_FAILED: &str = "Failed to delete the hunter";
const INVALID_REQUEST: &str = "Invalid request";

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// A failed request: the underlying error plus the message shown for
/// backend failures. Backend details are logged, never returned.
#[derive(Debug)]
pub struct ApiError {
    error: Error,
    public: &'static str,
}

impl ApiError {
    fn with(public: &'static str) -> impl FnOnce(Error) -> ApiError {
        move |error| ApiError { error, public }
    }

    fn invalid_body(rejection: JsonRejection) -> ApiError {
        ApiError {
            error: Error::Validation(rejection.body_text()),
            public: INVALID_REQUEST,
        }
    }

    fn invalid_path(rejection: PathRejection) -> ApiError {
        ApiError {
            error: Error::Validation(format!("name fragment: {}", rejection.body_text())),
            public: INVALID_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.error {
            Error::Validation(problems) => (StatusCode::BAD_REQUEST, format!("Invalid hunter: {}", problems)),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "Hunter not found".to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.public.to_string()),
        };

        match &self.error {
            e if e.is_storage() => tracing::error!(error = %e, "{}", self.public),
            Error::Connectivity(_) => tracing::warn!(error = %self.error, "{}", self.public),
            _ => tracing::debug!(error = %self.error, status = status.as_u16(), "request rejected"),
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

pub async fn root() -> &'static str {
    "Hunter API running"
}

pub async fn list_hunters(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StoredDocument>>, ApiError> {
    let repo = state.context.documents().map_err(ApiError::with(LIST_FAILED))?;
    let hunters = repo.list_all().await.map_err(ApiError::with(LIST_FAILED))?;
    Ok(Json(hunters))
}

pub async fn get_hunter(
    State(state): State<Arc<AppState>>,
    fragment: Result<Path<String>, PathRejection>,
) -> Result<Json<StoredDocument>, ApiError> {
    let Path(fragment) = fragment.map_err(ApiError::invalid_path)?;
    let repo = state.context.documents().map_err(ApiError::with(FIND_FAILED))?;
    let hunter = repo
        .find_by_name_fragment(&fragment)
        .await
        .map_err(ApiError::with(FIND_FAILED))?;
    Ok(Json(hunter))
}

pub async fn create_hunter(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<HunterDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<StoredDocument>), ApiError> {
    let Json(draft) = payload.map_err(ApiError::invalid_body)?;
    let repo = state.context.documents().map_err(ApiError::with(CREATE_FAILED))?;
    let created = repo.create(draft).await.map_err(ApiError::with(CREATE_FAILED))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_hunter(
    State(state): State<Arc<AppState>>,
    fragment: Result<Path<String>, PathRejection>,
    payload: Result<Json<HunterPatch>, JsonRejection>,
) -> Result<Json<StoredDocument>, ApiError> {
    let Path(fragment) = fragment.map_err(ApiError::invalid_path)?;
    let Json(patch) = payload.map_err(ApiError::invalid_body)?;
    let repo = state.context.documents().map_err(ApiError::with(UPDATE_FAILED))?;
    let updated = repo
        .update_by_name_fragment(&fragment, patch)
        .await
        .map_err(ApiError::with(UPDATE_FAILED))?;
    Ok(Json(updated))
}

pub async fn delete_hunter(
    State(state): State<Arc<AppState>>,
    fragment: Result<Path<String>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(fragment) = fragment.map_err(ApiError::invalid_path)?;
    let repo = state.context.documents().map_err(ApiError::with(DELETE_FAILED))?;
    let removed = repo
        .delete_by_name_fragment(&fragment)
        .await
        .map_err(ApiError::with(DELETE_FAILED))?;
    tracing::info!(id = %removed.id, name = %removed.hunter.name, "hunter deleted");
    Ok(Json(MessageResponse {
        message: "Hunter deleted successfully".to_string(),
    }))
}
