use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use snafu::Snafu;

use crate::service::catalog::CatalogError;
use crate::service::object_store::ObjectStoreError;
use crate::service::session::SessionError;
use crate::service::store::StoreError;
use crate::Located;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(transparent)]
    Catalog { source: CatalogError },

    #[snafu(transparent)]
    Session { source: SessionError },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Catalog { source } | ApiError::Session { source: SessionError::Catalog { source } } => {
                catalog_status(source)
            }
            ApiError::Session {
                source: SessionError::UnknownSession { .. },
            } => StatusCode::NOT_FOUND,
        }
    }
}

fn catalog_status(error: &CatalogError) -> StatusCode {
    match error {
        CatalogError::Store {
            source: StoreError::NotFound { .. },
        } => StatusCode::NOT_FOUND,
        CatalogError::Objects { source } => match source {
            ObjectStoreError::InvalidKey { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ObjectStoreError::ObjectNotFound { .. } => StatusCode::NOT_FOUND,
            ObjectStoreError::Io { .. } | ObjectStoreError::PublicUrl { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
        CatalogError::InvalidWebinar { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CatalogError::UnknownSlug { .. } => StatusCode::NOT_FOUND,
        CatalogError::Forbidden { .. } => StatusCode::FORBIDDEN,
        CatalogError::SlugTaken { .. }
        | CatalogError::ChatLocked { .. }
        | CatalogError::StartLocked { .. }
        | CatalogError::AlreadyEnded { .. }
        | CatalogError::VideoLocked { .. }
        | CatalogError::DeleteWhileLive { .. } => StatusCode::CONFLICT,
    }
}

impl Located for ApiError {
    fn location(&self) -> snafu::Location {
        match self {
            ApiError::Catalog { source } => source.location(),
            ApiError::Session { source } => source.location(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, location = %self.location(), "request failed: {}", self);
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
        }

        let content = ErrorResponse {
            status: status.as_u16(),
            message: self.to_string(),
        };

        (status, Json(content)).into_response()
    }
}
