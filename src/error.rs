use crate::catalog::CatalogError;
use axum::http::StatusCode;
use thiserror::Error;

/// Request-level failure. Fatal for the request, recoverable for the process.
#[derive(Debug, Error)]
pub enum SiteError {
    /// Malformed request URL or a host outside the access allowlist.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No endpoint, page, static file or catalog record for the request.
    #[error("not found: {url}")]
    NotFound { url: String, lang: String },

    /// Anything else. Logged in full, never shown to the client.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SiteError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        SiteError::BadRequest(reason.into())
    }

    pub fn not_found(url: impl Into<String>, lang: impl Into<String>) -> Self {
        SiteError::NotFound {
            url: url.into(),
            lang: lang.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SiteError::Internal(anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SiteError::BadRequest(_) => StatusCode::BAD_REQUEST,
            SiteError::NotFound { .. } => StatusCode::NOT_FOUND,
            SiteError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fancy errors render inside the localized page shell.
    pub fn is_fancy(&self) -> bool {
        matches!(self, SiteError::NotFound { .. })
    }

    /// Fixed, non-localized description for the minimal error page.
    pub fn description(&self) -> &'static str {
        match self {
            SiteError::BadRequest(_) => "The requested URL is invalid.",
            SiteError::NotFound { .. } => "The requested URL does not exist.",
            SiteError::Internal(_) => "The server encountered an error while handling the request.",
        }
    }
}

impl From<CatalogError> for SiteError {
    fn from(err: CatalogError) -> Self {
        SiteError::Internal(anyhow::Error::new(err).context("Catalog query failed"))
    }
}
