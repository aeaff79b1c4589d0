use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Key '{0}' is empty")]
    MissingKey(&'static str),

    #[error("Kube API Error: {0}")]
    KubeError(#[source] kube::Error),

    #[error("Serde Error: {0}")]
    SerdeError(#[source] serde_json::Error),

    #[error("Invalid schedule '{0}': {1}")]
    InvalidSchedule(String, String),

    #[error("Timed out after {1}s waiting for {0}")]
    Timeout(&'static str, u64),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO Error: {0}")]
    IoError(#[source] std::io::Error),

    #[error("{0} not found")]
    NotFound(String),
}

impl Error {
    /// HTTP status code reported by the API server, if this is an API error.
    pub fn api_code(&self) -> Option<u16> {
        match self {
            Error::KubeError(kube::Error::Api(response)) => Some(response.code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.api_code() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.api_code() == Some(409)
    }
}

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        Error::KubeError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerdeError(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}
