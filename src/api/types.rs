use serde::Serialize;

/// Body of every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: bool,
}

impl StatusResponse {
    #[must_use]
    pub const fn ok() -> Self {
        Self { status: true }
    }
}
