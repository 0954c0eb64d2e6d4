use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The refresh token was rejected or an API call returned 401.
    /// Nothing can proceed until the user re-authorizes.
    #[error("Zoho authentication failed (status {status}): {body}")]
    Authentication { status: u16, body: String },

    #[error("Zoho API request to {url} failed with status {status}: {body}")]
    Api {
        url: String,
        status: u16,
        body: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid Zoho response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
