use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    /// The Web API answered `ok: false` with a machine-readable code.
    #[error("slack api error: {method}: {code}")]
    Api { method: String, code: String },

    #[error("http error")]
    Http(#[from] reqwest::Error),
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn api(method: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Api {
            method: method.into(),
            code: code.into(),
        }
    }

    /// The `user_not_found` family of codes means the target does not exist,
    /// as opposed to the call itself failing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { code, .. }
            if code == "user_not_found" || code == "channel_not_found")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
