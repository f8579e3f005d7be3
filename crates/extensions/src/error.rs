use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("extension `{0}` is not registered")]
    NotRegistered(String),

    #[error("extension `{0}` is not loaded")]
    NotLoaded(String),

    #[error("extension `{0}` is not enabled")]
    NotEnabled(String),

    #[error("extension `{name}` failed to load")]
    Load {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
