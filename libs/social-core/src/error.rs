use remote_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("a pending request for this pair already exists")]
    AlreadyRequested,

    #[error("these users are already connected")]
    AlreadyConnected,

    #[error("connection request not found")]
    RequestNotFound,

    #[error("connection not found")]
    ConnectionNotFound,

    #[error("users are not connected")]
    NotConnected,

    #[error("username is already taken")]
    UsernameTaken,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("local cache error: {0}")]
    Cache(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SocialResult<T> = Result<T, SocialError>;
