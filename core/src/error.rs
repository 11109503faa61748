use thiserror::Error;

#[derive(Error, Debug)]
pub enum EntitlementError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Purchase source error: {0}")]
    PurchaseSource(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EntitlementError {
    pub fn purchase_source(msg: impl Into<String>) -> Self {
        EntitlementError::PurchaseSource(msg.into())
    }
}

pub type EntitlementResult<T> = Result<T, EntitlementError>;
