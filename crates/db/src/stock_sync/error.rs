use stockroom_core::images::{ImageError, ImageSlot};
use stockroom_core::types::DbId;

/// Failure of a stock aggregate operation.
///
/// Everything except [`StockSyncError::StorageFailure`] is raised before any
/// row is written.
#[derive(Debug, thiserror::Error)]
pub enum StockSyncError {
    #[error("Validation failed: {0}")]
    ValidationRejected(String),

    #[error("Invalid stock id: {0:?}")]
    InvalidIdentifier(String),

    #[error("Invalid request: {0}")]
    InvalidShape(String),

    #[error("Variant {variant_id} is missing its {slot}")]
    MissingImage { variant_id: DbId, slot: ImageSlot },

    #[error("Color name {color_name_id} does not exist")]
    InvalidColorReference { color_name_id: DbId },

    #[error("{variants} variant(s) need {expected} image file(s), received {received}")]
    FileCountMismatch {
        variants: usize,
        expected: usize,
        received: usize,
    },

    #[error("Stock not found: {0}")]
    StockNotFound(DbId),

    #[error("Invalid upload: {0}")]
    Upload(String),

    /// Storage failed part-way. `completed` lists the stages already written.
    #[error("Internal server error and {completed}.")]
    StorageFailure {
        completed: String,
        #[source]
        source: sqlx::Error,
    },
}

impl StockSyncError {
    /// `true` for errors caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StockSyncError::StorageFailure { .. })
    }
}

impl From<ImageError> for StockSyncError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::FileCount {
                variants,
                expected,
                received,
            } => StockSyncError::FileCountMismatch {
                variants,
                expected,
                received,
            },
            other => StockSyncError::Upload(other.to_string()),
        }
    }
}
