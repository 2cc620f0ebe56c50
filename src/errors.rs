use serde::Serialize;
use validator::ValidationErrors;

/// Error type shared by the pricing engine, batch commands and the order
/// session. Calculation itself never fails (lenient parsing coerces bad input
/// to zero); errors come from policy checks, collaborators and configuration.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Save was blocked; every missing header field is reported at once.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// Duplicate-policy rejection. Local and non-fatal: the offending
    /// insert/update is dropped, the collection is untouched.
    #[error("Duplicate item: product {product_code} (ref \"{reference_code}\") is already in the order")]
    DuplicateItem {
        product_code: String,
        reference_code: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A collaborator lookup (price table, pricing policy, price history,
    /// reference codes, negotiated terms) failed in transport.
    #[error("Source error: {0}")]
    SourceError(String),

    /// Persistence sync failed; the in-memory order state is preserved so the
    /// caller can retry without data loss.
    #[error("Sync failed: {0}")]
    SyncFailed(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl ServiceError {
    /// Collapses a validator report into the all-at-once missing-field error
    /// used to block a save.
    pub fn missing_fields_from(errors: &ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|k| k.to_string())
            .collect();
        fields.sort();
        ServiceError::MissingFields(fields)
    }

    /// Convenience constructor for collaborator transport failures.
    pub fn source_error(message: impl Into<String>) -> Self {
        ServiceError::SourceError(message.into())
    }

    pub fn duplicate_item(product_code: impl Into<String>, reference_code: impl Into<String>) -> Self {
        ServiceError::DuplicateItem {
            product_code: product_code.into(),
            reference_code: reference_code.into(),
        }
    }

    /// True for rejections the UI surfaces inline rather than as failures.
    pub fn is_user_rejection(&self) -> bool {
        matches!(
            self,
            ServiceError::DuplicateItem { .. }
                | ServiceError::MissingFields(_)
                | ServiceError::Validation(_)
        )
    }
}
