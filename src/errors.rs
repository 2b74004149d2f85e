use sea_orm::error::DbErr;
use serde::Serialize;

/// Coarse classification of every engine failure.
///
/// Callers translating failures into user-visible messages only need to match on
/// this; the concrete [`ServiceError`] variant carries the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range input, rejected before any transaction opens.
    Validation,
    /// A referenced product, invoice, stock-in or sale does not exist.
    NotFound,
    /// A decrement would take a product's quantity below zero.
    InsufficientStock,
    /// The store could not complete or commit the unit of work.
    StorageFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {entity} {id}")]
    NotFound { entity: &'static str, id: i32 },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: i32,
        requested: i32,
        available: i32,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    pub fn not_found(entity: &'static str, id: i32) -> Self {
        ServiceError::NotFound { entity, id }
    }

    /// Units missing to satisfy the rejected decrement, zero for every other variant.
    pub fn shortfall(&self) -> i32 {
        match self {
            Self::InsufficientStock {
                requested,
                available,
                ..
            } => requested - available,
            _ => 0,
        }
    }

    /// Maps the error onto the engine's failure taxonomy.
    /// This is the single source of truth for error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::DatabaseError(_) | Self::SerializationError(_) | Self::InternalError(_) => {
                ErrorKind::StorageFailure
            }
        }
    }

    /// Expected outcomes of normal use, as opposed to faults worth alerting on.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::InsufficientStock
        )
    }

    /// Returns the error message suitable for showing to a cashier.
    /// Storage faults return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::SerializationError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}
