// Error types surfaced by the resolver and its collaborators

use thiserror::Error;

use crate::models::{BookingStatus, ListingId};

// Errors returned to callers of the resolver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Guest count {requested} exceeds listing capacity of {max_guests}")]
    CapacityExceeded { requested: u32, max_guests: u32 },

    #[error("Listing {listing_id} is not available for the selected dates")]
    DateConflict { listing_id: ListingId },

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Cancellation window closed ({hours_until_check_in}h until check-in)")]
    CancellationWindowClosed { hours_until_check_in: i64 },

    #[error("Storage did not respond within {0}ms")]
    StorageTimeout(u64),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl BookingError {
    pub fn listing_not_found(id: impl ToString) -> Self {
        BookingError::NotFound {
            entity: "listing",
            id: id.to_string(),
        }
    }

    pub fn booking_not_found(id: impl ToString) -> Self {
        BookingError::NotFound {
            entity: "booking",
            id: id.to_string(),
        }
    }

    // Only a timeout is worth retrying, and the caller owns the retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::StorageTimeout(_))
    }
}

// Errors reported by listing and booking stores
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    // An exclusion rule in the store rejected the write
    #[error("Write conflicts with listing {0}")]
    Conflict(ListingId),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => BookingError::NotFound {
                entity: "record",
                id,
            },
            StoreError::Conflict(listing_id) => BookingError::DateConflict { listing_id },
            StoreError::Backend(msg) => BookingError::Storage(msg),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
