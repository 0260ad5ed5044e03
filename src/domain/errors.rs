use thiserror::Error;

use super::documents::DocumentSlot;
use super::models::PaymentStatus;

/// Reasons an encoded document is refused before it reaches the state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("document is not a data URI")]
    NotDataUri,
    #[error("data URI has no media type")]
    MissingMediaType,
    #[error("data URI is not base64 encoded")]
    NotBase64,
    #[error("document has no content")]
    Empty,
    #[error("document content is corrupt: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("step {0} is outside the wizard (1-7)")]
    InvalidStep(u8),
    #[error("payment status cannot move from {from} to {to}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("{slot} could not be attached: {source}")]
    Document {
        slot: DocumentSlot,
        #[source]
        source: DocumentError,
    },
}

pub type StateResult<T> = Result<T, StateError>;
