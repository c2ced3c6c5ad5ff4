use btcx_script::interpreter::InterpreterError;

use crate::check::ConsensusViolation;

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Truncated, oversized or non-canonical serialized transaction.
    #[error("malformed data: {0}")]
    MalformedData(String),
    /// The transaction does not fit the requested operation (e.g. an
    /// input index out of range).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// An error occurred during input signing.
    #[error("signing error: {0}")]
    SigningError(String),
    /// A whole-transaction consensus rule was broken.
    #[error("consensus rule violated: {0}")]
    ConsensusRule(ConsensusViolation),
    /// Script evaluation rejected an input.
    #[error("script verification failed: {0}")]
    Verify(#[from] InterpreterError),
    /// Several inputs failed script evaluation.
    #[error("{} inputs failed verification", .0.len())]
    InputsInvalid(Vec<(usize, InterpreterError)>),
    /// An underlying script error (forwarded from `btcx-script`).
    #[error("script error: {0}")]
    Script(#[from] btcx_script::ScriptError),
    /// An underlying primitives error (forwarded from `btcx-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] btcx_primitives::PrimitivesError),
}

impl From<ConsensusViolation> for TransactionError {
    fn from(v: ConsensusViolation) -> Self {
        TransactionError::ConsensusRule(v)
    }
}
