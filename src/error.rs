use thiserror::Error;

/// Every fallible operation in the protocol core returns this. All variants
/// are session-fatal: once any of them is produced, the transcript is
/// invalid and the session holding it must be discarded (spec §7).
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("ZK proof verification failed")]
    InvalidProof,

    #[error("commitment decommitment failed")]
    InvalidCommitment,

    #[error("tumbler's partial signature does not verify")]
    BadPartialSig,

    #[error("combined pre-signature does not verify against its committed nonce")]
    BadPresignature,

    #[error("puzzle solution does not yield a valid signature")]
    BadSolution,

    #[error("underlying primitive failed: {0}")]
    CryptoError(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("handler invoked with missing state or wrong phase: {0}")]
    StateError(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
