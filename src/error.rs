//! Error taxonomy for the engine.
//!
//! Error kinds: invalid input, resource exhaustion, I/O, corruption,
//! cluster, and logic errors. Every fallible engine API returns
//! `Result<T, EngineError>`.

use std::fmt;

/// Stable error code enum. Numeric values are not part of any external
/// contract (unlike the wire protocol's packet ids) but are kept small and
/// stable within a process run so they can be logged and compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Invalid input
    SizesOfColumnsDoesntMatch,
    ParameterOutOfBound,
    IllegalColumnConstruction,
    UnknownIdentifier,
    TypeMismatch,
    UnsupportedMethod,
    StorageRequiresParameter,
    // Resource exhaustion
    MemoryLimitExceeded,
    TooManyRows,
    TooManyParts,
    SetSizeLimitExceeded,
    QuotaExpired,
    TimeoutExceeded,
    // I/O
    CannotOpenFile,
    CannotReadFromSocket,
    CannotWriteToSocket,
    AttemptToReadAfterEof,
    NetworkError,
    SocketTimeout,
    // Corruption
    ChecksumMismatch,
    TooLargeSizeCompressed,
    CannotDecompress,
    BadDataPartName,
    NoFileInDataPart,
    BadSizeOfFileInDataPart,
    UnexpectedFileInDataPart,
    // Cluster / replication
    NoCoordinationService,
    LeadershipLost,
    AllConnectionTriesFailed,
    UnexpectedCoordinationError,
    TooFewLiveReplicas,
    UnsatisfiedQuorumForPreviousWrite,
    ReplicaIsAlreadyActive,
    AllReplicasLost,
    SessionExpired,
    BadVersion,
    SystemError,
    // Logic
    LogicalError,
    NotImplemented,
}

impl ErrorCode {
    pub fn kind(self) -> &'static str {
        use ErrorCode::*;
        match self {
            SizesOfColumnsDoesntMatch | ParameterOutOfBound | IllegalColumnConstruction
            | UnknownIdentifier | TypeMismatch | UnsupportedMethod | StorageRequiresParameter => "invalid_input",
            MemoryLimitExceeded | TooManyRows | TooManyParts | SetSizeLimitExceeded
            | QuotaExpired | TimeoutExceeded => "resource_exhaustion",
            CannotOpenFile | CannotReadFromSocket | CannotWriteToSocket
            | AttemptToReadAfterEof | NetworkError | SocketTimeout => "io",
            ChecksumMismatch | TooLargeSizeCompressed | CannotDecompress | BadDataPartName
            | NoFileInDataPart | BadSizeOfFileInDataPart | UnexpectedFileInDataPart => {
                "corruption"
            }
            NoCoordinationService
            | LeadershipLost
            | AllConnectionTriesFailed
            | UnexpectedCoordinationError
            | TooFewLiveReplicas
            | UnsatisfiedQuorumForPreviousWrite
            | ReplicaIsAlreadyActive
            | AllReplicasLost
            | SessionExpired
            | BadVersion
            | SystemError => "cluster",
            LogicalError | NotImplemented => "logic",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The engine's single error type. Carries a stable code plus a free-form
/// message; never a caller-constructed backtrace (the `LogicalError` variant
/// exists precisely so bugs surface distinctly from user-caused failures).
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
}

impl EngineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn logical(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::LogicalError, message)
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::new(ErrorCode::CannotOpenFile, e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
