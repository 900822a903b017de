use crate::party::Party;
use crate::request::RequestStatus;
use crate::time::Day;

/// Flat classification of every failure and warning the engine reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidPattern,
    SameDateSwap,
    SameDateMove,
    NoOpSwap,
    NotCustodyDay,
    ResponsibilityMismatch,
    SelfApproval,
    AlreadyResolved,
    MissingReason,
    ConflictDetected, // informational, attached to consequences
    Unauthorized,
    RequiresChangeRequest,
    NotFound,
    Storage,
    Internal,
}

impl ErrorKind {
    /// Conflicts the caller should retry against fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::AlreadyResolved | ErrorKind::SelfApproval)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("schedule text `{0}` matches no known custody pattern")]
    Unrecognized(String),
    #[error("schedule text `{text}` matches several patterns: {candidates:?}")]
    Ambiguous {
        text: String,
        candidates: Vec<&'static str>,
    },
    #[error("`{0}` pattern requires an anchor date")]
    MissingAnchor(&'static str),
    #[error("anchor `{0}` is not a YYYY-MM-DD date")]
    InvalidAnchor(String),
    #[error("weekday map entry `{0}` is not of the form `mon:a`")]
    InvalidWeekdayMap(String),
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to encode record: {0}")]
    Encode(String),
    #[error("failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("{collection} `{id}` not found")]
    NotFound { collection: &'static str, id: String },
    #[error("{collection} `{id}` already exists")]
    Duplicate { collection: &'static str, id: String },
    #[error("change request `{id}` was modified concurrently")]
    StatusConflict { id: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),
    #[error("a swap needs two different dates, got {0} twice")]
    SameDateSwap(Day),
    #[error("the event is already on {0}")]
    SameDateMove(Day),
    #[error("{source_date} and {target_date} both belong to {party}; swapping them changes nothing")]
    NoOpSwap {
        source_date: Day,
        target_date: Day,
        party: Party,
    },
    #[error("{0} is not a custody day under the current schedule")]
    NotCustodyDay(Day),
    #[error("{date} belongs to {holder}; you cannot unilaterally assign it to {requested}")]
    ResponsibilityMismatch {
        date: Day,
        holder: Party,
        requested: Party,
    },
    #[error("the parent who created the request cannot approve it")]
    SelfApproval,
    #[error("change request `{id}` is already {status}")]
    AlreadyResolved { id: String, status: RequestStatus },
    #[error("a reason is required for every change request")]
    MissingReason,
    #[error("`{0}` is not a member of this family")]
    Unauthorized(String),
    #[error("only the creator may edit `{0}` directly; use a change request instead")]
    RequiresChangeRequest(String),
    #[error("{collection} `{id}` not found")]
    NotFound { collection: &'static str, id: String },
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidPattern(_) => ErrorKind::InvalidPattern,
            EngineError::SameDateSwap(_) => ErrorKind::SameDateSwap,
            EngineError::SameDateMove(_) => ErrorKind::SameDateMove,
            EngineError::NoOpSwap { .. } => ErrorKind::NoOpSwap,
            EngineError::NotCustodyDay(_) => ErrorKind::NotCustodyDay,
            EngineError::ResponsibilityMismatch { .. } => ErrorKind::ResponsibilityMismatch,
            EngineError::SelfApproval => ErrorKind::SelfApproval,
            EngineError::AlreadyResolved { .. } => ErrorKind::AlreadyResolved,
            EngineError::MissingReason => ErrorKind::MissingReason,
            EngineError::Unauthorized(_) => ErrorKind::Unauthorized,
            EngineError::RequiresChangeRequest(_) => ErrorKind::RequiresChangeRequest,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::Store(_) => ErrorKind::Storage,
            EngineError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { collection, id } => EngineError::NotFound { collection, id },
            other => EngineError::Store(other),
        }
    }
}
