//! Change requests and their one-way lifecycle
use crate::error::EngineError;
use crate::time::{Day, TimeStamp};
use chrono::Utc;
use std::fmt;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Swap,
    Move,
    Cancel,
}

/// The proposed change. Dates a kind does not use are not representable.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    #[n(0)]
    Swap {
        #[n(0)]
        source: Day,
        #[n(1)]
        target: Day,
    },
    #[n(1)]
    Move {
        #[n(0)]
        source: Day,
        #[n(1)]
        target: Day,
    },
    #[n(2)]
    Cancel {
        #[n(0)]
        source: Day,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Approve,
    Reject,
}

/// What a requester submits.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ChangeProposal {
    #[n(0)]
    pub change: Change,
    #[n(1)]
    pub requester_id: String,
    #[n(2)]
    pub subject_event_id: Option<String>, // event being changed, if it is stored
    #[n(3)]
    pub reason: String,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    #[n(0)]
    pub id: String, // bech32 encoded uuid7, `req1...`
    #[n(1)]
    pub proposal: ChangeProposal,
    #[n(2)]
    pub status: RequestStatus,
    #[n(3)]
    pub consequences: Vec<String>,
    #[n(4)]
    pub created_at: TimeStamp<Utc>,
    #[n(5)]
    pub resolver_id: Option<String>,
    #[n(6)]
    pub resolved_at: Option<TimeStamp<Utc>>,
}

/// The fields a resolution writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub decision: Decision,
    pub resolver_id: String,
    pub resolved_at: TimeStamp<Utc>,
    pub consequences: Option<Vec<String>>, // replaces the stored list when set
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub requester_id: Option<String>,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Swap => "swap",
            ChangeKind::Move => "move",
            ChangeKind::Cancel => "cancel",
        }
    }
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Swap { .. } => ChangeKind::Swap,
            Change::Move { .. } => ChangeKind::Move,
            Change::Cancel { .. } => ChangeKind::Cancel,
        }
    }
    pub fn source_date(&self) -> Day {
        match self {
            Change::Swap { source, .. } | Change::Move { source, .. } | Change::Cancel { source } => {
                *source
            }
        }
    }
    pub fn target_date(&self) -> Option<Day> {
        match self {
            Change::Swap { target, .. } | Change::Move { target, .. } => Some(*target),
            Change::Cancel { .. } => None,
        }
    }
    /// Every date the change touches, source first.
    pub fn dates(&self) -> Vec<Day> {
        let mut dates = vec![self.source_date()];
        dates.extend(self.target_date());
        dates
    }
}

impl Decision {
    pub fn status(&self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        }
    }
}

impl ChangeProposal {
    pub fn new(change: Change, requester_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            change,
            requester_id: requester_id.into(),
            subject_event_id: None,
            reason: reason.into(),
        }
    }
    pub fn swap(requester_id: impl Into<String>, source: Day, target: Day, reason: impl Into<String>) -> Self {
        Self::new(Change::Swap { source, target }, requester_id, reason)
    }
    pub fn move_to(requester_id: impl Into<String>, source: Day, target: Day, reason: impl Into<String>) -> Self {
        Self::new(Change::Move { source, target }, requester_id, reason)
    }
    pub fn cancel(requester_id: impl Into<String>, source: Day, reason: impl Into<String>) -> Self {
        Self::new(Change::Cancel { source }, requester_id, reason)
    }
    pub fn with_subject(mut self, event_id: impl Into<String>) -> Self {
        self.subject_event_id = Some(event_id.into());
        self
    }
}

impl ChangeRequest {
    pub fn pending(
        id: String,
        proposal: ChangeProposal,
        consequences: Vec<String>,
        created_at: TimeStamp<Utc>,
    ) -> Self {
        Self {
            id,
            proposal,
            status: RequestStatus::Pending,
            consequences,
            created_at,
            resolver_id: None,
            resolved_at: None,
        }
    }
    pub fn requester_id(&self) -> &str {
        &self.proposal.requester_id
    }
    pub fn change(&self) -> &Change {
        &self.proposal.change
    }

    /// The request after `update`. Only a pending request can move, and only
    /// to a terminal status.
    pub fn transition(&self, update: &StatusUpdate) -> Result<ChangeRequest, EngineError> {
        if self.status.is_terminal() {
            return Err(EngineError::AlreadyResolved {
                id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(self.applied(update))
    }

    // unchecked, the caller has verified the status
    pub(crate) fn applied(&self, update: &StatusUpdate) -> ChangeRequest {
        let mut next = self.clone();
        next.status = update.decision.status();
        next.resolver_id = Some(update.resolver_id.clone());
        next.resolved_at = Some(update.resolved_at.clone());
        if let Some(consequences) = &update.consequences {
            next.consequences = consequences.clone();
        }
        next
    }
}

impl StatusUpdate {
    pub fn new(decision: Decision, resolver_id: impl Into<String>, resolved_at: TimeStamp<Utc>) -> Self {
        Self {
            decision,
            resolver_id: resolver_id.into(),
            resolved_at,
            consequences: None,
        }
    }
    pub fn with_consequences(mut self, consequences: Vec<String>) -> Self {
        self.consequences = Some(consequences);
        self
    }
}

impl RequestFilter {
    pub fn matches(&self, request: &ChangeRequest) -> bool {
        self.status.is_none_or(|s| s == request.status)
            && self
                .requester_id
                .as_deref()
                .is_none_or(|r| r == request.requester_id())
    }
}
