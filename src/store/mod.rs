//! Collaborators the engine is handed: event storage, request storage and
//! the family profile.
//!
//! The engine only talks to these traits. [`SledStore`] backs both storage
//! traits with one sled database; [`FamilyProfile`] is a plain in-memory
//! profile.
use crate::calendar::{CalendarEvent, EventPatch};
use crate::error::StoreResult;
use crate::party::{Party, PartyNames};
use crate::pattern::SchedulePattern;
use crate::request::{ChangeRequest, RequestFilter, RequestStatus, StatusUpdate};
use crate::time::Day;

mod sled_store;

pub use sled_store::SledStore;

pub trait EventRepository {
    /// Events in the month plus the adjacent-month edges, ordered by date.
    fn list_events_for_month(&self, year: i32, month: u32) -> StoreResult<Vec<CalendarEvent>>;
    fn get_event(&self, id: &str) -> StoreResult<CalendarEvent>;
    fn create_event(&self, event: CalendarEvent) -> StoreResult<CalendarEvent>;
    fn update_event(&self, id: &str, patch: &EventPatch) -> StoreResult<CalendarEvent>;
    fn delete_event(&self, id: &str) -> StoreResult<()>;
}

pub trait ChangeRequestRepository {
    fn list(&self, filter: &RequestFilter) -> StoreResult<Vec<ChangeRequest>>;
    fn get(&self, id: &str) -> StoreResult<ChangeRequest>;
    fn create(&self, request: ChangeRequest) -> StoreResult<ChangeRequest>;
    /// Compare-and-swap on the status: applies `update` only if the stored
    /// status is still `expected`, else [`crate::error::StoreError::StatusConflict`].
    fn update_status(
        &self,
        id: &str,
        expected: RequestStatus,
        update: &StatusUpdate,
    ) -> StoreResult<ChangeRequest>;
    /// [`ChangeRequestRepository::update_status`] together with the event
    /// writes an approval implies. Either everything lands or nothing does.
    fn apply_approval(
        &self,
        id: &str,
        expected: RequestStatus,
        update: &StatusUpdate,
        changes: &[EventChange],
    ) -> StoreResult<ChangeRequest>;
}

/// One event write carried out as part of an approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventChange {
    Create(CalendarEvent),
    Move { id: String, to: Day },
    Delete { id: String },
}

pub trait FamilyProfileProvider {
    fn schedule_pattern(&self) -> SchedulePattern;
    fn party_names(&self) -> PartyNames;
    /// The party a family member acts as. `None` for outsiders.
    fn party_of(&self, user_id: &str) -> Option<Party>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyProfile {
    pub pattern: SchedulePattern,
    pub party_a: Member,
    pub party_b: Member,
}

impl Member {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
        }
    }
}

impl FamilyProfile {
    pub fn new(pattern: SchedulePattern, party_a: Member, party_b: Member) -> Self {
        Self {
            pattern,
            party_a,
            party_b,
        }
    }
}

impl FamilyProfileProvider for FamilyProfile {
    fn schedule_pattern(&self) -> SchedulePattern {
        self.pattern.clone()
    }
    fn party_names(&self) -> PartyNames {
        PartyNames::new(self.party_a.name.clone(), self.party_b.name.clone())
    }
    fn party_of(&self, user_id: &str) -> Option<Party> {
        if user_id == self.party_a.user_id {
            Some(Party::PartyA)
        } else if user_id == self.party_b.user_id {
            Some(Party::PartyB)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_map_to_parties() {
        let profile = FamilyProfile::new(
            SchedulePattern::unknown(),
            Member::new("user_a", "Alex"),
            Member::new("user_b", "Sam"),
        );

        assert_eq!(profile.party_of("user_a"), Some(Party::PartyA));
        assert_eq!(profile.party_of("user_b"), Some(Party::PartyB));
        assert_eq!(profile.party_of("someone"), None);
        assert_eq!(profile.party_names().name_of(Party::PartyB), "Sam");
    }
}
