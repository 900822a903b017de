//! Calendar events as held by the event store
use crate::party::Party;
use crate::time::Day;

// adjacent-month context returned with a month listing
const PREVIOUS_MONTH_FROM_DAY: u32 = 25;
const NEXT_MONTH_TO_DAY: u32 = 7;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    #[n(0)]
    Custody,
    #[n(1)]
    Holiday,
    #[n(2)]
    School,
    #[n(3)]
    Medical,
    #[n(4)]
    Activity,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    #[n(0)]
    pub id: String, // bech32 encoded uuid7, `evt1...`
    #[n(1)]
    pub date: Day,
    #[n(2)]
    pub event_type: EventType,
    #[n(3)]
    pub title: String,
    #[n(4)]
    pub responsible_party: Option<Party>,
    #[n(5)]
    pub is_modifiable: bool,
    #[n(6)]
    pub creator_id: String,
}

/// An event as a caller proposes it, before it has an id or creator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub date: Day,
    pub event_type: EventType,
    pub title: String,
    pub responsible_party: Option<Party>,
    pub is_modifiable: bool,
}

/// Partial update for an event. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub date: Option<Day>,
    pub event_type: Option<EventType>,
    pub title: Option<String>,
    pub responsible_party: Option<Option<Party>>,
    pub is_modifiable: Option<bool>,
}

impl CalendarEvent {
    pub fn new(
        id: impl Into<String>,
        date: Day,
        event_type: EventType,
        title: impl Into<String>,
        creator_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            event_type,
            title: title.into(),
            responsible_party: None,
            is_modifiable: true,
            creator_id: creator_id.into(),
        }
    }
    pub fn with_party(mut self, party: Party) -> Self {
        self.responsible_party = Some(party);
        self
    }
    pub fn locked(mut self) -> Self {
        self.is_modifiable = false;
        self
    }
    pub fn is_custody(&self) -> bool {
        self.event_type == EventType::Custody
    }
    /// Apply `patch`, returning the resulting event.
    pub fn patched(&self, patch: &EventPatch) -> Self {
        let mut next = self.clone();
        if let Some(date) = patch.date {
            next.date = date;
        }
        if let Some(event_type) = patch.event_type {
            next.event_type = event_type;
        }
        if let Some(title) = &patch.title {
            next.title = title.clone();
        }
        if let Some(party) = patch.responsible_party {
            next.responsible_party = party;
        }
        if let Some(is_modifiable) = patch.is_modifiable {
            next.is_modifiable = is_modifiable;
        }
        next
    }
}

impl NewEvent {
    pub fn new(date: Day, event_type: EventType, title: impl Into<String>) -> Self {
        Self {
            date,
            event_type,
            title: title.into(),
            responsible_party: None,
            is_modifiable: true,
        }
    }
    pub fn with_party(mut self, party: Party) -> Self {
        self.responsible_party = Some(party);
        self
    }
    pub fn into_event(self, id: String, creator_id: &str) -> CalendarEvent {
        CalendarEvent {
            id,
            date: self.date,
            event_type: self.event_type,
            title: self.title,
            responsible_party: self.responsible_party,
            is_modifiable: self.is_modifiable,
            creator_id: creator_id.to_string(),
        }
    }
}

impl EventPatch {
    pub fn move_to(date: Day) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }
}

/// Whether `date` belongs in a listing for `month`, counting the last days of
/// the previous month and the first days of the next.
pub fn in_month_window(date: Day, year: i32, month: u32) -> bool {
    if date.year() == year && date.month() == month {
        return true;
    }
    let (prev_year, prev_month) = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };

    let is_prev = date.year() == prev_year && date.month() == prev_month;
    let is_next = date.year() == next_year && date.month() == next_month;

    (is_prev && date.day() >= PREVIOUS_MONTH_FROM_DAY) || (is_next && date.day() <= NEXT_MONTH_TO_DAY)
}

/// Events on exactly `date`, in input order.
pub fn events_on(events: &[CalendarEvent], date: Day) -> impl Iterator<Item = &CalendarEvent> {
    events.iter().filter(move |e| e.date == date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> Day {
        Day::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn month_window_includes_adjacent_edges() {
        assert!(in_month_window(day(2024, 3, 15), 2024, 3));
        assert!(in_month_window(day(2024, 2, 25), 2024, 3));
        assert!(!in_month_window(day(2024, 2, 24), 2024, 3));
        assert!(in_month_window(day(2024, 4, 7), 2024, 3));
        assert!(!in_month_window(day(2024, 4, 8), 2024, 3));
    }

    #[test]
    fn month_window_wraps_years() {
        assert!(in_month_window(day(2023, 12, 28), 2024, 1));
        assert!(in_month_window(day(2025, 1, 3), 2024, 12));
        assert!(!in_month_window(day(2023, 1, 3), 2024, 12));
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let event = CalendarEvent::new("evt1", day(2024, 3, 5), EventType::Medical, "Dentist", "u1")
            .with_party(Party::PartyA);

        let moved = event.patched(&EventPatch::move_to(day(2024, 3, 7)));
        assert_eq!(moved.date, day(2024, 3, 7));
        assert_eq!(moved.title, "Dentist");
        assert_eq!(moved.responsible_party, Some(Party::PartyA));

        let cleared = event.patched(&EventPatch {
            responsible_party: Some(None),
            ..EventPatch::default()
        });
        assert_eq!(cleared.responsible_party, None);
    }

    #[test]
    fn event_encoding() {
        let event = CalendarEvent::new("evt1", day(2024, 3, 5), EventType::Custody, "Weekend", "u1")
            .with_party(Party::PartyB)
            .locked();

        let encoding = minicbor::to_vec(&event).unwrap();
        let decode: CalendarEvent = minicbor::decode(&encoding).unwrap();

        assert_eq!(event, decode);
    }
}
