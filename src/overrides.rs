//! Effective custody: stored custody events layered over the pattern
use crate::calendar::{CalendarEvent, EventType, events_on};
use crate::error::EngineError;
use crate::party::Party;
use crate::pattern::SchedulePattern;
use crate::time::Day;
use std::collections::BTreeMap;

/// The custody event that decides `date`, if one is stored.
pub fn custody_override(date: Day, events: &[CalendarEvent]) -> Option<&CalendarEvent> {
    events_on(events, date).find(|e| e.is_custody() && e.responsible_party.is_some())
}

/// The party actually responsible for `date`.
///
/// `events` may span more than `date`; only events on `date` are consulted.
pub fn effective_party(date: Day, pattern: &SchedulePattern, events: &[CalendarEvent]) -> Party {
    custody_override(date, events)
        .and_then(|e| e.responsible_party)
        .unwrap_or_else(|| pattern.resolve(date))
}

/// Effective party for every day of the month.
pub fn resolve_month(
    year: i32,
    month: u32,
    pattern: &SchedulePattern,
    events: &[CalendarEvent],
) -> BTreeMap<Day, Party> {
    Day::days_of_month(year, month)
        .into_iter()
        .map(|d| (d, effective_party(d, pattern, events)))
        .collect()
}

/// Write-path rule for assigning `party` to an event of `event_type` on a day
/// held by `effective`.
///
/// Custody events must name the effective holder (joint custody only on joint
/// days). Other event types may name anyone, including both parents. Days
/// with no resolvable holder accept any assignment.
pub fn check_assignment(
    date: Day,
    event_type: EventType,
    party: Option<Party>,
    effective: Party,
) -> Result<(), EngineError> {
    let Some(requested) = party else {
        return Ok(());
    };
    if event_type != EventType::Custody || effective == Party::Unknown || requested == effective {
        return Ok(());
    }
    Err(EngineError::ResponsibilityMismatch {
        date,
        holder: effective,
        requested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pattern::PatternKind;

    fn day(y: i32, m: u32, d: u32) -> Day {
        Day::from_ymd(y, m, d).unwrap()
    }

    fn weekly() -> SchedulePattern {
        SchedulePattern::cyclic(PatternKind::WeekOnWeekOff, day(2024, 1, 1))
    }

    #[test]
    fn custody_event_beats_pattern() {
        let events = vec![
            CalendarEvent::new("evt1", day(2024, 1, 2), EventType::Custody, "Custody", "u1")
                .with_party(Party::PartyB),
        ];

        assert_eq!(weekly().resolve(day(2024, 1, 2)), Party::PartyA);
        assert_eq!(effective_party(day(2024, 1, 2), &weekly(), &events), Party::PartyB);
        assert_eq!(effective_party(day(2024, 1, 3), &weekly(), &events), Party::PartyA);
    }

    #[test]
    fn non_custody_and_unassigned_events_do_not_override() {
        let events = vec![
            CalendarEvent::new("evt1", day(2024, 1, 2), EventType::Medical, "Dentist", "u1")
                .with_party(Party::PartyB),
            CalendarEvent::new("evt2", day(2024, 1, 2), EventType::Custody, "Custody", "u1"),
        ];

        assert_eq!(effective_party(day(2024, 1, 2), &weekly(), &events), Party::PartyA);
    }

    #[test]
    fn month_map_covers_every_day() {
        let events = vec![
            CalendarEvent::new("evt1", day(2024, 1, 20), EventType::Custody, "Custody", "u1")
                .with_party(Party::Both),
        ];
        let month = resolve_month(2024, 1, &weekly(), &events);

        assert_eq!(month.len(), 31);
        assert_eq!(month[&day(2024, 1, 1)], Party::PartyA);
        assert_eq!(month[&day(2024, 1, 8)], Party::PartyB);
        assert_eq!(month[&day(2024, 1, 20)], Party::Both);
    }

    #[test]
    fn unknown_pattern_yields_unknown_month() {
        let month = resolve_month(2024, 2, &SchedulePattern::unknown(), &[]);
        assert!(month.values().all(|p| *p == Party::Unknown));
    }

    #[test]
    fn custody_assignment_must_match_holder() {
        let date = day(2024, 1, 2);

        let err = check_assignment(date, EventType::Custody, Some(Party::PartyB), Party::PartyA)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponsibilityMismatch);

        let err = check_assignment(date, EventType::Custody, Some(Party::Both), Party::PartyA)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponsibilityMismatch);

        assert!(check_assignment(date, EventType::Custody, Some(Party::PartyA), Party::PartyA).is_ok());
        assert!(check_assignment(date, EventType::Custody, Some(Party::Both), Party::Both).is_ok());
        assert!(check_assignment(date, EventType::Custody, Some(Party::PartyB), Party::Unknown).is_ok());
    }

    #[test]
    fn joint_attendance_is_fine_for_other_events() {
        let date = day(2024, 1, 2);

        assert!(check_assignment(date, EventType::Medical, Some(Party::Both), Party::PartyA).is_ok());
        assert!(check_assignment(date, EventType::School, Some(Party::PartyB), Party::PartyA).is_ok());
    }
}
