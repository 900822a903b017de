//! Downstream effects of a proposed change, as human-readable lines.
//!
//! The same computation serves the live preview (requester's perspective,
//! "You" / "Your co-parent") and the archived record (approver's perspective,
//! parties by name). Output is a pure function of the inputs, including order.
use crate::calendar::{CalendarEvent, EventType, events_on};
use crate::error::{EngineError, EngineResult};
use crate::overrides::effective_party;
use crate::party::{Party, PartyNames};
use crate::pattern::SchedulePattern;
use crate::request::{Change, ChangeProposal};
use crate::time::Day;
use std::fmt;

pub const BALANCE_WARNING: &str = "Monthly custody balance may be affected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective<'a> {
    /// Live UI for the parent proposing the change.
    Requester { party: Party },
    /// Archival wording, naming both parties.
    Approver { names: &'a PartyNames },
}

/// The event occupying a date for the purpose of a change. Days with no stored
/// custody event get a simulated one from the effective party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    pub event: CalendarEvent,
    pub party: Party,
    pub simulated: bool,
}

/// An event already on the date a `Move` lands on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub date: Day,
    pub event_id: String,
    pub title: String,
}

// day of month when every touched date shares a month, else `Mar 5`
struct DayLabels {
    same_month: bool,
}

impl DayLabels {
    fn for_change(change: &Change) -> Self {
        let dates = change.dates();
        let first = dates[0];
        Self {
            same_month: dates.iter().all(|d| d.same_month(&first)),
        }
    }
    fn label(&self, date: Day) -> String {
        if self.same_month {
            date.day().to_string()
        } else {
            date.date().format("%b %-d").to_string()
        }
    }
}

impl Perspective<'_> {
    fn who(&self, party: Party) -> String {
        match self {
            Perspective::Requester { party: own } => {
                if party == *own && own.is_single() {
                    "You".into()
                } else if own.counterpart() == Some(party) {
                    "Your co-parent".into()
                } else if party == Party::Both {
                    "Both of you".into()
                } else {
                    "Unassigned".into()
                }
            }
            Perspective::Approver { names } => names.name_of(party),
        }
    }
}

impl Occupant {
    fn real(event: &CalendarEvent, pattern: &SchedulePattern, events: &[CalendarEvent]) -> Self {
        let party = event
            .responsible_party
            .unwrap_or_else(|| effective_party(event.date, pattern, events));
        Self {
            event: event.clone(),
            party,
            simulated: false,
        }
    }

    fn simulated(date: Day, pattern: &SchedulePattern, events: &[CalendarEvent]) -> Self {
        let party = effective_party(date, pattern, events);
        let event = CalendarEvent::new(format!("simulated-{date}"), date, EventType::Custody, "Custody", "")
            .with_party(party);
        Self {
            event,
            party,
            simulated: true,
        }
    }
}

impl Conflict {
    /// The consequence line, with the date rendered as `date_label`.
    pub fn describe(&self, date_label: &str) -> String {
        format!("Conflict: {} already scheduled for {date_label}", self.title)
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(&self.date.to_string()))
    }
}

/// The custody occupant of `date`: a stored custody event, else a simulated one.
pub fn custody_occupant(date: Day, pattern: &SchedulePattern, events: &[CalendarEvent]) -> Occupant {
    let stored = events_on(events, date)
        .filter(|e| e.is_custody())
        .min_by_key(|e| e.responsible_party.is_none());

    match stored {
        Some(event) => Occupant::real(event, pattern, events),
        None => Occupant::simulated(date, pattern, events),
    }
}

/// The occupant a proposal changes on its source date.
///
/// A named subject must still be on the source date; it is never replaced
/// by another event or a simulated day.
pub fn subject_occupant(
    proposal: &ChangeProposal,
    pattern: &SchedulePattern,
    events: &[CalendarEvent],
) -> EngineResult<Occupant> {
    let source = proposal.change.source_date();

    if let Some(id) = proposal.subject_event_id.as_deref() {
        return events_on(events, source)
            .find(|e| e.id == id)
            .map(|event| Occupant::real(event, pattern, events))
            .ok_or_else(|| EngineError::NotFound {
                collection: "event",
                id: id.to_string(),
            });
    }
    let occupant = match proposal.change {
        Change::Move { .. } => match events_on(events, source).next() {
            Some(event) => Occupant::real(event, pattern, events),
            None => custody_occupant(source, pattern, events),
        },
        Change::Swap { .. } | Change::Cancel { .. } => custody_occupant(source, pattern, events),
    };
    Ok(occupant)
}

/// Events already on the landing date of a `Move`, other than the moved one.
pub fn conflicts(
    proposal: &ChangeProposal,
    pattern: &SchedulePattern,
    events: &[CalendarEvent],
) -> EngineResult<Vec<Conflict>> {
    let Change::Move { target, .. } = proposal.change else {
        return Ok(vec![]);
    };
    let subject = subject_occupant(proposal, pattern, events)?;

    Ok(events_on(events, target)
        .filter(|e| e.id != subject.event.id)
        .map(|e| Conflict {
            date: target,
            event_id: e.id.clone(),
            title: e.title.clone(),
        })
        .collect())
}

/// Human-readable effects of `proposal`.
pub fn compute(
    proposal: &ChangeProposal,
    events: &[CalendarEvent],
    pattern: &SchedulePattern,
    perspective: &Perspective<'_>,
    disruption_threshold_days: i64,
) -> EngineResult<Vec<String>> {
    let labels = DayLabels::for_change(&proposal.change);

    match proposal.change {
        Change::Swap { source, target } => {
            let a = subject_occupant(proposal, pattern, events)?;
            let b = custody_occupant(target, pattern, events);
            let (src, tgt) = (labels.label(source), labels.label(target));

            let mut lines = vec![
                format!("{} moves from {src} to {tgt}", a.event.title),
                format!("{} moves from {tgt} to {src}", b.event.title),
            ];

            // two stored blocks trading places carry no routine warnings
            if a.simulated || b.simulated {
                if target.is_weekday() && a.event.is_custody() {
                    lines.push(format!(
                        "{} will handle weekday pickup and dropoff on {tgt}",
                        perspective.who(a.party)
                    ));
                }
                let span = target.days_since(source).abs();
                if span > disruption_threshold_days {
                    lines.push(format!(
                        "This swap spans {span} days and may disrupt the children's routine"
                    ));
                }
            }

            for other in events_on(events, target).filter(|e| !e.is_custody()) {
                lines.push(format!(
                    "{} will take over {} on {tgt}",
                    perspective.who(a.party),
                    other.title
                ));
            }
            for other in events_on(events, source).filter(|e| !e.is_custody()) {
                lines.push(format!(
                    "{} will take over {} on {src}",
                    perspective.who(b.party),
                    other.title
                ));
            }
            Ok(lines)
        }
        Change::Move { source, target } => {
            let subject = subject_occupant(proposal, pattern, events)?;
            let mut lines = vec![format!(
                "{} moves from {} to {}",
                subject.event.title,
                labels.label(source),
                labels.label(target)
            )];
            for conflict in conflicts(proposal, pattern, events)? {
                lines.push(conflict.describe(&labels.label(conflict.date)));
            }
            Ok(lines)
        }
        Change::Cancel { source } => {
            let subject = subject_occupant(proposal, pattern, events)?;
            Ok(vec![
                format!("{} on {} is cancelled", subject.event.title, labels.label(source)),
                BALANCE_WARNING.to_string(),
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternKind;

    fn day(y: i32, m: u32, d: u32) -> Day {
        Day::from_ymd(y, m, d).unwrap()
    }

    fn weekly() -> SchedulePattern {
        SchedulePattern::cyclic(PatternKind::WeekOnWeekOff, day(2024, 1, 1))
    }

    fn requester_a() -> Perspective<'static> {
        Perspective::Requester {
            party: Party::PartyA,
        }
    }

    #[test]
    fn swap_between_stored_blocks_is_two_lines() {
        let events = vec![
            CalendarEvent::new("evt1", day(2024, 3, 5), EventType::Custody, "Weekend A", "u1")
                .with_party(Party::PartyA),
            CalendarEvent::new("evt2", day(2024, 3, 19), EventType::Custody, "Weekend B", "u2")
                .with_party(Party::PartyB),
        ];
        let proposal = ChangeProposal::swap("u1", day(2024, 3, 5), day(2024, 3, 19), "trip");

        let lines = compute(&proposal, &events, &weekly(), &requester_a(), 7).unwrap();
        assert_eq!(
            lines,
            vec![
                "Weekend A moves from 5 to 19".to_string(),
                "Weekend B moves from 19 to 5".to_string(),
            ]
        );
    }

    #[test]
    fn swap_onto_simulated_day_adds_routine_warnings() {
        // Tuesdays in consecutive weeks, PartyA then PartyB
        let proposal = ChangeProposal::swap("u1", day(2024, 1, 2), day(2024, 1, 9), "trip");

        let lines = compute(&proposal, &[], &weekly(), &requester_a(), 7).unwrap();
        assert_eq!(
            lines,
            vec![
                "Custody moves from 2 to 9".to_string(),
                "Custody moves from 9 to 2".to_string(),
                "You will handle weekday pickup and dropoff on 9".to_string(),
            ]
        );

        let far = ChangeProposal::swap("u1", day(2024, 1, 6), day(2024, 1, 27), "trip");
        let lines = compute(&far, &[], &weekly(), &requester_a(), 7).unwrap();
        assert_eq!(
            lines.last().unwrap(),
            "This swap spans 21 days and may disrupt the children's routine"
        );
    }

    #[test]
    fn swap_transfers_other_events_by_perspective() {
        let events = vec![
            CalendarEvent::new("evt3", day(2024, 1, 13), EventType::Activity, "Soccer", "u2")
                .with_party(Party::PartyB),
            CalendarEvent::new("evt4", day(2024, 1, 6), EventType::School, "Recital", "u1"),
        ];
        let proposal = ChangeProposal::swap("u1", day(2024, 1, 6), day(2024, 1, 13), "trip");

        let live = compute(&proposal, &events, &weekly(), &requester_a(), 7).unwrap();
        assert!(live.contains(&"You will take over Soccer on 13".to_string()));
        assert!(live.contains(&"Your co-parent will take over Recital on 6".to_string()));

        let names = PartyNames::new("Alex", "Sam");
        let archived = compute(
            &proposal,
            &events,
            &weekly(),
            &Perspective::Approver { names: &names },
            7,
        )
        .unwrap();
        assert!(archived.contains(&"Alex will take over Soccer on 13".to_string()));
        assert!(archived.contains(&"Sam will take over Recital on 6".to_string()));
    }

    #[test]
    fn move_reports_conflicts() {
        let events = vec![
            CalendarEvent::new("evt1", day(2024, 3, 10), EventType::Medical, "Dentist", "u1"),
            CalendarEvent::new("evt2", day(2024, 3, 12), EventType::Activity, "Soccer Practice", "u2"),
        ];
        let proposal =
            ChangeProposal::move_to("u1", day(2024, 3, 10), day(2024, 3, 12), "clinic closed")
                .with_subject("evt1");

        let lines = compute(&proposal, &events, &weekly(), &requester_a(), 7).unwrap();
        assert_eq!(
            lines,
            vec![
                "Dentist moves from 10 to 12".to_string(),
                "Conflict: Soccer Practice already scheduled for 12".to_string(),
            ]
        );
        assert_eq!(conflicts(&proposal, &weekly(), &events).unwrap().len(), 1);
    }

    #[test]
    fn cancel_warns_about_balance() {
        let proposal = ChangeProposal::cancel("u1", day(2024, 3, 10), "sick");
        let lines = compute(&proposal, &[], &weekly(), &requester_a(), 7).unwrap();

        assert_eq!(
            lines,
            vec!["Custody on 10 is cancelled".to_string(), BALANCE_WARNING.to_string()]
        );
    }

    #[test]
    fn labels_carry_month_across_months() {
        let proposal = ChangeProposal::move_to("u1", day(2024, 3, 30), day(2024, 4, 2), "travel");
        let lines = compute(&proposal, &[], &weekly(), &requester_a(), 7).unwrap();

        assert_eq!(lines[0], "Custody moves from Mar 30 to Apr 2");
    }

    #[test]
    fn output_is_deterministic() {
        let events = vec![
            CalendarEvent::new("evt3", day(2024, 1, 13), EventType::Activity, "Soccer", "u2"),
            CalendarEvent::new("evt5", day(2024, 1, 13), EventType::Medical, "Checkup", "u2"),
        ];
        let proposal = ChangeProposal::swap("u1", day(2024, 1, 6), day(2024, 1, 13), "trip");

        let first = compute(&proposal, &events, &weekly(), &requester_a(), 7).unwrap();
        let second = compute(&proposal, &events, &weekly(), &requester_a(), 7).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn named_subject_never_falls_back() {
        // the dentist appointment is no longer on the 10th
        let events = vec![
            CalendarEvent::new("evt2", day(2024, 3, 12), EventType::Activity, "Soccer Practice", "u2"),
        ];
        let proposal =
            ChangeProposal::move_to("u1", day(2024, 3, 10), day(2024, 3, 12), "clinic closed")
                .with_subject("evt1");

        let err = subject_occupant(&proposal, &weekly(), &events).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);

        let err = compute(&proposal, &events, &weekly(), &requester_a(), 7).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn conflict_lines_share_one_template() {
        let events = vec![
            CalendarEvent::new("evt1", day(2024, 3, 10), EventType::Medical, "Dentist", "u1"),
            CalendarEvent::new("evt2", day(2024, 4, 2), EventType::Activity, "Soccer Practice", "u2"),
        ];
        let proposal = ChangeProposal::move_to("u1", day(2024, 3, 10), day(2024, 4, 2), "travel")
            .with_subject("evt1");

        let found = conflicts(&proposal, &weekly(), &events).unwrap();
        let lines = compute(&proposal, &events, &weekly(), &requester_a(), 7).unwrap();

        assert_eq!(lines[1], found[0].describe("Apr 2"));
        assert_eq!(lines[1], "Conflict: Soccer Practice already scheduled for Apr 2");
        assert_eq!(
            found[0].to_string(),
            "Conflict: Soccer Practice already scheduled for 2024-04-02"
        );
    }
}
