//! Counter-proposals offered after a change request is rejected
use crate::request::{Change, ChangeRequest};
use crate::time::Day;

// how far the different-date suggestion shifts a swap
const SHIFT_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionKind {
    PartialSwap,
    DifferentDate,
    MakeupTime,
    JointAttendance,
    BetterTiming,
    CommunicationAssist,
    Reschedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Impact {
    Minimal,
    Low,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternativeSuggestion {
    pub kind: SuggestionKind,
    pub title: String,
    pub description: String,
    pub impact: Impact,
    pub action_hint: String,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::PartialSwap => "partial-swap",
            SuggestionKind::DifferentDate => "different-date",
            SuggestionKind::MakeupTime => "makeup-time",
            SuggestionKind::JointAttendance => "joint-attendance",
            SuggestionKind::BetterTiming => "better-timing",
            SuggestionKind::CommunicationAssist => "communication-assist",
            SuggestionKind::Reschedule => "reschedule",
        }
    }
}

impl AlternativeSuggestion {
    fn new(kind: SuggestionKind, title: &str, description: String, impact: Impact, action_hint: &str) -> Self {
        Self {
            kind,
            title: title.into(),
            description,
            impact,
            action_hint: action_hint.into(),
        }
    }
}

fn shifted(day: Day) -> String {
    day.offset(SHIFT_DAYS)
        .map(|d| d.to_string())
        .unwrap_or_else(|| "a later week".into())
}

/// Templated alternatives for a rejected request. Stable for a given request.
pub fn generate(rejected: &ChangeRequest) -> Vec<AlternativeSuggestion> {
    match *rejected.change() {
        Change::Swap { source, target } => vec![
            AlternativeSuggestion::new(
                SuggestionKind::PartialSwap,
                "Swap part of the block",
                format!("Trade only part of {source} for part of {target} instead of the whole block."),
                Impact::Low,
                "Propose a shorter swap covering half the period",
            ),
            AlternativeSuggestion::new(
                SuggestionKind::DifferentDate,
                "Try the following week",
                format!(
                    "Ask for the same swap seven days later: {} with {}.",
                    shifted(source),
                    shifted(target)
                ),
                Impact::Minimal,
                "Resubmit the swap shifted by one week",
            ),
            AlternativeSuggestion::new(
                SuggestionKind::MakeupTime,
                "Offer makeup time",
                format!("Keep {source} as scheduled and offer a weekday block to compensate."),
                Impact::Medium,
                "Propose a makeup weekday block",
            ),
        ],
        Change::Move { source, target } => vec![
            AlternativeSuggestion::new(
                SuggestionKind::JointAttendance,
                "Attend together",
                format!("Keep the event on {source} and attend it jointly instead of moving it to {target}."),
                Impact::Minimal,
                "Suggest both parents attend on the original date",
            ),
            AlternativeSuggestion::new(
                SuggestionKind::BetterTiming,
                "Pick a quieter day",
                format!("Look for a day near {target} with nothing else scheduled."),
                Impact::Low,
                "Check the calendar for an open day and resubmit",
            ),
            AlternativeSuggestion::new(
                SuggestionKind::CommunicationAssist,
                "Talk it through",
                "Share more context about why the move matters before resubmitting.".into(),
                Impact::Low,
                "Send a message explaining the reason for the move",
            ),
        ],
        Change::Cancel { source } => vec![
            AlternativeSuggestion::new(
                SuggestionKind::Reschedule,
                "Reschedule instead",
                format!("Move {source} to another day rather than cancelling it."),
                Impact::Low,
                "Submit a move request instead of a cancellation",
            ),
            AlternativeSuggestion::new(
                SuggestionKind::MakeupTime,
                "Calculate makeup time",
                format!("Work out the time lost by cancelling {source} and schedule it back."),
                Impact::Medium,
                "Propose makeup days for the cancelled time",
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ChangeProposal;
    use crate::time::TimeStamp;

    fn day(y: i32, m: u32, d: u32) -> Day {
        Day::from_ymd(y, m, d).unwrap()
    }

    fn request(proposal: ChangeProposal) -> ChangeRequest {
        ChangeRequest::pending("req1".into(), proposal, vec![], TimeStamp::new())
    }

    #[test]
    fn swap_alternatives() {
        let rejected = request(ChangeProposal::swap("u1", day(2024, 3, 5), day(2024, 3, 19), "trip"));
        let kinds: Vec<&str> = generate(&rejected).iter().map(|s| s.kind.as_str()).collect();

        assert_eq!(kinds, vec!["partial-swap", "different-date", "makeup-time"]);
    }

    #[test]
    fn different_date_is_a_week_later() {
        let rejected = request(ChangeProposal::swap("u1", day(2024, 3, 5), day(2024, 3, 19), "trip"));
        let shifted = &generate(&rejected)[1];

        assert_eq!(
            shifted.description,
            "Ask for the same swap seven days later: 2024-03-12 with 2024-03-26."
        );
        assert_eq!(shifted.impact, Impact::Minimal);
    }

    #[test]
    fn move_and_cancel_alternatives() {
        let moved = request(ChangeProposal::move_to("u1", day(2024, 3, 10), day(2024, 3, 12), "x"));
        let cancelled = request(ChangeProposal::cancel("u1", day(2024, 3, 10), "x"));

        let kinds: Vec<SuggestionKind> = generate(&moved).iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SuggestionKind::JointAttendance,
                SuggestionKind::BetterTiming,
                SuggestionKind::CommunicationAssist
            ]
        );

        let kinds: Vec<SuggestionKind> = generate(&cancelled).iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SuggestionKind::Reschedule, SuggestionKind::MakeupTime]);
    }

    #[test]
    fn stable_for_the_same_request() {
        let rejected = request(ChangeProposal::cancel("u1", day(2024, 3, 10), "x"));
        assert_eq!(generate(&rejected), generate(&rejected));
    }
}
