//! Recurring custody patterns and the per-day resolution over them.
//!
//! Resolution is total: a malformed or unrecognised pattern resolves every
//! date to [`Party::Unknown`] and never fails. Problems are reported once, when
//! the pattern is parsed, and logged rather than returned.
use crate::error::PatternError;
use crate::party::Party;
use crate::time::Day;
use chrono::Weekday;
use log::warn;

use Party::{PartyA as A, PartyB as B};

// fixed two-week 2-2-3 rotation, slot 0 is the anchor date
const TWO_TWO_THREE: [Party; 14] = [A, A, B, B, A, A, A, B, B, A, A, B, B, B];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    TwoTwoThree,
    WeekOnWeekOff,
    CustomWeekdayMap,
    EqualAlternating,
    Unknown,
}

// keyword families used when classifying free agreement text
const KEYWORDS: [(PatternKind, &[&str]); 4] = [
    (PatternKind::TwoTwoThree, &["2-2-3"]),
    (
        PatternKind::WeekOnWeekOff,
        &["week-on", "week on", "alternating week"],
    ),
    (PatternKind::CustomWeekdayMap, &["custom"]),
    (PatternKind::EqualAlternating, &["50-50", "50/50", "equal"]),
];

impl PatternKind {
    pub fn tag(&self) -> &'static str {
        match self {
            PatternKind::TwoTwoThree => "2-2-3",
            PatternKind::WeekOnWeekOff => "week-on-week-off",
            PatternKind::CustomWeekdayMap => "custom-weekday-map",
            PatternKind::EqualAlternating => "equal-alternating",
            PatternKind::Unknown => "unknown",
        }
    }

    /// Exact match on a stored kind tag.
    pub fn from_tag(tag: &str) -> Result<Self, PatternError> {
        match tag.trim() {
            "2-2-3" => Ok(PatternKind::TwoTwoThree),
            "week-on-week-off" => Ok(PatternKind::WeekOnWeekOff),
            "custom-weekday-map" => Ok(PatternKind::CustomWeekdayMap),
            "equal-alternating" => Ok(PatternKind::EqualAlternating),
            "unknown" => Ok(PatternKind::Unknown),
            other => Err(PatternError::Unrecognized(other.to_string())),
        }
    }

    /// Classify free custody-agreement text, once, at ingestion.
    ///
    /// Text that hits keywords from more than one family is rejected as
    /// ambiguous instead of picking one.
    pub fn detect(text: &str) -> Result<Self, PatternError> {
        let lowered = text.to_ascii_lowercase();
        let matches: Vec<PatternKind> = KEYWORDS
            .iter()
            .filter(|(_, words)| words.iter().any(|w| lowered.contains(w)))
            .map(|(kind, _)| *kind)
            .collect();

        match matches.as_slice() {
            [] => Err(PatternError::Unrecognized(text.to_string())),
            [kind] => Ok(*kind),
            many => Err(PatternError::Ambiguous {
                text: text.to_string(),
                candidates: many.iter().map(PatternKind::tag).collect(),
            }),
        }
    }

    fn needs_anchor(&self) -> bool {
        matches!(
            self,
            PatternKind::TwoTwoThree | PatternKind::WeekOnWeekOff | PatternKind::EqualAlternating
        )
    }
}

/// Party per weekday, indexed Monday first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdayMap([Option<Party>; 7]);

impl WeekdayMap {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with(mut self, weekday: Weekday, party: Party) -> Self {
        self.0[weekday.num_days_from_monday() as usize] = Some(party);
        self
    }
    pub fn get(&self, weekday: Weekday) -> Option<Party> {
        self.0[weekday.num_days_from_monday() as usize]
    }
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Parses `mon:a, tue:b, sat:both`.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let mut map = Self::new();
        for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let invalid = || PatternError::InvalidWeekdayMap(entry.to_string());
            let (day, party) = entry.split_once(':').ok_or_else(invalid)?;
            let weekday: Weekday = day.trim().parse().map_err(|_| invalid())?;
            let party: Party = party.parse().map_err(|_| invalid())?;
            map = map.with(weekday, party);
        }
        Ok(map)
    }
}

/// Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchedulePattern {
    kind: PatternKind,
    anchor: Option<Day>,
    weekday_map: WeekdayMap,
}

impl SchedulePattern {
    /// A cyclic pattern starting at `anchor`, which is always a PartyA day.
    pub fn cyclic(kind: PatternKind, anchor: Day) -> Self {
        Self {
            kind,
            anchor: Some(anchor),
            weekday_map: WeekdayMap::new(),
        }
    }
    pub fn custom(weekday_map: WeekdayMap) -> Self {
        Self {
            kind: PatternKind::CustomWeekdayMap,
            anchor: None,
            weekday_map,
        }
    }
    pub fn unknown() -> Self {
        Self {
            kind: PatternKind::Unknown,
            anchor: None,
            weekday_map: WeekdayMap::new(),
        }
    }

    /// Build from the stored descriptor fields, failing on anything malformed.
    pub fn try_parse(
        kind_tag: &str,
        anchor: Option<&str>,
        weekday_map: Option<&str>,
    ) -> Result<Self, PatternError> {
        let kind = PatternKind::from_tag(kind_tag)?;
        let anchor = anchor
            .map(|a| a.parse::<Day>().map_err(|_| PatternError::InvalidAnchor(a.to_string())))
            .transpose()?;

        if kind.needs_anchor() && anchor.is_none() {
            return Err(PatternError::MissingAnchor(kind.tag()));
        }

        let weekday_map = match weekday_map {
            Some(text) => WeekdayMap::parse(text)?,
            None => WeekdayMap::new(),
        };

        Ok(Self {
            kind,
            anchor,
            weekday_map,
        })
    }

    /// Like [`SchedulePattern::try_parse`] but fails closed to the unknown
    /// pattern, logging the reason.
    pub fn parse(kind_tag: &str, anchor: Option<&str>, weekday_map: Option<&str>) -> Self {
        Self::try_parse(kind_tag, anchor, weekday_map).unwrap_or_else(|err| {
            warn!("event=pattern_parse module=pattern status=invalid kind=InvalidPattern error={err}");
            Self::unknown()
        })
    }

    /// Classify agreement text and anchor it, failing closed like [`SchedulePattern::parse`].
    pub fn from_agreement_text(text: &str, anchor: Day) -> Self {
        match PatternKind::detect(text) {
            Ok(PatternKind::CustomWeekdayMap) => {
                // the free text carries no weekday table to build the map from
                warn!("event=pattern_detect module=pattern status=invalid kind=InvalidPattern error=custom pattern needs an explicit weekday map");
                Self::unknown()
            }
            Ok(PatternKind::Unknown) => Self::unknown(),
            Ok(kind) => Self::cyclic(kind, anchor),
            Err(err) => {
                warn!("event=pattern_detect module=pattern status=invalid kind=InvalidPattern error={err}");
                Self::unknown()
            }
        }
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }
    pub fn anchor(&self) -> Option<Day> {
        self.anchor
    }
    pub fn weekday_map(&self) -> &WeekdayMap {
        &self.weekday_map
    }

    /// The party the pattern assigns to `date`.
    pub fn resolve(&self, date: Day) -> Party {
        match self.kind {
            PatternKind::TwoTwoThree => match self.anchor {
                Some(anchor) => {
                    let slot = date.days_since(anchor).rem_euclid(14) as usize;
                    TWO_TWO_THREE[slot]
                }
                None => Party::Unknown,
            },
            // equal-alternating shares the weekly rotation for now
            PatternKind::WeekOnWeekOff | PatternKind::EqualAlternating => match self.anchor {
                Some(anchor) => {
                    let week = date.days_since(anchor).div_euclid(7);
                    if week.rem_euclid(2) == 0 { A } else { B }
                }
                None => Party::Unknown,
            },
            PatternKind::CustomWeekdayMap => self
                .weekday_map
                .get(date.weekday())
                .unwrap_or(Party::Unknown),
            PatternKind::Unknown => Party::Unknown,
        }
    }
}

impl Default for SchedulePattern {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Free-function form of [`SchedulePattern::resolve`].
pub fn resolve(date: Day, pattern: &SchedulePattern) -> Party {
    pattern.resolve(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> Day {
        Day::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn two_two_three_rotation() {
        let pattern = SchedulePattern::cyclic(PatternKind::TwoTwoThree, day(2024, 1, 1));

        assert_eq!(pattern.resolve(day(2024, 1, 1)), Party::PartyA);
        assert_eq!(pattern.resolve(day(2024, 1, 3)), Party::PartyB);
        assert_eq!(pattern.resolve(day(2024, 1, 5)), Party::PartyA);
        assert_eq!(pattern.resolve(day(2024, 1, 15)), Party::PartyA);
    }

    #[test]
    fn two_two_three_before_anchor() {
        let pattern = SchedulePattern::cyclic(PatternKind::TwoTwoThree, day(2024, 1, 1));

        // 2023-12-31 is offset -1, slot 13
        assert_eq!(pattern.resolve(day(2023, 12, 31)), Party::PartyB);
        assert_eq!(pattern.resolve(day(2023, 12, 18)), Party::PartyA);
    }

    #[test]
    fn week_on_week_off() {
        let pattern = SchedulePattern::cyclic(PatternKind::WeekOnWeekOff, day(2024, 1, 1));

        assert_eq!(pattern.resolve(day(2024, 1, 4)), Party::PartyA);
        assert_eq!(pattern.resolve(day(2024, 1, 9)), Party::PartyB);
        assert_eq!(pattern.resolve(day(2024, 1, 16)), Party::PartyA);
        // the week before the anchor is odd
        assert_eq!(pattern.resolve(day(2023, 12, 31)), Party::PartyB);
    }

    #[test]
    fn equal_alternating_matches_weekly() {
        let weekly = SchedulePattern::cyclic(PatternKind::WeekOnWeekOff, day(2024, 1, 1));
        let equal = SchedulePattern::cyclic(PatternKind::EqualAlternating, day(2024, 1, 1));

        for offset in -30..30 {
            let d = day(2024, 1, 1).offset(offset).unwrap();
            assert_eq!(weekly.resolve(d), equal.resolve(d));
        }
    }

    #[test]
    fn custom_map_leaves_gaps_unknown() {
        let map = WeekdayMap::new()
            .with(Weekday::Mon, Party::PartyA)
            .with(Weekday::Sat, Party::Both);
        let pattern = SchedulePattern::custom(map);

        assert_eq!(pattern.resolve(day(2024, 1, 1)), Party::PartyA); // Monday
        assert_eq!(pattern.resolve(day(2024, 1, 6)), Party::Both); // Saturday
        assert_eq!(pattern.resolve(day(2024, 1, 2)), Party::Unknown);
    }

    #[test]
    fn malformed_descriptors_fail_closed() {
        let missing_anchor = SchedulePattern::parse("2-2-3", None, None);
        let garbage = SchedulePattern::parse("every other tuesday", Some("2024-01-01"), None);
        let bad_anchor = SchedulePattern::parse("week-on-week-off", Some("01/01/2024"), None);

        for pattern in [missing_anchor, garbage, bad_anchor] {
            assert_eq!(pattern.kind(), PatternKind::Unknown);
            assert_eq!(pattern.resolve(day(2024, 1, 1)), Party::Unknown);
        }
    }

    #[test]
    fn parses_weekday_map_descriptor() {
        let pattern =
            SchedulePattern::try_parse("custom-weekday-map", None, Some("mon:a, tue:b, sun:both"))
                .unwrap();

        assert_eq!(pattern.weekday_map().get(Weekday::Tue), Some(Party::PartyB));
        assert_eq!(pattern.weekday_map().get(Weekday::Sun), Some(Party::Both));
        assert!(matches!(
            WeekdayMap::parse("mon=a"),
            Err(PatternError::InvalidWeekdayMap(_))
        ));
    }

    #[test]
    fn detection_flags_ambiguous_text() {
        assert_eq!(
            PatternKind::detect("Standard 2-2-3 rotation").unwrap(),
            PatternKind::TwoTwoThree
        );
        assert_eq!(
            PatternKind::detect("Week on / week off").unwrap(),
            PatternKind::WeekOnWeekOff
        );

        let err = PatternKind::detect("custom 2-2-3 with holidays").unwrap_err();
        assert_eq!(
            err,
            PatternError::Ambiguous {
                text: "custom 2-2-3 with holidays".into(),
                candidates: vec!["2-2-3", "custom-weekday-map"],
            }
        );
        assert!(matches!(
            PatternKind::detect("whatever works"),
            Err(PatternError::Unrecognized(_))
        ));
    }

    #[test]
    fn agreement_text_without_clear_kind_is_unknown() {
        let anchor = day(2024, 1, 1);

        assert_eq!(
            SchedulePattern::from_agreement_text("50/50 split", anchor).kind(),
            PatternKind::EqualAlternating
        );
        assert_eq!(
            SchedulePattern::from_agreement_text("custom 2-2-3", anchor).kind(),
            PatternKind::Unknown
        );
    }
}
