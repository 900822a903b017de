//! The parties a custody day can belong to
use std::fmt;
use std::str::FromStr;

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Party {
    #[n(0)]
    PartyA,
    #[n(1)]
    PartyB,
    #[n(2)]
    Both,
    #[n(3)]
    Unknown,
}

impl Party {
    /// The other single party. `Both` and `Unknown` have no counterpart.
    pub fn counterpart(&self) -> Option<Party> {
        match self {
            Party::PartyA => Some(Party::PartyB),
            Party::PartyB => Some(Party::PartyA),
            Party::Both | Party::Unknown => None,
        }
    }
    pub fn is_single(&self) -> bool {
        matches!(self, Party::PartyA | Party::PartyB)
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Party::PartyA => "party-a",
            Party::PartyB => "party-b",
            Party::Both => "both",
            Party::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

impl FromStr for Party {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "party-a" | "partya" => Ok(Party::PartyA),
            "b" | "party-b" | "partyb" => Ok(Party::PartyB),
            "both" => Ok(Party::Both),
            other => Err(format!("unrecognised party `{other}`")),
        }
    }
}

/// Display names for the two parties, as held by the family profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyNames {
    pub party_a: String,
    pub party_b: String,
}

impl PartyNames {
    pub fn new(party_a: impl Into<String>, party_b: impl Into<String>) -> Self {
        Self {
            party_a: party_a.into(),
            party_b: party_b.into(),
        }
    }
    pub fn name_of(&self, party: Party) -> String {
        match party {
            Party::PartyA => self.party_a.clone(),
            Party::PartyB => self.party_b.clone(),
            Party::Both => format!("{} and {}", self.party_a, self.party_b),
            Party::Unknown => "Unassigned".into(),
        }
    }
}
