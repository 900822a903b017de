//! Audit record for an approved change request.
//!
//! Pure data. Turning a record into an email or PDF is left to the host.
use crate::party::Party;
use crate::request::{Change, ChangeKind, ChangeRequest};
use crate::time::{Day, TimeStamp};
use chrono::Utc;

/// One line of the before/after table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRow {
    pub date: Day,
    pub title: String,
    pub party: Party,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participants {
    pub requester_id: String,
    pub requester_name: String,
    pub approver_id: String,
    pub approver_name: String,
    pub requested_at: TimeStamp<Utc>,
    pub approved_at: TimeStamp<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentationRecord {
    pub request_id: String,
    pub kind: ChangeKind,
    pub reason: String,
    pub generated_at: TimeStamp<Utc>,
    pub before_state: Vec<StateRow>,
    pub after_state: Vec<StateRow>,
    pub consequences: Vec<String>,
    pub participants: Participants,
    pub disclaimer_text: String,
    pub digest: String, // sha256 over the canonical text of everything above
}

// where each row ends up once the change is applied
fn after_state(change: &Change, before: &[StateRow]) -> Vec<StateRow> {
    let mut after: Vec<StateRow> = match *change {
        Change::Swap { source, target } => before
            .iter()
            .map(|row| {
                let date = if row.date == source {
                    target
                } else if row.date == target {
                    source
                } else {
                    row.date
                };
                StateRow { date, ..row.clone() }
            })
            .collect(),
        Change::Move { source, target } => before
            .iter()
            .map(|row| StateRow {
                date: if row.date == source { target } else { row.date },
                ..row.clone()
            })
            .collect(),
        Change::Cancel { source } => before.iter().filter(|row| row.date != source).cloned().collect(),
    };
    after.sort_by_key(|row| row.date);
    after
}

impl DocumentationRecord {
    fn canonical_text(&self) -> String {
        let mut text = format!(
            "request={}\nkind={}\nreason={}\ngenerated_at={}\n",
            self.request_id,
            self.kind.as_str(),
            self.reason,
            self.generated_at
        );
        for row in &self.before_state {
            text.push_str(&format!("before={} {} {}\n", row.date, row.party, row.title));
        }
        for row in &self.after_state {
            text.push_str(&format!("after={} {} {}\n", row.date, row.party, row.title));
        }
        for line in &self.consequences {
            text.push_str(&format!("consequence={line}\n"));
        }
        let p = &self.participants;
        text.push_str(&format!(
            "requested_by={} ({}) at {}\napproved_by={} ({}) at {}\n",
            p.requester_name, p.requester_id, p.requested_at, p.approver_name, p.approver_id, p.approved_at
        ));
        text.push_str(&self.disclaimer_text);
        text
    }

    /// Recompute the digest and compare, detecting edits after rendering.
    pub fn verify(&self) -> bool {
        sha256::digest(self.canonical_text().as_bytes()) == self.digest
    }
}

/// Render the record for `request`, approved with `consequences`.
///
/// `before` is the table as it stood at approval; the after table is derived
/// from the change.
pub fn render(
    request: &ChangeRequest,
    consequences: &[String],
    participants: Participants,
    before: Vec<StateRow>,
    disclaimer_text: &str,
) -> DocumentationRecord {
    let after = after_state(request.change(), &before);

    let mut record = DocumentationRecord {
        request_id: request.id.clone(),
        kind: request.change().kind(),
        reason: request.proposal.reason.clone(),
        generated_at: participants.approved_at.clone(),
        before_state: before,
        after_state: after,
        consequences: consequences.to_vec(),
        participants,
        disclaimer_text: disclaimer_text.to_string(),
        digest: String::new(),
    };
    record.digest = sha256::digest(record.canonical_text().as_bytes());
    record
}
