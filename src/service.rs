//! Service layer API for custody resolution and the change-request workflow
use crate::calendar::{CalendarEvent, EventPatch, EventType, NewEvent, events_on};
use crate::config::EngineConfig;
use crate::consequences::{self, Occupant, Perspective, custody_occupant, subject_occupant};
use crate::documentation::{self, DocumentationRecord, Participants, StateRow};
use crate::error::{EngineError, EngineResult, ErrorKind, StoreError};
use crate::overrides::{self, check_assignment, effective_party};
use crate::party::Party;
use crate::pattern::SchedulePattern;
use crate::request::{
    Change, ChangeProposal, ChangeRequest, Decision, RequestFilter, RequestStatus, StatusUpdate,
};
use crate::store::{ChangeRequestRepository, EventChange, EventRepository, FamilyProfileProvider};
use crate::suggestions::{self, AlternativeSuggestion};
use crate::time::{Day, TimeStamp};
use crate::utils;
use log::{debug, info, warn};
use std::collections::BTreeMap;

pub struct CustodyService<E, R, F> {
    events: E,
    requests: R,
    profile: F,
    config: EngineConfig,
}

/// Result of deciding a change request. Approval carries the audit record,
/// rejection carries counter-proposals.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub request: ChangeRequest,
    pub documentation: Option<DocumentationRecord>,
    pub alternatives: Vec<AlternativeSuggestion>,
}

impl<E, R, F> CustodyService<E, R, F>
where
    E: EventRepository,
    R: ChangeRequestRepository,
    F: FamilyProfileProvider,
{
    pub fn new(events: E, requests: R, profile: F, config: EngineConfig) -> Self {
        Self {
            events,
            requests,
            profile,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn member_party(&self, user_id: &str) -> EngineResult<Party> {
        self.profile
            .party_of(user_id)
            .ok_or_else(|| EngineError::Unauthorized(user_id.to_string()))
    }

    fn display_name(&self, user_id: &str) -> String {
        match self.profile.party_of(user_id) {
            Some(party) => self.profile.party_names().name_of(party),
            None => user_id.to_string(),
        }
    }

    /// Every stored event in the months touching `dates`, ordered by date then id.
    fn events_around(&self, dates: &[Day]) -> EngineResult<Vec<CalendarEvent>> {
        let mut months: Vec<(i32, u32)> = dates.iter().map(|d| (d.year(), d.month())).collect();
        months.sort_unstable();
        months.dedup();

        let mut by_id = BTreeMap::new();
        for (year, month) in months {
            for event in self.events.list_events_for_month(year, month)? {
                by_id.insert(event.id.clone(), event);
            }
        }
        let mut events: Vec<CalendarEvent> = by_id.into_values().collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }

    /// Effective party for each day of the month.
    pub fn resolve_month(&self, year: i32, month: u32) -> EngineResult<BTreeMap<Day, Party>> {
        let pattern = self.profile.schedule_pattern();
        let events = self.events.list_events_for_month(year, month)?;
        Ok(overrides::resolve_month(year, month, &pattern, &events))
    }

    /// Consequences as the requester would see them before submitting.
    pub fn preview_consequences(&self, proposal: &ChangeProposal) -> EngineResult<Vec<String>> {
        let party = self.member_party(&proposal.requester_id)?;
        let pattern = self.profile.schedule_pattern();
        let events = self.events_around(&proposal.change.dates())?;

        consequences::compute(
            proposal,
            &events,
            &pattern,
            &Perspective::Requester { party },
            self.config.disruption_threshold_days,
        )
    }

    // checks against the current calendar, returning what the proposal changes
    fn validate(
        &self,
        proposal: &ChangeProposal,
        pattern: &SchedulePattern,
        events: &[CalendarEvent],
    ) -> EngineResult<Occupant> {
        let source = proposal.change.source_date();

        let subject = subject_occupant(proposal, pattern, events)?;
        if subject.event.is_custody() && subject.party == Party::Unknown {
            return Err(EngineError::NotCustodyDay(source));
        }

        if let Change::Swap { source, target } = proposal.change {
            let giving = subject.party;
            let taking = custody_occupant(target, pattern, events).party;
            if giving == taking {
                return Err(EngineError::NoOpSwap {
                    source_date: source,
                    target_date: target,
                    party: giving,
                });
            }
        }
        Ok(subject)
    }

    /// Submit a new change request for the counter-party to decide
    pub fn submit_change_request(&self, proposal: ChangeProposal) -> EngineResult<ChangeRequest> {
        if proposal.reason.trim().is_empty() {
            return Err(EngineError::MissingReason);
        }
        let party = self.member_party(&proposal.requester_id)?;

        match proposal.change {
            Change::Swap { source, target } if source == target => {
                return Err(EngineError::SameDateSwap(source));
            }
            Change::Move { source, target } if source == target => {
                return Err(EngineError::SameDateMove(source));
            }
            _ => {}
        }

        let pattern = self.profile.schedule_pattern();
        let events = self.events_around(&proposal.change.dates())?;
        let subject = self.validate(&proposal, &pattern, &events)?;

        // pin a stored subject so approval acts on this exact event
        let proposal = match proposal.subject_event_id {
            None if !subject.simulated => proposal.with_subject(subject.event.id),
            _ => proposal,
        };

        let lines = consequences::compute(
            &proposal,
            &events,
            &pattern,
            &Perspective::Requester { party },
            self.config.disruption_threshold_days,
        )?;
        for conflict in consequences::conflicts(&proposal, &pattern, &events)? {
            warn!(
                "event=conflict module=engine kind={:?} date={} existing={}",
                ErrorKind::ConflictDetected,
                conflict.date,
                conflict.event_id
            );
        }

        let id = utils::new_uuid_to_bech32(&self.config.request_id_prefix)?;
        let request = ChangeRequest::pending(id, proposal, lines, TimeStamp::new());
        let request = self.requests.create(request)?;

        info!(
            "event=request_submitted module=engine id={} kind={} requester={}",
            request.id,
            request.change().kind().as_str(),
            request.requester_id()
        );
        Ok(request)
    }

    // the status write, plus the event writes of an approval in the same step.
    // losing the compare-and-swap means someone else resolved it first
    fn commit(
        &self,
        request: &ChangeRequest,
        update: &StatusUpdate,
        changes: &[EventChange],
    ) -> EngineResult<ChangeRequest> {
        request.transition(update)?;

        let stored = match update.decision {
            Decision::Approve => {
                self.requests
                    .apply_approval(&request.id, RequestStatus::Pending, update, changes)
            }
            Decision::Reject => self
                .requests
                .update_status(&request.id, RequestStatus::Pending, update),
        };

        match stored {
            Ok(next) => Ok(next),
            Err(StoreError::StatusConflict { id }) => {
                let status = self
                    .requests
                    .get(&id)
                    .map(|r| r.status)
                    .unwrap_or(request.status);
                warn!("event=resolve_conflict module=engine id={id} status={status}");
                Err(EngineError::AlreadyResolved { id, status })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn before_state(
        &self,
        proposal: &ChangeProposal,
        subject: &Occupant,
        pattern: &SchedulePattern,
        events: &[CalendarEvent],
    ) -> Vec<StateRow> {
        let row = |o: &Occupant| StateRow {
            date: o.event.date,
            title: o.event.title.clone(),
            party: o.party,
        };
        let mut rows = vec![row(subject)];
        if let Change::Swap { target, .. } = proposal.change {
            rows.push(row(&custody_occupant(target, pattern, events)));
        }
        rows
    }

    // an occupant landing on `to`; simulated days become stored custody events
    fn relocation(&self, occupant: &Occupant, to: Day, creator_id: &str) -> EngineResult<EventChange> {
        if occupant.simulated {
            let id = utils::new_uuid_to_bech32(&self.config.event_id_prefix)?;
            let event = NewEvent::new(to, EventType::Custody, occupant.event.title.clone())
                .with_party(occupant.party)
                .into_event(id, creator_id);
            Ok(EventChange::Create(event))
        } else {
            Ok(EventChange::Move {
                id: occupant.event.id.clone(),
                to,
            })
        }
    }

    fn planned_changes(
        &self,
        request: &ChangeRequest,
        subject: &Occupant,
        pattern: &SchedulePattern,
        events: &[CalendarEvent],
    ) -> EngineResult<Vec<EventChange>> {
        let creator = request.requester_id();

        match *request.change() {
            Change::Swap { source, target } => {
                let other = custody_occupant(target, pattern, events);
                Ok(vec![
                    self.relocation(subject, target, creator)?,
                    self.relocation(&other, source, creator)?,
                ])
            }
            Change::Move { target, .. } => Ok(vec![self.relocation(subject, target, creator)?]),
            Change::Cancel { .. } if subject.simulated => {
                debug!(
                    "event=cancel_apply module=engine id={} status=skipped reason=no_stored_event",
                    request.id
                );
                Ok(vec![])
            }
            Change::Cancel { .. } => Ok(vec![EventChange::Delete {
                id: subject.event.id.clone(),
            }]),
        }
    }

    /// Approve or reject a pending change request
    pub fn decide_change_request(
        &self,
        request_id: &str,
        decision: Decision,
        resolver_id: &str,
    ) -> EngineResult<DecisionOutcome> {
        let request = self.requests.get(request_id)?;

        if request.status.is_terminal() {
            return Err(EngineError::AlreadyResolved {
                id: request.id,
                status: request.status,
            });
        }
        if resolver_id == request.requester_id() {
            return Err(EngineError::SelfApproval);
        }
        self.member_party(resolver_id)?;

        let resolved_at = TimeStamp::new();

        match decision {
            Decision::Approve => {
                let pattern = self.profile.schedule_pattern();
                let events = self.events_around(&request.change().dates())?;
                // the calendar may have changed since submission
                let subject = self.validate(&request.proposal, &pattern, &events)?;
                let names = self.profile.party_names();

                let lines = consequences::compute(
                    &request.proposal,
                    &events,
                    &pattern,
                    &Perspective::Approver { names: &names },
                    self.config.disruption_threshold_days,
                )?;
                let before = self.before_state(&request.proposal, &subject, &pattern, &events);
                let changes = self.planned_changes(&request, &subject, &pattern, &events)?;

                let update = StatusUpdate::new(Decision::Approve, resolver_id, resolved_at.clone())
                    .with_consequences(lines.clone());
                let approved = self.commit(&request, &update, &changes)?;

                let participants = Participants {
                    requester_id: approved.requester_id().to_string(),
                    requester_name: self.display_name(approved.requester_id()),
                    approver_id: resolver_id.to_string(),
                    approver_name: self.display_name(resolver_id),
                    requested_at: approved.created_at.clone(),
                    approved_at: resolved_at,
                };
                let documentation = documentation::render(
                    &approved,
                    &lines,
                    participants,
                    before,
                    &self.config.disclaimer_text,
                );

                info!(
                    "event=request_approved module=engine id={} resolver={} changes={} digest={}",
                    approved.id,
                    resolver_id,
                    changes.len(),
                    documentation.digest
                );
                Ok(DecisionOutcome {
                    request: approved,
                    documentation: Some(documentation),
                    alternatives: vec![],
                })
            }
            Decision::Reject => {
                let update = StatusUpdate::new(Decision::Reject, resolver_id, resolved_at);
                let rejected = self.commit(&request, &update, &[])?;
                let alternatives = suggestions::generate(&rejected);

                info!(
                    "event=request_rejected module=engine id={} resolver={} alternatives={}",
                    rejected.id,
                    resolver_id,
                    alternatives.len()
                );
                Ok(DecisionOutcome {
                    request: rejected,
                    documentation: None,
                    alternatives,
                })
            }
        }
    }

    /// The requester takes back their own pending request.
    pub fn withdraw_change_request(
        &self,
        request_id: &str,
        requester_id: &str,
    ) -> EngineResult<ChangeRequest> {
        let request = self.requests.get(request_id)?;

        if request.status.is_terminal() {
            return Err(EngineError::AlreadyResolved {
                id: request.id,
                status: request.status,
            });
        }
        if requester_id != request.requester_id() {
            return Err(EngineError::Unauthorized(requester_id.to_string()));
        }

        let update = StatusUpdate::new(Decision::Reject, requester_id, TimeStamp::new());
        let withdrawn = self.commit(&request, &update, &[])?;

        info!(
            "event=request_withdrawn module=engine id={} requester={}",
            withdrawn.id, requester_id
        );
        Ok(withdrawn)
    }

    pub fn list_change_requests(&self, filter: &RequestFilter) -> EngineResult<Vec<ChangeRequest>> {
        Ok(self.requests.list(filter)?)
    }

    // the responsibility rule, ignoring the event being rewritten
    fn check_event_assignment(&self, event: &CalendarEvent) -> EngineResult<()> {
        let pattern = self.profile.schedule_pattern();
        let others: Vec<CalendarEvent> = self
            .events_around(&[event.date])?
            .into_iter()
            .filter(|e| e.id != event.id)
            .collect();

        let effective = effective_party(event.date, &pattern, &others);
        check_assignment(event.date, event.event_type, event.responsible_party, effective)?;

        if event.is_custody() && events_on(&others, event.date).any(CalendarEvent::is_custody) {
            warn!(
                "event=conflict module=engine kind={:?} date={} title={}",
                ErrorKind::ConflictDetected,
                event.date,
                event.title
            );
        }
        Ok(())
    }

    /// Create an event directly, subject to the responsibility rule
    pub fn create_event(&self, new_event: NewEvent, actor_id: &str) -> EngineResult<CalendarEvent> {
        self.member_party(actor_id)?;

        let id = utils::new_uuid_to_bech32(&self.config.event_id_prefix)?;
        let event = new_event.into_event(id, actor_id);
        self.check_event_assignment(&event)?;

        let event = self.events.create_event(event)?;
        info!(
            "event=event_created module=engine id={} date={} creator={}",
            event.id, event.date, actor_id
        );
        Ok(event)
    }

    fn guard_direct_edit(&self, event: &CalendarEvent, actor_id: &str) -> EngineResult<()> {
        self.member_party(actor_id)?;
        if event.creator_id != actor_id || !event.is_modifiable {
            return Err(EngineError::RequiresChangeRequest(event.id.clone()));
        }
        Ok(())
    }

    /// Edit an event directly. Only its creator may, and only while it is modifiable.
    pub fn update_event(
        &self,
        event_id: &str,
        patch: &EventPatch,
        actor_id: &str,
    ) -> EngineResult<CalendarEvent> {
        let current = self.events.get_event(event_id)?;
        self.guard_direct_edit(&current, actor_id)?;
        self.check_event_assignment(&current.patched(patch))?;

        let updated = self.events.update_event(event_id, patch)?;
        info!("event=event_updated module=engine id={event_id} actor={actor_id}");
        Ok(updated)
    }

    pub fn delete_event(&self, event_id: &str, actor_id: &str) -> EngineResult<()> {
        let current = self.events.get_event(event_id)?;
        self.guard_direct_edit(&current, actor_id)?;

        self.events.delete_event(event_id)?;
        info!("event=event_deleted module=engine id={event_id} actor={actor_id}");
        Ok(())
    }

    /// Custody events in the month held by the user's party.
    pub fn swappable_events(&self, user_id: &str, year: i32, month: u32) -> EngineResult<Vec<CalendarEvent>> {
        let party = self.member_party(user_id)?;

        Ok(self
            .events
            .list_events_for_month(year, month)?
            .into_iter()
            .filter(|e| e.date.year() == year && e.date.month() == month)
            .filter(|e| e.is_custody() && e.responsible_party == Some(party))
            .collect())
    }
}
