//! sled-backed storage for events and change requests
use super::{ChangeRequestRepository, EventChange, EventRepository};
use crate::calendar::{CalendarEvent, EventPatch, in_month_window};
use crate::error::{StoreError, StoreResult};
use crate::request::{ChangeRequest, RequestFilter, RequestStatus, StatusUpdate};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError, TransactionalTree,
};
use sled::{Db, Transactional, Tree};
use std::sync::Arc;

const EVENTS_TREE: &str = "events";
const REQUESTS_TREE: &str = "change_requests";

/// Records are CBOR keyed by id, one tree per collection.
#[derive(Clone)]
pub struct SledStore {
    events: Tree,
    requests: Tree,
}

fn encode<T: minicbor::Encode<()>>(value: &T) -> StoreResult<Vec<u8>> {
    minicbor::to_vec(value).map_err(|e| StoreError::Encode(e.to_string()))
}

fn decode<'b, T: minicbor::Decode<'b, ()>>(bytes: &'b [u8]) -> StoreResult<T> {
    Ok(minicbor::decode(bytes)?)
}

fn abort<T>(err: StoreError) -> ConflictableTransactionResult<T, StoreError> {
    Err(ConflictableTransactionError::Abort(err))
}

fn event_not_found(id: &str) -> StoreError {
    StoreError::NotFound {
        collection: "event",
        id: id.to_string(),
    }
}

// one event write inside an approval transaction
fn apply_event_change(
    events: &TransactionalTree,
    change: &EventChange,
) -> ConflictableTransactionResult<(), StoreError> {
    match change {
        EventChange::Create(event) => {
            if events.get(event.id.as_bytes())?.is_some() {
                return abort(StoreError::Duplicate {
                    collection: "event",
                    id: event.id.clone(),
                });
            }
            let bytes = encode(event).map_err(ConflictableTransactionError::Abort)?;
            events.insert(event.id.as_bytes(), bytes)?;
        }
        EventChange::Move { id, to } => {
            let Some(bytes) = events.get(id.as_bytes())? else {
                return abort(event_not_found(id));
            };
            let current: CalendarEvent = decode(&bytes).map_err(ConflictableTransactionError::Abort)?;
            let moved = current.patched(&EventPatch::move_to(*to));
            let bytes = encode(&moved).map_err(ConflictableTransactionError::Abort)?;
            events.insert(id.as_bytes(), bytes)?;
        }
        EventChange::Delete { id } => {
            if events.remove(id.as_bytes())?.is_none() {
                return abort(event_not_found(id));
            }
        }
    }
    Ok(())
}

impl SledStore {
    pub fn open(instance: Arc<Db>) -> StoreResult<Self> {
        Ok(Self {
            events: instance.open_tree(EVENTS_TREE)?,
            requests: instance.open_tree(REQUESTS_TREE)?,
        })
    }

    // insert only if the key is free
    fn insert_new(tree: &Tree, collection: &'static str, id: &str, bytes: Vec<u8>) -> StoreResult<()> {
        match tree.compare_and_swap(id.as_bytes(), None::<&[u8]>, Some(bytes))? {
            Ok(()) => Ok(()),
            Err(_) => Err(StoreError::Duplicate {
                collection,
                id: id.to_string(),
            }),
        }
    }
}

impl EventRepository for SledStore {
    fn list_events_for_month(&self, year: i32, month: u32) -> StoreResult<Vec<CalendarEvent>> {
        let mut events = vec![];
        for entry in self.events.iter() {
            let (_, bytes) = entry?;
            let event: CalendarEvent = decode(&bytes)?;
            if in_month_window(event.date, year, month) {
                events.push(event);
            }
        }
        events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }

    fn get_event(&self, id: &str) -> StoreResult<CalendarEvent> {
        let bytes = self.events.get(id.as_bytes())?.ok_or_else(|| StoreError::NotFound {
            collection: "event",
            id: id.to_string(),
        })?;
        decode(&bytes)
    }

    fn create_event(&self, event: CalendarEvent) -> StoreResult<CalendarEvent> {
        Self::insert_new(&self.events, "event", &event.id, encode(&event)?)?;
        Ok(event)
    }

    fn update_event(&self, id: &str, patch: &EventPatch) -> StoreResult<CalendarEvent> {
        let updated = self.get_event(id)?.patched(patch);
        self.events.insert(id.as_bytes(), encode(&updated)?)?;
        Ok(updated)
    }

    fn delete_event(&self, id: &str) -> StoreResult<()> {
        match self.events.remove(id.as_bytes())? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                collection: "event",
                id: id.to_string(),
            }),
        }
    }
}

impl ChangeRequestRepository for SledStore {
    fn list(&self, filter: &RequestFilter) -> StoreResult<Vec<ChangeRequest>> {
        let mut requests = vec![];
        for entry in self.requests.iter() {
            let (_, bytes) = entry?;
            let request: ChangeRequest = decode(&bytes)?;
            if filter.matches(&request) {
                requests.push(request);
            }
        }
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(requests)
    }

    fn get(&self, id: &str) -> StoreResult<ChangeRequest> {
        let bytes = self.requests.get(id.as_bytes())?.ok_or_else(|| StoreError::NotFound {
            collection: "change request",
            id: id.to_string(),
        })?;
        decode(&bytes)
    }

    fn create(&self, request: ChangeRequest) -> StoreResult<ChangeRequest> {
        Self::insert_new(&self.requests, "change request", &request.id, encode(&request)?)?;
        Ok(request)
    }

    fn update_status(
        &self,
        id: &str,
        expected: RequestStatus,
        update: &StatusUpdate,
    ) -> StoreResult<ChangeRequest> {
        let current_bytes = self.requests.get(id.as_bytes())?.ok_or_else(|| StoreError::NotFound {
            collection: "change request",
            id: id.to_string(),
        })?;
        let current: ChangeRequest = decode(&current_bytes)?;
        if current.status != expected {
            return Err(StoreError::StatusConflict { id: id.to_string() });
        }

        let next = current.applied(update);
        // swap only against the exact bytes read above
        match self
            .requests
            .compare_and_swap(id.as_bytes(), Some(&current_bytes), Some(encode(&next)?))?
        {
            Ok(()) => Ok(next),
            Err(_) => Err(StoreError::StatusConflict { id: id.to_string() }),
        }
    }

    fn apply_approval(
        &self,
        id: &str,
        expected: RequestStatus,
        update: &StatusUpdate,
        changes: &[EventChange],
    ) -> StoreResult<ChangeRequest> {
        // sled transactions are serializable, so the status read below cannot go stale
        let result = (&self.events, &self.requests).transaction(|(events, requests)| {
            let Some(current_bytes) = requests.get(id.as_bytes())? else {
                return abort(StoreError::NotFound {
                    collection: "change request",
                    id: id.to_string(),
                });
            };
            let current: ChangeRequest =
                decode(&current_bytes).map_err(ConflictableTransactionError::Abort)?;
            if current.status != expected {
                return abort(StoreError::StatusConflict { id: id.to_string() });
            }

            for change in changes {
                apply_event_change(events, change)?;
            }

            let next = current.applied(update);
            let bytes = encode(&next).map_err(ConflictableTransactionError::Abort)?;
            requests.insert(id.as_bytes(), bytes)?;
            Ok(next)
        });

        result.map_err(|err| match err {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => StoreError::Sled(err),
        })
    }
}
