//! The ticket store.
//!
//! [`TicketStore`] owns the ordered list of issued tickets. It loads the list
//! from a storage slot when it is opened and writes the whole list back after
//! every mutation. Persistence is best effort: a list that cannot be loaded
//! becomes an empty list, and a failed write keeps the in-memory change.
//!
//! Front ends observe the list through [`TicketStore::subscribe`] rather than
//! polling it.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::SlotStorage;
use crate::ticket::TicketRecord;

/// Default slot the ticket list is persisted under.
pub const DEFAULT_SLOT_KEY: &str = "savedQRCodes";

/// What happened when the store read its slot on open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The slot was empty; the store started with no tickets.
    Empty,
    /// The slot was decoded successfully.
    Loaded {
        /// Number of tickets read.
        count: usize,
    },
    /// The slot could not be read or decoded; the store started empty.
    Recovered {
        /// Rendered read or decode error.
        reason: String,
    },
}

/// A change to the ticket list, delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A ticket was appended.
    Added {
        /// Position of the new ticket.
        index: usize,
        /// Id of the new ticket.
        id: Uuid,
    },
    /// One or more tickets were removed.
    Removed {
        /// Ids of the removed tickets, in their former order.
        ids: Vec<Uuid>,
    },
}

/// Receives a notification after every change to the ticket list.
pub trait TicketObserver {
    /// Called with the event and the list as it stands after the change.
    fn tickets_changed(&self, event: &StoreEvent, tickets: &[TicketRecord]);
}

impl<F> TicketObserver for F
where
    F: Fn(&StoreEvent, &[TicketRecord]),
{
    fn tickets_changed(&self, event: &StoreEvent, tickets: &[TicketRecord]) {
        self(event, tickets);
    }
}

/// Handle returned by [`TicketStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// The authoritative list of issued tickets.
pub struct TicketStore<S: SlotStorage> {
    storage: S,
    slot_key: String,
    tickets: Vec<TicketRecord>,
    load_outcome: LoadOutcome,
    observers: Vec<(SubscriptionId, Box<dyn TicketObserver>)>,
    next_subscription: u64,
}

impl<S: SlotStorage> TicketStore<S> {
    /// Open the store on the default slot.
    #[must_use]
    pub fn open(storage: S) -> Self {
        Self::open_slot(storage, DEFAULT_SLOT_KEY)
    }

    /// Open the store on a named slot, loading whatever it holds.
    ///
    /// Never fails: an unreadable slot is logged and the store starts empty.
    /// Inspect [`load_outcome`](TicketStore::load_outcome) to find out.
    #[must_use]
    pub fn open_slot(storage: S, slot_key: impl Into<String>) -> Self {
        let slot_key = slot_key.into();
        let (tickets, load_outcome) = match load(&storage, &slot_key) {
            Ok(Some(tickets)) => {
                info!("Loaded {} tickets from slot {}", tickets.len(), slot_key);
                let count = tickets.len();
                (tickets, LoadOutcome::Loaded { count })
            }
            Ok(None) => {
                debug!("Slot {} is empty", slot_key);
                (Vec::new(), LoadOutcome::Empty)
            }
            Err(e) => {
                error!("{}", e);
                (
                    Vec::new(),
                    LoadOutcome::Recovered {
                        reason: e.to_string(),
                    },
                )
            }
        };

        Self {
            storage,
            slot_key,
            tickets,
            load_outcome,
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// All tickets, in the order they were added.
    #[must_use]
    pub fn all(&self) -> &[TicketRecord] {
        &self.tickets
    }

    /// Number of tickets held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// Whether the store holds no tickets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// The ticket at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TicketRecord> {
        self.tickets.get(index)
    }

    /// Position and ticket with the given id, if present.
    #[must_use]
    pub fn find(&self, id: Uuid) -> Option<(usize, &TicketRecord)> {
        self.tickets.iter().enumerate().find(|(_, t)| t.id() == id)
    }

    /// Name of the slot this store persists to.
    #[must_use]
    pub fn slot_key(&self) -> &str {
        &self.slot_key
    }

    /// Result of the initial load.
    #[must_use]
    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    /// The underlying storage.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Append a ticket and persist the list.
    ///
    /// Duplicate field values are allowed; tickets are told apart by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PersistenceWrite`] if the list could not be saved.
    /// The ticket is still appended and observers are still notified.
    pub fn add(&mut self, ticket: TicketRecord) -> Result<()> {
        let event = StoreEvent::Added {
            index: self.tickets.len(),
            id: ticket.id(),
        };
        debug!("Adding ticket {}", ticket.id());
        self.tickets.push(ticket);
        self.commit(&event)
    }

    /// Remove the tickets at the given positions and persist the list.
    ///
    /// Positions refer to the order before the call; repeated positions are
    /// removed once. Returns the removed tickets in their former order. An
    /// empty set of positions is a no-op and does not touch storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] without changing anything if any
    /// position is past the end. Returns [`Error::PersistenceWrite`] if the
    /// list could not be saved; the removal is kept.
    pub fn delete_at<I>(&mut self, indices: I) -> Result<Vec<TicketRecord>>
    where
        I: IntoIterator<Item = usize>,
    {
        let indices: BTreeSet<usize> = indices.into_iter().collect();
        let len = self.tickets.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(Error::IndexOutOfRange { index, len });
        }
        if indices.is_empty() {
            return Ok(Vec::new());
        }

        let mut removed: Vec<TicketRecord> = indices
            .iter()
            .rev()
            .map(|&i| self.tickets.remove(i))
            .collect();
        removed.reverse();

        debug!("Removed {} tickets", removed.len());
        let event = StoreEvent::Removed {
            ids: removed.iter().map(TicketRecord::id).collect(),
        };
        self.commit(&event).map(|()| removed)
    }

    /// Register an observer for list changes.
    pub fn subscribe(&mut self, observer: impl TicketObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns `true` if it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    /// Persist the full list, then notify observers regardless of the result.
    fn commit(&self, event: &StoreEvent) -> Result<()> {
        let saved = self.save();
        if let Err(e) = &saved {
            error!("{}", e);
        }
        for (_, observer) in &self.observers {
            observer.tickets_changed(event, &self.tickets);
        }
        saved
    }

    fn save(&self) -> Result<()> {
        let encoded = serde_json::to_vec(&self.tickets)
            .map_err(|e| Error::persistence_write(&self.slot_key, e.into()))?;
        self.storage
            .write_slot(&self.slot_key, &encoded)
            .map_err(|e| Error::persistence_write(&self.slot_key, e))
    }
}

fn load<S: SlotStorage>(storage: &S, slot_key: &str) -> Result<Option<Vec<TicketRecord>>> {
    let Some(raw) = storage
        .read_slot(slot_key)
        .map_err(|e| Error::persistence_read(slot_key, e))?
    else {
        return Ok(None);
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|e| Error::persistence_read(slot_key, e.into()))
}

impl<S: SlotStorage + fmt::Debug> fmt::Debug for TicketStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketStore")
            .field("storage", &self.storage)
            .field("slot_key", &self.slot_key)
            .field("tickets", &self.tickets.len())
            .field("load_outcome", &self.load_outcome)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use image::{GrayImage, Luma};

    use super::*;
    use crate::storage::Storage;
    use crate::ticket::Identity;

    /// Storage whose writes always fail.
    #[derive(Debug, Default)]
    struct ReadOnlyStorage {
        writes: Cell<usize>,
    }

    impl SlotStorage for ReadOnlyStorage {
        fn read_slot(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }

        fn write_slot(&self, _key: &str, _value: &[u8]) -> Result<()> {
            self.writes.set(self.writes.get() + 1);
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        fn remove_slot(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }
    }

    /// Storage whose reads always fail.
    #[derive(Debug)]
    struct UnreadableStorage;

    impl SlotStorage for UnreadableStorage {
        fn read_slot(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(Error::Io(std::io::Error::other("device unplugged")))
        }

        fn write_slot(&self, _key: &str, _value: &[u8]) -> Result<()> {
            Ok(())
        }

        fn remove_slot(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }
    }

    fn create_test_store() -> TicketStore<Storage> {
        TicketStore::open(Storage::open_in_memory().expect("failed to create test storage"))
    }

    fn ticket(first: &str) -> TicketRecord {
        TicketRecord::new(Identity::new(first, "Lee", "nick", "a@x.com"), None)
    }

    fn names<S: SlotStorage>(store: &TicketStore<S>) -> Vec<&str> {
        store.all().iter().map(TicketRecord::first_name).collect()
    }

    #[test]
    fn test_open_empty_slot() {
        let store = create_test_store();
        assert!(store.is_empty());
        assert!(store.all().is_empty());
        assert_eq!(store.load_outcome(), &LoadOutcome::Empty);
        assert_eq!(store.slot_key(), DEFAULT_SLOT_KEY);
    }

    #[test]
    fn test_add_single_ticket_without_image() {
        let mut store = create_test_store();
        store
            .add(TicketRecord::new(
                Identity::new("Ann", "Lee", "AL", "a@x.com"),
                None,
            ))
            .unwrap();

        assert_eq!(store.len(), 1);
        let t = &store.all()[0];
        assert_eq!(t.first_name(), "Ann");
        assert_eq!(t.last_name(), "Lee");
        assert_eq!(t.nickname(), "AL");
        assert_eq!(t.email(), "a@x.com");
        assert!(t.qr_image().is_none());
    }

    #[test]
    fn test_add_preserves_call_order() {
        let mut store = create_test_store();
        let expected: Vec<String> = (0..10).map(|i| format!("T{i}")).collect();
        for name in &expected {
            store.add(ticket(name)).unwrap();
        }
        assert_eq!(names(&store), expected);
    }

    #[test]
    fn test_add_allows_duplicate_fields() {
        let mut store = create_test_store();
        store.add(ticket("Ann")).unwrap();
        store.add(ticket("Ann")).unwrap();

        assert_eq!(store.len(), 2);
        assert_ne!(store.all()[0].id(), store.all()[1].id());
    }

    #[test]
    fn test_delete_middle_of_three() {
        let mut store = create_test_store();
        let records = [ticket("a"), ticket("b"), ticket("c")];
        for r in &records {
            store.add(r.clone()).unwrap();
        }

        let removed = store.delete_at([1]).unwrap();

        assert_eq!(removed, vec![records[1].clone()]);
        assert_eq!(store.all(), &[records[0].clone(), records[2].clone()]);
    }

    #[test]
    fn test_delete_multiple_uses_pre_delete_positions() {
        let mut store = create_test_store();
        for name in ["a", "b", "c", "d", "e"] {
            store.add(ticket(name)).unwrap();
        }

        let removed = store.delete_at([3, 0, 3, 4]).unwrap();

        assert_eq!(
            removed.iter().map(TicketRecord::first_name).collect::<Vec<_>>(),
            vec!["a", "d", "e"]
        );
        assert_eq!(names(&store), vec!["b", "c"]);
    }

    #[test]
    fn test_delete_out_of_range_changes_nothing() {
        let mut store = create_test_store();
        store.add(ticket("a")).unwrap();
        store.add(ticket("b")).unwrap();

        let err = store.delete_at([0, 2]).unwrap_err();

        assert!(matches!(err, Error::IndexOutOfRange { index: 2, len: 2 }));
        assert_eq!(names(&store), vec!["a", "b"]);
    }

    #[test]
    fn test_delete_empty_set_is_noop() {
        let mut store = create_test_store();
        store.add(ticket("a")).unwrap();
        assert!(store.delete_at(Vec::new()).unwrap().is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_and_find() {
        let mut store = create_test_store();
        store.add(ticket("a")).unwrap();
        store.add(ticket("b")).unwrap();

        let id = store.get(1).unwrap().id();
        let (index, found) = store.find(id).unwrap();
        assert_eq!(index, 1);
        assert_eq!(found.first_name(), "b");

        assert!(store.get(2).is_none());
        assert!(store.find(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_reload_round_trip() {
        let storage = Storage::open_in_memory().unwrap();
        let mut store = TicketStore::open(storage);

        let img = GrayImage::from_fn(8, 8, |x, y| Luma([if (x + y) % 2 == 0 { 0 } else { 255 }]));
        store
            .add(TicketRecord::new(Identity::new("Ann", "Lee", "AL", "a@x.com"), Some(&img)))
            .unwrap();
        store.add(ticket("b")).unwrap();
        store.add(ticket("c")).unwrap();
        store.delete_at([2]).unwrap();
        let expected = store.all().to_vec();

        let reopened = TicketStore::open(store.storage);

        assert_eq!(reopened.all(), expected.as_slice());
        assert_eq!(reopened.load_outcome(), &LoadOutcome::Loaded { count: 2 });
        assert_eq!(reopened.all()[0].qr_image(), expected[0].qr_image());
    }

    #[test]
    fn test_persisted_slot_is_json_array() {
        let mut store = create_test_store();
        store.add(ticket("Ann")).unwrap();

        let raw = store.storage().read_slot(DEFAULT_SLOT_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();

        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["firstName"], "Ann");
        assert!(array[0]["qrImage"].is_null());
    }

    #[test]
    fn test_slots_are_isolated() {
        let storage = Storage::open_in_memory().unwrap();
        let mut store = TicketStore::open_slot(storage, "event-a");
        store.add(ticket("a")).unwrap();

        let other = TicketStore::open_slot(store.storage, "event-b");
        assert!(other.is_empty());
    }

    #[test]
    fn test_corrupt_slot_recovers_empty() {
        let storage = Storage::open_in_memory().unwrap();
        storage.write_slot(DEFAULT_SLOT_KEY, b"{ not json").unwrap();

        let store = TicketStore::open(storage);

        assert!(store.all().is_empty());
        match store.load_outcome() {
            LoadOutcome::Recovered { reason } => assert!(reason.contains(DEFAULT_SLOT_KEY)),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_shape_slot_recovers_empty() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .write_slot(DEFAULT_SLOT_KEY, br#"[{"firstName": "Ann"}]"#)
            .unwrap();

        let store = TicketStore::open(storage);
        assert!(store.is_empty());
        assert!(matches!(store.load_outcome(), LoadOutcome::Recovered { .. }));
    }

    #[test]
    fn test_unreadable_storage_recovers_empty() {
        let store = TicketStore::open(UnreadableStorage);
        assert!(store.is_empty());
        assert!(matches!(store.load_outcome(), LoadOutcome::Recovered { .. }));
    }

    #[test]
    fn test_corrupt_slot_is_overwritten_on_next_add() {
        let storage = Storage::open_in_memory().unwrap();
        storage.write_slot(DEFAULT_SLOT_KEY, b"garbage").unwrap();

        let mut store = TicketStore::open(storage);
        store.add(ticket("a")).unwrap();

        let reopened = TicketStore::open(store.storage);
        assert_eq!(names(&reopened), vec!["a"]);
    }

    #[test]
    fn test_write_failure_keeps_mutation() {
        let mut store = TicketStore::open(ReadOnlyStorage::default());

        let err = store.add(ticket("a")).unwrap_err();
        assert!(matches!(err, Error::PersistenceWrite { .. }));
        assert_eq!(store.len(), 1);

        let err = store.delete_at([0]).unwrap_err();
        assert!(err.is_persistence_error());
        assert!(store.is_empty());
        assert_eq!(store.storage().writes.get(), 2);
    }

    #[test]
    fn test_observer_sees_changes() {
        let mut store = create_test_store();
        let seen: Rc<RefCell<Vec<(StoreEvent, usize)>>> = Rc::default();

        let sink = Rc::clone(&seen);
        store.subscribe(move |event: &StoreEvent, tickets: &[TicketRecord]| {
            sink.borrow_mut().push((event.clone(), tickets.len()));
        });

        let first = ticket("a");
        let first_id = first.id();
        store.add(first).unwrap();
        store.add(ticket("b")).unwrap();
        store.delete_at([0]).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(
            seen[0],
            (
                StoreEvent::Added {
                    index: 0,
                    id: first_id
                },
                1
            )
        );
        assert!(matches!(seen[1].0, StoreEvent::Added { index: 1, .. }));
        assert_eq!(
            seen[2],
            (
                StoreEvent::Removed {
                    ids: vec![first_id]
                },
                1
            )
        );
    }

    #[test]
    fn test_observer_notified_on_write_failure() {
        let mut store = TicketStore::open(ReadOnlyStorage::default());
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        store.subscribe(move |_: &StoreEvent, _: &[TicketRecord]| counter.set(counter.get() + 1));

        assert!(store.add(ticket("a")).is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_observer_not_notified_on_rejected_delete() {
        let mut store = create_test_store();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        store.subscribe(move |_: &StoreEvent, _: &[TicketRecord]| counter.set(counter.get() + 1));

        assert!(store.delete_at([0]).is_err());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let mut store = create_test_store();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let id = store.subscribe(move |_: &StoreEvent, _: &[TicketRecord]| {
            counter.set(counter.get() + 1);
        });

        store.add(ticket("a")).unwrap();
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.add(ticket("b")).unwrap();

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_store_debug() {
        let store = create_test_store();
        let debug_str = format!("{store:?}");
        assert!(debug_str.contains("TicketStore"));
        assert!(debug_str.contains(DEFAULT_SLOT_KEY));
    }
}
