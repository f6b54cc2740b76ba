use crate::domain::{NotificationEnvelope, UserIdentifier};
use crate::library::communication::event::{Delivery, Offset, Partition};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Errors returned when reading from the [`NotificationStore`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The user has not received a single notification during the lifetime of this process
    #[error("no notifications recorded for user {0}")]
    NotFound(UserIdentifier),
}

#[derive(Default)]
struct Inboxes {
    notifications: HashMap<UserIdentifier, Vec<NotificationEnvelope>>,
    watermarks: HashMap<Partition, Offset>,
}

/// In-memory inboxes of all users whose notifications have been consumed by this process
///
/// A single reader/writer lock guards both the inboxes and the per-partition watermarks. Every
/// operation holds it for the duration of a map lookup and at most one append, so readers
/// always observe a notification either completely or not at all. Inboxes only ever grow.
#[derive(Default)]
pub struct NotificationStore {
    inner: RwLock<Inboxes>,
}

impl NotificationStore {
    // A writer that panicked can not leave a partially appended entry behind, thus the data is still consistent
    fn read(&self) -> RwLockReadGuard<'_, Inboxes> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inboxes> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends a notification to the inbox of a user, creating the inbox if it does not exist
    pub fn record(&self, user: UserIdentifier, notification: NotificationEnvelope) {
        self.write()
            .notifications
            .entry(user)
            .or_default()
            .push(notification);
    }

    /// Appends a notification unless its delivery has already been applied and returns whether it was appended
    ///
    /// Within a partition, offsets increase monotonically. A delivery at or below the highest offset applied
    /// so far is a redelivery of a notification which has been recorded but whose offset has not been committed.
    pub fn record_delivery(
        &self,
        user: UserIdentifier,
        notification: NotificationEnvelope,
        delivery: &Delivery,
    ) -> bool {
        let mut inboxes = self.write();

        match inboxes.watermarks.get(&delivery.partition) {
            Some(watermark) if *watermark >= delivery.offset => return false,
            _ => {}
        }

        inboxes
            .watermarks
            .insert(delivery.partition, delivery.offset);
        inboxes
            .notifications
            .entry(user)
            .or_default()
            .push(notification);

        true
    }

    /// Snapshot of the inbox of a user in the order notifications arrived
    pub fn lookup(&self, user: UserIdentifier) -> Result<Vec<NotificationEnvelope>, StoreError> {
        self.read()
            .notifications
            .get(&user)
            .cloned()
            .ok_or(StoreError::NotFound(user))
    }

    /// Total number of notifications across all inboxes
    pub fn len(&self) -> usize {
        self.read().notifications.values().map(Vec::len).sum()
    }

    /// Whether no notification has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of users with an inbox
    pub fn users(&self) -> usize {
        self.read().notifications.len()
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::domain::User;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn envelope(from: u64, to: u64, message: &str) -> NotificationEnvelope {
        NotificationEnvelope::new(User::new(from, "from"), User::new(to, "to"), message.into())
    }

    fn messages(notifications: Vec<NotificationEnvelope>) -> Vec<String> {
        notifications.into_iter().map(|n| n.message).collect()
    }

    #[test]
    fn keep_arrival_order_per_user() {
        let store = NotificationStore::default();

        store.record(2, envelope(1, 2, "first"));
        store.record(3, envelope(1, 3, "other"));
        store.record(2, envelope(3, 2, "second"));
        store.record(2, envelope(4, 2, "third"));

        assert_eq!(
            messages(store.lookup(2).unwrap()),
            vec!["first", "second", "third"]
        );
        assert_eq!(messages(store.lookup(3).unwrap()), vec!["other"]);
    }

    #[test]
    fn signal_unknown_users() {
        let store = NotificationStore::default();
        store.record(2, envelope(1, 2, "hi"));

        assert_eq!(store.lookup(1), Err(StoreError::NotFound(1)));
        assert!(store.lookup(2).is_ok());
    }

    #[test]
    fn skip_redeliveries() {
        let store = NotificationStore::default();
        let partition = Partition::new(1);
        let first = Delivery::new(partition, Offset::new(10, 0));
        let second = Delivery::new(partition, Offset::new(10, 1));

        assert!(store.record_delivery(2, envelope(1, 2, "hi"), &first));
        assert!(store.record_delivery(2, envelope(3, 2, "yo"), &second));
        assert!(!store.record_delivery(2, envelope(1, 2, "hi"), &first));
        assert!(!store.record_delivery(2, envelope(3, 2, "yo"), &second));

        assert_eq!(messages(store.lookup(2).unwrap()), vec!["hi", "yo"]);
    }

    #[test]
    fn track_watermarks_per_partition() {
        let store = NotificationStore::default();
        let offset = Offset::new(5, 0);

        assert!(store.record_delivery(2, envelope(1, 2, "a"), &Delivery::new(Partition::new(0), offset)));
        assert!(store.record_delivery(3, envelope(1, 3, "b"), &Delivery::new(Partition::new(1), offset)));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn retain_every_concurrent_record() {
        let store = Arc::new(NotificationStore::default());
        let writers: Vec<_> = (0..8u64)
            .map(|user| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for index in 0..250 {
                        store.record(user, envelope(0, user, &index.to_string()));
                    }
                })
            })
            .collect();

        let reader = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    if let Ok(inbox) = store.lookup(3) {
                        let indices: Vec<usize> = inbox.iter().map(|n| n.message.parse().unwrap()).collect();
                        assert!(indices.iter().enumerate().all(|(i, v)| i == *v));
                    }
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(store.len(), 8 * 250);
        assert_eq!(store.users(), 8);
    }
}
