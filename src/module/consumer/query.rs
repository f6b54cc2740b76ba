use super::store::{NotificationStore, StoreError};
use crate::domain::{NotificationEnvelope, UserIdentifier};
use serde::Serialize;
use std::sync::Arc;

/// Inbox of a user as presented to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    /// Whether any notification has been recorded for the user
    pub found: bool,
    /// Notifications in the order they arrived, empty if none were found
    pub notifications: Vec<NotificationEnvelope>,
}

/// Read-only view on the [`NotificationStore`]
///
/// Unknown users are not an error, they are reported with an empty inbox.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<NotificationStore>,
}

impl QueryService {
    /// Creates a new instance reading from the given store
    pub fn new(store: Arc<NotificationStore>) -> Self {
        Self { store }
    }

    /// Current inbox of the user
    pub fn query(&self, user: UserIdentifier) -> QueryResult {
        match self.store.lookup(user) {
            Ok(notifications) => QueryResult {
                found: true,
                notifications,
            },
            Err(StoreError::NotFound(_)) => QueryResult {
                found: false,
                notifications: Vec::new(),
            },
        }
    }
}
