use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Numeric identifier of a user
pub type UserIdentifier = u64;

/// Participant which may send and receive notifications
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique identifier of the user
    pub id: UserIdentifier,
    /// Human readable display name
    pub name: String,
}

impl User {
    /// Creates a new instance from raw parts
    pub fn new(id: UserIdentifier, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
        }
    }
}

/// Static, in-memory lookup table of known users
#[derive(Debug, Clone)]
pub struct UserDirectory {
    users: BTreeMap<UserIdentifier, User>,
}

impl UserDirectory {
    /// Creates a directory containing the given users
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: users.into_iter().map(|user| (user.id, user)).collect(),
        }
    }

    /// Resolves an identifier to the user it belongs to
    pub fn find(&self, id: UserIdentifier) -> Option<&User> {
        self.users.get(&id)
    }

    /// All known users ordered by their identifier
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new(vec![
            User::new(1, "Emma"),
            User::new(2, "Bruno"),
            User::new(3, "Rick"),
            User::new(4, "Lena"),
        ])
    }
}
