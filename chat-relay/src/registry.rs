//! In-memory roster of registered participants.
//!
//! The roster is insertion-ordered and lives for the lifetime of the process.
//! All access goes through a single async mutex; callers that need to act on a
//! mutation and the resulting roster together (the hub broadcasting a fresh
//! snapshot) do so inside the `*_with` closures while the lock is still held.

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Message returned for both registration failures. Clients match on it verbatim.
pub const NAME_TAKEN_MESSAGE: &str = "This name is already taken!";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    /// The request carried no name at all.
    MissingName,
    /// Another participant already uses this exact name.
    NameTaken,
}

impl RegisterError {
    pub fn message(&self) -> &'static str {
        // Both causes share the same text so existing clients keep working.
        match self {
            RegisterError::MissingName | RegisterError::NameTaken => NAME_TAKEN_MESSAGE,
        }
    }
}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::MissingName => f.write_str("no name supplied"),
            RegisterError::NameTaken => f.write_str("name already taken"),
        }
    }
}

impl std::error::Error for RegisterError {}

#[derive(Default)]
pub struct Registry {
    participants: Mutex<Vec<Participant>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a participant under a fresh id, rejecting names already in use.
    pub async fn register(&self, name: &str) -> Result<Participant, RegisterError> {
        let mut participants = self.participants.lock().await;
        if participants.iter().any(|existing| existing.name == name) {
            return Err(RegisterError::NameTaken);
        }

        let participant = Participant {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        participants.push(participant.clone());
        Ok(participant)
    }

    pub async fn snapshot(&self) -> Vec<Participant> {
        self.participants.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.participants.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.participants.lock().await.is_empty()
    }

    /// Runs `f` against the current roster without releasing the lock in between.
    pub async fn with_snapshot<R>(&self, f: impl FnOnce(&[Participant]) -> R) -> R {
        let participants = self.participants.lock().await;
        f(&participants)
    }

    /// Removes the first participant with `id`, then runs `f` against the
    /// updated roster under the same lock. An unknown id leaves the roster as is.
    pub async fn remove_with<R>(
        &self,
        id: &str,
        f: impl FnOnce(&[Participant]) -> R,
    ) -> (Option<Participant>, R) {
        let mut participants = self.participants.lock().await;
        let index = participants
            .iter()
            .position(|participant| participant.id == id);
        let removed = index.map(|index| participants.remove(index));
        let output = f(&participants);
        (removed, output)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc};

    use super::*;

    #[tokio::test]
    async fn registers_unique_names_with_fresh_ids() {
        let registry = Registry::new();
        let alice = registry.register("alice").await.expect("alice registers");
        let bob = registry.register("bob").await.expect("bob registers");

        assert_ne!(alice.id, bob.id);
        assert_eq!(registry.snapshot().await, vec![alice, bob]);
    }

    #[tokio::test]
    async fn rejects_duplicate_names() {
        let registry = Registry::new();
        registry.register("alice").await.expect("first registration");
        let result = registry.register("alice").await;

        assert_eq!(result, Err(RegisterError::NameTaken));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn names_are_case_sensitive() {
        let registry = Registry::new();
        registry.register("alice").await.expect("lowercase");
        registry.register("Alice").await.expect("capitalised is distinct");
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn blank_names_are_ordinary_names() {
        let registry = Registry::new();
        registry.register("").await.expect("empty name registers");
        registry.register("   ").await.expect("whitespace name registers");

        assert_eq!(registry.register("   ").await, Err(RegisterError::NameTaken));
        assert_eq!(registry.len().await, 2);
    }

    #[test]
    fn both_failures_share_the_client_message() {
        assert_eq!(RegisterError::MissingName.message(), NAME_TAKEN_MESSAGE);
        assert_eq!(RegisterError::NameTaken.message(), NAME_TAKEN_MESSAGE);
    }

    #[tokio::test]
    async fn remove_unknown_id_is_a_no_op() {
        let registry = Registry::new();
        let alice = registry.register("alice").await.unwrap();
        let bob = registry.register("bob").await.unwrap();

        let (removed, roster) = registry.remove_with("nobody", |roster| roster.to_vec()).await;
        assert_eq!(removed, None);
        assert_eq!(roster, vec![alice.clone(), bob.clone()]);
        assert_eq!(registry.snapshot().await, vec![alice, bob]);
    }

    #[tokio::test]
    async fn remove_with_sees_the_updated_roster() {
        let registry = Registry::new();
        let alice = registry.register("alice").await.unwrap();
        let bob = registry.register("bob").await.unwrap();

        let (removed, seen) = registry.remove_with(&alice.id, |roster| roster.to_vec()).await;

        assert_eq!(removed, Some(alice));
        assert_eq!(seen, vec![bob]);
    }

    #[tokio::test]
    async fn removed_name_can_be_registered_again() {
        let registry = Registry::new();
        let alice = registry.register("alice").await.unwrap();
        registry.remove_with(&alice.id, |_| ()).await;

        let again = registry.register("alice").await.expect("name is free again");
        assert_ne!(again.id, alice.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_of_one_name_admit_exactly_one() {
        let registry = Arc::new(Registry::new());
        let attempts = (0..32)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.register("alice").await })
            })
            .collect::<Vec<_>>();

        let mut successes = 0;
        for attempt in attempts {
            match attempt.await.expect("task completes") {
                Ok(_) => successes += 1,
                Err(err) => assert_eq!(err, RegisterError::NameTaken),
            }
        }

        assert_eq!(successes, 1);
        let names: HashSet<_> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|participant| participant.name)
            .collect();
        assert_eq!(names.len(), registry.len().await);
    }
}
