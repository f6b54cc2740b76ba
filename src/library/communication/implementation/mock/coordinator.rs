use crate::library::communication::event::{
    assign_range, Assignment, ConsumerGroupDescriptor, ConsumerIdentifier, GroupCoordinator,
    GroupMembership, GroupProtocolError, Partition, QueueDescriptor,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

#[derive(Default)]
struct GroupState {
    members: BTreeSet<ConsumerIdentifier>,
    generation: u64,
    holders: BTreeMap<Partition, ConsumerIdentifier>,
    settled: BTreeMap<ConsumerIdentifier, u64>,
    version: u64,
    fail_assignments: bool,
    fail_revocations: bool,
}

/// In-process group coordinator with the same exclusivity guarantees as the redis implementation
///
/// A member only receives an assignment once every partition of it has been released by its previous holder.
#[derive(Clone)]
pub struct MockGroupCoordinator {
    state: Arc<Mutex<GroupState>>,
    changes: Arc<(watch::Sender<u64>, watch::Receiver<u64>)>,
}

impl Default for MockGroupCoordinator {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(GroupState::default())),
            changes: Arc::new(watch::channel(0)),
        }
    }
}

impl MockGroupCoordinator {
    pub fn members(&self) -> BTreeSet<ConsumerIdentifier> {
        self.state.lock().unwrap().members.clone()
    }

    pub fn holders(&self) -> BTreeMap<Partition, ConsumerIdentifier> {
        self.state.lock().unwrap().holders.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().unwrap().generation
    }

    /// Makes every subsequent assignment request fail with a session error
    pub fn fail_assignments(&self, fail: bool) {
        let mut state = self.state.lock().unwrap();
        state.fail_assignments = fail;
        self.notify(&mut state);
    }

    /// Makes members waiting for a revocation lose one of their partitions
    pub fn fail_revocations(&self, fail: bool) {
        let mut state = self.state.lock().unwrap();
        state.fail_revocations = fail;
        self.notify(&mut state);
    }

    /// Waits until the group reached at least the given generation
    pub async fn wait_for_generation(&self, generation: u64) {
        self.wait_until(|state| state.generation >= generation)
            .await
    }

    /// Waits until every member holds the assignment of the current generation
    pub async fn wait_until_settled(&self) {
        self.wait_until(|state| {
            state
                .members
                .iter()
                .all(|member| state.settled.get(member) == Some(&state.generation))
        })
        .await
    }

    async fn wait_until<P: Fn(&GroupState) -> bool>(&self, predicate: P) {
        let mut changes = self.changes.1.clone();

        timeout(Duration::from_secs(5), async {
            loop {
                changes.borrow_and_update();

                if predicate(&self.state.lock().unwrap()) {
                    return;
                }

                changes.changed().await.unwrap();
            }
        })
        .await
        .expect("consumer group did not reach the expected state");
    }

    fn notify(&self, state: &mut GroupState) {
        state.version += 1;
        self.changes.0.send(state.version).ok();
    }

    fn release(&self, state: &mut GroupState, consumer: &str) {
        state.holders.retain(|_, holder| holder != consumer);
        state.settled.remove(consumer);
    }
}

#[async_trait]
impl GroupCoordinator for MockGroupCoordinator {
    type Membership = MockGroupMembership;

    async fn join(
        &self,
        queue: &QueueDescriptor,
        _group: &ConsumerGroupDescriptor,
        consumer: &str, // &ConsumerIdentifier
    ) -> Result<Self::Membership, GroupProtocolError> {
        let mut state = self.state.lock().unwrap();
        state.members.insert(consumer.to_owned());
        state.generation += 1;
        self.notify(&mut state);

        Ok(MockGroupMembership {
            coordinator: self.clone(),
            consumer: consumer.to_owned(),
            partitions: queue.partitions(),
            generation: None,
        })
    }
}

pub struct MockGroupMembership {
    coordinator: MockGroupCoordinator,
    consumer: ConsumerIdentifier,
    partitions: u32,
    generation: Option<u64>,
}

impl MockGroupMembership {
    /// Attempts to take all partitions of the current generation at once
    fn try_assign(&mut self) -> Result<Option<Assignment>, GroupProtocolError> {
        let coordinator = &self.coordinator;
        let mut state = coordinator.state.lock().unwrap();

        if !state.members.contains(&self.consumer) {
            return Err(GroupProtocolError::Closed);
        }

        if state.fail_assignments {
            return Err(GroupProtocolError::Session("coordinator unavailable".into()));
        }

        let members: Vec<ConsumerIdentifier> = state.members.iter().cloned().collect();
        let desired = assign_range(&members, self.partitions)
            .remove(&self.consumer)
            .unwrap_or_default();

        let available = desired.iter().all(|partition| {
            state
                .holders
                .get(partition)
                .map_or(true, |holder| *holder == self.consumer)
        });

        if !available {
            return Ok(None);
        }

        for partition in &desired {
            state.holders.insert(*partition, self.consumer.clone());
        }

        let generation = state.generation;
        state.settled.insert(self.consumer.clone(), generation);
        coordinator.notify(&mut state);
        self.generation = Some(generation);

        Ok(Some(Assignment::new(generation, desired)))
    }
}

#[async_trait]
impl GroupMembership for MockGroupMembership {
    async fn assign(&mut self) -> Result<Assignment, GroupProtocolError> {
        {
            let mut state = self.coordinator.state.lock().unwrap();
            self.coordinator.release(&mut state, &self.consumer);
            self.coordinator.notify(&mut state);
        }

        let mut changes = self.coordinator.changes.1.clone();

        loop {
            changes.borrow_and_update();

            if let Some(assignment) = self.try_assign()? {
                return Ok(assignment);
            }

            changes
                .changed()
                .await
                .map_err(|_| GroupProtocolError::Closed)?;
        }
    }

    async fn revoked(&mut self) -> Result<(), GroupProtocolError> {
        let mut changes = self.coordinator.changes.1.clone();

        loop {
            changes.borrow_and_update();

            {
                let state = self.coordinator.state.lock().unwrap();

                if !state.members.contains(&self.consumer) {
                    return Err(GroupProtocolError::Closed);
                }

                if state.fail_revocations {
                    let lost = state
                        .holders
                        .iter()
                        .find(|(_, holder)| **holder == self.consumer)
                        .map_or(Partition::new(0), |(partition, _)| *partition);

                    return Err(GroupProtocolError::LeaseLost(lost));
                }

                if Some(state.generation) != self.generation {
                    return Ok(());
                }
            }

            changes
                .changed()
                .await
                .map_err(|_| GroupProtocolError::Closed)?;
        }
    }

    async fn leave(&mut self) -> Result<(), GroupProtocolError> {
        let mut state = self.coordinator.state.lock().unwrap();

        if state.members.remove(&self.consumer) {
            self.coordinator.release(&mut state, &self.consumer);
            state.generation += 1;
            self.coordinator.notify(&mut state);
        }

        Ok(())
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    fn queue() -> QueueDescriptor {
        QueueDescriptor::new("mock".into(), 4, 100)
    }

    #[tokio::test]
    async fn withhold_partitions_until_released() {
        let coordinator = MockGroupCoordinator::default();
        let group = ConsumerGroupDescriptor::default();

        let mut first = coordinator.join(&queue(), &group, "a").await.unwrap();
        assert_eq!(first.assign().await.unwrap().partitions.len(), 4);

        let mut second = coordinator.join(&queue(), &group, "b").await.unwrap();
        let pending = tokio::spawn(async move {
            let assignment = second.assign().await.unwrap();
            (second, assignment)
        });

        first.revoked().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(coordinator.holders().values().all(|holder| holder == "a"));

        let assignment = first.assign().await.unwrap();
        let (_, other) = pending.await.unwrap();

        assert_eq!(assignment.partitions.len(), 2);
        assert_eq!(other.partitions.len(), 2);
        assert!(assignment.partitions.is_disjoint(&other.partitions));
    }
}
