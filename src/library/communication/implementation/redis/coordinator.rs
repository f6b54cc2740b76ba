use super::super::super::event::{
    assign_range, Assignment, ConsumerGroupDescriptor, GroupCoordinator, GroupMembership,
    GroupProtocolError, Partition, QueueDescriptor,
};
use super::{RedisConnection, RedisConnectionVariant, RedisFactory};
use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use redis::{AsyncCommands, RedisError, Script};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

lazy_static! {
    /// Extends the lifetime of a lease if it is still held by the caller
    ///
    /// KEYS[1] = lease, ARGV[1] = owner, ARGV[2] = ttl in milliseconds
    static ref REFRESH_LEASE: Script = Script::new(
        r"
        if redis.call('GET', KEYS[1]) == ARGV[1] then
            return redis.call('PEXPIRE', KEYS[1], ARGV[2])
        end
        return 0
        "
    );

    /// Deletes a lease if it is still held by the caller
    ///
    /// KEYS[1] = lease, ARGV[1] = owner
    static ref RELEASE_LEASE: Script = Script::new(
        r"
        if redis.call('GET', KEYS[1]) == ARGV[1] then
            return redis.call('DEL', KEYS[1])
        end
        return 0
        "
    );
}

fn session_error(error: RedisError) -> GroupProtocolError {
    GroupProtocolError::Session(error.into())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Redis keys describing the state of one consumer group on one queue
#[derive(Debug, Clone)]
struct GroupKeys {
    prefix: String,
}

impl GroupKeys {
    fn new(queue: &QueueDescriptor, group: &ConsumerGroupDescriptor) -> Self {
        Self {
            prefix: format!("{}.group.{}", queue.key(), group.identifier()),
        }
    }

    /// Sorted set of member identifiers scored by their last heartbeat
    fn members(&self) -> String {
        format!("{}.members", self.prefix)
    }

    /// Counter incremented on every membership change
    fn generation(&self) -> String {
        format!("{}.generation", self.prefix)
    }

    /// Lease holding the identifier of the member owning the partition
    fn owner(&self, partition: Partition) -> String {
        format!("{}.owner.{}", self.prefix, partition)
    }
}

/// [`GroupCoordinator`] implementation using plain redis keys
///
/// Members announce themselves in a sorted set scored by their last heartbeat, any change to the set
/// increments the group generation. Every member derives the [range assignment](assign_range) of the
/// current generation locally and only processes a partition while it holds the corresponding lease.
/// Leases expire after the session timeout so partitions of crashed members become available again.
#[derive(Clone)]
pub struct RedisGroupCoordinator<F> {
    factory: F,
    heartbeat_interval: Duration,
    session_timeout: Duration,
}

impl<F> RedisGroupCoordinator<F>
where
    F: RedisFactory + Send + Sync,
{
    /// Creates a new instance with the given session timings
    ///
    /// The heartbeat interval should be well below the session timeout, otherwise live
    /// members will be evicted and leases lost.
    pub fn new(factory: F, heartbeat_interval: Duration, session_timeout: Duration) -> Self {
        Self {
            factory,
            heartbeat_interval,
            session_timeout,
        }
    }
}

#[async_trait]
impl<F> GroupCoordinator for RedisGroupCoordinator<F>
where
    F: RedisFactory + Send + Sync,
{
    type Membership = RedisGroupMembership;

    #[instrument(skip(self, queue, group), fields(queue = queue.key(), group = %group.identifier()))]
    async fn join(
        &self,
        queue: &QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        consumer: &str, // &ConsumerIdentifier
    ) -> Result<Self::Membership, GroupProtocolError> {
        let keys = GroupKeys::new(queue, group);
        let mut con = self
            .factory
            .connection(RedisConnectionVariant::Multiplexed)
            .await
            .map_err(GroupProtocolError::Session)?;

        con.zadd::<_, _, _, ()>(keys.members(), consumer, now_millis())
            .await
            .map_err(session_error)?;

        let generation: u64 = con
            .incr(keys.generation(), 1)
            .await
            .map_err(session_error)?;

        info!(generation, "Joined group");

        Ok(RedisGroupMembership {
            con,
            keys,
            consumer: consumer.to_owned(),
            partitions: queue.partitions(),
            heartbeat_interval: self.heartbeat_interval,
            session_timeout: self.session_timeout,
            generation: None,
            owned: BTreeSet::new(),
            closed: false,
        })
    }
}

/// Membership of a consumer in a group coordinated by the [`RedisGroupCoordinator`]
pub struct RedisGroupMembership {
    con: RedisConnection,
    keys: GroupKeys,
    consumer: String,
    partitions: u32,
    heartbeat_interval: Duration,
    session_timeout: Duration,
    generation: Option<u64>,
    owned: BTreeSet<Partition>,
    closed: bool,
}

impl RedisGroupMembership {
    fn lease_ttl(&self) -> u64 {
        self.session_timeout.as_millis() as u64
    }

    /// Refreshes the membership and all held leases, evicts stale members, and returns the current generation
    async fn heartbeat(&mut self) -> Result<u64, GroupProtocolError> {
        if self.closed {
            return Err(GroupProtocolError::Closed);
        }

        let now = now_millis();
        let deadline = now - self.session_timeout.as_millis() as i64;
        let members = self.keys.members();

        let score: Option<f64> = self
            .con
            .zscore(&members, &self.consumer)
            .await
            .map_err(session_error)?;

        if score.is_none() {
            warn!(consumer = %self.consumer, "Evicted from consumer group");
            self.closed = true;
            return Err(GroupProtocolError::Closed);
        }

        self.con
            .zadd::<_, _, _, ()>(&members, &self.consumer, now)
            .await
            .map_err(session_error)?;

        let stale: Vec<String> = self
            .con
            .zrangebyscore(&members, "-inf", format!("({}", deadline))
            .await
            .map_err(session_error)?;

        if !stale.is_empty() {
            let evicted: usize = self
                .con
                .zrem(&members, &stale)
                .await
                .map_err(session_error)?;

            // Only the member which actually removed the entries bumps the generation
            if evicted > 0 {
                info!(?stale, "Evicted stale group members");
                self.con
                    .incr::<_, _, ()>(self.keys.generation(), 1)
                    .await
                    .map_err(session_error)?;
            }
        }

        let ttl = self.lease_ttl();
        for partition in self.owned.clone() {
            let refreshed: i64 = REFRESH_LEASE
                .key(self.keys.owner(partition))
                .arg(&self.consumer)
                .arg(ttl)
                .invoke_async(&mut self.con)
                .await
                .map_err(session_error)?;

            if refreshed == 0 {
                self.owned.remove(&partition);
                return Err(GroupProtocolError::LeaseLost(partition));
            }
        }

        self.current_generation().await
    }

    async fn current_generation(&mut self) -> Result<u64, GroupProtocolError> {
        let generation: Option<u64> = self
            .con
            .get(self.keys.generation())
            .await
            .map_err(session_error)?;

        Ok(generation.unwrap_or_default())
    }

    async fn desired_partitions(&mut self) -> Result<BTreeSet<Partition>, GroupProtocolError> {
        let members: Vec<String> = self
            .con
            .zrange(self.keys.members(), 0, -1)
            .await
            .map_err(session_error)?;

        Ok(assign_range(&members, self.partitions)
            .remove(&self.consumer)
            .unwrap_or_default())
    }

    async fn acquire(&mut self, partition: Partition) -> Result<bool, GroupProtocolError> {
        let acquired: Option<String> = redis::cmd("SET")
            .arg(self.keys.owner(partition))
            .arg(&self.consumer)
            .arg("NX")
            .arg("PX")
            .arg(self.lease_ttl())
            .query_async(&mut self.con)
            .await
            .map_err(session_error)?;

        if acquired.is_some() {
            self.owned.insert(partition);
        }

        Ok(acquired.is_some())
    }

    async fn release_all(&mut self) -> Result<(), GroupProtocolError> {
        for partition in std::mem::take(&mut self.owned) {
            RELEASE_LEASE
                .key(self.keys.owner(partition))
                .arg(&self.consumer)
                .invoke_async::<_, i64>(&mut self.con)
                .await
                .map_err(session_error)?;
        }

        Ok(())
    }
}

#[async_trait]
impl GroupMembership for RedisGroupMembership {
    async fn assign(&mut self) -> Result<Assignment, GroupProtocolError> {
        self.release_all().await?;

        'generation: loop {
            let generation = self.heartbeat().await?;
            let desired = self.desired_partitions().await?;
            let mut pending: BTreeSet<Partition> = desired.clone();

            loop {
                for partition in pending.clone() {
                    if self.acquire(partition).await? {
                        pending.remove(&partition);
                    }
                }

                if pending.is_empty() {
                    debug!(generation, partitions = ?desired, "Acquired all partition leases");
                    self.generation = Some(generation);
                    return Ok(Assignment::new(generation, desired));
                }

                debug!(waiting_for = ?pending, "Partitions are still held by other members");
                sleep(self.heartbeat_interval).await;

                if self.heartbeat().await? != generation {
                    self.release_all().await?;
                    continue 'generation;
                }
            }
        }
    }

    async fn revoked(&mut self) -> Result<(), GroupProtocolError> {
        loop {
            let generation = self.heartbeat().await?;

            if Some(generation) != self.generation {
                debug!(
                    previous = ?self.generation,
                    current = generation,
                    "Group generation changed"
                );
                return Ok(());
            }

            sleep(self.heartbeat_interval).await;
        }
    }

    async fn leave(&mut self) -> Result<(), GroupProtocolError> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        self.release_all().await?;

        self.con
            .zrem::<_, _, ()>(self.keys.members(), &self.consumer)
            .await
            .map_err(session_error)?;

        self.con
            .incr::<_, _, ()>(self.keys.generation(), 1)
            .await
            .map_err(session_error)?;

        info!(consumer = %self.consumer, "Left group");

        Ok(())
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::library::communication::event::{ConsumerGroupIdentifier, QueueLocation};

    #[test]
    fn derive_group_keys() {
        let queue = QueueDescriptor::new("notifications".into(), 4, 100);
        let group = ConsumerGroupDescriptor::new(
            ConsumerGroupIdentifier::Other("inbox".into()),
            QueueLocation::Head,
        );
        let keys = GroupKeys::new(&queue, &group);

        assert_eq!(keys.members(), "notifications.group.inbox.members");
        assert_eq!(keys.generation(), "notifications.group.inbox.generation");
        assert_eq!(
            keys.owner(Partition::new(3)),
            "notifications.group.inbox.owner.3"
        );
    }
}
