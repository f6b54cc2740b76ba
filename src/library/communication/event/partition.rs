use super::ConsumerIdentifier;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

const MURMUR_SEED: u32 = 0x9747_b28c;
const MURMUR_MULTIPLIER: u32 = 0x5bd1_e995;
const MURMUR_SHIFT: u32 = 24;

/// Independently consumable, ordered slice of a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Partition(u32);

impl Partition {
    /// Creates a new instance from its zero-based index
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Zero-based index of the partition within its queue
    pub fn index(&self) -> u32 {
        self.0
    }

    /// Selects the partition for a given key out of `count` partitions
    ///
    /// Uses the same scheme as the default Kafka partitioner (positive murmur2 hash modulo the
    /// partition count) so the mapping is stable across processes, platforms and releases.
    pub fn for_key(key: &str, count: u32) -> Self {
        let count = count.max(1);
        Self((murmur2(key.as_bytes()) & 0x7fff_ffff) % count)
    }

    /// Iterates all partitions of a queue with `count` partitions
    pub fn all(count: u32) -> impl Iterator<Item = Partition> {
        (0..count).map(Partition)
    }
}

impl Display for Partition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 32-bit murmur2 hash as used for key based partitioning
fn murmur2(data: &[u8]) -> u32 {
    let length = data.len();
    let mut h = MURMUR_SEED ^ (length as u32);

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(MURMUR_MULTIPLIER);
        k ^= k >> MURMUR_SHIFT;
        k = k.wrapping_mul(MURMUR_MULTIPLIER);
        h = h.wrapping_mul(MURMUR_MULTIPLIER);
        h ^= k;
    }

    let tail = chunks.remainder();
    if tail.len() >= 3 {
        h ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        h ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        h ^= tail[0] as u32;
        h = h.wrapping_mul(MURMUR_MULTIPLIER);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(MURMUR_MULTIPLIER);
    h ^= h >> 15;

    h
}

/// Errors that may occur when parsing an [`Offset`]
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid offset '{0}'")]
pub struct InvalidOffsetError(String);

/// Position of an entry within a partition
///
/// Offsets are totally ordered within one partition and have no meaning across partitions.
/// The textual representation is `<major>-<minor>` (e.g. a redis stream id) where the minor
/// part may be omitted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Offset {
    major: u64,
    minor: u64,
}

impl Offset {
    /// Creates a new instance from raw parts
    pub fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }

    /// Creates an offset for logs which number their entries sequentially
    pub fn sequential(index: u64) -> Self {
        Self::new(index, 0)
    }
}

impl Display for Offset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.major, self.minor)
    }
}

impl FromStr for Offset {
    type Err = InvalidOffsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidOffsetError(s.to_owned());
        let mut parts = s.splitn(2, '-');

        let major = parts
            .next()
            .and_then(|major| major.parse().ok())
            .ok_or_else(invalid)?;

        let minor = match parts.next() {
            Some(minor) => minor.parse().map_err(|_| invalid())?,
            None => 0,
        };

        Ok(Self { major, minor })
    }
}

/// Location a queue entry has been delivered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Delivery {
    /// Partition the entry was read from
    pub partition: Partition,
    /// Position of the entry within the partition
    pub offset: Offset,
}

impl Delivery {
    /// Creates a new instance from raw parts
    pub fn new(partition: Partition, offset: Offset) -> Self {
        Self { partition, offset }
    }
}

impl Display for Delivery {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.partition, self.offset)
    }
}

/// Set of partitions granted to a consumer for one generation of its group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    /// Generation of the group this assignment is valid for
    pub generation: u64,
    /// Partitions owned exclusively by the consumer
    pub partitions: BTreeSet<Partition>,
}

impl Assignment {
    /// Creates a new instance from raw parts
    pub fn new(generation: u64, partitions: BTreeSet<Partition>) -> Self {
        Self {
            generation,
            partitions,
        }
    }
}

/// Distributes `partitions` among `members` in contiguous ranges
///
/// Members are sorted by their identifier; each receives `partitions / members` partitions and the
/// first `partitions % members` receive one extra. Every member is contained in the result, even if
/// it is assigned nothing. As the result only depends on the inputs, every member of a group computes
/// the same assignment without further coordination.
pub fn assign_range(
    members: &[ConsumerIdentifier],
    partitions: u32,
) -> BTreeMap<ConsumerIdentifier, BTreeSet<Partition>> {
    let members: BTreeSet<&ConsumerIdentifier> = members.iter().collect();
    let mut assignments = BTreeMap::new();

    if members.is_empty() {
        return assignments;
    }

    let member_count = members.len() as u32;
    let per_member = partitions / member_count;
    let remainder = partitions % member_count;
    let mut next = 0;

    for (index, member) in members.into_iter().enumerate() {
        let count = if (index as u32) < remainder {
            per_member + 1
        } else {
            per_member
        };

        let owned = (next..next + count).map(Partition).collect();
        assignments.insert(member.to_owned(), owned);
        next += count;
    }

    assignments
}
