//! Consumer-group notifications.
//!
//! A notification is emitted around every partition rebalance so that
//! applications can observe which partitions this member claimed or released.

use serde::Serialize;
use std::collections::BTreeMap;

/// Topic name to sorted partition numbers.
pub type PartitionMap = BTreeMap<String, Vec<i32>>;

/// Rebalance phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    /// Partitions are being revoked ahead of a reassignment
    RebalanceStart,
    /// A new assignment is in effect
    RebalanceOk,
    /// The group coordinator reported a rebalance failure
    RebalanceError,
}

/// A consumer-group rebalance notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Partitions newly assigned to this member
    pub claimed: PartitionMap,
    /// Partitions taken away from this member
    pub released: PartitionMap,
    /// Full assignment after the rebalance
    pub current: PartitionMap,
    /// Failure description for [`NotificationKind::RebalanceError`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Notification {
    pub fn rebalance_start(released: PartitionMap) -> Self {
        Self {
            kind: NotificationKind::RebalanceStart,
            claimed: PartitionMap::new(),
            released,
            current: PartitionMap::new(),
            error: None,
        }
    }

    pub fn rebalance_ok(claimed: PartitionMap, current: PartitionMap) -> Self {
        Self {
            kind: NotificationKind::RebalanceOk,
            claimed,
            released: PartitionMap::new(),
            current,
            error: None,
        }
    }

    pub fn rebalance_error(error: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::RebalanceError,
            claimed: PartitionMap::new(),
            released: PartitionMap::new(),
            current: PartitionMap::new(),
            error: Some(error.into()),
        }
    }
}

/// Collect `(topic, partition)` pairs into a [`PartitionMap`] with sorted,
/// de-duplicated partitions.
pub fn partition_map<'a, I>(pairs: I) -> PartitionMap
where
    I: IntoIterator<Item = (&'a str, i32)>,
{
    let mut map = PartitionMap::new();
    for (topic, partition) in pairs {
        map.entry(topic.to_string()).or_default().push(partition);
    }
    for partitions in map.values_mut() {
        partitions.sort_unstable();
        partitions.dedup();
    }
    map
}
