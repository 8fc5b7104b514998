use std::collections::VecDeque;

use serde_json::Value;

use crate::version::NodeVersion;

/// An immutable, cheaply-cloned view of a node's current data, handed to
/// subscriber callbacks after the node's internal lock has been released.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub data: Value,
    pub version: NodeVersion,
}

/// A single named record: its current value, version, and a bounded trail of
/// prior full values kept so that a client reconnecting with a stale
/// known-version can still be told what changed, up to the retention budget.
#[derive(Debug, Clone)]
pub struct Node {
    data: Value,
    version: NodeVersion,
    history: VecDeque<Value>,
}

impl Node {
    #[must_use]
    pub fn new(initial_data: Value) -> Self {
        Self {
            data: initial_data,
            version: NodeVersion::generate(),
            history: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    #[must_use]
    pub fn version(&self) -> NodeVersion {
        self.version
    }

    #[must_use]
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            data: self.data.clone(),
            version: self.version,
        }
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Replaces the node's data if it actually differs from the current
    /// value, pushing the superseded value onto the history and advancing
    /// the version. Returns `true` iff the data changed.
    ///
    /// `history_ratio_percent` bounds the retained history to that percentage
    /// of the current data's serialized size, trimming the oldest entries
    /// first.
    pub fn update(&mut self, new_data: Value, history_ratio_percent: u32) -> bool {
        if new_data == self.data {
            return false;
        }

        let superseded = std::mem::replace(&mut self.data, new_data);
        self.history.push_front(superseded);
        self.version = self.version.increment();
        self.trim_history(history_ratio_percent);
        true
    }

    fn trim_history(&mut self, history_ratio_percent: u32) {
        let budget = serialized_size(&self.data) * u64::from(history_ratio_percent) / 100;
        while self.history_serialized_size() > budget {
            if self.history.pop_back().is_none() {
                break;
            }
        }
    }

    fn history_serialized_size(&self) -> u64 {
        self.history.iter().map(serialized_size).sum()
    }
}

fn serialized_size(value: &Value) -> u64 {
    serde_json::to_vec(value).map_or(0, |bytes| bytes.len() as u64)
}
