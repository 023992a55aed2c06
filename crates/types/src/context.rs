//! Per-context configuration.

use sbor::prelude::*;
use std::fmt;

/// Where the work items of a context are stored.
///
/// A capacity tradeoff only. Either choice yields the same results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, BasicSbor)]
pub enum ManagementStrategy {
    /// Requests live in the partition that owns the context.
    #[default]
    Colocated,
    /// Requests are spread over all partitions by their own key.
    Distributed,
}

impl fmt::Display for ManagementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagementStrategy::Colocated => write!(f, "COLOCATED"),
            ManagementStrategy::Distributed => write!(f, "DISTRIBUTED"),
        }
    }
}

/// Configuration a context is registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BasicSbor)]
pub struct ContextConfiguration {
    management_strategy: ManagementStrategy,
}

impl ContextConfiguration {
    pub fn new(management_strategy: ManagementStrategy) -> Self {
        Self {
            management_strategy,
        }
    }

    pub fn management_strategy(&self) -> ManagementStrategy {
        self.management_strategy
    }
}
