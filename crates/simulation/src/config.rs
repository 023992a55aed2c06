//! Configuration for the simulated grid.

/// Configuration for a [`SimGrid`](crate::SimGrid).
#[derive(Clone, Debug)]
pub struct SimGridConfig {
    /// Number of partitions entries are spread over.
    pub partition_count: u32,
}

impl Default for SimGridConfig {
    fn default() -> Self {
        Self {
            partition_count: 31,
        }
    }
}

impl SimGridConfig {
    /// Set the number of partitions. At least one partition is kept.
    pub fn with_partitions(mut self, partition_count: u32) -> Self {
        self.partition_count = partition_count.max(1);
        self
    }
}
