use std::sync::atomic::{AtomicU64, Ordering};

/// Read-only view of the chain height: a monotonically increasing counter
/// provisioned by the execution environment. The engine uses it for round
/// window validation and claim gating only.
pub trait HeightOracle: Send + Sync {
    fn current_height(&self) -> u64;
}

/// In-process height source. Tests drive it the way a test harness mines
/// empty blocks.
pub struct BlockClock {
    height: AtomicU64,
}

impl BlockClock {
    pub fn new() -> Self {
        Self {
            height: AtomicU64::new(0),
        }
    }

    pub fn at(height: u64) -> Self {
        Self {
            height: AtomicU64::new(height),
        }
    }

    pub fn advance(&self, blocks: u64) {
        self.height.fetch_add(blocks, Ordering::SeqCst);
    }
}

impl Default for BlockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HeightOracle for BlockClock {
    fn current_height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }
}
