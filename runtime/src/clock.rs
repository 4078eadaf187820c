//! Deterministic chain clock.

use serde::{Deserialize, Serialize};
use vegauge_types::{BlockHeight, Timestamp};

/// Block height and wall-clock time of the simulated host ledger.
///
/// Time only moves when told to: [`ChainClock::mine`] advances both clocks,
/// [`ChainClock::advance_time`] only the wall clock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainClock {
    block: BlockHeight,
    timestamp: Timestamp,
    block_time_secs: u64,
}

impl ChainClock {
    pub fn new(block: BlockHeight, timestamp: Timestamp, block_time_secs: u64) -> Self {
        Self {
            block,
            timestamp,
            block_time_secs,
        }
    }

    pub fn block(&self) -> BlockHeight {
        self.block
    }

    pub fn now(&self) -> Timestamp {
        self.timestamp
    }

    pub fn block_time_secs(&self) -> u64 {
        self.block_time_secs
    }

    /// Produce `blocks` blocks. Returns the new height.
    pub fn mine(&mut self, blocks: u64) -> BlockHeight {
        let secs = blocks.saturating_mul(self.block_time_secs);
        self.block = BlockHeight::new(self.block.as_u64().saturating_add(blocks));
        self.timestamp = Timestamp::new(self.timestamp.as_secs().saturating_add(secs));
        self.block
    }

    /// Move wall-clock time forward without producing blocks.
    pub fn advance_time(&mut self, secs: u64) -> Timestamp {
        self.timestamp = Timestamp::new(self.timestamp.as_secs().saturating_add(secs));
        self.timestamp
    }
}
