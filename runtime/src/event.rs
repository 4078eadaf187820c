//! Events raised by committed transactions.

use vegauge_token::TokenEvent;
use vegauge_types::{Address, BlockHeight, LockId, Timestamp};

/// Runtime-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeEvent {
    LockCreated {
        id: LockId,
        owner: Address,
        amount: u128,
        end: Timestamp,
    },
    LockIncreased {
        id: LockId,
        amount: u128,
    },
    LockExtended {
        id: LockId,
        end: Timestamp,
    },
    LockWithdrawn {
        id: LockId,
        owner: Address,
        amount: u128,
    },
    GaugeCreated {
        token: Address,
        gauge: Address,
        weight: u128,
    },
    RateChanged {
        previous: u128,
        rate: u128,
        at: BlockHeight,
    },
    PoolWeightChanged {
        token: Address,
        weight: u128,
    },
    PoolRemoved {
        token: Address,
    },
    Deposit {
        token: Address,
        user: Address,
        amount: u128,
    },
    Withdraw {
        token: Address,
        user: Address,
        amount: u128,
    },
    RewardPaid {
        token: Address,
        user: Address,
        to: Address,
        amount: u128,
    },
    /// A reward-token minter pool was authorised.
    MinterPoolAdded(Address),
    MinterPoolRemoved(Address),
    Minted {
        minter: Address,
        to: Address,
        amount: u128,
    },
    VoteCast {
        lock_id: LockId,
        pool: Address,
        bps: u32,
        weight: u128,
    },
    WeightsCheckpointed {
        at: BlockHeight,
    },
}

impl From<TokenEvent> for RuntimeEvent {
    fn from(event: TokenEvent) -> Self {
        match event {
            TokenEvent::PoolAdded(pool) => RuntimeEvent::MinterPoolAdded(pool),
            TokenEvent::PoolRemoved(pool) => RuntimeEvent::MinterPoolRemoved(pool),
            TokenEvent::Minted { minter, to, amount } => RuntimeEvent::Minted { minter, to, amount },
        }
    }
}

/// Synchronous fan-out event bus.
///
/// Listeners run inline after a transaction commits; keep handlers fast.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&RuntimeEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&RuntimeEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &RuntimeEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));

        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&RuntimeEvent::WeightsCheckpointed {
            at: BlockHeight::new(1),
        });
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn emit_with_no_listeners_is_noop() {
        let bus = EventBus::new();
        bus.emit(&RuntimeEvent::PoolRemoved {
            token: Address::ZERO,
        });
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn token_events_convert() {
        let pool = Address::from_low_u64(3);
        assert_eq!(
            RuntimeEvent::from(TokenEvent::PoolAdded(pool)),
            RuntimeEvent::MinterPoolAdded(pool)
        );
    }
}
