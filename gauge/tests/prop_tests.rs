use proptest::prelude::*;

use vegauge_access::Operator;
use vegauge_gauge::{FlatRate, Gauge};
use vegauge_token::{Balances, RewardToken, TokenLedger};
use vegauge_types::{Address, BlockHeight, PRECISION, WAD};

#[derive(Clone, Debug)]
enum Op {
    Deposit(u64, u128),
    Withdraw(u64, u32),
    Claim(u64),
    Advance(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..4, WAD..1_000_000 * WAD).prop_map(|(u, a)| Op::Deposit(u, a)),
        (1u64..4, 1u32..=10_000).prop_map(|(u, bps)| Op::Withdraw(u, bps)),
        (1u64..4).prop_map(Op::Claim),
        (0u64..20).prop_map(Op::Advance),
    ]
}

const GAUGE: u64 = 500;
const FUNDS: u128 = 10_000_000 * WAD;

proptest! {
    /// Paid + pending + forfeited tracks the reward credited to the pool,
    /// off only by fixed-point rounding.
    #[test]
    fn rewards_are_conserved(rate in 1u128..1_000 * WAD, ops in prop::collection::vec(op(), 1..60)) {
        let operator = Address::from_low_u64(1);
        let mut reward = RewardToken::new("Reward", "RWD", Operator::new(operator));
        reward.add_pool(&operator, Address::from_low_u64(GAUGE)).unwrap();
        let mut stake = Balances::new();
        for u in 1..4 {
            stake.credit(&Address::from_low_u64(u), FUNDS).unwrap();
        }
        let mut gauge = Gauge::new(Address::from_low_u64(GAUGE), Address::from_low_u64(600), BlockHeight::new(0));
        let src = FlatRate(rate);
        let mut now = 0u64;
        let mut settles = 0u128;
        let mut interactions = 0u128;

        for op in ops {
            let h = BlockHeight::new(now);
            match op {
                Op::Deposit(u, amount) => {
                    let user = Address::from_low_u64(u);
                    if stake.balance_of(&user) >= amount {
                        gauge.deposit(&user, amount, h, &src, &mut stake, &mut reward).unwrap();
                        settles += 1;
                        interactions += 1;
                    }
                }
                Op::Withdraw(u, bps) => {
                    let user = Address::from_low_u64(u);
                    let staked = gauge.stake_of(&user).amount;
                    let mut amount = staked * bps as u128 / 10_000;
                    // Keep every live stake at least one token so the accumulator stays bounded.
                    if staked - amount < WAD {
                        amount = staked;
                    }
                    if amount > 0 {
                        gauge.withdraw(&user, amount, h, &src, &mut stake, &mut reward).unwrap();
                        settles += 1;
                        interactions += 1;
                    }
                }
                Op::Claim(u) => {
                    let user = Address::from_low_u64(u);
                    gauge.get_reward(&user, &user, h, &src, &mut reward).unwrap();
                    settles += 1;
                    interactions += 1;
                }
                Op::Advance(n) => now += n,
            }
        }
        let end = BlockHeight::new(now);
        gauge.update_pool(end, &src).unwrap();
        settles += 1;

        let pending: u128 = (1..4)
            .map(|u| gauge.pending_reward(&Address::from_low_u64(u), end, &src).unwrap())
            .sum();
        prop_assert_eq!(reward.total_supply(), gauge.total_paid());
        prop_assert_eq!(gauge.total_accrued(), rate * now as u128);

        let accounted = gauge.total_paid() + pending + gauge.forfeited();
        prop_assert!(accounted <= gauge.total_accrued() + interactions + 3);
        let max_staked = 3 * FUNDS;
        let bound = settles * (max_staked / PRECISION + 1) + interactions + 3;
        prop_assert!(gauge.total_accrued() - accounted.min(gauge.total_accrued()) <= bound);
    }

    /// Stake custody always matches the recorded total.
    #[test]
    fn custody_matches_total_staked(ops in prop::collection::vec(op(), 1..40)) {
        let operator = Address::from_low_u64(1);
        let mut reward = RewardToken::new("Reward", "RWD", Operator::new(operator));
        reward.add_pool(&operator, Address::from_low_u64(GAUGE)).unwrap();
        let mut stake = Balances::new();
        for u in 1..4 {
            stake.credit(&Address::from_low_u64(u), FUNDS).unwrap();
        }
        let mut gauge = Gauge::new(Address::from_low_u64(GAUGE), Address::from_low_u64(600), BlockHeight::new(0));
        let src = FlatRate(WAD);
        let mut now = 0u64;
        for op in ops {
            let h = BlockHeight::new(now);
            match op {
                Op::Deposit(u, amount) => {
                    let user = Address::from_low_u64(u);
                    if stake.balance_of(&user) >= amount {
                        gauge.deposit(&user, amount, h, &src, &mut stake, &mut reward).unwrap();
                    }
                }
                Op::Withdraw(u, _) => {
                    let user = Address::from_low_u64(u);
                    if gauge.stake_of(&user).amount > 0 {
                        gauge.emergency_withdraw(&user, &mut stake).unwrap();
                    }
                }
                Op::Claim(_) => {}
                Op::Advance(n) => now += n,
            }
            prop_assert_eq!(stake.balance_of(&Address::from_low_u64(GAUGE)), gauge.total_staked());
        }
    }
}
