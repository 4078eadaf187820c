use proptest::prelude::*;
use std::collections::BTreeMap;

use vegauge_access::Operator;
use vegauge_emission::{EmissionController, EmissionParams, EmissionSchedule};
use vegauge_token::{Balances, RewardToken};
use vegauge_types::{Address, BlockHeight, WAD};

#[derive(Clone, Debug)]
enum Change {
    Rate(u128),
    Weight(u64, u128),
    Boost(u128, u128),
}

fn change() -> impl Strategy<Value = Change> {
    prop_oneof![
        (0u128..1_000 * WAD).prop_map(Change::Rate),
        (0u64..2, 0u128..1_000).prop_map(|(p, w)| Change::Weight(p, w)),
        (0u128..1_000_000, 0u128..1_000_000).prop_map(|(a, b)| Change::Boost(a, b)),
    ]
}

const OPERATOR: u64 = 1;
const CONTROLLER: u64 = 2;
const ALICE: u64 = 10;
const TOKENS: [u64; 2] = [100, 200];

struct World {
    emission: EmissionController,
    stake: [Balances; 2],
    reward: RewardToken,
}

fn world() -> World {
    let operator = Address::from_low_u64(OPERATOR);
    let params = EmissionParams {
        token_per_block: 10 * WAD,
        start_block: BlockHeight::new(0),
        mint_duration: 100,
        base_share_bps: 3_000,
    };
    let mut emission = EmissionController::new(
        Address::from_low_u64(900),
        Operator::new(operator),
        &params,
        BlockHeight::new(0),
    )
    .unwrap();
    emission
        .add_controller(&operator, Address::from_low_u64(CONTROLLER))
        .unwrap();
    let mut reward = RewardToken::new("Reward", "RWD", Operator::new(operator));
    let mut stake = [Balances::new(), Balances::new()];
    // A one-unit stake makes every accumulator step exact.
    for (i, t) in TOKENS.iter().enumerate() {
        let token = Address::from_low_u64(*t);
        let gauge = emission
            .create_gauge(&operator, token, 1, true, BlockHeight::new(0))
            .unwrap();
        reward.add_pool(&operator, gauge).unwrap();
        stake[i].credit(&Address::from_low_u64(ALICE), WAD).unwrap();
        emission
            .deposit(
                &token,
                &Address::from_low_u64(ALICE),
                1,
                BlockHeight::new(0),
                &mut stake[i],
                &mut reward,
            )
            .unwrap();
    }
    World {
        emission,
        stake,
        reward,
    }
}

fn apply(w: &mut World, change: &Change, at: BlockHeight, settle: bool) {
    let operator = Address::from_low_u64(OPERATOR);
    match change {
        Change::Rate(r) => {
            w.emission.set_token_per_block(&operator, *r, settle, at).unwrap();
        }
        Change::Weight(p, weight) => {
            let token = Address::from_low_u64(TOKENS[*p as usize]);
            w.emission
                .set_pool_weight(&operator, &token, *weight, settle, at)
                .unwrap();
        }
        Change::Boost(a, b) => {
            let tallies = BTreeMap::from([
                (Address::from_low_u64(TOKENS[0]), *a),
                (Address::from_low_u64(TOKENS[1]), *b),
            ]);
            w.emission
                .set_boost_weights(&Address::from_low_u64(CONTROLLER), &tallies, at)
                .unwrap();
        }
    }
}

proptest! {
    /// Eager and deferred settlement pay exactly the same rewards.
    #[test]
    fn settlement_timing_does_not_drift(changes in prop::collection::vec((1u64..50, change()), 1..20)) {
        let mut eager = world();
        let mut lazy = world();
        let mut now = 0u64;
        for (gap, c) in &changes {
            now += gap;
            apply(&mut eager, c, BlockHeight::new(now), true);
            apply(&mut lazy, c, BlockHeight::new(now), false);
        }
        let end = BlockHeight::new(now + 10);
        let alice = Address::from_low_u64(ALICE);
        for (i, t) in TOKENS.iter().enumerate() {
            let token = Address::from_low_u64(*t);
            let a = eager.emission.get_reward(&token, &alice, &alice, end, &mut eager.reward).unwrap();
            let b = lazy.emission.get_reward(&token, &alice, &alice, end, &mut lazy.reward).unwrap();
            prop_assert_eq!(a, b);
            prop_assert_eq!(eager.stake[i].total_supply(), lazy.stake[i].total_supply());
        }
        prop_assert_eq!(eager.reward.total_supply(), lazy.reward.total_supply());
    }

    /// Pools never receive more than was emitted over a range.
    #[test]
    fn pool_rewards_never_exceed_emission(
        rate in 0u128..1_000_000 * WAD,
        share in 0u32..=10_000,
        weights in prop::collection::vec(0u128..1_000_000, 1..6),
        boosts in prop::collection::vec(0u128..1_000_000, 1..6),
        blocks in 1u64..10_000,
    ) {
        let h0 = BlockHeight::new(0);
        let mut s = EmissionSchedule::new(h0, rate, share, h0).unwrap();
        for (i, w) in weights.iter().enumerate() {
            s.set_weight(Address::from_low_u64(i as u64 + 1), *w, h0).unwrap();
        }
        let tallies: BTreeMap<Address, u128> = boosts
            .iter()
            .enumerate()
            .map(|(i, b)| (Address::from_low_u64(i as u64 + 1), *b))
            .collect();
        s.set_boosts(&tallies, h0).unwrap();

        let total: u128 = (1..=weights.len().max(boosts.len()) as u64)
            .map(|i| s.reward_between(&Address::from_low_u64(i), h0, BlockHeight::new(blocks)).unwrap())
            .sum();
        prop_assert!(total <= rate * blocks as u128);
    }

    /// Splitting a range at any block gives the same reward as the whole range.
    #[test]
    fn reward_is_additive_over_ranges(
        rates in prop::collection::vec((1u64..100, 0u128..1_000 * WAD), 1..10),
        split in 0u64..1_000,
    ) {
        let h0 = BlockHeight::new(0);
        let pool = Address::from_low_u64(1);
        let mut s = EmissionSchedule::new(h0, WAD, 10_000, h0).unwrap();
        s.set_weight(pool, 1, h0).unwrap();
        let mut at = 0u64;
        for (gap, r) in rates {
            at += gap;
            s.set_rate(r, BlockHeight::new(at)).unwrap();
        }
        let end = BlockHeight::new(1_000);
        let mid = BlockHeight::new(split);
        let whole = s.reward_between(&pool, h0, end).unwrap();
        let parts = s.reward_between(&pool, h0, mid).unwrap() + s.reward_between(&pool, mid, end).unwrap();
        prop_assert_eq!(whole, parts);
    }
}
