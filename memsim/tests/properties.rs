use memsim::*;
use proptest::{collection::vec, prelude::*};

const MIN_CAPACITY: Units = 1;
const MAX_CAPACITY: Units = 256;
const MAX_OPS_PER_CASE: usize = 200;

#[derive(Debug, Clone)]
enum Op {
    Submit { size: Units, ticks: Ticks },
    Tick,
    // Index into the jobs submitted so far (modulo their number).
    Remove(usize),
    Flip,
}

#[derive(Debug, Clone)]
struct Case {
    capacity:   Units,
    policy:     Policy,
    ops:        Vec<Op>,
}

impl Case {
    /// Runs the case, checking every invariant after every step.
    fn run(&self) -> Simulator {
        let mut sim = Simulator::new(SimConfig::dynamic(self.capacity).with_policy(self.policy)).unwrap();
        let mut ids = vec![];
        for op in &self.ops {
            match op {
                Op::Submit { size, ticks } => {
                    let before = sim.table().snapshot();
                    match sim.submit("p", *size, *ticks) {
                        Ok(id) => ids.push(id),
                        // Rejected requests change nothing.
                        Err(_) => assert_eq!(sim.table().snapshot(), before),
                    }
                },
                Op::Tick => { sim.tick(); },
                Op::Remove(idx) => {
                    if !ids.is_empty() {
                        let _ = sim.remove(ids[idx % ids.len()]);
                    }
                },
                Op::Flip => {
                    let next = match sim.policy() {
                        Policy::FirstFit    => Policy::BestFit,
                        Policy::BestFit     => Policy::FirstFit,
                    };
                    sim.set_policy(next);
                },
            }
            assert_eq!(check_all(&sim), Ok(()));
            let stats = sim.stats();
            assert!(stats.occupancy <= stats.capacity);
            assert!(stats.occupancy <= stats.peak_occupancy);
            assert_eq!(stats.occupancy + stats.free_space, stats.capacity);
        }

        sim
    }
}

fn arb_op(capacity: Units) -> impl Strategy<Value = Op> {
    prop_oneof![
        // Sizes slightly beyond capacity exercise rejection.
        4 => (0..=capacity + 2, 0..8u32).prop_map(|(size, ticks)| Op::Submit { size, ticks }),
        3 => Just(Op::Tick),
        1 => any::<usize>().prop_map(Op::Remove),
        1 => Just(Op::Flip),
    ]
}

fn arb_case() -> impl Strategy<Value = Case> {
    (MIN_CAPACITY..=MAX_CAPACITY, prop_oneof![Just(Policy::FirstFit), Just(Policy::BestFit)])
        .prop_flat_map(|(capacity, policy)| {
            vec(arb_op(capacity), 1..=MAX_OPS_PER_CASE)
                .prop_map(move |ops| Case { capacity, policy, ops })
        })
}

/// Job ids cannot be forged outside the crate: queue up real ones.
fn owners(count: usize) -> Vec<JobId> {
    let mut sim = Simulator::new(SimConfig::dynamic(1)).unwrap();
    (0..count).map(|_| sim.submit("owner", 1, 1).unwrap()).collect()
}

/// An address-ordered layout of free/allocated regions, built
/// through the public table API.
fn arb_table() -> impl Strategy<Value = PartitionTable> {
    vec((1..16u32, any::<bool>()), 1..24).prop_map(|chunks| {
        let capacity = chunks.iter().map(|(len, _)| *len).sum();
        let mut table = PartitionTable::new(capacity);
        // Carve everything into allocated chunks, then free some.
        let carved = chunks.iter()
            .zip(owners(chunks.len()))
            .map(|((len, _), owner)| {
                let tail = table.iter().last().unwrap().id;
                table.split(tail, *len, owner).unwrap()
            })
            .collect::<Vec<_>>();
        for (region, (_, free)) in carved.into_iter().zip(chunks.iter()) {
            if *free {
                table.release(region).unwrap();
            }
        }
        table
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn invariants_hold_over_random_runs(case in arb_case()) {
        case.run();
    }

    #[test]
    fn runs_are_reproducible(case in arb_case()) {
        prop_assert_eq!(case.run().snapshot(), case.run().snapshot());
    }

    #[test]
    fn coalescing_twice_equals_once(mut table in arb_table()) {
        table.coalesce_adjacent_free();
        let once = table.snapshot();
        prop_assert_eq!(table.coalesce_adjacent_free(), 0);
        prop_assert_eq!(table.snapshot(), once);
        prop_assert_eq!(check_coverage(&table), Ok(()));
    }

    #[test]
    fn best_fit_is_minimal(table in arb_table(), size in 1..16u32) {
        let regions = table.snapshot();
        match policy::best_fit(regions.iter().copied(), size) {
            Some(id) => {
                let chosen = table.get(id).unwrap();
                prop_assert!(chosen.owner.is_none() && chosen.length >= size);
                for r in regions.iter().filter(|r| r.owner.is_none() && r.length >= size) {
                    prop_assert!(chosen.length <= r.length);
                    if chosen.length == r.length {
                        prop_assert!(chosen.start <= r.start);
                    }
                }
            },
            None => {
                prop_assert!(regions.iter().all(|r| r.owner.is_some() || r.length < size));
            }
        }
    }

    #[test]
    fn first_fit_is_deterministic(table in arb_table(), size in 1..16u32) {
        let regions = table.snapshot();
        let pick = policy::first_fit(regions.iter().copied(), size);
        prop_assert_eq!(pick, policy::first_fit(table.iter(), size));
        let expected = regions.iter().find(|r| r.owner.is_none() && r.length >= size).map(|r| r.id);
        prop_assert_eq!(pick, expected);
    }

    #[test]
    fn failed_allocations_leave_table_untouched(table in arb_table(), size in 0..64u32) {
        let before = table.snapshot();
        let owner = owners(1)[0];
        for policy in [Policy::FirstFit, Policy::BestFit] {
            let mut engine = Allocator::new(table.clone());
            if engine.allocate(size, owner, policy).is_err() {
                prop_assert_eq!(engine.table().snapshot(), before.clone());
            }
        }
        // Back to back on one engine: compare with the table right before each call.
        let mut engine = Allocator::new(table);
        for policy in [Policy::FirstFit, Policy::BestFit] {
            let current = engine.table().snapshot();
            if engine.allocate(size, owner, policy).is_err() {
                prop_assert_eq!(engine.table().snapshot(), current);
            }
        }
    }
}
