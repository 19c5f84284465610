//! Loop independence analysis and round-robin partitioning.

use assay_core::share;
use assay_engine::{
    analyse_loops, ApplyWhen, DistributionPoint, Modifier, ModifierCollection, Partition,
    RoundRobin, Simulation, StateCollection, WorkerSlot,
};
use assay_stepper::Stepper;
use assay_test_utils::CounterModel;
use proptest::prelude::*;

fn points(name: &str, n: usize) -> Stepper {
    Stepper::vector(name, "", (0..n).map(|i| i as f64).collect()).unwrap()
}

/// `i(4) → j(3) → k(2) → t(2)`, the `k` loop resetting every iteration.
fn three_level_chain() -> Simulation {
    let reset: ModifierCollection =
        [Modifier::reset(ApplyWhen::EveryLoop, None, StateCollection::shared())]
            .into_iter()
            .collect();
    let leaf = Simulation::timecourse(points("t", 2)).unwrap();
    let k = Simulation::nested(points("k", 2), leaf)
        .unwrap()
        .with_modifiers(reset);
    let j = Simulation::nested(points("j", 3), k).unwrap();
    let mut root = Simulation::nested(points("i", 4), j).unwrap();
    root.set_model(share(CounterModel::new()));
    root.initialise_steppers().unwrap();
    root
}

fn every_index(counts: &[usize]) -> Vec<Vec<usize>> {
    counts.iter().fold(vec![Vec::new()], |acc, &n| {
        acc.into_iter()
            .flat_map(|prefix| {
                (0..n).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect()
    })
}

#[test]
fn innermost_reset_selects_innermost_level() {
    let root = three_level_chain();
    assert_eq!(
        analyse_loops(&root, false),
        Some(DistributionPoint {
            level: 2,
            point_counts: vec![4, 3, 2],
        })
    );
}

#[test]
fn unbounded_outer_loop_prevents_distribution() {
    let condition = assay_core::Expr::name("w").lt(assay_core::Expr::num(2.0));
    let reset: ModifierCollection =
        [Modifier::reset(ApplyWhen::EveryLoop, None, StateCollection::shared())]
            .into_iter()
            .collect();
    let leaf = Simulation::timecourse(points("t", 2)).unwrap();
    let inner = Simulation::nested(points("k", 2), leaf)
        .unwrap()
        .with_modifiers(reset);
    let w = Stepper::while_loop("w", "", Box::new(condition));
    let mut root = Simulation::nested(w, inner).unwrap();
    root.initialise_steppers().unwrap();
    assert_eq!(analyse_loops(&root, false), None);
}

#[test]
fn timecourse_alone_is_not_distributed() {
    let root = Simulation::timecourse(points("t", 5)).unwrap();
    assert_eq!(analyse_loops(&root, true), None);
}

#[test]
fn partitioned_runs_sum_to_the_full_run() {
    let full = three_level_chain().run(None).unwrap();
    let full = full.lookup("count").unwrap();
    let full_shape = full.shape();
    let full = full.as_array().unwrap().to_vec();

    // 24 iterations at the distributed level; 25 and 30 leave workers idle.
    for count in [1, 2, 3, 24, 25, 30] {
        let mut total = vec![0.0; full.len()];
        for rank in 0..count {
            let mut root = three_level_chain();
            let point = analyse_loops(&root, false).unwrap();
            let partition = RoundRobin::new(&point, WorkerSlot { rank, count });
            let part = root.run(Some(&partition)).unwrap();
            let part = part.lookup("count").unwrap();
            assert_eq!(part.shape(), full_shape, "rank {rank} of {count}");
            for (t, p) in total.iter_mut().zip(part.as_array().unwrap().to_vec()) {
                *t += p;
            }
        }
        assert_eq!(total, full, "{count} workers");
    }
}

#[test]
fn idle_worker_returns_zero_filled_results() {
    let reset: ModifierCollection =
        [Modifier::reset(ApplyWhen::EveryLoop, None, StateCollection::shared())]
            .into_iter()
            .collect();
    let leaf = Simulation::timecourse(points("t", 2)).unwrap();
    let mut root = Simulation::nested(points("i", 2), leaf)
        .unwrap()
        .with_modifiers(reset);
    root.set_model(share(CounterModel::new()));
    root.initialise_steppers().unwrap();

    let point = analyse_loops(&root, false).unwrap();
    assert_eq!(point.total_iterations(), 2);
    let partition = RoundRobin::new(&point, WorkerSlot { rank: 2, count: 3 });
    assert!(!partition.owns_any());

    let results = root.run(Some(&partition)).unwrap();
    for name in ["time", "count"] {
        let value = results.lookup(name).unwrap();
        assert_eq!(value.shape().as_slice(), &[2, 2], "{name}");
        assert_eq!(value.as_array().unwrap().to_vec(), vec![0.0; 4], "{name}");
    }
}

proptest! {
    #[test]
    fn round_robin_is_disjoint_and_exhaustive(
        counts in prop::collection::vec(1usize..5, 1..4),
        workers in 1usize..6,
    ) {
        let point = DistributionPoint { level: counts.len() - 1, point_counts: counts.clone() };
        let partitions: Vec<RoundRobin> = (0..workers)
            .map(|rank| RoundRobin::new(&point, WorkerSlot { rank, count: workers }))
            .collect();
        for indices in every_index(&counts) {
            let owners = partitions.iter().filter(|p| p.owns(&indices)).count();
            prop_assert_eq!(owners, 1, "indices {:?}", indices);
        }
    }
}
