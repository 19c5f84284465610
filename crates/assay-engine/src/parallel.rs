//! Deciding which loop may be split across workers, and splitting it.
//!
//! [`analyse_loops`] is the decision: it walks the chain of nested loops
//! from the root and returns the deepest level whose iterations cannot
//! depend on each other. A [`Partition`] is the mechanism: given the
//! indices of the enclosing loops it says whether this worker runs the
//! current iteration. [`RoundRobin`] is the only mechanism provided.
//!
//! A level is independent when the model resets itself on every run, or
//! when the level (or the node it runs) resets model state at the start
//! of each iteration to a checkpoint no enclosing save refreshes.

use indexmap::IndexSet;
use log::{debug, warn};

use crate::config::WorkerSlot;
use crate::modifier::{ApplyWhen, Modifier, ModifierCollection};
use crate::simulation::{Simulation, SimulationKind};

// ── Partition ──────────────────────────────────────────────────────

/// Decides which iterations of one loop level this worker runs.
pub trait Partition {
    /// Depth of the partitioned loop; 0 is the outermost.
    fn level(&self) -> usize;

    /// True if this worker runs the iteration at `indices`, the current
    /// iteration of every loop from the outermost down to
    /// [`level`](Self::level).
    fn owns(&self, indices: &[usize]) -> bool;

    /// False if this worker owns no iteration at all. Such a worker still
    /// has to return zero-filled results of the full shape.
    fn owns_any(&self) -> bool {
        true
    }
}

// ── DistributionPoint ──────────────────────────────────────────────

/// The loop level found safe to distribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistributionPoint {
    /// Depth of the level; 0 is the outermost loop.
    pub level: usize,
    /// Point counts of every loop from the outermost to `level`.
    pub point_counts: Vec<usize>,
}

impl DistributionPoint {
    /// `multipliers[i]` is the product of the point counts of the levels
    /// strictly inside level `i`, so `Σ multipliers[i]·index[i]` numbers
    /// the iterations of `level` consecutively.
    pub fn multipliers(&self) -> Vec<usize> {
        let mut multipliers = vec![1; self.point_counts.len()];
        for i in (0..self.point_counts.len().saturating_sub(1)).rev() {
            multipliers[i] = multipliers[i + 1] * self.point_counts[i + 1];
        }
        multipliers
    }

    /// Total number of iterations of `level` across all outer iterations.
    pub fn total_iterations(&self) -> usize {
        self.point_counts.iter().product()
    }
}

// ── Analysis ───────────────────────────────────────────────────────

/// Checkpoint resets seen in one modifier collection.
#[derive(Default)]
struct ResetSummary {
    every_loop: bool,
    start_or_every_loop: bool,
}

/// Scan `modifiers` in order against the checkpoints `saved` so far,
/// adding this collection's saves to `saved`. Checkpoints in `saved_inside`
/// are rewritten by deeper levels on every iteration.
fn scan(
    modifiers: &ModifierCollection,
    saved: &mut IndexSet<String>,
    saved_inside: &IndexSet<String>,
) -> ResetSummary {
    let mut summary = ResetSummary::default();
    for modifier in modifiers.iter() {
        if modifier.is_reset()
            && resets_to_fixed_state(modifier, saved)
            && resets_to_fixed_state(modifier, saved_inside)
        {
            match modifier.when() {
                ApplyWhen::EveryLoop => {
                    summary.every_loop = true;
                    summary.start_or_every_loop = true;
                }
                ApplyWhen::AtStartOnly => summary.start_or_every_loop = true,
                ApplyWhen::AtEnd => {}
            }
        } else if let Some(name) = saved_name(modifier) {
            saved.insert(name.to_string());
        }
    }
    summary
}

fn saved_name(modifier: &Modifier) -> Option<&str> {
    modifier.state_name().filter(|_| !modifier.is_reset())
}

fn resets_to_fixed_state(reset: &Modifier, saved: &IndexSet<String>) -> bool {
    reset.state_name().map_or(true, |name| !saved.contains(name))
}

/// Find the deepest loop level of `root` whose iterations are independent.
///
/// `implicit_reset` says the model restores its initial state at the
/// start of every run, which makes every level independent. Returns
/// `None` if no level qualifies, or if any loop from the outermost to
/// the chosen level has no fixed point count. Steppers must have been
/// initialised.
pub fn analyse_loops(root: &Simulation, implicit_reset: bool) -> Option<DistributionPoint> {
    let mut node = root;
    let mut nodes = vec![root];
    while let SimulationKind::Nested { child, .. } = node.kind() {
        node = child;
        nodes.push(node);
    }
    let loop_levels = nodes.len() - 1;
    if loop_levels == 0 {
        debug!("No nested loops to distribute");
        return None;
    }

    // saved_inside[i]: checkpoints saved anywhere below node i.
    let mut saved_inside = vec![IndexSet::new(); nodes.len()];
    for i in (0..nodes.len() - 1).rev() {
        let mut below = saved_inside[i + 1].clone();
        below.extend(nodes[i + 1].modifiers().iter().filter_map(saved_name).map(str::to_string));
        saved_inside[i] = below;
    }

    let mut saved = IndexSet::new();
    let summaries: Vec<ResetSummary> = nodes
        .iter()
        .zip(&saved_inside)
        .map(|(node, inside)| scan(node.modifiers(), &mut saved, inside))
        .collect();

    let level = (0..loop_levels).rev().find(|&i| {
        implicit_reset || summaries[i].every_loop || summaries[i + 1].start_or_every_loop
    })?;

    let mut point_counts = Vec::with_capacity(level + 1);
    for node in &nodes[..=level] {
        let stepper = node.stepper()?;
        if !stepper.is_end_fixed() {
            debug!("Loop {} has no fixed length; not distributing", stepper.name());
            return None;
        }
        point_counts.push(stepper.number_of_output_points()?);
    }
    debug!("Loop level {level} is independent, point counts {point_counts:?}");
    Some(DistributionPoint {
        level,
        point_counts,
    })
}

// ── RoundRobin ─────────────────────────────────────────────────────

/// Deals consecutive iterations of the distributed level to workers in turn.
#[derive(Clone, Debug)]
pub struct RoundRobin {
    level: usize,
    multipliers: Vec<usize>,
    total_iterations: usize,
    worker: WorkerSlot,
}

impl RoundRobin {
    /// Partition `point` among `worker.count` workers, as worker `worker.rank`.
    pub fn new(point: &DistributionPoint, worker: WorkerSlot) -> Self {
        let total_iterations = point.total_iterations();
        if worker.rank >= total_iterations {
            warn!(
                "Worker {} of {} owns no iteration of loop level {} ({} iterations)",
                worker.rank, worker.count, point.level, total_iterations
            );
        }
        Self {
            level: point.level,
            multipliers: point.multipliers(),
            total_iterations,
            worker,
        }
    }
}

impl Partition for RoundRobin {
    fn level(&self) -> usize {
        self.level
    }

    fn owns(&self, indices: &[usize]) -> bool {
        let linear: usize = self
            .multipliers
            .iter()
            .zip(indices)
            .map(|(m, i)| m * i)
            .sum();
        linear % self.worker.count == self.worker.rank
    }

    fn owns_any(&self) -> bool {
        self.worker.rank < self.total_iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateCollection;
    use assay_stepper::Stepper;

    fn points(name: &str, n: usize) -> Stepper {
        Stepper::vector(name, "", (0..n).map(|i| i as f64).collect()).unwrap()
    }

    fn chain(modifiers: [ModifierCollection; 3]) -> Simulation {
        let [outer, middle, inner] = modifiers;
        let leaf = Simulation::timecourse(points("t", 2))
            .unwrap()
            .with_modifiers(inner);
        let mid = Simulation::nested(points("j", 3), leaf)
            .unwrap()
            .with_modifiers(middle);
        let mut root = Simulation::nested(points("i", 4), mid)
            .unwrap()
            .with_modifiers(outer);
        root.initialise_steppers().unwrap();
        root
    }

    #[test]
    fn multipliers_are_inner_products() {
        let point = DistributionPoint {
            level: 2,
            point_counts: vec![4, 3, 5],
        };
        assert_eq!(point.multipliers(), vec![15, 5, 1]);
        assert_eq!(point.total_iterations(), 60);
    }

    #[test]
    fn no_reset_means_no_distribution() {
        let root = chain(Default::default());
        assert_eq!(analyse_loops(&root, false), None);
    }

    #[test]
    fn implicit_reset_picks_deepest_loop() {
        let root = chain(Default::default());
        let point = analyse_loops(&root, true).unwrap();
        assert_eq!(point.level, 1);
        assert_eq!(point.point_counts, vec![4, 3]);
    }

    #[test]
    fn leaf_start_reset_qualifies_innermost_loop() {
        let states = StateCollection::shared();
        let leaf = [Modifier::reset(ApplyWhen::AtStartOnly, None, states)]
            .into_iter()
            .collect();
        let root = chain([ModifierCollection::new(), ModifierCollection::new(), leaf]);
        assert_eq!(analyse_loops(&root, false).map(|p| p.level), Some(1));
    }

    #[test]
    fn reset_to_state_saved_outside_does_not_qualify() {
        let states = StateCollection::shared();
        let outer = [Modifier::save(ApplyWhen::AtStartOnly, "s", states.clone())]
            .into_iter()
            .collect();
        let middle = [Modifier::reset(ApplyWhen::EveryLoop, Some("s"), states)]
            .into_iter()
            .collect();
        let root = chain([outer, middle, ModifierCollection::new()]);
        assert_eq!(analyse_loops(&root, false), None);
    }

    #[test]
    fn reset_to_state_saved_deeper_does_not_qualify() {
        let states = StateCollection::shared();
        let middle = [Modifier::reset(ApplyWhen::EveryLoop, Some("s"), states.clone())]
            .into_iter()
            .collect();
        let inner = [Modifier::save(ApplyWhen::AtEnd, "s", states)]
            .into_iter()
            .collect();
        let root = chain([ModifierCollection::new(), middle, inner]);
        assert_eq!(analyse_loops(&root, false), None);
    }

    #[test]
    fn own_start_only_reset_does_not_qualify() {
        let states = StateCollection::shared();
        let outer = [Modifier::reset(ApplyWhen::AtStartOnly, None, states)]
            .into_iter()
            .collect();
        let root = chain([outer, ModifierCollection::new(), ModifierCollection::new()]);
        assert_eq!(analyse_loops(&root, false), None);
    }

    #[test]
    fn round_robin_deals_linear_index() {
        let point = DistributionPoint {
            level: 1,
            point_counts: vec![2, 3],
        };
        let even = RoundRobin::new(&point, WorkerSlot { rank: 0, count: 2 });
        assert!(even.owns(&[0, 0]));
        assert!(!even.owns(&[0, 1]));
        assert!(!even.owns(&[1, 0]));
        assert!(even.owns(&[1, 1]));
        assert_eq!(even.level(), 1);
        assert!(even.owns_any());
    }

    #[test]
    fn surplus_worker_owns_nothing() {
        let point = DistributionPoint {
            level: 1,
            point_counts: vec![2, 3],
        };
        let idle = RoundRobin::new(&point, WorkerSlot { rank: 6, count: 8 });
        assert!(!idle.owns_any());
        assert!(every_pair(2, 3).all(|ix| !idle.owns(&ix)));
        let last = RoundRobin::new(&point, WorkerSlot { rank: 5, count: 8 });
        assert!(last.owns_any());
        assert!(last.owns(&[1, 2]));
    }

    fn every_pair(outer: usize, inner: usize) -> impl Iterator<Item = [usize; 2]> {
        (0..outer).flat_map(move |i| (0..inner).map(move |j| [i, j]))
    }
}
