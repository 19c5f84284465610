//! Loop node: run the child once per stepper point.

use assay_core::{Environment, ProtocolError};
use assay_stepper::Stepper;
use log::debug;

use super::loops::LoopStack;
use super::results::{allocate_like, ensure_capacity, publish_progress, shrink};
use super::{NodeContext, Simulation};

pub(super) fn run(
    ctx: &NodeContext<'_>,
    stepper: &mut Stepper,
    child: &mut Simulation,
    loops: &mut LoopStack<'_>,
    results: &Environment,
) -> Result<(), ProtocolError> {
    stepper.reset()?;
    loops.push(stepper)?;
    let dim = loops.depth() - 1;

    while !stepper.at_end() {
        loops.sync_top(stepper)?;
        let n = stepper.current_output_number();
        debug!(
            "Nested simulation {} step {} value {}",
            ctx.label(),
            n,
            stepper.current_output_point()
        );
        if !stepper.is_end_fixed() {
            if let Some(frame) = loops.top() {
                ensure_capacity(results, dim, n, frame.output_points);
            }
        }

        if loops.owns_iteration() {
            ctx.apply_modifiers(n)?;
            if let Some(folder) = ctx.output_folder {
                child.set_output_folder(&folder.join(format!("run_{}", n + 1)));
            }
            child.run_node(loops, results)?;
        } else if loops.owns_nothing() && results.is_empty() {
            // Nothing is ever written here, so size the results from a
            // scratch run and keep only the zero-filled shapes.
            debug!("Worker owns no iteration; sizing results from iteration {n}");
            ctx.apply_modifiers(n)?;
            let scratch = Environment::new();
            child.run_node(loops, &scratch)?;
            allocate_like(results, &scratch)?;
        } else {
            debug!("Skipping iteration {n} owned by another worker");
        }

        if !stepper.is_end_fixed() {
            publish_progress(ctx.progress, results, dim, n + 1)?;
        }
        stepper.step()?;
    }

    loops.sync_top(stepper)?;
    if !stepper.is_end_fixed() {
        shrink(results, dim, stepper.current_output_number());
    }
    loops.pop();
    ctx.apply_modifiers_at_end()
}
