//! Leaf loop: advance the model along a stepper and record its outputs.

use std::fs;

use assay_core::{collect_outputs, Environment, ProtocolError};
use assay_stepper::Stepper;

use super::loops::LoopStack;
use super::results::{ensure_capacity, publish_progress, record, shrink};
use super::NodeContext;

pub(super) fn run(
    ctx: &NodeContext<'_>,
    stepper: &mut Stepper,
    loops: &mut LoopStack<'_>,
    results: &Environment,
) -> Result<(), ProtocolError> {
    let model = ctx.model()?;
    if let Some(folder) = ctx.output_folder {
        fs::create_dir_all(folder).map_err(|err| ProtocolError::Io {
            path: folder.to_path_buf(),
            reason: err.to_string(),
        })?;
        model.borrow_mut().set_output_folder(folder);
    }

    stepper.reset()?;
    loops.push(stepper)?;
    let dim = loops.depth() - 1;
    model
        .borrow_mut()
        .set_free_variable(stepper.current_output_point());

    while !stepper.at_end() {
        loops.sync_top(stepper)?;
        let n = stepper.current_output_number();
        if !stepper.is_end_fixed() {
            if let Some(frame) = loops.top() {
                ensure_capacity(results, dim, n, frame.output_points);
            }
        }

        ctx.apply_modifiers(n)?;
        let outputs = collect_outputs(&mut *model.borrow_mut())?;
        for (name, value) in &outputs {
            record(results, name, value, loops)?;
        }
        if !stepper.is_end_fixed() {
            publish_progress(ctx.progress, results, dim, n + 1)?;
        }

        stepper.step()?;
        if !stepper.at_end() {
            model
                .borrow_mut()
                .solve_until(stepper.current_output_point())?;
        }
    }

    loops.sync_top(stepper)?;
    if !stepper.is_end_fixed() {
        shrink(results, dim, stepper.current_output_number());
    }
    loops.pop();
    ctx.apply_modifiers_at_end()
}
