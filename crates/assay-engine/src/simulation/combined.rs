//! Independent simulations run back to back.

use assay_core::{qualify, Environment, ProtocolError};
use log::debug;

use super::loops::LoopStack;
use super::results::record;
use super::{CombinedMode, NodeContext, Simulation};

pub(super) fn run(
    ctx: &NodeContext<'_>,
    mode: CombinedMode,
    children: &mut [Simulation],
    loops: &mut LoopStack<'_>,
    results: &Environment,
) -> Result<(), ProtocolError> {
    ctx.apply_modifiers(0)?;

    let order: Vec<usize> = match mode {
        CombinedMode::Sequential => (0..children.len()).collect(),
        CombinedMode::Parallel => (0..children.len()).rev().collect(),
    };
    for i in order {
        let child = &mut children[i];
        debug!("Combined simulation {} running child {i}", ctx.label());
        let child_results = child.run(None)?;
        if let Some(prefix) = child.prefix() {
            for (name, value) in child_results.bindings() {
                record(results, &qualify(prefix, &name), &value, loops)?;
            }
        }
    }

    ctx.apply_modifiers_at_end()
}
