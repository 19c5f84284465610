//! A whole protocol as one node of the tree.

use assay_core::{BoxedExpression, Environment, ProtocolError, ProtocolHost, Value};

use super::loops::LoopStack;
use super::results::record;
use super::NodeContext;

pub(super) fn run(
    ctx: &NodeContext<'_>,
    host: &mut dyn ProtocolHost,
    inputs: &[(String, BoxedExpression)],
    outputs: &[String],
    loops: &mut LoopStack<'_>,
    results: &Environment,
) -> Result<(), ProtocolError> {
    ctx.apply_modifiers(0)?;

    for (name, expr) in inputs {
        let value = expr.evaluate(ctx.env)?;
        host.set_input(name, value)?;
    }
    host.initialise_library()?;
    host.run()?;

    let protocol_outputs = host.outputs().clone();
    let depth = loops.depth();
    for name in outputs {
        let value = protocol_outputs.lookup(name)?;
        if let Some(Value::Array(existing)) = results.get_local(name) {
            let expected = existing.shape();
            let found = value.shape();
            if expected.len() != depth + found.len() || expected[depth..] != found[..] {
                return Err(ProtocolError::OutputShape {
                    name: name.clone(),
                    expected: expected[depth.min(expected.len())..].to_vec(),
                    found: found.to_vec(),
                });
            }
        }
        record(results, name, &value, loops)?;
    }

    ctx.apply_modifiers_at_end()
}
