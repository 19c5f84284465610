//! Writing iteration outputs into shaped result arrays.
//!
//! A result array has one leading dimension per enclosing loop (extent =
//! that loop's point count) followed by the output's natural shape. It is
//! allocated on first write. Loops of unknown length allocate their
//! estimate, grow by resize when they reach it, and shrink to the
//! realised count when they finish.

use std::iter;

use assay_array::{NdArray, Range, Shape};
use assay_core::{Environment, ProtocolError, Value};
use log::debug;

use super::loops::LoopStack;

/// Write `value` as output `name` for the current iteration of every loop.
///
/// Panics if an existing array's dimensionality or trailing shape does
/// not fit `value`.
pub(crate) fn record(
    results: &Environment,
    name: &str,
    value: &Value,
    loops: &LoopStack<'_>,
) -> Result<(), ProtocolError> {
    let data = value.to_array();
    let depth = loops.depth();

    let array = match results.get_local(name) {
        Some(Value::Array(array)) => array,
        Some(Value::Number(_)) => panic!("result '{name}' is bound to a number, not an array"),
        None => {
            let mut shape = loops.extents();
            shape.extend(data.shape());
            debug!("Allocating result {name} with shape {:?}", shape.as_slice());
            let array = NdArray::new(&shape);
            results.define(name, Value::Array(array.clone()))?;
            array
        }
    };

    let shape = array.shape();
    assert_eq!(
        shape.len(),
        depth + data.ndim(),
        "result '{name}' has {} dimensions but {depth} loops and a {}-d output were recorded",
        shape.len(),
        data.ndim()
    );
    assert_eq!(
        &shape[depth..],
        data.shape().as_slice(),
        "output '{name}' changed shape between iterations"
    );
    if data.is_empty() {
        return Ok(());
    }

    let ranges: Vec<Range> = loops
        .indices()
        .iter()
        .map(|&i| Range::single(i as i64))
        .chain(iter::repeat(Range::all()).take(data.ndim()))
        .collect();
    array.view(&ranges)?.copy_from(&data);
    Ok(())
}

/// Make room along loop dimension `dim` for iteration `index`, growing
/// every result array to `extent`.
pub(crate) fn ensure_capacity(results: &Environment, dim: usize, index: usize, extent: usize) {
    for (name, value) in results.bindings() {
        let Value::Array(array) = value else { continue };
        let mut shape = array.shape();
        if shape.len() > dim && shape[dim] <= index {
            debug!("Growing result {name} along dimension {dim} to {extent}");
            shape[dim] = extent;
            array.resize(&shape);
        }
    }
}

/// Cut every result array to `extent` along loop dimension `dim`.
pub(crate) fn shrink(results: &Environment, dim: usize, extent: usize) {
    for (name, value) in results.bindings() {
        let Value::Array(array) = value else { continue };
        let mut shape = array.shape();
        if shape.len() > dim && shape[dim] != extent {
            debug!("Shrinking result {name} along dimension {dim} to {extent}");
            shape[dim] = extent;
            array.resize(&shape);
        }
    }
}

/// Define a zero array in `results` for every array of `template` it lacks,
/// with the template's full shape.
pub(crate) fn allocate_like(
    results: &Environment,
    template: &Environment,
) -> Result<(), ProtocolError> {
    for (name, value) in template.bindings() {
        let Value::Array(array) = value else { continue };
        if !results.is_defined_locally(&name) {
            debug!("Allocating zero result {name} with shape {:?}", array.shape().as_slice());
            results.define(name, Value::Array(NdArray::new(&array.shape())))?;
        }
    }
    Ok(())
}

/// Bind views of the first `completed` iterations along loop dimension
/// `dim` into `progress`, so loop conditions can inspect earlier results.
pub(crate) fn publish_progress(
    progress: &Environment,
    results: &Environment,
    dim: usize,
    completed: usize,
) -> Result<(), ProtocolError> {
    for (name, value) in results.bindings() {
        let Value::Array(array) = value else { continue };
        let shape: Shape = array.shape();
        if shape.len() <= dim || shape.contains(&0) || completed == 0 {
            continue;
        }
        let ranges: Vec<Range> = (0..shape.len())
            .map(|d| {
                if d == dim {
                    Range::new(0, completed as i64)
                } else {
                    Range::all()
                }
            })
            .collect();
        progress.overwrite(name, Value::Array(array.view(&ranges)?));
    }
    Ok(())
}
