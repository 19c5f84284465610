//! The stack of loops enclosing the node currently running.

use assay_array::{Indices, Shape};
use assay_core::ProtocolError;
use assay_stepper::Stepper;
use smallvec::SmallVec;

use crate::parallel::Partition;

/// Progress of one enclosing loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopFrame {
    /// Iterations completed so far; the index written to.
    pub output_number: usize,
    /// Allocated extent: exact, or an estimate for while loops.
    pub output_points: usize,
    /// False while the extent is only an estimate.
    pub end_fixed: bool,
}

impl LoopFrame {
    fn of(stepper: &Stepper) -> Result<Self, ProtocolError> {
        let output_points = stepper.number_of_output_points().ok_or_else(|| {
            ProtocolError::definition(format!(
                "The number of points of loop '{}' is not known.",
                stepper.name()
            ))
        })?;
        Ok(Self {
            output_number: stepper.current_output_number(),
            output_points,
            end_fixed: stepper.is_end_fixed(),
        })
    }
}

/// Frames of every active loop, outermost first, plus an optional
/// partition deciding which iterations this worker runs.
pub struct LoopStack<'p> {
    frames: SmallVec<[LoopFrame; 4]>,
    partition: Option<&'p dyn Partition>,
}

impl<'p> LoopStack<'p> {
    /// An empty stack for a top-level run.
    pub fn new(partition: Option<&'p dyn Partition>) -> Self {
        Self {
            frames: SmallVec::new(),
            partition,
        }
    }

    /// Enter the loop driven by `stepper`.
    pub fn push(&mut self, stepper: &Stepper) -> Result<(), ProtocolError> {
        self.frames.push(LoopFrame::of(stepper)?);
        Ok(())
    }

    /// Refresh the innermost frame after `stepper` moved.
    pub fn sync_top(&mut self, stepper: &Stepper) -> Result<(), ProtocolError> {
        let frame = LoopFrame::of(stepper)?;
        if let Some(top) = self.frames.last_mut() {
            *top = frame;
        }
        Ok(())
    }

    /// Leave the innermost loop.
    pub fn pop(&mut self) -> Option<LoopFrame> {
        self.frames.pop()
    }

    /// Number of active loops.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The innermost frame.
    pub fn top(&self) -> Option<&LoopFrame> {
        self.frames.last()
    }

    /// Current iteration of every active loop, outermost first.
    pub fn indices(&self) -> Indices {
        self.frames.iter().map(|f| f.output_number).collect()
    }

    /// Allocated extent of every active loop, outermost first.
    pub fn extents(&self) -> Shape {
        self.frames.iter().map(|f| f.output_points).collect()
    }

    /// False if a partition assigns the current iteration of the innermost
    /// loop to another worker.
    pub fn owns_iteration(&self) -> bool {
        match self.partition {
            Some(partition) if partition.level() + 1 == self.frames.len() => {
                partition.owns(&self.indices())
            }
            _ => true,
        }
    }

    /// True inside the partitioned loop when the partition gives this
    /// worker no iteration of it.
    pub fn owns_nothing(&self) -> bool {
        self.partition
            .is_some_and(|p| p.level() + 1 == self.frames.len() && !p.owns_any())
    }
}
