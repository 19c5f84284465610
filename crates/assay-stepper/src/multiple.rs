//! Several steppers moving in lockstep.

use assay_core::ProtocolError;

use crate::stepper::Stepper;

/// Members step together; the first member decides when the loop ends.
#[derive(Debug)]
pub struct MultipleRange {
    members: Vec<Stepper>,
}

impl MultipleRange {
    /// Group `members`; there must be at least one.
    pub fn new(members: Vec<Stepper>) -> Result<Self, ProtocolError> {
        if members.is_empty() {
            return Err(ProtocolError::definition(
                "A multiple stepper needs at least one member.",
            ));
        }
        Ok(Self { members })
    }

    /// The grouped steppers, in declaration order.
    pub fn members(&self) -> &[Stepper] {
        &self.members
    }

    pub(crate) fn members_mut(&mut self) -> &mut [Stepper] {
        &mut self.members
    }

    pub(crate) fn first(&self) -> &Stepper {
        &self.members[0]
    }
}
