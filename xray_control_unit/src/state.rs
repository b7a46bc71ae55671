//! Controller state machine and fault bookkeeping.

pub mod fault;
pub mod machine;

pub use fault::FaultRecord;
pub use machine::{ControllerEvent, ControllerState, ControllerStateMachine, TransitionResult};
