//! Reference interpreter for EasyBuilder macros.
//!
//! The interpreter runs the statement trees of closed macros against
//! simulated device memory. It is the behavioral oracle for the sequencer
//! tests: what a macro does here is what the baked text does on the panel.

pub mod error;
pub mod memory;
pub(crate) mod value;
pub(crate) mod variable_table;
mod vm;

pub use memory::DeviceMemory;
pub use value::Value;
pub use vm::{Vm, DEFAULT_TRIGGER_BUDGET};
