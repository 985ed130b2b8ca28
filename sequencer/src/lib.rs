//! Builders that turn logical sequences into re-entrant macro code.
//!
//! The target runtime runs a macro from top to bottom every time it is
//! invoked and keeps nothing between invocations except device memory.
//! The builders here keep their state in tags so that each invocation
//! resumes where the previous one stopped.

pub mod indirect;
pub mod routine;
pub mod schedule;
pub mod task;

pub use indirect::IndirectTag;
pub use routine::{AsyncRoutine, Routine};
pub use schedule::{LoopMacro, ScheduleAfter};
pub use task::{AsyncScheduler, DoneFlag, Scheduler, Task};
