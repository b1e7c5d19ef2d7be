pub mod outcome;
pub mod task;

pub use outcome::BatchOutcome;
pub use task::{TaskDescriptor, TaskId, TaskValue};
