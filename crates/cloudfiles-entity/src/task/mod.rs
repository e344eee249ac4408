//! Archive task domain entities.

pub mod model;
pub mod payload;
pub mod status;

pub use model::{NewTask, Task};
pub use payload::TaskMessage;
pub use status::{TaskKind, TaskStatus};
