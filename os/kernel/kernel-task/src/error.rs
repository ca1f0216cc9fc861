use crate::task::TaskId;

#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TaskError {
    #[error("no such task: {0}")]
    NoSuchTask(TaskId),
    #[error("invalid priority level {0}")]
    InvalidLevel(usize),
    #[error("task {0} has no context to run")]
    NotInitialized(TaskId),
}
