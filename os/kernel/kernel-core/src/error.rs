use kernel_alloc::AllocError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error("kernel core already installed")]
    AlreadyInstalled,
}
