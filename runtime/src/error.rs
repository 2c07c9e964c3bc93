//! Runtime error types.

/// Top-level error type for the runtime crate.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Wasmtime engine, compilation, linking, or instantiation error.
    #[error("wasmtime error: {0}")]
    Wasmtime(#[from] anyhow::Error),

    /// Module validation failed (missing exports, wrong signatures).
    #[error("validation error: {0}")]
    Validation(String),

    /// Guest memory operation failed.
    #[error("memory error: {0}")]
    Memory(String),

    /// The downstream request could not be bound to an instance.
    #[error("downstream request error: {0}")]
    Downstream(String),

    /// The guest trapped, or a host call raised a fault.
    #[error("guest trapped: {0}")]
    GuestTrapped(String),
}
