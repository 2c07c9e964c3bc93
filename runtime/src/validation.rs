//! Guest module validation — ABI compatibility checks.
//!
//! Before a module is accepted the runtime checks:
//!
//! 1. A `memory` export is present
//! 2. The `_start` entrypoint is exported with no params and no results
//!
//! Imports are not restricted here: guests import the `fastly_*` namespaces,
//! the legacy `env` module, and WASI preview1, all of which the linker
//! provides.

use wasmtime::{ExternType, Module};

use crate::error::RuntimeError;

/// Validate that a compiled module can serve as a fastlike guest.
pub fn validate_module(module: &Module) -> Result<(), RuntimeError> {
    let has_memory = module
        .exports()
        .any(|e| e.name() == "memory" && matches!(e.ty(), ExternType::Memory(_)));
    if !has_memory {
        return Err(RuntimeError::Validation(
            "module must export 'memory'".into(),
        ));
    }

    let entry = module
        .exports()
        .find(|e| e.name() == "_start")
        .ok_or_else(|| RuntimeError::Validation("missing required export: _start".into()))?;

    let func_ty = match entry.ty() {
        ExternType::Func(ft) => ft,
        _ => {
            return Err(RuntimeError::Validation(
                "export '_start' must be a function".into(),
            ));
        }
    };

    if func_ty.params().len() != 0 || func_ty.results().len() != 0 {
        return Err(RuntimeError::Validation(format!(
            "export '_start' must take no params and return nothing, got {} params and {} results",
            func_ty.params().len(),
            func_ty.results().len()
        )));
    }

    Ok(())
}
