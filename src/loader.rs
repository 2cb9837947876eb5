//! Kernel module activation.
//!
//! Modules declared in a freshly written artifact are loaded immediately
//! through `modprobe`, one invocation per module, in artifact order.
//! Loading is best-effort: a module that fails to load does not stop the
//! remaining modules, and all failures are reported together in a single
//! error. Loading an already-loaded module is not an error.

use crate::error::{KmodError, ModuleLoadFailure, Result};
use crate::module_name::ModuleName;
use std::process::{Command, Output};

/// Program used to load kernel modules.
const MODPROBE: &str = "modprobe";

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the
    /// command.
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<Output> {
        Command::new(program).args(args).output()
    }
}

/// Load the given modules in order via `modprobe`.
///
/// Every module is attempted regardless of earlier failures; the
/// accumulated failures are folded into one error at the end.
///
/// # Errors
///
/// Returns [`KmodError::ModuleLoad`] naming every module that failed
/// together with the loader's reason.
pub fn load_modules(executor: &dyn CommandExecutor, modules: &[ModuleName]) -> Result<()> {
    let mut failures = Vec::new();

    for module in modules {
        if let Some(reason) = load_one(executor, module) {
            log::warn!("failed to load kernel module {module}: {reason}");
            failures.push(ModuleLoadFailure {
                module: module.clone(),
                reason,
            });
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(KmodError::ModuleLoad { failures })
    }
}

/// Attempt a single modprobe invocation, returning the failure reason
/// when the module could not be loaded.
fn load_one(executor: &dyn CommandExecutor, module: &ModuleName) -> Option<String> {
    match executor.run(MODPROBE, &[module.as_str().to_owned()]) {
        Ok(output) if output.status.success() => None,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.trim();
            if reason.is_empty() {
                Some(format!("modprobe exited with {}", output.status))
            } else {
                Some(reason.to_owned())
            }
        }
        Err(e) => Some(format!("failed to run modprobe: {e}")),
    }
}
