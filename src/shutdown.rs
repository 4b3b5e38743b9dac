//! Ctrl-C handling.
//!
//! The handler only clears the session's continuation flag. The loop notices
//! at its next iteration boundary, so a frame already handed to the engine is
//! always finished before draining starts.

use anyhow::{Context, Result};

use crate::session::StopHandle;

pub const FINISHING_MESSAGE: &str = "Finishing session";

pub struct ShutdownCoordinator;

impl ShutdownCoordinator {
    /// Install the process-wide interrupt handler. Fails if a handler was
    /// already installed.
    pub fn install(handle: StopHandle) -> Result<()> {
        ctrlc::set_handler(move || {
            on_interrupt(&handle);
        })
        .context("error setting Ctrl-C handler")
    }
}

/// Returns true when this interrupt was the one that stopped the session.
pub fn on_interrupt(handle: &StopHandle) -> bool {
    if handle.request_stop() {
        println!("{}", FINISHING_MESSAGE);
        true
    } else {
        log::debug!("interrupt ignored, session already stopping");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::session::SessionController;

    #[test]
    fn repeated_interrupts_stop_once() {
        let controller = SessionController::new(SessionConfig::default());
        let handle = controller.stop_handle();
        assert!(on_interrupt(&handle));
        assert!(!on_interrupt(&handle));
        assert!(handle.is_stop_requested());
    }
}
