use anyhow::Result;
use signal_hook::consts::SIGINT;
use signal_hook::flag;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Keeps the interpreter alive across Ctrl-C.
///
/// Once [`setup`](SignalHandler::setup) has run, SIGINT only raises a flag
/// in the interpreter. Children in the same process group still receive the
/// signal with its default action, because `exec` resets caught signals.
#[derive(Clone)]
pub struct SignalHandler {
    interrupted: Arc<AtomicBool>,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn setup(&self) -> Result<()> {
        flag::register(SIGINT, Arc::clone(&self.interrupted))?;
        Ok(())
    }

    #[cfg(test)]
    fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Clear the flag and report whether it was set.
    pub fn take_interrupt(&self) -> bool {
        self.interrupted.swap(false, Ordering::SeqCst)
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}
