//! Graceful Ctrl-C handling.
//!
//! The first Ctrl-C only raises a flag: the pipelines finish or roll back the
//! file in flight and then stop. A second Ctrl-C exits immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    /// A flag that is never raised by a signal; for tests and library callers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the process-wide Ctrl-C handler.
    pub fn install() -> anyhow::Result<Self> {
        let interrupt = Self::new();
        let flag = Arc::clone(&interrupt.flag);
        ctrlc::set_handler(move || {
            if flag.swap(true, Ordering::SeqCst) {
                eprintln!("\n⛔ Second interrupt, exiting now");
                std::process::exit(130);
            }
            eprintln!("\n⏹️  Interrupt received, finishing the current file (Ctrl-C again to abort)");
        })?;
        Ok(interrupt)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_is_shared_between_clones() {
        let interrupt = Interrupt::new();
        let clone = interrupt.clone();
        assert!(!clone.is_requested());

        interrupt.trigger();
        assert!(clone.is_requested());
    }
}
