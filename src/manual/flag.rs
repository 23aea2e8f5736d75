//! Warning mode flag shared by the controller and the warning task

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "warning mode active" flag
///
/// The controller owns the writes; the warning task gets a clone at spawn
/// time and only reads it. Legal transitions are `false -> true` and
/// `true -> false`.
#[derive(Clone, Debug, Default)]
pub struct WarningFlag(Arc<AtomicBool>);

impl WarningFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Returns false if it was already set.
    pub fn engage(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clears the flag. Returns whether it was set.
    pub fn release(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
