use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportPhase {
    Loading,
    Terrain,
    Placing,
    Finalizing,
}

#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
#[error("Import cancelled")]
pub struct Cancelled;

/// Receives progress as a phase and a fraction in `0.0..=1.0`.
///
/// Returning `Err(Cancelled)` stops the import at the next checkpoint.
pub trait ImportProgress {
    fn report(&mut self, phase: ImportPhase, fraction: f32) -> Result<(), Cancelled>;
}

impl<F> ImportProgress for F
where
    F: FnMut(ImportPhase, f32) -> Result<(), Cancelled>,
{
    fn report(&mut self, phase: ImportPhase, fraction: f32) -> Result<(), Cancelled> {
        self(phase, fraction)
    }
}

#[derive(Default, Copy, Clone, Debug)]
pub struct NoProgress;

impl ImportProgress for NoProgress {
    fn report(&mut self, _: ImportPhase, _: f32) -> Result<(), Cancelled> {
        Ok(())
    }
}

/// Shared flag another thread can raise to stop an import.
#[derive(Default, Clone, Debug)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
