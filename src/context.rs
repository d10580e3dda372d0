//! Run-scoped state shared by the analysis pipelines.

use crate::config::ScanOptions;
use crate::idset::{IdSetRegistry, SetHandle};

/// Owns everything a single analysis run mutates: the set handle table and
/// the scan options. Dropping the context releases every set, so a process
/// can run any number of analyses back to back.
#[derive(Debug, Default)]
pub struct RunContext {
    pub sets: IdSetRegistry,
    pub options: ScanOptions,
}

impl RunContext {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            sets: IdSetRegistry::new(),
            options,
        }
    }

    pub fn new_set(&mut self) -> SetHandle {
        self.sets.create()
    }
}
