//! High-level runtime engine settings
//!
//! Selects which acceleration terms are active and whether bodies are
//! evaluated on the rayon pool

use std::sync::Arc;

use super::forces::{AccelSet, BackgroundField, ForceLaw, PairwiseGravity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engine {
    pub parallel: bool, // false = sequential, true = rayon across bodies
    pub background: bool, // include the background disk term
}

impl Engine {
    /// Forces: pairwise gravity always, background disk unless disabled
    pub fn force_set(&self, law: &Arc<ForceLaw>) -> AccelSet {
        let mut forces = AccelSet::new()
            .parallel(self.parallel)
            .with(PairwiseGravity { law: Arc::clone(law) });
        if self.background {
            forces = forces.with(BackgroundField { law: Arc::clone(law) });
        }
        forces
    }
}
