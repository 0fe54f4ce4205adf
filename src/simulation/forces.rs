//! Force law derivation and acceleration contributors
//!
//! `ForceLaw` differentiates the potentials of [`PotentialModel`] once and
//! keeps the compiled closed forms. `AccelSet` sums a list of
//! [`Acceleration`] terms (pairwise gravity, background disk) per body.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use nalgebra::DVector;
use rayon::prelude::*;

use crate::error::{DerivationError, Result, SimError};
use crate::simulation::params::KM_PER_PC_DERIVATION;
use crate::simulation::potential::{background_slots, pair_slots, PotentialExpr, PotentialModel};
use crate::simulation::states::System;
use crate::simulation::symbolic::CompiledExpr;

/// Closed-form vertical accelerations, derived from a [`PotentialModel`]
#[derive(Debug, Clone)]
pub struct ForceLaw {
    model: PotentialModel,
    pair: CompiledExpr,
    background: CompiledExpr,
    pair_text: String,
    background_text: String,
}

impl ForceLaw {
    /// Differentiate both potentials with respect to z1 and compile the results
    pub fn derive(model: &PotentialModel) -> std::result::Result<Self, DerivationError> {
        let (pair, pair_text) = derive_z_accel(model.two_body(), pair_slots::Z1)?;
        let (background, background_text) = derive_z_accel(model.background(), background_slots::Z1)?;

        debug!("a_z = {pair_text}");
        debug!("a_bg_z = {background_text}");

        Ok(Self {
            model: *model,
            pair,
            background,
            pair_text,
            background_text,
        })
    }

    pub fn model(&self) -> &PotentialModel {
        &self.model
    }

    /// Acceleration of body 1 toward body 2 (mass `m`) along z
    pub fn pair_accel(&self, x1: f64, x2: f64, z1: f64, z2: f64, m: f64) -> f64 {
        self.pair.eval(&[x1, x2, z1, z2, m])
    }

    /// Background disk acceleration along z at (x1, z1)
    pub fn background_accel(&self, x1: f64, z1: f64) -> f64 {
        self.background.eval(&[x1, z1])
    }

    /// Rendered closed forms, (pairwise, background)
    pub fn expressions(&self) -> (&str, &str) {
        (&self.pair_text, &self.background_text)
    }
}

// a = -dU/dz1 / KM_PER_PC_DERIVATION, simplified and compiled
fn derive_z_accel(
    mut pot: PotentialExpr,
    wrt: usize,
) -> std::result::Result<(CompiledExpr, String), DerivationError> {
    let g = &mut pot.graph;
    let du = g.diff(pot.root, wrt)?;
    let minus_du = g.neg(du);
    let conv = g.constant(KM_PER_PC_DERIVATION);
    let accel = g.div(minus_du, conv);
    let accel = g.simplify(accel)?;

    let text = g.display(accel, pot.names).to_string();
    Ok((g.compile(accel)?, text))
}

/// Memo of derived force laws keyed by potential constants (G, BM, a, b)
#[derive(Debug, Default)]
pub struct ForceLawCache {
    laws: HashMap<[u64; 4], Arc<ForceLaw>>,
}

impl ForceLawCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached law for `model`, deriving it on first use
    pub fn get_or_derive(&mut self, model: &PotentialModel) -> Result<Arc<ForceLaw>> {
        let key = [
            model.G.to_bits(),
            model.background_mass.to_bits(),
            model.a.to_bits(),
            model.b.to_bits(),
        ];
        if let Some(law) = self.laws.get(&key) {
            debug!("force law cache hit");
            return Ok(Arc::clone(law));
        }

        debug!("force law cache miss, deriving");
        let law = Arc::new(ForceLaw::derive(model)?);
        self.laws.insert(key, Arc::clone(&law));
        Ok(law)
    }

    pub fn len(&self) -> usize {
        self.laws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laws.is_empty()
    }
}

/// Set of vertical acceleration terms summed per body
/// Each term implements [`Acceleration`]
pub struct AccelSet {
    terms: Vec<Box<dyn Acceleration + Send + Sync>>,
    parallel: bool,
}

impl Default for AccelSet {
    fn default() -> Self {
        Self::new()
    }
}

impl AccelSet {
    /// Create an empty acceleration set
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
            parallel: false,
        }
    }

    /// Add an acceleration term
    pub fn with<T>(mut self, term: T) -> Self
    where
        T: Acceleration + Send + Sync + 'static,
    {
        self.terms.push(Box::new(term));
        self
    }

    /// Evaluate bodies on the rayon pool instead of sequentially
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Total vertical acceleration of every body for heights `z`
    /// `step` is only used to label a singularity error
    pub fn accumulate_accels(&self, step: usize, sys: &System, z: &DVector<f64>) -> Result<DVector<f64>> {
        let n = sys.len();
        if z.len() != n {
            return Err(SimError::LengthMismatch {
                field: "z",
                expected: n,
                found: z.len(),
            });
        }

        // Terms are summed in insertion order, so serial and parallel agree bit for bit
        let body_total = |i: usize| -> Result<f64> {
            self.terms
                .iter()
                .try_fold(0.0, |acc, term| -> Result<f64> { Ok(acc + term.body_acceleration(step, i, sys, z)?) })
        };

        let values: Vec<f64> = if self.parallel {
            (0..n).into_par_iter().map(body_total).collect::<Result<_>>()?
        } else {
            (0..n).map(body_total).collect::<Result<_>>()?
        };

        Ok(DVector::from_vec(values))
    }
}

/// A vertical acceleration source
pub trait Acceleration {
    /// Contribution to body `i` when the bodies sit at heights `z`
    fn body_acceleration(&self, step: usize, i: usize, sys: &System, z: &DVector<f64>) -> Result<f64>;
}

/// Mutual gravity of the bodies, summed over every partner j != i
///
/// From U = -G m_j / r with r^2 = (x_j - x_i)^2 + (z_j - z_i)^2:
///   a_i += -dU/dz_i / C = G m_j (z_j - z_i) / r^3 / C
/// where C is `KM_PER_PC_DERIVATION`
pub struct PairwiseGravity {
    pub law: Arc<ForceLaw>,
}

impl Acceleration for PairwiseGravity {
    fn body_acceleration(&self, step: usize, i: usize, sys: &System, z: &DVector<f64>) -> Result<f64> {
        // bi: the body being accelerated
        let bi = &sys.bodies[i];
        let mut sum = 0.0;

        for (j, bj) in sys.bodies.iter().enumerate() {
            // no self-interaction
            if j == i {
                continue;
            }

            // Positive when j sits above i: i is pulled up toward j.
            // Horizontal separation only enters through r
            let a = self.law.pair_accel(bi.x, bj.x, z[i], z[j], bj.m);

            // Coincident bodies (r = 0) give 0/0 here; report the pair
            // instead of letting NaN reach the trajectory
            if !a.is_finite() {
                return Err(SimError::Singularity {
                    step,
                    body: i,
                    partner: Some(j),
                });
            }
            sum += a;
        }

        Ok(sum)
    }
}

/// Fixed disk potential acting on every body
///
/// With w = sqrt(z^2 + b^2) and R^2 = x^2 + (w + a)^2:
///   a_bg = -G BM (w + a) z / (R^3 w) / C
/// which always points back toward the midplane z = 0
pub struct BackgroundField {
    pub law: Arc<ForceLaw>,
}

impl Acceleration for BackgroundField {
    fn body_acceleration(&self, step: usize, i: usize, sys: &System, z: &DVector<f64>) -> Result<f64> {
        let a = self.law.background_accel(sys.bodies[i].x, z[i]);
        // only reachable with b = 0 and a body exactly on the midplane
        if !a.is_finite() {
            return Err(SimError::Singularity {
                step,
                body: i,
                partner: None,
            });
        }
        Ok(a)
    }
}
