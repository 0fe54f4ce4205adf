//! Core state types for the vertical disk simulation.
//!
//! - `Body` / `System` hold the fixed per-body data and the initial condition
//! - `Trajectory` is the append-only record of vertical positions
//!
//! Only the vertical coordinate evolves; horizontal positions and masses are
//! fixed for the whole run.

use nalgebra::DVector;

/// Per-body vertical positions at one instant
pub type Snapshot = DVector<f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub x: f64, // fixed horizontal position (pc)
    pub z: f64, // initial vertical position (pc)
    pub vz: f64, // initial vertical velocity (km/s)
    pub m: f64, // mass (M_sun)
}

#[derive(Debug, Clone, PartialEq)]
pub struct System {
    pub bodies: Vec<Body>,
}

impl System {
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn total_mass(&self) -> f64 {
        self.bodies.iter().map(|b| b.m).sum()
    }

    pub fn masses(&self) -> DVector<f64> {
        DVector::from_iterator(self.len(), self.bodies.iter().map(|b| b.m))
    }

    /// Initial condition snapshot
    pub fn heights(&self) -> Snapshot {
        DVector::from_iterator(self.len(), self.bodies.iter().map(|b| b.z))
    }

    pub fn velocities(&self) -> DVector<f64> {
        DVector::from_iterator(self.len(), self.bodies.iter().map(|b| b.vz))
    }
}

/// Append-only sequence of snapshots spaced by a fixed time step
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    dt: f64,
    snapshots: Vec<Snapshot>,
}

impl Trajectory {
    pub(crate) fn with_capacity(dt: f64, capacity: usize) -> Self {
        Self {
            dt,
            snapshots: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, snapshot: Snapshot) {
        debug_assert!(
            self.snapshots.first().map_or(true, |s| s.len() == snapshot.len()),
            "snapshot length changed mid-run"
        );
        self.snapshots.push(snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshot(&self, k: usize) -> Option<&Snapshot> {
        self.snapshots.get(k)
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// t_k = k * dt
    pub fn time(&self, k: usize) -> f64 {
        k as f64 * self.dt
    }

    /// (t_k, snapshot_k) pairs in order
    pub fn iter_timed(&self) -> impl Iterator<Item = (f64, &Snapshot)> + '_ {
        self.snapshots
            .iter()
            .enumerate()
            .map(move |(k, s)| (self.time(k), s))
    }

    /// Time series of body `i` (what a plot of a single body reads)
    pub fn body_track(&self, i: usize) -> Option<Vec<f64>> {
        self.snapshots.iter().map(|s| s.get(i).copied()).collect()
    }

    /// Mass-weighted mean height of snapshot `k`
    pub fn center_of_mass(&self, masses: &DVector<f64>, k: usize) -> Option<f64> {
        let s = self.snapshots.get(k)?;
        let total = masses.sum();
        if s.len() != masses.len() || total == 0.0 {
            return None;
        }
        Some(masses.dot(s) / total)
    }
}
