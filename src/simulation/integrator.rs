//! Fixed-step position Verlet integrator for the vertical coordinate
//!
//! The recurrence z_{k+1} = 2 z_k - z_{k-1} + a_k dt^2 carries no velocity,
//! so it is seeded with a Taylor step from the initial position and velocity.
//! Accelerations are in km/s^2 and positions in pc, hence the `KM_PER_PC`
//! factor on every velocity and acceleration term.

use log::{info, trace};
use nalgebra::DVector;

use crate::error::{Result, SimError};
use super::forces::AccelSet;
use super::params::{Parameters, KM_PER_PC};
use super::states::{Snapshot, System, Trajectory};

fn check_step(dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(SimError::Config(format!("time step must be positive and finite, got {dt}")))
    }
}

/// Second snapshot from the initial condition:
/// z1 = z0 + (v0 / C) dt + 0.5 (a0 / C) dt^2
pub fn first_step(z0: &Snapshot, v0: &DVector<f64>, a0: &DVector<f64>, dt: f64) -> Result<Snapshot> {
    check_step(dt)?;
    for (field, len) in [("v", v0.len()), ("a", a0.len())] {
        if len != z0.len() {
            return Err(SimError::LengthMismatch {
                field,
                expected: z0.len(),
                found: len,
            });
        }
    }

    let v_pc = v0 / KM_PER_PC;
    let a_pc = a0 / KM_PER_PC;
    Ok(z0 + v_pc * dt + a_pc * (0.5 * dt * dt))
}

/// One position Verlet update for every body
pub fn verlet_position(z_prev: &Snapshot, z_curr: &Snapshot, a_curr: &DVector<f64>, dt: f64) -> Snapshot {
    z_curr * 2.0 - z_prev + a_curr / KM_PER_PC * (dt * dt)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorState {
    Uninitialized,
    Running { step: usize },
    Terminated,
}

/// Drives a [`System`] through `params.iterations` Verlet steps
///
/// Singularity errors are labelled with the index of the snapshot whose
/// positions produced the bad acceleration.
pub struct PositionVerlet<'a> {
    sys: &'a System,
    forces: &'a AccelSet,
    params: &'a Parameters,
    state: IntegratorState,
    z_prev: Snapshot,
    z_curr: Snapshot,
    a_curr: DVector<f64>,
    trajectory: Trajectory,
}

impl<'a> PositionVerlet<'a> {
    pub fn new(sys: &'a System, forces: &'a AccelSet, params: &'a Parameters) -> Self {
        Self {
            sys,
            forces,
            params,
            state: IntegratorState::Uninitialized,
            z_prev: DVector::zeros(0),
            z_curr: DVector::zeros(0),
            a_curr: DVector::zeros(0),
            trajectory: Trajectory::with_capacity(params.h0, params.iterations + 2),
        }
    }

    pub fn state(&self) -> IntegratorState {
        self.state
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Record the initial condition and the Taylor first step
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != IntegratorState::Uninitialized {
            return Err(SimError::State("already initialized"));
        }
        let dt = self.params.h0;
        check_step(dt)?;

        let z0 = self.sys.heights();
        let a0 = self.forces.accumulate_accels(0, self.sys, &z0)?;
        let z1 = first_step(&z0, &self.sys.velocities(), &a0, dt)?;
        let a1 = self.forces.accumulate_accels(1, self.sys, &z1)?;

        self.trajectory.push(z0.clone());
        self.trajectory.push(z1.clone());
        self.z_prev = z0;
        self.z_curr = z1;
        self.a_curr = a1;
        self.state = IntegratorState::Running { step: 0 };
        Ok(())
    }

    /// Advance every body by one step and append the new snapshot
    pub fn step(&mut self) -> Result<()> {
        let k = match self.state {
            IntegratorState::Running { step } if step < self.params.iterations => step,
            IntegratorState::Running { .. } => return Err(SimError::State("already at its final step")),
            IntegratorState::Uninitialized => return Err(SimError::State("not initialized")),
            IntegratorState::Terminated => return Err(SimError::State("terminated")),
        };

        let z_next = verlet_position(&self.z_prev, &self.z_curr, &self.a_curr, self.params.h0);
        let a_next = self.forces.accumulate_accels(k + 2, self.sys, &z_next)?;
        trace!("step {}: z = {}", k + 1, z_next.transpose());

        self.trajectory.push(z_next.clone());
        self.a_curr = a_next;
        self.z_prev = std::mem::replace(&mut self.z_curr, z_next);
        self.state = IntegratorState::Running { step: k + 1 };
        Ok(())
    }

    /// Run to completion, returning all `iterations + 2` snapshots
    pub fn run(mut self) -> Result<Trajectory> {
        if self.state == IntegratorState::Uninitialized {
            self.initialize()?;
        }

        info!(
            "integrating {} bodies for {} steps (dt = {:e} s)",
            self.sys.len(),
            self.params.iterations,
            self.params.h0
        );

        while let IntegratorState::Running { step } = self.state {
            if step >= self.params.iterations {
                break;
            }
            self.step()?;
        }
        self.state = IntegratorState::Terminated;

        info!("finished with {} snapshots", self.trajectory.len());
        Ok(self.trajectory)
    }
}
