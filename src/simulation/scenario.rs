//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing), validates it and produces a
//! runtime bundle (`Scenario`) containing:
//! - numerical parameters (`Parameters`)
//! - system state (`System` with bodies at t = 0)
//! - the derived force law and the active force set (`AccelSet`)
//!
//! Nothing is derived or integrated until the configuration has passed
//! validation.

use std::sync::Arc;

use log::info;

use crate::configuration::config::{BodiesConfig, ScenarioConfig};
use crate::error::{Result, SimError};
use crate::simulation::engine::Engine;
use crate::simulation::forces::{AccelSet, ForceLaw, ForceLawCache};
use crate::simulation::integrator::PositionVerlet;
use crate::simulation::params::Parameters;
use crate::simulation::potential::PotentialModel;
use crate::simulation::states::{Body, System, Trajectory};

/// Runtime bundle constructed from a [`ScenarioConfig`]
pub struct Scenario {
    pub parameters: Parameters,
    pub system: System,
    pub law: Arc<ForceLaw>,
    pub forces: AccelSet,
}

impl Scenario {
    /// Validate `cfg`, derive the force law and assemble the force set
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self> {
        Self::build_scenario_with_cache(cfg, &mut ForceLawCache::new())
    }

    /// Same as [`Scenario::build_scenario`], reusing laws already in `cache`
    pub fn build_scenario_with_cache(cfg: ScenarioConfig, cache: &mut ForceLawCache) -> Result<Self> {
        let bodies = build_bodies(&cfg.bodies)?;
        let system = System { bodies };

        // Parameters (runtime) from ParametersConfig
        let p_cfg = cfg.parameters;
        if !(p_cfg.h0.is_finite() && p_cfg.h0 > 0.0) {
            return Err(SimError::Config(format!("h0 must be positive and finite, got {}", p_cfg.h0)));
        }
        let iterations = usize::try_from(p_cfg.iterations)
            .map_err(|_| SimError::Config(format!("iterations must not be negative, got {}", p_cfg.iterations)))?;
        for (name, value) in [
            ("G", p_cfg.G),
            ("a", p_cfg.a),
            ("b", p_cfg.b),
            ("background_multiplier", p_cfg.background_multiplier),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::Config(format!("{name} must be finite and non-negative, got {value}")));
            }
        }

        let parameters = Parameters {
            h0: p_cfg.h0,
            iterations,
            G: p_cfg.G,
            a: p_cfg.a,
            b: p_cfg.b,
            background_mass: p_cfg.background_multiplier * system.total_mass(),
        };

        // Engine (runtime) from EngineConfig
        let engine = Engine {
            parallel: cfg.engine.parallel,
            background: cfg.engine.background,
        };

        let model = PotentialModel {
            G: parameters.G,
            background_mass: parameters.background_mass,
            a: parameters.a,
            b: parameters.b,
        };
        let law = cache.get_or_derive(&model)?;

        let forces = engine.force_set(&law);

        info!(
            "scenario: {} bodies, BM = {:.3e} M_sun, background {}",
            system.len(),
            parameters.background_mass,
            if engine.background { "on" } else { "off" }
        );

        Ok(Self {
            parameters,
            system,
            law,
            forces,
        })
    }

    /// Integrate the scenario, returning either the whole trajectory or the error
    pub fn run(&self) -> Result<Trajectory> {
        PositionVerlet::new(&self.system, &self.forces, &self.parameters).run()
    }
}

// Bodies: zip the config columns into runtime `Body`s
fn build_bodies(cfg: &BodiesConfig) -> Result<Vec<Body>> {
    let n = cfg.m.len();
    if n == 0 {
        return Err(SimError::Config("at least one body is required".to_string()));
    }
    for (field, len) in [("x", cfg.x.len()), ("z", cfg.z.len()), ("v", cfg.v.len())] {
        if len != n {
            return Err(SimError::LengthMismatch {
                field,
                expected: n,
                found: len,
            });
        }
    }

    (0..n)
        .map(|i| {
            let body = Body {
                x: cfg.x[i],
                z: cfg.z[i],
                vz: cfg.v[i],
                m: cfg.m[i],
            };
            if ![body.x, body.z, body.vz, body.m].iter().all(|v| v.is_finite()) {
                return Err(SimError::Config(format!("body {i} has a non-finite input")));
            }
            if body.m < 0.0 {
                return Err(SimError::Config(format!("body {i} has negative mass {}", body.m)));
            }
            Ok(body)
        })
        .collect()
}
