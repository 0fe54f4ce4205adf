//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – engine options (parallel evaluation, background term)
//! - [`ParametersConfig`] – numerical parameters and physical constants
//! - [`BodiesConfig`]     – per-body masses and initial conditions, column-wise
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//! The reference five-body run:
//!
//! ```yaml
//! engine:
//!   parallel: false
//!   background: true
//!
//! parameters:
//!   G: 4.3009e-3                # pc (km/s)^2 / M_sun
//!   a: 2700.0                   # background radial scale (pc)
//!   b: 200.0                    # background vertical scale (pc)
//!   background_multiplier: 100  # BM = multiplier * sum(m)
//!   h0: 3.156e15                # time step (s)
//!   iterations: 10
//!
//! bodies:
//!   m: [100, 200, 150, 300, 500]   # M_sun
//!   x: [10, 20, 30, 40, 50]        # pc, fixed
//!   z: [-30, 20, 10, 30, -10]      # pc, initial
//!   v: [0, 0, 0, 0, 0]             # km/s, initial
//! ```
//!
//! Lengths and ranges are not checked here; `Scenario::build_scenario` does
//! that before anything is derived or integrated.

use serde::Deserialize;

use crate::simulation::params::{DEFAULT_BACKGROUND_MULTIPLIER, G_PC_KMS2_PER_MSUN};

/// High-level engine configuration
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub parallel: bool, // `true` - evaluate bodies on the rayon pool
    #[serde(default = "default_true")]
    pub background: bool, // `false` - drop the background disk term
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            background: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_g() -> f64 {
    G_PC_KMS2_PER_MSUN
}

fn default_multiplier() -> f64 {
    DEFAULT_BACKGROUND_MULTIPLIER
}

/// Global numerical and physical parameters for a scenario
#[allow(non_snake_case)]
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ParametersConfig {
    #[serde(default = "default_g")]
    pub G: f64, // gravitational constant
    pub a: f64, // background radial scale length
    pub b: f64, // background vertical scale length
    #[serde(default = "default_multiplier")]
    pub background_multiplier: f64, // background mass / total body mass
    pub h0: f64, // time step size
    pub iterations: i64, // signed so that a negative count is reported, not a parse error
}

/// Per-body inputs as parallel columns, body `i` is index `i` of each
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BodiesConfig {
    pub m: Vec<f64>, // masses
    pub x: Vec<f64>, // fixed horizontal positions
    pub z: Vec<f64>, // initial vertical positions
    pub v: Vec<f64>, // initial vertical velocities
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    pub parameters: ParametersConfig,
    pub bodies: BodiesConfig,
}

impl ScenarioConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// The reference five-body disk run
    pub fn default_disk() -> Self {
        Self {
            engine: EngineConfig::default(),
            parameters: ParametersConfig {
                G: G_PC_KMS2_PER_MSUN,
                a: 2700.0,
                b: 200.0,
                background_multiplier: DEFAULT_BACKGROUND_MULTIPLIER,
                h0: 3.156e15,
                iterations: 10,
            },
            bodies: BodiesConfig {
                m: vec![100.0, 200.0, 150.0, 300.0, 500.0],
                x: vec![10.0, 20.0, 30.0, 40.0, 50.0],
                z: vec![-30.0, 20.0, 10.0, 30.0, -10.0],
                v: vec![0.0; 5],
            },
        }
    }
}
