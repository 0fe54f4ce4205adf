pub mod error;
pub mod simulation;
pub mod configuration;
pub mod benchmark;

pub use error::{DerivationError, Result, SimError};

pub use simulation::states::{Body, System, Snapshot, Trajectory};
pub use simulation::params::{Parameters, KM_PER_PC, KM_PER_PC_DERIVATION, G_PC_KMS2_PER_MSUN};
pub use simulation::potential::PotentialModel;
pub use simulation::forces::{Acceleration, AccelSet, BackgroundField, ForceLaw, ForceLawCache, PairwiseGravity};
pub use simulation::integrator::{first_step, verlet_position, IntegratorState, PositionVerlet};
pub use simulation::scenario::Scenario;

pub use configuration::config::{BodiesConfig, EngineConfig, ParametersConfig, ScenarioConfig};

pub use benchmark::benchmark::{bench_accel, bench_derivation, bench_run_curve};
