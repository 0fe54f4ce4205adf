pub mod states;
pub mod params;
pub mod engine;
pub mod symbolic;
pub mod potential;
pub mod forces;
pub mod integrator;
pub mod scenario;
