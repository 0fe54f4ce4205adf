//! Numerical and physical parameters for the simulation
//!
//! `Parameters` holds runtime settings:
//! - integration step size and iteration count,
//! - gravitational constant `G` in pc (km/s)^2 / M_sun,
//! - background disk mass and scale lengths (`background_mass`, `a`, `b`)
//!
//! Lengths are parsecs, velocities km/s, masses solar masses, time seconds

/// Default gravitational constant, pc (km/s)^2 M_sun^-1
pub const G_PC_KMS2_PER_MSUN: f64 = 4.3009e-3;

/// km per parsec as used when converting the derived force law
pub const KM_PER_PC_DERIVATION: f64 = 3.0856e13;

/// km per parsec as used by the initializer and the Verlet recurrence
pub const KM_PER_PC: f64 = 3.086e13;

/// Default background mass as a multiple of the total body mass
pub const DEFAULT_BACKGROUND_MULTIPLIER: f64 = 100.0;

#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub h0: f64, // step size (s)
    pub iterations: usize, // Verlet steps after the first step
    pub G: f64, // gravitational constant
    pub a: f64, // background radial scale length (pc)
    pub b: f64, // background vertical scale length (pc)
    pub background_mass: f64, // BM, solar masses
}
