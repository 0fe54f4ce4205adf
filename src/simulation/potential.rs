//! Potential energy expressions, built symbolically
//!
//! - two-body: U(x1, x2, z1, z2, m) = -G m / sqrt((x2 - x1)^2 + (z2 - z1)^2)
//! - background disk: U_bg(x1, z1) = -G BM / sqrt(x1^2 + (sqrt(z1^2 + b^2) + a)^2)
//!
//! Both are in (km/s)^2. Physical constants are folded in as literals, only
//! positions (and the partner mass) stay symbolic.

use crate::error::DerivationError;
use crate::simulation::symbolic::{CompiledExpr, ExprGraph, ExprId};

/// Variable slots of the two-body potential
pub mod pair_slots {
    pub const X1: usize = 0;
    pub const X2: usize = 1;
    pub const Z1: usize = 2;
    pub const Z2: usize = 3;
    pub const M: usize = 4;
    pub const NAMES: [&str; 5] = ["x1", "x2", "z1", "z2", "m"];
}

/// Variable slots of the background potential
pub mod background_slots {
    pub const X1: usize = 0;
    pub const Z1: usize = 1;
    pub const NAMES: [&str; 2] = ["x1", "z1"];
}

/// A potential expression together with the graph that owns it
#[derive(Debug, Clone)]
pub struct PotentialExpr {
    pub graph: ExprGraph,
    pub root: ExprId,
    pub names: &'static [&'static str],
}

impl PotentialExpr {
    /// Numeric form of the potential itself
    pub fn compile(&self) -> Result<CompiledExpr, DerivationError> {
        self.graph.compile(self.root)
    }
}

/// Symbolic potential model for one set of physical constants
#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotentialModel {
    pub G: f64,
    pub background_mass: f64,
    pub a: f64,
    pub b: f64,
}

impl PotentialModel {
    /// Pairwise point-mass potential felt by body 1 from body 2 of mass m
    pub fn two_body(&self) -> PotentialExpr {
        use pair_slots::*;

        let mut g = ExprGraph::new(NAMES.len());
        let x1 = g.var(X1);
        let x2 = g.var(X2);
        let z1 = g.var(Z1);
        let z2 = g.var(Z2);
        let m = g.var(M);

        let dx = g.sub(x2, x1);
        let dz = g.sub(z2, z1);
        let dx2 = g.powi(dx, 2);
        let dz2 = g.powi(dz, 2);
        let r2 = g.add(dx2, dz2);
        let r = g.sqrt(r2);

        let big_g = g.constant(self.G);
        let gm = g.mul(big_g, m);
        let q = g.div(gm, r);
        let root = g.neg(q);

        PotentialExpr {
            graph: g,
            root,
            names: &NAMES,
        }
    }

    /// Flattened disk potential of the fixed background mass
    pub fn background(&self) -> PotentialExpr {
        use background_slots::*;

        let mut g = ExprGraph::new(NAMES.len());
        let x1 = g.var(X1);
        let z1 = g.var(Z1);

        let b = g.constant(self.b);
        let a = g.constant(self.a);
        let z1_2 = g.powi(z1, 2);
        let b2 = g.powi(b, 2);
        let zb = g.add(z1_2, b2);
        let w = g.sqrt(zb);
        let wa = g.add(w, a);
        let wa2 = g.powi(wa, 2);
        let x1_2 = g.powi(x1, 2);
        let s = g.add(x1_2, wa2);
        let r = g.sqrt(s);

        let gbm = g.constant(self.G * self.background_mass);
        let q = g.div(gbm, r);
        let root = g.neg(q);

        PotentialExpr {
            graph: g,
            root,
            names: &NAMES,
        }
    }
}
