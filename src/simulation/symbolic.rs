//! Small symbolic expression graph used to derive force laws from potentials
//!
//! Expressions are stored in an append-only arena (`ExprGraph`) and referred to
//! by `ExprId` handles. A child always has a smaller id than its parent, so the
//! arena order is already a valid evaluation order.
//!
//! The intended flow is build -> `diff` -> `simplify` -> `compile`, done once.
//! The resulting `CompiledExpr` is a flat instruction tape that is evaluated
//! numerically as many times as needed without touching the graph again

use std::collections::HashMap;
use std::fmt;

use crate::error::DerivationError;

/// Handle to a node inside an [`ExprGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Const(f64),
    Var(usize),
    Add(ExprId, ExprId),
    Mul(ExprId, ExprId),
    Neg(ExprId),
    Recip(ExprId),
    Sqrt(ExprId),
    Powi(ExprId, i32),
}

/// Arena of expression nodes over `arity` variable slots
#[derive(Debug, Clone)]
pub struct ExprGraph {
    nodes: Vec<Node>,
    arity: usize,
}

impl ExprGraph {
    pub fn new(arity: usize) -> Self {
        Self {
            nodes: Vec::new(),
            arity,
        }
    }

    fn push(&mut self, node: Node) -> ExprId {
        self.nodes.push(node);
        ExprId(self.nodes.len() - 1)
    }

    fn node(&self, id: ExprId) -> Result<Node, DerivationError> {
        self.nodes
            .get(id.0)
            .copied()
            .ok_or(DerivationError::DanglingNode(id.0))
    }

    // -------------------------------------------------------------------------
    // builders
    // -------------------------------------------------------------------------

    pub fn constant(&mut self, value: f64) -> ExprId {
        self.push(Node::Const(value))
    }

    pub fn var(&mut self, slot: usize) -> ExprId {
        self.push(Node::Var(slot))
    }

    pub fn add(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.push(Node::Add(a, b))
    }

    pub fn sub(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let nb = self.neg(b);
        self.add(a, nb)
    }

    pub fn mul(&mut self, a: ExprId, b: ExprId) -> ExprId {
        self.push(Node::Mul(a, b))
    }

    pub fn div(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let rb = self.recip(b);
        self.mul(a, rb)
    }

    pub fn neg(&mut self, a: ExprId) -> ExprId {
        self.push(Node::Neg(a))
    }

    pub fn recip(&mut self, a: ExprId) -> ExprId {
        self.push(Node::Recip(a))
    }

    pub fn sqrt(&mut self, a: ExprId) -> ExprId {
        self.push(Node::Sqrt(a))
    }

    pub fn powi(&mut self, a: ExprId, n: i32) -> ExprId {
        self.push(Node::Powi(a, n))
    }

    // -------------------------------------------------------------------------
    // differentiation
    // -------------------------------------------------------------------------

    /// Partial derivative of `expr` with respect to variable `slot`
    pub fn diff(&mut self, expr: ExprId, slot: usize) -> Result<ExprId, DerivationError> {
        if slot >= self.arity {
            return Err(DerivationError::UnknownVariable {
                slot,
                arity: self.arity,
            });
        }
        let mut memo = HashMap::new();
        self.diff_rec(expr, slot, &mut memo)
    }

    fn diff_rec(
        &mut self,
        expr: ExprId,
        slot: usize,
        memo: &mut HashMap<ExprId, ExprId>,
    ) -> Result<ExprId, DerivationError> {
        if let Some(&d) = memo.get(&expr) {
            return Ok(d);
        }

        let d = match self.node(expr)? {
            Node::Const(_) => self.constant(0.0),
            Node::Var(s) => self.constant(if s == slot { 1.0 } else { 0.0 }),
            Node::Add(a, b) => {
                let da = self.diff_rec(a, slot, memo)?;
                let db = self.diff_rec(b, slot, memo)?;
                self.add(da, db)
            }
            Node::Mul(a, b) => {
                // (ab)' = a'b + ab'
                let da = self.diff_rec(a, slot, memo)?;
                let db = self.diff_rec(b, slot, memo)?;
                let l = self.mul(da, b);
                let r = self.mul(a, db);
                self.add(l, r)
            }
            Node::Neg(a) => {
                let da = self.diff_rec(a, slot, memo)?;
                self.neg(da)
            }
            Node::Recip(a) => {
                // (1/a)' = -a' / a^2
                let da = self.diff_rec(a, slot, memo)?;
                let a2 = self.powi(a, 2);
                let q = self.div(da, a2);
                self.neg(q)
            }
            Node::Sqrt(a) => {
                // sqrt(a)' = a' / (2 sqrt(a)), reusing this node for sqrt(a)
                let da = self.diff_rec(a, slot, memo)?;
                let two = self.constant(2.0);
                let den = self.mul(two, expr);
                self.div(da, den)
            }
            Node::Powi(a, n) => {
                // (a^n)' = n a^(n-1) a'
                let da = self.diff_rec(a, slot, memo)?;
                let k = self.constant(n as f64);
                let p = self.powi(a, n - 1);
                let kp = self.mul(k, p);
                self.mul(kp, da)
            }
        };

        memo.insert(expr, d);
        Ok(d)
    }

    // -------------------------------------------------------------------------
    // simplification
    // -------------------------------------------------------------------------

    /// Constant folding plus the usual identities (x+0, x*1, x*0, --x, ...)
    pub fn simplify(&mut self, expr: ExprId) -> Result<ExprId, DerivationError> {
        let mut memo = HashMap::new();
        self.simplify_rec(expr, &mut memo)
    }

    fn const_of(&self, id: ExprId) -> Option<f64> {
        match self.nodes.get(id.0) {
            Some(Node::Const(c)) => Some(*c),
            _ => None,
        }
    }

    fn simplify_rec(
        &mut self,
        expr: ExprId,
        memo: &mut HashMap<ExprId, ExprId>,
    ) -> Result<ExprId, DerivationError> {
        if let Some(&s) = memo.get(&expr) {
            return Ok(s);
        }

        let s = match self.node(expr)? {
            Node::Const(_) | Node::Var(_) => expr,
            Node::Add(a, b) => {
                let a = self.simplify_rec(a, memo)?;
                let b = self.simplify_rec(b, memo)?;
                match (self.const_of(a), self.const_of(b)) {
                    (Some(x), Some(y)) => self.constant(x + y),
                    (Some(x), _) if x == 0.0 => b,
                    (_, Some(y)) if y == 0.0 => a,
                    _ => self.add(a, b),
                }
            }
            Node::Mul(a, b) => {
                let a = self.simplify_rec(a, memo)?;
                let b = self.simplify_rec(b, memo)?;
                match (self.const_of(a), self.const_of(b)) {
                    (Some(x), Some(y)) => self.constant(x * y),
                    (Some(x), _) | (_, Some(x)) if x == 0.0 => self.constant(0.0),
                    (Some(x), _) if x == 1.0 => b,
                    (_, Some(y)) if y == 1.0 => a,
                    _ => self.mul(a, b),
                }
            }
            Node::Neg(a) => {
                let a = self.simplify_rec(a, memo)?;
                match self.node(a)? {
                    Node::Const(c) => self.constant(-c),
                    Node::Neg(inner) => inner,
                    _ => self.neg(a),
                }
            }
            Node::Recip(a) => {
                let a = self.simplify_rec(a, memo)?;
                match self.node(a)? {
                    Node::Const(c) => self.constant(c.recip()),
                    Node::Recip(inner) => inner,
                    _ => self.recip(a),
                }
            }
            Node::Sqrt(a) => {
                let a = self.simplify_rec(a, memo)?;
                match self.const_of(a) {
                    Some(c) => self.constant(c.sqrt()),
                    None => self.sqrt(a),
                }
            }
            Node::Powi(a, n) => {
                let a = self.simplify_rec(a, memo)?;
                match (self.const_of(a), n) {
                    (Some(c), _) => self.constant(c.powi(n)),
                    (_, 0) => self.constant(1.0),
                    (_, 1) => a,
                    _ => self.powi(a, n),
                }
            }
        };

        memo.insert(expr, s);
        Ok(s)
    }

    // -------------------------------------------------------------------------
    // compilation
    // -------------------------------------------------------------------------

    /// Flatten the sub-graph reachable from `expr` into an evaluation tape
    pub fn compile(&self, expr: ExprId) -> Result<CompiledExpr, DerivationError> {
        // Collect reachable nodes; ids already respect child-before-parent
        let mut reachable = vec![false; self.nodes.len()];
        let mut stack = vec![expr];
        while let Some(id) = stack.pop() {
            if reachable.get(id.0).copied().unwrap_or(false) {
                continue;
            }
            match self.node(id)? {
                Node::Const(_) => {}
                Node::Var(slot) => {
                    if slot >= self.arity {
                        return Err(DerivationError::UnboundVariable {
                            slot,
                            arity: self.arity,
                        });
                    }
                }
                Node::Add(a, b) | Node::Mul(a, b) => {
                    stack.push(a);
                    stack.push(b);
                }
                Node::Neg(a) | Node::Recip(a) | Node::Sqrt(a) | Node::Powi(a, _) => stack.push(a),
            }
            reachable[id.0] = true;
        }

        let mut slot_of = HashMap::new();
        let mut tape = Vec::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            if !reachable[idx] {
                continue;
            }
            let at = |id: &ExprId| slot_of[id];
            let op = match node {
                Node::Const(c) => Op::Const(*c),
                Node::Var(s) => Op::Var(*s),
                Node::Add(a, b) => Op::Add(at(a), at(b)),
                Node::Mul(a, b) => Op::Mul(at(a), at(b)),
                Node::Neg(a) => Op::Neg(at(a)),
                Node::Recip(a) => Op::Recip(at(a)),
                Node::Sqrt(a) => Op::Sqrt(at(a)),
                Node::Powi(a, n) => Op::Powi(at(a), *n),
            };
            slot_of.insert(ExprId(idx), tape.len());
            tape.push(op);
        }

        Ok(CompiledExpr {
            tape,
            arity: self.arity,
        })
    }

    /// Infix rendering of `expr`, with `names[slot]` used for variables
    pub fn display<'a>(&'a self, expr: ExprId, names: &'a [&'a str]) -> ExprDisplay<'a> {
        ExprDisplay {
            graph: self,
            expr,
            names,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Const(f64),
    Var(usize),
    Add(usize, usize),
    Mul(usize, usize),
    Neg(usize),
    Recip(usize),
    Sqrt(usize),
    Powi(usize, i32),
}

/// Closed-form expression ready for repeated numeric evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    tape: Vec<Op>,
    arity: usize,
}

impl CompiledExpr {
    /// Evaluate with `args[slot]` bound to each variable
    pub fn eval(&self, args: &[f64]) -> f64 {
        debug_assert_eq!(args.len(), self.arity, "wrong number of arguments");

        let mut regs: Vec<f64> = Vec::with_capacity(self.tape.len());
        for op in &self.tape {
            let v = match *op {
                Op::Const(c) => c,
                Op::Var(s) => args[s],
                Op::Add(a, b) => regs[a] + regs[b],
                Op::Mul(a, b) => regs[a] * regs[b],
                Op::Neg(a) => -regs[a],
                Op::Recip(a) => 1.0 / regs[a],
                Op::Sqrt(a) => f64::sqrt(regs[a]),
                Op::Powi(a, n) => f64::powi(regs[a], n),
            };
            regs.push(v);
        }
        regs.last().copied().unwrap_or(0.0)
    }
}

pub struct ExprDisplay<'a> {
    graph: &'a ExprGraph,
    expr: ExprId,
    names: &'a [&'a str],
}

impl ExprDisplay<'_> {
    fn write(&self, f: &mut fmt::Formatter<'_>, id: ExprId) -> fmt::Result {
        let Some(node) = self.graph.nodes.get(id.0) else {
            return write!(f, "<?>");
        };
        match *node {
            Node::Const(c) => write!(f, "{c}"),
            Node::Var(s) => match self.names.get(s) {
                Some(name) => write!(f, "{name}"),
                None => write!(f, "v{s}"),
            },
            Node::Add(a, b) => {
                write!(f, "(")?;
                self.write(f, a)?;
                match self.graph.nodes.get(b.0) {
                    Some(Node::Neg(nb)) => {
                        write!(f, " - ")?;
                        self.write(f, *nb)?;
                    }
                    _ => {
                        write!(f, " + ")?;
                        self.write(f, b)?;
                    }
                }
                write!(f, ")")
            }
            Node::Mul(a, b) => {
                self.write(f, a)?;
                match self.graph.nodes.get(b.0) {
                    Some(Node::Recip(rb)) => {
                        write!(f, "/")?;
                        self.write_atom(f, *rb)
                    }
                    _ => {
                        write!(f, "*")?;
                        self.write(f, b)
                    }
                }
            }
            Node::Neg(a) => {
                write!(f, "-")?;
                self.write_atom(f, a)
            }
            Node::Recip(a) => {
                write!(f, "1/")?;
                self.write_atom(f, a)
            }
            Node::Sqrt(a) => {
                write!(f, "sqrt(")?;
                self.write(f, a)?;
                write!(f, ")")
            }
            Node::Powi(a, n) => {
                self.write_atom(f, a)?;
                write!(f, "^{n}")
            }
        }
    }

    // products and powers get wrapped so precedence survives printing
    fn write_atom(&self, f: &mut fmt::Formatter<'_>, id: ExprId) -> fmt::Result {
        match self.graph.nodes.get(id.0) {
            Some(Node::Mul(..)) | Some(Node::Powi(..)) | Some(Node::Recip(..)) => {
                write!(f, "(")?;
                self.write(f, id)?;
                write!(f, ")")
            }
            _ => self.write(f, id),
        }
    }
}

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, self.expr)
    }
}
