/*!
The sampler expression type.

A [`Sampler`] is a tree: leaves draw from named distributions and inner nodes
combine their children's draws. Building a tree never draws anything; only
[`Sampler::sample`] does, recursing through the children. Every `sample(size)`
returns an array of shape `(size, dim)`, where `dim` follows from the tree.

# Examples

```rust
use mini_sampler::{Params, Sampler};

let normal = Sampler::leaf("n", Params::new()).unwrap();
let uniform = Sampler::leaf("u", Params::new().with("low", 5.0).with("high", 6.0)).unwrap();

// 30% normal, 70% uniform.
let mut mixture = (normal & 3.0) | (uniform & 7.0);
assert_eq!(mixture.weight(), 10.0);
assert_eq!(mixture.sample(1000).unwrap().shape(), &[1000, 1]);

// Two-dimensional draws from three independent leaves.
let x = Sampler::leaf("n", Params::new()).unwrap();
let y = Sampler::leaf("e", Params::new()).unwrap();
let z = Sampler::leaf("u", Params::new()).unwrap();
let mut point = x & (y + z);
assert_eq!(point.sample(8).unwrap().shape(), &[8, 2]);
```
*/

use std::fmt;

use ndarray::{Array1, Array2};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::combinators::{incompatible, stack, Mixture, Op, Truncate, TruncateOptions};
use crate::error::{Result, SamplerError};
use crate::leaf::Leaf;
use crate::params::{invalid, Param, Params};

/// Anything that produces `size` rows of draws.
///
/// Implement this to plug a custom sampler into the algebra with
/// [`Sampler::custom`].
pub trait Sample {
    /// Draws an array with exactly `size` rows.
    fn sample(&mut self, size: usize) -> Result<Array2<f64>>;

    /// Reseeds any internal random state. Deterministic samplers can ignore it.
    fn set_seed(&mut self, _seed: u64) {}
}

type Transform = Box<dyn FnMut(Array2<f64>) -> Array2<f64> + Send>;

enum Node {
    Leaf(Leaf),
    Constant(Array1<f64>),
    Custom(Box<dyn Sample + Send>),
    Mixture(Mixture),
    Stack(Box<Sampler>, Box<Sampler>),
    Arithmetic(Op, Box<Sampler>, Box<Sampler>),
    Apply(Box<Sampler>, Transform),
    Truncate(Truncate),
}

/// A lazily evaluated sampler expression with a mixture weight.
pub struct Sampler {
    weight: f64,
    node: Node,
}

impl Sampler {
    fn from_node(node: Node) -> Self {
        Self { weight: 1.0, node }
    }

    /// A sampler drawing from the named distribution (or alias).
    ///
    /// A `dim` entry in `params` is consumed and expands the leaf into that
    /// many independent columns, as with [`Sampler::leaf_with_dim`].
    pub fn leaf(name: &str, params: Params) -> Result<Self> {
        match params.get("dim").cloned() {
            None => Ok(Leaf::new(name, params)?.into()),
            Some(dim) => {
                let dim = match dim {
                    Param::Int(d) if d >= 0 => d as usize,
                    other => {
                        return Err(invalid(
                            name,
                            "dim",
                            format!("expected a positive integer, got {other:?}"),
                        ))
                    }
                };
                Self::leaf_with_dim(name, params.without("dim"), dim)
            }
        }
    }

    /// `dim` independent copies of the same leaf, stacked column-wise.
    ///
    /// With `dim == 1` this is the plain leaf. Every copy owns its own RNG; a
    /// `seed` parameter seeds the whole stack, one derived seed per column.
    pub fn leaf_with_dim(name: &str, params: Params, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(invalid(name, "dim", "must be at least 1"));
        }
        let seed = match params.get("seed") {
            Some(_) => Some(params.require_count("leaf", "seed")?),
            None => None,
        };
        let params = params.without("seed");
        let mut stacked: Sampler = Leaf::new(name, params.clone())?.into();
        for _ in 1..dim {
            stacked = Sampler::from(Leaf::new(name, params.clone())?) & stacked;
        }
        log::debug!("expanded `{name}` into {dim} independent columns");
        Ok(match seed {
            Some(seed) => stacked.set_seed(seed),
            None => stacked,
        })
    }

    /// Always returns `value` in a single column.
    pub fn constant(value: f64) -> Self {
        Self::constant_row(vec![value])
    }

    /// Always returns `row` in every row.
    pub fn constant_row(row: impl Into<Array1<f64>>) -> Self {
        Self::from_node(Node::Constant(row.into()))
    }

    /// Lifts a user-defined sampler into the algebra.
    pub fn custom(sampler: impl Sample + Send + 'static) -> Self {
        Self::from_node(Node::Custom(Box::new(sampler)))
    }

    /// Weighted mixture; also available as `left | right`.
    pub fn mixture(left: Sampler, right: Sampler) -> Self {
        let mixture = Mixture::new(left, right);
        let weight = mixture.left.weight + mixture.right.weight;
        Self {
            weight,
            node: Node::Mixture(mixture),
        }
    }

    /// Column-wise stack; also available as `left & right`.
    pub fn stack(left: Sampler, right: Sampler) -> Self {
        Self::from_node(Node::Stack(Box::new(left), Box::new(right)))
    }

    /// Elementwise `op` over independent draws of both operands.
    pub fn arithmetic(op: Op, left: Sampler, right: Sampler) -> Self {
        Self::from_node(Node::Arithmetic(op, Box::new(left), Box::new(right)))
    }

    /// Elementwise `self ** exponent`.
    pub fn pow(self, exponent: impl Into<Sampler>) -> Self {
        Self::arithmetic(Op::Pow, self, exponent.into())
    }

    /// Elementwise floor division.
    pub fn floor_div(self, divisor: impl Into<Sampler>) -> Self {
        Self::arithmetic(Op::FloorDiv, self, divisor.into())
    }

    /// Maps every draw through `f`, which must keep the number of rows.
    pub fn apply<F>(self, f: F) -> Self
    where
        F: FnMut(Array2<f64>) -> Array2<f64> + Send + 'static,
    {
        let weight = self.weight;
        Self {
            weight,
            node: Node::Apply(Box::new(self), Box::new(f)),
        }
    }

    /// Keeps only rows whose coordinates all lie within the bounds.
    pub fn truncate(self, options: TruncateOptions) -> Self {
        let weight = self.weight;
        Self {
            weight,
            node: Node::Truncate(Truncate::new(self, options)),
        }
    }

    /// Same sampler, weight multiplied by `factor`; also `sampler & factor`.
    pub fn reweight(mut self, factor: f64) -> Self {
        self.weight *= factor;
        self
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Reseeds every random state in the tree from `seed`.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.reseed(&mut SmallRng::seed_from_u64(seed));
        self
    }

    pub(crate) fn reseed(&mut self, seeder: &mut SmallRng) {
        match &mut self.node {
            Node::Leaf(leaf) => leaf.reseed(seeder.gen()),
            Node::Constant(_) => {}
            Node::Custom(custom) => custom.set_seed(seeder.gen()),
            Node::Mixture(mixture) => mixture.reseed(seeder),
            Node::Stack(left, right) | Node::Arithmetic(_, left, right) => {
                left.reseed(seeder);
                right.reseed(seeder);
            }
            Node::Apply(inner, _) => inner.reseed(seeder),
            Node::Truncate(truncate) => truncate.inner.reseed(seeder),
        }
    }

    /// Draws `size` rows from the tree.
    pub fn sample(&mut self, size: usize) -> Result<Array2<f64>> {
        match &mut self.node {
            Node::Leaf(leaf) => leaf.sample(size),
            Node::Constant(row) => Ok(Array2::from_shape_fn((size, row.len()), |(_, j)| row[j])),
            Node::Custom(custom) => {
                let draw = custom.sample(size)?;
                check_rows(draw, size)
            }
            Node::Mixture(mixture) => mixture.sample(size),
            Node::Stack(left, right) => stack(left, right, size),
            Node::Arithmetic(op, left, right) => {
                let l = left.sample(size)?;
                let r = right.sample(size)?;
                op.combine(&l, &r)
            }
            Node::Apply(inner, f) => {
                let draw = inner.sample(size)?;
                check_rows(f(draw), size)
            }
            Node::Truncate(truncate) => truncate.sample(size),
        }
    }
}

fn check_rows(draw: Array2<f64>, size: usize) -> Result<Array2<f64>> {
    if draw.nrows() == size {
        Ok(draw)
    } else {
        Err(incompatible())
    }
}

impl Sample for Sampler {
    fn sample(&mut self, size: usize) -> Result<Array2<f64>> {
        Sampler::sample(self, size)
    }

    fn set_seed(&mut self, seed: u64) {
        self.reseed(&mut SmallRng::seed_from_u64(seed));
    }
}

impl From<Leaf> for Sampler {
    fn from(leaf: Leaf) -> Self {
        Self::from_node(Node::Leaf(leaf))
    }
}

impl From<f64> for Sampler {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl TryFrom<&str> for Sampler {
    type Error = SamplerError;

    /// A leaf with default parameters, e.g. `Sampler::try_from("n")`.
    fn try_from(name: &str) -> Result<Self> {
        Self::leaf(name, Params::new())
    }
}

impl fmt::Debug for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Node::Leaf(leaf) => write!(f, "{}", leaf.name())?,
            Node::Constant(row) => write!(f, "{row}")?,
            Node::Custom(_) => write!(f, "<custom>")?,
            Node::Mixture(m) => write!(f, "({:?} | {:?})", m.left, m.right)?,
            Node::Stack(l, r) => write!(f, "({l:?} & {r:?})")?,
            Node::Arithmetic(op, l, r) => write!(f, "({l:?} {} {r:?})", op.symbol())?,
            Node::Apply(inner, _) => write!(f, "apply({inner:?})")?,
            Node::Truncate(t) => write!(f, "truncate({:?})", t.inner)?,
        }
        if self.weight != 1.0 {
            write!(f, "@{}", self.weight)?;
        }
        Ok(())
    }
}
