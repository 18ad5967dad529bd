//! Node-level sampling for the binary combinators and truncation.

use ndarray::{concatenate, Array2, ArrayView2, Axis, ErrorKind, ShapeError, Zip};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Binomial, Distribution};

use crate::error::{Result, SamplerError};
use crate::params::invalid;
use crate::sampler::Sampler;

/// If the empirical probability of a truncation region is below this share,
/// truncated sampling fails.
pub const SMALL_SHARE: f64 = 1e-2;

/// Minimum number of rows drawn per truncation round, so that the acceptance
/// share is never estimated from a handful of rows.
const MIN_TRUNCATION_BATCH: usize = 128;

/// Lowest share used to size a truncation round; caps a round at
/// `1 / MIN_BATCH_SHARE` times the missing rows.
const MIN_BATCH_SHARE: f64 = 1e-4;

/// Elementwise binary operation applied by an arithmetic node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    FloorDiv,
    Mod,
}

impl Op {
    /// Applies the operation to two scalars with IEEE-754 semantics: division
    /// by zero yields infinities or NaN, never an error. `Mod` and `FloorDiv`
    /// round towards negative infinity, so the remainder takes the sign of
    /// the divisor.
    pub fn eval(self, a: f64, b: f64) -> f64 {
        match self {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
            Op::Div => a / b,
            Op::Pow => a.powf(b),
            Op::FloorDiv => (a / b).floor(),
            Op::Mod => {
                let r = a % b;
                if r != 0.0 && (r < 0.0) != (b < 0.0) {
                    r + b
                } else {
                    r
                }
            }
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Pow => "**",
            Op::FloorDiv => "//",
            Op::Mod => "%",
        }
    }

    /// Combines two draws elementwise. A single-column operand is broadcast
    /// across the other's columns; any other disagreement is a shape error.
    pub(crate) fn combine(self, left: &Array2<f64>, right: &Array2<f64>) -> Result<Array2<f64>> {
        let rows = left.nrows().max(right.nrows());
        let cols = match (left.ncols(), right.ncols()) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => return Err(incompatible()),
        };
        let l = left.broadcast((rows, cols)).ok_or_else(incompatible)?;
        let r = right.broadcast((rows, cols)).ok_or_else(incompatible)?;
        Ok(Zip::from(&l).and(&r).map_collect(|&a, &b| self.eval(a, b)))
    }
}

pub(crate) fn incompatible() -> SamplerError {
    ShapeError::from_kind(ErrorKind::IncompatibleShape).into()
}

/// Weighted choice between two samplers.
pub struct Mixture {
    pub(crate) left: Box<Sampler>,
    pub(crate) right: Box<Sampler>,
    /// Normalized weight of `left`; `right` gets the complement.
    ratio: f64,
    rng: SmallRng,
}

impl Mixture {
    pub(crate) fn new(left: Sampler, right: Sampler) -> Self {
        let total = left.weight() + right.weight();
        let ratio = left.weight() / total;
        Self {
            left: Box::new(left),
            right: Box::new(right),
            ratio,
            rng: SmallRng::seed_from_u64(rand::thread_rng().gen::<u64>()),
        }
    }

    /// Normalized split `[left, right]`; sums to one.
    pub(crate) fn ratios(&self) -> [f64; 2] {
        [self.ratio, 1.0 - self.ratio]
    }

    pub(crate) fn reseed(&mut self, seeder: &mut SmallRng) {
        self.rng = SmallRng::seed_from_u64(seeder.gen());
        self.left.reseed(seeder);
        self.right.reseed(seeder);
    }

    /// Splits `size` binomially between the branches, draws each part,
    /// concatenates the rows and shuffles them.
    pub(crate) fn sample(&mut self, size: usize) -> Result<Array2<f64>> {
        let up_size = if size == 0 {
            0
        } else {
            let split = Binomial::new(size as u64, self.ratio).map_err(|e| {
                SamplerError::InvalidParameter {
                    distribution: "mixture".to_string(),
                    param: "weight".to_string(),
                    reason: e.to_string(),
                }
            })?;
            split.sample(&mut self.rng) as usize
        };
        let low_size = size - up_size;
        log::trace!("mixture split {size} rows into {up_size} + {low_size}");

        let up = self.left.sample(up_size)?;
        let low = self.right.sample(low_size)?;
        let rows = concatenate(Axis(0), &[up.view(), low.view()])?;

        let mut order: Vec<usize> = (0..size).collect();
        order.shuffle(&mut self.rng);
        Ok(rows.select(Axis(0), &order))
    }
}

/// Draws both samplers and joins the columns, `left` first.
pub(crate) fn stack(left: &mut Sampler, right: &mut Sampler, size: usize) -> Result<Array2<f64>> {
    let l = left.sample(size)?;
    let r = right.sample(size)?;
    Ok(concatenate(Axis(1), &[l.view(), r.view()])?)
}

/// Bounds for [`Sampler::truncate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncateOptions {
    /// Inclusive lower bound for every coordinate.
    pub low: Option<f64>,
    /// Inclusive upper bound for every coordinate.
    pub high: Option<f64>,
    /// Maximum number of draw rounds per `sample` call; unbounded if `None`.
    pub max_iters: Option<usize>,
    /// Smallest acceptable empirical share of accepted rows, over every row
    /// the truncated sampler has drawn so far. A share of zero turns the check
    /// off, which then requires `max_iters`.
    pub min_share: f64,
}

impl Default for TruncateOptions {
    fn default() -> Self {
        Self {
            low: None,
            high: None,
            max_iters: None,
            min_share: SMALL_SHARE,
        }
    }
}

impl TruncateOptions {
    pub fn between(low: f64, high: f64) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
            ..Self::default()
        }
    }

    fn accepts(&self, row: ndarray::ArrayView1<f64>) -> bool {
        row.iter().all(|&x| {
            self.low.map_or(true, |low| x >= low) && self.high.map_or(true, |high| x <= high)
        })
    }
}

/// Rejection sampler keeping only rows inside the bounds.
pub struct Truncate {
    pub(crate) inner: Box<Sampler>,
    options: TruncateOptions,
    accepted: usize,
    drawn: usize,
}

impl Truncate {
    pub(crate) fn new(inner: Sampler, options: TruncateOptions) -> Self {
        Self {
            inner: Box::new(inner),
            options,
            accepted: 0,
            drawn: 0,
        }
    }

    /// Empirical acceptance share over every row drawn so far.
    pub(crate) fn share(&self) -> Option<f64> {
        (self.drawn > 0).then(|| self.accepted as f64 / self.drawn as f64)
    }

    pub(crate) fn sample(&mut self, size: usize) -> Result<Array2<f64>> {
        if size == 0 {
            return self.inner.sample(0);
        }
        let min_share = self.options.min_share;
        if !(min_share >= 0.0) || (min_share == 0.0 && self.options.max_iters.is_none()) {
            return Err(invalid(
                "truncate",
                "min_share",
                format!("expected a positive share or a bound on max_iters, got {min_share}"),
            ));
        }
        let mut parts: Vec<Array2<f64>> = Vec::new();
        let mut kept = 0;
        let mut iters = 0;
        while kept < size {
            if let Some(max_iters) = self.options.max_iters {
                if iters >= max_iters {
                    return Err(SamplerError::MaxItersExceeded {
                        iters,
                        drawn: kept,
                        size,
                    });
                }
            }
            iters += 1;

            let remaining = size - kept;
            let share = self
                .share()
                .unwrap_or(1.0)
                .max(min_share)
                .max(MIN_BATCH_SHARE);
            let batch = ((remaining as f64 / share).ceil() as usize).max(MIN_TRUNCATION_BATCH);
            let draw = self.inner.sample(batch)?;
            let accepted: Vec<usize> = draw
                .axis_iter(Axis(0))
                .enumerate()
                .filter(|(_, row)| self.options.accepts(*row))
                .map(|(i, _)| i)
                .collect();

            self.drawn += draw.nrows();
            self.accepted += accepted.len();
            let share = self.accepted as f64 / self.drawn as f64;
            if share < min_share {
                return Err(SamplerError::Truncation {
                    share,
                    threshold: min_share,
                });
            }
            if share < 10.0 * min_share {
                log::warn!("truncation region accepts only {share:.4} of draws");
            }

            let take = accepted.len().min(remaining);
            parts.push(draw.select(Axis(0), &accepted[..take]));
            kept += take;
        }
        let views: Vec<ArrayView2<f64>> = parts.iter().map(|p| p.view()).collect();
        Ok(concatenate(Axis(0), &views)?)
    }
}
