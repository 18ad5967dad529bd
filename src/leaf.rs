/*!
Leaf samplers: one named distribution, its parameters and a private RNG.

Names are resolved through [`crate::aliases`] against [`Backend::Random`], so
both `"n"` and `"normal"` select the normal distribution. Parameters follow
the random backend's conventions (`loc`/`scale` for the normal, `low`/`high`
for the uniform, ...). Every leaf owns its own `SmallRng`, so draws are
independent across calls and across leaves.

# Examples

```rust
use mini_sampler::leaf::Leaf;
use mini_sampler::params::Params;

let mut normal = Leaf::new("n", Params::new().with("loc", 1.0).with("scale", 0.5))
    .unwrap()
    .set_seed(42);
let draws = normal.sample(100).unwrap();
assert_eq!(draws.shape(), &[100, 1]);
```
*/

use ndarray::{Array1, Array2, Axis};
use rand::distributions::{Uniform, WeightedIndex};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{
    Beta, Binomial, ChiSquared, Distribution, Exp, FisherF, Gamma, LogNormal, Normal, Poisson,
    StandardNormal, Weibull,
};

use crate::aliases::{resolve, Backend};
use crate::error::{Result, SamplerError};
use crate::params::{invalid, Param, Params};

/// A distribution with its parameters already validated.
#[derive(Debug, Clone)]
enum Family {
    Normal(Normal<f64>),
    Uniform(Uniform<f64>),
    Exponential(Exp<f64>),
    Gamma(Gamma<f64>),
    Beta(Beta<f64>),
    LogNormal(LogNormal<f64>),
    Poisson(Poisson<f64>),
    Binomial(Binomial),
    ChiSquared(ChiSquared<f64>),
    FisherF(FisherF<f64>),
    Weibull(Weibull<f64>),
    /// `chol` is the lower Cholesky factor of the covariance.
    MultivariateNormal {
        mean: Array1<f64>,
        chol: Array2<f64>,
    },
    /// `pvals` are normalized to sum to one.
    Multinomial { n: u64, pvals: Vec<f64> },
    Choice {
        values: Array1<f64>,
        weights: Option<WeightedIndex<f64>>,
    },
}

impl Family {
    fn build(name: &'static str, params: &Params) -> Result<Self> {
        let family = match name {
            "normal" => {
                let loc = params.float_or(name, "loc", 0.0)?;
                let scale = params.float_or(name, "scale", 1.0)?;
                Family::Normal(
                    Normal::new(loc, scale).map_err(|e| invalid(name, "scale", e.to_string()))?,
                )
            }
            "uniform" => {
                let low = params.float_or(name, "low", 0.0)?;
                let high = params.float_or(name, "high", 1.0)?;
                // `Uniform::new` panics on an empty range.
                if !(low < high) || !low.is_finite() || !high.is_finite() {
                    return Err(invalid(
                        name,
                        "high",
                        format!("expected finite low < high, got [{low}, {high})"),
                    ));
                }
                Family::Uniform(Uniform::new(low, high))
            }
            "exponential" => {
                let scale = params.float_or(name, "scale", 1.0)?;
                if scale <= 0.0 {
                    return Err(invalid(name, "scale", "must be positive"));
                }
                Family::Exponential(
                    Exp::new(1.0 / scale).map_err(|e| invalid(name, "scale", e.to_string()))?,
                )
            }
            "gamma" => {
                let shape = params.require_float(name, "shape")?;
                let scale = params.float_or(name, "scale", 1.0)?;
                Family::Gamma(
                    Gamma::new(shape, scale).map_err(|e| invalid(name, "shape", e.to_string()))?,
                )
            }
            "beta" => {
                let a = params.require_float(name, "a")?;
                let b = params.require_float(name, "b")?;
                Family::Beta(Beta::new(a, b).map_err(|e| invalid(name, "a", e.to_string()))?)
            }
            "lognormal" => {
                let mean = params.float_or(name, "mean", 0.0)?;
                let sigma = params.float_or(name, "sigma", 1.0)?;
                Family::LogNormal(
                    LogNormal::new(mean, sigma)
                        .map_err(|e| invalid(name, "sigma", e.to_string()))?,
                )
            }
            "poisson" => {
                let lam = params.float_or(name, "lam", 1.0)?;
                Family::Poisson(
                    Poisson::new(lam).map_err(|e| invalid(name, "lam", e.to_string()))?,
                )
            }
            "binomial" => {
                let n = params.require_count(name, "n")?;
                let p = params.require_float(name, "p")?;
                Family::Binomial(
                    Binomial::new(n, p).map_err(|e| invalid(name, "p", e.to_string()))?,
                )
            }
            "chisquare" => {
                let df = params.require_float(name, "df")?;
                Family::ChiSquared(
                    ChiSquared::new(df).map_err(|e| invalid(name, "df", e.to_string()))?,
                )
            }
            "f" => {
                let dfnum = params.require_float(name, "dfnum")?;
                let dfden = params.require_float(name, "dfden")?;
                Family::FisherF(
                    FisherF::new(dfnum, dfden)
                        .map_err(|e| invalid(name, "dfnum", e.to_string()))?,
                )
            }
            "weibull" => {
                let a = params.require_float(name, "a")?;
                Family::Weibull(
                    Weibull::new(1.0, a).map_err(|e| invalid(name, "a", e.to_string()))?,
                )
            }
            "multivariate_normal" => {
                let mean = params.require_vector(name, "mean")?;
                let cov = params.require_matrix(name, "cov")?;
                let chol = cholesky(name, &mean, &cov)?;
                Family::MultivariateNormal { mean, chol }
            }
            "multinomial" => {
                let n = params.require_count(name, "n")?;
                let pvals = params.require_vector(name, "pvals")?;
                let total: f64 = pvals.sum();
                if pvals.is_empty() || pvals.iter().any(|&p| p < 0.0) || !(total > 0.0) {
                    return Err(invalid(
                        name,
                        "pvals",
                        "expected non-empty, non-negative probabilities with positive sum",
                    ));
                }
                Family::Multinomial {
                    n,
                    pvals: pvals.iter().map(|p| p / total).collect(),
                }
            }
            "choice" => {
                let values = match params.get("a") {
                    Some(Param::Int(n)) if *n > 0 => Array1::range(0.0, *n as f64, 1.0),
                    Some(Param::Vector(v)) if !v.is_empty() => v.clone(),
                    Some(other) => {
                        return Err(invalid(
                            name,
                            "a",
                            format!("expected a positive count or non-empty vector, got {other:?}"),
                        ))
                    }
                    None => {
                        return Err(SamplerError::MissingParameter {
                            distribution: name,
                            param: "a",
                        })
                    }
                };
                let weights = match params.vector(name, "p")? {
                    Some(p) if p.len() != values.len() => {
                        return Err(invalid(
                            name,
                            "p",
                            format!("expected {} probabilities, got {}", values.len(), p.len()),
                        ))
                    }
                    Some(p) => Some(
                        WeightedIndex::new(p.iter().copied())
                            .map_err(|e| invalid(name, "p", e.to_string()))?,
                    ),
                    None => None,
                };
                Family::Choice { values, weights }
            }
            // Every name in the random backend's symbol table is handled above.
            other => {
                return Err(SamplerError::UnsupportedDistribution {
                    name: other.to_string(),
                    backend: Backend::Random,
                })
            }
        };
        if let Some(key) = params.keys().find(|k| *k != "seed" && !Self::keys(name).contains(k)) {
            return Err(invalid(
                name,
                key,
                format!("unknown parameter, expected one of {:?}", Self::keys(name)),
            ));
        }
        Ok(family)
    }

    /// Parameter names understood by each distribution.
    fn keys(name: &str) -> &'static [&'static str] {
        match name {
            "normal" => &["loc", "scale"],
            "uniform" => &["low", "high"],
            "exponential" => &["scale"],
            "gamma" => &["shape", "scale"],
            "beta" => &["a", "b"],
            "lognormal" => &["mean", "sigma"],
            "poisson" => &["lam"],
            "binomial" => &["n", "p"],
            "chisquare" => &["df"],
            "f" => &["dfnum", "dfden"],
            "weibull" => &["a"],
            "multivariate_normal" => &["mean", "cov"],
            "multinomial" => &["n", "pvals"],
            "choice" => &["a", "p"],
            _ => &[],
        }
    }

    fn sample(&self, rng: &mut SmallRng, size: usize) -> Result<Array2<f64>> {
        let draws = match self {
            Family::Normal(d) => column(d, rng, size),
            Family::Uniform(d) => column(d, rng, size),
            Family::Exponential(d) => column(d, rng, size),
            Family::Gamma(d) => column(d, rng, size),
            Family::Beta(d) => column(d, rng, size),
            Family::LogNormal(d) => column(d, rng, size),
            Family::Poisson(d) => column(d, rng, size),
            Family::Binomial(d) => Array2::from_shape_simple_fn((size, 1), || d.sample(rng) as f64),
            Family::ChiSquared(d) => column(d, rng, size),
            Family::FisherF(d) => column(d, rng, size),
            Family::Weibull(d) => column(d, rng, size),
            Family::MultivariateNormal { mean, chol } => {
                let z = Array2::<f64>::from_shape_simple_fn((size, mean.len()), || {
                    rng.sample(StandardNormal)
                });
                z.dot(&chol.t()) + mean
            }
            Family::Multinomial { n, pvals } => {
                let mut out = Array2::<f64>::zeros((size, pvals.len()));
                for mut row in out.axis_iter_mut(Axis(0)) {
                    let counts = multinomial_row(*n, pvals, rng)?;
                    row.iter_mut().zip(counts).for_each(|(x, c)| *x = c as f64);
                }
                out
            }
            Family::Choice { values, weights } => {
                Array2::from_shape_simple_fn((size, 1), || match weights {
                    Some(w) => values[w.sample(rng)],
                    None => values[rng.gen_range(0..values.len())],
                })
            }
        };
        Ok(draws)
    }
}

fn column<D: Distribution<f64>>(dist: &D, rng: &mut SmallRng, size: usize) -> Array2<f64> {
    Array2::from_shape_simple_fn((size, 1), || dist.sample(rng))
}

/// Draws one multinomial vector as a chain of conditional binomials.
fn multinomial_row(n: u64, pvals: &[f64], rng: &mut SmallRng) -> Result<Vec<u64>> {
    let mut counts = vec![0; pvals.len()];
    let mut left = n;
    let mut mass = 1.0;
    for (i, &p) in pvals.iter().enumerate() {
        if left == 0 {
            break;
        }
        if i + 1 == pvals.len() {
            counts[i] = left;
            break;
        }
        let cond = if mass > 0.0 { (p / mass).clamp(0.0, 1.0) } else { 1.0 };
        counts[i] = Binomial::new(left, cond)
            .map_err(|e| invalid("multinomial", "pvals", e.to_string()))?
            .sample(rng);
        left -= counts[i];
        mass -= p;
    }
    Ok(counts)
}

/// Lower Cholesky factor of `cov`, which must be a symmetric positive-definite
/// matrix matching the length of `mean`.
fn cholesky(name: &str, mean: &Array1<f64>, cov: &Array2<f64>) -> Result<Array2<f64>> {
    let k = mean.len();
    if k == 0 || cov.shape() != [k, k] {
        return Err(invalid(
            name,
            "cov",
            format!("expected a {k}x{k} matrix, got shape {:?}", cov.shape()),
        ));
    }
    let m = nalgebra::DMatrix::<f64>::from_fn(k, k, |i, j| cov[[i, j]]);
    let chol = nalgebra::Cholesky::new(m)
        .ok_or_else(|| invalid(name, "cov", "matrix is not positive definite"))?;
    let l = chol.l();
    Ok(Array2::from_shape_fn((k, k), |(i, j)| l[(i, j)]))
}

/// A sampler drawing from a single named distribution.
#[derive(Debug, Clone)]
pub struct Leaf {
    name: &'static str,
    params: Params,
    family: Family,
    seed: u64,
    rng: SmallRng,
}

impl Leaf {
    /// Resolves `name` against the random backend and validates `params`.
    ///
    /// Fails with [`crate::SamplerError::UnsupportedDistribution`] for unknown
    /// names; no sampler exists until resolution succeeds. Keys the
    /// distribution does not take are rejected, except `seed`, which seeds the
    /// leaf's RNG.
    pub fn new(name: &str, params: Params) -> Result<Self> {
        let resolved = resolve(name, Backend::Random)?;
        let name = Backend::Random
            .symbols()
            .iter()
            .copied()
            .find(|s| *s == resolved)
            .ok_or_else(|| SamplerError::UnsupportedDistribution {
                name: resolved.to_string(),
                backend: Backend::Random,
            })?;
        let family = Family::build(name, &params)?;
        let seed = match params.get("seed") {
            Some(_) => params.require_count(name, "seed")?,
            None => rand::thread_rng().gen::<u64>(),
        };
        log::debug!("leaf sampler `{name}` with params {:?}", params.keys().collect::<Vec<_>>());
        Ok(Self {
            name,
            params,
            family,
            seed,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// Returns this leaf with its RNG reseeded, for reproducible draws.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.reseed(seed);
        self
    }

    pub(crate) fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Canonical name of the distribution in the random backend.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draws `size` rows; univariate distributions yield a single column.
    pub fn sample(&mut self, size: usize) -> Result<Array2<f64>> {
        self.family.sample(&mut self.rng, size)
    }
}
