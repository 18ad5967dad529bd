/*!
Short aliases for distribution names and their resolution against backends.

Each backend names the same distribution differently (`normal` vs. `norm` vs.
`Normal`). The alias table maps a short code to the canonical name in every
backend that implements it; names not in the table are taken verbatim.

# Examples

```rust
use mini_sampler::aliases::{resolve, Backend};

assert_eq!(resolve("n", Backend::Random).unwrap(), "normal");
assert_eq!(resolve("n", Backend::Stats).unwrap(), "norm");
assert_eq!(resolve("gamma", Backend::Random).unwrap(), "gamma");
assert!(resolve("c", Backend::Tensor).is_err());
```
*/

use std::fmt;

use crate::error::{Result, SamplerError};

/// A family of numeric libraries a distribution name can be resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Core numeric random backend. Leaf samplers draw from this one.
    Random,
    /// General statistics backend.
    Stats,
    /// Probabilistic deep-learning backend.
    Tensor,
}

/// Alias, then canonical names for `Random`, `Stats` and `Tensor`.
const ALIASES: &[(&str, Option<&str>, Option<&str>, Option<&str>)] = &[
    ("n", Some("normal"), Some("norm"), Some("Normal")),
    ("u", Some("uniform"), Some("uniform"), Some("Uniform")),
    (
        "mvn",
        Some("multivariate_normal"),
        Some("multivariate_normal"),
        None,
    ),
    ("e", Some("exponential"), Some("expon"), Some("Exponential")),
    ("g", Some("gamma"), Some("gamma"), Some("Gamma")),
    ("be", Some("beta"), Some("beta"), Some("Beta")),
    (
        "mnm",
        Some("multinomial"),
        Some("multinomial"),
        Some("Multinomial"),
    ),
    ("f", Some("f"), Some("f"), None),
    ("p", Some("poisson"), Some("poisson"), None),
    ("w", Some("weibull"), Some("dweibull"), None),
    ("ln", Some("lognormal"), Some("lognorm"), None),
    ("b", Some("binomial"), Some("binom"), None),
    ("chi2", Some("chisquare"), Some("chi2"), None),
    ("c", Some("choice"), None, None),
];

const RANDOM_SYMBOLS: &[&str] = &[
    "normal",
    "uniform",
    "multivariate_normal",
    "exponential",
    "gamma",
    "beta",
    "multinomial",
    "f",
    "poisson",
    "weibull",
    "lognormal",
    "binomial",
    "chisquare",
    "choice",
];

const STATS_SYMBOLS: &[&str] = &[
    "norm",
    "uniform",
    "multivariate_normal",
    "expon",
    "gamma",
    "beta",
    "multinomial",
    "f",
    "poisson",
    "dweibull",
    "weibull_min",
    "lognorm",
    "binom",
    "chi2",
    "t",
    "cauchy",
];

const TENSOR_SYMBOLS: &[&str] = &[
    "Normal",
    "Uniform",
    "Exponential",
    "Gamma",
    "Beta",
    "Multinomial",
    "Bernoulli",
    "Categorical",
];

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Random, Backend::Stats, Backend::Tensor];

    /// Names of the distributions this backend implements.
    pub fn symbols(self) -> &'static [&'static str] {
        match self {
            Backend::Random => RANDOM_SYMBOLS,
            Backend::Stats => STATS_SYMBOLS,
            Backend::Tensor => TENSOR_SYMBOLS,
        }
    }

    /// Does this backend implement `name`?
    pub fn has(self, name: &str) -> bool {
        self.symbols().contains(&name)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = match self {
            Backend::Random => "random",
            Backend::Stats => "stats",
            Backend::Tensor => "tensor",
        };
        f.write_str(short)
    }
}

/// Looks up `alias` in the alias table. Returns `None` for unknown aliases and
/// `Some(None)` for aliases the backend has no entry for.
fn lookup(alias: &str, backend: Backend) -> Option<Option<&'static str>> {
    ALIASES
        .iter()
        .find(|(a, ..)| *a == alias)
        .map(|&(_, random, stats, tensor)| match backend {
            Backend::Random => random,
            Backend::Stats => stats,
            Backend::Tensor => tensor,
        })
}

/// Resolves an alias or full name into the canonical name used by `backend`.
///
/// Fails with [`SamplerError::UnsupportedDistribution`] if the alias has no
/// entry for `backend`, or if the resolved name is not implemented there.
pub fn resolve(name: &str, backend: Backend) -> Result<&str> {
    let unsupported = |name: &str| SamplerError::UnsupportedDistribution {
        name: name.to_string(),
        backend,
    };
    let fullname = match lookup(name, backend) {
        Some(Some(fullname)) => fullname,
        Some(None) => return Err(unsupported(name)),
        None => name,
    };
    if !backend.has(fullname) {
        return Err(unsupported(fullname));
    }
    Ok(fullname)
}
