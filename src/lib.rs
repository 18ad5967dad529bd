//! # mini-sampler
//!
//! Composable random samplers. Leaves draw from named distributions; the
//! operators `|` (weighted mixture), `&` (column stack, or reweighting with a
//! scalar) and `+ - * / %` (elementwise arithmetic) combine them into trees
//! that are only evaluated when [`Sampler::sample`] is called.
//!
//! ```rust
//! use mini_sampler::{Params, Sampler, TruncateOptions};
//!
//! let noise = Sampler::leaf("n", Params::new().with("scale", 0.1).with("dim", 2)).unwrap();
//! let centre = Sampler::constant_row(vec![1.0, -1.0]);
//! let jittered = (centre + noise).truncate(TruncateOptions::between(-2.0, 2.0));
//!
//! let draws = jittered.set_seed(3).sample(256).unwrap();
//! assert_eq!(draws.shape(), &[256, 2]);
//! ```

pub mod aliases;
pub mod combinators;
pub mod error;
pub mod leaf;
mod ops;
pub mod params;
pub mod sampler;

pub use aliases::{resolve, Backend};
pub use combinators::{Op, TruncateOptions, SMALL_SHARE};
pub use error::{Result, SamplerError};
pub use leaf::Leaf;
pub use params::{Param, Params};
pub use sampler::{Sample, Sampler};
