//! Keyword parameters of a named distribution.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};

use crate::error::{Result, SamplerError};

/// A single distribution parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Float(f64),
    Int(i64),
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
}

impl From<f64> for Param {
    fn from(x: f64) -> Self {
        Param::Float(x)
    }
}

impl From<i64> for Param {
    fn from(x: i64) -> Self {
        Param::Int(x)
    }
}

impl From<i32> for Param {
    fn from(x: i32) -> Self {
        Param::Int(x as i64)
    }
}

impl From<usize> for Param {
    fn from(x: usize) -> Self {
        Param::Int(x as i64)
    }
}

impl From<Vec<f64>> for Param {
    fn from(x: Vec<f64>) -> Self {
        Param::Vector(Array1::from(x))
    }
}

impl From<Array1<f64>> for Param {
    fn from(x: Array1<f64>) -> Self {
        Param::Vector(x)
    }
}

impl From<Array2<f64>> for Param {
    fn from(x: Array2<f64>) -> Self {
        Param::Matrix(x)
    }
}

/// Named parameters, kept by value and handed to the distribution unchanged.
///
/// ```rust
/// use mini_sampler::params::Params;
///
/// let params = Params::new().with("loc", 1.0).with("scale", 2.0);
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, Param>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a parameter and returns the updated map.
    pub fn with(mut self, key: &str, value: impl Into<Param>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// The same parameters without `key`.
    pub fn without(mut self, key: &str) -> Self {
        self.values.remove(key);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Param> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Reads a scalar, accepting integers where floats are expected.
    pub(crate) fn float(&self, dist: &'static str, key: &'static str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Param::Float(x)) => Ok(Some(*x)),
            Some(Param::Int(x)) => Ok(Some(*x as f64)),
            Some(other) => Err(invalid(dist, key, format!("expected a scalar, got {other:?}"))),
        }
    }

    pub(crate) fn float_or(
        &self,
        dist: &'static str,
        key: &'static str,
        default: f64,
    ) -> Result<f64> {
        Ok(self.float(dist, key)?.unwrap_or(default))
    }

    pub(crate) fn require_float(&self, dist: &'static str, key: &'static str) -> Result<f64> {
        self.float(dist, key)?.ok_or(SamplerError::MissingParameter {
            distribution: dist,
            param: key,
        })
    }

    /// Reads a non-negative integer count.
    pub(crate) fn require_count(&self, dist: &'static str, key: &'static str) -> Result<u64> {
        match self.get(key) {
            Some(Param::Int(n)) if *n >= 0 => Ok(*n as u64),
            Some(Param::Float(x)) if *x >= 0.0 && x.fract() == 0.0 => Ok(*x as u64),
            Some(other) => Err(invalid(
                dist,
                key,
                format!("expected a non-negative integer, got {other:?}"),
            )),
            None => Err(SamplerError::MissingParameter {
                distribution: dist,
                param: key,
            }),
        }
    }

    pub(crate) fn vector(
        &self,
        dist: &'static str,
        key: &'static str,
    ) -> Result<Option<Array1<f64>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Param::Vector(v)) => Ok(Some(v.clone())),
            Some(other) => Err(invalid(dist, key, format!("expected a vector, got {other:?}"))),
        }
    }

    pub(crate) fn require_vector(
        &self,
        dist: &'static str,
        key: &'static str,
    ) -> Result<Array1<f64>> {
        self.vector(dist, key)?.ok_or(SamplerError::MissingParameter {
            distribution: dist,
            param: key,
        })
    }

    pub(crate) fn require_matrix(
        &self,
        dist: &'static str,
        key: &'static str,
    ) -> Result<Array2<f64>> {
        match self.get(key) {
            Some(Param::Matrix(m)) => Ok(m.clone()),
            Some(other) => Err(invalid(dist, key, format!("expected a matrix, got {other:?}"))),
            None => Err(SamplerError::MissingParameter {
                distribution: dist,
                param: key,
            }),
        }
    }
}

pub(crate) fn invalid(dist: &str, key: &str, reason: impl Into<String>) -> SamplerError {
    SamplerError::InvalidParameter {
        distribution: dist.to_string(),
        param: key.to_string(),
        reason: reason.into(),
    }
}
