//! Operator syntax for building sampler trees.
//!
//! | expression | result |
//! |---|---|
//! | `a \| b` | mixture weighted by `a.weight()` and `b.weight()` |
//! | `a & b` | `a`'s columns followed by `b`'s |
//! | `a & 2.0` | `a` with its weight doubled |
//! | `a + b`, `a - b`, `a * b`, `a / b`, `a % b` | elementwise arithmetic |
//!
//! Arithmetic accepts `f64` on either side; the scalar becomes a constant
//! sampler. Power and floor division are the methods [`Sampler::pow`] and
//! [`Sampler::floor_div`].

use std::ops::{Add, BitAnd, BitOr, Div, Mul, Rem, Sub};

use crate::combinators::Op;
use crate::sampler::Sampler;

impl BitOr for Sampler {
    type Output = Sampler;

    fn bitor(self, rhs: Sampler) -> Sampler {
        Sampler::mixture(self, rhs)
    }
}

impl BitAnd for Sampler {
    type Output = Sampler;

    fn bitand(self, rhs: Sampler) -> Sampler {
        Sampler::stack(self, rhs)
    }
}

impl BitAnd<f64> for Sampler {
    type Output = Sampler;

    fn bitand(self, rhs: f64) -> Sampler {
        self.reweight(rhs)
    }
}

macro_rules! arithmetic {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Sampler>> $trait<R> for Sampler {
            type Output = Sampler;

            fn $method(self, rhs: R) -> Sampler {
                Sampler::arithmetic($op, self, rhs.into())
            }
        }

        impl $trait<Sampler> for f64 {
            type Output = Sampler;

            fn $method(self, rhs: Sampler) -> Sampler {
                Sampler::arithmetic($op, Sampler::constant(self), rhs)
            }
        }
    };
}

arithmetic!(Add, add, Op::Add);
arithmetic!(Sub, sub, Op::Sub);
arithmetic!(Mul, mul, Op::Mul);
arithmetic!(Div, div, Op::Div);
arithmetic!(Rem, rem, Op::Mod);
