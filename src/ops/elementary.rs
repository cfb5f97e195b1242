//! Elementary functions of a scalar [`Var`].

use super::record_unary;
use crate::callback::make_callback_var;
use crate::var::{ScalarFloat, Var};
use crate::Float;

/// Logistic sigmoid `1 / (1 + exp(-x))`, evaluated without overflow.
pub fn inv_logit<F: Float>(x: F) -> F {
    if x < F::zero() {
        let e = x.exp();
        e / (F::one() + e)
    } else {
        F::one() / (F::one() + (-x).exp())
    }
}

/// `ln(inv_logit(x))`, evaluated without overflow.
pub fn log_inv_logit<F: Float>(x: F) -> F {
    if x < F::zero() {
        x - x.exp().ln_1p()
    } else {
        -(-x).exp().ln_1p()
    }
}

impl<F: ScalarFloat> Var<F> {
    pub fn exp(self) -> Self {
        let e = self.value.exp();
        record_unary("exp", self, e, e)
    }

    pub fn ln(self) -> Self {
        record_unary("ln", self, self.value.ln(), F::one() / self.value)
    }

    pub fn sqrt(self) -> Self {
        let s = self.value.sqrt();
        let two = F::one() + F::one();
        record_unary("sqrt", self, s, F::one() / (two * s))
    }

    pub fn sin(self) -> Self {
        record_unary("sin", self, self.value.sin(), self.value.cos())
    }

    pub fn cos(self) -> Self {
        record_unary("cos", self, self.value.cos(), -self.value.sin())
    }

    pub fn powi(self, n: i32) -> Self {
        let d = if n == 0 {
            F::zero()
        } else {
            F::from_i32(n).unwrap_or_else(F::nan) * self.value.powi(n - 1)
        };
        record_unary("powi", self, self.value.powi(n), d)
    }

    pub fn inv_logit(self) -> Self {
        let s = inv_logit(self.value);
        record_unary("inv_logit", self, s, s * (F::one() - s))
    }

    /// `ln(inv_logit(self))`; the adjoint rule is `u.adj += out.adj * inv_logit(-u)`.
    pub fn log_inv_logit(self) -> Self {
        let u = self;
        make_callback_var(log_inv_logit(u.value), "log_inv_logit", move |ctx, out: &Var<F>| {
            let g = ctx.arena().get(out.adjoint, 0);
            ctx.arena_mut().add_at(u.adjoint, 0, g * inv_logit(-u.value));
            Ok(())
        })
    }
}
