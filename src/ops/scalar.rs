use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use super::{record_binary, record_unary};
use crate::var::{ScalarFloat, Var};

// ──────────────────────────────────────────────
//  Var<F> with Var<F>
// ──────────────────────────────────────────────

impl<F: ScalarFloat> Add for Var<F> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        record_binary("add", self, rhs, self.value + rhs.value, F::one(), F::one())
    }
}

impl<F: ScalarFloat> Sub for Var<F> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        record_binary("sub", self, rhs, self.value - rhs.value, F::one(), -F::one())
    }
}

impl<F: ScalarFloat> Mul for Var<F> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        record_binary("mul", self, rhs, self.value * rhs.value, rhs.value, self.value)
    }
}

impl<F: ScalarFloat> Div for Var<F> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let inv = F::one() / rhs.value;
        let value = self.value * inv;
        record_binary("div", self, rhs, value, inv, -value * inv)
    }
}

impl<F: ScalarFloat> Neg for Var<F> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        record_unary("neg", self, -self.value, -F::one())
    }
}

impl<F: ScalarFloat> AddAssign for Var<F> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<F: ScalarFloat> SubAssign for Var<F> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<F: ScalarFloat> MulAssign for Var<F> {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl<F: ScalarFloat> DivAssign for Var<F> {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

// Mixed ops: Var<F> with primitive floats.
macro_rules! impl_var_scalar_ops {
    ($f:ty) => {
        impl Add<$f> for Var<$f> {
            type Output = Var<$f>;
            #[inline]
            fn add(self, rhs: $f) -> Var<$f> {
                record_unary("add", self, self.value + rhs, 1.0)
            }
        }

        impl Add<Var<$f>> for $f {
            type Output = Var<$f>;
            #[inline]
            fn add(self, rhs: Var<$f>) -> Var<$f> {
                record_unary("add", rhs, self + rhs.value, 1.0)
            }
        }

        impl Sub<$f> for Var<$f> {
            type Output = Var<$f>;
            #[inline]
            fn sub(self, rhs: $f) -> Var<$f> {
                record_unary("sub", self, self.value - rhs, 1.0)
            }
        }

        impl Sub<Var<$f>> for $f {
            type Output = Var<$f>;
            #[inline]
            fn sub(self, rhs: Var<$f>) -> Var<$f> {
                record_unary("sub", rhs, self - rhs.value, -1.0)
            }
        }

        impl Mul<$f> for Var<$f> {
            type Output = Var<$f>;
            #[inline]
            fn mul(self, rhs: $f) -> Var<$f> {
                record_unary("mul", self, self.value * rhs, rhs)
            }
        }

        impl Mul<Var<$f>> for $f {
            type Output = Var<$f>;
            #[inline]
            fn mul(self, rhs: Var<$f>) -> Var<$f> {
                record_unary("mul", rhs, self * rhs.value, self)
            }
        }

        impl Div<$f> for Var<$f> {
            type Output = Var<$f>;
            #[inline]
            fn div(self, rhs: $f) -> Var<$f> {
                let inv: $f = 1.0 / rhs;
                record_unary("div", self, self.value * inv, inv)
            }
        }

        impl Div<Var<$f>> for $f {
            type Output = Var<$f>;
            #[inline]
            fn div(self, rhs: Var<$f>) -> Var<$f> {
                let inv: $f = 1.0 / rhs.value;
                let value = self * inv;
                record_unary("div", rhs, value, -value * inv)
            }
        }

        impl AddAssign<$f> for Var<$f> {
            #[inline]
            fn add_assign(&mut self, rhs: $f) {
                *self = *self + rhs;
            }
        }

        impl SubAssign<$f> for Var<$f> {
            #[inline]
            fn sub_assign(&mut self, rhs: $f) {
                *self = *self - rhs;
            }
        }

        impl MulAssign<$f> for Var<$f> {
            #[inline]
            fn mul_assign(&mut self, rhs: $f) {
                *self = *self * rhs;
            }
        }

        impl DivAssign<$f> for Var<$f> {
            #[inline]
            fn div_assign(&mut self, rhs: $f) {
                *self = *self / rhs;
            }
        }
    };
}

impl_var_scalar_ops!(f32);
impl_var_scalar_ops!(f64);
