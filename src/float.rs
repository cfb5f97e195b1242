use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FromPrimitive};

/// Marker trait for the primitive floating-point types an episode can run on.
///
/// Bundles the numeric and utility traits needed by the arena, the tape and
/// the reverse closures. Only `f32` and `f64` implement this; `Var<T>` does not.
pub trait Float:
    NumFloat
    + FromPrimitive
    + Copy
    + Send
    + Sync
    + Default
    + Debug
    + Display
    + 'static
{
}

impl Float for f32 {}
impl Float for f64 {}
