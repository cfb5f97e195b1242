use std::fmt::{self, Display};

use nalgebra::{DMatrix, DVector};

use crate::arena::{Arena, ArenaSlice};
use crate::arena_type::{ArenaMatrix, ArenaType};
use crate::episode::{with_active_episode, Episode, EpisodeLocal};

/// A logical value type that can be differentiated.
///
/// Fixes the arena-resident form of the value and of its adjoint, and how
/// to allocate, zero and read them back.
pub trait Adjointable: Sized + 'static {
    type Float: EpisodeLocal;
    /// Arena form of the value.
    type Value: Copy + 'static;
    /// Arena form of the adjoint. Always backed by arena storage.
    type Adjoint: Copy + 'static;

    fn store_value(self, arena: &mut Arena<Self::Float>) -> Self::Value;

    /// Allocate a zero adjoint matching `value`.
    fn zero_adjoint(value: &Self::Value, arena: &mut Arena<Self::Float>) -> Self::Adjoint;

    /// Storage backing `adjoint`.
    fn adjoint_storage(adjoint: &Self::Adjoint) -> ArenaSlice<Self::Float>;

    fn read_value(value: &Self::Value, arena: &Arena<Self::Float>) -> Self;

    fn read_adjoint(adjoint: &Self::Adjoint, arena: &Arena<Self::Float>) -> Self;
}

/// Scalar float usable as a differentiable value: stores its value inline
/// and its adjoint in a one-element arena slice.
pub trait ScalarFloat:
    EpisodeLocal + Adjointable<Float = Self, Value = Self, Adjoint = ArenaSlice<Self>>
{
}

/// Scalar float that nalgebra's dense factorizations accept.
pub trait MatrixFloat: ScalarFloat + nalgebra::RealField {}

macro_rules! impl_scalar_adjointable {
    ($($f:ty),*) => {
        $(
            impl Adjointable for $f {
                type Float = $f;
                type Value = $f;
                type Adjoint = ArenaSlice<$f>;

                #[inline]
                fn store_value(self, _arena: &mut Arena<$f>) -> $f {
                    self
                }

                #[inline]
                fn zero_adjoint(_value: &$f, arena: &mut Arena<$f>) -> ArenaSlice<$f> {
                    arena.allocate(1)
                }

                #[inline]
                fn adjoint_storage(adjoint: &ArenaSlice<$f>) -> ArenaSlice<$f> {
                    *adjoint
                }

                #[inline]
                fn read_value(value: &$f, _arena: &Arena<$f>) -> $f {
                    *value
                }

                #[inline]
                fn read_adjoint(adjoint: &ArenaSlice<$f>, arena: &Arena<$f>) -> $f {
                    arena.get(*adjoint, 0)
                }
            }

            impl ScalarFloat for $f {}
            impl MatrixFloat for $f {}
        )*
    };
}

impl_scalar_adjointable!(f32, f64);

impl<F: EpisodeLocal> Adjointable for DMatrix<F> {
    type Float = F;
    type Value = ArenaMatrix<F>;
    type Adjoint = ArenaMatrix<F>;

    fn store_value(self, arena: &mut Arena<F>) -> ArenaMatrix<F> {
        self.into_arena(arena)
    }

    fn zero_adjoint(value: &ArenaMatrix<F>, arena: &mut Arena<F>) -> ArenaMatrix<F> {
        value.zeros_like(arena)
    }

    fn adjoint_storage(adjoint: &ArenaMatrix<F>) -> ArenaSlice<F> {
        adjoint.data()
    }

    fn read_value(value: &ArenaMatrix<F>, arena: &Arena<F>) -> Self {
        value.to_matrix(arena)
    }

    fn read_adjoint(adjoint: &ArenaMatrix<F>, arena: &Arena<F>) -> Self {
        adjoint.to_matrix(arena)
    }
}

impl<F: EpisodeLocal> Adjointable for DVector<F> {
    type Float = F;
    type Value = ArenaMatrix<F>;
    type Adjoint = ArenaMatrix<F>;

    fn store_value(self, arena: &mut Arena<F>) -> ArenaMatrix<F> {
        self.into_arena(arena)
    }

    fn zero_adjoint(value: &ArenaMatrix<F>, arena: &mut Arena<F>) -> ArenaMatrix<F> {
        value.zeros_like(arena)
    }

    fn adjoint_storage(adjoint: &ArenaMatrix<F>) -> ArenaSlice<F> {
        adjoint.data()
    }

    fn read_value(value: &ArenaMatrix<F>, arena: &Arena<F>) -> Self {
        DVector::from_column_slice(arena.slice(value.data()))
    }

    fn read_adjoint(adjoint: &ArenaMatrix<F>, arena: &Arena<F>) -> Self {
        DVector::from_column_slice(arena.slice(adjoint.data()))
    }
}

/// Reverse-mode variable: a value paired with an adjoint accumulator.
///
/// Both halves are arena handles (or an inline scalar), so a `Var` is `Copy`
/// and can be captured by value in reverse closures. It is only meaningful
/// inside the episode that created it, and only until that episode resets.
pub struct Var<T: Adjointable> {
    pub(crate) value: T::Value,
    pub(crate) adjoint: T::Adjoint,
}

impl<T: Adjointable> Clone for Var<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Adjointable> Copy for Var<T> {}

impl<T: Adjointable> fmt::Debug for Var<T>
where
    T::Value: fmt::Debug,
    T::Adjoint: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("value", &self.value)
            .field("adjoint", &self.adjoint)
            .finish()
    }
}

impl<T: Adjointable> Var<T> {
    /// Create an independent variable in the episode recording on this thread.
    ///
    /// # Panics
    ///
    /// Panics outside [`Episode::record`].
    pub fn new(value: T) -> Self {
        with_active_episode(|ep| Self::new_in(value, ep))
    }

    /// Create a variable in `episode` with a zero adjoint.
    pub fn new_in(value: T, episode: &mut Episode<T::Float>) -> Self {
        let arena = episode.arena_mut();
        let value = value.store_value(arena);
        let adjoint = T::zero_adjoint(&value, arena);
        episode.register_adjoint(T::adjoint_storage(&adjoint));
        Var { value, adjoint }
    }

    /// Arena form of the value.
    #[inline]
    pub fn value(&self) -> T::Value {
        self.value
    }

    /// Arena form of the adjoint.
    #[inline]
    pub fn adjoint(&self) -> T::Adjoint {
        self.adjoint
    }
}

impl<F: ScalarFloat> Var<F> {
    /// Forward value.
    #[inline]
    pub fn val(&self) -> F {
        self.value
    }

    /// Accumulated adjoint, read from the owning episode.
    #[inline]
    pub fn adj(&self, episode: &Episode<F>) -> F {
        episode.arena().get(self.adjoint, 0)
    }
}

impl<F: EpisodeLocal> Var<DMatrix<F>> {
    #[inline]
    pub fn rows(&self) -> usize {
        self.value.rows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.value.cols()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.value.shape()
    }

    pub fn value_matrix(&self, episode: &Episode<F>) -> DMatrix<F> {
        self.value.to_matrix(episode.arena())
    }

    pub fn adjoint_matrix(&self, episode: &Episode<F>) -> DMatrix<F> {
        self.adjoint.to_matrix(episode.arena())
    }
}

impl<F: EpisodeLocal> Var<DVector<F>> {
    #[inline]
    pub fn len(&self) -> usize {
        self.value.rows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.rows() == 0
    }
}

impl<F: ScalarFloat> Display for Var<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
