//! Type-level mapping from logical values to their arena-resident form.
//!
//! [`ArenaType`] is resolved entirely at compile time: each logical type names
//! the representation a reverse closure may capture by value.
//!
//! | logical type                       | arena form                    |
//! |------------------------------------|-------------------------------|
//! | already arena resident             | itself                        |
//! | `bool`, integers, `f32`, `f64`     | itself                        |
//! | `Vec<U>`                           | `ArenaSeq<U::Repr>`           |
//! | `DMatrix<F>` / `DVector<F>`        | [`ArenaMatrix<F>`]            |
//! | types declared with [`arena_chainable!`] | [`ArenaBox<T>`]          |
//!
//! Every representation is `Copy` and has no destructor; storage is reclaimed
//! by [`Arena::reset`]. A type with no mapping simply fails to compile.

use std::fmt;

use nalgebra::{DMatrix, DMatrixView, DMatrixViewMut, DVector, Dyn, Matrix, Storage};

use crate::arena::{Arena, ArenaBox, ArenaSlice};
use crate::error::AdError;
use crate::Float;

/// Map a logical value type onto storage owned by an [`Arena`].
pub trait ArenaType<F: Float> {
    /// Arena-resident representation. Cheap to copy into reverse closures.
    type Repr: ArenaResident;

    /// Move `self` into the arena.
    fn into_arena(self, arena: &mut Arena<F>) -> Self::Repr;
}

/// Shorthand for the arena form of `T`.
pub type ArenaT<F, T> = <T as ArenaType<F>>::Repr;

/// Explicit opt-in for representations a reverse closure may capture.
///
/// Every [`ArenaType::Repr`] must implement this. Plain-data types opt in
/// through [`arena_passthrough!`]; arena handles implement it here and map
/// to themselves.
pub trait ArenaResident: Copy + 'static {}

/// Map `Copy` types onto themselves.
///
/// ```
/// #[derive(Clone, Copy)]
/// struct Knot { t: f64, w: f64 }
/// revarena::arena_passthrough!(Knot);
/// ```
#[macro_export]
macro_rules! arena_passthrough {
    ($($t:ty),* $(,)?) => {
        $(
            impl $crate::arena_type::ArenaResident for $t {}

            impl<F: $crate::Float> $crate::arena_type::ArenaType<F> for $t {
                type Repr = $t;
                #[inline]
                fn into_arena(self, _arena: &mut $crate::arena::Arena<F>) -> $t {
                    self
                }
            }
        )*
    };
}

/// Map types with a destructor onto an arena-owned box dropped at reset.
#[macro_export]
macro_rules! arena_chainable {
    ($($t:ty),* $(,)?) => {
        $(
            impl<F: $crate::Float> $crate::arena_type::ArenaType<F> for $t {
                type Repr = $crate::arena::ArenaBox<$t>;
                #[inline]
                fn into_arena(self, arena: &mut $crate::arena::Arena<F>) -> Self::Repr {
                    arena.store_object(self)
                }
            }
        )*
    };
}

// Handles already live in an arena: resident, and their own representation.
macro_rules! resident_handles {
    ($($name:ident<$p:ident $(: $bound:ident)?>),* $(,)?) => {
        $(
            impl<$p: $($bound +)? 'static> ArenaResident for $name<$p> {}

            impl<F: Float, $p: $($bound +)? 'static> ArenaType<F> for $name<$p> {
                type Repr = Self;
                #[inline]
                fn into_arena(self, _arena: &mut Arena<F>) -> Self {
                    self
                }
            }
        )*
    };
}

arena_passthrough!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

resident_handles!(ArenaBox<T>, ArenaSlice<G>, ArenaSeq<T: Copy>, ArenaMatrix<G>);

impl<F: Float, U: ArenaType<F>> ArenaType<F> for Vec<U> {
    type Repr = ArenaSeq<U::Repr>;

    fn into_arena(self, arena: &mut Arena<F>) -> Self::Repr {
        let items: Vec<U::Repr> = self.into_iter().map(|u| u.into_arena(arena)).collect();
        arena.store_seq(items)
    }
}

impl<F: Float> ArenaType<F> for DMatrix<F> {
    type Repr = ArenaMatrix<F>;

    fn into_arena(self, arena: &mut Arena<F>) -> ArenaMatrix<F> {
        ArenaMatrix {
            data: arena.alloc_from_slice(self.as_slice()),
            rows: self.nrows(),
            cols: self.ncols(),
        }
    }
}

impl<F: Float> ArenaType<F> for DVector<F> {
    type Repr = ArenaMatrix<F>;

    fn into_arena(self, arena: &mut Arena<F>) -> ArenaMatrix<F> {
        ArenaMatrix {
            data: arena.alloc_from_slice(self.as_slice()),
            rows: self.len(),
            cols: 1,
        }
    }
}

// ══════════════════════════════════════════════
//  ArenaSeq
// ══════════════════════════════════════════════

/// Ordered sequence whose element storage is owned by an [`Arena`].
pub struct ArenaSeq<T> {
    items: ArenaBox<Vec<T>>,
    len: usize,
}

impl<T> Clone for ArenaSeq<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArenaSeq<T> {}

impl<T> fmt::Debug for ArenaSeq<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaSeq")
            .field("items", &self.items)
            .field("len", &self.len)
            .finish()
    }
}

impl<T: Copy + 'static> ArenaSeq<T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice<'a, F: Float>(&self, arena: &'a Arena<F>) -> &'a [T] {
        arena.object(self.items).as_slice()
    }

    pub fn get<F: Float>(&self, arena: &Arena<F>, i: usize) -> T {
        self.as_slice(arena)[i]
    }
}

impl<F: Float> Arena<F> {
    /// Hand a sequence of arena-resident items to the arena.
    pub fn store_seq<T: Copy + 'static>(&mut self, items: Vec<T>) -> ArenaSeq<T> {
        let len = items.len();
        ArenaSeq {
            items: self.store_object(items),
            len,
        }
    }
}

// ══════════════════════════════════════════════
//  ArenaMatrix
// ══════════════════════════════════════════════

/// Dense column-major matrix whose buffer lives in an [`Arena`].
///
/// Dropping the handle frees nothing.
pub struct ArenaMatrix<F> {
    data: ArenaSlice<F>,
    rows: usize,
    cols: usize,
}

impl<F> Clone for ArenaMatrix<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for ArenaMatrix<F> {}

impl<F> fmt::Debug for ArenaMatrix<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaMatrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("data", &self.data)
            .finish()
    }
}

impl<F> ArenaMatrix<F> {
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Underlying buffer, column-major.
    #[inline]
    pub fn data(&self) -> ArenaSlice<F> {
        self.data
    }
}

impl<F: Float> ArenaMatrix<F> {
    /// Zero-filled `rows x cols` matrix.
    pub fn zeros(rows: usize, cols: usize, arena: &mut Arena<F>) -> Self {
        ArenaMatrix {
            data: arena.allocate(rows * cols),
            rows,
            cols,
        }
    }

    /// [`zeros`](ArenaMatrix::zeros) that reports exhaustion instead of panicking.
    pub fn try_zeros(rows: usize, cols: usize, arena: &mut Arena<F>) -> Result<Self, AdError> {
        Ok(ArenaMatrix {
            data: arena.try_allocate(rows * cols)?,
            rows,
            cols,
        })
    }

    /// Copy any dense matrix or view into the arena.
    pub fn from_matrix<S: Storage<F, Dyn, Dyn>>(m: &Matrix<F, Dyn, Dyn, S>, arena: &mut Arena<F>) -> Self {
        let out = Self::zeros(m.nrows(), m.ncols(), arena);
        for (d, &s) in arena.slice_mut(out.data).iter_mut().zip(m.iter()) {
            *d = s;
        }
        out
    }

    /// Zero-filled matrix of the same shape.
    pub fn zeros_like(&self, arena: &mut Arena<F>) -> Self {
        Self::zeros(self.rows, self.cols, arena)
    }

    pub fn view<'a>(&self, arena: &'a Arena<F>) -> DMatrixView<'a, F> {
        DMatrixView::from_slice(arena.slice(self.data), self.rows, self.cols)
    }

    pub fn view_mut<'a>(&self, arena: &'a mut Arena<F>) -> DMatrixViewMut<'a, F> {
        DMatrixViewMut::from_slice(arena.slice_mut(self.data), self.rows, self.cols)
    }

    /// Copy out to an owned matrix.
    pub fn to_matrix(&self, arena: &Arena<F>) -> DMatrix<F> {
        DMatrix::from_column_slice(self.rows, self.cols, arena.slice(self.data))
    }
}
