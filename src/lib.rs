//! Reverse-mode automatic differentiation on an arena and a closure tape.
//!
//! Every value created while an [`Episode`] is recording lives in that
//! episode's [`Arena`]. Every operation schedules one reverse closure on the
//! episode's tape; the reverse pass runs them newest first. Resetting the
//! episode reclaims everything at once.
//!
//! ```
//! use revarena::{Episode, Var};
//!
//! let mut ep: Episode<f64> = Episode::new();
//! let (x, y) = ep.record(|| {
//!     let x = Var::new(2.0_f64);
//!     (x, x * x.sin())
//! });
//! ep.grad(&y).unwrap();
//! let expected = 2.0_f64.sin() + 2.0 * 2.0_f64.cos();
//! assert!((ep.adjoint(&x) - expected).abs() < 1e-12);
//! ```

pub mod api;
pub mod arena;
pub mod arena_type;
pub mod callback;
pub mod check;
pub mod cholesky;
pub mod config;
pub mod dispatch;
pub mod episode;
pub mod error;
pub mod float;
pub mod linalg;
pub mod ops;
pub mod tape;
pub mod var;

pub use api::{grad, grad_matrix, jacobian, vjp};
pub use arena::{Arena, ArenaBox, ArenaSlice};
pub use arena_type::{ArenaMatrix, ArenaResident, ArenaSeq, ArenaT, ArenaType};
pub use callback::{make_callback_var, make_callback_var_in, reverse_pass_callback};
pub use cholesky::{cholesky_decompose, cholesky_decompose_in};
pub use config::{ArenaConfig, EpisodeConfig, TuningOptions};
pub use episode::{with_active_episode, Episode, EpisodeLocal};
pub use error::{AdError, ErrorKind};
pub use float::Float;
pub use tape::{ChainContext, Tape};
pub use var::{Adjointable, MatrixFloat, ScalarFloat, Var};

/// Scalar reverse-mode variable over `f64`.
pub type Var64 = Var<f64>;
/// Scalar reverse-mode variable over `f32`.
pub type Var32 = Var<f32>;
/// Matrix reverse-mode variable over `f64`.
pub type MatrixVar64 = Var<nalgebra::DMatrix<f64>>;
