//! One differentiation episode: arena, tape, and the thread-local binding
//! that lets forward operations find them.
//!
//! An episode is bound to the current thread only for the duration of
//! [`Episode::record`]. Outside that window the episode is an ordinary value
//! and every query goes through `&self`/`&mut self`.

use std::cell::Cell;
use std::marker::PhantomData;

use tracing::debug;

use crate::arena::{Arena, ArenaSlice};
use crate::config::{EpisodeConfig, TuningOptions};
use crate::error::AdError;
use crate::tape::{ChainContext, Tape};
use crate::var::{Adjointable, ScalarFloat, Var};
use crate::Float;

// ══════════════════════════════════════════════
//  Thread-local binding
// ══════════════════════════════════════════════

thread_local! {
    static EPISODE_F32: Cell<*mut Episode<f32>> = const { Cell::new(std::ptr::null_mut()) };
    static EPISODE_F64: Cell<*mut Episode<f64>> = const { Cell::new(std::ptr::null_mut()) };
    static BORROWED_F32: Cell<bool> = const { Cell::new(false) };
    static BORROWED_F64: Cell<bool> = const { Cell::new(false) };
}

/// Selects the thread-local slots holding the active episode for a float type.
pub trait EpisodeLocal: Float {
    fn cell() -> &'static std::thread::LocalKey<Cell<*mut Episode<Self>>>;

    /// Set while [`with_active_episode`] lends out the active episode.
    fn borrowed() -> &'static std::thread::LocalKey<Cell<bool>>;
}

impl EpisodeLocal for f32 {
    fn cell() -> &'static std::thread::LocalKey<Cell<*mut Episode<Self>>> {
        &EPISODE_F32
    }

    fn borrowed() -> &'static std::thread::LocalKey<Cell<bool>> {
        &BORROWED_F32
    }
}

impl EpisodeLocal for f64 {
    fn cell() -> &'static std::thread::LocalKey<Cell<*mut Episode<Self>>> {
        &EPISODE_F64
    }

    fn borrowed() -> &'static std::thread::LocalKey<Cell<bool>> {
        &BORROWED_F64
    }
}

/// Whether an episode is recording on this thread.
pub fn is_recording<F: EpisodeLocal>() -> bool {
    F::cell().with(|cell| !cell.get().is_null())
}

/// Access the episode recording on this thread.
///
/// # Panics
///
/// Panics if no episode is recording, or if called again from inside `f`
/// for the same episode. Inside `f`, use the `_in` forms that take the
/// episode explicitly.
#[inline]
pub fn with_active_episode<F: EpisodeLocal, R>(f: impl FnOnce(&mut Episode<F>) -> R) -> R {
    let ptr = F::cell().with(Cell::get);
    assert!(
        !ptr.is_null(),
        "no active episode; build forward values inside Episode::record"
    );
    let _borrow = ActiveBorrow::<F>::acquire();
    // SAFETY: the pointer was installed by an `EpisodeGuard` whose `record`
    // call holds the only `&mut Episode` for its whole lifetime, and the guard
    // clears it before that borrow ends. `ActiveBorrow` rules out a second
    // reference handed out by a nested call on this thread.
    let episode = unsafe { &mut *ptr };
    f(episode)
}

/// Marks the active episode as lent out until dropped.
struct ActiveBorrow<F: EpisodeLocal> {
    _marker: PhantomData<F>,
}

impl<F: EpisodeLocal> ActiveBorrow<F> {
    fn acquire() -> Self {
        let already = F::borrowed().with(|flag| flag.replace(true));
        assert!(
            !already,
            "active episode is already borrowed; use the `_in` forms inside with_active_episode"
        );
        ActiveBorrow { _marker: PhantomData }
    }
}

impl<F: EpisodeLocal> Drop for ActiveBorrow<F> {
    fn drop(&mut self) {
        F::borrowed().with(|flag| flag.set(false));
    }
}

/// RAII binding of an episode to the current thread. Restores the previously
/// bound episode, and whether it was lent out, on drop, so bindings nest.
pub(crate) struct EpisodeGuard<F: EpisodeLocal> {
    prev: *mut Episode<F>,
    prev_borrowed: bool,
}

impl<F: EpisodeLocal> EpisodeGuard<F> {
    pub(crate) fn new(episode: &mut Episode<F>) -> Self {
        let prev = F::cell().with(|cell| cell.replace(episode as *mut Episode<F>));
        let prev_borrowed = F::borrowed().with(|flag| flag.replace(false));
        EpisodeGuard { prev, prev_borrowed }
    }
}

impl<F: EpisodeLocal> Drop for EpisodeGuard<F> {
    fn drop(&mut self) {
        F::cell().with(|cell| cell.set(self.prev));
        F::borrowed().with(|flag| flag.set(self.prev_borrowed));
    }
}

// ══════════════════════════════════════════════
//  Episode
// ══════════════════════════════════════════════

/// Owns everything created between two resets: the arena, the tape of
/// reverse closures, and the adjoint storage of every variable.
pub struct Episode<F: Float> {
    arena: Arena<F>,
    tape: Tape<F>,
    adjoints: Vec<ArenaSlice<F>>,
    config: EpisodeConfig,
}

impl<F: Float> Default for Episode<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> Episode<F> {
    pub fn new() -> Self {
        Self::with_config(EpisodeConfig::default())
    }

    pub fn with_config(config: EpisodeConfig) -> Self {
        Episode {
            arena: Arena::with_config(config.arena),
            tape: Tape::new(),
            adjoints: Vec::new(),
            config,
        }
    }

    #[inline]
    pub fn arena(&self) -> &Arena<F> {
        &self.arena
    }

    #[inline]
    pub fn arena_mut(&mut self) -> &mut Arena<F> {
        &mut self.arena
    }

    #[inline]
    pub fn tape(&self) -> &Tape<F> {
        &self.tape
    }

    #[inline]
    pub fn tape_len(&self) -> usize {
        self.tape.len()
    }

    #[inline]
    pub fn config(&self) -> &EpisodeConfig {
        &self.config
    }

    #[inline]
    pub fn tuning(&self) -> &TuningOptions {
        &self.config.tuning
    }

    /// Replace the tuning knobs. Takes effect at the next reverse pass.
    pub fn set_tuning(&mut self, tuning: TuningOptions) {
        self.config.tuning = tuning;
    }

    /// Number of variables whose adjoints this episode tracks.
    #[inline]
    pub fn num_vars(&self) -> usize {
        self.adjoints.len()
    }

    pub(crate) fn register_adjoint(&mut self, adjoint: ArenaSlice<F>) {
        self.adjoints.push(adjoint);
    }

    /// Append a reverse closure to the tape.
    ///
    /// The closure may capture only arena handles and plain data: anything it
    /// refers to must outlive the episode's next reset.
    pub fn schedule_reverse(
        &mut self,
        label: &'static str,
        chain: impl FnMut(&mut ChainContext<'_, F>) -> Result<(), AdError> + 'static,
    ) {
        self.tape.push(label, Box::new(chain));
    }

    /// Run every scheduled closure once, newest first.
    ///
    /// Tuning options are read once here and stay fixed for the whole pass.
    pub fn run_reverse_pass(&mut self) -> Result<(), AdError> {
        let tuning = self.config.tuning;
        self.tape.run_reverse(&mut self.arena, tuning)
    }

    /// Zero the adjoint of every variable, leaving values and tape intact.
    pub fn set_zero_all_adjoints(&mut self) {
        debug!(vars = self.adjoints.len(), "episode: zero adjoints");
        for &slot in &self.adjoints {
            self.arena.slice_mut(slot).fill(F::zero());
        }
    }

    /// Drop the tape and reclaim all arena storage.
    ///
    /// Every `Var` and arena handle created in this episode becomes invalid.
    pub fn reset(&mut self) {
        self.tape.clear();
        self.adjoints.clear();
        self.arena.reset();
    }

    /// Logical value of `var`.
    pub fn value<T: Adjointable<Float = F>>(&self, var: &Var<T>) -> T {
        T::read_value(&var.value, &self.arena)
    }

    /// Logical adjoint of `var`.
    pub fn adjoint<T: Adjointable<Float = F>>(&self, var: &Var<T>) -> T {
        T::read_adjoint(&var.adjoint, &self.arena)
    }
}

impl<F: EpisodeLocal> Episode<F> {
    /// Bind this episode to the current thread while `forward` runs.
    ///
    /// Forward operations inside `forward` allocate from this episode and
    /// append to its tape. The previous binding, if any, is restored when
    /// `forward` returns or unwinds.
    pub fn record<R>(&mut self, forward: impl FnOnce() -> R) -> R {
        let _guard = EpisodeGuard::new(self);
        forward()
    }
}

impl<F: ScalarFloat> Episode<F> {
    /// Seed `output`'s adjoint with one and run the reverse pass.
    pub fn grad(&mut self, output: &Var<F>) -> Result<(), AdError> {
        self.arena.set(output.adjoint, 0, F::one());
        self.run_reverse_pass()
    }
}
