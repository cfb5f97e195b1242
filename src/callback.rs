//! Entry points for user-defined reverse rules.

use crate::episode::{with_active_episode, Episode, EpisodeLocal};
use crate::error::AdError;
use crate::tape::ChainContext;
use crate::var::{Adjointable, Var};

/// Schedule `chain` on the tape of the episode recording on this thread.
///
/// `chain` runs exactly once per reverse pass, after every node scheduled
/// later than it.
pub fn reverse_pass_callback<F: EpisodeLocal>(
    label: &'static str,
    chain: impl FnMut(&mut ChainContext<'_, F>) -> Result<(), AdError> + 'static,
) {
    with_active_episode(|ep: &mut Episode<F>| ep.schedule_reverse(label, chain));
}

/// Create a fresh output variable holding `value` and schedule `chain`, which
/// receives that variable when the reverse pass reaches it.
///
/// ```
/// use revarena::{make_callback_var, Episode, Var};
///
/// let mut ep: Episode<f64> = Episode::new();
/// let (x, y) = ep.record(|| {
///     let x = Var::new(3.0_f64);
///     let y = make_callback_var(x.val() * x.val(), "square", move |ctx, out: &Var<f64>| {
///         let g = ctx.arena().get(out.adjoint(), 0);
///         ctx.arena_mut().add_at(x.adjoint(), 0, 2.0 * x.val() * g);
///         Ok(())
///     });
///     (x, y)
/// });
/// ep.grad(&y).unwrap();
/// assert_eq!(ep.adjoint(&x), 6.0);
/// ```
pub fn make_callback_var<T: Adjointable>(
    value: T,
    label: &'static str,
    chain: impl FnMut(&mut ChainContext<'_, T::Float>, &Var<T>) -> Result<(), AdError> + 'static,
) -> Var<T> {
    with_active_episode(|ep| make_callback_var_in(ep, value, label, chain))
}

/// [`make_callback_var`] against an explicit episode.
pub fn make_callback_var_in<T: Adjointable>(
    episode: &mut Episode<T::Float>,
    value: T,
    label: &'static str,
    mut chain: impl FnMut(&mut ChainContext<'_, T::Float>, &Var<T>) -> Result<(), AdError> + 'static,
) -> Var<T> {
    let out = Var::new_in(value, episode);
    episode.schedule_reverse(label, move |ctx| chain(ctx, &out));
    out
}
