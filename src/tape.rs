//! Append-only tape of reverse-pass closures.
//!
//! Each forward operation pushes one node holding a boxed closure that
//! captures arena handles by value. The reverse sweep visits nodes strictly
//! from last pushed to first pushed. Creation order already follows forward
//! dependencies, so reverse creation order is a valid reverse-topological
//! order; no reordering is ever attempted.

use tracing::{debug, warn};

use crate::arena::Arena;
use crate::config::TuningOptions;
use crate::error::AdError;
use crate::Float;

/// Boxed reverse-pass closure.
pub type ChainFn<F> = Box<dyn FnMut(&mut ChainContext<'_, F>) -> Result<(), AdError>>;

/// What a reverse closure sees while it runs.
pub struct ChainContext<'a, F: Float> {
    arena: &'a mut Arena<F>,
    tuning: TuningOptions,
}

impl<'a, F: Float> ChainContext<'a, F> {
    #[inline]
    pub fn arena(&self) -> &Arena<F> {
        self.arena
    }

    #[inline]
    pub fn arena_mut(&mut self) -> &mut Arena<F> {
        self.arena
    }

    /// Tuning snapshot taken when the reverse pass started.
    #[inline]
    pub fn tuning(&self) -> &TuningOptions {
        &self.tuning
    }
}

struct TapeNode<F: Float> {
    label: &'static str,
    chain: ChainFn<F>,
}

/// Strictly ordered sequence of reverse closures for one episode.
pub struct Tape<F: Float> {
    nodes: Vec<TapeNode<F>>,
}

impl<F: Float> Default for Tape<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> Tape<F> {
    /// Create an empty tape.
    pub fn new() -> Self {
        Tape { nodes: Vec::new() }
    }

    /// Append a node. `label` names the operation in errors and logs.
    #[inline]
    pub fn push(&mut self, label: &'static str, chain: ChainFn<F>) {
        self.nodes.push(TapeNode { label, chain });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node labels in push order.
    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.nodes.iter().map(|n| n.label)
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Run every node once, newest first.
    ///
    /// The first failing node aborts the sweep; adjoints touched before the
    /// failure are left as they are and must not be trusted. The tape itself
    /// is not cleared.
    pub fn run_reverse(&mut self, arena: &mut Arena<F>, tuning: TuningOptions) -> Result<(), AdError> {
        debug!(nodes = self.nodes.len(), "tape: reverse pass start");
        let mut ctx = ChainContext { arena, tuning };

        for (index, node) in self.nodes.iter_mut().enumerate().rev() {
            if let Err(source) = (node.chain)(&mut ctx) {
                warn!(index, label = node.label, error = %source, "tape: reverse node failed");
                return Err(AdError::ReverseAborted {
                    index,
                    label: node.label,
                    source: Box::new(source),
                });
            }
        }

        debug!("tape: reverse pass complete");
        Ok(())
    }
}
