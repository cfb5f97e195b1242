//! Episode configuration: arena sizing and reverse-pass tuning knobs.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest block size the blocked reverse kernels will use.
pub const MIN_BLOCK_SIZE: usize = 8;

/// Arena sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ArenaConfig {
    /// Elements per chunk. Requests larger than this get a dedicated chunk.
    pub chunk_size: usize,
    /// Upper bound on elements in use at once. `None` means unbounded.
    pub max_elements: Option<usize>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        ArenaConfig {
            chunk_size: 1 << 16,
            max_elements: None,
        }
    }
}

/// Tuning knobs read once at the start of every reverse pass.
///
/// These only trade working-set size against kernel dispatch overhead; they
/// never change results beyond rounding. Non-positive values are treated as
/// [`MIN_BLOCK_SIZE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TuningOptions {
    /// Upper bound on the Cholesky reverse block size.
    pub cholesky_rev_min_block_size: i64,
    /// Rows are divided by this to get the preferred block size.
    pub cholesky_rev_block_partition: i64,
}

impl Default for TuningOptions {
    fn default() -> Self {
        TuningOptions {
            cholesky_rev_min_block_size: 512,
            cholesky_rev_block_partition: 8,
        }
    }
}

impl TuningOptions {
    /// Block size for the Cholesky reverse pass over a `rows`-by-`rows` factor:
    /// `max(8, min(min_block_size, rows / block_partition))`.
    ///
    /// The result may exceed `rows`; the blocked sweep clips its first block
    /// at row zero.
    pub fn cholesky_rev_block_size(&self, rows: usize) -> usize {
        let min_block = clamp_tuning(self.cholesky_rev_min_block_size);
        let partition = clamp_tuning(self.cholesky_rev_block_partition);
        MIN_BLOCK_SIZE.max(min_block.min(rows / partition))
    }
}

fn clamp_tuning(value: i64) -> usize {
    if value < 1 {
        MIN_BLOCK_SIZE
    } else {
        usize::try_from(value).unwrap_or(usize::MAX)
    }
}

/// Full configuration of one [`Episode`](crate::Episode).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EpisodeConfig {
    pub arena: ArenaConfig,
    pub tuning: TuningOptions,
}
