//! Episode-scoped region allocator.
//!
//! Storage lives in chunked `Vec<F>` buffers and callers hold small `Copy`
//! handles (`chunk`, `offset`, `len`) instead of references. Nothing is freed
//! individually; [`Arena::reset`] releases every allocation at once and keeps
//! the chunk capacity for the next episode.
//!
//! Every handle carries the arena generation it was issued in. Using a handle
//! after `reset()` trips a debug assertion.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use tracing::{debug, trace};

use crate::config::ArenaConfig;
use crate::error::AdError;
use crate::Float;

/// Handle to a contiguous run of `len` scalars in an [`Arena`].
pub struct ArenaSlice<F> {
    chunk: u32,
    generation: u32,
    offset: usize,
    len: usize,
    _marker: PhantomData<fn() -> F>,
}

impl<F> ArenaSlice<F> {
    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Arena generation this handle was issued in.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<F> Clone for ArenaSlice<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for ArenaSlice<F> {}

impl<F> PartialEq for ArenaSlice<F> {
    fn eq(&self, other: &Self) -> bool {
        self.chunk == other.chunk
            && self.generation == other.generation
            && self.offset == other.offset
            && self.len == other.len
    }
}

impl<F> Eq for ArenaSlice<F> {}

impl<F> fmt::Debug for ArenaSlice<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaSlice")
            .field("chunk", &self.chunk)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Handle to an object owned by an [`Arena`] until the next reset.
///
/// Objects stored this way take part in teardown: they are dropped by
/// `reset()`, not by the handle.
pub struct ArenaBox<T> {
    index: usize,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ArenaBox<T> {
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T> Clone for ArenaBox<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArenaBox<T> {}

impl<T> fmt::Debug for ArenaBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaBox")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Bump allocator whose allocations all live until the next [`reset`](Arena::reset).
///
/// Not internally synchronized: one arena belongs to one episode on one thread.
pub struct Arena<F: Float> {
    chunks: Vec<Vec<F>>,
    current: usize,
    chunk_size: usize,
    max_elements: Option<usize>,
    in_use: usize,
    live: usize,
    generation: u32,
    objects: Vec<Box<dyn Any>>,
}

impl<F: Float> Default for Arena<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> Arena<F> {
    /// Create an empty arena with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::default())
    }

    /// Create an empty arena. No chunk is allocated until first use.
    pub fn with_config(config: ArenaConfig) -> Self {
        Arena {
            chunks: Vec::new(),
            current: 0,
            chunk_size: config.chunk_size.max(1),
            max_elements: config.max_elements,
            in_use: 0,
            live: 0,
            generation: 0,
            objects: Vec::new(),
        }
    }

    /// Allocate `len` zeroed elements.
    ///
    /// # Panics
    ///
    /// Panics if the configured element limit is exceeded. Exhaustion is fatal
    /// for the episode; use [`try_allocate`](Arena::try_allocate) to observe it.
    #[inline]
    pub fn allocate(&mut self, len: usize) -> ArenaSlice<F> {
        match self.try_allocate(len) {
            Ok(slice) => slice,
            Err(e) => panic!("{e}"),
        }
    }

    /// Allocate `len` zeroed elements, reporting exhaustion as an error.
    pub fn try_allocate(&mut self, len: usize) -> Result<ArenaSlice<F>, AdError> {
        if let Some(limit) = self.max_elements {
            if self.in_use + len > limit {
                return Err(AdError::ArenaExhausted {
                    requested: len,
                    in_use: self.in_use,
                    limit,
                });
            }
        }

        loop {
            match self.chunks.get(self.current) {
                Some(chunk) if chunk.capacity() - chunk.len() >= len => break,
                Some(_) => self.current += 1,
                None => {
                    let capacity = self.chunk_size.max(len);
                    trace!(
                        chunk = self.chunks.len(),
                        capacity,
                        "arena: growing by one chunk"
                    );
                    self.chunks.push(Vec::with_capacity(capacity));
                    break;
                }
            }
        }

        let chunk = &mut self.chunks[self.current];
        let offset = chunk.len();
        // Within capacity: never reallocates, so earlier chunks stay put.
        chunk.resize(offset + len, F::zero());
        self.in_use += len;
        self.live += 1;

        Ok(ArenaSlice {
            chunk: self.current as u32,
            generation: self.generation,
            offset,
            len,
            _marker: PhantomData,
        })
    }

    /// Allocate and copy `values` in.
    pub fn alloc_from_slice(&mut self, values: &[F]) -> ArenaSlice<F> {
        let slice = self.allocate(values.len());
        self.slice_mut(slice).copy_from_slice(values);
        slice
    }

    /// Hand an object to the arena. It is dropped on the next `reset()`.
    pub fn store_object<T: 'static>(&mut self, value: T) -> ArenaBox<T> {
        let index = self.objects.len();
        self.objects.push(Box::new(value));
        self.live += 1;
        ArenaBox {
            index,
            generation: self.generation,
            _marker: PhantomData,
        }
    }

    /// Borrow an arena-owned object.
    pub fn object<T: 'static>(&self, handle: ArenaBox<T>) -> &T {
        self.check_generation(handle.generation);
        self.objects[handle.index]
            .downcast_ref::<T>()
            .expect("arena object handle does not match its stored type")
    }

    /// Mutably borrow an arena-owned object.
    pub fn object_mut<T: 'static>(&mut self, handle: ArenaBox<T>) -> &mut T {
        self.check_generation(handle.generation);
        self.objects[handle.index]
            .downcast_mut::<T>()
            .expect("arena object handle does not match its stored type")
    }

    #[inline]
    pub fn slice(&self, handle: ArenaSlice<F>) -> &[F] {
        self.check_generation(handle.generation);
        &self.chunks[handle.chunk as usize][handle.offset..handle.offset + handle.len]
    }

    #[inline]
    pub fn slice_mut(&mut self, handle: ArenaSlice<F>) -> &mut [F] {
        self.check_generation(handle.generation);
        &mut self.chunks[handle.chunk as usize][handle.offset..handle.offset + handle.len]
    }

    #[inline]
    pub fn get(&self, handle: ArenaSlice<F>, i: usize) -> F {
        self.slice(handle)[i]
    }

    #[inline]
    pub fn set(&mut self, handle: ArenaSlice<F>, i: usize, value: F) {
        self.slice_mut(handle)[i] = value;
    }

    /// `handle[i] += value`.
    #[inline]
    pub fn add_at(&mut self, handle: ArenaSlice<F>, i: usize, value: F) {
        let s = self.slice_mut(handle);
        s[i] = s[i] + value;
    }

    /// Elementwise `dst += values`.
    pub fn accumulate(&mut self, dst: ArenaSlice<F>, values: &[F]) {
        let d = self.slice_mut(dst);
        assert_eq!(d.len(), values.len(), "accumulate: length mismatch");
        for (d, &v) in d.iter_mut().zip(values) {
            *d = *d + v;
        }
    }

    /// Borrow two distinct allocations mutably at once.
    ///
    /// # Panics
    ///
    /// Panics if the two handles overlap.
    pub fn split_mut(&mut self, a: ArenaSlice<F>, b: ArenaSlice<F>) -> (&mut [F], &mut [F]) {
        self.check_generation(a.generation);
        self.check_generation(b.generation);
        let (ac, bc) = (a.chunk as usize, b.chunk as usize);

        if ac == bc {
            let chunk = &mut self.chunks[ac];
            if a.offset + a.len <= b.offset {
                let (lo, hi) = chunk.split_at_mut(b.offset);
                (&mut lo[a.offset..a.offset + a.len], &mut hi[..b.len])
            } else {
                assert!(
                    b.offset + b.len <= a.offset,
                    "split_mut: overlapping arena slices"
                );
                let (lo, hi) = chunk.split_at_mut(a.offset);
                (&mut hi[..a.len], &mut lo[b.offset..b.offset + b.len])
            }
        } else if ac < bc {
            let (lo, hi) = self.chunks.split_at_mut(bc);
            (
                &mut lo[ac][a.offset..a.offset + a.len],
                &mut hi[0][b.offset..b.offset + b.len],
            )
        } else {
            let (lo, hi) = self.chunks.split_at_mut(ac);
            (
                &mut hi[0][a.offset..a.offset + a.len],
                &mut lo[bc][b.offset..b.offset + b.len],
            )
        }
    }

    /// Release every allocation and drop every stored object.
    ///
    /// All handles issued before this call become invalid. Chunk capacity is
    /// kept for reuse.
    pub fn reset(&mut self) {
        debug!(
            allocations = self.live,
            elements = self.in_use,
            chunks = self.chunks.len(),
            objects = self.objects.len(),
            "arena: reset"
        );
        for chunk in &mut self.chunks {
            chunk.clear();
        }
        self.objects.clear();
        self.current = 0;
        self.in_use = 0;
        self.live = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Allocations (slices and objects) made since the last reset.
    #[inline]
    pub fn live_allocations(&self) -> usize {
        self.live
    }

    /// Scalar elements handed out since the last reset.
    #[inline]
    pub fn elements_in_use(&self) -> usize {
        self.in_use
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Total scalar capacity across all chunks.
    pub fn capacity(&self) -> usize {
        self.chunks.iter().map(Vec::capacity).sum()
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    fn check_generation(&self, generation: u32) {
        debug_assert_eq!(
            generation, self.generation,
            "arena handle used after reset (issued in generation {generation}, arena is at {})",
            self.generation
        );
    }
}
