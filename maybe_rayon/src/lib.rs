//! Parallel iteration that degrades to plain iterators when the `parallel` feature is off.
//!
//! Callers import everything from this crate (`use zkstark_maybe_rayon::*;`) and write
//! `par_iter`, `into_par_iter` or `par_chunks_mut` unconditionally.

#[cfg(not(feature = "parallel"))]
use std::{
    iter::{IntoIterator, Iterator},
    slice::{Chunks, ChunksMut},
};

#[cfg(feature = "parallel")]
pub use rayon::prelude::{IndexedParallelIterator, ParallelExtend, ParallelIterator};
#[cfg(feature = "parallel")]
use rayon::{
    prelude::*,
    slice::{Chunks as ParChunks, ChunksMut as ParChunksMut, ParallelSlice, ParallelSliceMut},
};

pub trait MaybeParIter<'data> {
    #[cfg(feature = "parallel")]
    type Item: Send + 'data;

    #[cfg(feature = "parallel")]
    type Iter: ParallelIterator<Item = Self::Item>;

    #[cfg(not(feature = "parallel"))]
    type Item;

    #[cfg(not(feature = "parallel"))]
    type Iter: Iterator<Item = Self::Item>;

    fn par_iter(&'data self) -> Self::Iter;
}

#[cfg(feature = "parallel")]
impl<'data, T> MaybeParIter<'data> for T
where
    T: ?Sized + IntoParallelRefIterator<'data>,
{
    type Item = T::Item;
    type Iter = T::Iter;

    fn par_iter(&'data self) -> Self::Iter {
        self.par_iter()
    }
}

#[cfg(not(feature = "parallel"))]
impl<'data, T: 'data> MaybeParIter<'data> for Vec<T> {
    type Item = &'data T;
    type Iter = std::slice::Iter<'data, T>;

    fn par_iter(&'data self) -> Self::Iter {
        self.iter()
    }
}

#[cfg(not(feature = "parallel"))]
impl<'data, T: 'data> MaybeParIter<'data> for [T] {
    type Item = &'data T;
    type Iter = std::slice::Iter<'data, T>;

    fn par_iter(&'data self) -> Self::Iter {
        self.iter()
    }
}

pub trait MaybeIntoParIter {
    #[cfg(feature = "parallel")]
    type Item: Send;

    #[cfg(feature = "parallel")]
    type Iter: ParallelIterator<Item = Self::Item>;

    #[cfg(not(feature = "parallel"))]
    type Item;

    #[cfg(not(feature = "parallel"))]
    type Iter: Iterator<Item = Self::Item>;

    fn into_par_iter(self) -> Self::Iter;
}

#[cfg(feature = "parallel")]
impl<T> MaybeIntoParIter for T
where
    T: IntoParallelIterator,
{
    type Item = T::Item;
    type Iter = T::Iter;

    fn into_par_iter(self) -> Self::Iter {
        self.into_par_iter()
    }
}

#[cfg(not(feature = "parallel"))]
impl<T> MaybeIntoParIter for T
where
    T: IntoIterator,
{
    type Item = T::Item;
    type Iter = T::IntoIter;

    fn into_par_iter(self) -> Self::Iter {
        self.into_iter()
    }
}

#[cfg(feature = "parallel")]
pub trait MaybeParChunks<T: Sync> {
    fn par_chunks(&self, chunk_size: usize) -> ParChunks<'_, T>;
}

#[cfg(not(feature = "parallel"))]
pub trait MaybeParChunks<T> {
    fn par_chunks(&self, chunk_size: usize) -> Chunks<'_, T>;
}

#[cfg(feature = "parallel")]
impl<T: ParallelSlice<U> + ?Sized, U: Sync> MaybeParChunks<U> for T {
    fn par_chunks(&self, chunk_size: usize) -> ParChunks<'_, U> {
        self.par_chunks(chunk_size)
    }
}

#[cfg(not(feature = "parallel"))]
impl<T> MaybeParChunks<T> for [T] {
    fn par_chunks(&self, chunk_size: usize) -> Chunks<'_, T> {
        self.chunks(chunk_size)
    }
}

#[cfg(feature = "parallel")]
pub trait MaybeParChunksMut<T: Send> {
    fn par_chunks_mut(&mut self, chunk_size: usize) -> ParChunksMut<'_, T>;
}

#[cfg(not(feature = "parallel"))]
pub trait MaybeParChunksMut<T: Send> {
    fn par_chunks_mut(&mut self, chunk_size: usize) -> ChunksMut<'_, T>;
}

#[cfg(feature = "parallel")]
impl<T: ?Sized + ParallelSliceMut<U>, U: Send> MaybeParChunksMut<U> for T {
    fn par_chunks_mut(&mut self, chunk_size: usize) -> ParChunksMut<'_, U> {
        self.par_chunks_mut(chunk_size)
    }
}

#[cfg(not(feature = "parallel"))]
impl<T: Send> MaybeParChunksMut<T> for [T] {
    fn par_chunks_mut(&mut self, chunk_size: usize) -> ChunksMut<'_, T> {
        self.chunks_mut(chunk_size)
    }
}

/// Number of worker threads available to parallel iterators; 1 without the `parallel` feature.
pub fn current_num_threads() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

/// Chunk length for sharding `len` items across workers.
///
/// Inputs of at most `threshold` items form a single chunk, so the work stays on the calling
/// thread. Larger inputs are split roughly evenly across workers, with no chunk shorter than
/// `threshold`.
pub fn shard_len(len: usize, threshold: usize) -> usize {
    if len <= threshold {
        return len.max(1);
    }
    let per_worker = (len + current_num_threads() - 1) / current_num_threads();
    per_worker.max(threshold)
}

#[cfg(test)]
mod tests {
    #[cfg(feature = "parallel")]
    use rayon::iter::ParallelIterator;

    use super::{current_num_threads, shard_len, MaybeParChunks};

    #[test]
    fn small_inputs_are_one_chunk() {
        assert_eq!(shard_len(0, 1000), 1);
        assert_eq!(shard_len(999, 1000), 999);
        assert_eq!(shard_len(1000, 1000), 1000);
    }

    #[test]
    fn large_inputs_respect_threshold() {
        let len = 1 << 16;
        let chunk = shard_len(len, 1000);
        assert!(chunk >= 1000);
        assert!(chunk <= len);
        let chunks = (len + chunk - 1) / chunk;
        assert!(chunks <= current_num_threads().max(1));
    }

    #[test]
    fn chunks_cover_input() {
        let data: Vec<u64> = (0..5000).collect();
        let total: u64 = MaybeParChunks::par_chunks(data.as_slice(), shard_len(data.len(), 1000))
            .map(|c| c.iter().sum::<u64>())
            .sum();
        assert_eq!(total, data.iter().sum::<u64>());
    }
}
