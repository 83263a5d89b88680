//! Fixed 16x16 tile chunks and sparse chunk layers.

use glam::IVec2;
use thiserror::Error;

use crate::{CHUNK_WIDTH, ChunkExt};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// Out-of-bounds access inside a chunk. Invariant violation: callers
    /// must propagate, not recover.
    #[error("chunk access out of bounds: ({x},{y})")]
    OutOfBounds { x: i32, y: i32 },
}

/// A 16x16 grid of `T`, addressed by chunk-relative coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<T> {
    tiles: Vec<T>,
}

impl<T: Clone> Chunk<T> {
    pub fn filled(fill: T) -> Self {
        Self {
            tiles: vec![fill; (CHUNK_WIDTH * CHUNK_WIDTH) as usize],
        }
    }

    fn index(x: i32, y: i32) -> Result<usize, GridError> {
        if x < 0 || y < 0 || x >= CHUNK_WIDTH || y >= CHUNK_WIDTH {
            return Err(GridError::OutOfBounds { x, y });
        }
        Ok((y * CHUNK_WIDTH + x) as usize)
    }

    pub fn get(&self, x: i32, y: i32) -> Result<&T, GridError> {
        Ok(&self.tiles[Self::index(x, y)?])
    }

    pub fn set(&mut self, x: i32, y: i32, value: T) -> Result<(), GridError> {
        let i = Self::index(x, y)?;
        self.tiles[i] = value;
        Ok(())
    }
}

/// Sparse mapping from chunk key to `Chunk<T>` with a `fill` default.
///
/// Absolute tile coordinates are translated to (chunk, relative) pairs; a
/// missing chunk reads as the fill value and is only materialized on write.
#[derive(Debug, Clone)]
pub struct Layer<T> {
    pub fill: T,
    chunks: Vec<(String, Chunk<T>)>,
}

impl<T: Clone> Layer<T> {
    pub fn new(fill: T) -> Self {
        Self {
            fill,
            chunks: Vec::new(),
        }
    }

    fn relative(p: IVec2) -> (i32, i32) {
        (p.x.rem_euclid(CHUNK_WIDTH), p.y.rem_euclid(CHUNK_WIDTH))
    }

    pub fn chunk(&self, key: &str) -> Option<&Chunk<T>> {
        self.chunks.iter().find(|(k, _)| k == key).map(|(_, c)| c)
    }

    /// Read the tile at absolute coordinates; missing chunks yield the fill.
    pub fn get_tile(&self, p: IVec2) -> T {
        let (rx, ry) = Self::relative(p);
        match self.chunk(&p.chunk_key()) {
            // Relative coords are in range by construction.
            Some(c) => c.get(rx, ry).cloned().unwrap_or_else(|_| self.fill.clone()),
            None => self.fill.clone(),
        }
    }

    /// Write the tile at absolute coordinates, materializing the chunk.
    pub fn set_tile(&mut self, p: IVec2, value: T) {
        let key = p.chunk_key();
        let (rx, ry) = Self::relative(p);
        let fill = self.fill.clone();
        let chunk = match self.chunks.iter_mut().find(|(k, _)| *k == key) {
            Some((_, c)) => c,
            None => {
                self.chunks.push((key, Chunk::filled(fill)));
                &mut self.chunks.last_mut().expect("just pushed").1
            }
        };
        let _ = chunk.set(rx, ry, value);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}
