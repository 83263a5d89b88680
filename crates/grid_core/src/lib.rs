//! `grid_core`: integer tile/chunk coordinate math and sparse tile storage.
//!
//! Tiles live on an unbounded 2D integer grid (`glam::IVec2`). Chunks are
//! fixed 16x16 blocks and are the unit of spatial indexing and view
//! tracking; chunk-space coordinates are `floor(tile / 16)`.

pub mod chunk;

pub use chunk::{Chunk, GridError, Layer};

use glam::IVec2;

/// Width (and height) of a chunk in tiles.
pub const CHUNK_WIDTH: i32 = 16;

/// Tile-coordinate helpers on `IVec2`.
pub trait ChunkExt {
    /// Chunk-space coordinates of the chunk containing this tile.
    fn to_chunk_space(self) -> IVec2;
    /// Canonical `"x,y"` key of the containing chunk.
    fn chunk_key(self) -> String;
    /// True if `other` falls in a different chunk.
    fn different_chunk(self, other: IVec2) -> bool;
    /// Chebyshev (chessboard) distance to `other`.
    fn chebyshev(self, other: IVec2) -> i32;
}

impl ChunkExt for IVec2 {
    #[inline]
    fn to_chunk_space(self) -> IVec2 {
        IVec2::new(self.x.div_euclid(CHUNK_WIDTH), self.y.div_euclid(CHUNK_WIDTH))
    }

    #[inline]
    fn chunk_key(self) -> String {
        let c = self.to_chunk_space();
        format!("{},{}", c.x, c.y)
    }

    #[inline]
    fn different_chunk(self, other: IVec2) -> bool {
        self.to_chunk_space() != other.to_chunk_space()
    }

    #[inline]
    fn chebyshev(self, other: IVec2) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

/// Key for a position already expressed in chunk space.
#[must_use]
pub fn key_of_chunk(c: IVec2) -> String {
    format!("{},{}", c.x, c.y)
}

/// Parse a `"x,y"` chunk key back into chunk-space coordinates.
#[must_use]
pub fn parse_chunk_key(key: &str) -> Option<IVec2> {
    let (x, y) = key.split_once(',')?;
    Some(IVec2::new(x.parse().ok()?, y.parse().ok()?))
}

/// Walk the Chebyshev square of `radius` (in chunk space) around `center`,
/// row-major. Callers that need determinism iterate this, never a hash map.
pub fn chunk_square(center: IVec2, radius: i32) -> impl Iterator<Item = IVec2> {
    let r = radius.max(0);
    (center.y - r..=center.y + r)
        .flat_map(move |y| (center.x - r..=center.x + r).map(move |x| IVec2::new(x, y)))
}
