//! Worlds: layered tile storage plus the per-chunk entity index.

use glam::IVec2;
use grid_core::{ChunkExt, Layer};

use crate::catalog::ComponentCatalog;
use crate::scope::{Scope, ScopeChange};
use crate::ContainerId;

/// Terrain tile payload for layer 0. Contents are opaque to the core.
pub type Tile = u16;

#[derive(Debug)]
pub struct World {
    pub id: String,
    pub name: String,
    /// Layer 0 is the canonical terrain layer.
    pub layers: Vec<Layer<Tile>>,
    /// Ids of entities currently published here.
    pub published: Vec<String>,
    /// Chunk key -> entities indexed in that chunk, insertion-ordered.
    chunk_index: Vec<(String, Vec<String>)>,
    /// Aggregate view refcounts driving chunk load/unload.
    pub view: Scope,
    /// World size in chunks, when bounded; chunk (0,0) is the origin.
    pub size: Option<IVec2>,
    pub catalog: ComponentCatalog,
}

impl World {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let id = crate::new_id();
        Self {
            catalog: ComponentCatalog::new(ContainerId::world(&id)),
            view: Scope::new(&id),
            id,
            name: name.to_string(),
            layers: vec![Layer::new(0)],
            published: Vec::new(),
            chunk_index: Vec::new(),
            size: None,
        }
    }

    #[must_use]
    pub fn bounds(&self) -> Option<(IVec2, IVec2)> {
        self.size.map(|s| (IVec2::ZERO, s - IVec2::ONE))
    }

    #[must_use]
    pub fn is_published(&self, entity: &str) -> bool {
        self.published.iter().any(|e| e == entity)
    }

    #[must_use]
    pub fn entities_in_chunk(&self, key: &str) -> &[String] {
        self.chunk_index
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// Every chunk key currently indexing `entity`. The world invariant is
    /// that this has length one while the entity is published.
    #[must_use]
    pub fn chunks_indexing(&self, entity: &str) -> Vec<String> {
        self.chunk_index
            .iter()
            .filter(|(_, v)| v.iter().any(|e| e == entity))
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn index_insert(&mut self, position: IVec2, entity: &str) {
        let key = position.chunk_key();
        match self.chunk_index.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => {
                if !v.iter().any(|e| e == entity) {
                    v.push(entity.to_string());
                }
            }
            None => self.chunk_index.push((key, vec![entity.to_string()])),
        }
    }

    pub fn index_remove(&mut self, position: IVec2, entity: &str) {
        let key = position.chunk_key();
        if let Some(pos) = self.chunk_index.iter().position(|(k, _)| *k == key) {
            self.chunk_index[pos].1.retain(|e| e != entity);
            if self.chunk_index[pos].1.is_empty() {
                self.chunk_index.remove(pos);
            }
        }
    }

    /// Move an entity's index entry between chunks.
    pub fn reindex(&mut self, entity: &str, from: IVec2, to: IVec2) {
        if from.different_chunk(to) {
            self.index_remove(from, entity);
            self.index_insert(to, entity);
        }
    }

    pub fn publish(&mut self, entity: &str, position: IVec2) {
        if !self.is_published(entity) {
            self.published.push(entity.to_string());
        }
        self.index_insert(position, entity);
    }

    pub fn unpublish(&mut self, entity: &str, position: IVec2) {
        self.published.retain(|e| e != entity);
        self.index_remove(position, entity);
    }

    /// Acquire view refcounts for a viewer around a chunk.
    pub fn add_view(&mut self, viewer: &str, to: IVec2, from: Option<IVec2>, radius: i32) -> ScopeChange {
        let bounds = self.bounds();
        self.view.add_viewer(viewer, to, from, radius, bounds)
    }

    /// Release view refcounts; pairs with `add_view` on every path.
    pub fn remove_view(
        &mut self,
        viewer: &str,
        from: IVec2,
        to: Option<IVec2>,
        radius: i32,
    ) -> ScopeChange {
        let bounds = self.bounds();
        self.view.remove_viewer(viewer, from, to, radius, bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_indexes_exactly_one_chunk() {
        let mut w = World::new("overworld");
        w.publish("e", IVec2::new(17, 3));
        assert_eq!(w.chunks_indexing("e"), vec!["1,0".to_string()]);
        assert!(w.is_published("e"));
        w.reindex("e", IVec2::new(17, 3), IVec2::new(40, 3));
        assert_eq!(w.chunks_indexing("e"), vec!["2,0".to_string()]);
        w.unpublish("e", IVec2::new(40, 3));
        assert!(w.chunks_indexing("e").is_empty());
        assert!(!w.is_published("e"));
    }

    #[test]
    fn reindex_within_chunk_is_a_noop() {
        let mut w = World::new("overworld");
        w.publish("e", IVec2::new(1, 1));
        w.reindex("e", IVec2::new(1, 1), IVec2::new(14, 14));
        assert_eq!(w.chunks_indexing("e"), vec!["0,0".to_string()]);
    }

    #[test]
    fn terrain_layer_reads_fill_by_default() {
        let mut w = World::new("overworld");
        assert_eq!(w.layers[0].get_tile(IVec2::new(99, -4)), 0);
        w.layers[0].set_tile(IVec2::new(99, -4), 3);
        assert_eq!(w.layers[0].get_tile(IVec2::new(99, -4)), 3);
    }

    #[test]
    fn bounded_world_clamps_view_squares() {
        let mut w = World::new("arena");
        w.size = Some(IVec2::new(2, 2));
        let ch = w.add_view("v", IVec2::ZERO, None, 3);
        assert_eq!(ch.added.len(), 4, "only chunks 0..2 x 0..2 exist");
    }
}
