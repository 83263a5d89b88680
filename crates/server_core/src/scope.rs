//! Per-(viewer-owner x world) chunk visibility bookkeeping.
//!
//! A chunk is active iff at least one viewer holds it in view; view moves
//! are expressed as paired square diffs so only chunks whose active status
//! flipped are reported (and chunk load/unload stays reference-counted).

use glam::IVec2;
use grid_core::key_of_chunk;

/// Chunk keys whose active status flipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeChange {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl ScopeChange {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Scope {
    pub world: String,
    /// Chunk key -> ids of viewers that hold it in view.
    chunk_viewers: Vec<(String, Vec<String>)>,
    /// Keys with at least one viewer, in activation order.
    active: Vec<String>,
}

fn square(center: IVec2, radius: i32, bounds: Option<(IVec2, IVec2)>) -> Vec<IVec2> {
    grid_core::chunk_square(center, radius)
        .filter(|c| match bounds {
            Some((lo, hi)) => c.x >= lo.x && c.y >= lo.y && c.x <= hi.x && c.y <= hi.y,
            None => true,
        })
        .collect()
}

impl Scope {
    #[must_use]
    pub fn new(world: &str) -> Self {
        Self {
            world: world.to_string(),
            chunk_viewers: Vec::new(),
            active: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_active(&self, key: &str) -> bool {
        self.active.iter().any(|k| k == key)
    }

    #[must_use]
    pub fn active_keys(&self) -> &[String] {
        &self.active
    }

    #[must_use]
    pub fn viewers_of(&self, key: &str) -> &[String] {
        self.chunk_viewers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn viewer_count(&self) -> usize {
        self.chunk_viewers.iter().map(|(_, v)| v.len()).sum()
    }

    fn insert(&mut self, key: &str, viewer: &str, change: &mut ScopeChange) {
        match self.chunk_viewers.iter_mut().find(|(k, _)| k == key) {
            Some((_, vs)) => {
                if !vs.iter().any(|v| v == viewer) {
                    vs.push(viewer.to_string());
                }
            }
            None => {
                self.chunk_viewers
                    .push((key.to_string(), vec![viewer.to_string()]));
                self.active.push(key.to_string());
                change.added.push(key.to_string());
            }
        }
    }

    fn erase(&mut self, key: &str, viewer: &str, change: &mut ScopeChange) {
        let Some(pos) = self.chunk_viewers.iter().position(|(k, _)| k == key) else {
            return;
        };
        let vs = &mut self.chunk_viewers[pos].1;
        vs.retain(|v| v != viewer);
        if vs.is_empty() {
            self.chunk_viewers.remove(pos);
            self.active.retain(|k| k != key);
            change.removed.push(key.to_string());
        }
    }

    /// Bring the square around `to` into the viewer's sight; when `from` is
    /// given, chunks only in the old square are released in the same pass.
    pub fn add_viewer(
        &mut self,
        viewer: &str,
        to: IVec2,
        from: Option<IVec2>,
        radius: i32,
        bounds: Option<(IVec2, IVec2)>,
    ) -> ScopeChange {
        let mut change = ScopeChange::default();
        let target = square(to, radius, bounds);
        let old = from.map(|f| square(f, radius, bounds)).unwrap_or_default();
        for c in &target {
            self.insert(&key_of_chunk(*c), viewer, &mut change);
        }
        for c in &old {
            if !target.contains(c) {
                self.erase(&key_of_chunk(*c), viewer, &mut change);
            }
        }
        change
    }

    /// Release the square around `from`; when `to` is given, chunks shared
    /// with the new square are kept.
    pub fn remove_viewer(
        &mut self,
        viewer: &str,
        from: IVec2,
        to: Option<IVec2>,
        radius: i32,
        bounds: Option<(IVec2, IVec2)>,
    ) -> ScopeChange {
        let mut change = ScopeChange::default();
        let old = square(from, radius, bounds);
        let keep = to.map(|t| square(t, radius, bounds)).unwrap_or_default();
        for c in &old {
            if !keep.contains(c) {
                self.erase(&key_of_chunk(*c), viewer, &mut change);
            }
        }
        change
    }
}
