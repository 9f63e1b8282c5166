use crate::mesh::edge::EdgeKey;

/// A triangle, wound counter-clockwise when seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshFace {
    pub verts: [usize; 3],
}

impl MeshFace {
    pub const fn new(verts: [usize; 3]) -> Self {
        Self { verts }
    }

    /// Winding-independent identity.
    pub fn key(&self) -> [usize; 3] {
        let mut key = self.verts;
        key.sort_unstable();
        key
    }

    pub const fn edges(&self) -> [EdgeKey; 3] {
        let [a, b, c] = self.verts;
        [EdgeKey::new(a, b), EdgeKey::new(b, c), EdgeKey::new(c, a)]
    }

    pub const fn reversed(&self) -> Self {
        let [a, b, c] = self.verts;
        Self { verts: [a, c, b] }
    }

    #[inline]
    pub fn contains(&self, v: usize) -> bool {
        self.verts.contains(&v)
    }
}
