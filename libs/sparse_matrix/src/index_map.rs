use crate::SparseMatrixError;
use std::collections::HashMap;
use std::fmt;

/// Ordered set of global ids owned by this rank.
///
/// The position of a global id (gid) in the map is its local id (lid).
#[derive(Clone)]
pub struct IndexMap {
    gids: Vec<usize>,
    lookup: HashMap<usize, usize>,
}

impl IndexMap {
    /// Map owning the contiguous range of gids `offset..offset + len`
    pub fn contiguous(offset: usize, len: usize) -> Self {
        let gids: Vec<usize> = (offset..offset + len).collect();
        let lookup = gids.iter().enumerate().map(|(lid, &gid)| (gid, lid)).collect();

        Self { gids, lookup }
    }

    /// Map owning an arbitrary (but duplicate free) list of gids
    pub fn from_gids(gids: Vec<usize>) -> Result<Self, SparseMatrixError> {
        let mut lookup = HashMap::with_capacity(gids.len());
        for (lid, &gid) in gids.iter().enumerate() {
            if lookup.insert(gid, lid).is_some() {
                return Err(SparseMatrixError::DuplicateGid(gid));
            }
        }

        Ok(Self { gids, lookup })
    }

    pub fn len(&self) -> usize {
        self.gids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gids.is_empty()
    }

    /// Global id of a local id. Panics if `lid` is out of range.
    pub fn gid(&self, lid: usize) -> usize {
        self.gids[lid]
    }

    pub fn lid(&self, gid: usize) -> Option<usize> {
        self.lookup.get(&gid).copied()
    }

    pub fn my_gid(&self, gid: usize) -> bool {
        self.lookup.contains_key(&gid)
    }

    pub fn gids(&self) -> &[usize] {
        &self.gids
    }

    pub fn min_gid(&self) -> Option<usize> {
        self.gids.iter().min().copied()
    }

    pub fn max_gid(&self) -> Option<usize> {
        self.gids.iter().max().copied()
    }

    /// Two maps are the same if they own the same gids in the same order
    pub fn same_as(&self, other: &Self) -> bool {
        self.gids == other.gids
    }
}

impl PartialEq for IndexMap {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for IndexMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.min_gid(), self.max_gid()) {
            (Some(min), Some(max)) => write!(f, "IndexMap({} gids in [{}, {}])", self.len(), min, max),
            _ => write!(f, "IndexMap(empty)"),
        }
    }
}
