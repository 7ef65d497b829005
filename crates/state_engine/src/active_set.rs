//! Fixed-length bit-vector of active states, indexed by [`StateId`].

use crate::definition::StateId;

const WORD_BITS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveSet {
    words: Vec<u64>,
    len: usize,
}

impl ActiveSet {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn contains(&self, id: StateId) -> bool {
        let i = id.index();
        debug_assert!(i < self.len, "state {id} out of range");
        self.words[i / WORD_BITS] & (1 << (i % WORD_BITS)) != 0
    }

    pub(crate) fn set(&mut self, id: StateId, active: bool) {
        let i = id.index();
        debug_assert!(i < self.len, "state {id} out of range");
        let mask = 1u64 << (i % WORD_BITS);
        if active {
            self.words[i / WORD_BITS] |= mask;
        } else {
            self.words[i / WORD_BITS] &= !mask;
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = StateId> + '_ {
        (0..self.len)
            .map(StateId::from_index)
            .filter(|id| self.contains(*id))
    }

    /// States set in `self` but not in `other`.
    pub(crate) fn difference<'a>(&'a self, other: &'a ActiveSet) -> impl Iterator<Item = StateId> + 'a {
        self.iter().filter(|id| !other.contains(*id))
    }
}
