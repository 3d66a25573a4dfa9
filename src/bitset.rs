//! Compact bitset representation for taxon sets.
//!
//! # Overview
//! A bitset records which taxa of a namespace belong to a clade or to one side of
//! a bipartition. Each bit position corresponds to a taxon index.
//!
//! # Example
//! For a quintet with taxa [1, 2, 3, 4, 5] mapped to indices [0, 1, 2, 3, 4]:
//! - Clade {1, 3} → bitset `0b00101` (bits 0 and 2 set)
//! - Clade {2, 3, 4} → bitset `0b01110` (bits 1, 2, 3 set)

/// Upper bound on the namespace size a [`Bitset`] can address.
pub const MAX_TAXA: usize = 64;

/// A compact set of taxon indices.
///
/// Stored in a single `u64` word: namespaces in this crate are quintets, and the
/// word keeps bitsets `Copy` so they can be hashed and compared freely.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Bitset(pub u64);

impl Bitset {
    /// Creates the empty set.
    pub fn empty() -> Self {
        Bitset(0)
    }

    /// Creates a set holding a single taxon.
    ///
    /// # Example
    /// ```
    /// # use quintet_rooting::bitset::Bitset;
    /// let bs = Bitset::singleton(3);
    /// assert_eq!(bs.0, 0b1000);
    /// ```
    pub fn singleton(idx: usize) -> Self {
        let mut bs = Bitset::empty();
        bs.set(idx);
        bs
    }

    /// Creates the set `{0, 1, ..., n-1}`.
    pub fn full(n: usize) -> Self {
        if n >= MAX_TAXA {
            Bitset(u64::MAX)
        } else {
            Bitset((1u64 << n) - 1)
        }
    }

    /// Sets the bit at the given index to 1.
    ///
    /// # Example
    /// ```
    /// # use quintet_rooting::bitset::Bitset;
    /// let mut bs = Bitset::empty();
    /// bs.set(0);
    /// bs.set(4);
    /// assert_eq!(bs.0, 0b10001);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        self.0 |= 1u64 << idx;
    }

    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        self.0 & (1u64 << idx) != 0
    }

    /// Performs bitwise OR with another bitset (union operation).
    ///
    /// # Example
    /// ```
    /// # use quintet_rooting::bitset::Bitset;
    /// let mut left = Bitset::singleton(0);
    /// left.or_assign(&Bitset::singleton(1));
    /// assert_eq!(left.0, 0b11);
    /// ```
    #[inline]
    pub fn or_assign(&mut self, other: &Bitset) {
        self.0 |= other.0;
    }

    /// Counts the number of set bits (how many taxa are in the set).
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Complement with respect to a namespace of `n` taxa.
    ///
    /// # Example
    /// ```
    /// # use quintet_rooting::bitset::Bitset;
    /// let mut bs = Bitset::empty();
    /// bs.set(0);
    /// bs.set(1);
    /// assert_eq!(bs.complement(5).0, 0b11100);
    /// ```
    #[inline]
    pub fn complement(&self, n: usize) -> Bitset {
        Bitset(!self.0 & Bitset::full(n).0)
    }

    /// Iterates over the indices of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_TAXA).filter(move |&i| self.contains(i))
    }

    /// Maps every member `i` to `targets[i]`.
    ///
    /// Members without a target are dropped; callers pass a full permutation.
    pub fn permute(&self, targets: &[usize]) -> Bitset {
        let mut out = Bitset::empty();
        for i in self.iter_ones() {
            if let Some(&t) = targets.get(i) {
                out.set(t);
            }
        }
        out
    }
}
