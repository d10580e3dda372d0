//! Sparse integer sets for chunk ids and inode ids.
//!
//! A [`SparseIdSet`] maps the high 48 bits of a value to a lazily allocated
//! bitmap block covering the low 16 bits (2048 words of 32 bits). Memory is
//! proportional to the number of populated 64Ki-wide ranges, never to the
//! size of the key space, so 64-bit chunk ids spread over the whole domain
//! cost the same as dense inode numbers.
//!
//! [`IdSetRegistry`] is the handle table that lets many independent sets
//! coexist during one run; handles of destroyed sets are recycled.

use ahash::AHashMap;

use crate::errors::{MetaError, MetaResult};

const BLOCK_BITS: u32 = 16;
const WORD_BITS: u64 = 32;
const BLOCK_WORDS: usize = (1 << BLOCK_BITS) / WORD_BITS as usize;
const LOW_MASK: u64 = (1 << BLOCK_BITS) - 1;

struct Block {
    words: Box<[u32; BLOCK_WORDS]>,
    population: u32,
}

impl Block {
    fn new() -> Self {
        Self {
            words: Box::new([0u32; BLOCK_WORDS]),
            population: 0,
        }
    }
}

#[inline]
fn split(value: u64) -> (u64, usize, u32) {
    let low = value & LOW_MASK;
    (
        value >> BLOCK_BITS,
        (low / WORD_BITS) as usize,
        1u32 << (low % WORD_BITS),
    )
}

/// Memory-bounded set of unsigned 64-bit integers.
#[derive(Default)]
pub struct SparseIdSet {
    blocks: AHashMap<u64, Block>,
    cardinality: u64,
}

impl SparseIdSet {
    /// Creates an empty set; nothing is allocated until the first insert
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value`, returning `true` if it was already present.
    pub fn add(&mut self, value: u64) -> bool {
        let (key, word, mask) = split(value);
        let block = self.blocks.entry(key).or_insert_with(Block::new);
        if block.words[word] & mask != 0 {
            return true;
        }
        block.words[word] |= mask;
        block.population += 1;
        self.cardinality += 1;
        false
    }

    /// Removes `value`, returning `true` if it was present.
    pub fn remove(&mut self, value: u64) -> bool {
        let (key, word, mask) = split(value);
        let Some(block) = self.blocks.get_mut(&key) else {
            return false;
        };
        if block.words[word] & mask == 0 {
            return false;
        }
        block.words[word] &= !mask;
        block.population -= 1;
        self.cardinality -= 1;
        if block.population == 0 {
            self.blocks.remove(&key);
        }
        true
    }

    /// Membership test; never allocates.
    pub fn check(&self, value: u64) -> bool {
        let (key, word, mask) = split(value);
        match self.blocks.get(&key) {
            Some(block) => block.words[word] & mask != 0,
            None => false,
        }
    }

    pub fn cardinality(&self) -> u64 {
        self.cardinality
    }

    pub fn is_empty(&self) -> bool {
        self.cardinality == 0
    }

    /// Frees every block; the set stays usable.
    pub fn clear(&mut self) {
        self.blocks = AHashMap::new();
        self.cardinality = 0;
    }

    /// Number of allocated bitmap blocks
    pub fn allocated_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Iterates members in no particular order
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.blocks.iter().flat_map(|(&key, block)| {
            block
                .words
                .iter()
                .enumerate()
                .filter(|(_, word)| **word != 0)
                .flat_map(move |(index, &word)| {
                    (0..WORD_BITS as u32)
                        .filter(move |bit| word & (1 << bit) != 0)
                        .map(move |bit| {
                            (key << BLOCK_BITS) | (index as u64 * WORD_BITS) | bit as u64
                        })
                })
        })
    }
}

impl std::fmt::Debug for SparseIdSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseIdSet")
            .field("cardinality", &self.cardinality)
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

impl Extend<u64> for SparseIdSet {
    fn extend<I: IntoIterator<Item = u64>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl FromIterator<u64> for SparseIdSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut set = SparseIdSet::new();
        set.extend(iter);
        set
    }
}

/// Opaque reference to a set owned by an [`IdSetRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetHandle(usize);

impl SetHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle table of independent sets.
#[derive(Debug, Default)]
pub struct IdSetRegistry {
    slots: Vec<Option<SparseIdSet>>,
}

impl IdSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a set, reusing the lowest destroyed slot first.
    pub fn create(&mut self) -> SetHandle {
        if let Some(index) = self.slots.iter().position(Option::is_none) {
            self.slots[index] = Some(SparseIdSet::new());
            return SetHandle(index);
        }
        self.slots.push(Some(SparseIdSet::new()));
        SetHandle(self.slots.len() - 1)
    }

    pub fn get(&self, handle: SetHandle) -> MetaResult<&SparseIdSet> {
        self.slots
            .get(handle.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| stale(handle))
    }

    pub fn get_mut(&mut self, handle: SetHandle) -> MetaResult<&mut SparseIdSet> {
        self.slots
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| stale(handle))
    }

    pub fn add(&mut self, handle: SetHandle, value: u64) -> MetaResult<bool> {
        Ok(self.get_mut(handle)?.add(value))
    }

    pub fn remove(&mut self, handle: SetHandle, value: u64) -> MetaResult<bool> {
        Ok(self.get_mut(handle)?.remove(value))
    }

    pub fn check(&self, handle: SetHandle, value: u64) -> MetaResult<bool> {
        Ok(self.get(handle)?.check(value))
    }

    pub fn cardinality(&self, handle: SetHandle) -> MetaResult<u64> {
        Ok(self.get(handle)?.cardinality())
    }

    pub fn clear(&mut self, handle: SetHandle) -> MetaResult<()> {
        self.get_mut(handle)?.clear();
        Ok(())
    }

    /// Clears the set and releases its handle for reuse.
    pub fn destroy(&mut self, handle: SetHandle) -> MetaResult<()> {
        let slot = self.slots.get_mut(handle.0).ok_or_else(|| stale(handle))?;
        if slot.take().is_none() {
            return Err(stale(handle));
        }
        Ok(())
    }

    /// Number of live sets
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

fn stale(handle: SetHandle) -> MetaError {
    MetaError::invalid_input(format!("set handle {} is not live", handle.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_reports_previous_membership() {
        let mut set = SparseIdSet::new();
        assert!(!set.add(42));
        assert!(set.add(42));
        assert_eq!(set.cardinality(), 1);
    }

    #[test]
    fn test_check_on_empty_set_does_not_allocate() {
        let set = SparseIdSet::new();
        assert!(!set.check(u64::MAX));
        assert!(!set.check(0));
        assert_eq!(set.allocated_blocks(), 0);
    }

    #[test]
    fn test_values_spanning_the_full_domain() {
        let mut set = SparseIdSet::new();
        let values = [0u64, 1, 0xFFFF, 0x1_0000, 1 << 32, 1 << 48, u64::MAX];
        for value in values {
            set.add(value);
        }
        for value in values {
            assert!(set.check(value), "missing {value:#x}");
        }
        assert!(!set.check(2));
        assert!(!set.check(u64::MAX - 1));
        assert_eq!(set.cardinality(), values.len() as u64);
        assert_eq!(set.allocated_blocks(), 5);
    }

    #[test]
    fn test_remove_releases_empty_block() {
        let mut set = SparseIdSet::new();
        set.add(0xABCD_0000_0001);
        assert_eq!(set.allocated_blocks(), 1);
        assert!(set.remove(0xABCD_0000_0001));
        assert!(!set.remove(0xABCD_0000_0001));
        assert_eq!(set.allocated_blocks(), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_of_absent_value_does_not_allocate() {
        let mut set = SparseIdSet::new();
        assert!(!set.remove(77));
        assert_eq!(set.allocated_blocks(), 0);
    }

    #[test]
    fn test_iter_yields_members() {
        let set: SparseIdSet = [5u64, 1 << 40, 70_000].into_iter().collect();
        let mut members: Vec<u64> = set.iter().collect();
        members.sort_unstable();
        assert_eq!(members, vec![5, 70_000, 1 << 40]);
    }

    #[test]
    fn test_registry_recycles_destroyed_handles() {
        let mut registry = IdSetRegistry::new();
        let a = registry.create();
        let b = registry.create();
        registry.add(a, 10).unwrap();
        registry.destroy(a).unwrap();
        assert!(registry.check(a, 10).is_err());
        let c = registry.create();
        assert_eq!(c, a);
        assert!(!registry.check(c, 10).unwrap());
        assert_eq!(registry.live(), 2);
        registry.clear(b).unwrap();
        assert_eq!(registry.cardinality(b).unwrap(), 0);
    }

    #[test]
    fn test_registry_rejects_double_destroy() {
        let mut registry = IdSetRegistry::new();
        let a = registry.create();
        registry.destroy(a).unwrap();
        assert!(registry.destroy(a).is_err());
    }
}
