//! Growable storage with stable indices.

/// A vector whose indices stay valid across removals.
///
/// Removing an element leaves a hole. Holes are never reused; they are only
/// dropped by rebuilding the container (see `HalfEdgeMesh::compact`).
#[derive(Debug, Clone)]
pub(crate) struct StableVec<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> Default for StableVec<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }
}

impl<T> StableVec<T> {
    /// Append an element and return its index.
    pub fn push(&mut self, value: T) -> u32 {
        let index = self.slots.len() as u32;
        self.slots.push(Some(value));
        self.live += 1;
        index
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.slots.get_mut(index as usize).and_then(Option::as_mut)
    }

    /// Tombstone a slot, returning its element.
    pub fn remove(&mut self, index: u32) -> Option<T> {
        let removed = self.slots.get_mut(index as usize).and_then(Option::take);
        if removed.is_some() {
            self.live -= 1;
        }
        removed
    }

    /// Number of live elements
    pub fn len(&self) -> usize {
        self.live
    }

    /// Number of slots, live or not
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Live elements with their indices, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|value| (i as u32, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_survive_removal() {
        let mut v = StableVec::default();
        let a = v.push("a");
        let b = v.push("b");
        let c = v.push("c");

        assert_eq!(v.remove(b), Some("b"));
        assert_eq!(v.remove(b), None);
        assert_eq!(v.get(a), Some(&"a"));
        assert_eq!(v.get(b), None);
        assert_eq!(v.get(c), Some(&"c"));
        assert_eq!(v.len(), 2);
        assert_eq!(v.slot_count(), 3);

        let d = v.push("d");
        assert_eq!(d, 3);
        let live: Vec<u32> = v.iter().map(|(i, _)| i).collect();
        assert_eq!(live, vec![0, 2, 3]);
    }
}
