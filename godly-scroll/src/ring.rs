//! Fixed-size ring buffer addressed by a logical, possibly negative, index.
//!
//! Rotation is pure index arithmetic — nothing in the backing array ever
//! moves — so content that has scrolled off the front of the ring is still
//! addressable at negative logical indices until it is explicitly
//! overwritten. This is what lets ghost rows from the previous frame render
//! correctly while the scroll animation is still in flight.

/// A fixed-capacity ring of `T`, addressed by logical index.
///
/// Logical index `l` maps to array index `((rotation + l) mod N + N) mod N`
/// for capacity `N`. The mapping is total for any signed `l`.
pub struct RingBuffer<T> {
    slots: Vec<T>,
    rotation: i64,
}

impl<T: Clone + Default> RingBuffer<T> {
    /// Allocates a ring of the given capacity, filled with `T::default()`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![T::default(); capacity],
            rotation: 0,
        }
    }

    /// Reallocates to `capacity`, resetting rotation to zero and discarding
    /// prior contents.
    pub fn resize(&mut self, capacity: usize) {
        self.slots = vec![T::default(); capacity];
        self.rotation = 0;
    }
}

impl<T> RingBuffer<T> {
    /// Reallocates to `capacity`, filling each slot via `init`, resetting
    /// rotation to zero. Used for element types (like `ScrollbackRow`) that
    /// don't implement `Default` because construction needs a parameter.
    ///
    /// Fails without mutating `self` if the new backing allocation can't be
    /// reserved, so a resize failure leaves the ring exactly as it was.
    pub fn try_resize_with(
        &mut self,
        capacity: usize,
        mut init: impl FnMut() -> T,
    ) -> Result<(), std::collections::TryReserveError> {
        let mut new_slots = Vec::new();
        new_slots.try_reserve_exact(capacity)?;
        for _ in 0..capacity {
            new_slots.push(init());
        }
        self.slots = new_slots;
        self.rotation = 0;
        Ok(())
    }

    /// Builds a ring directly from an init closure (infallible), for initial
    /// construction where allocation failure is not a case this crate
    /// distinguishes from any other OOM.
    #[must_use]
    pub fn with_init(capacity: usize, mut init: impl FnMut() -> T) -> Self {
        let slots = (0..capacity).map(|_| init()).collect();
        Self { slots, rotation: 0 }
    }
}

impl<T> RingBuffer<T> {
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Maps a logical index to a physical slot index. Modulo is mathematical
    /// (always non-negative), never truncating.
    fn physical_index(&self, logical: i64) -> usize {
        let n = self.slots.len() as i64;
        debug_assert!(n > 0, "RingBuffer::physical_index called on empty ring");
        let idx = (self.rotation + logical) % n;
        let idx = if idx < 0 { idx + n } else { idx };
        idx as usize
    }

    /// Shifts the logical-to-physical mapping by `k`. Never moves bytes.
    /// Positive `k` means "new content appears at the front" (logical index
    /// 0 now reads what used to be at logical index `k`).
    pub fn rotate(&mut self, k: i64) {
        self.rotation = self.rotation.wrapping_add(k);
    }

    #[must_use]
    pub fn get(&self, logical: i64) -> &T {
        let idx = self.physical_index(logical);
        &self.slots[idx]
    }

    pub fn get_mut(&mut self, logical: i64) -> &mut T {
        let idx = self.physical_index(logical);
        &mut self.slots[idx]
    }

    pub fn set(&mut self, logical: i64, value: T) {
        let idx = self.physical_index(logical);
        self.slots[idx] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ring_reads_default() {
        let ring: RingBuffer<i32> = RingBuffer::new(4);
        for l in -5..5 {
            assert_eq!(*ring.get(l), 0);
        }
    }

    #[test]
    fn rotate_shifts_logical_mapping_by_k() {
        let mut ring: RingBuffer<i32> = RingBuffer::new(4);
        ring.set(0, 10);
        ring.set(1, 20);
        ring.set(2, 30);
        ring.set(3, 40);

        for k in -5..=5 {
            let before: Vec<i32> = (0..4).map(|l| *ring.get(l + k)).collect();
            let mut rotated = ring_like(&ring);
            rotated.rotate(k);
            let after: Vec<i32> = (0..4).map(|l| *rotated.get(l)).collect();
            assert_eq!(before, after, "mismatch at k={k}");
        }
    }

    // Builds a fresh ring with identical contents to `r`, ignoring its
    // current rotation, for use as a baseline in the rotate-equivalence test.
    fn ring_like(r: &RingBuffer<i32>) -> RingBuffer<i32> {
        let mut fresh: RingBuffer<i32> = RingBuffer::new(r.capacity());
        for l in 0..r.capacity() as i64 {
            fresh.set(l, *r.get(l));
        }
        fresh
    }

    #[test]
    fn negative_logical_indices_read_previous_rotation_content() {
        let mut ring: RingBuffer<i32> = RingBuffer::new(4);
        ring.set(0, 10);
        ring.set(1, 20);

        ring.rotate(1);
        assert_eq!(*ring.get(-1), 10);
        assert_eq!(*ring.get(0), 20);
    }

    #[test]
    fn rotate_by_capacity_is_identity() {
        let mut ring: RingBuffer<i32> = RingBuffer::new(4);
        for l in 0..4 {
            ring.set(l, (l * 10) as i32);
        }
        ring.rotate(4);
        for l in 0..4 {
            assert_eq!(*ring.get(l), (l * 10) as i32);
        }
    }

    #[test]
    fn resize_resets_rotation_and_contents() {
        let mut ring: RingBuffer<i32> = RingBuffer::new(4);
        ring.set(0, 99);
        ring.rotate(2);
        ring.resize(6);
        assert_eq!(ring.capacity(), 6);
        for l in 0..6 {
            assert_eq!(*ring.get(l), 0);
        }
    }

    #[test]
    fn get_mut_writes_through_rotation() {
        let mut ring: RingBuffer<i32> = RingBuffer::new(3);
        ring.rotate(-1);
        *ring.get_mut(0) = 7;
        assert_eq!(*ring.get(0), 7);
    }

    #[test]
    fn large_negative_logical_index_is_total() {
        let ring: RingBuffer<i32> = RingBuffer::new(3);
        assert_eq!(*ring.get(-1_000_000), 0);
    }

    #[test]
    fn try_resize_with_reinitializes_via_closure() {
        let mut ring: RingBuffer<i32> = RingBuffer::new(2);
        ring.try_resize_with(5, || 42).unwrap();
        assert_eq!(ring.capacity(), 5);
        for l in 0..5 {
            assert_eq!(*ring.get(l), 42);
        }
    }

    #[test]
    fn with_init_builds_from_closure() {
        let mut n = 0;
        let ring: RingBuffer<i32> = RingBuffer::with_init(3, || {
            n += 1;
            n
        });
        assert_eq!(*ring.get(0), 1);
        assert_eq!(*ring.get(1), 2);
        assert_eq!(*ring.get(2), 3);
    }
}
