//! FIFO line replacement
//!
//! One round-robin victim counter per set. The counter only advances when
//! it is actually consulted, i.e. when the set has no invalid way left, so
//! the fill phase does not skew the rotation.

/// Per-set victim counters for FIFO replacement.
#[derive(Debug, Clone)]
pub struct FifoState {
    counters: Vec<usize>,
}

impl FifoState {
    /// Counters for `num_sets` sets, all starting at way zero.
    pub fn new(num_sets: usize) -> Self {
        Self { counters: vec![0; num_sets] }
    }

    /// Take the current victim for `set_index` and advance the counter
    /// modulo `associativity`.
    pub fn next_victim(&mut self, set_index: usize, associativity: usize) -> usize {
        let victim = self.counters[set_index];
        self.counters[set_index] = (victim + 1) % associativity;
        victim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_rotate_per_set() {
        let mut state = FifoState::new(2);
        assert_eq!(state.next_victim(0, 2), 0);
        assert_eq!(state.next_victim(0, 2), 1);
        assert_eq!(state.next_victim(0, 2), 0);
        // The other set rotates independently.
        assert_eq!(state.next_victim(1, 2), 0);
    }
}
