//! LFU line replacement
//!
//! A frequency counter per way. Hits increment; installing a line resets
//! its counter to one. Ties go to the lowest way index.

/// Per-set per-way access counters for LFU replacement.
#[derive(Debug, Clone)]
pub struct LfuState {
    counts: Vec<Vec<u64>>,
}

impl LfuState {
    /// Zeroed counters for `num_sets` sets of `associativity` ways.
    pub fn new(num_sets: usize, associativity: usize) -> Self {
        Self { counts: vec![vec![0; associativity]; num_sets] }
    }

    /// Count a hit on `(set_index, line_index)`.
    pub fn record_access(&mut self, set_index: usize, line_index: usize) {
        self.counts[set_index][line_index] += 1;
    }

    /// The least frequently used way; the lowest index wins ties.
    pub fn victim(&self, set_index: usize) -> usize {
        let counts = &self.counts[set_index];
        let mut victim = 0;
        let mut min_count = counts[0];
        for (i, &count) in counts.iter().enumerate().skip(1) {
            if count < min_count {
                min_count = count;
                victim = i;
            }
        }
        victim
    }

    /// Restart the counter of a freshly installed way at one.
    pub fn reset(&mut self, set_index: usize, line_index: usize) {
        self.counts[set_index][line_index] = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn victim_is_least_frequent() {
        let mut state = LfuState::new(1, 3);
        state.reset(0, 0);
        state.reset(0, 1);
        state.reset(0, 2);
        state.record_access(0, 0);
        state.record_access(0, 2);
        assert_eq!(state.victim(0), 1);
    }

    #[test]
    fn ties_prefer_lowest_index() {
        let mut state = LfuState::new(1, 3);
        state.reset(0, 0);
        state.reset(0, 1);
        state.reset(0, 2);
        assert_eq!(state.victim(0), 0);
    }

    #[test]
    fn reset_restarts_at_one() {
        let mut state = LfuState::new(1, 2);
        state.reset(0, 0);
        state.record_access(0, 0);
        state.record_access(0, 0);
        state.reset(0, 1);
        assert_eq!(state.victim(0), 1);

        state.reset(0, 0);
        // Both at one now: index 0 wins.
        assert_eq!(state.victim(0), 0);
    }
}
