// Seeded pseudo-random numbers for the match session.
//
// xoshiro256++ (Blackman & Vigna) with SplitMix64 seeding, hand-rolled so the
// sequence is identical on every platform and the combat crate stays free of
// OS entropy. The session draws exactly one number per round: the count of
// moves to pick. Callers choose the seed (the presentation layer typically
// uses the clock); tests pin it.

/// xoshiro256++ generator.
#[derive(Clone, Debug)]
pub struct MatchRng {
    s: [u64; 4],
}

impl MatchRng {
    /// Expand a `u64` seed into the 256-bit state via SplitMix64.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform integer in `[low, high)`, rejection-sampled to avoid modulo bias.
    ///
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Uniform `usize` in `[low, high]`.
    ///
    /// Panics if `low > high`.
    pub fn range_usize_inclusive(&mut self, low: usize, high: usize) -> usize {
        assert!(low <= high, "range_usize_inclusive: low must be <= high");
        match (high as u64).checked_add(1) {
            Some(end) => self.range_u64(low as u64, end) as usize,
            // `high` is u64::MAX: every value from `low` up is in range.
            None if low == 0 => self.next_u64() as usize,
            None => (self.range_u64(low as u64 - 1, u64::MAX) + 1) as usize,
        }
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
