//! Deterministic PRNG for training initialization.
//!
//! xoshiro256** seeded via SplitMix64, with Box-Muller for standard-normal
//! draws. The trainer owns one instance seeded from its options, so the
//! same seed reproduces the same reservoir sample and the same initial
//! model. Exposed publicly so evaluation tooling can reuse it for
//! deterministic speaker sampling.

/// Seeded xoshiro256** generator.
pub struct Xoshiro256ss {
    s: [u64; 4],
    has_spare: bool,
    spare: f64,
}

impl Xoshiro256ss {
    pub fn new(seed: u64) -> Self {
        // SplitMix64 to initialize state from a single seed.
        let mut z = seed;
        let mut s = [0u64; 4];
        for slot in &mut s {
            z = z.wrapping_add(0x9e3779b97f4a7c15);
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
            *slot = z ^ (z >> 31);
        }
        Self {
            s,
            has_spare: false,
            spare: 0.0,
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.s[1] << 17;
        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);
        result
    }

    /// Uniform f64 in [0, 1).
    pub fn float64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform index in [0, n). `n` must be positive.
    /// Modulo bias is below 2^-40 for any n the trainer can see.
    pub fn uniform_below(&mut self, n: usize) -> usize {
        debug_assert!(n > 0);
        (self.next_u64() % n as u64) as usize
    }

    /// Box-Muller transform to generate a standard normal draw.
    pub fn norm_float64(&mut self) -> f64 {
        if self.has_spare {
            self.has_spare = false;
            return self.spare;
        }

        loop {
            let u1 = self.float64();
            let u2 = self.float64();
            if u1 > 0.0 {
                let mag = (-2.0 * u1.ln()).sqrt();
                let angle = 2.0 * std::f64::consts::PI * u2;
                self.spare = mag * angle.sin();
                self.has_spare = true;
                return mag * angle.cos();
            }
        }
    }
}
