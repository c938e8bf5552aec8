/// Random number generator trait for deterministic tracking runs.
///
/// A minimal interface so every sampling site takes an explicit generator
/// instead of touching global state. Runs are reproducible for a fixed seed,
/// including under the optional `rayon` feature, because each particle owns
/// its own stream (see [`derive_stream`]).
pub trait Rng {
    /// Generate the next uint64 value
    fn next_u64(&mut self) -> u64;

    /// Generate a random f64 in [0, 1)
    fn rand(&mut self) -> f64 {
        self.next_u64() as f64 / (u64::MAX as f64 + 1.0)
    }

    /// Generate a random f64 from standard normal distribution N(0, 1)
    /// Using Box-Muller transform
    fn randn(&mut self) -> f64 {
        let u1 = self.rand();
        let u2 = self.rand();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Generate a random sample from Poisson distribution
    /// Using Knuth algorithm
    fn poissrnd(&mut self, lambda: f64) -> usize {
        let l = (-lambda).exp();
        let mut k = 0;
        let mut p = 1.0;
        loop {
            p *= self.rand();
            if p <= l {
                break;
            }
            k += 1;
        }
        k
    }
}

/// Simple deterministic random number generator using Xorshift64.
///
/// Minimal, fast and deterministic: identical output for the same seed on
/// every platform, which keeps tracker runs and tests reproducible.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new SimpleRng with the given seed.
    /// If seed is 0, uses 1 instead to avoid degenerate state.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }
}

impl Rng for SimpleRng {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

/// Derive an independent generator from a master seed.
///
/// Used to give every particle its own stream: `stream` is the particle
/// index and `generation` the resampling generation, so streams stay
/// distinct across resampling without any shared mutable state. The seed is
/// scrambled through a splitmix64 finalizer so that consecutive indices do
/// not produce correlated xorshift states.
pub fn derive_stream(master_seed: u64, generation: u64, stream: u64) -> SimpleRng {
    let mut z = master_seed
        .wrapping_add(generation.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(stream.wrapping_mul(0xBF58_476D_1CE4_E5B9));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    SimpleRng::new(z)
}

// Implement rand::RngCore to enable use with rand::Rng trait bound
impl rand::RngCore for SimpleRng {
    fn next_u32(&mut self) -> u32 {
        Rng::next_u64(self) as u32
    }

    fn next_u64(&mut self) -> u64 {
        Rng::next_u64(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut i = 0;
        let len = dest.len();
        while i + 8 <= len {
            let bytes = Rng::next_u64(self).to_le_bytes();
            dest[i..i + 8].copy_from_slice(&bytes);
            i += 8;
        }
        if i < len {
            let bytes = Rng::next_u64(self).to_le_bytes();
            let remaining = len - i;
            dest[i..].copy_from_slice(&bytes[..remaining]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
