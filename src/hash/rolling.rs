// Fixed-window hash functions over text.
//
// Two implementations:
//   - **RollingHash**: Rabin-Karp polynomial hash, `sum(c_i * B^(n-1-i)) mod P`,
//     with an O(1) `next_hash` that slides the window by one character.
//   - **FullHash**: any hasher without incremental support; `next_hash`
//     returns `None` and callers fall back to a full recompute.

use std::collections::VecDeque;

use super::config::HashParams;

// ---------------------------------------------------------------------------
// Hasher trait
// ---------------------------------------------------------------------------

/// A fixed-window hash function, optionally rolling.
///
/// `hash` always (re)starts the window. `next_hash` drops the oldest
/// character of the last window and appends `incoming`; hashers that cannot
/// roll return `None`, which tells the caller to call `hash` again on the
/// full window.
pub trait Hasher {
    /// Hash `window` from scratch and make it the current window.
    fn hash(&mut self, window: &[char]) -> u64;

    /// Slide the current window forward by one character.
    fn next_hash(&mut self, _incoming: char) -> Option<u64> {
        None
    }
}

// ---------------------------------------------------------------------------
// Polynomial rolling hash
// ---------------------------------------------------------------------------

/// Rabin-Karp rolling hash.
#[derive(Debug, Clone)]
pub struct RollingHash {
    base: u64,
    modulus: u64,
    last_hash: u64,
    /// `base^(len-1) mod modulus` for the current window.
    last_power: u64,
    window: VecDeque<char>,
}

impl Default for RollingHash {
    fn default() -> Self {
        Self::new(HashParams::default())
    }
}

impl RollingHash {
    /// Build a hasher from explicit parameters.
    pub fn new(params: HashParams) -> Self {
        let modulus = params.prime_mod.max(2);
        Self {
            base: params.prime_base % modulus,
            modulus,
            last_hash: 0,
            last_power: 0,
            window: VecDeque::new(),
        }
    }

    fn mod_pow(&self, exp: usize) -> u64 {
        let mut acc = 1u64;
        for _ in 0..exp {
            acc = mul_mod(acc, self.base, self.modulus);
        }
        acc
    }

    /// `(h * base + c) mod m`
    #[inline(always)]
    fn push(&self, h: u64, c: char) -> u64 {
        let wide = u128::from(h) * u128::from(self.base) + u128::from(self.unit(c));
        (wide % u128::from(self.modulus)) as u64
    }

    #[inline(always)]
    fn unit(&self, c: char) -> u64 {
        u64::from(u32::from(c)) % self.modulus
    }
}

impl Hasher for RollingHash {
    fn hash(&mut self, window: &[char]) -> u64 {
        let mut h = 0u64;
        for &c in window {
            h = self.push(h, c);
        }
        self.last_power = self.mod_pow(window.len().saturating_sub(1));
        self.window.clear();
        self.window.extend(window.iter().copied());
        self.last_hash = h;
        h
    }

    fn next_hash(&mut self, incoming: char) -> Option<u64> {
        let outgoing = self.window.pop_front()?;
        let drop = mul_mod(self.unit(outgoing), self.last_power, self.modulus);
        let h = if self.last_hash >= drop {
            self.last_hash - drop
        } else {
            self.modulus - (drop - self.last_hash)
        };
        let h = self.push(h, incoming);
        self.window.push_back(incoming);
        self.last_hash = h;
        Some(h)
    }
}

#[inline(always)]
fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((u128::from(a) * u128::from(b)) % u128::from(m)) as u64
}

// ---------------------------------------------------------------------------
// Non-rolling adapter
// ---------------------------------------------------------------------------

/// Wraps a plain window function as a non-rolling `Hasher`.
#[derive(Clone)]
pub struct FullHash<F>(pub F);

impl<F> Hasher for FullHash<F>
where
    F: FnMut(&[char]) -> u64,
{
    fn hash(&mut self, window: &[char]) -> u64 {
        (self.0)(window)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
