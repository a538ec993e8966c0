// Tuning constants for block hashing.
//
// Each hasher is built from an explicit `HashParams` value; nothing is
// looked up by name at runtime.

/// Default block width in characters.
pub const DEFAULT_BLOCK_SIZE: usize = 20;

/// Default polynomial base for the rolling hash.
pub const DEFAULT_PRIME_BASE: u64 = 257;

/// Default modulus for the rolling hash.
pub const DEFAULT_PRIME_MOD: u64 = 1_000_000_007;

/// Parameters of the polynomial rolling hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Polynomial base.
    pub prime_base: u64,
    /// Modulus; must be at least 2.
    pub prime_mod: u64,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            prime_base: DEFAULT_PRIME_BASE,
            prime_mod: DEFAULT_PRIME_MOD,
        }
    }
}

impl HashParams {
    /// Build parameters with a custom base and the default modulus.
    pub fn with_base(prime_base: u64) -> Self {
        Self {
            prime_base,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let p = HashParams::default();
        assert_eq!(p.prime_base, DEFAULT_PRIME_BASE);
        assert_eq!(p.prime_mod, DEFAULT_PRIME_MOD);
    }

    #[test]
    fn with_base_keeps_modulus() {
        let p = HashParams::with_base(3);
        assert_eq!(p.prime_base, 3);
        assert_eq!(p.prime_mod, DEFAULT_PRIME_MOD);
    }
}
