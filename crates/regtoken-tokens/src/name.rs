//! Token name generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Source of candidate token names.
pub trait NameGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Fewest random bytes a generated name carries.
pub const MIN_NAME_BYTES: usize = 8;

/// Random URL-safe names drawn from the thread-local CSPRNG.
#[derive(Debug, Clone)]
pub struct RandomNameGenerator {
    bytes: usize,
}

impl RandomNameGenerator {
    /// Names carrying `bytes` bytes of randomness, at least [`MIN_NAME_BYTES`].
    pub fn new(bytes: usize) -> Self {
        Self {
            bytes: bytes.max(MIN_NAME_BYTES),
        }
    }
}

impl Default for RandomNameGenerator {
    fn default() -> Self {
        // 128 bits, 22 characters
        Self::new(16)
    }
}

impl NameGenerator for RandomNameGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        let mut bytes = vec![0u8; self.bytes];
        rng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}
