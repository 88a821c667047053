//! crates/attendance_core/src/token.rs
//!
//! Verification-token generation. Tokens are 4-digit numeric strings drawn
//! uniformly from [1000, 9999]; consecutive rotations may repeat, which is
//! acceptable within one rotation window.

use rand::Rng;

/// Smallest and largest token values, inclusive.
pub const TOKEN_MIN: u32 = 1000;
pub const TOKEN_MAX: u32 = 9999;

/// The randomness seam for the broadcaster. Swapped for a deterministic
/// sequence in tests.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Draws tokens uniformly from the full 4-digit range.
#[derive(Debug, Default, Clone)]
pub struct UniformTokenGenerator;

impl TokenGenerator for UniformTokenGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .gen_range(TOKEN_MIN..=TOKEN_MAX)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_four_digit_strings_in_range() {
        let generator = UniformTokenGenerator;
        for _ in 0..500 {
            let token = generator.generate();
            assert_eq!(token.len(), 4);
            let value: u32 = token.parse().expect("token is numeric");
            assert!((TOKEN_MIN..=TOKEN_MAX).contains(&value));
        }
    }
}
