//! Random username generator

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{is_vowel, Charset, CONSONANTS, DIGITS, VOWELS};
use crate::types::{Algorithm, Candidate, GenerationConfig};

/// Chance that a separator is placed into an eligible name
const SEPARATOR_PROBABILITY: f64 = 0.35;
const SEPARATOR: char = '_';

/// Generator for random username candidates.
///
/// Names are not unique; callers dedupe against a [`super::RecentSet`].
pub struct NickGenerator {
    rng: StdRng,
}

impl NickGenerator {
    /// Create a generator seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a deterministic generator
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate one candidate for the given settings
    pub fn generate(&mut self, config: &GenerationConfig) -> Candidate {
        let min = config.min_length.min(config.max_length);
        let max = config.max_length.max(min);
        let length = self.rng.gen_range(min..=max);

        let prefix: Vec<char> = config.prefix.to_lowercase().chars().collect();
        if prefix.len() >= length {
            return Candidate::new(prefix[..length].iter().collect::<String>());
        }

        let mut name = prefix.clone();
        let remaining = length - prefix.len();

        match config.algorithm {
            Algorithm::Pronounceable => {
                let mut vowel_next = match prefix.last() {
                    Some(&last) => !is_vowel(last),
                    None => self.rng.gen_bool(0.5),
                };
                for _ in 0..remaining {
                    let pool = if vowel_next { VOWELS } else { CONSONANTS };
                    name.push(self.pick(pool));
                    vowel_next = !vowel_next;
                }
            }
            Algorithm::NumericSuffixed => {
                for _ in 0..remaining - 1 {
                    name.push(self.pick(DIGITS));
                }
                name.push(self.pick(Charset::Letters.chars()));
            }
            Algorithm::Mixed => {
                for _ in 0..remaining {
                    name.push(self.pick(Charset::Alphanumeric.chars()));
                }
            }
            Algorithm::Alphabetic => {
                for _ in 0..remaining {
                    name.push(self.pick(Charset::Letters.chars()));
                }
            }
        }

        if config.insert_separator && self.rng.gen_bool(SEPARATOR_PROBABILITY) {
            self.place_separator(&mut name, prefix.len());
        }

        Candidate::new(name.into_iter().collect::<String>())
    }

    /// Overwrite one generated character with the separator.
    ///
    /// The prefix, the first character and the last two characters are left
    /// alone, so the length of the name is unchanged.
    fn place_separator(&mut self, name: &mut [char], prefix_len: usize) {
        if name.len() <= 3 || name.contains(&SEPARATOR) {
            return;
        }
        let start = prefix_len.max(1);
        let end = name.len() - 2;
        if start >= end {
            return;
        }
        let index = self.rng.gen_range(start..end);
        name[index] = SEPARATOR;
    }

    fn pick(&mut self, pool: &[char]) -> char {
        // Pools are non-empty constants
        *pool.choose(&mut self.rng).unwrap_or(&'a')
    }
}

impl Default for NickGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min: usize, max: usize, algorithm: Algorithm, prefix: &str) -> GenerationConfig {
        GenerationConfig {
            min_length: min,
            max_length: max,
            algorithm,
            prefix: prefix.to_string(),
            insert_separator: false,
        }
    }

    #[test]
    fn test_length_within_bounds() {
        let mut gen = NickGenerator::with_seed(7);
        for algorithm in Algorithm::ALL {
            let cfg = config(3, 16, algorithm, "");
            for _ in 0..500 {
                let nick = gen.generate(&cfg);
                assert!((3..=16).contains(&nick.len()), "{} has bad length", nick);
            }
        }
    }

    #[test]
    fn test_prefix_is_kept_and_folded() {
        let mut gen = NickGenerator::with_seed(11);
        for algorithm in Algorithm::ALL {
            let cfg = config(4, 10, algorithm, "XyZ");
            for _ in 0..200 {
                let nick = gen.generate(&cfg);
                assert!(nick.as_str().starts_with("xyz"), "{} lost its prefix", nick);
            }
        }
    }

    #[test]
    fn test_prefix_longer_than_target_is_truncated() {
        let mut gen = NickGenerator::with_seed(3);
        let cfg = config(2, 2, Algorithm::Mixed, "abc");
        assert_eq!(gen.generate(&cfg).as_str(), "ab");

        let cfg = config(3, 3, Algorithm::Pronounceable, "Abc");
        assert_eq!(gen.generate(&cfg).as_str(), "abc");
    }

    #[test]
    fn test_numeric_suffixed_shape() {
        let mut gen = NickGenerator::with_seed(21);
        let cfg = config(3, 12, Algorithm::NumericSuffixed, "ab");
        for _ in 0..500 {
            let nick = gen.generate(&cfg);
            let body: Vec<char> = nick.as_str().chars().skip(2).collect();
            let (last, digits) = body.split_last().unwrap();
            assert!(last.is_ascii_lowercase(), "{} does not end with a letter", nick);
            assert!(digits.iter().all(|c| c.is_ascii_digit()), "{} has non-digits", nick);
        }
    }

    #[test]
    fn test_pronounceable_alternates() {
        let mut gen = NickGenerator::with_seed(5);
        for prefix in ["", "a", "br", "xo"] {
            let cfg = config(3, 16, Algorithm::Pronounceable, prefix);
            for _ in 0..300 {
                let nick = gen.generate(&cfg);
                let chars: Vec<char> = nick.as_str().chars().collect();
                // The first generated char continues the alternation from the prefix
                let from = prefix.len().saturating_sub(1);
                for pair in chars[from..].windows(2) {
                    assert_ne!(is_vowel(pair[0]), is_vowel(pair[1]), "{} breaks alternation", nick);
                }
            }
        }
    }

    #[test]
    fn test_alphabetic_and_mixed_pools() {
        let mut gen = NickGenerator::with_seed(9);
        let alpha = config(3, 8, Algorithm::Alphabetic, "");
        let mixed = config(3, 8, Algorithm::Mixed, "");
        for _ in 0..300 {
            assert!(gen.generate(&alpha).as_str().chars().all(|c| c.is_ascii_lowercase()));
            assert!(gen
                .generate(&mixed)
                .as_str()
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_separator_placement() {
        let mut gen = NickGenerator::with_seed(13);
        let cfg = GenerationConfig {
            insert_separator: true,
            ..config(6, 12, Algorithm::Alphabetic, "ab")
        };
        let mut seen = 0;
        for _ in 0..1000 {
            let nick = gen.generate(&cfg);
            let chars: Vec<char> = nick.as_str().chars().collect();
            assert!((6..=12).contains(&chars.len()));
            assert!(nick.as_str().starts_with("ab"));
            let count = chars.iter().filter(|&&c| c == SEPARATOR).count();
            assert!(count <= 1);
            if let Some(index) = chars.iter().position(|&c| c == SEPARATOR) {
                seen += 1;
                assert!(index >= 2 && index < chars.len() - 2, "{} has a misplaced separator", nick);
            }
        }
        assert!(seen > 0);
    }

    #[test]
    fn test_no_separator_on_short_names() {
        let mut gen = NickGenerator::with_seed(17);
        let cfg = GenerationConfig {
            insert_separator: true,
            ..config(3, 3, Algorithm::Alphabetic, "")
        };
        for _ in 0..300 {
            assert!(!gen.generate(&cfg).as_str().contains(SEPARATOR));
        }
    }

    #[test]
    fn test_seeded_generators_agree() {
        let cfg = config(3, 10, Algorithm::Mixed, "");
        let mut a = NickGenerator::with_seed(42);
        let mut b = NickGenerator::with_seed(42);
        for _ in 0..20 {
            assert_eq!(a.generate(&cfg), b.generate(&cfg));
        }
    }
}
