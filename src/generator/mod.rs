//! Username candidate generation
//!
//! Random names under a small grammar, the recent-history set used to avoid
//! re-probing names, and validation of generation settings.

mod nick;
mod recent;
mod validator;

pub use nick::NickGenerator;
pub use recent::RecentSet;
pub use validator::ConfigValidator;

pub(crate) const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u'];
pub(crate) const CONSONANTS: &[char] = &[
    'b', 'c', 'd', 'f', 'g', 'h', 'j', 'k', 'l', 'm', 'n',
    'p', 'q', 'r', 's', 't', 'v', 'w', 'x', 'y', 'z',
];
pub(crate) const DIGITS: &[char] = &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

/// Character pool for the uniform algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// Only lowercase letters (a-z)
    Letters,
    /// Letters and digits (a-z, 0-9)
    Alphanumeric,
}

impl Default for Charset {
    fn default() -> Self {
        Self::Letters
    }
}

impl Charset {
    pub fn chars(&self) -> &'static [char] {
        match self {
            Charset::Letters => &[
                'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm',
                'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
            ],
            Charset::Alphanumeric => &[
                'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm',
                'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
                '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
            ],
        }
    }
}

pub(crate) fn is_vowel(c: char) -> bool {
    VOWELS.contains(&c)
}
