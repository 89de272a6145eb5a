//! Character tables and morpheme lists driving the normalization pipeline.

use std::collections::{HashMap, HashSet};

/// Zero width non-joiner, the Persian half-space.
pub const ZWNJ: char = '\u{200c}';

/// Arabic decimal separator, written between the digits of a decimal number.
pub const DECIMAL_SEPARATOR: char = '\u{066b}';

pub const ELLIPSIS: char = '\u{2026}';
pub const OPEN_QUOTE: char = '«';
pub const CLOSE_QUOTE: char = '»';

pub const DEFAULT_REPEAT_THRESHOLD: usize = 3;
pub const DEFAULT_PREFIXES: &[&str] = &["می", "نمی"];
pub const DEFAULT_SUFFIXES: &[&str] = &["ها", "ای", "تر", "تری", "ترین"];

const PERSIAN_DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];

const ASCII_PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";
const ASCII_WHITESPACE: &str = " \t\n\r\u{0b}\u{0c}";
const PERSIAN_PUNCTUATION: &str = "،؛؟";
// Byte order mark; sits inside the presentation-form block but is not a letter.
const BOM: char = '\u{feff}';

/// Immutable configuration bundle shared by every normalization call.
///
/// Built once (usually through [`crate::NormalizerConfig::build_rules`]) and
/// then only read, so it can be shared across worker threads without locking.
#[derive(Debug, Clone)]
pub struct NormalizationRules {
    pub(crate) diacritics: HashSet<char>,
    pub(crate) char_map: HashMap<char, char>,
    pub(crate) deleted: HashSet<char>,
    pub(crate) protected: HashSet<char>,
    pub(crate) repeat_threshold: usize,
    pub(crate) prefixes: Vec<String>,
    pub(crate) suffixes: HashSet<String>,
}

impl NormalizationRules {
    pub fn new(repeat_threshold: usize, prefixes: Vec<String>, suffixes: Vec<String>) -> Self {
        let diacritics = ('\u{064b}'..='\u{0652}').collect();

        let mut char_map: HashMap<char, char> = ('0'..='9').zip(PERSIAN_DIGITS).collect();
        char_map.insert('ي', 'ی');
        char_map.insert('ك', 'ک');

        let protected: HashSet<char> =
            [ZWNJ, DECIMAL_SEPARATOR, ELLIPSIS, OPEN_QUOTE, CLOSE_QUOTE]
                .into_iter()
                .collect();

        let deleted = ASCII_PUNCTUATION
            .chars()
            .chain(ASCII_WHITESPACE.chars())
            .chain(PERSIAN_PUNCTUATION.chars())
            .chain(std::iter::once(BOM))
            .filter(|c| !protected.contains(c))
            .collect();

        // Longest first so "نمی" wins over "می".
        let mut prefixes: Vec<String> = prefixes.into_iter().filter(|p| !p.is_empty()).collect();
        prefixes.sort();
        prefixes.dedup();
        prefixes.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

        NormalizationRules {
            diacritics,
            char_map,
            deleted,
            protected,
            repeat_threshold,
            prefixes,
            suffixes: suffixes.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    pub fn is_diacritic(&self, c: char) -> bool {
        self.diacritics.contains(&c)
    }

    /// Maps ASCII digits to Persian digits and Arabic letter variants to
    /// their Persian forms. Everything else passes through.
    pub fn map_char(&self, c: char) -> char {
        self.char_map.get(&c).copied().unwrap_or(c)
    }

    pub fn is_deleted(&self, c: char) -> bool {
        self.deleted.contains(&c)
    }

    pub fn is_protected(&self, c: char) -> bool {
        self.protected.contains(&c)
    }

    pub fn repeat_threshold(&self) -> usize {
        self.repeat_threshold
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn is_suffix(&self, word: &str) -> bool {
        self.suffixes.contains(word)
    }
}

impl Default for NormalizationRules {
    fn default() -> Self {
        NormalizationRules::new(
            DEFAULT_REPEAT_THRESHOLD,
            DEFAULT_PREFIXES.iter().map(|s| s.to_string()).collect(),
            DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

/// Core Arabic block plus the two presentation-form blocks.
pub fn is_arabic_script(c: char) -> bool {
    matches!(c, '\u{0600}'..='\u{06ff}' | '\u{fb50}'..='\u{fdff}' | '\u{fe70}'..='\u{feff}')
}
