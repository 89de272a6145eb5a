//! Persian text normalization.
//!
//! [`Normalizer::normalize_sentence`] runs a fixed sequence of steps:
//!
//! 1. lowercase, then NFKC
//! 2. strip the harakat U+064B..=U+0652
//! 3. ASCII digits to Persian digits, Arabic yeh/kaf to Persian forms
//! 4. collapse runs of `repeat_threshold` or more identical characters
//! 5. quote pairs to `«»`, dot runs to `…`, decimal points to `٫`
//! 6. drop punctuation and anything outside the Arabic-script blocks
//! 7. split on whitespace
//! 8. join bound prefixes (`می`, `نمی`) to their host with a half-space
//! 9. join bound suffixes (`ها`, `تر`, ...) to the preceding word, right to left
//! 10. join words with single spaces
//!
//! Digit conversion (3) runs before the decimal-point rewrite (5), so both
//! `3.14` and `۳.۱۴` come out as `۳٫۱۴`. Only a period between two digits is
//! rewritten to `٫`; any other single period is sentence punctuation and is
//! dropped in step 6. Periods and digits are exempt from step 4, so a dot run
//! still reaches step 5 whatever the threshold.
//!
//! Steps 8 and 9 look through `«` and `»` around a word, so a quoted
//! `"میدونم"` still gets its half-space.

use crate::cache::WordCache;
use crate::config::NormalizerConfig;
use crate::error::{NormalizeError, Result};
use crate::rules::{
    is_arabic_script, NormalizationRules, CLOSE_QUOTE, DECIMAL_SEPARATOR, ELLIPSIS, OPEN_QUOTE,
    ZWNJ,
};
use log::debug;
use regex::Regex;
use std::borrow::Cow;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

lazy_static::lazy_static! {
    static ref RE_QUOTE_PAIR: Regex = Regex::new(r#""([^"]*)""#).unwrap();
    static ref RE_DOT_RUN: Regex = Regex::new(r"\.{2,}").unwrap();
}

/// Normalizes words and sentences against a fixed rule set.
///
/// Single words go through a bounded LRU cache owned by the instance; the
/// cache is the only mutable state, so a `Normalizer` can be shared across
/// threads by reference.
#[derive(Debug)]
pub struct Normalizer {
    rules: Arc<NormalizationRules>,
    cache: WordCache,
}

impl Normalizer {
    pub fn new(rules: NormalizationRules, cache_capacity: usize) -> Self {
        Self::with_shared_rules(Arc::new(rules), cache_capacity)
    }

    pub fn with_shared_rules(rules: Arc<NormalizationRules>, cache_capacity: usize) -> Self {
        debug!(
            "normalizer ready: repeat threshold {}, cache capacity {}",
            rules.repeat_threshold(),
            cache_capacity
        );
        Normalizer {
            rules,
            cache: WordCache::new(cache_capacity),
        }
    }

    pub fn from_config(config: &NormalizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.build_rules(), config.cache_capacity))
    }

    pub fn rules(&self) -> &NormalizationRules {
        &self.rules
    }

    pub fn cache(&self) -> &WordCache {
        &self.cache
    }

    pub fn reset_cache(&self) {
        self.cache.clear();
    }

    /// Normalizes a single token, memoized on the raw input.
    ///
    /// NFKC, diacritic removal, digit conversion, punctuation and whitespace
    /// removal (ZWNJ survives), lowercase. Unlike sentences, non-Arabic
    /// letters are kept: `"TEST!"` becomes `"test"`.
    pub fn normalize_word(&self, word: &str) -> String {
        if word.is_empty() {
            return String::new();
        }
        self.cache.get_or_insert_with(word, |w| normalize_word_with(&self.rules, w))
    }

    /// Same as [`normalize_word`](Self::normalize_word) but never touches the cache.
    pub fn normalize_word_uncached(&self, word: &str) -> String {
        normalize_word_with(&self.rules, word)
    }

    pub fn normalize_sentence(&self, text: &str) -> String {
        normalize_sentence_with(&self.rules, text)
    }

    /// Byte-level entry point: rejects input that is not UTF-8 text.
    pub fn try_normalize_word(&self, raw: &[u8]) -> Result<String> {
        let word = std::str::from_utf8(raw).map_err(|e| NormalizeError::invalid_utf8(None, e))?;
        Ok(self.normalize_word(word))
    }

    pub fn try_normalize_sentence(&self, raw: &[u8]) -> Result<String> {
        let text = std::str::from_utf8(raw).map_err(|e| NormalizeError::invalid_utf8(None, e))?;
        Ok(self.normalize_sentence(text))
    }

    /// Normalized sentence split on whitespace.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.normalize_sentence(text)
            .split_whitespace()
            .map(|w| w.to_string())
            .collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer::new(
            NormalizationRules::default(),
            crate::cache::DEFAULT_CACHE_CAPACITY,
        )
    }
}

pub fn normalize_word_with(rules: &NormalizationRules, word: &str) -> String {
    let s: String = word
        .nfkc()
        .filter(|&c| !rules.is_diacritic(c))
        .map(|c| rules.map_char(c))
        .filter(|&c| !(rules.is_deleted(c) || c.is_whitespace()))
        .collect();
    s.to_lowercase()
}

pub fn normalize_sentence_with(rules: &NormalizationRules, text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let s: String = text.to_lowercase().nfkc().collect();
    let s = strip_diacritics(rules, &s);
    let s = convert_script(rules, &s);
    let s = collapse_repeats(&s, rules.repeat_threshold());
    let s = substitute_punctuation(&s);
    let s = filter_chars(rules, &s);

    let mut words: Vec<String> = s
        .split_whitespace()
        .map(tidy_joiners)
        .filter(|w| !w.is_empty())
        .map(|w| attach_prefix(rules, w))
        .collect();
    attach_suffixes(rules, &mut words);

    words.join(" ")
}

fn strip_diacritics(rules: &NormalizationRules, s: &str) -> String {
    s.chars().filter(|&c| !rules.is_diacritic(c)).collect()
}

fn convert_script(rules: &NormalizationRules, s: &str) -> String {
    s.chars().map(|c| rules.map_char(c)).collect()
}

/// Shortens every run of `threshold` or more identical characters to
/// `threshold - 1`. Digits and periods are never collapsed.
pub fn collapse_repeats(s: &str, threshold: usize) -> String {
    let keep = threshold.saturating_sub(1).max(1);
    let mut out = String::with_capacity(s.len());
    let mut last: Option<char> = None;
    let mut run = 0usize;

    for c in s.chars() {
        if Some(c) == last {
            run += 1;
        } else {
            last = Some(c);
            run = 1;
        }
        if run <= keep || c == '.' || c.is_numeric() {
            out.push(c);
        }
    }
    out
}

fn substitute_punctuation(s: &str) -> String {
    let replacement = format!("{OPEN_QUOTE}${{1}}{CLOSE_QUOTE}");
    let quoted = RE_QUOTE_PAIR.replace_all(s, replacement.as_str());
    let dotted = RE_DOT_RUN.replace_all(&quoted, ELLIPSIS.to_string().as_str());
    mark_decimal_points(dotted)
}

// A '.' with a digit on both sides is a decimal point.
fn mark_decimal_points(s: Cow<'_, str>) -> String {
    if !s.contains('.') {
        return s.into_owned();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    for (i, &c) in chars.iter().enumerate() {
        let is_decimal = c == '.'
            && i > 0
            && chars[i - 1].is_numeric()
            && chars.get(i + 1).map_or(false, |n| n.is_numeric());
        out.push(if is_decimal { DECIMAL_SEPARATOR } else { c });
    }
    out
}

fn filter_chars(rules: &NormalizationRules, s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            c if c.is_whitespace() => out.push(' '),
            c if rules.is_protected(c) => out.push(c),
            c if rules.is_deleted(c) => {}
            c if is_arabic_script(c) => out.push(c),
            _ => {}
        }
    }
    out
}

// Drops half-spaces at the edges of a word and squeezes repeated ones.
fn tidy_joiners(word: &str) -> String {
    if !word.contains(ZWNJ) {
        return word.to_string();
    }
    word.split(ZWNJ)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(&ZWNJ.to_string())
}

/// Splits a word into its leading `«` run, the bare word, and its trailing
/// `»` run.
fn split_quotes(word: &str) -> (&str, &str, &str) {
    let core = word.trim_start_matches(OPEN_QUOTE);
    let lead = &word[..word.len() - core.len()];
    let bare = core.trim_end_matches(CLOSE_QUOTE);
    let trail = &core[bare.len()..];
    (lead, bare, trail)
}

fn attach_prefix(rules: &NormalizationRules, word: String) -> String {
    let (lead, bare, trail) = split_quotes(&word);
    for prefix in rules.prefixes() {
        if let Some(rest) = bare.strip_prefix(prefix.as_str()) {
            if rest.is_empty() || rest.starts_with(ZWNJ) {
                return word;
            }
            let mut joined = String::with_capacity(word.len() + ZWNJ.len_utf8());
            joined.push_str(lead);
            joined.push_str(prefix);
            joined.push(ZWNJ);
            joined.push_str(rest);
            joined.push_str(trail);
            return joined;
        }
    }
    word
}

fn is_suffix_chain(rules: &NormalizationRules, word: &str) -> bool {
    let (_, bare, _) = split_quotes(word);
    bare.split(ZWNJ).all(|part| rules.is_suffix(part))
}

// `«کتاب` + `ها»` -> `«کتاب‌ها»`; quotes around the suffix move to the edges
// of the merged word.
fn merge_suffix(host: &str, tail: &str) -> String {
    let (host_lead, host_bare, host_trail) = split_quotes(host);
    let (tail_lead, tail_bare, tail_trail) = split_quotes(tail);
    let mut merged = String::with_capacity(host.len() + tail.len() + ZWNJ.len_utf8());
    merged.push_str(host_lead);
    merged.push_str(tail_lead);
    merged.push_str(host_bare);
    merged.push(ZWNJ);
    merged.push_str(tail_bare);
    merged.push_str(host_trail);
    merged.push_str(tail_trail);
    merged
}

/// Merges each bound suffix into the word before it, scanning right to left
/// so a chain like `کتاب ها ای` ends up as one word.
fn attach_suffixes(rules: &NormalizationRules, words: &mut Vec<String>) {
    let mut i = words.len();
    while i > 1 {
        i -= 1;
        if is_suffix_chain(rules, &words[i]) {
            let tail = words.remove(i);
            let merged = merge_suffix(&words[i - 1], &tail);
            words[i - 1] = merged;
        }
    }
}
