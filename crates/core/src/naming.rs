use std::collections::BTreeSet;
use std::path::Path;

use crate::types::AnalysisOptions;

const DELIMITER: &str = "_";

/// Maps identifiers and file names to comparison keys.
///
/// Keys are lower-case words joined by `_`. Words come from separator
/// characters (anything non-alphanumeric) and from camelCase / acronym
/// boundaries, so `IOHelper`, `io_helper` and `io-helper` share a key.
/// Prefix markers and suffix decorations are matched as whole words and
/// stripped repeatedly until nothing changes; a name is never stripped to
/// nothing. The output is a fixpoint, which makes `normalize` idempotent.
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    prefix_markers: Vec<Vec<String>>,
    suffix_decorations: Vec<Vec<String>>,
    filler_tokens: BTreeSet<String>,
}

#[derive(Debug)]
struct Stripped {
    words: Vec<String>,
    suffix_removed: bool,
}

impl NameNormalizer {
    pub fn new(options: &AnalysisOptions) -> Self {
        Self::from_parts(
            options.prefix_markers.iter().map(String::as_str),
            options.suffix_decorations.iter().map(String::as_str),
            options.filler_tokens.iter().map(String::as_str),
        )
    }

    pub fn from_parts<'a>(
        prefixes: impl IntoIterator<Item = &'a str>,
        suffixes: impl IntoIterator<Item = &'a str>,
        fillers: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let word_lists = |items: &mut dyn Iterator<Item = &'a str>| {
            let mut out: Vec<Vec<String>> = items
                .map(split_words)
                .filter(|words| !words.is_empty())
                .collect();
            // Longest first so `unit_test` wins over `unit`.
            out.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
            out.dedup();
            out
        };
        Self {
            prefix_markers: word_lists(&mut prefixes.into_iter()),
            suffix_decorations: word_lists(&mut suffixes.into_iter()),
            filler_tokens: fillers.into_iter().flat_map(split_words).collect(),
        }
    }

    pub fn normalize(&self, raw: &str) -> String {
        self.strip(split_words(raw)).words.join(DELIMITER)
    }

    /// Normalizes the file stem; the extension and any directories are dropped.
    pub fn normalize_file_name(&self, file_name: &str) -> String {
        self.normalize(file_stem(file_name))
    }

    /// True when the stem ends in a known decoration such as `_minimal` or `_v2`.
    pub fn is_decorated(&self, file_name: &str) -> bool {
        self.strip(split_words(file_stem(file_name))).suffix_removed
    }

    /// Normalized key with the delimiters removed.
    pub fn compact(&self, raw: &str) -> String {
        self.strip(split_words(raw)).words.concat()
    }

    /// Compact key with generic filler words (`test`, `ut`, ...) removed.
    pub fn strip_fillers(&self, raw: &str) -> String {
        self.strip(split_words(raw))
            .words
            .into_iter()
            .filter(|w| !self.filler_tokens.contains(w))
            .collect()
    }

    fn strip(&self, mut words: Vec<String>) -> Stripped {
        let mut suffix_removed = false;
        loop {
            if let Some(marker) = self
                .prefix_markers
                .iter()
                .find(|m| words.len() > m.len() && words.starts_with(m))
            {
                words.drain(..marker.len());
                continue;
            }
            if let Some(decoration) = self
                .suffix_decorations
                .iter()
                .find(|d| words.len() > d.len() && words.ends_with(d))
            {
                words.truncate(words.len() - decoration.len());
                suffix_removed = true;
                continue;
            }
            if words.len() > 1 && words.last().is_some_and(|w| is_version_word(w)) {
                words.pop();
                suffix_removed = true;
                continue;
            }
            break;
        }
        Stripped {
            words,
            suffix_removed,
        }
    }
}

fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

// `v2`, `v10`
fn is_version_word(word: &str) -> bool {
    let mut chars = word.chars();
    chars.next() == Some('v')
        && word.len() > 1
        && chars.all(|c| c.is_ascii_digit())
}

/// Splits on separators and camelCase boundaries, then lower-cases each word.
pub(crate) fn split_words(raw: &str) -> Vec<String> {
    let chars: Vec<char> = raw.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (idx, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            flush_word(&mut current, &mut words);
            continue;
        }
        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[idx - 1];
            let next_is_lower = chars.get(idx + 1).is_some_and(|c| c.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
                flush_word(&mut current, &mut words);
            }
        }
        current.extend(ch.to_lowercase().filter(|c| c.is_alphanumeric()));
    }
    flush_word(&mut current, &mut words);
    words
}

fn flush_word(current: &mut String, words: &mut Vec<String>) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn normalizer() -> NameNormalizer {
        NameNormalizer::new(&AnalysisOptions::default())
    }

    #[test]
    fn splits_camel_case_and_acronyms() {
        assert_eq!(split_words("SerializeEmptyArray"), ["serialize", "empty", "array"]);
        assert_eq!(split_words("IOHelper"), ["io", "helper"]);
        assert_eq!(split_words("rpc-server.v2"), ["rpc", "server", "v2"]);
        assert_eq!(split_words("Base58"), ["base58"]);
        assert_eq!(split_words("__"), Vec::<String>::new());
    }

    #[test]
    fn strips_test_markers_and_decorations() {
        let n = normalizer();
        assert_eq!(n.normalize("TestSerializeEmptyArray"), "serialize_empty_array");
        assert_eq!(n.normalize("UT_Verify"), "verify");
        assert_eq!(n.normalize("rpc_server_complete"), "rpc_server");
        assert_eq!(n.normalize("store-cache-fixed-v2"), "store_cache");
        assert_eq!(n.normalize_file_name("widget_minimal.cpp"), "widget");
        assert_eq!(n.normalize_file_name("src/Widget.cpp"), "widget");
    }

    #[test]
    fn testnet_variants_are_decorated() {
        let n = normalizer();
        assert_eq!(n.normalize_file_name("rpc_server_testnet.cpp"), "rpc_server");
        assert!(n.is_decorated("rpc_server_testnet.cpp"));
        assert!(!n.is_decorated("rpc_server.cpp"));
    }

    #[test]
    fn never_strips_to_empty() {
        let n = normalizer();
        assert_eq!(n.normalize("Test"), "test");
        assert_eq!(n.normalize("complete"), "complete");
        assert_eq!(n.normalize("v2"), "v2");
    }

    #[test]
    fn decoration_detection_uses_the_stem() {
        let n = normalizer();
        assert!(n.is_decorated("widget_complete.cpp"));
        assert!(n.is_decorated("widget_v3.cpp"));
        assert!(!n.is_decorated("widget.cpp"));
        assert!(!n.is_decorated("complete.cpp"));
    }

    #[test]
    fn compact_and_filler_keys() {
        let n = normalizer();
        assert_eq!(n.compact("Serialize_EmptyArray"), "serializeemptyarray");
        assert_eq!(n.strip_fillers("VerifyTest"), "verify");
        assert_eq!(n.strip_fillers("UT_Test"), "");
    }

    #[test]
    fn multi_word_markers_are_configurable() {
        let n = NameNormalizer::from_parts(["unit-test", "unit"], ["-OLD"], ["check"]);
        assert_eq!(n.normalize("UnitTestParser"), "parser");
        assert_eq!(n.normalize("unit_lexer_old"), "lexer");
        assert_eq!(n.strip_fillers("check_lexer"), "lexer");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in "[A-Za-z0-9_. -]{0,40}") {
            let n = normalizer();
            let once = n.normalize(&raw);
            prop_assert_eq!(n.normalize(&once), once.clone());
            let file_once = n.normalize_file_name(&raw);
            prop_assert_eq!(n.normalize(&file_once), file_once);
        }
    }
}
