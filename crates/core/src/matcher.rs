use std::collections::BTreeMap;
use std::fmt;

use crate::naming::NameNormalizer;
use crate::types::{AnalysisOptions, CorpusScan, TestCase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchMethod {
    Exact,
    Substring,
    Synonym,
}

impl MatchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Substring => "substring",
            Self::Synonym => "synonym",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A test identified by file, suite and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestRef {
    pub path: String,
    pub suite: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMatch {
    pub test: TestRef,
    pub method: MatchMethod,
}

/// One reference test and every candidate test judged equivalent to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageMapping {
    pub category: String,
    pub reference: TestRef,
    pub matches: Vec<CandidateMatch>,
}

impl CoverageMapping {
    pub fn is_covered(&self) -> bool {
        !self.matches.is_empty()
    }
}

#[derive(Debug)]
struct CandidateKey {
    test: TestRef,
    /// Lowercased; `Cryptography/` and `cryptography/` are one category.
    category_key: String,
    compact: String,
    without_fillers: String,
}

/// Maps reference tests onto candidate tests by normalized name.
///
/// Each reference test is tried against every candidate in tiers: all exact
/// hits, else all substring hits, else all synonym hits. Several candidates
/// may cover the same reference test.
#[derive(Debug)]
pub struct CoverageMatcher<'a> {
    normalizer: &'a NameNormalizer,
    synonyms: Vec<(String, String)>,
    min_substring_len: usize,
    within_category: bool,
    candidates: Vec<CandidateKey>,
}

impl<'a> CoverageMatcher<'a> {
    pub fn new(
        normalizer: &'a NameNormalizer,
        options: &AnalysisOptions,
        candidate: &CorpusScan,
    ) -> Self {
        let candidates = candidate
            .units
            .iter()
            .flat_map(|unit| {
                unit.tests.iter().map(|t| CandidateKey {
                    test: TestRef {
                        path: unit.rel_path.clone(),
                        suite: t.suite.clone(),
                        name: t.name.clone(),
                    },
                    category_key: unit.category.to_lowercase(),
                    compact: normalizer.compact(&t.name),
                    without_fillers: normalizer.strip_fillers(&t.name),
                })
            })
            .collect();

        Self {
            normalizer,
            synonyms: options
                .synonym_table
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
                .collect(),
            min_substring_len: options.min_substring_len,
            within_category: options.match_within_category,
            candidates,
        }
    }

    /// Candidate tests matching a reference test name, using the best tier
    /// that produced any hit.
    pub fn match_test(&self, name: &str, category: &str) -> Vec<CandidateMatch> {
        let compact = self.normalizer.compact(name);
        let without_fillers = self.normalizer.strip_fillers(name);
        let category_key = category.to_lowercase();
        let pool: Vec<&CandidateKey> = self
            .candidates
            .iter()
            .filter(|c| !self.within_category || c.category_key == category_key)
            .collect();

        let tiers: [(MatchMethod, &dyn Fn(&CandidateKey) -> bool); 3] = [
            (MatchMethod::Exact, &|c| !compact.is_empty() && c.compact == compact),
            (MatchMethod::Substring, &|c| {
                self.substring_match(&without_fillers, &c.without_fillers)
            }),
            (MatchMethod::Synonym, &|c| self.synonym_match(&compact, &c.compact)),
        ];

        for (method, is_hit) in tiers {
            let hits: Vec<CandidateMatch> = pool
                .iter()
                .filter(|c| is_hit(**c))
                .map(|c| CandidateMatch {
                    test: c.test.clone(),
                    method,
                })
                .collect();
            if !hits.is_empty() {
                return hits;
            }
        }
        Vec::new()
    }

    fn substring_match(&self, a: &str, b: &str) -> bool {
        if a.is_empty() || b.is_empty() {
            return false;
        }
        let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        short.len() >= self.min_substring_len && long.contains(short)
    }

    fn synonym_match(&self, reference: &str, candidate: &str) -> bool {
        self.synonyms
            .iter()
            .any(|(key, stem)| {
                reference.contains(key.as_str()) && candidate.contains(stem.as_str())
            })
    }

    /// One mapping per reference test, sorted by category (ignoring case),
    /// path, suite, name.
    pub fn map_coverage(&self, reference: &CorpusScan) -> Vec<CoverageMapping> {
        let mut mappings: Vec<CoverageMapping> = reference
            .units
            .iter()
            .flat_map(|unit| {
                unit.tests.iter().map(move |t: &TestCase| CoverageMapping {
                    category: unit.category.clone(),
                    reference: TestRef {
                        path: unit.rel_path.clone(),
                        suite: t.suite.clone(),
                        name: t.name.clone(),
                    },
                    matches: self.match_test(&t.name, &unit.category),
                })
            })
            .collect();
        mappings.sort_by(|a, b| {
            a.category
                .to_lowercase()
                .cmp(&b.category.to_lowercase())
                .then_with(|| a.category.cmp(&b.category))
                .then_with(|| a.reference.cmp(&b.reference))
        });
        mappings
    }
}

/// Candidate test count per category.
pub(crate) fn candidate_tests_per_category(candidate: &CorpusScan) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for unit in &candidate.units {
        if !unit.tests.is_empty() {
            *counts.entry(unit.category.clone()).or_insert(0) += unit.tests.len();
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use crate::types::{Corpus, SourceUnit, UnitId};

    fn unit(rel_path: &str, category: &str, tests: &[(&str, &str)]) -> SourceUnit {
        SourceUnit {
            path: PathBuf::from(rel_path),
            rel_path: rel_path.to_string(),
            file_name: rel_path.rsplit('/').next().unwrap_or(rel_path).to_string(),
            corpus: Corpus::Candidate,
            category: category.to_string(),
            size_bytes: 0,
            line_count: 0,
            code_lines: 0,
            base_name: String::new(),
            decorated: false,
            in_test_tree: true,
            functions: BTreeSet::new(),
            types: BTreeSet::new(),
            tests: tests
                .iter()
                .map(|(suite, name)| TestCase {
                    name: name.to_string(),
                    suite: suite.to_string(),
                    unit: UnitId(0),
                    corpus: Corpus::Candidate,
                })
                .collect(),
            tokens: BTreeSet::new(),
            has_stub_markers: false,
            has_todo_markers: false,
        }
    }

    fn scan(units: Vec<SourceUnit>) -> CorpusScan {
        CorpusScan {
            corpus: Corpus::Candidate,
            root: PathBuf::from("/candidate"),
            units,
        }
    }

    fn names(hits: &[CandidateMatch]) -> Vec<(&str, MatchMethod)> {
        hits.iter().map(|h| (h.test.name.as_str(), h.method)).collect()
    }

    #[test]
    fn exact_match_ignores_test_prefix_and_case() {
        let options = AnalysisOptions::default();
        let normalizer = NameNormalizer::new(&options);
        let candidate = scan(vec![unit(
            "tests/io/io_tests.cpp",
            "io",
            &[("IOTest", "SerializeEmptyArray"), ("IOTest", "SerializeEmptyArrayTwice")],
        )]);
        let matcher = CoverageMatcher::new(&normalizer, &options, &candidate);
        let hits = matcher.match_test("TestSerializeEmptyArray", "IO");
        assert_eq!(names(&hits), [("SerializeEmptyArray", MatchMethod::Exact)]);
    }

    #[test]
    fn substring_tier_strips_fillers_on_both_sides() {
        let options = AnalysisOptions::default();
        let normalizer = NameNormalizer::new(&options);
        let candidate = scan(vec![unit(
            "tests/crypto.cpp",
            "crypto",
            &[("Crypto", "VerifySignatureTest"), ("Crypto", "Ab")],
        )]);
        let matcher = CoverageMatcher::new(&normalizer, &options, &candidate);
        assert_eq!(
            names(&matcher.match_test("UT_VerifySignature_Valid", "Cryptography")),
            [("VerifySignatureTest", MatchMethod::Substring)]
        );
        assert_eq!(
            names(&matcher.match_test("TestVerifySignature", "Cryptography")),
            [("VerifySignatureTest", MatchMethod::Substring)]
        );
        // "ab" is shorter than the minimum substring length.
        assert!(matcher.match_test("TestAbc", "Cryptography").is_empty());
    }

    #[test]
    fn synonym_tier_uses_stems() {
        let options = AnalysisOptions::default();
        let normalizer = NameNormalizer::new(&options);
        let candidate = scan(vec![unit(
            "tests/ledger.cpp",
            "ledger",
            &[("Ledger", "BlockVerification")],
        )]);
        let matcher = CoverageMatcher::new(&normalizer, &options, &candidate);
        assert_eq!(
            names(&matcher.match_test("TestVerifyBlock", "Ledger")),
            [("BlockVerification", MatchMethod::Synonym)]
        );
    }

    #[test]
    fn within_category_restricts_the_pool() {
        let options = AnalysisOptions {
            match_within_category: true,
            ..AnalysisOptions::default()
        };
        let normalizer = NameNormalizer::new(&options);
        let candidate = scan(vec![
            unit("tests/a/x.cpp", "a", &[("A", "Parse")]),
            unit("tests/b/y.cpp", "b", &[("B", "Parse")]),
        ]);
        let matcher = CoverageMatcher::new(&normalizer, &options, &candidate);
        let hits = matcher.match_test("TestParse", "b");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].test.path, "tests/b/y.cpp");
    }

    #[test]
    fn within_category_ignores_directory_case() {
        let options = AnalysisOptions {
            match_within_category: true,
            ..AnalysisOptions::default()
        };
        let normalizer = NameNormalizer::new(&options);
        let candidate = scan(vec![unit(
            "tests/cryptography/crypto_tests.cpp",
            "cryptography",
            &[("Crypto", "VerifySignature")],
        )]);
        let matcher = CoverageMatcher::new(&normalizer, &options, &candidate);
        assert_eq!(
            names(&matcher.match_test("TestVerifySignature", "Cryptography")),
            [("VerifySignature", MatchMethod::Exact)]
        );
        assert!(matcher.match_test("TestVerifySignature", "Network").is_empty());
    }

    #[test]
    fn map_coverage_is_sorted_and_partitions() {
        let options = AnalysisOptions::default();
        let normalizer = NameNormalizer::new(&options);
        let candidate = scan(vec![unit("tests/io.cpp", "io", &[("IO", "Read")])]);
        let mut reference = scan(vec![
            unit("Ledger/UT_Block.cs", "Ledger", &[("UT_Block", "TestHeader")]),
            unit(
                "IO/UT_Reader.cs",
                "IO",
                &[("UT_Reader", "TestRead"), ("UT_Reader", "TestAbsent")],
            ),
        ]);
        reference.corpus = Corpus::Reference;
        let matcher = CoverageMatcher::new(&normalizer, &options, &candidate);
        let mappings = matcher.map_coverage(&reference);
        let order: Vec<(&str, &str, bool)> = mappings
            .iter()
            .map(|m| (m.category.as_str(), m.reference.name.as_str(), m.is_covered()))
            .collect();
        assert_eq!(
            order,
            [
                ("IO", "TestAbsent", false),
                ("IO", "TestRead", true),
                ("Ledger", "TestHeader", false),
            ]
        );
    }

    #[test]
    fn candidate_counts_per_category() {
        let candidate = scan(vec![
            unit("tests/io.cpp", "io", &[("IO", "A"), ("IO", "B")]),
            unit("src/io.cpp", "src", &[]),
        ]);
        let counts = candidate_tests_per_category(&candidate);
        assert_eq!(counts.get("io"), Some(&2));
        assert!(!counts.contains_key("src"));
    }
}
