use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;

use crate::error::AnalysisError;

pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Corpus {
    Reference,
    Candidate,
}

impl Corpus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Candidate => "candidate",
        }
    }
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a corpus spells its test cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStyle {
    /// `[TestMethod] public void Name()`; the suite is the enclosing class.
    AttributeMarked { markers: Vec<String> },
    /// `TEST_F(Suite, Name)`; suite and name are the first two arguments.
    MacroCall { macros: Vec<String> },
}

impl TestStyle {
    pub fn attribute_default() -> Self {
        Self::AttributeMarked {
            markers: ["TestMethod", "DataTestMethod", "Test", "Fact", "Theory"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn macro_default() -> Self {
        Self::MacroCall {
            macros: ["TEST", "TEST_F", "TEST_P"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    pub(crate) fn marker_names(&self) -> &[String] {
        match self {
            Self::AttributeMarked { markers } => markers,
            Self::MacroCall { macros } => macros,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorpusSpec {
    pub root: PathBuf,
    /// Extension allow-list without the leading dot. Empty accepts every file.
    pub extensions: Vec<String>,
    pub exclude_dirs: HashSet<String>,
    pub test_style: TestStyle,
}

impl CorpusSpec {
    pub fn reference(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: vec!["cs".to_string()],
            exclude_dirs: default_ignore_dirs(),
            test_style: TestStyle::attribute_default(),
        }
    }

    pub fn candidate(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: ["cpp", "cc", "cxx", "h", "hpp", "hh"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            exclude_dirs: default_ignore_dirs(),
            test_style: TestStyle::macro_default(),
        }
    }

    pub(crate) fn accepts_extension(&self, ext: Option<&str>) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let Some(ext) = ext else {
            return false;
        };
        self.extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub reference: CorpusSpec,
    pub candidate: CorpusSpec,
    /// Build configuration text (for example concatenated `CMakeLists.txt` files).
    pub manifest: Option<String>,
    /// Manifest files skipped while gathering `manifest`; they are reported
    /// alongside the scan warnings.
    pub manifest_warnings: Vec<ScanWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    pub needle: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryRules {
    /// Bucket by the immediate parent directory name.
    ParentDirectory,
    /// First rule whose needle occurs in the lower-cased relative path wins.
    Keywords {
        rules: Vec<KeywordRule>,
        fallback: String,
    },
}

impl CategoryRules {
    /// Keyword buckets for a blockchain node's functional areas, falling back
    /// to `Other`. Rules are tried in order, so the short `io` needle claims
    /// any path containing it before the later areas are checked.
    pub fn area_keywords() -> Self {
        let table: &[(&[&str], &str)] = &[
            (&["cryptography"], "Cryptography"),
            (&["io"], "IO"),
            (&["ledger", "blockchain"], "Ledger"),
            (&["network", "p2p"], "Network"),
            (&["persistence", "storage"], "Persistence"),
            (&["smartcontract", "vm"], "SmartContract"),
            (&["wallet"], "Wallet"),
            (&["consensus"], "Consensus"),
            (&["native"], "NativeContracts"),
            (&["rpc"], "RPC"),
            (&["json"], "Json"),
            (&["extension", "misc"], "Extensions"),
        ];
        let rules = table
            .iter()
            .flat_map(|(needles, category)| {
                needles.iter().map(move |needle| KeywordRule {
                    needle: needle.to_string(),
                    category: category.to_string(),
                })
            })
            .collect();
        Self::Keywords {
            rules,
            fallback: "Other".to_string(),
        }
    }

    /// Replaces the keyword fallback; directory bucketing has none.
    pub fn with_fallback(self, fallback: String) -> Self {
        match self {
            Self::Keywords { rules, .. } => Self::Keywords { rules, fallback },
            Self::ParentDirectory => Self::ParentDirectory,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub similarity_threshold: f64,
    pub suffix_decorations: BTreeSet<String>,
    pub prefix_markers: BTreeSet<String>,
    pub filler_tokens: BTreeSet<String>,
    pub synonym_table: BTreeMap<String, String>,
    pub category_rules: CategoryRules,
    /// Directory names holding tests; skipped by the implementation-duplicate pass.
    pub test_dir_names: HashSet<String>,
    pub max_file_size: Option<u64>,
    pub respect_gitignore: bool,
    pub match_within_category: bool,
    pub min_substring_len: usize,
    pub function_collision_min_files: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            suffix_decorations: default_suffix_decorations(),
            prefix_markers: string_set(&["ut", "test", "tests"]),
            filler_tokens: string_set(&["test", "tests", "ut"]),
            synonym_table: default_synonym_table(),
            category_rules: CategoryRules::ParentDirectory,
            test_dir_names: string_set(&["test", "tests", "unit_tests", "unittests"])
                .into_iter()
                .collect(),
            max_file_size: Some(DEFAULT_MAX_FILE_SIZE_BYTES),
            respect_gitignore: true,
            match_within_category: false,
            min_substring_len: 3,
            function_collision_min_files: 3,
        }
    }
}

impl AnalysisOptions {
    pub(crate) fn validate(&self) -> Result<(), AnalysisError> {
        if !self.similarity_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.similarity_threshold)
        {
            return Err(AnalysisError::invalid_option(
                "similarity_threshold",
                format!("must be within 0..1, got {}", self.similarity_threshold),
            ));
        }
        if self.function_collision_min_files < 2 {
            return Err(AnalysisError::invalid_option(
                "function_collision_min_files",
                "must be at least 2",
            ));
        }
        for (key, stem) in &self.synonym_table {
            if key.trim().is_empty() || stem.trim().is_empty() {
                return Err(AnalysisError::invalid_option(
                    "synonym_table",
                    "keys and stems must be non-empty",
                ));
            }
        }
        if let CategoryRules::Keywords { rules, .. } = &self.category_rules
            && rules.iter().any(|r| r.needle.is_empty())
        {
            return Err(AnalysisError::invalid_option(
                "category_rules",
                "keyword needles must be non-empty",
            ));
        }
        Ok(())
    }
}

pub fn default_ignore_dirs() -> HashSet<String> {
    [
        ".git",
        ".hg",
        ".svn",
        "node_modules",
        "target",
        "dist",
        "build",
        "out",
        "bin",
        "obj",
        ".cache",
        "vendor",
        "third_party",
        "thirdparty",
        "external",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

pub fn default_suffix_decorations() -> BTreeSet<String> {
    string_set(&[
        "complete",
        "minimal",
        "fixed",
        "broken",
        "simple",
        "full",
        "impl",
        "old",
        "new",
        "standalone",
        "stubs",
        "partial",
        "testnet",
    ])
}

pub fn default_synonym_table() -> BTreeMap<String, String> {
    [
        ("serialize", "serializ"),
        ("deserialize", "deserializ"),
        ("parse", "pars"),
        ("tostring", "tostring"),
        ("tohex", "tohex"),
        ("equals", "equal"),
        ("compare", "compar"),
        ("create", "creat"),
        ("verify", "verif"),
        ("sign", "sign"),
        ("hash", "hash"),
        ("encrypt", "encrypt"),
        ("decrypt", "decrypt"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn string_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    pub candidate_files: u64,
    pub scanned_files: u64,
    pub scanned_bytes: u64,
    pub skipped_not_found: u64,
    pub skipped_permission_denied: u64,
    pub skipped_too_large: u64,
    pub skipped_binary: u64,
    pub skipped_undecodable: u64,
    pub skipped_walk_errors: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome<T> {
    pub result: T,
    pub stats: ScanStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    Unreadable { message: String },
    Undecodable,
    Binary,
    TooLarge { size: u64 },
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable { message } => write!(f, "unreadable: {message}"),
            Self::Undecodable => f.write_str("not valid UTF-8"),
            Self::Binary => f.write_str("binary content"),
            Self::TooLarge { size } => write!(f, "too large ({size} bytes)"),
        }
    }
}

/// A file that was skipped; the run continues without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWarning {
    pub corpus: Corpus,
    pub path: String,
    pub kind: WarningKind,
}

/// Index of a [`SourceUnit`] inside its [`CorpusScan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub suite: String,
    pub unit: UnitId,
    pub corpus: Corpus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub path: PathBuf,
    /// Root-relative path with `/` separators.
    pub rel_path: String,
    pub file_name: String,
    pub corpus: Corpus,
    pub category: String,
    pub size_bytes: u64,
    pub line_count: usize,
    pub code_lines: usize,
    pub base_name: String,
    pub decorated: bool,
    pub in_test_tree: bool,
    pub functions: BTreeSet<String>,
    pub types: BTreeSet<String>,
    pub tests: Vec<TestCase>,
    pub tokens: BTreeSet<String>,
    pub has_stub_markers: bool,
    pub has_todo_markers: bool,
}

/// Every unit read from one corpus root, in sorted path order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusScan {
    pub corpus: Corpus,
    pub root: PathBuf,
    pub units: Vec<SourceUnit>,
}

impl CorpusScan {
    pub fn unit(&self, id: UnitId) -> &SourceUnit {
        &self.units[id.0]
    }

    pub fn tests(&self) -> impl Iterator<Item = &TestCase> {
        self.units.iter().flat_map(|u| u.tests.iter())
    }
}
