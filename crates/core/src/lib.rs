mod category;
mod context;
mod duplicates;
mod error;
mod extract;
mod lexical;
mod manifest;
mod matcher;
mod naming;
mod report;
mod scan;
mod types;

pub use category::{CategoryClassifier, ROOT_CATEGORY};
pub use context::AnalysisContext;
pub use duplicates::{
    CanonicalChoice, DuplicateGroup, DuplicateMember, Recommendation, SelectionRule, Severity,
    SimilarityPair, SymbolCollision, SymbolKind, find_symbol_collisions, group_duplicates,
    jaccard_similarity, select_canonical,
};
pub use error::AnalysisError;
pub use extract::{ExtractedTest, LexicalExtractor, Signature, SignatureExtractor};
pub use lexical::{collapse_whitespace, strip_comments, token_set};
pub use manifest::{
    BuildManifest, BuildStatus, DEFAULT_MANIFEST_NAMES, DiscoveredManifests, ManifestStatus,
    discover_manifest_text,
};
pub use matcher::{CandidateMatch, CoverageMapping, CoverageMatcher, MatchMethod, TestRef};
pub use naming::NameNormalizer;
pub use report::{
    CategoryCoverage, Finding, MissingTest, OrphanedFile, ParityReport, ReportSummary,
    generate_parity_report, generate_parity_report_with_classifier,
    generate_parity_report_with_stats,
};
pub use scan::{scan_corpus, scan_corpus_with_extractor};
pub use types::{
    AnalysisInput, AnalysisOptions, CategoryRules, Corpus, CorpusScan, CorpusSpec,
    DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_SIMILARITY_THRESHOLD, KeywordRule, ScanOutcome,
    ScanStats, ScanWarning, SourceUnit, TestCase, TestStyle, UnitId, WarningKind,
    default_ignore_dirs, default_suffix_decorations, default_synonym_table,
};
