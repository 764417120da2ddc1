use std::io;

use parity_audit_core::{
    CanonicalChoice, CategoryCoverage, CoverageMapping, DuplicateGroup, ManifestStatus,
    OrphanedFile, ParityReport, Recommendation, ReportSummary, ScanStats, ScanWarning,
    SymbolCollision, TestRef,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonScanStats {
    pub(crate) candidate_files: u64,
    pub(crate) scanned_files: u64,
    pub(crate) scanned_bytes: u64,
    pub(crate) skipped_not_found: u64,
    pub(crate) skipped_permission_denied: u64,
    pub(crate) skipped_too_large: u64,
    pub(crate) skipped_binary: u64,
    pub(crate) skipped_undecodable: u64,
    pub(crate) skipped_walk_errors: u64,
}

impl From<ScanStats> for JsonScanStats {
    fn from(stats: ScanStats) -> Self {
        Self {
            candidate_files: stats.candidate_files,
            scanned_files: stats.scanned_files,
            scanned_bytes: stats.scanned_bytes,
            skipped_not_found: stats.skipped_not_found,
            skipped_permission_denied: stats.skipped_permission_denied,
            skipped_too_large: stats.skipped_too_large,
            skipped_binary: stats.skipped_binary,
            skipped_undecodable: stats.skipped_undecodable,
            skipped_walk_errors: stats.skipped_walk_errors,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonSummary {
    pub(crate) reference_files: usize,
    pub(crate) candidate_files: usize,
    pub(crate) reference_tests: usize,
    pub(crate) candidate_tests: usize,
    pub(crate) covered_tests: usize,
    pub(crate) missing_tests: usize,
    pub(crate) coverage_percent: f64,
    pub(crate) duplicate_groups: usize,
    pub(crate) critical_groups: usize,
    pub(crate) orphaned_files: usize,
    pub(crate) symbol_collisions: usize,
    pub(crate) warnings: usize,
    pub(crate) manifest: String,
    pub(crate) manifest_entries: usize,
}

impl From<ReportSummary> for JsonSummary {
    fn from(s: ReportSummary) -> Self {
        let (manifest, manifest_entries) = match s.manifest {
            ManifestStatus::NotProvided => ("not-provided", 0),
            ManifestStatus::Malformed => ("malformed", 0),
            ManifestStatus::Parsed { entries } => ("parsed", entries),
        };
        Self {
            reference_files: s.reference_files,
            candidate_files: s.candidate_files,
            reference_tests: s.reference_tests,
            candidate_tests: s.candidate_tests,
            covered_tests: s.covered_tests,
            missing_tests: s.missing_tests,
            coverage_percent: s.coverage_percent,
            duplicate_groups: s.duplicate_groups,
            critical_groups: s.critical_groups,
            orphaned_files: s.orphaned_files,
            symbol_collisions: s.symbol_collisions,
            warnings: s.warnings,
            manifest: manifest.to_string(),
            manifest_entries,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonCategory {
    pub(crate) name: String,
    pub(crate) reference_tests: usize,
    pub(crate) covered: usize,
    pub(crate) missing: usize,
    pub(crate) candidate_tests: usize,
    pub(crate) coverage_percent: f64,
}

impl From<CategoryCoverage> for JsonCategory {
    fn from(c: CategoryCoverage) -> Self {
        Self {
            name: c.name,
            reference_tests: c.reference_tests,
            covered: c.covered,
            missing: c.missing,
            candidate_tests: c.candidate_tests,
            coverage_percent: c.coverage_percent,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonTestRef {
    pub(crate) path: String,
    pub(crate) suite: String,
    pub(crate) name: String,
}

impl From<TestRef> for JsonTestRef {
    fn from(t: TestRef) -> Self {
        Self {
            path: t.path,
            suite: t.suite,
            name: t.name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonCandidateMatch {
    pub(crate) test: JsonTestRef,
    pub(crate) method: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonMapping {
    pub(crate) category: String,
    pub(crate) reference: JsonTestRef,
    pub(crate) covered: bool,
    pub(crate) matches: Vec<JsonCandidateMatch>,
}

impl From<CoverageMapping> for JsonMapping {
    fn from(m: CoverageMapping) -> Self {
        Self {
            covered: m.is_covered(),
            category: m.category,
            reference: m.reference.into(),
            matches: m
                .matches
                .into_iter()
                .map(|c| JsonCandidateMatch {
                    test: c.test.into(),
                    method: c.method.as_str().to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonMissingTest {
    pub(crate) category: String,
    pub(crate) test: JsonTestRef,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonDuplicateMember {
    pub(crate) path: String,
    pub(crate) build_status: String,
    pub(crate) function_count: usize,
    pub(crate) type_count: usize,
    pub(crate) code_lines: usize,
    pub(crate) decorated: bool,
    pub(crate) has_stub_markers: bool,
    pub(crate) has_todo_markers: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonSimilarityPair {
    pub(crate) left: String,
    pub(crate) right: String,
    pub(crate) similarity: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonCanonical {
    /// `None` when the group is ambiguous.
    pub(crate) path: Option<String>,
    pub(crate) rule: Option<String>,
    pub(crate) tied: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonRecommendation {
    pub(crate) action: String,
    pub(crate) path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonDuplicateGroup {
    pub(crate) base_name: String,
    pub(crate) extension: String,
    pub(crate) severity: String,
    pub(crate) max_similarity: f64,
    pub(crate) canonical: JsonCanonical,
    pub(crate) members: Vec<JsonDuplicateMember>,
    pub(crate) pairs: Vec<JsonSimilarityPair>,
    pub(crate) recommendations: Vec<JsonRecommendation>,
}

impl From<DuplicateGroup> for JsonDuplicateGroup {
    fn from(g: DuplicateGroup) -> Self {
        let canonical = match g.canonical {
            CanonicalChoice::Selected { path, rule } => JsonCanonical {
                path: Some(path),
                rule: Some(rule.as_str().to_string()),
                tied: Vec::new(),
            },
            CanonicalChoice::Ambiguous { tied } => JsonCanonical {
                path: None,
                rule: None,
                tied,
            },
        };
        Self {
            base_name: g.base_name,
            extension: g.extension,
            severity: g.severity.as_str().to_string(),
            max_similarity: g.max_similarity,
            canonical,
            members: g
                .members
                .into_iter()
                .map(|m| JsonDuplicateMember {
                    path: m.path,
                    build_status: m.build_status.as_str().to_string(),
                    function_count: m.function_count,
                    type_count: m.type_count,
                    code_lines: m.code_lines,
                    decorated: m.decorated,
                    has_stub_markers: m.has_stub_markers,
                    has_todo_markers: m.has_todo_markers,
                })
                .collect(),
            pairs: g
                .pairs
                .into_iter()
                .map(|p| JsonSimilarityPair {
                    left: p.left,
                    right: p.right,
                    similarity: p.similarity,
                })
                .collect(),
            recommendations: g
                .recommendations
                .into_iter()
                .map(|r| match r {
                    Recommendation::Remove { path } => JsonRecommendation {
                        action: "remove".to_string(),
                        path,
                    },
                    Recommendation::Complete { path } => JsonRecommendation {
                        action: "complete".to_string(),
                        path,
                    },
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonOrphanedFile {
    pub(crate) path: String,
    pub(crate) category: String,
    pub(crate) code_lines: usize,
}

impl From<OrphanedFile> for JsonOrphanedFile {
    fn from(o: OrphanedFile) -> Self {
        Self {
            path: o.path,
            category: o.category,
            code_lines: o.code_lines,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonSymbolCollision {
    pub(crate) kind: String,
    pub(crate) name: String,
    pub(crate) paths: Vec<String>,
}

impl From<SymbolCollision> for JsonSymbolCollision {
    fn from(c: SymbolCollision) -> Self {
        Self {
            kind: c.kind.as_str().to_string(),
            name: c.name,
            paths: c.paths,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonWarning {
    pub(crate) corpus: String,
    pub(crate) path: String,
    pub(crate) reason: String,
}

impl From<ScanWarning> for JsonWarning {
    fn from(w: ScanWarning) -> Self {
        Self {
            corpus: w.corpus.as_str().to_string(),
            path: w.path,
            reason: w.kind.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonParityReport {
    pub(crate) summary: JsonSummary,
    pub(crate) categories: Vec<JsonCategory>,
    pub(crate) mappings: Vec<JsonMapping>,
    pub(crate) missing_tests: Vec<JsonMissingTest>,
    pub(crate) duplicate_groups: Vec<JsonDuplicateGroup>,
    pub(crate) orphaned_files: Vec<JsonOrphanedFile>,
    pub(crate) symbol_collisions: Vec<JsonSymbolCollision>,
    pub(crate) warnings: Vec<JsonWarning>,
}

pub(crate) fn map_report(report: ParityReport) -> JsonParityReport {
    JsonParityReport {
        summary: report.summary.into(),
        categories: report.categories.into_iter().map(Into::into).collect(),
        mappings: report.mappings.into_iter().map(Into::into).collect(),
        missing_tests: report
            .missing_tests
            .into_iter()
            .map(|m| JsonMissingTest {
                category: m.category,
                test: m.test.into(),
            })
            .collect(),
        duplicate_groups: report.duplicate_groups.into_iter().map(Into::into).collect(),
        orphaned_files: report.orphaned_files.into_iter().map(Into::into).collect(),
        symbol_collisions: report
            .symbol_collisions
            .into_iter()
            .map(Into::into)
            .collect(),
        warnings: report.warnings.into_iter().map(Into::into).collect(),
    }
}

pub(crate) fn write_json<T: Serialize>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::other(format!("json encode: {e}")))?;
    println!("{json}");
    Ok(())
}
