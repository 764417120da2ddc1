use crate::duplicates::{DuplicateGroup, Severity, SymbolCollision};
use crate::manifest::ManifestStatus;
use crate::matcher::{CoverageMapping, TestRef};
use crate::types::ScanWarning;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub reference_files: usize,
    pub candidate_files: usize,
    pub reference_tests: usize,
    pub candidate_tests: usize,
    pub covered_tests: usize,
    pub missing_tests: usize,
    /// 100 when there are no reference tests.
    pub coverage_percent: f64,
    pub duplicate_groups: usize,
    pub critical_groups: usize,
    pub orphaned_files: usize,
    pub symbol_collisions: usize,
    pub warnings: usize,
    pub manifest: ManifestStatus,
}

/// Coverage of one reporting bucket.
///
/// A category with no reference tests reports 100%: there is nothing in it
/// that could be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCoverage {
    pub name: String,
    pub reference_tests: usize,
    pub covered: usize,
    pub missing: usize,
    pub candidate_tests: usize,
    pub coverage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTest {
    pub category: String,
    pub test: TestRef,
}

/// A candidate implementation file the build manifest never mentions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanedFile {
    pub path: String,
    pub file_name: String,
    pub category: String,
    pub code_lines: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Finding<'a> {
    MissingTest(&'a MissingTest),
    DuplicateGroup(&'a DuplicateGroup),
    OrphanedFile(&'a OrphanedFile),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParityReport {
    pub summary: ReportSummary,
    /// Sorted by name.
    pub categories: Vec<CategoryCoverage>,
    /// One entry per reference test, sorted by category then test.
    pub mappings: Vec<CoverageMapping>,
    pub missing_tests: Vec<MissingTest>,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub orphaned_files: Vec<OrphanedFile>,
    pub symbol_collisions: Vec<SymbolCollision>,
    pub warnings: Vec<ScanWarning>,
}

impl ParityReport {
    /// Missing tests, then duplicate groups, then orphaned files, each in
    /// report order.
    pub fn findings(&self) -> Vec<Finding<'_>> {
        self.missing_tests
            .iter()
            .map(Finding::MissingTest)
            .chain(self.duplicate_groups.iter().map(Finding::DuplicateGroup))
            .chain(self.orphaned_files.iter().map(Finding::OrphanedFile))
            .collect()
    }

    pub fn is_critical(&self) -> bool {
        self.duplicate_groups
            .iter()
            .any(|g| g.severity == Severity::Critical)
    }

    pub fn coverage_below(&self, min_percent: f64) -> bool {
        self.summary.coverage_percent < min_percent
    }
}
