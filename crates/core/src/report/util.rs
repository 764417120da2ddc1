use std::collections::BTreeMap;

use crate::manifest::{BuildManifest, BuildStatus};
use crate::matcher::CoverageMapping;
use crate::types::CorpusScan;

use super::model::{CategoryCoverage, MissingTest, OrphanedFile};

pub(super) fn percent(covered: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    covered as f64 * 100.0 / total as f64
}

fn category_row<'a>(
    rows: &'a mut BTreeMap<String, CategoryCoverage>,
    name: &str,
) -> &'a mut CategoryCoverage {
    rows.entry(name.to_lowercase())
        .or_insert_with(|| CategoryCoverage {
            name: name.to_string(),
            reference_tests: 0,
            covered: 0,
            missing: 0,
            candidate_tests: 0,
            coverage_percent: 0.0,
        })
}

pub(super) fn category_rows(
    mappings: &[CoverageMapping],
    candidate_counts: &BTreeMap<String, usize>,
) -> Vec<CategoryCoverage> {
    // Keyed by lowercased name; the first reference spelling is displayed.
    let mut rows: BTreeMap<String, CategoryCoverage> = BTreeMap::new();
    for mapping in mappings {
        let row = category_row(&mut rows, &mapping.category);
        row.reference_tests += 1;
        if mapping.is_covered() {
            row.covered += 1;
        }
    }
    for (category, count) in candidate_counts {
        category_row(&mut rows, category).candidate_tests += *count;
    }

    rows.into_values()
        .map(|mut row| {
            row.missing = row.reference_tests - row.covered;
            row.coverage_percent = percent(row.covered, row.reference_tests);
            row
        })
        .collect()
}

pub(super) fn missing_tests(mappings: &[CoverageMapping]) -> Vec<MissingTest> {
    mappings
        .iter()
        .filter(|m| !m.is_covered())
        .map(|m| MissingTest {
            category: m.category.clone(),
            test: m.reference.clone(),
        })
        .collect()
}

pub(super) fn orphaned_files(
    candidate: &CorpusScan,
    manifest: &BuildManifest,
) -> Vec<OrphanedFile> {
    candidate
        .units
        .iter()
        .filter(|u| !u.in_test_tree && manifest.status_of(&u.file_name) == BuildStatus::Orphaned)
        .map(|u| OrphanedFile {
            path: u.rel_path.clone(),
            file_name: u.file_name.clone(),
            category: u.category.clone(),
            code_lines: u.code_lines,
        })
        .collect()
}
