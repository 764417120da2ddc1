mod model;
mod util;


use crate::category::CategoryClassifier;
use crate::context::AnalysisContext;
use crate::duplicates::{Severity, find_symbol_collisions, group_duplicates};
use crate::error::AnalysisError;
use crate::extract::LexicalExtractor;
use crate::manifest::BuildManifest;
use crate::matcher::{CoverageMatcher, candidate_tests_per_category};
use crate::scan::{scan_corpus_with_extractor, validate_root};
use crate::types::{AnalysisInput, AnalysisOptions, Corpus, ScanOutcome};

pub use model::{
    CategoryCoverage, Finding, MissingTest, OrphanedFile, ParityReport, ReportSummary,
};

pub fn generate_parity_report(
    input: &AnalysisInput,
    options: &AnalysisOptions,
) -> Result<ParityReport, AnalysisError> {
    Ok(generate_parity_report_with_stats(input, options)?.result)
}

pub fn generate_parity_report_with_stats(
    input: &AnalysisInput,
    options: &AnalysisOptions,
) -> Result<ScanOutcome<ParityReport>, AnalysisError> {
    generate_parity_report_with_classifier(input, options, &options.category_rules)
}

/// Runs the whole analysis with a caller-supplied category classifier.
///
/// Configuration is checked before any file is read. After that, problems
/// with individual files only produce warnings.
pub fn generate_parity_report_with_classifier(
    input: &AnalysisInput,
    options: &AnalysisOptions,
    classifier: &dyn CategoryClassifier,
) -> Result<ScanOutcome<ParityReport>, AnalysisError> {
    options.validate()?;
    validate_root(&input.reference.root)?;
    validate_root(&input.candidate.root)?;
    let reference_extractor = LexicalExtractor::new(&input.reference.test_style)?;
    let candidate_extractor = LexicalExtractor::new(&input.candidate.test_style)?;

    let mut ctx = AnalysisContext::new(options);
    ctx.warnings.extend(input.manifest_warnings.iter().cloned());
    let reference = scan_corpus_with_extractor(
        &input.reference,
        Corpus::Reference,
        options,
        classifier,
        &reference_extractor,
        &mut ctx,
    )?;
    let candidate = scan_corpus_with_extractor(
        &input.candidate,
        Corpus::Candidate,
        options,
        classifier,
        &candidate_extractor,
        &mut ctx,
    )?;

    let manifest = BuildManifest::from_text(input.manifest.as_deref(), &input.candidate.extensions);
    tracing::debug!(status = ?manifest.status(), "build manifest");

    let matcher = CoverageMatcher::new(ctx.normalizer(), options, &candidate);
    let mappings = matcher.map_coverage(&reference);
    let categories = util::category_rows(&mappings, &candidate_tests_per_category(&candidate));
    let missing_tests = util::missing_tests(&mappings);
    let duplicate_groups = group_duplicates(&candidate, &manifest, options.similarity_threshold);
    let orphaned_files = util::orphaned_files(&candidate, &manifest);
    let symbol_collisions =
        find_symbol_collisions(&candidate, options.function_collision_min_files);

    let reference_tests = mappings.len();
    let covered_tests = reference_tests - missing_tests.len();
    let summary = ReportSummary {
        reference_files: reference.units.len(),
        candidate_files: candidate.units.len(),
        reference_tests,
        candidate_tests: candidate.tests().count(),
        covered_tests,
        missing_tests: missing_tests.len(),
        coverage_percent: util::percent(covered_tests, reference_tests),
        duplicate_groups: duplicate_groups.len(),
        critical_groups: duplicate_groups
            .iter()
            .filter(|g| g.severity == Severity::Critical)
            .count(),
        orphaned_files: orphaned_files.len(),
        symbol_collisions: symbol_collisions.len(),
        warnings: ctx.warnings.len(),
        manifest: manifest.status(),
    };
    tracing::info!(
        coverage = format_args!("{:.1}", summary.coverage_percent),
        covered = summary.covered_tests,
        missing = summary.missing_tests,
        duplicate_groups = summary.duplicate_groups,
        orphaned = summary.orphaned_files,
        "analysis finished"
    );

    Ok(ScanOutcome {
        result: ParityReport {
            summary,
            categories,
            mappings,
            missing_tests,
            duplicate_groups,
            orphaned_files,
            symbol_collisions,
            warnings: ctx.warnings,
        },
        stats: ctx.stats,
    })
}
