use std::collections::BTreeMap;

use parity_audit_core::ScanStats;

use crate::json::{
    JsonCategory, JsonDuplicateGroup, JsonDuplicateMember, JsonMissingTest, JsonOrphanedFile,
    JsonParityReport, JsonSummary, JsonSymbolCollision, JsonTestRef, JsonWarning,
};

pub(crate) fn format_scan_stats(stats: &ScanStats) -> String {
    let mut out = String::new();
    out.push_str("== scan stats ==\n");
    out.push_str(&format!(
        "candidates={} scanned={} bytes={}\n",
        stats.candidate_files, stats.scanned_files, stats.scanned_bytes
    ));

    let mut skips: Vec<(&str, u64)> = vec![
        ("not_found", stats.skipped_not_found),
        ("permission_denied", stats.skipped_permission_denied),
        ("too_large", stats.skipped_too_large),
        ("binary", stats.skipped_binary),
        ("undecodable", stats.skipped_undecodable),
        ("walk_errors", stats.skipped_walk_errors),
    ];
    skips.retain(|(_, v)| *v > 0);
    if !skips.is_empty() {
        out.push_str("skipped:\n");
        for (k, v) in skips {
            out.push_str(&format!("- {k}={v}\n"));
        }
    }
    out.push('\n');
    out
}

fn manifest_label(summary: &JsonSummary) -> String {
    match summary.manifest.as_str() {
        "parsed" => format!("parsed ({} entries)", summary.manifest_entries),
        other => other.to_string(),
    }
}

fn test_label(test: &JsonTestRef) -> String {
    if test.suite.is_empty() {
        test.name.clone()
    } else {
        format!("{}.{}", test.suite, test.name)
    }
}

pub(crate) fn format_text_summary(summary: &JsonSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "reference: files={} tests={}\n",
        summary.reference_files, summary.reference_tests
    ));
    out.push_str(&format!(
        "candidate: files={} tests={}\n",
        summary.candidate_files, summary.candidate_tests
    ));
    out.push_str(&format!(
        "coverage: {}/{} ({:.1}%)\n",
        summary.covered_tests, summary.reference_tests, summary.coverage_percent
    ));
    out.push_str(&format!("missing tests: {}\n", summary.missing_tests));
    out.push_str(&format!(
        "duplicate groups: {} (critical: {})\n",
        summary.duplicate_groups, summary.critical_groups
    ));
    out.push_str(&format!("orphaned files: {}\n", summary.orphaned_files));
    out.push_str(&format!("symbol collisions: {}\n", summary.symbol_collisions));
    out.push_str(&format!("manifest: {}\n", manifest_label(summary)));
    out.push_str(&format!("warnings: {}\n", summary.warnings));
    out
}

pub(crate) fn format_text_categories(categories: &[JsonCategory]) -> String {
    let mut out = String::new();
    out.push_str(&format!("categories: {}\n", categories.len()));
    for c in categories {
        out.push_str(&format!(
            "- {}: {}/{} ({:.1}%) candidate_tests={}\n",
            c.name, c.covered, c.reference_tests, c.coverage_percent, c.candidate_tests
        ));
    }
    out
}

pub(crate) fn format_text_missing(missing: &[JsonMissingTest]) -> String {
    let mut out = String::new();
    out.push_str(&format!("missing tests: {}\n", missing.len()));
    for m in missing {
        out.push_str(&format!(
            "- [{}] {} ({})\n",
            m.category,
            test_label(&m.test),
            m.test.path
        ));
    }
    out
}

pub(crate) fn format_text_duplicates(groups: &[JsonDuplicateGroup]) -> String {
    let mut out = String::new();
    out.push_str(&format!("duplicate groups: {}\n", groups.len()));
    for group in groups {
        out.push('\n');
        out.push_str(&format!(
            "{}.{} severity={} max_similarity={:.2} files={}\n",
            group.base_name,
            group.extension,
            group.severity,
            group.max_similarity,
            group.members.len()
        ));
        match (&group.canonical.path, &group.canonical.rule) {
            (Some(path), Some(rule)) => {
                out.push_str(&format!("canonical: {path} ({rule})\n"));
            }
            _ => out.push_str(&format!(
                "canonical: ambiguous between {}\n",
                group.canonical.tied.join(", ")
            )),
        }
        for m in &group.members {
            let mut line = format!(
                "- {} status={} functions={} types={} lines={}",
                m.path, m.build_status, m.function_count, m.type_count, m.code_lines
            );
            for marker in member_markers(m) {
                line.push(' ');
                line.push_str(marker);
            }
            out.push_str(&line);
            out.push('\n');
        }
        for pair in &group.pairs {
            out.push_str(&format!(
                "  similarity {:.2}: {} <-> {}\n",
                pair.similarity, pair.left, pair.right
            ));
        }
        for r in &group.recommendations {
            out.push_str(&format!("  {}: {}\n", r.action, r.path));
        }
    }
    out
}

/// Unfinished-work flags of a duplicate member, in display order.
fn member_markers(m: &JsonDuplicateMember) -> Vec<&'static str> {
    let mut markers = Vec::new();
    if m.has_stub_markers {
        markers.push("stub");
    }
    if m.has_todo_markers {
        markers.push("todo");
    }
    markers
}

pub(crate) fn format_text_orphans(orphans: &[JsonOrphanedFile]) -> String {
    let mut out = String::new();
    out.push_str(&format!("orphaned files: {}\n", orphans.len()));
    for o in orphans {
        out.push_str(&format!(
            "- {} [{}] lines={}\n",
            o.path, o.category, o.code_lines
        ));
    }
    out
}

pub(crate) fn format_text_collisions(collisions: &[JsonSymbolCollision]) -> String {
    let mut out = String::new();
    out.push_str(&format!("symbol collisions: {}\n", collisions.len()));
    for c in collisions {
        out.push_str(&format!("- {} {}: {}\n", c.kind, c.name, c.paths.join(", ")));
    }
    out
}

pub(crate) fn format_text_warnings(warnings: &[JsonWarning]) -> String {
    let mut out = String::new();
    out.push_str(&format!("warnings: {}\n", warnings.len()));
    for w in warnings {
        out.push_str(&format!("- [{}] {}: {}\n", w.corpus, w.path, w.reason));
    }
    out
}

pub(crate) fn format_text_report(report: &JsonParityReport) -> String {
    let sections: [(&str, String); 7] = [
        ("summary", format_text_summary(&report.summary)),
        ("categories", format_text_categories(&report.categories)),
        ("missing tests", format_text_missing(&report.missing_tests)),
        ("duplicate groups", format_text_duplicates(&report.duplicate_groups)),
        ("orphaned files", format_text_orphans(&report.orphaned_files)),
        ("symbol collisions", format_text_collisions(&report.symbol_collisions)),
        ("warnings", format_text_warnings(&report.warnings)),
    ];

    let mut out = String::new();
    for (title, body) in sections {
        out.push_str(&format!("== {title} ==\n"));
        out.push_str(body.trim_end());
        out.push_str("\n\n");
    }
    out
}

fn status_glyph(percent: f64) -> &'static str {
    if percent >= 90.0 {
        "✅"
    } else if percent >= 70.0 {
        "⚠️"
    } else {
        "❌"
    }
}

fn md_escape(text: &str) -> String {
    text.replace('|', "\\|")
}

pub(crate) fn format_markdown_report(report: &JsonParityReport) -> String {
    let s = &report.summary;
    let mut out = String::new();
    out.push_str("# Test Parity Report\n\n");

    out.push_str("## Executive Summary\n\n");
    out.push_str("| Metric | Value |\n|---|---|\n");
    out.push_str(&format!("| Reference tests | {} |\n", s.reference_tests));
    out.push_str(&format!("| Candidate tests | {} |\n", s.candidate_tests));
    out.push_str(&format!("| Covered | {} |\n", s.covered_tests));
    out.push_str(&format!("| Missing | {} |\n", s.missing_tests));
    out.push_str(&format!(
        "| Coverage | {:.1}% {} |\n",
        s.coverage_percent,
        status_glyph(s.coverage_percent)
    ));
    out.push_str(&format!(
        "| Duplicate groups | {} ({} critical) |\n",
        s.duplicate_groups, s.critical_groups
    ));
    out.push_str(&format!("| Orphaned files | {} |\n", s.orphaned_files));
    out.push_str(&format!("| Build manifest | {} |\n", manifest_label(s)));
    out.push('\n');

    out.push_str("## Coverage by Category\n\n");
    out.push_str("| Category | Reference | Covered | Missing | Candidate | Coverage | Status |\n");
    out.push_str("|---|---:|---:|---:|---:|---:|---|\n");
    for c in &report.categories {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.1}% | {} |\n",
            md_escape(&c.name),
            c.reference_tests,
            c.covered,
            c.missing,
            c.candidate_tests,
            c.coverage_percent,
            status_glyph(c.coverage_percent)
        ));
    }
    out.push('\n');

    if !report.missing_tests.is_empty() {
        out.push_str("## Missing Tests\n\n");
        let mut by_category: BTreeMap<&str, Vec<&JsonMissingTest>> = BTreeMap::new();
        for m in &report.missing_tests {
            by_category.entry(m.category.as_str()).or_default().push(m);
        }
        for (category, tests) in by_category {
            out.push_str(&format!("### {category} ({})\n\n", tests.len()));
            for m in tests {
                out.push_str(&format!("- `{}` ({})\n", test_label(&m.test), m.test.path));
            }
            out.push('\n');
        }
    }

    if !report.duplicate_groups.is_empty() {
        out.push_str("## Duplicate Implementations\n\n");
        for g in &report.duplicate_groups {
            out.push_str(&format!(
                "### `{}.{}` ({})\n\n",
                g.base_name, g.extension, g.severity
            ));
            out.push_str("| File | Build | Functions | Types | Lines | Markers |\n");
            out.push_str("|---|---|---:|---:|---:|---|\n");
            for m in &g.members {
                let keep = g.canonical.path.as_deref() == Some(m.path.as_str());
                let markers = member_markers(m);
                out.push_str(&format!(
                    "| `{}`{} | {} | {} | {} | {} | {} |\n",
                    m.path,
                    if keep { " (keep)" } else { "" },
                    m.build_status,
                    m.function_count,
                    m.type_count,
                    m.code_lines,
                    if markers.is_empty() { "-".to_string() } else { markers.join(", ") }
                ));
            }
            out.push('\n');
            if g.canonical.path.is_none() {
                out.push_str("Canonical file is ambiguous; pick one manually.\n\n");
            }
            for r in &g.recommendations {
                out.push_str(&format!("- {} `{}`\n", r.action, r.path));
            }
            if !g.recommendations.is_empty() {
                out.push('\n');
            }
        }
    }

    if !report.orphaned_files.is_empty() {
        out.push_str("## Orphaned Files\n\n");
        for o in &report.orphaned_files {
            out.push_str(&format!("- `{}` ({} lines)\n", o.path, o.code_lines));
        }
        out.push('\n');
    }

    out
}

/// Removal lines stay commented out; the script only lists candidates.
pub(crate) fn format_cleanup_script(groups: &[JsonDuplicateGroup]) -> String {
    let mut out = String::new();
    out.push_str("#!/bin/bash\n");
    out.push_str("# Duplicate implementation cleanup\n");
    out.push_str("# Paths are relative to the candidate root. Review, then uncomment.\n\n");
    for group in groups {
        let removals: Vec<&str> = group
            .recommendations
            .iter()
            .filter(|r| r.action == "remove")
            .map(|r| r.path.as_str())
            .collect();
        if removals.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "# {}.{} (keep: {})\n",
            group.base_name,
            group.extension,
            group.canonical.path.as_deref().unwrap_or("undecided")
        ));
        for path in removals {
            out.push_str(&format!("# rm {path}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::{JsonCanonical, JsonRecommendation, JsonSimilarityPair};

    fn summary(covered: usize, total: usize) -> JsonSummary {
        JsonSummary {
            reference_files: 2,
            candidate_files: 3,
            reference_tests: total,
            candidate_tests: 4,
            covered_tests: covered,
            missing_tests: total - covered,
            coverage_percent: if total == 0 {
                100.0
            } else {
                covered as f64 * 100.0 / total as f64
            },
            duplicate_groups: 1,
            critical_groups: 0,
            orphaned_files: 1,
            symbol_collisions: 0,
            warnings: 0,
            manifest: "parsed".to_string(),
            manifest_entries: 7,
        }
    }

    fn group() -> JsonDuplicateGroup {
        JsonDuplicateGroup {
            base_name: "widget".to_string(),
            extension: "cpp".to_string(),
            severity: "major".to_string(),
            max_similarity: 0.8,
            canonical: JsonCanonical {
                path: Some("src/widget.cpp".to_string()),
                rule: Some("undecorated".to_string()),
                tied: Vec::new(),
            },
            members: vec![
                JsonDuplicateMember {
                    path: "src/widget.cpp".to_string(),
                    build_status: "active".to_string(),
                    function_count: 4,
                    type_count: 1,
                    code_lines: 40,
                    decorated: false,
                    has_stub_markers: false,
                    has_todo_markers: false,
                },
                JsonDuplicateMember {
                    path: "src/widget_old.cpp".to_string(),
                    build_status: "orphaned".to_string(),
                    function_count: 2,
                    type_count: 1,
                    code_lines: 20,
                    decorated: true,
                    has_stub_markers: true,
                    has_todo_markers: true,
                },
            ],
            pairs: vec![JsonSimilarityPair {
                left: "src/widget.cpp".to_string(),
                right: "src/widget_old.cpp".to_string(),
                similarity: 0.8,
            }],
            recommendations: vec![
                JsonRecommendation {
                    action: "remove".to_string(),
                    path: "src/widget_old.cpp".to_string(),
                },
                JsonRecommendation {
                    action: "complete".to_string(),
                    path: "src/widget_old.cpp".to_string(),
                },
            ],
        }
    }

    fn report() -> JsonParityReport {
        JsonParityReport {
            summary: summary(3, 4),
            categories: vec![
                JsonCategory {
                    name: "io".to_string(),
                    reference_tests: 4,
                    covered: 3,
                    missing: 1,
                    candidate_tests: 4,
                    coverage_percent: 75.0,
                },
                JsonCategory {
                    name: "net".to_string(),
                    reference_tests: 0,
                    covered: 0,
                    missing: 0,
                    candidate_tests: 1,
                    coverage_percent: 100.0,
                },
            ],
            mappings: Vec::new(),
            missing_tests: vec![JsonMissingTest {
                category: "io".to_string(),
                test: JsonTestRef {
                    path: "io/WidgetTests.cs".to_string(),
                    suite: "WidgetTests".to_string(),
                    name: "TestSize".to_string(),
                },
            }],
            duplicate_groups: vec![group()],
            orphaned_files: vec![JsonOrphanedFile {
                path: "src/widget_old.cpp".to_string(),
                category: "src".to_string(),
                code_lines: 20,
            }],
            symbol_collisions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn scan_stats_only_list_nonzero_skips() {
        let stats = ScanStats {
            candidate_files: 3,
            scanned_files: 2,
            scanned_bytes: 10,
            skipped_undecodable: 1,
            ..ScanStats::default()
        };
        let text = format_scan_stats(&stats);
        assert!(text.contains("candidates=3 scanned=2 bytes=10"));
        assert!(text.contains("- undecodable=1"));
        assert!(!text.contains("binary"));
    }

    #[test]
    fn text_report_has_every_section() {
        let text = format_text_report(&report());
        for title in [
            "== summary ==",
            "== categories ==",
            "== missing tests ==",
            "== duplicate groups ==",
            "== orphaned files ==",
            "== symbol collisions ==",
            "== warnings ==",
        ] {
            assert!(text.contains(title), "missing {title}");
        }
        assert!(text.contains("coverage: 3/4 (75.0%)"));
        assert!(text.contains("manifest: parsed (7 entries)"));
        assert!(text.contains("- [io] WidgetTests.TestSize (io/WidgetTests.cs)"));
        assert!(text.contains("canonical: src/widget.cpp (undecorated)"));
        assert!(text.contains("  remove: src/widget_old.cpp"));
        assert!(text.contains("- src/widget.cpp status=active functions=4 types=1 lines=40\n"));
        assert!(text.contains("lines=20 stub todo\n"));
    }

    #[test]
    fn ambiguous_canonical_lists_ties() {
        let mut g = group();
        g.canonical = JsonCanonical {
            path: None,
            rule: None,
            tied: vec!["a/widget.cpp".to_string(), "b/widget.cpp".to_string()],
        };
        let text = format_text_duplicates(&[g]);
        assert!(text.contains("canonical: ambiguous between a/widget.cpp, b/widget.cpp"));
    }

    #[test]
    fn markdown_uses_status_glyphs() {
        assert_eq!(status_glyph(95.0), "✅");
        assert_eq!(status_glyph(90.0), "✅");
        assert_eq!(status_glyph(70.0), "⚠️");
        assert_eq!(status_glyph(69.9), "❌");

        let md = format_markdown_report(&report());
        assert!(md.starts_with("# Test Parity Report\n"));
        assert!(md.contains("| Coverage | 75.0% ⚠️ |"));
        assert!(md.contains("| io | 4 | 3 | 1 | 4 | 75.0% | ⚠️ |"));
        assert!(md.contains("| net | 0 | 0 | 0 | 1 | 100.0% | ✅ |"));
        assert!(md.contains("### io (1)"));
        assert!(md.contains("- `WidgetTests.TestSize` (io/WidgetTests.cs)"));
        assert!(md.contains("| `src/widget.cpp` (keep) | active | 4 | 1 | 40 | - |"));
        assert!(md.contains("| `src/widget_old.cpp` | orphaned | 2 | 1 | 20 | stub, todo |"));
        assert!(md.contains("## Orphaned Files"));
    }

    #[test]
    fn markdown_skips_empty_sections() {
        let mut r = report();
        r.missing_tests.clear();
        r.duplicate_groups.clear();
        r.orphaned_files.clear();
        let md = format_markdown_report(&r);
        assert!(!md.contains("## Missing Tests"));
        assert!(!md.contains("## Duplicate Implementations"));
        assert!(!md.contains("## Orphaned Files"));
    }

    #[test]
    fn cleanup_script_comments_out_removals() {
        let script = format_cleanup_script(&[group()]);
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("# widget.cpp (keep: src/widget.cpp)\n"));
        assert!(script.contains("# rm src/widget_old.cpp\n"));
        assert!(!script.lines().any(|l| l.starts_with("rm ")));
        assert_eq!(script.matches("# rm ").count(), 1);
    }
}
