use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::manifest::{BuildManifest, BuildStatus};
use crate::types::{CorpusScan, SourceUnit};

/// Jaccard index over token sets. Two empty sets score 0.
pub fn jaccard_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let shared = small.iter().filter(|t| large.contains(*t)).count();
    let union = a.len() + b.len() - shared;
    shared as f64 / union as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityPair {
    pub left: String,
    pub right: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMember {
    pub path: String,
    pub file_name: String,
    pub build_status: BuildStatus,
    pub function_count: usize,
    pub type_count: usize,
    pub code_lines: usize,
    pub decorated: bool,
    pub has_stub_markers: bool,
    /// `TODO`, `FIXME` or `XXX` left in the file.
    pub has_todo_markers: bool,
}

impl DuplicateMember {
    fn from_unit(unit: &SourceUnit, manifest: &BuildManifest) -> Self {
        Self {
            path: unit.rel_path.clone(),
            file_name: unit.file_name.clone(),
            build_status: manifest.status_of(&unit.file_name),
            function_count: unit.functions.len(),
            type_count: unit.types.len(),
            code_lines: unit.code_lines,
            decorated: unit.decorated,
            has_stub_markers: unit.has_stub_markers,
            has_todo_markers: unit.has_todo_markers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRule {
    Undecorated,
    BuildActive,
    MostFunctions,
}

impl SelectionRule {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undecorated => "undecorated",
            Self::BuildActive => "build-active",
            Self::MostFunctions => "most-functions",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalChoice {
    Selected { path: String, rule: SelectionRule },
    /// Tie after every rule; needs a human decision.
    Ambiguous { tied: Vec<String> },
}

impl CanonicalChoice {
    pub fn selected_path(&self) -> Option<&str> {
        match self {
            Self::Selected { path, .. } => Some(path),
            Self::Ambiguous { .. } => None,
        }
    }

    fn keeps(&self, path: &str) -> bool {
        match self {
            Self::Selected { path: kept, .. } => kept == path,
            Self::Ambiguous { tied } => tied.iter().any(|t| t == path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    /// Not canonical and not built.
    Remove { path: String },
    /// Carries stub markers such as `NotImplementedException`.
    Complete { path: String },
}

impl Recommendation {
    pub fn path(&self) -> &str {
        match self {
            Self::Remove { path } | Self::Complete { path } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Minor,
    Major,
    /// At least two members are compiled into the build.
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub base_name: String,
    /// Lower-cased extension shared by every member.
    pub extension: String,
    /// Sorted by path.
    pub members: Vec<DuplicateMember>,
    /// Only pairs above the similarity threshold.
    pub pairs: Vec<SimilarityPair>,
    /// Highest score over every pair, reported or not.
    pub max_similarity: f64,
    pub canonical: CanonicalChoice,
    pub recommendations: Vec<Recommendation>,
    pub severity: Severity,
}

/// Picks the file to keep.
///
/// Rules in order: the only undecorated member (unless it is orphaned while
/// another member is built), the only build-active member, the member with
/// the most functions. A tie after the last rule is returned as ambiguous.
pub fn select_canonical(members: &[DuplicateMember]) -> CanonicalChoice {
    let selected = |m: &DuplicateMember, rule| CanonicalChoice::Selected {
        path: m.path.clone(),
        rule,
    };

    let any_active = members
        .iter()
        .any(|m| m.build_status == BuildStatus::Active);
    let undecorated: Vec<&DuplicateMember> = members.iter().filter(|m| !m.decorated).collect();
    if let [only] = undecorated.as_slice()
        && !(only.build_status == BuildStatus::Orphaned && any_active)
    {
        return selected(*only, SelectionRule::Undecorated);
    }

    let active: Vec<&DuplicateMember> = members
        .iter()
        .filter(|m| m.build_status == BuildStatus::Active)
        .collect();
    if let [only] = active.as_slice() {
        return selected(*only, SelectionRule::BuildActive);
    }
    let active_undecorated: Vec<&DuplicateMember> =
        active.iter().copied().filter(|m| !m.decorated).collect();
    if let [only] = active_undecorated.as_slice() {
        return selected(*only, SelectionRule::BuildActive);
    }

    let pool: Vec<&DuplicateMember> = if active.len() > 1 {
        active
    } else {
        members.iter().collect()
    };
    let Some(most) = pool.iter().map(|m| m.function_count).max() else {
        return CanonicalChoice::Ambiguous { tied: Vec::new() };
    };
    let leaders: Vec<&DuplicateMember> = pool
        .into_iter()
        .filter(|m| m.function_count == most)
        .collect();
    match leaders.as_slice() {
        [only] => selected(*only, SelectionRule::MostFunctions),
        tied => CanonicalChoice::Ambiguous {
            tied: tied.iter().map(|m| m.path.clone()).collect(),
        },
    }
}

fn recommendations(
    members: &[DuplicateMember],
    canonical: &CanonicalChoice,
) -> Vec<Recommendation> {
    let mut out = Vec::new();
    for member in members {
        if member.build_status == BuildStatus::Orphaned && !canonical.keeps(&member.path) {
            out.push(Recommendation::Remove {
                path: member.path.clone(),
            });
        }
        if member.has_stub_markers {
            out.push(Recommendation::Complete {
                path: member.path.clone(),
            });
        }
    }
    out
}

fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Clusters implementation files (outside test directories) that share a
/// normalized base name and extension. Groups are sorted by base name, then
/// extension; singletons are dropped.
pub fn group_duplicates(
    scan: &CorpusScan,
    manifest: &BuildManifest,
    similarity_threshold: f64,
) -> Vec<DuplicateGroup> {
    let mut buckets: BTreeMap<(String, String), Vec<&SourceUnit>> = BTreeMap::new();
    for unit in scan.units.iter().filter(|u| !u.in_test_tree) {
        buckets
            .entry((unit.base_name.clone(), extension_of(&unit.file_name)))
            .or_default()
            .push(unit);
    }

    buckets
        .into_iter()
        .filter(|(_, units)| units.len() >= 2)
        .map(|((base_name, extension), units)| {
            build_group(base_name, extension, &units, manifest, similarity_threshold)
        })
        .collect()
}

fn build_group(
    base_name: String,
    extension: String,
    units: &[&SourceUnit],
    manifest: &BuildManifest,
    similarity_threshold: f64,
) -> DuplicateGroup {
    let members: Vec<DuplicateMember> = units
        .iter()
        .map(|u| DuplicateMember::from_unit(u, manifest))
        .collect();

    let mut pairs = Vec::new();
    let mut max_similarity = 0.0f64;
    for (i, left) in units.iter().enumerate() {
        for right in &units[i + 1..] {
            let similarity = jaccard_similarity(&left.tokens, &right.tokens);
            max_similarity = max_similarity.max(similarity);
            if similarity > similarity_threshold {
                pairs.push(SimilarityPair {
                    left: left.rel_path.clone(),
                    right: right.rel_path.clone(),
                    similarity,
                });
            }
        }
    }

    let canonical = select_canonical(&members);
    let recommendations = recommendations(&members, &canonical);
    let active = members
        .iter()
        .filter(|m| m.build_status == BuildStatus::Active)
        .count();
    let severity = if active >= 2 {
        Severity::Critical
    } else if !pairs.is_empty() {
        Severity::Major
    } else {
        Severity::Minor
    };

    DuplicateGroup {
        base_name,
        extension,
        members,
        pairs,
        max_similarity,
        canonical,
        recommendations,
        severity,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SymbolKind {
    Type,
    Function,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Function => "function",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolCollision {
    pub kind: SymbolKind,
    pub name: String,
    pub paths: Vec<String>,
}

/// Types declared in two or more implementation files, and functions declared
/// in at least `function_min_files` of them.
pub fn find_symbol_collisions(
    scan: &CorpusScan,
    function_min_files: usize,
) -> Vec<SymbolCollision> {
    let mut seen: BTreeMap<(SymbolKind, &str), Vec<&str>> = BTreeMap::new();
    for unit in scan.units.iter().filter(|u| !u.in_test_tree) {
        for name in &unit.types {
            seen.entry((SymbolKind::Type, name.as_str()))
                .or_default()
                .push(unit.rel_path.as_str());
        }
        for name in &unit.functions {
            seen.entry((SymbolKind::Function, name.as_str()))
                .or_default()
                .push(unit.rel_path.as_str());
        }
    }

    seen.into_iter()
        .filter(|((kind, _), paths)| match kind {
            SymbolKind::Type => paths.len() >= 2,
            SymbolKind::Function => paths.len() >= function_min_files,
        })
        .map(|((kind, name), paths)| SymbolCollision {
            kind,
            name: name.to_string(),
            paths: paths.into_iter().map(str::to_string).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::collection::btree_set;
    use proptest::prelude::*;

    fn set(tokens: &[&str]) -> BTreeSet<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn member(
        path: &str,
        decorated: bool,
        status: BuildStatus,
        functions: usize,
    ) -> DuplicateMember {
        DuplicateMember {
            path: path.to_string(),
            file_name: path.rsplit('/').next().unwrap_or(path).to_string(),
            build_status: status,
            function_count: functions,
            type_count: 0,
            code_lines: 10,
            decorated,
            has_stub_markers: false,
            has_todo_markers: false,
        }
    }

    #[test]
    fn jaccard_basics() {
        assert_eq!(jaccard_similarity(&set(&[]), &set(&[])), 0.0);
        assert_eq!(jaccard_similarity(&set(&["a"]), &set(&[])), 0.0);
        assert_eq!(jaccard_similarity(&set(&["a", "b"]), &set(&["b", "c"])), 1.0 / 3.0);
        assert_eq!(jaccard_similarity(&set(&["a", "b"]), &set(&["c", "d"])), 0.0);
    }

    #[test]
    fn undecorated_member_wins_without_manifest() {
        let members = [
            member("io/widget.cpp", false, BuildStatus::Unknown, 1),
            member("io/widget_complete.cpp", true, BuildStatus::Unknown, 9),
        ];
        assert_eq!(
            select_canonical(&members),
            CanonicalChoice::Selected {
                path: "io/widget.cpp".to_string(),
                rule: SelectionRule::Undecorated,
            }
        );
    }

    #[test]
    fn orphaned_undecorated_member_yields_to_built_variant() {
        let members = [
            member("widget.cpp", false, BuildStatus::Orphaned, 4),
            member("widget_complete.cpp", true, BuildStatus::Active, 4),
            member("widget_minimal.cpp", true, BuildStatus::Orphaned, 2),
        ];
        let canonical = select_canonical(&members);
        assert_eq!(
            canonical,
            CanonicalChoice::Selected {
                path: "widget_complete.cpp".to_string(),
                rule: SelectionRule::BuildActive,
            }
        );
        assert_eq!(
            recommendations(&members, &canonical),
            [
                Recommendation::Remove {
                    path: "widget.cpp".to_string()
                },
                Recommendation::Remove {
                    path: "widget_minimal.cpp".to_string()
                },
            ]
        );
    }

    #[test]
    fn function_count_breaks_remaining_ties() {
        let members = [
            member("a/codec.cpp", false, BuildStatus::Unknown, 3),
            member("b/codec.cpp", false, BuildStatus::Unknown, 7),
        ];
        assert_eq!(
            select_canonical(&members),
            CanonicalChoice::Selected {
                path: "b/codec.cpp".to_string(),
                rule: SelectionRule::MostFunctions,
            }
        );
    }

    #[test]
    fn full_tie_is_ambiguous_and_kept() {
        let members = [
            member("codec_old.cpp", true, BuildStatus::Orphaned, 3),
            member("codec_new.cpp", true, BuildStatus::Orphaned, 3),
            member("codec_v2.cpp", true, BuildStatus::Orphaned, 1),
        ];
        let canonical = select_canonical(&members);
        assert_eq!(
            canonical,
            CanonicalChoice::Ambiguous {
                tied: vec!["codec_old.cpp".to_string(), "codec_new.cpp".to_string()],
            }
        );
        assert_eq!(
            recommendations(&members, &canonical),
            [Recommendation::Remove {
                path: "codec_v2.cpp".to_string()
            }]
        );
    }

    #[test]
    fn stub_members_get_completion_recommendation() {
        let mut stub = member("peer_stubs.cpp", true, BuildStatus::Active, 1);
        stub.has_stub_markers = true;
        let members = [member("peer.cpp", false, BuildStatus::Unknown, 2), stub];
        let canonical = select_canonical(&members);
        assert_eq!(
            recommendations(&members, &canonical),
            [Recommendation::Complete {
                path: "peer_stubs.cpp".to_string()
            }]
        );
    }

    proptest! {
        #[test]
        fn similarity_is_symmetric_and_reflexive(
            a in btree_set("[a-z]{1,4}", 0..12),
            b in btree_set("[a-z]{1,4}", 0..12),
        ) {
            let ab = jaccard_similarity(&a, &b);
            prop_assert_eq!(ab, jaccard_similarity(&b, &a));
            prop_assert!((0.0..=1.0).contains(&ab));
            if !a.is_empty() {
                prop_assert_eq!(jaccard_similarity(&a, &a), 1.0);
            }
        }
    }
}
