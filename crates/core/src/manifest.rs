use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::scan::{collect_files, make_rel_path, read_source_text};
use crate::types::{Corpus, ScanStats, ScanWarning};

pub const DEFAULT_MANIFEST_NAMES: &[&str] = &["CMakeLists.txt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildStatus {
    Active,
    Orphaned,
    /// No usable manifest; nothing can be said about the file.
    Unknown,
}

impl BuildStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Orphaned => "orphaned",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestStatus {
    NotProvided,
    /// Text was given but no file name could be found in it.
    Malformed,
    Parsed { entries: usize },
}

/// File names referenced by build configuration text.
///
/// Parsing is a token scan for file-name shaped substrings, not a build-system
/// parser. Entries are compared by base name, so `${SRC}/io/widget.cpp` marks
/// every `widget.cpp` in the corpus as active. Files whose extension never
/// appears in the manifest (headers, usually) stay `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildManifest {
    entries: Vec<String>,
    lookup: BTreeSet<String>,
    extensions: BTreeSet<String>,
    status: ManifestStatus,
}

fn regex_file_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\w${}./\\+-]*?([\w+-]+\.([A-Za-z0-9]+))\b").unwrap())
}

impl BuildManifest {
    pub fn not_provided() -> Self {
        Self {
            entries: Vec::new(),
            lookup: BTreeSet::new(),
            extensions: BTreeSet::new(),
            status: ManifestStatus::NotProvided,
        }
    }

    /// Collects file-name tokens whose extension is in `extensions`
    /// (case-insensitive, leading dot optional). An empty list accepts any
    /// extension.
    pub fn parse(text: &str, extensions: &[String]) -> Self {
        let mut entries = Vec::new();
        let mut lookup = BTreeSet::new();
        let mut seen_extensions = BTreeSet::new();
        for caps in regex_file_token().captures_iter(text) {
            let (Some(name), Some(ext)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let accepted = extensions.is_empty()
                || extensions
                    .iter()
                    .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext.as_str()));
            if !accepted {
                continue;
            }
            seen_extensions.insert(ext.as_str().to_ascii_lowercase());
            if lookup.insert(name.as_str().to_string()) {
                entries.push(name.as_str().to_string());
            }
        }

        let status = if entries.is_empty() {
            ManifestStatus::Malformed
        } else {
            ManifestStatus::Parsed {
                entries: entries.len(),
            }
        };
        Self {
            entries,
            lookup,
            extensions: seen_extensions,
            status,
        }
    }

    pub fn from_text(text: Option<&str>, extensions: &[String]) -> Self {
        match text {
            Some(text) => Self::parse(text, extensions),
            None => Self::not_provided(),
        }
    }

    pub fn status(&self) -> ManifestStatus {
        self.status
    }

    /// Referenced file names in first-seen order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn status_of(&self, file_name: &str) -> BuildStatus {
        if !matches!(self.status, ManifestStatus::Parsed { .. }) {
            return BuildStatus::Unknown;
        }
        if self.lookup.contains(file_name) {
            return BuildStatus::Active;
        }
        let mentioned = file_name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| self.extensions.contains(&ext.to_ascii_lowercase()));
        if mentioned {
            BuildStatus::Orphaned
        } else {
            BuildStatus::Unknown
        }
    }
}

/// Manifest text gathered from a candidate tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredManifests {
    /// `None` when no manifest file could be read.
    pub text: Option<String>,
    /// Manifest files that were found but skipped.
    pub warnings: Vec<ScanWarning>,
}

/// Concatenates every manifest file named in `names` under `root`, in sorted
/// path order. A manifest that cannot be read is skipped with a warning, so
/// one broken file leaves the rest usable.
pub fn discover_manifest_text(
    root: &Path,
    names: &[&str],
    exclude_dirs: &HashSet<String>,
    respect_gitignore: bool,
    max_file_size: Option<u64>,
) -> DiscoveredManifests {
    let mut stats = ScanStats::default();
    let paths = collect_files(root, exclude_dirs, respect_gitignore, &mut stats, |path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| names.contains(&n))
    });
    tracing::debug!(root = %root.display(), found = paths.len(), "manifest discovery");

    let mut discovered = DiscoveredManifests::default();
    let mut text = String::new();
    let mut read_any = false;
    for path in paths {
        match read_source_text(&path, max_file_size, &mut stats) {
            Ok(chunk) => {
                text.push_str(&chunk);
                text.push('\n');
                read_any = true;
            }
            Err(kind) => {
                let rel = make_rel_path(root, &path);
                tracing::warn!(path = %rel, reason = %kind, "skipping build manifest");
                discovered.warnings.push(ScanWarning {
                    corpus: Corpus::Candidate,
                    path: rel,
                    kind,
                });
            }
        }
    }
    if read_any {
        discovered.text = Some(text);
    }
    discovered
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;
    use crate::types::WarningKind;

    fn temp_dir(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be monotonic")
            .as_nanos();
        let mut p = std::env::temp_dir();
        p.push(format!("parity_audit_manifest_{suffix}_{nanos}"));
        p
    }

    fn cpp_exts() -> Vec<String> {
        vec!["cpp".to_string(), "h".to_string()]
    }

    #[test]
    fn parses_sources_from_cmake_text() {
        let text = r#"
cmake_minimum_required(VERSION 3.16)
project(node CXX)
add_library(core
    src/io/widget_complete.cpp
    ${CMAKE_CURRENT_SOURCE_DIR}/src/rpc/server.cpp
    include/widget.h
    README.md)
set(EXTRA "src\\win\\shim.CPP")
"#;
        let manifest = BuildManifest::parse(text, &cpp_exts());
        assert_eq!(
            manifest.entries(),
            ["widget_complete.cpp", "server.cpp", "widget.h", "shim.CPP"]
        );
        assert_eq!(manifest.status(), ManifestStatus::Parsed { entries: 4 });
        assert_eq!(manifest.status_of("widget_complete.cpp"), BuildStatus::Active);
        assert_eq!(manifest.status_of("widget.cpp"), BuildStatus::Orphaned);
        assert_eq!(manifest.status_of("widget.hpp"), BuildStatus::Unknown);
    }

    #[test]
    fn manifest_without_file_names_is_malformed() {
        let manifest = BuildManifest::parse("project(foo)\nadd_subdirectory(src)\n", &cpp_exts());
        assert_eq!(manifest.status(), ManifestStatus::Malformed);
        assert_eq!(manifest.status_of("widget.cpp"), BuildStatus::Unknown);
    }

    #[test]
    fn missing_manifest_is_unknown() {
        let manifest = BuildManifest::from_text(None, &cpp_exts());
        assert_eq!(manifest.status(), ManifestStatus::NotProvided);
        assert_eq!(manifest.status_of("widget.cpp"), BuildStatus::Unknown);
    }

    #[test]
    fn empty_extension_list_accepts_any_file_name() {
        let manifest = BuildManifest::parse("sources = a.cc b.mm notes", &[]);
        assert_eq!(manifest.entries(), ["a.cc", "b.mm"]);
    }

    #[test]
    fn unreadable_manifest_is_skipped_with_a_warning() {
        let root = temp_dir("mixed");
        fs::create_dir_all(root.join("src/legacy")).unwrap();
        fs::write(
            root.join("src/CMakeLists.txt"),
            "add_library(core io/widget.cpp rpc/server.cpp)\n",
        )
        .unwrap();
        fs::write(root.join("src/legacy/CMakeLists.txt"), [0xff, 0xfe, b'x']).unwrap();

        let discovered =
            discover_manifest_text(&root, DEFAULT_MANIFEST_NAMES, &HashSet::new(), false, None);
        let text = discovered.text.expect("the readable manifest is kept");
        let manifest = BuildManifest::parse(&text, &cpp_exts());
        assert_eq!(manifest.entries(), ["widget.cpp", "server.cpp"]);
        assert_eq!(
            discovered.warnings,
            [ScanWarning {
                corpus: Corpus::Candidate,
                path: "src/legacy/CMakeLists.txt".to_string(),
                kind: WarningKind::Undecodable,
            }]
        );

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn no_readable_manifest_yields_no_text() {
        let root = temp_dir("none");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/main.cpp"), "int main() {}\n").unwrap();

        let discovered =
            discover_manifest_text(&root, DEFAULT_MANIFEST_NAMES, &HashSet::new(), false, None);
        assert_eq!(discovered, DiscoveredManifests::default());

        fs::write(root.join("CMakeLists.txt"), [0xffu8, 0xfe]).unwrap();
        let discovered =
            discover_manifest_text(&root, DEFAULT_MANIFEST_NAMES, &HashSet::new(), false, None);
        assert_eq!(discovered.text, None);
        assert_eq!(discovered.warnings.len(), 1);

        let _ = fs::remove_dir_all(&root);
    }
}
