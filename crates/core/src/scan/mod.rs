use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::category::CategoryClassifier;
use crate::context::AnalysisContext;
use crate::error::AnalysisError;
use crate::extract::{LexicalExtractor, SignatureExtractor, has_todo_markers};
use crate::lexical::{count_code_lines, strip_comments, token_set};
use crate::types::{
    AnalysisOptions, Corpus, CorpusScan, CorpusSpec, SourceUnit, TestCase, UnitId,
};

mod read;
mod walker;


pub(crate) use read::{make_rel_path, read_source_text};
pub(crate) use walker::collect_files;

pub(crate) fn validate_root(root: &Path) -> Result<(), AnalysisError> {
    let meta = fs::metadata(root).map_err(|err| AnalysisError::InvalidRoot {
        path: root.to_path_buf(),
        reason: err.to_string(),
    })?;
    if !meta.is_dir() {
        return Err(AnalysisError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(())
}

fn ignore_dirs_contains(ignore_dirs: &HashSet<String>, name: &str) -> bool {
    if ignore_dirs.contains(name) {
        return true;
    }
    #[cfg(windows)]
    {
        ignore_dirs.iter().any(|d| d.eq_ignore_ascii_case(name))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

fn in_test_tree(rel_path: &str, test_dir_names: &HashSet<String>) -> bool {
    let mut dirs = rel_path.split('/').collect::<Vec<_>>();
    dirs.pop();
    dirs.iter().any(|dir| {
        test_dir_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(dir))
    })
}

/// Walks one corpus root and builds a [`SourceUnit`] per readable file.
///
/// Units come back in sorted path order and `UnitId`s index into that order.
/// Files that cannot be read are recorded as warnings on `ctx`.
pub fn scan_corpus(
    spec: &CorpusSpec,
    corpus: Corpus,
    options: &AnalysisOptions,
    classifier: &dyn CategoryClassifier,
    ctx: &mut AnalysisContext,
) -> Result<CorpusScan, AnalysisError> {
    validate_root(&spec.root)?;
    let extractor = LexicalExtractor::new(&spec.test_style)?;
    scan_corpus_with_extractor(spec, corpus, options, classifier, &extractor, ctx)
}

pub fn scan_corpus_with_extractor(
    spec: &CorpusSpec,
    corpus: Corpus,
    options: &AnalysisOptions,
    classifier: &dyn CategoryClassifier,
    extractor: &dyn SignatureExtractor,
    ctx: &mut AnalysisContext,
) -> Result<CorpusScan, AnalysisError> {
    let paths = collect_files(
        &spec.root,
        &spec.exclude_dirs,
        options.respect_gitignore,
        &mut ctx.stats,
        |path| spec.accepts_extension(path.extension().and_then(|e| e.to_str())),
    );
    tracing::debug!(%corpus, root = %spec.root.display(), files = paths.len(), "walked corpus");

    let mut units: Vec<SourceUnit> = Vec::with_capacity(paths.len());
    for path in paths {
        let rel_path = make_rel_path(&spec.root, &path);
        let raw = match read_source_text(&path, options.max_file_size, &mut ctx.stats) {
            Ok(text) => text,
            Err(kind) => {
                ctx.warn(corpus, rel_path, kind);
                continue;
            }
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| rel_path.clone());
        let stripped = strip_comments(&raw);
        let signature = extractor.extract(&stripped);
        let id = UnitId(units.len());
        let tests = signature
            .tests
            .into_iter()
            .map(|t| TestCase {
                name: t.name,
                suite: t.suite,
                unit: id,
                corpus,
            })
            .collect();

        units.push(SourceUnit {
            category: classifier.classify(&rel_path),
            base_name: ctx.normalizer().normalize_file_name(&file_name),
            decorated: ctx.normalizer().is_decorated(&file_name),
            in_test_tree: in_test_tree(&rel_path, &options.test_dir_names),
            size_bytes: raw.len() as u64,
            line_count: raw.lines().count(),
            code_lines: count_code_lines(&stripped),
            functions: signature.functions,
            types: signature.types,
            tests,
            tokens: token_set(&stripped),
            has_stub_markers: signature.has_stub_markers,
            has_todo_markers: has_todo_markers(&raw),
            path,
            rel_path,
            file_name,
            corpus,
        });
    }

    tracing::debug!(
        %corpus,
        units = units.len(),
        tests = units.iter().map(|u| u.tests.len()).sum::<usize>(),
        "scanned corpus"
    );

    Ok(CorpusScan {
        corpus,
        root: spec.root.clone(),
        units,
    })
}
