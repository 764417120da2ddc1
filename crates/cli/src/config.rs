use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use parity_audit_core::{
    AnalysisInput, AnalysisOptions, CategoryRules, CorpusSpec, DEFAULT_MANIFEST_NAMES,
    KeywordRule, TestStyle,
};
use serde::Deserialize;

use crate::args::ParsedArgs;
use crate::path::{resolve_path, resolve_path_from};

/// On-disk TOML options. Every field is optional; command-line flags win.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ConfigFile {
    pub(crate) reference: CorpusConfig,
    pub(crate) candidate: CorpusConfig,
    pub(crate) similarity_threshold: Option<f64>,
    pub(crate) match_within_category: Option<bool>,
    pub(crate) min_substring_len: Option<usize>,
    pub(crate) function_collision_min_files: Option<usize>,
    pub(crate) max_file_size: Option<u64>,
    pub(crate) respect_gitignore: Option<bool>,
    pub(crate) test_dirs: Option<Vec<String>>,
    pub(crate) suffix_decorations: Option<Vec<String>>,
    pub(crate) prefix_markers: Option<Vec<String>>,
    pub(crate) filler_tokens: Option<Vec<String>>,
    /// Merged over the built-in synonym table.
    pub(crate) synonyms: BTreeMap<String, String>,
    pub(crate) manifest: Option<PathBuf>,
    pub(crate) discover_manifests: Option<bool>,
    pub(crate) manifest_names: Option<Vec<String>>,
    pub(crate) min_coverage: Option<f64>,
    pub(crate) fail_on_critical: Option<bool>,
    pub(crate) categories: Option<CategoriesConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CorpusConfig {
    pub(crate) root: Option<PathBuf>,
    pub(crate) extensions: Option<Vec<String>>,
    pub(crate) exclude_dirs: Vec<String>,
    pub(crate) test_markers: Option<Vec<String>>,
    pub(crate) test_macros: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum CategoryStrategy {
    #[default]
    ParentDirectory,
    Keywords,
    /// Built-in keyword table for node areas (Cryptography, IO, Ledger, ...).
    Areas,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CategoriesConfig {
    pub(crate) strategy: CategoryStrategy,
    pub(crate) rules: Vec<KeywordRuleConfig>,
    pub(crate) fallback: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct KeywordRuleConfig {
    pub(crate) needle: String,
    pub(crate) category: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ManifestSource {
    None,
    File(PathBuf),
    Discover { names: Vec<String> },
}

/// Everything `run` needs after config and flags are merged.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedRun {
    pub(crate) input: AnalysisInput,
    pub(crate) options: AnalysisOptions,
    pub(crate) manifest: ManifestSource,
    pub(crate) min_coverage: Option<f64>,
    pub(crate) fail_on_critical: bool,
}

pub(crate) fn load_config(path: &Path) -> Result<ConfigFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config: {}", path.display()))
}

/// Paths in the config file are relative to the file's directory; paths on
/// the command line are relative to the working directory.
pub(crate) fn resolve_run(args: &ParsedArgs) -> Result<ResolvedRun> {
    let (config, config_dir) = match &args.config {
        Some(path) => {
            let path = resolve_path(path)
                .with_context(|| format!("failed to resolve config path: {}", path.display()))?;
            let config = load_config(&path)?;
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (config, Some(dir))
        }
        None => (ConfigFile::default(), None),
    };
    resolve_with_config(args, config, config_dir.as_deref())
}

pub(crate) fn resolve_with_config(
    args: &ParsedArgs,
    config: ConfigFile,
    config_dir: Option<&Path>,
) -> Result<ResolvedRun> {
    let from_config = |p: &Path| -> Result<PathBuf> {
        match config_dir {
            Some(dir) => Ok(resolve_path_from(dir, p)),
            None => resolve_path(p)
                .with_context(|| format!("failed to resolve path: {}", p.display())),
        }
    };
    let from_flag = |p: &Path| -> Result<PathBuf> {
        resolve_path(p).with_context(|| format!("failed to resolve path: {}", p.display()))
    };

    let reference_root = match (&args.reference, &config.reference.root) {
        (Some(flag), _) => from_flag(flag)?,
        (None, Some(path)) => from_config(path)?,
        (None, None) => bail!("missing reference root (--reference or [reference] root)"),
    };
    let candidate_root = match (&args.candidate, &config.candidate.root) {
        (Some(flag), _) => from_flag(flag)?,
        (None, Some(path)) => from_config(path)?,
        (None, None) => bail!("missing candidate root (--candidate or [candidate] root)"),
    };

    let reference = corpus_spec(
        CorpusSpec::reference(reference_root),
        &config.reference,
        &args.reference_exts,
        &args.exclude_dirs,
    )
    .context("invalid [reference] section")?;
    let candidate = corpus_spec(
        CorpusSpec::candidate(candidate_root),
        &config.candidate,
        &args.candidate_exts,
        &args.exclude_dirs,
    )
    .context("invalid [candidate] section")?;

    let mut options = AnalysisOptions::default();
    if let Some(v) = config.similarity_threshold {
        options.similarity_threshold = v;
    }
    if let Some(v) = config.match_within_category {
        options.match_within_category = v;
    }
    if let Some(v) = config.min_substring_len {
        options.min_substring_len = v;
    }
    if let Some(v) = config.function_collision_min_files {
        options.function_collision_min_files = v;
    }
    if let Some(v) = config.max_file_size {
        options.max_file_size = Some(v);
    }
    if let Some(v) = config.respect_gitignore {
        options.respect_gitignore = v;
    }
    if let Some(v) = config.test_dirs {
        options.test_dir_names = v.into_iter().collect();
    }
    if let Some(v) = config.suffix_decorations {
        options.suffix_decorations = lowercase_set(v);
    }
    if let Some(v) = config.prefix_markers {
        options.prefix_markers = lowercase_set(v);
    }
    if let Some(v) = config.filler_tokens {
        options.filler_tokens = lowercase_set(v);
    }
    for (key, stem) in config.synonyms {
        options
            .synonym_table
            .insert(key.to_lowercase(), stem.to_lowercase());
    }
    if let Some(categories) = config.categories {
        options.category_rules = category_rules(categories)?;
    }

    if let Some(v) = args.similarity_threshold {
        options.similarity_threshold = v;
    }
    if args.match_within_category {
        options.match_within_category = true;
    }
    if let Some(v) = args.max_file_size {
        options.max_file_size = Some(v);
    }
    if args.no_gitignore {
        options.respect_gitignore = false;
    }
    options
        .test_dir_names
        .extend(args.test_dirs.iter().cloned());

    let manifest = if let Some(path) = &args.manifest {
        ManifestSource::File(from_flag(path)?)
    } else if args.discover_manifests || config.discover_manifests == Some(true) {
        let names = config.manifest_names.unwrap_or_else(|| {
            DEFAULT_MANIFEST_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect()
        });
        ManifestSource::Discover { names }
    } else if let Some(path) = &config.manifest {
        ManifestSource::File(from_config(path)?)
    } else {
        ManifestSource::None
    };

    Ok(ResolvedRun {
        input: AnalysisInput {
            reference,
            candidate,
            manifest: None,
            manifest_warnings: Vec::new(),
        },
        options,
        manifest,
        min_coverage: args.min_coverage.or(config.min_coverage),
        fail_on_critical: args.fail_on_critical || config.fail_on_critical == Some(true),
    })
}

fn corpus_spec(
    mut spec: CorpusSpec,
    config: &CorpusConfig,
    flag_exts: &[String],
    flag_exclude_dirs: &[String],
) -> Result<CorpusSpec> {
    if !flag_exts.is_empty() {
        spec.extensions = flag_exts.to_vec();
    } else if let Some(exts) = &config.extensions {
        spec.extensions = exts
            .iter()
            .map(|e| e.trim_start_matches('.').to_string())
            .collect();
    }
    spec.exclude_dirs
        .extend(config.exclude_dirs.iter().cloned());
    spec.exclude_dirs.extend(flag_exclude_dirs.iter().cloned());

    spec.test_style = match (&config.test_markers, &config.test_macros) {
        (Some(_), Some(_)) => bail!("test_markers conflicts with test_macros"),
        (Some(markers), None) => TestStyle::AttributeMarked {
            markers: markers.clone(),
        },
        (None, Some(macros)) => TestStyle::MacroCall {
            macros: macros.clone(),
        },
        (None, None) => spec.test_style,
    };
    Ok(spec)
}

fn category_rules(config: CategoriesConfig) -> Result<CategoryRules> {
    match config.strategy {
        CategoryStrategy::ParentDirectory => {
            if !config.rules.is_empty() {
                return Err(anyhow!(
                    "[categories] rules need strategy = \"keywords\""
                ));
            }
            Ok(CategoryRules::ParentDirectory)
        }
        CategoryStrategy::Keywords => Ok(CategoryRules::Keywords {
            rules: config
                .rules
                .into_iter()
                .map(|r| KeywordRule {
                    needle: r.needle.to_lowercase(),
                    category: r.category,
                })
                .collect(),
            fallback: config.fallback.unwrap_or_else(|| "other".to_string()),
        }),
        CategoryStrategy::Areas => {
            if !config.rules.is_empty() {
                bail!("[categories] rules need strategy = \"keywords\"");
            }
            let rules = CategoryRules::area_keywords();
            Ok(match config.fallback {
                Some(fallback) => rules.with_fallback(fallback),
                None => rules,
            })
        }
    }
}

fn lowercase_set(items: Vec<String>) -> BTreeSet<String> {
    items.into_iter().map(|s| s.to_lowercase()).collect()
}
