use std::path::PathBuf;

const HELP_TEXT: &str = concat!(
    "parity-audit (test coverage and duplicate implementations across a port)\n",
    "\n",
    "Usage:\n",
    "  parity-audit [options] --reference <dir> --candidate <dir>\n",
    "  parity-audit [options] <reference> <candidate>\n",
    "\n",
    "Options:\n",
    "  --reference <dir>           Reference (source) codebase root\n",
    "  --candidate <dir>           Candidate (ported) codebase root\n",
    "  --reference-ext <ext>       Reference file extension (repeatable, comma list; default: cs)\n",
    "  --candidate-ext <ext>       Candidate file extension (repeatable, comma list; default: cpp,cc,cxx,h,hpp,hh)\n",
    "  --exclude-dir <name>        Skip a directory name in both corpora (repeatable)\n",
    "  --test-dir <name>           Treat a directory name as a test tree (repeatable)\n",
    "  --manifest <file>           Build manifest text (for example CMakeLists.txt)\n",
    "  --discover-manifests        Collect every CMakeLists.txt under the candidate root\n",
    "  --similarity-threshold <f>  Duplicate pair threshold: 0..1 (default: 0.5)\n",
    "  --match-within-category     Only match tests inside the same category\n",
    "  --config <file>             Load options from a TOML file (flags override it)\n",
    "  --json                      Output JSON\n",
    "  --markdown                  Output a Markdown report\n",
    "  --cleanup-script <file>     Write a commented removal script for duplicates\n",
    "  --stats                     Include scan stats (JSON) or print to stderr\n",
    "  --min-coverage <pct>        Exit 1 when overall coverage is below pct\n",
    "  --fail-on-critical          Exit 1 when a duplicate group is critical\n",
    "  --no-gitignore              Do not respect .gitignore rules\n",
    "  --max-file-size <n>         Skip files larger than n bytes (default: 10485760)\n",
    "  --verbose                   Debug logging on stderr (RUST_LOG also works)\n",
    "  -V, --version               Show version\n",
    "  -h, --help                  Show help\n",
    "\n",
    "Notes:\n",
    "  - --json and --markdown are mutually exclusive\n",
    "  - In text and Markdown mode, --stats prints to stderr\n",
    "  - --manifest and --discover-manifests are mutually exclusive\n",
    "\n",
    "Examples:\n",
    "  parity-audit ./dotnet ./cpp\n",
    "  parity-audit --manifest cpp/CMakeLists.txt --markdown ./dotnet ./cpp\n",
    "  parity-audit --config parity.toml --json --stats\n",
    "  parity-audit --min-coverage 80 --fail-on-critical ./dotnet ./cpp\n",
    "\n"
);

pub(crate) fn print_help() {
    print!("{HELP_TEXT}");
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
}

/// Flags as given; `None` means "not on the command line", so the config
/// file (if any) decides.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ParsedArgs {
    pub(crate) version: bool,
    pub(crate) reference: Option<PathBuf>,
    pub(crate) candidate: Option<PathBuf>,
    pub(crate) reference_exts: Vec<String>,
    pub(crate) candidate_exts: Vec<String>,
    pub(crate) exclude_dirs: Vec<String>,
    pub(crate) test_dirs: Vec<String>,
    pub(crate) manifest: Option<PathBuf>,
    pub(crate) discover_manifests: bool,
    pub(crate) similarity_threshold: Option<f64>,
    pub(crate) match_within_category: bool,
    pub(crate) config: Option<PathBuf>,
    pub(crate) format: OutputFormat,
    pub(crate) cleanup_script: Option<PathBuf>,
    pub(crate) stats: bool,
    pub(crate) min_coverage: Option<f64>,
    pub(crate) fail_on_critical: bool,
    pub(crate) no_gitignore: bool,
    pub(crate) max_file_size: Option<u64>,
    pub(crate) verbose: bool,
}

fn parse_u64(name: &str, raw: &str) -> Result<u64, String> {
    raw.parse::<u64>()
        .map_err(|_| format!("{name} must be an integer"))
}

fn parse_f64_in_range(name: &str, raw: &str, min: f64, max: f64) -> Result<f64, String> {
    let value = raw
        .parse::<f64>()
        .map_err(|_| format!("{name} must be a number"))?;
    if !value.is_finite() || !(min..=max).contains(&value) {
        return Err(format!("{name} must be {min}..{max}"));
    }
    Ok(value)
}

fn push_list(out: &mut Vec<String>, raw: &str) {
    out.extend(
        raw.split(',')
            .map(|s| s.trim().trim_start_matches('.'))
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    );
}

/// Returns `Ok(None)` when help was requested.
pub(crate) fn parse_args(argv: &[String]) -> Result<Option<ParsedArgs>, String> {
    let mut parsed = ParsedArgs::default();
    let mut positionals: Vec<PathBuf> = Vec::new();
    let mut json = false;
    let mut markdown = false;

    let mut i = 0;
    while i < argv.len() {
        let arg = argv[i].as_str();
        if arg == "--" {
            positionals.extend(argv[(i + 1)..].iter().map(PathBuf::from));
            break;
        }

        let mut value = |name: &str| -> Result<String, String> {
            i += 1;
            argv.get(i)
                .cloned()
                .ok_or_else(|| format!("{name} requires a value"))
        };

        match arg {
            "-h" | "--help" => return Ok(None),
            "-V" | "--version" => parsed.version = true,
            "--json" => json = true,
            "--markdown" => markdown = true,
            "--stats" => parsed.stats = true,
            "--verbose" => parsed.verbose = true,
            "--no-gitignore" => parsed.no_gitignore = true,
            "--discover-manifests" => parsed.discover_manifests = true,
            "--match-within-category" => parsed.match_within_category = true,
            "--fail-on-critical" => parsed.fail_on_critical = true,
            "--reference" => parsed.reference = Some(PathBuf::from(value(arg)?)),
            "--candidate" => parsed.candidate = Some(PathBuf::from(value(arg)?)),
            "--manifest" => parsed.manifest = Some(PathBuf::from(value(arg)?)),
            "--config" => parsed.config = Some(PathBuf::from(value(arg)?)),
            "--cleanup-script" => parsed.cleanup_script = Some(PathBuf::from(value(arg)?)),
            "--reference-ext" => push_list(&mut parsed.reference_exts, &value(arg)?),
            "--candidate-ext" => push_list(&mut parsed.candidate_exts, &value(arg)?),
            "--exclude-dir" => push_list(&mut parsed.exclude_dirs, &value(arg)?),
            "--test-dir" => push_list(&mut parsed.test_dirs, &value(arg)?),
            "--similarity-threshold" => {
                let raw = value(arg)?;
                parsed.similarity_threshold = Some(parse_f64_in_range(arg, &raw, 0.0, 1.0)?);
            }
            "--min-coverage" => {
                let raw = value(arg)?;
                parsed.min_coverage = Some(parse_f64_in_range(arg, &raw, 0.0, 100.0)?);
            }
            "--max-file-size" => parsed.max_file_size = Some(parse_u64(arg, &value(arg)?)?),
            _ if arg.starts_with('-') => return Err(format!("Unknown option: {arg}")),
            _ => positionals.push(PathBuf::from(arg)),
        }
        i += 1;
    }

    if json && markdown {
        return Err("--json conflicts with --markdown".to_string());
    }
    parsed.format = if json {
        OutputFormat::Json
    } else if markdown {
        OutputFormat::Markdown
    } else {
        OutputFormat::Text
    };

    if parsed.manifest.is_some() && parsed.discover_manifests {
        return Err("--manifest conflicts with --discover-manifests".to_string());
    }

    let mut positionals = positionals.into_iter();
    for slot in [&mut parsed.reference, &mut parsed.candidate] {
        if slot.is_none() {
            *slot = positionals.next();
        }
    }
    if let Some(extra) = positionals.next() {
        return Err(format!("Unexpected argument: {}", extra.display()));
    }

    Ok(Some(parsed))
}
