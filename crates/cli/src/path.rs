use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolves `p` against the working directory.
pub(crate) fn resolve_path(p: &Path) -> io::Result<PathBuf> {
    if p.is_absolute() {
        return Ok(resolve_path_from(Path::new(""), p));
    }
    Ok(resolve_path_from(&env::current_dir()?, p))
}

/// Joins `p` onto `base`, folds `.`/`..` lexically, then prefers the
/// canonical form when the path exists. Missing paths are returned as-is so
/// the analysis can report them as invalid roots.
pub(crate) fn resolve_path_from(base: &Path, p: &Path) -> PathBuf {
    let normalized = normalize_path(&base.join(p));
    fs::canonicalize(&normalized).unwrap_or(normalized)
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                out.push(component.as_os_str());
                depth = 0;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_fold_lexically() {
        assert_eq!(
            normalize_path(Path::new("/work/./cpp/../dotnet")),
            PathBuf::from("/work/dotnet")
        );
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn missing_paths_resolve_without_canonicalizing() {
        let resolved = resolve_path_from(
            Path::new("/parity-audit-missing-base"),
            Path::new("cpp/../dotnet"),
        );
        assert_eq!(resolved, PathBuf::from("/parity-audit-missing-base/dotnet"));
    }

    #[test]
    fn relative_paths_join_the_working_directory() -> io::Result<()> {
        let resolved = resolve_path(Path::new("definitely-missing-dir"))?;
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("definitely-missing-dir"));
        Ok(())
    }
}
