use crate::types::CategoryRules;

pub const ROOT_CATEGORY: &str = "(root)";

/// Assigns a root-relative path (with `/` separators) to a reporting bucket.
pub trait CategoryClassifier {
    fn classify(&self, rel_path: &str) -> String;
}

impl CategoryClassifier for CategoryRules {
    fn classify(&self, rel_path: &str) -> String {
        match self {
            Self::ParentDirectory => parent_directory(rel_path),
            Self::Keywords { rules, fallback } => {
                let lowered = rel_path.to_lowercase();
                rules
                    .iter()
                    .find(|rule| lowered.contains(&rule.needle.to_lowercase()))
                    .map(|rule| rule.category.clone())
                    .unwrap_or_else(|| fallback.clone())
            }
        }
    }
}

fn parent_directory(rel_path: &str) -> String {
    let mut parts = rel_path.rsplit('/').filter(|p| !p.is_empty());
    parts.next();
    parts
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| ROOT_CATEGORY.to_string())
}
