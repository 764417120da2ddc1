use crate::naming::NameNormalizer;
use crate::types::{AnalysisOptions, Corpus, ScanStats, ScanWarning, WarningKind};

/// State owned by a single analysis run. Nothing in here outlives the run;
/// the stats and warnings are moved into the final report.
#[derive(Debug)]
pub struct AnalysisContext {
    normalizer: NameNormalizer,
    pub stats: ScanStats,
    pub warnings: Vec<ScanWarning>,
}

impl AnalysisContext {
    pub fn new(options: &AnalysisOptions) -> Self {
        Self {
            normalizer: NameNormalizer::new(options),
            stats: ScanStats::default(),
            warnings: Vec::new(),
        }
    }

    pub fn normalizer(&self) -> &NameNormalizer {
        &self.normalizer
    }

    pub(crate) fn warn(&mut self, corpus: Corpus, path: String, kind: WarningKind) {
        tracing::warn!(%corpus, path = %path, reason = %kind, "skipping file");
        self.warnings.push(ScanWarning { corpus, path, kind });
    }
}
