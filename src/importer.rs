//! Batch import of activity files.
//!
//! An [`Importer`] is parameterized by two capabilities: a [`FileLister`] that
//! says which files to look at, and an [`ActivityDecoder`] that turns one file
//! into a [`DecodedActivity`]. Every file is classified; running activities
//! are analyzed, everything else is reported and skipped.
//!
//! With the `parallel` feature, files are decoded and analyzed concurrently.
//! Output order always follows the lister's order.

use std::path::{Path, PathBuf};

use log::{info, warn};
use walkdir::WalkDir;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::analyzer::{ActivityAnalysis, ActivityAnalyzer, ActivityKind};
use crate::error::{EffortError, Result};
use crate::history::EffortHistory;
use crate::metrics::FlatMetrics;
use crate::records::DecodedActivity;

// ============================================================================
// Capabilities
// ============================================================================

/// Source of files to import.
pub trait FileLister {
    fn list(&self) -> Result<Vec<PathBuf>>;
}

impl<F> FileLister for F
where
    F: Fn() -> Result<Vec<PathBuf>>,
{
    fn list(&self) -> Result<Vec<PathBuf>> {
        self()
    }
}

/// Turns one file into decoded messages.
pub trait ActivityDecoder: Sync {
    fn decode(&self, path: &Path) -> Result<DecodedActivity>;
}

impl<F> ActivityDecoder for F
where
    F: Fn(&Path) -> Result<DecodedActivity> + Sync,
{
    fn decode(&self, path: &Path) -> Result<DecodedActivity> {
        self(path)
    }
}

/// Lists the files of a directory with a given extension, sorted by path.
#[derive(Debug, Clone)]
pub struct DirectoryLister {
    root: PathBuf,
    extension: String,
    recursive: bool,
}

impl DirectoryLister {
    /// Files directly inside `root` whose extension matches (case-insensitive).
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_ascii_lowercase(),
            recursive: false,
        }
    }

    /// Also descend into subdirectories.
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }
}

impl FileLister for DirectoryLister {
    fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(EffortError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", self.root.display()),
            )));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .and_then(|s| s.to_str())
                        .map(|s| s.to_ascii_lowercase() == self.extension)
                        .unwrap_or(false)
            })
            .map(|entry| entry.path().to_path_buf())
            .collect();
        files.sort();
        Ok(files)
    }
}

/// Decoder for activities already exported as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl ActivityDecoder for JsonDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedActivity> {
        let decode_error = |message: String| EffortError::Decode {
            path: path.display().to_string(),
            message,
        };
        let json = std::fs::read_to_string(path).map_err(|e| decode_error(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| decode_error(e.to_string()))
    }
}

// ============================================================================
// Import
// ============================================================================

/// One analyzed file.
#[derive(Debug, Clone)]
pub struct ImportedActivity {
    pub path: PathBuf,
    /// File stem, used as the activity id
    pub activity_id: String,
    pub analysis: ActivityAnalysis,
}

/// Outcome of a batch import, grouped by classification.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub analyzed: Vec<ImportedActivity>,
    /// Valid activities of sports that are not analyzed
    pub non_running: Vec<PathBuf>,
    /// Files that are not activities or could not be decoded
    pub non_activity: Vec<PathBuf>,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.analyzed.len() + self.non_running.len() + self.non_activity.len()
    }

    /// Flat metrics of every analyzed activity, in import order.
    pub fn flat_metrics(&self) -> Vec<FlatMetrics> {
        self.analyzed.iter().map(|a| a.analysis.flatten()).collect()
    }

    /// Effort history over every analyzed activity with a start time.
    pub fn history(&self) -> EffortHistory {
        let mut history = EffortHistory::new();
        for activity in &self.analyzed {
            if let Err(e) = history.add_activity(&activity.activity_id, &activity.analysis.metrics) {
                warn!("[Importer] Skipping {} in history: {}", activity.activity_id, e);
            }
        }
        history
    }
}

enum Outcome {
    Analyzed(ActivityAnalysis),
    OtherSport,
    NotActivity,
}

/// Lists, decodes, classifies and analyzes activity files.
pub struct Importer<L, D> {
    lister: L,
    decoder: D,
    analyzer: ActivityAnalyzer,
}

impl<L: FileLister, D: ActivityDecoder> Importer<L, D> {
    pub fn new(lister: L, decoder: D, analyzer: ActivityAnalyzer) -> Self {
        Self {
            lister,
            decoder,
            analyzer,
        }
    }

    pub fn analyzer(&self) -> &ActivityAnalyzer {
        &self.analyzer
    }

    /// Import every listed file. Only a listing failure is an error;
    /// per-file problems are logged and reported as non-activities.
    pub fn import(&self) -> Result<ImportReport> {
        let paths = self.lister.list()?;
        let decoder = &self.decoder;
        let analyzer = &self.analyzer;

        #[cfg(feature = "parallel")]
        let outcomes: Vec<Outcome> = paths
            .par_iter()
            .map(|path| process_file(decoder, analyzer, path))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<Outcome> = paths
            .iter()
            .map(|path| process_file(decoder, analyzer, path))
            .collect();

        let mut report = ImportReport::default();
        for (path, outcome) in paths.into_iter().zip(outcomes) {
            match outcome {
                Outcome::Analyzed(analysis) => report.analyzed.push(ImportedActivity {
                    activity_id: activity_id(&path),
                    path,
                    analysis,
                }),
                Outcome::OtherSport => report.non_running.push(path),
                Outcome::NotActivity => report.non_activity.push(path),
            }
        }

        info!(
            "[Importer] Imported {} activities from {} files ({} other sports, {} non-activity)",
            report.analyzed.len(),
            report.total(),
            report.non_running.len(),
            report.non_activity.len()
        );
        Ok(report)
    }
}

fn process_file<D: ActivityDecoder>(decoder: &D, analyzer: &ActivityAnalyzer, path: &Path) -> Outcome {
    let decoded = match decoder.decode(path) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("[Importer] Could not decode {}: {}", path.display(), e);
            return Outcome::NotActivity;
        }
    };

    match analyzer.classify(&decoded) {
        ActivityKind::Analyzable => match analyzer.analyze(&decoded) {
            Ok(analysis) => Outcome::Analyzed(analysis),
            Err(e) => {
                warn!("[Importer] Could not analyze {}: {}", path.display(), e);
                Outcome::NotActivity
            }
        },
        ActivityKind::OtherSport(_) => Outcome::OtherSport,
        ActivityKind::NotAnActivity => Outcome::NotActivity,
    }
}

fn activity_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
