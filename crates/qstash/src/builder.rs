//! Artifact builder
//!
//! Gantree: L6_Store → Builder
//!
//! Fetches calibration for every supported backend and writes one
//! artifact per simulation method. A failing backend or method is
//! recorded in the [`BuildReport`] and the build moves on; only a
//! missing artifact root or an unusable service aborts it.

use crate::artifact::{ArtifactStore, SimulatorArtifact};
use crate::backend_name::IbmBackendName;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use qstash_calibration::CalibrationSource;
use qstash_ibm::{IbmChannel, IbmCredentials, IbmRuntimeService};
use qstash_sim::{SimulationMethod, SimulatorOptions};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Report
// ============================================================================

/// Outcome for one (backend, method) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
    /// Artifact written
    Saved(PathBuf),
    /// Skipped, with the reason
    Failed(String),
}

/// Report entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildEntry {
    /// Backend
    pub backend: IbmBackendName,
    /// Method
    pub method: SimulationMethod,
    /// Outcome
    pub outcome: BuildOutcome,
}

impl BuildEntry {
    /// Check if the artifact was written
    pub fn is_saved(&self) -> bool {
        matches!(self.outcome, BuildOutcome::Saved(_))
    }
}

/// Per-item result of a build, in build order
/// Gantree: BuildReport // Saved | Failed per pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    entries: Vec<BuildEntry>,
}

impl BuildReport {
    fn push(&mut self, backend: IbmBackendName, method: SimulationMethod, outcome: BuildOutcome) {
        self.entries.push(BuildEntry {
            backend,
            method,
            outcome,
        });
    }

    /// All entries
    pub fn entries(&self) -> &[BuildEntry] {
        &self.entries
    }

    /// Written artifact paths
    pub fn saved(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            BuildOutcome::Saved(path) => Some(path.as_path()),
            BuildOutcome::Failed(_) => None,
        })
    }

    /// Failed entries
    pub fn failed(&self) -> impl Iterator<Item = &BuildEntry> {
        self.entries.iter().filter(|e| !e.is_saved())
    }

    /// Number of written artifacts
    pub fn saved_count(&self) -> usize {
        self.saved().count()
    }

    /// Number of failed pairs
    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    /// Check if every pair was written
    pub fn is_complete(&self) -> bool {
        self.failed_count() == 0
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} saved, {} failed",
            self.saved_count(),
            self.failed_count()
        )
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds artifacts from a calibration source
/// Gantree: ArtifactBuilder // source -> store
pub struct ArtifactBuilder<'a> {
    source: &'a dyn CalibrationSource,
    store: ArtifactStore,
    options: SimulatorOptions,
    verbose: bool,
}

impl<'a> ArtifactBuilder<'a> {
    /// Create a verbose builder writing under `base_path`
    pub fn new(source: &'a dyn CalibrationSource, base_path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            store: ArtifactStore::new(base_path),
            options: SimulatorOptions::default(),
            verbose: true,
        }
    }

    /// Log per-item outcomes
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run options stored in every artifact
    pub fn with_options(mut self, options: SimulatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Target store
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Build every (backend, method) pair
    pub fn build_all(&self) -> StoreResult<BuildReport> {
        self.store.ensure_root()?;
        log::debug!(
            "Building simulators under {} from {}",
            self.store.root().display(),
            self.source.name()
        );

        let mut report = BuildReport::default();
        for backend in IbmBackendName::ALL {
            self.build_backend(backend, &mut report);
        }
        Ok(report)
    }

    fn build_backend(&self, backend: IbmBackendName, report: &mut BuildReport) {
        let prepared = self
            .source
            .backend_snapshot(backend.as_str())
            .map_err(|e| e.to_string())
            .and_then(|snapshot| {
                self.store
                    .ensure_backend_dir(backend)
                    .map(|_| snapshot)
                    .map_err(|e| e.to_string())
            });

        let snapshot = match prepared {
            Ok(snapshot) => snapshot,
            Err(reason) => {
                for method in SimulationMethod::ALL {
                    self.record(report, backend, method, BuildOutcome::Failed(reason.clone()));
                }
                return;
            }
        };

        for method in SimulationMethod::ALL {
            let artifact = SimulatorArtifact::new(backend, method, snapshot.clone())
                .with_options(self.options.clone());
            let outcome = match artifact.check(backend, method) {
                Ok(()) => match self.store.save(&artifact) {
                    Ok(path) => BuildOutcome::Saved(path),
                    Err(e) => BuildOutcome::Failed(e.to_string()),
                },
                Err(reason) => BuildOutcome::Failed(reason),
            };
            self.record(report, backend, method, outcome);
        }
    }

    fn record(
        &self,
        report: &mut BuildReport,
        backend: IbmBackendName,
        method: SimulationMethod,
        outcome: BuildOutcome,
    ) {
        if self.verbose {
            match &outcome {
                BuildOutcome::Saved(path) => log::info!("Saved simulator '{}'", path.display()),
                BuildOutcome::Failed(reason) => log::warn!(
                    "Failed to save simulator for '{}' with method '{}': {}",
                    backend,
                    method,
                    reason
                ),
            }
        }
        report.push(backend, method, outcome);
    }
}

// ============================================================================
// Entry Points
// ============================================================================

/// Build every artifact from `source` under `base_path`
/// Gantree: save_all(source, base_path, verbose) -> Result<BuildReport>
pub fn save_all(
    source: &dyn CalibrationSource,
    base_path: impl Into<PathBuf>,
    verbose: bool,
) -> StoreResult<BuildReport> {
    ArtifactBuilder::new(source, base_path)
        .with_verbose(verbose)
        .build_all()
}

/// Build every artifact from the IBM Quantum runtime service
pub fn save_ibm_simulators(
    channel: &str,
    token: &str,
    base_path: impl Into<PathBuf>,
    verbose: bool,
) -> StoreResult<BuildReport> {
    let store = ArtifactStore::new(base_path);
    store.ensure_root()?;

    let channel: IbmChannel = channel
        .parse()
        .map_err(|e: qstash_ibm::AuthError| StoreError::ServiceInit(e.to_string()))?;
    let service = IbmRuntimeService::connect(IbmCredentials::new(token, channel))
        .map_err(|e| StoreError::ServiceInit(e.to_string()))?;

    save_all(&service, store.base_path(), verbose)
}

/// Build every artifact using environment configuration
pub fn save_from_config(config: &StoreConfig) -> StoreResult<BuildReport> {
    save_ibm_simulators(
        config.channel.as_str(),
        config.require_token()?,
        config.base_path(),
        config.verbose,
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;
    use qstash_calibration::{CalibrationSnapshot, SourceError, StaticSource};
    use std::fs;
    use tempfile::TempDir;

    /// Records log lines per test thread
    mod capture {
        use log::{Level, LevelFilter, Log, Metadata, Record};
        use std::sync::{Mutex, Once};
        use std::thread::{self, ThreadId};

        struct Capture;

        static LOGGER: Capture = Capture;
        static INIT: Once = Once::new();
        static LINES: Mutex<Vec<(ThreadId, Level, String)>> = Mutex::new(Vec::new());

        impl Log for Capture {
            fn enabled(&self, _: &Metadata) -> bool {
                true
            }

            fn log(&self, record: &Record) {
                let line = (thread::current().id(), record.level(), record.args().to_string());
                LINES.lock().unwrap().push(line);
            }

            fn flush(&self) {}
        }

        pub fn install() {
            INIT.call_once(|| {
                log::set_logger(&LOGGER).unwrap();
                log::set_max_level(LevelFilter::Trace);
            });
        }

        pub fn lines() -> Vec<(Level, String)> {
            let id = thread::current().id();
            LINES
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, _, _)| *t == id)
                .map(|(_, level, msg)| (*level, msg.clone()))
                .collect()
        }
    }

    fn item_lines(lines: &[(Level, String)], level: Level, prefix: &str) -> Vec<String> {
        lines
            .iter()
            .filter(|(l, m)| *l == level && m.starts_with(prefix))
            .map(|(_, m)| m.clone())
            .collect()
    }

    struct Broken;

    impl CalibrationSource for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn backend_snapshot(&self, backend: &str) -> Result<CalibrationSnapshot, SourceError> {
            Err(SourceError::Unavailable(format!("{} is offline", backend)))
        }
    }

    fn brisbane_only() -> StaticSource {
        StaticSource::new().with_snapshot(CalibrationSnapshot::ibm_typical("ibm_brisbane", 7))
    }

    fn json_files(dir: &Path) -> usize {
        match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().map_or(false, |x| x == "json"))
                .count(),
            Err(_) => 0,
        }
    }

    #[test]
    fn test_partial_backend_failure() {
        let dir = TempDir::new().unwrap();
        let report = save_all(&brisbane_only(), dir.path(), true).unwrap();

        assert_eq!(report.entries().len(), 20);
        assert_eq!(report.saved_count(), 10);
        assert_eq!(report.failed_count(), 10);
        assert_eq!(report.to_string(), "10 saved, 10 failed");

        let root = dir.path().join("ibm_simulators");
        assert_eq!(json_files(&root.join("ibm_brisbane")), 10);
        assert_eq!(json_files(&root.join("ibm_sherbrooke")), 0);

        for entry in report.failed() {
            assert_eq!(entry.backend, IbmBackendName::IbmSherbrooke);
            assert!(matches!(&entry.outcome, BuildOutcome::Failed(r) if r.contains("ibm_sherbrooke")));
        }
    }

    #[test]
    fn test_verbose_build_logs_every_item() {
        capture::install();
        let dir = TempDir::new().unwrap();
        save_all(&brisbane_only(), dir.path(), true).unwrap();
        let lines = capture::lines();

        let saved = item_lines(&lines, Level::Info, "Saved simulator '");
        assert_eq!(saved.len(), 10);
        let store = ArtifactStore::new(dir.path());
        for method in SimulationMethod::ALL {
            let path = store.artifact_path(IbmBackendName::IbmBrisbane, method);
            let expected = format!("Saved simulator '{}'", path.display());
            assert!(saved.contains(&expected), "missing {}", expected);
        }

        let failed = item_lines(&lines, Level::Warn, "Failed to save simulator for ");
        assert_eq!(failed.len(), 10);
        for method in SimulationMethod::ALL {
            let prefix = format!(
                "Failed to save simulator for 'ibm_sherbrooke' with method '{}': ",
                method
            );
            assert!(failed.iter().any(|m| m.starts_with(&prefix)), "missing {}", prefix);
        }
    }

    #[test]
    fn test_quiet_build_logs_no_items() {
        capture::install();
        let dir = TempDir::new().unwrap();
        let report = save_all(&brisbane_only(), dir.path(), false).unwrap();
        assert_eq!(report.failed_count(), 10);

        let lines = capture::lines();
        assert!(item_lines(&lines, Level::Info, "Saved simulator").is_empty());
        assert!(item_lines(&lines, Level::Warn, "Failed to save simulator").is_empty());
    }

    #[test]
    fn test_all_backends_saved() {
        let dir = TempDir::new().unwrap();
        let source = brisbane_only()
            .with_snapshot(CalibrationSnapshot::ibm_typical("ibm_sherbrooke", 4));
        let report = save_all(&source, dir.path(), false).unwrap();

        assert!(report.is_complete());
        let store = ArtifactStore::new(dir.path());
        let expected: Vec<PathBuf> = IbmBackendName::ALL
            .iter()
            .flat_map(|&b| SimulationMethod::ALL.map(|m| store.artifact_path(b, m)))
            .collect();
        let saved: Vec<PathBuf> = report.saved().map(Path::to_path_buf).collect();
        assert_eq!(saved, expected);
        assert_eq!(store.saved().len(), 20);
    }

    #[test]
    fn test_every_saved_artifact_loads() {
        let dir = TempDir::new().unwrap();
        save_all(&brisbane_only(), dir.path(), false).unwrap();

        let store = ArtifactStore::new(dir.path());
        for method in SimulationMethod::ALL {
            let artifact = store.load(IbmBackendName::IbmBrisbane, method).unwrap();
            assert_eq!(artifact.calibration.num_qubits, 7);
            assert_eq!(artifact.representation, method.representation());
        }
    }

    #[test]
    fn test_source_down_fails_everything() {
        let dir = TempDir::new().unwrap();
        let report = save_all(&Broken, dir.path(), true).unwrap();
        assert_eq!(report.failed_count(), 20);
        assert!(dir.path().join("ibm_simulators").is_dir());
    }

    #[test]
    fn test_invalid_snapshot_is_per_item_failure() {
        let dir = TempDir::new().unwrap();
        let mut bad = CalibrationSnapshot::ibm_typical("ibm_brisbane", 3);
        bad.coupling_map.push((0, 9));
        let source = StaticSource::new().with_snapshot(bad);

        let report = save_all(&source, dir.path(), false).unwrap();
        assert_eq!(report.saved_count(), 0);
        assert_eq!(
            json_files(&dir.path().join("ibm_simulators/ibm_brisbane")),
            0
        );
    }

    #[test]
    fn test_rebuild_overwrites() {
        let dir = TempDir::new().unwrap();
        save_all(&brisbane_only(), dir.path(), false).unwrap();

        let source = StaticSource::new()
            .with_snapshot(CalibrationSnapshot::ibm_typical("ibm_brisbane", 9));
        save_all(&source, dir.path(), false).unwrap();

        let store = ArtifactStore::new(dir.path());
        let artifact = store
            .load(IbmBackendName::IbmBrisbane, SimulationMethod::Stabilizer)
            .unwrap();
        assert_eq!(artifact.calibration.num_qubits, 9);
        assert_eq!(json_files(&store.backend_dir(IbmBackendName::IbmBrisbane)), 10);
    }

    #[test]
    fn test_unusable_root_is_hard_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not_a_dir");
        fs::write(&file, "x").unwrap();

        let err = save_all(&brisbane_only(), &file, false).unwrap_err();
        assert!(matches!(err, StoreError::CreateDir { .. }));
    }

    #[test]
    fn test_bad_channel_is_service_init_error() {
        let dir = TempDir::new().unwrap();
        let err = save_ibm_simulators("ibmq", "token", dir.path(), false).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Failed to initialize runtime service:"));
        assert!(dir.path().join("ibm_simulators").is_dir());
    }

    #[test]
    fn test_empty_token_is_service_init_error() {
        let dir = TempDir::new().unwrap();
        let err = save_ibm_simulators("ibm_quantum", "", dir.path(), false).unwrap_err();
        assert!(matches!(err, StoreError::ServiceInit(_)));
    }

    #[test]
    fn test_report_serializes() {
        let dir = TempDir::new().unwrap();
        let report = save_all(&Broken, dir.path(), false).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["backend"], "ibm_brisbane");
        assert_eq!(json["entries"][0]["method"], "aer_simulator_statevector");
        assert!(json["entries"][0]["outcome"]["failed"].is_string());
    }
}
