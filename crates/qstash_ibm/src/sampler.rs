//! Local sampler primitive
//!
//! Gantree: L5_Ibm → Sampler
//!
//! Runs a batch of circuits against any [`Backend`] on a background
//! thread. The returned [`SamplerJob`] is polled for status or waited on
//! for the per-circuit counts.

use qstash_core::{Circuit, Counts, QstashError};
use qstash_sim::{Backend, ExecutionMetadata, ExecutionResult, DEFAULT_SHOTS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Sampler errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SamplerError {
    /// A circuit failed to execute
    #[error("Circuit {index} failed: {source}")]
    Execution {
        /// Position of the circuit in the submitted batch
        index: usize,
        /// Underlying simulation error
        source: QstashError,
    },

    /// The worker thread could not be started
    #[error("Failed to start sampler worker: {0}")]
    Spawn(String),

    /// The worker thread panicked
    #[error("Sampler worker panicked: {0}")]
    WorkerPanicked(String),

    /// Result requested before the job finished
    #[error("Job {0} has not finished")]
    ResultsNotReady(String),

    /// Wait timed out
    #[error("Job did not finish within {0:?}")]
    Timeout(Duration),
}

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Submitted, not yet picked up
    Queued,
    /// Executing
    Running,
    /// All circuits executed
    Completed,
    /// A circuit failed
    Failed,
}

impl JobStatus {
    /// Check if job is in terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if job is still running
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Check if job completed successfully
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Results
// ============================================================================

/// Result for one submitted circuit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubResult {
    /// Counts over the classical register (clbit 0 rightmost)
    pub counts: Counts,

    /// Shots executed
    pub shots: u64,

    /// Execution metadata
    pub metadata: ExecutionMetadata,
}

impl PubResult {
    /// Most frequent bitstring
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        self.counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(bs, &count)| (bs.as_str(), count))
    }

    /// Relative frequency of a bitstring
    pub fn probability(&self, bitstring: &str) -> f64 {
        if self.shots == 0 {
            return 0.0;
        }
        self.counts.get(bitstring).copied().unwrap_or(0) as f64 / self.shots as f64
    }
}

impl From<ExecutionResult> for PubResult {
    fn from(result: ExecutionResult) -> Self {
        Self {
            counts: result.counts,
            shots: result.shots,
            metadata: result.metadata,
        }
    }
}

/// Result of a sampler job, one entry per circuit in submission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerResult {
    /// Job id
    pub job_id: String,

    /// Per-circuit results
    pub pubs: Vec<PubResult>,
}

impl SamplerResult {
    /// Number of circuit results
    pub fn len(&self) -> usize {
        self.pubs.len()
    }

    /// Check if the job had no circuits
    pub fn is_empty(&self) -> bool {
        self.pubs.is_empty()
    }

    /// Result of the `index`-th circuit
    pub fn get(&self, index: usize) -> Option<&PubResult> {
        self.pubs.get(index)
    }
}

impl std::ops::Index<usize> for SamplerResult {
    type Output = PubResult;

    fn index(&self, index: usize) -> &Self::Output {
        &self.pubs[index]
    }
}

// ============================================================================
// Sampler
// ============================================================================

/// Sampler bound to one backend
#[derive(Clone)]
pub struct Sampler {
    backend: Arc<dyn Backend>,
    default_shots: u64,
}

impl fmt::Debug for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler")
            .field("backend", &self.backend.name())
            .field("default_shots", &self.default_shots)
            .finish()
    }
}

impl Sampler {
    /// Create a sampler with 1024 default shots
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            default_shots: DEFAULT_SHOTS,
        }
    }

    /// Set the default shots
    pub fn with_shots(mut self, shots: u64) -> Self {
        self.default_shots = shots;
        self
    }

    /// Bound backend
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Default shots
    pub fn default_shots(&self) -> u64 {
        self.default_shots
    }

    /// Submit circuits with the default shots
    pub fn run(&self, circuits: Vec<Circuit>) -> SamplerJob {
        self.run_with_shots(circuits, self.default_shots)
    }

    /// Submit circuits with explicit shots
    pub fn run_with_shots(&self, circuits: Vec<Circuit>, shots: u64) -> SamplerJob {
        let job = SamplerJob::queued(self.backend.name());
        log::debug!(
            "Submitting job {} ({} circuits, {} shots) to {}",
            job.id,
            circuits.len(),
            shots,
            job.backend
        );

        let backend = Arc::clone(&self.backend);
        let shared = Arc::clone(&job.shared);
        let job_id = job.id.clone();
        let spawned = thread::Builder::new()
            .name(format!("sampler-{}", &job.id[..8]))
            .spawn(move || {
                shared.set_status(JobStatus::Running);
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    execute_all(backend.as_ref(), &circuits, shots, &job_id)
                }))
                .unwrap_or_else(|payload| {
                    Err(SamplerError::WorkerPanicked(panic_message(&*payload)))
                });
                shared.finish(outcome);
            });

        if let Err(e) = spawned {
            job.shared.finish(Err(SamplerError::Spawn(e.to_string())));
        }
        job
    }
}

fn execute_all(
    backend: &dyn Backend,
    circuits: &[Circuit],
    shots: u64,
    job_id: &str,
) -> Result<SamplerResult, SamplerError> {
    let pubs = circuits
        .iter()
        .enumerate()
        .map(|(index, circuit)| {
            backend
                .execute(circuit, shots)
                .map(PubResult::from)
                .map_err(|source| SamplerError::Execution { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SamplerResult {
        job_id: job_id.to_string(),
        pubs,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Job
// ============================================================================

#[derive(Debug)]
struct JobState {
    status: JobStatus,
    outcome: Option<Result<SamplerResult, SamplerError>>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<JobState>,
    done: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, JobState> {
        // State is only ever replaced wholesale, so a poisoned lock is still consistent
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, status: JobStatus) {
        self.lock().status = status;
    }

    fn finish(&self, outcome: Result<SamplerResult, SamplerError>) {
        let mut state = self.lock();
        state.status = match &outcome {
            Ok(_) => JobStatus::Completed,
            Err(e) => {
                log::warn!("Sampler job failed: {}", e);
                JobStatus::Failed
            }
        };
        state.outcome = Some(outcome);
        self.done.notify_all();
    }
}

/// Handle to a submitted sampler job
#[derive(Debug, Clone)]
pub struct SamplerJob {
    id: String,
    backend: String,
    shared: Arc<Shared>,
}

impl SamplerJob {
    fn queued(backend: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            backend: backend.to_string(),
            shared: Arc::new(Shared {
                state: Mutex::new(JobState {
                    status: JobStatus::Queued,
                    outcome: None,
                }),
                done: Condvar::new(),
            }),
        }
    }

    /// Job id (uuid v4)
    pub fn job_id(&self) -> &str {
        &self.id
    }

    /// Backend name
    pub fn backend_name(&self) -> &str {
        &self.backend
    }

    /// Current status
    pub fn status(&self) -> JobStatus {
        self.shared.lock().status
    }

    /// Check if job finished, successfully or not
    pub fn done(&self) -> bool {
        self.status().is_terminal()
    }

    /// Block until the job finishes and return its result
    pub fn wait(&self) -> Result<SamplerResult, SamplerError> {
        let state = self.shared.lock();
        let state = self
            .shared
            .done
            .wait_while(state, |s| s.outcome.is_none())
            .unwrap_or_else(|e| e.into_inner());
        match &state.outcome {
            Some(outcome) => outcome.clone(),
            None => Err(SamplerError::ResultsNotReady(self.id.clone())),
        }
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Result<SamplerResult, SamplerError> {
        let state = self.shared.lock();
        let (state, _) = self
            .shared
            .done
            .wait_timeout_while(state, timeout, |s| s.outcome.is_none())
            .unwrap_or_else(|e| e.into_inner());
        match &state.outcome {
            Some(outcome) => outcome.clone(),
            None => Err(SamplerError::Timeout(timeout)),
        }
    }

    /// Result of a finished job, without blocking
    pub fn result(&self) -> Result<SamplerResult, SamplerError> {
        match &self.shared.lock().outcome {
            Some(outcome) => outcome.clone(),
            None => Err(SamplerError::ResultsNotReady(self.id.clone())),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use qstash_calibration::CalibrationSnapshot;
    use qstash_core::{CircuitBuilder, QstashResult};
    use qstash_sim::{SimulationMethod, SimulatorBackend};

    fn ideal(n: usize, method: SimulationMethod) -> Arc<dyn Backend> {
        Arc::new(SimulatorBackend::ideal(n, method).with_seed(11))
    }

    struct Stalled(Arc<(Mutex<bool>, Condvar)>);

    impl Backend for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        fn num_qubits(&self) -> usize {
            1
        }

        fn execute(&self, _circuit: &Circuit, shots: u64) -> QstashResult<ExecutionResult> {
            let (lock, cvar) = &*self.0;
            let mut released = lock.lock().unwrap();
            while !*released {
                released = cvar.wait(released).unwrap();
            }
            let mut counts = Counts::new();
            counts.insert("0".to_string(), shots);
            Ok(ExecutionResult::new(counts, shots, "stalled"))
        }
    }

    #[test]
    fn test_default_shots() {
        let sampler = Sampler::new(ideal(1, SimulationMethod::Statevector));
        assert_eq!(sampler.default_shots(), 1024);
        assert_eq!(sampler.with_shots(10).default_shots(), 10);
    }

    #[test]
    fn test_run_bell() {
        let sampler = Sampler::new(ideal(2, SimulationMethod::Statevector));
        let bell = CircuitBuilder::new(2).h(0).cx(0, 1).measure_all().build();
        let job = sampler.run(vec![bell]);

        let result = job.wait().unwrap();
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(result.job_id, job.job_id());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].shots, 1024);
        let correlated = result[0].counts.get("00").copied().unwrap_or(0)
            + result[0].counts.get("11").copied().unwrap_or(0);
        assert_eq!(correlated, 1024);
    }

    #[test]
    fn test_results_keep_submission_order() {
        let sampler = Sampler::new(ideal(2, SimulationMethod::Statevector)).with_shots(50);
        let circuits = vec![
            CircuitBuilder::new(2).x(0).measure_all().build(),
            CircuitBuilder::new(2).x(1).measure_all().build(),
            CircuitBuilder::new(2).measure_all().build(),
        ];
        let result = sampler.run(circuits).wait().unwrap();
        assert_eq!(result[0].most_frequent(), Some(("01", 50)));
        assert_eq!(result[1].most_frequent(), Some(("10", 50)));
        assert_eq!(result[2].probability("00"), 1.0);
    }

    #[test]
    fn test_empty_batch_completes() {
        let sampler = Sampler::new(ideal(1, SimulationMethod::Statevector));
        let result = sampler.run(Vec::new()).wait().unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_failure_reports_circuit_index() {
        let sampler = Sampler::new(ideal(1, SimulationMethod::Stabilizer));
        let circuits = vec![
            CircuitBuilder::new(1).h(0).measure_all().build(),
            CircuitBuilder::new(1).t(0).measure_all().build(),
        ];
        let job = sampler.run(circuits);
        let err = job.wait().unwrap_err();
        assert_eq!(job.status(), JobStatus::Failed);
        assert!(matches!(err, SamplerError::Execution { index: 1, .. }));
        assert!(err.to_string().contains("aer_simulator_stabilizer"));
    }

    #[test]
    fn test_unitary_method_rejects_measurement() {
        let sampler = Sampler::new(ideal(1, SimulationMethod::Unitary));
        let circuit = CircuitBuilder::new(1).h(0).measure_all().build();
        let err = sampler.run(vec![circuit]).wait().unwrap_err();
        assert!(err.to_string().contains("unitary"));
    }

    #[test]
    fn test_status_before_completion() {
        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        let sampler = Sampler::new(Arc::new(Stalled(Arc::clone(&gate))));
        let job = sampler.run(vec![CircuitBuilder::new(1).measure_all().build()]);

        assert!(job.status().is_running());
        assert!(matches!(job.result(), Err(SamplerError::ResultsNotReady(_))));
        assert!(matches!(
            job.wait_timeout(Duration::from_millis(20)),
            Err(SamplerError::Timeout(_))
        ));

        {
            let (lock, cvar) = &*gate;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        }
        let result = job.wait().unwrap();
        assert!(job.done());
        assert_eq!(result[0].counts.get("0"), Some(&1024));
        assert_eq!(job.result().unwrap(), result);
    }

    #[test]
    fn test_job_ids_are_unique() {
        let sampler = Sampler::new(ideal(1, SimulationMethod::Statevector));
        let a = sampler.run(Vec::new());
        let b = sampler.run(Vec::new());
        assert_ne!(a.job_id(), b.job_id());
        assert_eq!(a.job_id().len(), 36);
        assert_eq!(a.backend_name(), b.backend_name());
    }

    #[test]
    fn test_noisy_backend() {
        let snapshot = CalibrationSnapshot::ibm_typical("ibm_test", 2);
        let sim = SimulatorBackend::from_snapshot(
            snapshot,
            SimulationMethod::DensityMatrix,
            Default::default(),
        )
        .unwrap()
        .with_seed(5);
        let sampler = Sampler::new(Arc::new(sim)).with_shots(200);
        let circuit = CircuitBuilder::new(2).x(0).measure_all().build();
        let result = sampler.run(vec![circuit]).wait().unwrap();
        assert_eq!(result[0].counts.values().sum::<u64>(), 200);
        assert_eq!(result[0].most_frequent().map(|(bs, _)| bs), Some("01"));
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_string(&JobStatus::Completed).unwrap(), "\"COMPLETED\"");
        assert_eq!(JobStatus::Failed.to_string(), "FAILED");
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Failed.is_success());
    }
}
