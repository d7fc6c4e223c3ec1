//! IBM runtime service
//!
//! Gantree: L5_Ibm → RuntimeService
//!
//! Blocking facade over the async client. Owns its tokio runtime and a
//! calibration cache, and turns backend configuration + properties into
//! calibration snapshots.

use crate::auth::{AuthError, IbmChannel, IbmCredentials};
use crate::client::{BackendConfig, BackendProperties, BackendStatus, ClientError, IbmClient, NamedValue};
use chrono::{DateTime, Utc};
use qstash_calibration::{
    CalibrationCache, CalibrationSnapshot, CalibrationSource, QubitCalibration, SourceError,
    TwoQubitCalibration,
};
use thiserror::Error;
use tokio::runtime::Runtime;

/// Two-qubit gates recognised in backend properties
const TWO_QUBIT_GATES: [&str; 3] = ["ecr", "cx", "cz"];

/// Runtime service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Client error
    #[error("{0}")]
    Client(#[from] ClientError),

    /// Async runtime could not be created
    #[error("Async runtime error: {0}")]
    Runtime(String),

    /// Backend data could not be turned into a snapshot
    #[error("Invalid calibration data for {backend}: {reason}")]
    InvalidData {
        /// Backend name
        backend: String,
        /// What was wrong
        reason: String,
    },
}

impl ServiceError {
    fn into_source_error(self, backend: &str) -> SourceError {
        match self {
            ServiceError::Client(ClientError::NotFound(_)) => {
                SourceError::BackendNotFound(backend.to_string())
            }
            ServiceError::InvalidData { backend, reason } => {
                SourceError::InvalidData { backend, reason }
            }
            other => SourceError::Unavailable(other.to_string()),
        }
    }
}

/// Blocking IBM Quantum runtime service
/// Gantree: IbmRuntimeService // sync facade
pub struct IbmRuntimeService {
    runtime: Runtime,
    client: IbmClient,
    cache: CalibrationCache,
}

impl IbmRuntimeService {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create the service without contacting the remote side
    pub fn new(credentials: IbmCredentials) -> Result<Self, ServiceError> {
        Self::with_client(IbmClient::new(credentials)?)
    }

    /// Create the service and check the credentials with a backend listing
    pub fn connect(credentials: IbmCredentials) -> Result<Self, ServiceError> {
        let service = Self::new(credentials)?;
        let backends = service.backends()?;
        log::info!(
            "Connected to IBM Quantum ({}), {} backends visible",
            service.channel(),
            backends.len()
        );
        Ok(service)
    }

    /// Wrap an existing client
    pub fn with_client(client: IbmClient) -> Result<Self, ServiceError> {
        let runtime = Runtime::new().map_err(|e| ServiceError::Runtime(e.to_string()))?;
        Ok(Self {
            runtime,
            client,
            cache: CalibrationCache::default(),
        })
    }

    /// Share a calibration cache
    pub fn with_cache(mut self, cache: CalibrationCache) -> Self {
        self.cache = cache;
        self
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Channel the service talks to
    pub fn channel(&self) -> IbmChannel {
        self.client.credentials().channel()
    }

    /// Calibration cache
    pub fn cache(&self) -> &CalibrationCache {
        &self.cache
    }

    /// Names of visible backends
    pub fn backends(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.runtime.block_on(self.client.list_backends())?)
    }

    /// Status of one backend
    pub fn backend_status(&self, name: &str) -> Result<BackendStatus, ServiceError> {
        Ok(self.runtime.block_on(self.client.backend_status(name))?)
    }

    /// Fetch a fresh snapshot, bypassing the cache
    pub fn fetch_snapshot(&self, name: &str) -> Result<CalibrationSnapshot, ServiceError> {
        let (config, properties) = self.runtime.block_on(async {
            tokio::try_join!(
                self.client.backend_configuration(name),
                self.client.backend_properties(name)
            )
        })?;
        let snapshot = snapshot_from_api(name, &config, &properties)?;
        log::info!("Fetched calibration: {}", snapshot);
        Ok(snapshot)
    }
}

impl CalibrationSource for IbmRuntimeService {
    fn name(&self) -> &str {
        "ibm_runtime"
    }

    fn backend_snapshot(&self, backend: &str) -> Result<CalibrationSnapshot, SourceError> {
        self.cache.get_or_try_fetch(backend, || {
            self.fetch_snapshot(backend)
                .map_err(|e| e.into_source_error(backend))
        })
    }
}

// ============================================================================
// Conversion
// ============================================================================

fn to_micros(v: &NamedValue) -> f64 {
    match v.unit.as_deref() {
        Some("s") => v.value * 1e6,
        Some("ms") => v.value * 1e3,
        Some("ns") => v.value * 1e-3,
        _ => v.value,
    }
}

fn to_nanos(v: &NamedValue) -> f64 {
    match v.unit.as_deref() {
        Some("s") => v.value * 1e9,
        Some("ms") => v.value * 1e6,
        Some("us") | Some("µs") => v.value * 1e3,
        _ => v.value,
    }
}

fn qubit_calibration(values: &[NamedValue]) -> QubitCalibration {
    let mut qubit = QubitCalibration::default();
    for v in values {
        match v.name.as_str() {
            "T1" => qubit.t1_us = Some(to_micros(v)),
            "T2" => qubit.t2_us = Some(to_micros(v)),
            "readout_error" => qubit.readout_error = Some(v.value),
            _ => {}
        }
    }
    qubit
}

/// Build a snapshot from backend configuration and properties
///
/// T1/T2 and readout error come from the qubit properties, the 1q error
/// and duration from `sx`, and the 2q calibration from `ecr`/`cx`/`cz`
/// entries. Unknown properties are ignored.
/// Gantree: snapshot_from_api(name, config, props) -> Result<Snapshot>
pub fn snapshot_from_api(
    backend: &str,
    config: &BackendConfig,
    properties: &BackendProperties,
) -> Result<CalibrationSnapshot, ServiceError> {
    let invalid = |reason: String| ServiceError::InvalidData {
        backend: backend.to_string(),
        reason,
    };

    let num_qubits = config.n_qubits.unwrap_or(properties.qubits.len());
    if num_qubits == 0 {
        return Err(invalid("backend reports no qubits".to_string()));
    }

    let mut snapshot = CalibrationSnapshot::new(backend, num_qubits);
    snapshot.basis_gates = config.basis_gates.clone().unwrap_or_default();
    snapshot.coupling_map = config
        .coupling_map
        .iter()
        .flatten()
        .filter_map(|pair| match pair.as_slice() {
            [a, b] => Some((*a, *b)),
            _ => None,
        })
        .collect();

    for (q, values) in properties.qubits.iter().enumerate().take(num_qubits) {
        snapshot.qubits[q] = qubit_calibration(values);
    }

    for gate in &properties.gates {
        let error = gate.parameter("gate_error").map(|p| p.value);
        let length_ns = gate.parameter("gate_length").map(to_nanos);
        match gate.qubits.as_slice() {
            [q] if gate.gate == "sx" && *q < num_qubits => {
                snapshot.qubits[*q].gate_error_1q = error;
                snapshot.qubits[*q].gate_time_1q_ns = length_ns;
            }
            [a, b] if TWO_QUBIT_GATES.contains(&gate.gate.as_str()) => {
                if let Some(error) = error {
                    snapshot.gates_2q.push(TwoQubitCalibration {
                        qubits: (*a, *b),
                        gate: gate.gate.clone(),
                        error,
                        duration_ns: length_ns,
                    });
                }
            }
            _ => {}
        }
    }

    if let Some(date) = properties.last_update_date.as_deref() {
        match DateTime::parse_from_rfc3339(date) {
            Ok(parsed) => snapshot.last_update = Some(parsed.with_timezone(&Utc)),
            Err(e) => log::warn!("{}: unparseable last_update_date '{}': {}", backend, date, e),
        }
    }

    snapshot
        .validate()
        .map_err(|e| invalid(e.to_string()))?;
    Ok(snapshot)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn config() -> BackendConfig {
        serde_json::from_str(
            r#"{
                "backend_name": "ibm_test",
                "n_qubits": 3,
                "basis_gates": ["ecr", "id", "rz", "sx", "x"],
                "coupling_map": [[0, 1], [2, 1]]
            }"#,
        )
        .unwrap()
    }

    fn properties() -> BackendProperties {
        serde_json::from_str(
            r#"{
                "last_update_date": "2025-03-01T08:15:21-04:00",
                "qubits": [
                    [
                        {"name": "T1", "value": 210.5, "unit": "us"},
                        {"name": "T2", "value": 0.15, "unit": "ms"},
                        {"name": "readout_error", "value": 0.02, "unit": ""},
                        {"name": "frequency", "value": 4.8, "unit": "GHz"}
                    ],
                    [
                        {"name": "T1", "value": 180.0, "unit": "us"},
                        {"name": "readout_error", "value": 0.011, "unit": ""}
                    ],
                    []
                ],
                "gates": [
                    {"gate": "sx", "qubits": [0], "parameters": [
                        {"name": "gate_error", "value": 0.0003, "unit": ""},
                        {"name": "gate_length", "value": 0.06, "unit": "us"}
                    ]},
                    {"gate": "ecr", "qubits": [0, 1], "parameters": [
                        {"name": "gate_error", "value": 0.007, "unit": ""},
                        {"name": "gate_length", "value": 660.0, "unit": "ns"}
                    ]},
                    {"gate": "ecr", "qubits": [2, 1], "parameters": [
                        {"name": "gate_length", "value": 660.0, "unit": "ns"}
                    ]},
                    {"gate": "rz", "qubits": [1], "parameters": []}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_snapshot_from_api() {
        let snapshot = snapshot_from_api("ibm_test", &config(), &properties()).unwrap();
        assert_eq!(snapshot.num_qubits, 3);
        assert_eq!(snapshot.coupling_map, vec![(0, 1), (2, 1)]);
        assert_eq!(snapshot.two_qubit_gate(), Some("ecr"));

        let q0 = &snapshot.qubits[0];
        assert_abs_diff_eq!(q0.t1_us.unwrap(), 210.5);
        assert_abs_diff_eq!(q0.t2_us.unwrap(), 150.0, epsilon = 1e-9);
        assert_abs_diff_eq!(q0.gate_time_1q_ns.unwrap(), 60.0, epsilon = 1e-9);
        assert_eq!(q0.gate_error_1q, Some(0.0003));
        assert_eq!(snapshot.qubits[1].t2_us, None);
        assert_eq!(snapshot.qubits[2], QubitCalibration::default());

        // The edge without gate_error is skipped
        assert_eq!(snapshot.gates_2q.len(), 1);
        assert_eq!(snapshot.gates_2q[0].duration_ns, Some(660.0));

        let updated = snapshot.last_update.unwrap();
        assert_eq!(updated.to_rfc3339(), "2025-03-01T12:15:21+00:00");
    }

    #[test]
    fn test_qubit_count_falls_back_to_properties() {
        let mut cfg = config();
        cfg.n_qubits = None;
        let snapshot = snapshot_from_api("ibm_test", &cfg, &properties()).unwrap();
        assert_eq!(snapshot.num_qubits, 3);
    }

    #[test]
    fn test_empty_backend_is_invalid() {
        let cfg: BackendConfig = serde_json::from_str("{}").unwrap();
        let props: BackendProperties = serde_json::from_str("{}").unwrap();
        let err = snapshot_from_api("ibm_void", &cfg, &props).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidData { .. }));
        assert!(matches!(
            err.into_source_error("ibm_void"),
            SourceError::InvalidData { .. }
        ));
    }

    #[test]
    fn test_out_of_range_coupling_is_invalid() {
        let mut cfg = config();
        cfg.coupling_map = Some(vec![vec![0, 7]]);
        assert!(snapshot_from_api("ibm_test", &cfg, &properties()).is_err());
    }

    #[test]
    fn test_not_found_maps_to_backend_not_found() {
        let err = ServiceError::Client(ClientError::NotFound("/backends/x/configuration".into()));
        assert_eq!(
            err.into_source_error("x"),
            SourceError::BackendNotFound("x".to_string())
        );
        let err = ServiceError::Client(ClientError::ServiceUnavailable);
        assert!(matches!(err.into_source_error("x"), SourceError::Unavailable(_)));
    }

    #[test]
    fn test_cached_snapshot_skips_network() {
        let creds = IbmCredentials::new("token", IbmChannel::IbmQuantum);
        let client = IbmClient::with_base_url(creds, "http://127.0.0.1:9").unwrap();
        let cache = CalibrationCache::default();
        cache.insert("ibm_test", CalibrationSnapshot::ibm_typical("ibm_test", 3));
        let service = IbmRuntimeService::with_client(client).unwrap().with_cache(cache);

        let snapshot = service.backend_snapshot("ibm_test").unwrap();
        assert_eq!(snapshot.num_qubits, 3);
    }

    #[test]
    #[ignore = "requires network access and IBM_API_TOKEN"]
    fn test_fetch_snapshot_live() {
        let token = std::env::var("IBM_API_TOKEN").unwrap();
        let service =
            IbmRuntimeService::connect(IbmCredentials::new(token, IbmChannel::IbmQuantum)).unwrap();
        let snapshot = service.backend_snapshot("ibm_brisbane").unwrap();
        assert_eq!(snapshot.num_qubits, 127);
    }
}
