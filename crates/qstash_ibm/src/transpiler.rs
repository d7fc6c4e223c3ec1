//! Circuit transpilation for IBM targets
//!
//! Gantree: L5_Ibm → Transpiler
//!
//! Optimization level 1 pipeline:
//! width check → MeasureAll expansion → 3q decomposition → trivial
//! layout → SWAP routing → basis translation → 1q fusion → inverse
//! cancellation. The output acts on all physical qubits of the target
//! and keeps the caller's classical register.

use num_complex::Complex64;
use qstash_calibration::CalibrationSnapshot;
use qstash_core::gate::{identity2, mat2_equiv, mat2_mul};
use qstash_core::{Angle, Circuit, Gate, Matrix2, QstashError, QstashResult, QubitId, Topology};
use std::f64::consts::{FRAC_PI_2, PI};

/// IBM native gate set
pub const IBM_BASIS_GATES: &[&str] = &["ecr", "id", "rz", "sx", "x"];

/// Tolerance for angle and matrix comparisons
const EPS: f64 = 1e-9;

/// Transpiler configuration
#[derive(Debug, Clone)]
pub struct TranspilerConfig {
    /// Target basis gates
    pub basis_gates: Vec<String>,

    /// Coupling map (empty means all-to-all)
    pub coupling_map: Vec<(QubitId, QubitId)>,

    /// Optimization level (0 or 1)
    pub optimization_level: u8,

    /// Number of qubits on target
    pub num_qubits: usize,
}

impl Default for TranspilerConfig {
    fn default() -> Self {
        Self {
            basis_gates: IBM_BASIS_GATES.iter().map(|s| s.to_string()).collect(),
            coupling_map: Vec::new(),
            optimization_level: 1,
            num_qubits: 127,
        }
    }
}

impl TranspilerConfig {
    /// Target described by a calibration snapshot
    pub fn from_snapshot(snapshot: &CalibrationSnapshot) -> Self {
        Self {
            basis_gates: snapshot.basis_gates.clone(),
            coupling_map: snapshot.coupling_map.clone(),
            optimization_level: 1,
            num_qubits: snapshot.num_qubits,
        }
    }

    /// Set optimization level
    pub fn with_optimization_level(mut self, level: u8) -> Self {
        self.optimization_level = level.min(1);
        self
    }

    fn has(&self, gate: &str) -> bool {
        self.basis_gates.iter().any(|b| b == gate)
    }
}

/// Circuit transpiler
/// Gantree: Transpiler // level-1 pass manager
#[derive(Debug, Clone)]
pub struct Transpiler {
    config: TranspilerConfig,
    topology: Option<Topology>,
}

impl Transpiler {
    /// Create a transpiler for a target
    pub fn new(config: TranspilerConfig) -> QstashResult<Self> {
        let topology = if config.coupling_map.is_empty() {
            None
        } else {
            Some(Topology::from_coupling_map(
                config.coupling_map.clone(),
                config.num_qubits,
            )?)
        };
        for required in ["rz", "sx"] {
            if !config.has(required) {
                return Err(QstashError::TranspileError(format!(
                    "target basis {:?} lacks '{}'",
                    config.basis_gates, required
                )));
            }
        }
        Ok(Self { config, topology })
    }

    /// Transpiler for the device a snapshot describes
    pub fn for_snapshot(snapshot: &CalibrationSnapshot) -> QstashResult<Self> {
        Self::new(TranspilerConfig::from_snapshot(snapshot))
    }

    /// Configuration
    pub fn config(&self) -> &TranspilerConfig {
        &self.config
    }

    /// Transpile to the target's native gates and connectivity
    /// Gantree: transpile(&Circuit) -> Result<Circuit> // level-1 pipeline
    pub fn transpile(&self, circuit: &Circuit) -> QstashResult<Circuit> {
        if circuit.num_qubits() > self.config.num_qubits {
            return Err(QstashError::CircuitTooWide {
                required: circuit.num_qubits(),
                available: self.config.num_qubits,
            });
        }

        let gates = expand_measure_all(circuit);
        let gates = decompose(gates);
        let gates = self.route(gates)?;
        let gates = self.translate(gates)?;
        let gates = if self.config.optimization_level >= 1 {
            let gates = cancel_inverse_pairs(gates, self.config.num_qubits);
            let gates = self.fuse_single_qubit_runs(gates);
            cancel_inverse_pairs(gates, self.config.num_qubits)
        } else {
            gates
        };

        let mut out = Circuit::with_clbits(self.config.num_qubits, circuit.num_clbits());
        if let Some(name) = circuit.name() {
            out.set_name(name);
        }
        out.add_gates(gates)?;
        log::debug!(
            "transpiled {} gates into {} (depth {})",
            circuit.gate_count(),
            out.gate_count(),
            out.depth()
        );
        Ok(out)
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// Trivial layout, then SWAPs along shortest paths
    fn route(&self, gates: Vec<Gate>) -> QstashResult<Vec<Gate>> {
        let topology = match &self.topology {
            Some(topology) => topology,
            None => return Ok(gates),
        };

        let n = self.config.num_qubits;
        let mut l2p: Vec<QubitId> = (0..n).collect();
        let mut p2l: Vec<QubitId> = (0..n).collect();
        let mut out = Vec::with_capacity(gates.len());

        for gate in gates {
            if let [a, b] = gate.qubits()[..] {
                let (pa, pb) = (l2p[a], l2p[b]);
                if gate.is_two_qubit() && !topology.is_connected(pa, pb) {
                    let path = topology
                        .shortest_path(pa, pb)
                        .ok_or(QstashError::PathNotFound(pa, pb))?;
                    for hop in path.windows(2).take(path.len() - 2) {
                        let (x, y) = (hop[0], hop[1]);
                        out.extend(swap_as_cx(x, y));
                        let (lx, ly) = (p2l[x], p2l[y]);
                        p2l.swap(x, y);
                        l2p[lx] = y;
                        l2p[ly] = x;
                    }
                }
            }
            out.push(gate.map_qubits(|q| l2p[q]));
        }
        Ok(out)
    }

    // ========================================================================
    // Basis translation
    // ========================================================================

    fn translate(&self, gates: Vec<Gate>) -> QstashResult<Vec<Gate>> {
        let mut out = Vec::with_capacity(gates.len());
        for gate in gates {
            match gate {
                Gate::Cnot(c, t) => self.translate_cx(c, t, &mut out)?,
                Gate::Ecr(a, b) if !self.config.has("ecr") => {
                    for g in ecr_as_cx(a, b) {
                        match g {
                            Gate::Cnot(c, t) => self.translate_cx(c, t, &mut out)?,
                            other => self.translate_1q(other, &mut out),
                        }
                    }
                }
                g if g.is_single_qubit() => self.translate_1q(g, &mut out),
                g => out.push(g),
            }
        }
        Ok(out)
    }

    fn translate_cx(&self, c: QubitId, t: QubitId, out: &mut Vec<Gate>) -> QstashResult<()> {
        if self.config.has("cx") {
            out.push(Gate::Cnot(c, t));
        } else if self.config.has("ecr") {
            // CX ≅ rz(-π/2) c, rx(-π/2) t, ecr(c, t), x c
            self.translate_1q(Gate::Rz(c, -FRAC_PI_2), out);
            self.translate_1q(Gate::Rx(t, -FRAC_PI_2), out);
            out.push(Gate::Ecr(c, t));
            self.translate_1q(Gate::X(c), out);
        } else if self.config.has("cz") {
            self.translate_1q(Gate::H(t), out);
            out.push(Gate::Cz(c, t));
            self.translate_1q(Gate::H(t), out);
        } else {
            return Err(QstashError::TranspileError(format!(
                "target basis {:?} has no two-qubit gate",
                self.config.basis_gates
            )));
        }
        Ok(())
    }

    fn translate_1q(&self, gate: Gate, out: &mut Vec<Gate>) {
        if self.config.has(gate.name()) {
            out.push(gate);
            return;
        }
        let qubit = gate.qubits()[0];
        if let Some(matrix) = gate.matrix() {
            out.extend(zsx_sequence(&matrix, qubit, self.config.has("x")));
        }
    }

    // ========================================================================
    // Optimization
    // ========================================================================

    /// Merge runs of single-qubit gates and resynthesize them
    fn fuse_single_qubit_runs(&self, gates: Vec<Gate>) -> Vec<Gate> {
        let has_x = self.config.has("x");
        let mut pending: Vec<Option<Matrix2>> = vec![None; self.config.num_qubits];
        let mut out = Vec::with_capacity(gates.len());

        let flush = |q: QubitId, pending: &mut Vec<Option<Matrix2>>, out: &mut Vec<Gate>| {
            if let Some(m) = pending[q].take() {
                out.extend(zsx_sequence(&m, q, has_x));
            }
        };

        for gate in gates {
            match gate.matrix() {
                Some(m) => {
                    let q = gate.qubits()[0];
                    let acc = pending[q].unwrap_or_else(identity2);
                    pending[q] = Some(mat2_mul(&m, &acc));
                }
                None => {
                    let touched = match &gate {
                        Gate::Barrier(qs) if qs.is_empty() => (0..pending.len()).collect(),
                        g => g.qubits(),
                    };
                    for q in touched {
                        flush(q, &mut pending, &mut out);
                    }
                    out.push(gate);
                }
            }
        }
        for q in 0..pending.len() {
            flush(q, &mut pending, &mut out);
        }
        out
    }
}

// ============================================================================
// Passes
// ============================================================================

fn expand_measure_all(circuit: &Circuit) -> Vec<Gate> {
    let mut out = Vec::with_capacity(circuit.gate_count());
    for gate in circuit.gates() {
        match gate {
            Gate::MeasureAll => out.extend((0..circuit.num_qubits()).map(|q| Gate::Measure(q, q))),
            g => out.push(g.clone()),
        }
    }
    out
}

/// Lower every multi-qubit gate to CX/ECR plus single-qubit gates
fn decompose(gates: Vec<Gate>) -> Vec<Gate> {
    let mut out = Vec::with_capacity(gates.len());
    for gate in gates {
        match gate {
            Gate::Ccx(a, b, c) => out.extend(ccx_as_cx(a, b, c)),
            Gate::Cswap(c, a, b) => {
                out.push(Gate::Cnot(b, a));
                out.extend(ccx_as_cx(c, a, b));
                out.push(Gate::Cnot(b, a));
            }
            Gate::Cz(a, b) => out.extend([Gate::H(b), Gate::Cnot(a, b), Gate::H(b)]),
            Gate::Cy(c, t) => out.extend([Gate::Sdg(t), Gate::Cnot(c, t), Gate::S(t)]),
            Gate::Swap(a, b) => out.extend(swap_as_cx(a, b)),
            Gate::Crz(c, t, theta) => out.extend([
                Gate::Rz(t, theta / 2.0),
                Gate::Cnot(c, t),
                Gate::Rz(t, -theta / 2.0),
                Gate::Cnot(c, t),
            ]),
            g => out.push(g),
        }
    }
    out
}

fn swap_as_cx(a: QubitId, b: QubitId) -> [Gate; 3] {
    [Gate::Cnot(a, b), Gate::Cnot(b, a), Gate::Cnot(a, b)]
}

/// ECR = X_a · RZX(π/2)
fn ecr_as_cx(a: QubitId, b: QubitId) -> [Gate; 6] {
    [
        Gate::H(b),
        Gate::Cnot(a, b),
        Gate::Rz(b, FRAC_PI_2),
        Gate::Cnot(a, b),
        Gate::H(b),
        Gate::X(a),
    ]
}

/// Six-CX Toffoli
fn ccx_as_cx(a: QubitId, b: QubitId, c: QubitId) -> Vec<Gate> {
    vec![
        Gate::H(c),
        Gate::Cnot(b, c),
        Gate::Tdg(c),
        Gate::Cnot(a, c),
        Gate::T(c),
        Gate::Cnot(b, c),
        Gate::Tdg(c),
        Gate::Cnot(a, c),
        Gate::T(b),
        Gate::T(c),
        Gate::H(c),
        Gate::Cnot(a, b),
        Gate::T(a),
        Gate::Tdg(b),
        Gate::Cnot(a, b),
    ]
}

/// Drop adjacent identical self-inverse two-qubit gates
fn cancel_inverse_pairs(gates: Vec<Gate>, num_qubits: usize) -> Vec<Gate> {
    let mut out: Vec<Option<Gate>> = Vec::with_capacity(gates.len());
    let mut history: Vec<Vec<usize>> = vec![Vec::new(); num_qubits];

    for gate in gates {
        if gate.is_two_qubit() && gate.is_self_inverse() {
            let qs = gate.qubits();
            let (a, b) = (qs[0], qs[1]);
            let last = (history[a].last().copied(), history[b].last().copied());
            if let (Some(i), Some(j)) = last {
                if i == j && out[i].as_ref() == Some(&gate) {
                    out[i] = None;
                    history[a].pop();
                    history[b].pop();
                    continue;
                }
            }
        }

        let touched = match &gate {
            Gate::Barrier(qs) if qs.is_empty() => (0..num_qubits).collect(),
            g => g.qubits(),
        };
        for q in touched {
            history[q].push(out.len());
        }
        out.push(Some(gate));
    }
    out.into_iter().flatten().collect()
}

// ============================================================================
// ZSX synthesis
// ============================================================================

/// Wrap an angle into (-π, π]
fn wrap(angle: Angle) -> Angle {
    let a = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if a <= -PI + EPS {
        PI
    } else {
        a
    }
}

fn rz(q: QubitId, angle: Angle) -> Option<Gate> {
    let a = wrap(angle);
    (a.abs() > EPS).then_some(Gate::Rz(q, a))
}

/// Euler angles (θ, φ, λ) with `m ≅ U(θ, φ, λ)`
fn zyz_angles(m: &Matrix2) -> (Angle, Angle, Angle) {
    let det = m[0][0] * m[1][1] - m[0][1] * m[1][0];
    let scale = Complex64::new(1.0, 0.0) / det.sqrt();
    let v00 = m[0][0] * scale;
    let v10 = m[1][0] * scale;
    let v11 = m[1][1] * scale;

    let theta = 2.0 * v10.norm().atan2(v00.norm());
    let sum = if v11.norm() > EPS { 2.0 * v11.arg() } else { 0.0 };
    let diff = if v10.norm() > EPS { 2.0 * v10.arg() } else { 0.0 };
    (theta, (sum + diff) / 2.0, (sum - diff) / 2.0)
}

/// Gates from {rz, sx, x} implementing `m` up to global phase, in time order
/// Gantree: zsx_sequence(matrix, q) -> Vec<Gate> // 1q resynthesis
pub fn zsx_sequence(m: &Matrix2, q: QubitId, has_x: bool) -> Vec<Gate> {
    if mat2_equiv(m, &identity2(), EPS) {
        return Vec::new();
    }
    let (theta, phi, lambda) = zyz_angles(m);

    let gates: Vec<Option<Gate>> = if theta.abs() < EPS {
        vec![rz(q, phi + lambda)]
    } else if (theta - FRAC_PI_2).abs() < EPS {
        vec![
            rz(q, lambda - FRAC_PI_2),
            Some(Gate::Sx(q)),
            rz(q, phi + FRAC_PI_2),
        ]
    } else if has_x && (theta - PI).abs() < EPS {
        vec![rz(q, lambda - phi + PI), Some(Gate::X(q))]
    } else {
        vec![
            rz(q, lambda),
            Some(Gate::Sx(q)),
            rz(q, theta + PI),
            Some(Gate::Sx(q)),
            rz(q, phi + PI),
        ]
    };
    gates.into_iter().flatten().collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use qstash_core::gate::u_matrix;
    use qstash_core::CircuitBuilder;
    use qstash_sim::{Backend, SimulationMethod, SimulatorBackend};
    use std::f64::consts::{FRAC_PI_3, FRAC_PI_4};

    fn product(gates: &[Gate]) -> Matrix2 {
        gates.iter().fold(identity2(), |acc, g| {
            mat2_mul(&g.matrix().unwrap(), &acc)
        })
    }

    fn eagle_line(n: usize) -> Transpiler {
        let snapshot = CalibrationSnapshot::ibm_typical("ibm_line", n);
        Transpiler::for_snapshot(&snapshot).unwrap()
    }

    fn only_counts(circuit: &Circuit) -> String {
        let sim = SimulatorBackend::ideal(circuit.num_qubits(), SimulationMethod::Statevector)
            .with_seed(3);
        let result = sim.execute(circuit, 200).unwrap();
        assert_eq!(result.counts.len(), 1, "{:?}", result.counts);
        result.counts.keys().next().unwrap().clone()
    }

    #[test]
    fn test_zsx_reproduces_matrices() {
        let cases = [
            Gate::H(0),
            Gate::X(0),
            Gate::Y(0),
            Gate::T(0),
            Gate::Sxdg(0),
            Gate::Rx(0, -FRAC_PI_2),
            Gate::Ry(0, 0.3),
            Gate::Rz(0, 1.2),
            Gate::U(0, 2.1, -0.4, 0.9),
            Gate::U(0, PI, 0.5, 0.2),
            Gate::U(0, FRAC_PI_2, FRAC_PI_3, FRAC_PI_4),
        ];
        for gate in cases {
            let m = gate.matrix().unwrap();
            for has_x in [true, false] {
                let seq = zsx_sequence(&m, 0, has_x);
                assert!(
                    seq.iter().all(|g| matches!(g, Gate::Rz(..) | Gate::Sx(_) | Gate::X(_))),
                    "{:?}",
                    seq
                );
                assert!(mat2_equiv(&product(&seq), &m, 1e-9), "{} -> {:?}", gate, seq);
            }
        }
    }

    #[test]
    fn test_zsx_short_forms() {
        assert!(zsx_sequence(&identity2(), 0, true).is_empty());
        assert_eq!(zsx_sequence(&Gate::X(0).matrix().unwrap(), 0, true), vec![Gate::X(0)]);
        assert_eq!(zsx_sequence(&Gate::Sx(0).matrix().unwrap(), 0, true), vec![Gate::Sx(0)]);
        assert_eq!(zsx_sequence(&Gate::S(0).matrix().unwrap(), 2, true).len(), 1);
        assert_eq!(zsx_sequence(&Gate::H(0).matrix().unwrap(), 0, true).len(), 3);
        assert_eq!(zsx_sequence(&u_matrix(0.7, 0.1, 0.2), 0, true).len(), 5);
    }

    #[test]
    fn test_output_uses_only_native_gates() {
        let circuit = CircuitBuilder::new(4)
            .h(0)
            .t(1)
            .cz(1, 2)
            .ccx(0, 1, 3)
            .swap(2, 3)
            .crz(0, 2, 0.4)
            .measure_all()
            .build();
        let out = eagle_line(5).transpile(&circuit).unwrap();
        assert_eq!(out.num_qubits(), 5);
        assert_eq!(out.num_clbits(), 4);
        for gate in out.gates() {
            assert!(
                matches!(gate.name(), "ecr" | "rz" | "sx" | "x" | "measure"),
                "{}",
                gate
            );
        }
        assert_eq!(out.count_measurements(), 4);
        assert!(out.validate(&Topology::linear(5)).is_ok());
    }

    #[test]
    fn test_cx_translation_is_exact() {
        let t = eagle_line(2);
        for (prep, expected) in [(vec![], "00"), (vec![0], "11"), (vec![1], "10"), (vec![0, 1], "01")] {
            let mut builder = CircuitBuilder::new(2);
            for q in prep {
                builder = builder.x(q);
            }
            let circuit = builder.cx(0, 1).measure_all().build();
            assert_eq!(only_counts(&t.transpile(&circuit).unwrap()), expected);
        }
    }

    #[test]
    fn test_phase_sensitive_circuit() {
        // H CX CX H and a Hadamard-conjugated CX keep their phases
        let t = eagle_line(2);
        let circuit = CircuitBuilder::new(2).h(0).cx(0, 1).cx(0, 1).h(0).measure_all().build();
        assert_eq!(only_counts(&t.transpile(&circuit).unwrap()), "00");

        let circuit = CircuitBuilder::new(2)
            .x(1)
            .h(0)
            .h(1)
            .cx(0, 1)
            .h(0)
            .h(1)
            .measure_all()
            .build();
        assert_eq!(only_counts(&t.transpile(&circuit).unwrap()), "11");
    }

    #[test]
    fn test_routing_inserts_swaps_and_keeps_clbits() {
        // 0 and 3 are three hops apart on a line
        let circuit = CircuitBuilder::with_clbits(4, 2)
            .x(0)
            .cx(0, 3)
            .measure(0, 0)
            .measure(3, 1)
            .build();
        let out = eagle_line(4).transpile(&circuit).unwrap();
        assert!(out.count_2q() > 1);
        assert!(out.validate(&Topology::linear(4)).is_ok());
        assert_eq!(only_counts(&out), "11");
    }

    #[test]
    fn test_toffoli_decomposition() {
        let t = eagle_line(3);
        let circuit = CircuitBuilder::new(3).x(0).x(1).ccx(0, 1, 2).measure_all().build();
        assert_eq!(only_counts(&t.transpile(&circuit).unwrap()), "111");
        let circuit = CircuitBuilder::new(3).x(1).ccx(0, 1, 2).measure_all().build();
        assert_eq!(only_counts(&t.transpile(&circuit).unwrap()), "010");
    }

    #[test]
    fn test_cx_basis_target_and_cancellation() {
        let config = TranspilerConfig {
            basis_gates: vec!["cx".into(), "rz".into(), "sx".into(), "x".into()],
            coupling_map: vec![(0, 1)],
            optimization_level: 1,
            num_qubits: 2,
        };
        let t = Transpiler::new(config).unwrap();
        let circuit = CircuitBuilder::new(2).cx(0, 1).cx(0, 1).h(1).measure(1, 1).build();
        let out = t.transpile(&circuit).unwrap();
        assert_eq!(out.count_2q(), 0);

        let level0 = Transpiler::new(t.config().clone().with_optimization_level(0)).unwrap();
        assert_eq!(level0.transpile(&circuit).unwrap().count_2q(), 2);
    }

    #[test]
    fn test_ecr_on_cx_target() {
        let config = TranspilerConfig {
            basis_gates: vec!["cx".into(), "rz".into(), "sx".into(), "x".into()],
            ..Default::default()
        };
        let t = Transpiler::new(config).unwrap();
        let circuit = CircuitBuilder::new(2).ecr(0, 1).measure_all().build();
        let out = t.transpile(&circuit).unwrap();
        assert!(out.gates().iter().all(|g| g.name() != "ecr"));
        assert_eq!(out.count_2q(), 2);
    }

    #[test]
    fn test_width_and_basis_errors() {
        let circuit = CircuitBuilder::new(10).h(0).build();
        assert!(matches!(
            eagle_line(5).transpile(&circuit),
            Err(QstashError::CircuitTooWide { required: 10, available: 5 })
        ));

        let config = TranspilerConfig {
            basis_gates: vec!["u".into(), "cx".into()],
            ..Default::default()
        };
        assert!(Transpiler::new(config).is_err());

        let config = TranspilerConfig {
            basis_gates: vec!["rz".into(), "sx".into()],
            num_qubits: 2,
            ..Default::default()
        };
        let t = Transpiler::new(config).unwrap();
        assert!(t.transpile(&CircuitBuilder::new(2).cx(0, 1).build()).is_err());
    }

    #[test]
    fn test_disconnected_target_fails_routing() {
        let config = TranspilerConfig {
            coupling_map: vec![(0, 1), (2, 3)],
            num_qubits: 4,
            ..Default::default()
        };
        let t = Transpiler::new(config).unwrap();
        let circuit = CircuitBuilder::new(4).cx(0, 3).build();
        assert!(matches!(t.transpile(&circuit), Err(QstashError::PathNotFound(0, 3))));
    }

    #[test]
    fn test_fusion_merges_runs() {
        let t = eagle_line(1);
        let circuit = CircuitBuilder::new(1).h(0).h(0).t(0).tdg(0).measure(0, 0).build();
        let out = t.transpile(&circuit).unwrap();
        assert_eq!(out.gates(), &[Gate::Measure(0, 0)]);
    }
}
