//! Quantum circuit structure for qstash
//!
//! Gantree: L1_Circuit → Circuit
//!
//! The caller-facing circuit type. Circuits are passed through the
//! transpiler and sampler, never built on the caller's behalf.

use crate::error::{QstashError, QstashResult};
use crate::gate::Gate;
use crate::topology::Topology;
use crate::types::{ClbitId, QubitId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;
use std::fmt;

/// Quantum circuit
/// Gantree: Circuit // circuit struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    /// Number of qubits
    num_qubits: usize,

    /// Number of classical bits
    num_clbits: usize,

    /// Gate sequence
    gates: Vec<Gate>,

    /// Optional circuit name
    name: Option<String>,
}

impl Circuit {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create an empty circuit with one classical bit per qubit
    /// Gantree: new(n) -> Self // constructor
    pub fn new(num_qubits: usize) -> Self {
        Self::with_clbits(num_qubits, num_qubits)
    }

    /// Create an empty circuit with an explicit classical register width
    pub fn with_clbits(num_qubits: usize, num_clbits: usize) -> Self {
        Self {
            num_qubits,
            num_clbits,
            gates: Vec::new(),
            name: None,
        }
    }

    /// Create a circuit with a name
    pub fn with_name(num_qubits: usize, name: impl Into<String>) -> Self {
        let mut circuit = Self::new(num_qubits);
        circuit.name = Some(name.into());
        circuit
    }

    /// Create from a vector of gates
    pub fn from_gates(num_qubits: usize, gates: Vec<Gate>) -> QstashResult<Self> {
        let mut circuit = Self::new(num_qubits);
        circuit.add_gates(gates)?;
        Ok(circuit)
    }

    /// Empty circuit sharing this circuit's registers and name
    pub fn empty_like(&self) -> Self {
        Self {
            num_qubits: self.num_qubits,
            num_clbits: self.num_clbits,
            gates: Vec::new(),
            name: self.name.clone(),
        }
    }

    // ========================================================================
    // Basic Operations
    // ========================================================================

    /// Add a gate to the circuit
    /// Gantree: add_gate(&mut, Gate) -> Result // validated push
    pub fn add_gate(&mut self, gate: Gate) -> QstashResult<()> {
        self.check_gate(&gate)?;
        self.gates.push(gate);
        Ok(())
    }

    /// Add multiple gates
    pub fn add_gates(&mut self, gates: impl IntoIterator<Item = Gate>) -> QstashResult<()> {
        for gate in gates {
            self.add_gate(gate)?;
        }
        Ok(())
    }

    /// Get number of qubits
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Get number of classical bits
    pub fn num_clbits(&self) -> usize {
        self.num_clbits
    }

    /// Get gates
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Get circuit name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set circuit name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Check if circuit is empty
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    // ========================================================================
    // Circuit Analysis
    // ========================================================================

    /// Calculate circuit depth (longest path, barriers excluded)
    /// Gantree: depth(&self) -> usize // depth
    pub fn depth(&self) -> usize {
        let mut qubit_depths = vec![0usize; self.num_qubits];

        for gate in &self.gates {
            if gate.is_barrier() {
                continue;
            }
            let qubits = match gate {
                Gate::MeasureAll => (0..self.num_qubits).collect(),
                _ => gate.qubits(),
            };
            let max_depth = qubits
                .iter()
                .filter_map(|&q| qubit_depths.get(q))
                .max()
                .copied()
                .unwrap_or(0);
            for &q in &qubits {
                qubit_depths[q] = max_depth + 1;
            }
        }

        qubit_depths.into_iter().max().unwrap_or(0)
    }

    /// Get total gate count
    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    /// Count single-qubit gates
    pub fn count_1q(&self) -> usize {
        self.gates.iter().filter(|g| g.is_single_qubit()).count()
    }

    /// Count two-qubit gates
    pub fn count_2q(&self) -> usize {
        self.gates.iter().filter(|g| g.is_two_qubit()).count()
    }

    /// Count three-qubit gates
    pub fn count_3q(&self) -> usize {
        self.gates.iter().filter(|g| g.is_three_qubit()).count()
    }

    /// Count measurement operations
    pub fn count_measurements(&self) -> usize {
        self.gates.iter().filter(|g| g.is_measurement()).count()
    }

    /// Operation counts by name
    pub fn count_ops(&self) -> BTreeMap<&'static str, usize> {
        let mut ops = BTreeMap::new();
        for gate in &self.gates {
            *ops.entry(gate.name()).or_insert(0) += 1;
        }
        ops
    }

    /// Check whether the circuit measures anything
    pub fn has_measurements(&self) -> bool {
        self.gates.iter().any(Gate::is_measurement)
    }

    /// Qubits touched by any non-barrier instruction
    pub fn used_qubits(&self) -> BTreeSet<QubitId> {
        let mut used = BTreeSet::new();
        for gate in &self.gates {
            match gate {
                Gate::Barrier(_) => {}
                Gate::MeasureAll => used.extend(0..self.num_qubits),
                _ => used.extend(gate.qubits()),
            }
        }
        used
    }

    /// Get two-qubit gate pairs (for topology validation)
    pub fn two_qubit_pairs(&self) -> Vec<(QubitId, QubitId)> {
        self.gates
            .iter()
            .filter(|g| g.is_two_qubit())
            .filter_map(|g| {
                let qs = g.qubits();
                match qs.as_slice() {
                    [a, b] => Some((*a, *b)),
                    _ => None,
                }
            })
            .collect()
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn check_gate(&self, gate: &Gate) -> QstashResult<()> {
        let qubits = gate.qubits();
        for &qubit in &qubits {
            if qubit >= self.num_qubits {
                return Err(QstashError::GateQubitMismatch {
                    qubit,
                    num_qubits: self.num_qubits,
                });
            }
        }
        if !gate.is_barrier() {
            let distinct: BTreeSet<_> = qubits.iter().collect();
            if distinct.len() != qubits.len() {
                return Err(QstashError::DuplicateQubit(gate.to_qasm()));
            }
        }
        match gate {
            Gate::Measure(_, clbit) => self.check_clbit(*clbit),
            Gate::MeasureAll if self.num_qubits > 0 => self.check_clbit(self.num_qubits - 1),
            _ => Ok(()),
        }
    }

    fn check_clbit(&self, clbit: ClbitId) -> QstashResult<()> {
        if clbit >= self.num_clbits {
            return Err(QstashError::ClbitMismatch {
                clbit,
                num_clbits: self.num_clbits,
            });
        }
        Ok(())
    }

    /// Validate circuit against a topology
    pub fn validate(&self, topology: &Topology) -> QstashResult<()> {
        topology.validate_circuit(self)
    }

    // ========================================================================
    // QASM Conversion
    // ========================================================================

    /// Convert to OpenQASM 2.0 string
    /// Gantree: to_qasm(&self) -> String // QASM2 export
    pub fn to_qasm(&self) -> String {
        let mut lines = vec![
            "OPENQASM 2.0;".to_string(),
            "include \"qelib1.inc\";".to_string(),
            String::new(),
            format!("qreg q[{}];", self.num_qubits),
            format!("creg c[{}];", self.num_clbits),
            String::new(),
        ];
        lines.extend(self.gates.iter().map(Gate::to_qasm));
        lines.join("\n")
    }

    /// Parse from OpenQASM 2.0 string (single `q`/`c` registers)
    /// Gantree: from_qasm(s) -> Result<Self> // QASM2 import
    pub fn from_qasm(qasm: &str) -> QstashResult<Self> {
        let mut num_qubits = None;
        let mut num_clbits = None;
        let mut statements = Vec::new();

        for raw in qasm.lines() {
            let line = raw.split("//").next().unwrap_or("").trim();
            if line.is_empty() || line.starts_with("OPENQASM") || line.starts_with("include") {
                continue;
            }
            for stmt in line.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                if let Some(rest) = stmt.strip_prefix("qreg") {
                    num_qubits = Some(parse_register_size(rest)?);
                } else if let Some(rest) = stmt.strip_prefix("creg") {
                    num_clbits = Some(parse_register_size(rest)?);
                } else {
                    statements.push(stmt.to_string());
                }
            }
        }

        let num_qubits =
            num_qubits.ok_or_else(|| QstashError::InvalidQasm("No qreg declaration found".into()))?;
        let mut circuit = Circuit::with_clbits(num_qubits, num_clbits.unwrap_or(0));
        for stmt in &statements {
            circuit.add_gate(parse_statement(stmt)?)?;
        }
        Ok(circuit)
    }
}

// ============================================================================
// QASM Parsing Helpers
// ============================================================================

fn parse_register_size(decl: &str) -> QstashResult<usize> {
    // " q[N]" -> N
    let start = decl.find('[');
    let end = decl.find(']');
    match (start, end) {
        (Some(s), Some(e)) if s < e => decl[s + 1..e]
            .trim()
            .parse()
            .map_err(|_| QstashError::InvalidQasm(format!("Bad register size: {}", decl))),
        _ => Err(QstashError::InvalidQasm(format!("Bad register: {}", decl))),
    }
}

fn parse_statement(stmt: &str) -> QstashResult<Gate> {
    if let Some(rest) = stmt.strip_prefix("measure") {
        return parse_measure(rest.trim());
    }

    let (name, params, operands) = match stmt.find('(') {
        Some(open) => {
            let close = stmt
                .find(')')
                .ok_or_else(|| QstashError::InvalidQasm(format!("Missing closing paren: {}", stmt)))?;
            let params = stmt[open + 1..close]
                .split(',')
                .map(parse_angle)
                .collect::<QstashResult<Vec<f64>>>()?;
            (stmt[..open].trim(), params, stmt[close + 1..].trim())
        }
        None => {
            let mut parts = stmt.splitn(2, char::is_whitespace);
            let name = parts.next().unwrap_or("");
            (name, Vec::new(), parts.next().unwrap_or("").trim())
        }
    };

    let qubits = parse_operands(operands)?;
    let arity = |n: usize| -> QstashResult<()> {
        if qubits.len() != n || params_expected(name) != params.len() {
            return Err(QstashError::InvalidQasm(format!("Wrong operands: {}", stmt)));
        }
        Ok(())
    };

    let gate = match name.to_lowercase().as_str() {
        "barrier" => {
            if operands == "q" {
                Gate::Barrier(Vec::new())
            } else {
                Gate::Barrier(qubits.clone())
            }
        }
        "reset" => {
            arity(1)?;
            Gate::Reset(qubits[0])
        }
        one_q @ ("h" | "x" | "y" | "z" | "s" | "sdg" | "t" | "tdg" | "sx" | "sxdg" | "id"
        | "rx" | "ry" | "rz" | "p" | "u1" | "u" | "u3") => {
            arity(1)?;
            let q = qubits[0];
            match one_q {
                "h" => Gate::H(q),
                "x" => Gate::X(q),
                "y" => Gate::Y(q),
                "z" => Gate::Z(q),
                "s" => Gate::S(q),
                "sdg" => Gate::Sdg(q),
                "t" => Gate::T(q),
                "tdg" => Gate::Tdg(q),
                "sx" => Gate::Sx(q),
                "sxdg" => Gate::Sxdg(q),
                "id" => Gate::Id(q),
                "rx" => Gate::Rx(q, params[0]),
                "ry" => Gate::Ry(q, params[0]),
                "rz" => Gate::Rz(q, params[0]),
                "p" | "u1" => Gate::P(q, params[0]),
                _ => Gate::U(q, params[0], params[1], params[2]),
            }
        }
        two_q @ ("cx" | "cnot" | "cz" | "cy" | "swap" | "ecr" | "crz") => {
            arity(2)?;
            let (a, b) = (qubits[0], qubits[1]);
            match two_q {
                "cx" | "cnot" => Gate::Cnot(a, b),
                "cz" => Gate::Cz(a, b),
                "cy" => Gate::Cy(a, b),
                "swap" => Gate::Swap(a, b),
                "ecr" => Gate::Ecr(a, b),
                _ => Gate::Crz(a, b, params[0]),
            }
        }
        "ccx" | "toffoli" => {
            arity(3)?;
            Gate::Ccx(qubits[0], qubits[1], qubits[2])
        }
        "cswap" | "fredkin" => {
            arity(3)?;
            Gate::Cswap(qubits[0], qubits[1], qubits[2])
        }
        other => return Err(QstashError::InvalidQasm(format!("Unknown gate '{}'", other))),
    };

    Ok(gate)
}

fn params_expected(name: &str) -> usize {
    match name {
        "rx" | "ry" | "rz" | "p" | "u1" | "crz" => 1,
        "u" | "u3" => 3,
        _ => 0,
    }
}

fn parse_measure(operands: &str) -> QstashResult<Gate> {
    let (lhs, rhs) = operands
        .split_once("->")
        .ok_or_else(|| QstashError::InvalidQasm(format!("Bad measure: {}", operands)))?;
    let (lhs, rhs) = (lhs.trim(), rhs.trim());
    if lhs == "q" && rhs == "c" {
        return Ok(Gate::MeasureAll);
    }
    Ok(Gate::Measure(parse_index(lhs)?, parse_index(rhs)?))
}

fn parse_operands(s: &str) -> QstashResult<Vec<QubitId>> {
    if s.is_empty() || s == "q" {
        return Ok(Vec::new());
    }
    s.split(',').map(|part| parse_index(part.trim())).collect()
}

fn parse_index(operand: &str) -> QstashResult<usize> {
    // "q[N]" -> N
    let start = operand.find('[');
    let end = operand.find(']');
    match (start, end) {
        (Some(s), Some(e)) if s < e => operand[s + 1..e]
            .trim()
            .parse()
            .map_err(|_| QstashError::InvalidQasm(format!("Bad operand: {}", operand))),
        _ => Err(QstashError::InvalidQasm(format!("Bad operand: {}", operand))),
    }
}

/// Parse an angle expression such as `0.25`, `pi`, `-pi/2` or `3*pi/4`
fn parse_angle(expr: &str) -> QstashResult<f64> {
    let expr = expr.trim();
    let (sign, body) = match expr.strip_prefix('-') {
        Some(rest) => (-1.0, rest.trim()),
        None => (1.0, expr),
    };

    let bad = || QstashError::InvalidQasm(format!("Bad angle: {}", expr));
    let factor = |tok: &str| -> QstashResult<f64> {
        let tok = tok.trim();
        if tok == "pi" {
            Ok(PI)
        } else {
            tok.parse::<f64>().map_err(|_| bad())
        }
    };

    let mut value = 1.0;
    for (i, part) in body.split('/').enumerate() {
        let product = part
            .split('*')
            .map(factor)
            .collect::<QstashResult<Vec<f64>>>()?
            .into_iter()
            .product::<f64>();
        if i == 0 {
            value = product;
        } else {
            if product == 0.0 {
                return Err(bad());
            }
            value /= product;
        }
    }

    if !value.is_finite() {
        return Err(QstashError::InvalidAngle(value));
    }
    Ok(sign * value)
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Circuit({} qubits, {} clbits, {} gates)",
            self.num_qubits,
            self.num_clbits,
            self.gates.len()
        )?;
        writeln!(f, "  Depth: {}", self.depth())?;
        writeln!(f, "  1Q gates: {}", self.count_1q())?;
        writeln!(f, "  2Q gates: {}", self.count_2q())?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
