//! Qubit topology for qstash
//!
//! Gantree: L1_Circuit → Topology
//!
//! Coupling graph of a device. Routing treats couplings as undirected;
//! the directed list is kept as reported by the backend.

use crate::circuit::Circuit;
use crate::error::{QstashError, QstashResult};
use crate::types::QubitId;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

/// Qubit topology (coupling map)
/// Gantree: Topology // coupling graph
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    /// Coupling map as reported: list of (control, target) pairs
    coupling_map: Vec<(QubitId, QubitId)>,

    /// Number of qubits
    num_qubits: usize,

    /// Undirected adjacency, sorted per qubit
    adjacency: Vec<Vec<QubitId>>,

    /// Optional topology name
    name: Option<String>,
}

impl Topology {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create from a coupling map over `num_qubits` qubits
    /// Gantree: from_coupling_map(map, n) -> Result<Self> // build graph
    pub fn from_coupling_map(
        coupling_map: Vec<(QubitId, QubitId)>,
        num_qubits: usize,
    ) -> QstashResult<Self> {
        if coupling_map.is_empty() && num_qubits > 1 {
            return Err(QstashError::EmptyCouplingMap);
        }

        let mut adjacency: Vec<BTreeSet<QubitId>> = vec![BTreeSet::new(); num_qubits];
        for &(q1, q2) in &coupling_map {
            if q1 == q2 {
                return Err(QstashError::InvalidCoupling(q1, q2));
            }
            let max = num_qubits.saturating_sub(1);
            for q in [q1, q2] {
                if q >= num_qubits {
                    return Err(QstashError::QubitOutOfRange { qubit: q, max });
                }
            }
            adjacency[q1].insert(q2);
            adjacency[q2].insert(q1);
        }

        Ok(Self {
            coupling_map,
            num_qubits,
            adjacency: adjacency
                .into_iter()
                .map(|s| s.into_iter().collect())
                .collect(),
            name: None,
        })
    }

    /// Create linear chain topology: 0-1-2-...-N-1
    pub fn linear(n: usize) -> Self {
        let coupling_map: Vec<(QubitId, QubitId)> =
            (0..n.saturating_sub(1)).map(|i| (i, i + 1)).collect();
        let adjacency = (0..n)
            .map(|q| {
                let mut adj = Vec::with_capacity(2);
                if q > 0 {
                    adj.push(q - 1);
                }
                if q + 1 < n {
                    adj.push(q + 1);
                }
                adj
            })
            .collect();

        Self {
            coupling_map,
            num_qubits: n,
            adjacency,
            name: Some(format!("linear_{}", n)),
        }
    }

    /// Set topology name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Get number of qubits
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Get the coupling map as reported
    pub fn coupling_map(&self) -> &[(QubitId, QubitId)] {
        &self.coupling_map
    }

    /// Get topology name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of undirected edges
    pub fn num_edges(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    // ========================================================================
    // Connectivity
    // ========================================================================

    /// Check if two qubits are directly connected (either direction)
    /// Gantree: is_connected(q1, q2) -> bool // adjacency
    pub fn is_connected(&self, q1: QubitId, q2: QubitId) -> bool {
        if q1 == q2 {
            return true;
        }
        self.adjacency
            .get(q1)
            .map(|adj| adj.binary_search(&q2).is_ok())
            .unwrap_or(false)
    }

    /// Get neighbors of a qubit (sorted)
    pub fn neighbors(&self, qubit: QubitId) -> &[QubitId] {
        self.adjacency.get(qubit).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Find shortest path between two qubits (BFS, inclusive of both ends)
    /// Gantree: shortest_path(q1, q2) -> Option<Vec> // BFS
    pub fn shortest_path(&self, start: QubitId, end: QubitId) -> Option<Vec<QubitId>> {
        if start >= self.num_qubits || end >= self.num_qubits {
            return None;
        }
        if start == end {
            return Some(vec![start]);
        }

        let mut parent: Vec<Option<QubitId>> = vec![None; self.num_qubits];
        let mut visited = vec![false; self.num_qubits];
        let mut queue = VecDeque::new();
        visited[start] = true;
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            if current == end {
                let mut path = vec![end];
                let mut node = end;
                while let Some(p) = parent[node] {
                    path.push(p);
                    node = p;
                }
                path.reverse();
                return Some(path);
            }
            for &next in &self.adjacency[current] {
                if !visited[next] {
                    visited[next] = true;
                    parent[next] = Some(current);
                    queue.push_back(next);
                }
            }
        }

        None
    }

    /// Calculate distance between two qubits
    pub fn distance(&self, q1: QubitId, q2: QubitId) -> Option<usize> {
        self.shortest_path(q1, q2).map(|p| p.len() - 1)
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Validate a circuit against this topology
    /// Gantree: validate_circuit(&self, Circuit) -> Result // check
    pub fn validate_circuit(&self, circuit: &Circuit) -> QstashResult<()> {
        if circuit.num_qubits() > self.num_qubits {
            return Err(QstashError::CircuitTooWide {
                required: circuit.num_qubits(),
                available: self.num_qubits,
            });
        }

        for (q1, q2) in circuit.two_qubit_pairs() {
            if !self.is_connected(q1, q2) {
                return Err(QstashError::TopologyViolation { q1, q2 });
            }
        }

        Ok(())
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Topology({}, {} qubits, {} edges)",
            self.name.as_deref().unwrap_or("custom"),
            self.num_qubits,
            self.num_edges()
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Gate;

    #[test]
    fn test_linear_topology() {
        let topo = Topology::linear(5);
        assert_eq!(topo.num_qubits(), 5);
        assert_eq!(topo.num_edges(), 4);
        assert!(topo.is_connected(0, 1));
        assert!(topo.is_connected(1, 0));
        assert!(!topo.is_connected(0, 2));
        assert_eq!(topo.neighbors(2), &[1, 3]);
    }

    #[test]
    fn test_from_coupling_map_directed_pairs() {
        // Both directions listed, as IBM reports them
        let topo =
            Topology::from_coupling_map(vec![(0, 1), (1, 0), (1, 2), (3, 2)], 4).unwrap();
        assert_eq!(topo.num_edges(), 3);
        assert!(topo.is_connected(2, 3));
        assert_eq!(topo.coupling_map().len(), 4);
    }

    #[test]
    fn test_from_coupling_map_errors() {
        assert!(matches!(
            Topology::from_coupling_map(vec![], 3),
            Err(QstashError::EmptyCouplingMap)
        ));
        assert!(matches!(
            Topology::from_coupling_map(vec![(1, 1)], 3),
            Err(QstashError::InvalidCoupling(1, 1))
        ));
        assert!(Topology::from_coupling_map(vec![(0, 5)], 3).is_err());
        assert!(Topology::from_coupling_map(vec![], 1).is_ok());
    }

    #[test]
    fn test_shortest_path() {
        let topo = Topology::linear(5);
        assert_eq!(topo.shortest_path(0, 4), Some(vec![0, 1, 2, 3, 4]));
        assert_eq!(topo.shortest_path(3, 1), Some(vec![3, 2, 1]));
        assert_eq!(topo.distance(2, 2), Some(0));
        assert_eq!(topo.shortest_path(0, 9), None);
    }

    #[test]
    fn test_disconnected_path() {
        let topo = Topology::from_coupling_map(vec![(0, 1), (2, 3)], 4).unwrap();
        assert_eq!(topo.shortest_path(0, 3), None);
    }

    #[test]
    fn test_validate_circuit() {
        let topo = Topology::linear(3);
        let ok = Circuit::from_gates(3, vec![Gate::Cnot(0, 1), Gate::Ecr(2, 1)]).unwrap();
        assert!(topo.validate_circuit(&ok).is_ok());

        let bad = Circuit::from_gates(3, vec![Gate::Cnot(0, 2)]).unwrap();
        assert!(matches!(
            topo.validate_circuit(&bad),
            Err(QstashError::TopologyViolation { q1: 0, q2: 2 })
        ));

        let wide = Circuit::new(4);
        assert!(topo.validate_circuit(&wide).is_err());
    }
}
