//! Tanner-graph topology of an LDPC code
//!
//! Edges are stored once, in *variable order*: the edges of variable node 0
//! occupy slots `0..d_0`, those of variable node 1 the next `d_1` slots, and so
//! on. The `transpose` permutation lists, in *check order*, the variable-order
//! slot of every edge, so a check node addresses its incident edges through
//! `transpose` while a variable node walks a contiguous range.

use core::ops::Range;

use crate::constants::BIT_ZERO;
use crate::error::DecoderError;

/// Immutable Tanner graph built once per code definition
///
/// Shared read-only between any number of decoders (wrap it in an
/// [`Arc`](std::sync::Arc)); nothing mutates it after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParityCheckGraph {
    check_degrees: Vec<u32>,
    variable_degrees: Vec<u32>,
    transpose: Vec<u32>,
    /// Start of each check's run inside `transpose` (length M + 1)
    check_offsets: Vec<usize>,
    /// Start of each variable's slot range (length N + 1)
    variable_offsets: Vec<usize>,
    /// Variable node owning each variable-order slot
    edge_variable: Vec<u32>,
    /// Check node owning each variable-order slot
    edge_check: Vec<u32>,
    max_check_degree: usize,
    max_variable_degree: usize,
}

impl ParityCheckGraph {
    /// Build a graph from its degree sequences and edge transpose
    ///
    /// Validates that both degree sequences account for the same number of
    /// edges `E`, that `transpose` has `E` entries, and that it is a
    /// permutation of `[0, E)`.
    pub fn new(
        check_degrees: Vec<u32>,
        variable_degrees: Vec<u32>,
        transpose: Vec<u32>,
    ) -> Result<Self, DecoderError> {
        let check_edges: u64 = check_degrees.iter().map(|&d| d as u64).sum();
        let variable_edges: u64 = variable_degrees.iter().map(|&d| d as u64).sum();

        if check_edges != variable_edges {
            return Err(DecoderError::DegreeSumMismatch {
                check_edges,
                variable_edges,
            });
        }

        if check_edges != transpose.len() as u64 {
            return Err(DecoderError::InvalidTranspose(format!(
                "{} entries for {} edges",
                transpose.len(),
                check_edges
            )));
        }

        let n_edges = transpose.len();
        if n_edges > u32::MAX as usize {
            return Err(DecoderError::InvalidDimensions(format!(
                "{} edges exceed the 32-bit edge index space",
                n_edges
            )));
        }

        // Every slot must appear exactly once
        let mut seen = vec![false; n_edges];
        for (position, &slot) in transpose.iter().enumerate() {
            let slot = slot as usize;
            if slot >= n_edges {
                return Err(DecoderError::InvalidTranspose(format!(
                    "entry {} points to slot {} outside [0, {})",
                    position, slot, n_edges
                )));
            }
            if seen[slot] {
                return Err(DecoderError::InvalidTranspose(format!(
                    "slot {} appears more than once",
                    slot
                )));
            }
            seen[slot] = true;
        }

        let check_offsets = prefix_offsets(&check_degrees);
        let variable_offsets = prefix_offsets(&variable_degrees);

        let mut edge_variable = vec![0u32; n_edges];
        for (v, range) in variable_offsets.windows(2).enumerate() {
            edge_variable[range[0]..range[1]].fill(v as u32);
        }

        let mut edge_check = vec![0u32; n_edges];
        for (c, range) in check_offsets.windows(2).enumerate() {
            for &slot in &transpose[range[0]..range[1]] {
                edge_check[slot as usize] = c as u32;
            }
        }

        let max_check_degree = check_degrees.iter().copied().max().unwrap_or(0) as usize;
        let max_variable_degree = variable_degrees.iter().copied().max().unwrap_or(0) as usize;

        Ok(Self {
            check_degrees,
            variable_degrees,
            transpose,
            check_offsets,
            variable_offsets,
            edge_variable,
            edge_check,
            max_check_degree,
            max_variable_degree,
        })
    }

    /// Build a graph from the rows of a sparse parity-check matrix
    ///
    /// `rows[c]` lists the variable nodes taking part in check `c`. Check
    /// order follows the row order and the listed order within each row; the
    /// variable-order slots of a variable are assigned by ascending check
    /// index.
    pub fn from_check_rows(n_variables: usize, rows: &[Vec<usize>]) -> Result<Self, DecoderError> {
        let mut variable_degrees = vec![0u32; n_variables];
        // Row index + 1 of the last row that touched each variable
        let mut last_row = vec![0usize; n_variables];

        for (c, row) in rows.iter().enumerate() {
            for &v in row {
                if v >= n_variables {
                    return Err(DecoderError::InvalidDimensions(format!(
                        "check {} references variable {} but the code has {} variables",
                        c, v, n_variables
                    )));
                }
                if last_row[v] == c + 1 {
                    return Err(DecoderError::InvalidDimensions(format!(
                        "check {} references variable {} twice",
                        c, v
                    )));
                }
                last_row[v] = c + 1;
                variable_degrees[v] += 1;
            }
        }

        let variable_offsets = prefix_offsets(&variable_degrees);
        let mut fill = vec![0usize; n_variables];
        let mut transpose = Vec::with_capacity(variable_offsets[n_variables]);
        let mut check_degrees = Vec::with_capacity(rows.len());

        for row in rows {
            check_degrees.push(row.len() as u32);
            for &v in row {
                transpose.push((variable_offsets[v] + fill[v]) as u32);
                fill[v] += 1;
            }
        }

        Self::new(check_degrees, variable_degrees, transpose)
    }

    /// Number of variable nodes (`N`)
    pub fn n_variables(&self) -> usize {
        self.variable_degrees.len()
    }

    /// Number of check nodes (`M`)
    pub fn n_checks(&self) -> usize {
        self.check_degrees.len()
    }

    /// Number of edges (`E`)
    pub fn n_edges(&self) -> usize {
        self.transpose.len()
    }

    /// Degree of check node `c`
    pub fn check_degree(&self, c: usize) -> usize {
        self.check_degrees[c] as usize
    }

    /// Degree of variable node `v`
    pub fn variable_degree(&self, v: usize) -> usize {
        self.variable_degrees[v] as usize
    }

    /// Check-node degree sequence
    pub fn check_degrees(&self) -> &[u32] {
        &self.check_degrees
    }

    /// Variable-node degree sequence
    pub fn variable_degrees(&self) -> &[u32] {
        &self.variable_degrees
    }

    /// Largest check-node degree
    pub fn max_check_degree(&self) -> usize {
        self.max_check_degree
    }

    /// Largest variable-node degree
    pub fn max_variable_degree(&self) -> usize {
        self.max_variable_degree
    }

    /// Check-order to variable-order edge permutation
    pub fn transpose(&self) -> &[u32] {
        &self.transpose
    }

    /// Variable-order slots of the edges of check `c`, in check order
    #[inline]
    pub fn check_edges(&self, c: usize) -> &[u32] {
        &self.transpose[self.check_offsets[c]..self.check_offsets[c + 1]]
    }

    /// Variable-order slot range of the edges of variable `v`
    #[inline]
    pub fn variable_edges(&self, v: usize) -> Range<usize> {
        self.variable_offsets[v]..self.variable_offsets[v + 1]
    }

    /// Variable node owning a variable-order slot
    #[inline]
    pub fn variable_of_edge(&self, slot: usize) -> usize {
        self.edge_variable[slot] as usize
    }

    /// Check node owning a variable-order slot
    #[inline]
    pub fn check_of_edge(&self, slot: usize) -> usize {
        self.edge_check[slot] as usize
    }

    /// Variable nodes of every check, in check order
    pub fn check_rows(&self) -> Vec<Vec<usize>> {
        (0..self.n_checks())
            .map(|c| {
                self.check_edges(c)
                    .iter()
                    .map(|&slot| self.variable_of_edge(slot as usize))
                    .collect()
            })
            .collect()
    }

    /// Check nodes of every variable, in variable order
    pub fn variable_columns(&self) -> Vec<Vec<usize>> {
        (0..self.n_variables())
            .map(|v| self.variable_edges(v).map(|slot| self.check_of_edge(slot)).collect())
            .collect()
    }

    /// Number of parity checks a hard-decision word violates
    pub fn unsatisfied_checks(&self, bits: &[u8]) -> Result<usize, DecoderError> {
        if bits.len() != self.n_variables() {
            return Err(DecoderError::LengthMismatch {
                expected: self.n_variables(),
                actual: bits.len(),
            });
        }

        let mut errors = 0;
        for c in 0..self.n_checks() {
            let parity = self
                .check_edges(c)
                .iter()
                .fold(BIT_ZERO, |acc, &slot| acc ^ (bits[self.variable_of_edge(slot as usize)] & 1));
            if parity != BIT_ZERO {
                errors += 1;
            }
        }
        Ok(errors)
    }

    /// True when the word satisfies every parity check
    pub fn is_codeword(&self, bits: &[u8]) -> bool {
        matches!(self.unsatisfied_checks(bits), Ok(0))
    }
}

fn prefix_offsets(degrees: &[u32]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(degrees.len() + 1);
    let mut acc = 0usize;
    offsets.push(0);
    for &d in degrees {
        acc += d as usize;
        offsets.push(acc);
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    // Example 2.5 of Johnson, "Iterative Error Correction"
    fn johnson_rows() -> Vec<Vec<usize>> {
        vec![vec![0, 1, 3], vec![1, 2, 4], vec![0, 4, 5], vec![2, 3, 5]]
    }

    #[test]
    fn test_from_check_rows() {
        let graph = ParityCheckGraph::from_check_rows(6, &johnson_rows()).unwrap();

        assert_eq!(graph.n_variables(), 6);
        assert_eq!(graph.n_checks(), 4);
        assert_eq!(graph.n_edges(), 12);
        assert_eq!(graph.max_check_degree(), 3);
        assert_eq!(graph.variable_degrees(), &[2, 2, 2, 2, 2, 2]);
        assert_eq!(graph.check_rows(), johnson_rows());
    }

    #[test]
    fn test_transpose_is_bijection() {
        let graph = ParityCheckGraph::from_check_rows(6, &johnson_rows()).unwrap();
        let mut slots: Vec<u32> = graph.transpose().to_vec();
        slots.sort_unstable();
        let expected: Vec<u32> = (0..graph.n_edges() as u32).collect();
        assert_eq!(slots, expected);
    }

    #[test]
    fn test_edge_endpoints_agree() {
        let graph = ParityCheckGraph::from_check_rows(6, &johnson_rows()).unwrap();
        for c in 0..graph.n_checks() {
            for &slot in graph.check_edges(c) {
                assert_eq!(graph.check_of_edge(slot as usize), c);
            }
        }
        for v in 0..graph.n_variables() {
            for slot in graph.variable_edges(v) {
                assert_eq!(graph.variable_of_edge(slot), v);
            }
        }
        assert_eq!(graph.variable_columns()[0], vec![0, 2]);
        assert_eq!(graph.variable_columns()[5], vec![2, 3]);
    }

    #[test]
    fn test_degree_sum_mismatch() {
        let result = ParityCheckGraph::new(vec![2, 2], vec![1, 1, 1], vec![0, 1, 2, 3]);
        assert_eq!(
            result,
            Err(DecoderError::DegreeSumMismatch {
                check_edges: 4,
                variable_edges: 3
            })
        );
    }

    #[test]
    fn test_transpose_rejects_duplicates_and_range() {
        let duplicate = ParityCheckGraph::new(vec![2], vec![1, 1], vec![0, 0]);
        assert!(matches!(duplicate, Err(DecoderError::InvalidTranspose(_))));

        let out_of_range = ParityCheckGraph::new(vec![2], vec![1, 1], vec![0, 2]);
        assert!(matches!(out_of_range, Err(DecoderError::InvalidTranspose(_))));

        let short = ParityCheckGraph::new(vec![2], vec![1, 1], vec![0]);
        assert!(matches!(short, Err(DecoderError::InvalidTranspose(_))));
    }

    #[test]
    fn test_from_check_rows_rejects_bad_rows() {
        assert!(ParityCheckGraph::from_check_rows(3, &[vec![0, 3]]).is_err());
        assert!(ParityCheckGraph::from_check_rows(3, &[vec![1, 1]]).is_err());
    }

    #[test]
    fn test_unsatisfied_checks() {
        let graph = ParityCheckGraph::from_check_rows(6, &johnson_rows()).unwrap();

        assert_eq!(graph.unsatisfied_checks(&[0, 0, 1, 0, 1, 1]).unwrap(), 0);
        assert!(graph.is_codeword(&[0; 6]));
        // Bit 1 sits in checks 0 and 1
        assert_eq!(graph.unsatisfied_checks(&[0, 1, 1, 0, 1, 1]).unwrap(), 2);
        assert!(graph.unsatisfied_checks(&[0; 5]).is_err());
        assert!(!graph.is_codeword(&[0; 5]));
    }
}
