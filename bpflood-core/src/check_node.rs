//! Check-node update rules
//!
//! The flooding decoder owns the iteration schedule; the rule that turns
//! variable-to-check messages into check-to-variable messages is injected as
//! a [`CheckNodeUpdate`] strategy. [`SumProduct`] is the log-domain
//! sum-product rule. Other rules (min-sum and its offset/normalized variants)
//! plug in by implementing the same trait.

use core::fmt;

use crate::constants::MAX_CHECK_MESSAGE;
use crate::graph::ParityCheckGraph;
use crate::llr::Llr;

/// Strategy computing check-to-variable messages and per-check parity
pub trait CheckNodeUpdate<R: Llr>: fmt::Debug + Send {
    /// Size internal scratch storage for `graph` and `lanes` frames
    ///
    /// Called once when a decoder is built. Implementations must still cope
    /// with a later `process` call on a larger graph by growing the scratch,
    /// never by truncating.
    fn prepare(&mut self, graph: &ParityCheckGraph, lanes: usize);

    /// Refresh every `C_to_V` message from `V_to_C`
    ///
    /// Both slices are lane-major over variable-order slots (see
    /// [`MessageBuffers`](crate::messages::MessageBuffers)). On return,
    /// `satisfied[f]` is true exactly when every check's accumulated sign is
    /// zero for lane `f`. Returns true when every lane is satisfied.
    fn process(
        &mut self,
        graph: &ParityCheckGraph,
        v_to_c: &[R],
        c_to_v: &mut [R],
        lanes: usize,
        satisfied: &mut [bool],
    ) -> bool;
}

/// Magnitude transform `log(tanh(x / 2))` of the log-domain update
///
/// Maps `(0, inf]` onto `(-inf, 0]`; zero maps to negative infinity.
#[inline]
pub fn phi(magnitude: f64) -> f64 {
    (magnitude * 0.5).tanh().ln()
}

/// Inverse transform `2 * atanh(exp(y))` of [`phi`]
#[inline]
pub fn phi_inverse(y: f64) -> f64 {
    2.0 * y.exp().atanh()
}

/// Log-domain sum-product check-node update
///
/// Per check of degree `d` and per lane, the incoming magnitudes are mapped
/// through [`phi`] and summed while the signs are XOR-reduced. Edge `j` then
/// receives `phi_inverse(sum - phi(v_j))` carrying the sign `total XOR s_j`.
///
/// A zero-magnitude input maps to `phi = -inf` and is counted apart from the
/// finite sum: it silences every other edge of the check and only its own
/// edge receives the product of the remaining inputs. Output magnitudes are
/// clamped to [`MAX_CHECK_MESSAGE`].
#[derive(Debug, Clone, Default)]
pub struct SumProduct {
    /// `phi` of every incoming value of the current check, `max_degree * lanes`
    terms: Vec<f64>,
    sums: Vec<f64>,
    signs: Vec<bool>,
    erased: Vec<u32>,
}

impl SumProduct {
    /// Create an unsized strategy; scratch is sized by [`CheckNodeUpdate::prepare`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity of the term scratch, in values
    pub fn scratch_len(&self) -> usize {
        self.terms.len()
    }

    fn reserve(&mut self, max_degree: usize, lanes: usize) {
        let needed = max_degree * lanes;
        if self.terms.len() < needed {
            self.terms.resize(needed, 0.0);
        }
        if self.sums.len() < lanes {
            self.sums.resize(lanes, 0.0);
            self.signs.resize(lanes, false);
            self.erased.resize(lanes, 0);
        }
    }
}

impl<R: Llr> CheckNodeUpdate<R> for SumProduct {
    fn prepare(&mut self, graph: &ParityCheckGraph, lanes: usize) {
        self.reserve(graph.max_check_degree(), lanes);
    }

    fn process(
        &mut self,
        graph: &ParityCheckGraph,
        v_to_c: &[R],
        c_to_v: &mut [R],
        lanes: usize,
        satisfied: &mut [bool],
    ) -> bool {
        self.reserve(graph.max_check_degree(), lanes);

        let Self {
            terms,
            sums,
            signs,
            erased,
        } = self;
        let sums = &mut sums[..lanes];
        let signs = &mut signs[..lanes];
        let erased = &mut erased[..lanes];
        let satisfied = &mut satisfied[..lanes];

        satisfied.fill(true);

        for c in 0..graph.n_checks() {
            let edges = graph.check_edges(c);

            sums.fill(0.0);
            signs.fill(false);
            erased.fill(0);

            // Accumulate the incoming information
            for (j, &slot) in edges.iter().enumerate() {
                let base = slot as usize * lanes;
                let incoming = &v_to_c[base..base + lanes];
                let row = &mut terms[j * lanes..(j + 1) * lanes];

                for f in 0..lanes {
                    let value = incoming[f];
                    let term = phi(value.to_f64().abs());
                    row[f] = term;
                    signs[f] ^= value.is_negative();
                    if term == f64::NEG_INFINITY {
                        erased[f] += 1;
                    } else {
                        sums[f] += term;
                    }
                }
            }

            // Regenerate the outgoing values
            for (j, &slot) in edges.iter().enumerate() {
                let base = slot as usize * lanes;
                let row = &terms[j * lanes..(j + 1) * lanes];

                for f in 0..lanes {
                    let own = row[f];
                    let extrinsic = match erased[f] {
                        0 => sums[f] - own,
                        1 if own == f64::NEG_INFINITY => sums[f],
                        _ => f64::NEG_INFINITY,
                    };
                    // Rounding may push a sum of non-positive terms above zero
                    let magnitude = phi_inverse(extrinsic.min(0.0)).min(MAX_CHECK_MESSAGE);
                    let negative = signs[f] ^ v_to_c[base + f].is_negative();
                    c_to_v[base + f] = R::from_f64(if negative { -magnitude } else { magnitude });
                }
            }

            for f in 0..lanes {
                satisfied[f] &= !signs[f];
            }
        }

        satisfied.iter().all(|&ok| ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llr::Q16;

    fn single_check(degree: usize) -> ParityCheckGraph {
        ParityCheckGraph::from_check_rows(degree, &[(0..degree).collect()]).unwrap()
    }

    fn run<R: Llr>(graph: &ParityCheckGraph, v_to_c: &[R], lanes: usize) -> (Vec<R>, Vec<bool>, bool) {
        let mut strategy = SumProduct::new();
        CheckNodeUpdate::<R>::prepare(&mut strategy, graph, lanes);
        let mut c_to_v = vec![R::ZERO; v_to_c.len()];
        let mut satisfied = vec![false; lanes];
        let ok = strategy.process(graph, v_to_c, &mut c_to_v, lanes, &mut satisfied);
        (c_to_v, satisfied, ok)
    }

    #[test]
    fn test_phi_is_self_inverse() {
        for &x in &[0.01, 0.25, 1.0, 3.0, 10.0, 20.0] {
            let back = phi_inverse(phi(x));
            assert!((back - x).abs() < 1e-6 * x.max(1.0), "x = {}, got {}", x, back);
        }
        assert_eq!(phi(0.0), f64::NEG_INFINITY);
        assert_eq!(phi_inverse(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_degree_two_is_pass_through() {
        let graph = single_check(2);

        let (out, satisfied, ok) = run::<f32>(&graph, &[1.0, 1.0], 1);
        assert!((out[0] - 1.0).abs() < 1e-6);
        assert!((out[1] - 1.0).abs() < 1e-6);
        assert!(ok && satisfied[0]);

        let (out, _, ok) = run::<f32>(&graph, &[1.0, -1.0], 1);
        assert!((out[0] + 1.0).abs() < 1e-6);
        assert!((out[1] - 1.0).abs() < 1e-6);
        assert!(!ok);

        let (out, _, _) = run::<f64>(&graph, &[2.5, -0.75], 1);
        assert!((out[0] + 0.75).abs() < 1e-9);
        assert!((out[1] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_extrinsic_magnitude_below_weakest_input() {
        let graph = single_check(3);
        let (out, _, _) = run::<f64>(&graph, &[2.0, 3.0, 4.0], 1);

        // Each output is weaker than the weakest of the other inputs
        assert!(out[0] > 0.0 && out[0] < 3.0);
        assert!(out[1] > 0.0 && out[1] < 2.0);
        assert!(out[2] > 0.0 && out[2] < 2.0);
        assert!(out[0] > out[1] && out[1] > out[2]);
    }

    #[test]
    fn test_zero_input_silences_other_edges() {
        let graph = single_check(3);
        let (out, _, _) = run::<f64>(&graph, &[0.0, 1.0, -2.0], 1);

        assert_eq!(out[1], 0.0);
        assert_eq!(out[2], 0.0);
        let expected = phi_inverse(phi(1.0) + phi(2.0));
        assert!((out[0] + expected).abs() < 1e-9);

        let (out, _, _) = run::<f64>(&graph, &[0.0, 0.0, 5.0], 1);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_saturated_inputs_stay_finite() {
        let graph = single_check(2);
        let (out, _, _) = run::<f32>(&graph, &[f32::INFINITY, -1.0e30], 1);
        assert_eq!(out[0], -MAX_CHECK_MESSAGE as f32);
        assert_eq!(out[1], MAX_CHECK_MESSAGE as f32);
    }

    #[test]
    fn test_syndrome_is_nor_of_check_signs() {
        // Two checks over four variables: c0 = {0, 1}, c1 = {2, 3}
        let graph = ParityCheckGraph::from_check_rows(4, &[vec![0, 1], vec![2, 3]]).unwrap();

        let (_, satisfied, ok) = run::<f32>(&graph, &[1.0, 2.0, -1.0, -2.0], 1);
        assert!(ok && satisfied[0]);

        let (_, satisfied, ok) = run::<f32>(&graph, &[1.0, 2.0, -1.0, 2.0], 1);
        assert!(!ok && !satisfied[0]);

        let (_, _, ok) = run::<f32>(&graph, &[-1.0, 2.0, -1.0, 2.0], 1);
        assert!(!ok);
    }

    #[test]
    fn test_lanes_are_independent() {
        let graph = single_check(3);
        // Lane-major: slot s, lane f at s * 2 + f
        let batched = [1.0f64, -0.5, 2.0, 0.5, -3.0, 4.0];
        let (out, satisfied, ok) = run::<f64>(&graph, &batched, 2);

        let (lane0, s0, _) = run::<f64>(&graph, &[1.0, 2.0, -3.0], 1);
        let (lane1, s1, _) = run::<f64>(&graph, &[-0.5, 0.5, 4.0], 1);

        for s in 0..3 {
            assert_eq!(out[s * 2], lane0[s]);
            assert_eq!(out[s * 2 + 1], lane1[s]);
        }
        assert_eq!(satisfied, vec![s0[0], s1[0]]);
        assert!(!ok);
    }

    #[test]
    fn test_fixed_point_update() {
        let graph = single_check(2);
        let input = [Q16::from_f64(1.5), Q16::from_f64(-3.0)];
        let (out, _, _) = run::<Q16>(&graph, &input, 1);
        assert_eq!(out[0], Q16::from_f64(-3.0));
        assert_eq!(out[1], Q16::from_f64(1.5));
    }

    #[test]
    fn test_scratch_follows_max_degree() {
        let graph = single_check(40);
        let mut strategy = SumProduct::new();
        CheckNodeUpdate::<f32>::prepare(&mut strategy, &graph, 4);
        assert_eq!(strategy.scratch_len(), 160);

        let v_to_c = vec![1.0f32; 40 * 4];
        let mut c_to_v = vec![0.0f32; 40 * 4];
        let mut satisfied = vec![false; 4];
        assert!(strategy.process(&graph, &v_to_c, &mut c_to_v, 4, &mut satisfied));
        assert!(c_to_v.iter().all(|&v| v > 0.0));
    }
}
