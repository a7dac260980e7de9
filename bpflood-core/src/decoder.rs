//! Flooding belief-propagation decoder
//!
//! One decode call walks `INIT -> ITERATING -> {CONVERGED, EXHAUSTED}`:
//!
//! 1. every edge of variable node `v` is loaded with the channel value `L[v]`;
//! 2. each iteration runs the check-node update over *all* checks, tests the
//!    syndrome, and, if some frame is still unsatisfied, runs the
//!    variable-node update over *all* variables;
//! 3. the hard decision is the sign of `L[v] + sum(C_to_V)` per variable,
//!    XORed with the coset mask when coset decoding is enabled.
//!
//! The syndrome of step 2 is taken over the signs of `V_to_C`, which can
//! agree on every check while the decisions of step 3 still violate one. A
//! frame therefore only converges once both syndromes are satisfied.
//!
//! Several independent frames are decoded together in lane-major layout
//! (value of frame `f` at position `i` stored at `i * F + f`). Each frame's
//! outcome is captured at the iteration where its own syndrome is satisfied,
//! so a batched decode returns exactly what decoding each frame alone would.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

use crate::check_node::{CheckNodeUpdate, SumProduct};
use crate::constants::{BIT_ZERO, DEFAULT_ITERATIONS};
use crate::error::DecoderError;
use crate::graph::ParityCheckGraph;
use crate::llr::Llr;
use crate::messages::MessageBuffers;
use crate::reorder::Reorderer;

/// Where the last decode call stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePhase {
    /// No decode call has run yet
    #[default]
    Init,
    /// Message passing in progress
    Iterating,
    /// Every frame converged
    Converged,
    /// The iteration budget ran out with at least one frame unsatisfied
    Exhausted,
}

/// Iteration index and convergence of the last decode call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecoderState {
    /// Phase the decoder is in
    pub phase: DecodePhase,
    /// Number of completed variable-node passes
    pub iteration: usize,
    /// True when every frame of the call converged
    pub converged: bool,
}

/// Result of decoding one frame
///
/// `converged` certifies that the decided word (before coset un-scrambling)
/// satisfies every parity check, not that it is the word that was
/// transmitted: strong enough noise can push the decoder onto a different
/// valid codeword.
///
/// Without convergence, the bits are the decisions when the budget ran out.
/// They may or may not form a codeword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOutcome {
    /// Hard-decision bits (0 or 1)
    pub bits: Vec<u8>,
    /// Whether the messages and the decisions satisfied every check
    pub converged: bool,
    /// Variable-node passes performed before the outcome was captured
    pub iterations: usize,
}

impl DecodeOutcome {
    /// Gather the bits at the given positions
    pub fn info_bits(&self, positions: &[usize]) -> Result<Vec<u8>, DecoderError> {
        positions
            .iter()
            .map(|&p| {
                self.bits.get(p).copied().ok_or_else(|| {
                    DecoderError::InvalidDimensions(format!(
                        "information bit position {} outside a word of {} bits",
                        p,
                        self.bits.len()
                    ))
                })
            })
            .collect()
    }
}

/// Result of a soft-output decode of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct SoftOutcome<R> {
    /// A-posteriori values `L[v] + sum(C_to_V)` per variable node
    pub posteriors: Vec<R>,
    /// Whether the messages and the decisions satisfied every check
    pub converged: bool,
    /// Variable-node passes performed before the outcome was captured
    pub iterations: usize,
}

/// Result of a lane-major batch decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Hard decisions in lane-major layout (`bits[i * frames + f]`)
    pub bits: Vec<u8>,
    /// Convergence flag per frame
    pub converged: Vec<bool>,
    /// Iterations per frame
    pub iterations: Vec<usize>,
}

impl BatchOutcome {
    /// Number of frames in the batch
    pub fn frames(&self) -> usize {
        self.converged.len()
    }

    /// True when every frame converged
    pub fn all_converged(&self) -> bool {
        self.converged.iter().all(|&c| c)
    }

    /// Hard decisions of one frame
    pub fn frame_bits(&self, frame: usize) -> Vec<u8> {
        self.bits
            .iter()
            .skip(frame)
            .step_by(self.frames())
            .copied()
            .collect()
    }
}

fn default_iterations() -> usize {
    DEFAULT_ITERATIONS
}

fn default_frames() -> usize {
    1
}

/// Serializable construction parameters of a decoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Message length
    pub k: usize,
    /// Codeword length
    pub n: usize,
    /// Iteration budget
    #[serde(default = "default_iterations")]
    pub n_ite: usize,
    /// Degree of every check node
    pub check_degrees: Vec<u32>,
    /// Degree of every variable node
    pub variable_degrees: Vec<u32>,
    /// Check-order to variable-order edge permutation
    pub transpose: Vec<u32>,
    /// Coset scrambling sequence, one bit per variable node
    #[serde(default)]
    pub coset_mask: Vec<u8>,
    /// Whether hard decisions are un-scrambled with `coset_mask`
    #[serde(default)]
    pub coset: bool,
    /// Number of frames decoded together
    #[serde(default = "default_frames")]
    pub frames: usize,
    /// Positions of the information bits (defaults to the first `k`)
    #[serde(default)]
    pub info_bits_pos: Option<Vec<usize>>,
}

impl DecoderConfig {
    /// Describe a decoder for `graph` with message length `k`
    pub fn from_graph(graph: &ParityCheckGraph, k: usize) -> Self {
        Self {
            k,
            n: graph.n_variables(),
            n_ite: DEFAULT_ITERATIONS,
            check_degrees: graph.check_degrees().to_vec(),
            variable_degrees: graph.variable_degrees().to_vec(),
            transpose: graph.transpose().to_vec(),
            coset_mask: Vec::new(),
            coset: false,
            frames: 1,
            info_bits_pos: None,
        }
    }

    /// Build the Tanner graph described by this configuration
    pub fn graph(&self) -> Result<ParityCheckGraph, DecoderError> {
        if self.variable_degrees.len() != self.n {
            return Err(DecoderError::InvalidDimensions(format!(
                "{} variable degrees for a codeword of length {}",
                self.variable_degrees.len(),
                self.n
            )));
        }
        ParityCheckGraph::new(
            self.check_degrees.clone(),
            self.variable_degrees.clone(),
            self.transpose.clone(),
        )
    }

    /// Turn the configuration into a builder
    pub fn builder(&self) -> Result<DecoderBuilder, DecoderError> {
        let mut builder = DecoderBuilder::new(self.graph()?)
            .k(self.k)
            .iterations(self.n_ite)
            .frames(self.frames);
        if self.coset {
            builder = builder.coset(self.coset_mask.clone());
        }
        if let Some(positions) = &self.info_bits_pos {
            builder = builder.info_bits(positions.clone());
        }
        Ok(builder)
    }

    /// Check every invariant without allocating a decoder
    pub fn validate(&self) -> Result<(), DecoderError> {
        self.builder()?.validate().map(|_| ())
    }
}

/// Builder for [`FloodingDecoder`]
#[derive(Debug, Clone)]
pub struct DecoderBuilder {
    graph: Arc<ParityCheckGraph>,
    k: Option<usize>,
    n_ite: usize,
    coset_mask: Option<Vec<u8>>,
    frames: usize,
    info_bits_pos: Option<Vec<usize>>,
}

impl DecoderBuilder {
    /// Start a builder over a (possibly shared) Tanner graph
    pub fn new(graph: impl Into<Arc<ParityCheckGraph>>) -> Self {
        Self {
            graph: graph.into(),
            k: None,
            n_ite: DEFAULT_ITERATIONS,
            coset_mask: None,
            frames: 1,
            info_bits_pos: None,
        }
    }

    /// Set the message length (defaults to `N - M`)
    pub fn k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    /// Set the iteration budget
    pub fn iterations(mut self, n_ite: usize) -> Self {
        self.n_ite = n_ite;
        self
    }

    /// Enable coset decoding with the given scrambling sequence
    pub fn coset(mut self, mask: Vec<u8>) -> Self {
        self.coset_mask = Some(mask);
        self
    }

    /// Set the number of frames decoded together
    pub fn frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    /// Set the information-bit positions
    pub fn info_bits(mut self, positions: Vec<usize>) -> Self {
        self.info_bits_pos = Some(positions);
        self
    }

    /// Build a log-domain sum-product decoder with precision `R`
    pub fn build<R: Llr>(self) -> Result<FloodingDecoder<R, SumProduct>, DecoderError> {
        self.build_with(SumProduct::new())
    }

    /// Build a decoder running the given check-node update rule
    pub fn build_with<R, S>(self, mut strategy: S) -> Result<FloodingDecoder<R, S>, DecoderError>
    where
        R: Llr,
        S: CheckNodeUpdate<R>,
    {
        let (k, info_bits_pos) = match self.validate() {
            Ok(resolved) => resolved,
            Err(e) => {
                #[cfg(feature = "logging")]
                warn!("Rejecting decoder configuration: {}", e);
                return Err(e);
            }
        };

        let graph = self.graph;
        let n = graph.n_variables();
        let lanes = self.frames;
        strategy.prepare(&graph, lanes);

        #[cfg(feature = "logging")]
        debug!(
            "Built flooding decoder: N={}, K={}, M={}, E={}, max check degree {}, {} frame(s), {} iterations",
            n,
            k,
            graph.n_checks(),
            graph.n_edges(),
            graph.max_check_degree(),
            lanes,
            self.n_ite
        );

        Ok(FloodingDecoder {
            buffers: MessageBuffers::new(graph.n_edges(), lanes),
            graph,
            k,
            n_ite: self.n_ite,
            coset: self.coset_mask.is_some(),
            coset_mask: self.coset_mask.unwrap_or_default(),
            info_bits_pos,
            frames: lanes,
            strategy,
            satisfied: vec![false; lanes],
            settled: vec![false; lanes],
            totals: vec![R::ZERO; lanes],
            posteriors: vec![R::ZERO; n * lanes],
            lane_converged: vec![false; lanes],
            lane_iterations: vec![0; lanes],
            lane_input: Vec::new(),
            reorderer: Reorderer::new(),
            bit_reorderer: Reorderer::new(),
            state: DecoderState::default(),
        })
    }

    /// Resolve defaults and check every invariant; returns `(k, info_bits_pos)`
    fn validate(&self) -> Result<(usize, Vec<usize>), DecoderError> {
        let n = self.graph.n_variables();
        let k = self
            .k
            .unwrap_or_else(|| n.saturating_sub(self.graph.n_checks()));

        if k > n {
            return Err(DecoderError::InvalidDimensions(format!(
                "message length {} exceeds codeword length {}",
                k, n
            )));
        }

        if self.frames == 0 {
            return Err(DecoderError::UnsupportedFrameCount(0));
        }

        if let Some(mask) = &self.coset_mask {
            if mask.len() != n {
                return Err(DecoderError::LengthMismatch {
                    expected: n,
                    actual: mask.len(),
                });
            }
            if mask.iter().any(|&b| b > 1) {
                return Err(DecoderError::InvalidDimensions(
                    "coset mask entries must be 0 or 1".to_string(),
                ));
            }
        }

        let positions = match &self.info_bits_pos {
            Some(positions) => {
                if positions.len() != k {
                    return Err(DecoderError::LengthMismatch {
                        expected: k,
                        actual: positions.len(),
                    });
                }
                let mut seen = vec![false; n];
                for &p in positions {
                    if p >= n || seen[p] {
                        return Err(DecoderError::InvalidDimensions(format!(
                            "information bit position {} is out of range or repeated",
                            p
                        )));
                    }
                    seen[p] = true;
                }
                positions.clone()
            }
            None => (0..k).collect(),
        };

        Ok((k, positions))
    }
}

/// Flooding-schedule belief-propagation LDPC decoder
///
/// Generic over the soft-value precision `R` and the check-node update rule
/// `S`. The Tanner graph is shared read-only; message buffers and state are
/// owned by the instance, so concurrent decoding uses one instance per
/// thread.
#[derive(Debug)]
pub struct FloodingDecoder<R: Llr, S: CheckNodeUpdate<R> = SumProduct> {
    graph: Arc<ParityCheckGraph>,
    k: usize,
    n_ite: usize,
    coset: bool,
    coset_mask: Vec<u8>,
    info_bits_pos: Vec<usize>,
    frames: usize,
    strategy: S,
    buffers: MessageBuffers<R>,
    satisfied: Vec<bool>,
    settled: Vec<bool>,
    totals: Vec<R>,
    /// Lane-major a-posteriori values captured per frame
    posteriors: Vec<R>,
    lane_converged: Vec<bool>,
    lane_iterations: Vec<usize>,
    lane_input: Vec<R>,
    reorderer: Reorderer<R>,
    bit_reorderer: Reorderer<u8>,
    state: DecoderState,
}

impl<R: Llr> FloodingDecoder<R, SumProduct> {
    /// Build a sum-product decoder from a serialized configuration
    pub fn from_config(config: &DecoderConfig) -> Result<Self, DecoderError> {
        config.builder()?.build()
    }
}

impl<R: Llr, S: CheckNodeUpdate<R>> FloodingDecoder<R, S> {
    /// Shared Tanner graph
    pub fn graph(&self) -> &Arc<ParityCheckGraph> {
        &self.graph
    }

    /// Codeword length `N`
    pub fn n(&self) -> usize {
        self.graph.n_variables()
    }

    /// Message length `K`
    pub fn k(&self) -> usize {
        self.k
    }

    /// Iteration budget
    pub fn iterations(&self) -> usize {
        self.n_ite
    }

    /// Number of frames decoded together
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Whether coset decoding is enabled
    pub fn coset(&self) -> bool {
        self.coset
    }

    /// Positions of the information bits
    pub fn info_bits_pos(&self) -> &[usize] {
        &self.info_bits_pos
    }

    /// State left by the last decode call
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// The check-node update rule
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Message buffers as left by the last decode call
    pub fn messages(&self) -> &MessageBuffers<R> {
        &self.buffers
    }

    /// Decode one frame of `N` channel values into `N` hard-decision bits
    pub fn decode(&mut self, llrs: &[R]) -> Result<DecodeOutcome, DecoderError> {
        self.require_single_frame(llrs)?;
        self.run(llrs);
        Ok(DecodeOutcome {
            bits: self.hard_decisions(),
            converged: self.lane_converged[0],
            iterations: self.lane_iterations[0],
        })
    }

    /// Decode one frame and keep only the `K` information bits
    pub fn decode_info(&mut self, llrs: &[R]) -> Result<DecodeOutcome, DecoderError> {
        let mut outcome = self.decode(llrs)?;
        outcome.bits = outcome.info_bits(&self.info_bits_pos)?;
        Ok(outcome)
    }

    /// Decode one frame and return the a-posteriori soft values
    ///
    /// With coset decoding enabled the signs are un-scrambled like the hard
    /// decisions.
    pub fn decode_soft(&mut self, llrs: &[R]) -> Result<SoftOutcome<R>, DecoderError> {
        self.require_single_frame(llrs)?;
        self.run(llrs);

        let mut posteriors = self.posteriors.clone();
        if self.coset {
            crate::llr::apply_coset(&self.coset_mask, &mut posteriors);
        }

        Ok(SoftOutcome {
            posteriors,
            converged: self.lane_converged[0],
            iterations: self.lane_iterations[0],
        })
    }

    /// Decode `F` frames held in lane-major layout
    pub fn decode_batch(&mut self, lane_major: &[R]) -> Result<BatchOutcome, DecoderError> {
        let expected = self.n() * self.frames;
        if lane_major.len() != expected {
            return Err(DecoderError::LengthMismatch {
                expected,
                actual: lane_major.len(),
            });
        }

        self.run(lane_major);

        Ok(BatchOutcome {
            bits: self.hard_decisions(),
            converged: self.lane_converged.clone(),
            iterations: self.lane_iterations.clone(),
        })
    }

    /// Decode `F` separate frames: reorder to lane-major, decode, reorder back
    pub fn decode_frames(&mut self, frames: &[&[R]]) -> Result<Vec<DecodeOutcome>, DecoderError> {
        self.run_frames(frames)?;

        let bits = self.hard_decisions();
        let per_frame = self.bit_reorderer.reorder_rev(&bits, self.frames)?;

        Ok(per_frame
            .into_iter()
            .enumerate()
            .map(|(f, bits)| DecodeOutcome {
                bits,
                converged: self.lane_converged[f],
                iterations: self.lane_iterations[f],
            })
            .collect())
    }

    /// Decode `F` separate frames and return their a-posteriori soft values
    ///
    /// Each outcome equals what [`decode_soft`](Self::decode_soft) returns for
    /// that frame alone, coset un-scrambling included.
    pub fn decode_soft_frames(&mut self, frames: &[&[R]]) -> Result<Vec<SoftOutcome<R>>, DecoderError> {
        self.run_frames(frames)?;

        let per_frame = self.reorderer.reorder_rev(&self.posteriors, self.frames)?;

        Ok(per_frame
            .into_iter()
            .enumerate()
            .map(|(f, mut posteriors)| {
                if self.coset {
                    crate::llr::apply_coset(&self.coset_mask, &mut posteriors);
                }
                SoftOutcome {
                    posteriors,
                    converged: self.lane_converged[f],
                    iterations: self.lane_iterations[f],
                }
            })
            .collect())
    }

    /// Check `F` frames of `N` values, interleave them and run the schedule
    fn run_frames(&mut self, frames: &[&[R]]) -> Result<(), DecoderError> {
        if frames.len() != self.frames {
            return Err(DecoderError::UnsupportedFrameCount(frames.len()));
        }
        let n = self.n();
        if let Some(bad) = frames.iter().find(|frame| frame.len() != n) {
            return Err(DecoderError::LengthMismatch {
                expected: n,
                actual: bad.len(),
            });
        }

        let mut input = core::mem::take(&mut self.lane_input);
        input.resize(n * self.frames, R::ZERO);
        self.reorderer.apply(frames, &mut input)?;
        self.run(&input);
        self.lane_input = input;
        Ok(())
    }

    fn require_single_frame(&self, llrs: &[R]) -> Result<(), DecoderError> {
        if self.frames != 1 {
            return Err(DecoderError::UnsupportedFrameCount(self.frames));
        }
        if llrs.len() != self.n() {
            return Err(DecoderError::LengthMismatch {
                expected: self.n(),
                actual: llrs.len(),
            });
        }
        Ok(())
    }

    /// Lane-major hard decisions of the captured posteriors
    fn hard_decisions(&self) -> Vec<u8> {
        let lanes = self.frames;
        self.posteriors
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let scramble = if self.coset {
                    self.coset_mask[i / lanes]
                } else {
                    BIT_ZERO
                };
                value.hard_bit() ^ scramble
            })
            .collect()
    }

    /// Run the flooding schedule over a lane-major channel buffer of `N * F` values
    fn run(&mut self, channel: &[R]) {
        let graph = &*self.graph;
        let lanes = self.frames;

        self.state = DecoderState {
            phase: DecodePhase::Iterating,
            iteration: 0,
            converged: false,
        };

        // Uniform initialization: each edge carries the full channel value
        for v in 0..graph.n_variables() {
            let values = &channel[v * lanes..(v + 1) * lanes];
            for slot in graph.variable_edges(v) {
                self.buffers.set_v_to_c(slot, values);
            }
        }
        self.buffers.clear_c_to_v();
        self.settled.fill(false);

        if self.n_ite == 0 {
            for f in 0..lanes {
                settle_lane(graph, channel, self.buffers.c_to_v(), lanes, f, &mut self.posteriors);
                self.lane_converged[f] = lane_syndrome(graph, channel, lanes, f);
                self.lane_iterations[f] = 0;
            }
            self.finish(0);
            return;
        }

        let mut iteration = 0;
        loop {
            let (v_to_c, c_to_v) = self.buffers.check_phase();
            self.strategy
                .process(graph, v_to_c, c_to_v, lanes, &mut self.satisfied);

            for f in 0..lanes {
                if !self.settled[f] && self.satisfied[f] {
                    settle_lane(graph, channel, self.buffers.c_to_v(), lanes, f, &mut self.posteriors);
                    if !lane_syndrome(graph, &self.posteriors, lanes, f) {
                        continue;
                    }
                    self.settled[f] = true;
                    self.lane_converged[f] = true;
                    self.lane_iterations[f] = iteration;
                }
            }

            if self.settled.iter().all(|&s| s) {
                break;
            }

            let (v_to_c, c_to_v) = self.buffers.variable_phase();
            variable_update(graph, channel, v_to_c, c_to_v, lanes, &mut self.totals);
            iteration += 1;

            #[cfg(feature = "logging")]
            trace!(
                "Iteration {}: {} of {} frame(s) settled",
                iteration,
                self.settled.iter().filter(|&&s| s).count(),
                lanes
            );

            if iteration >= self.n_ite {
                for f in 0..lanes {
                    if !self.settled[f] {
                        settle_lane(graph, channel, self.buffers.c_to_v(), lanes, f, &mut self.posteriors);
                        self.settled[f] = true;
                        self.lane_converged[f] = false;
                        self.lane_iterations[f] = iteration;
                    }
                }
                break;
            }
        }

        self.finish(iteration);
    }

    fn finish(&mut self, iteration: usize) {
        let converged = self.lane_converged.iter().all(|&c| c);
        self.state = DecoderState {
            phase: if converged {
                DecodePhase::Converged
            } else {
                DecodePhase::Exhausted
            },
            iteration,
            converged,
        };

        #[cfg(feature = "logging")]
        debug!(
            "Decode finished in {:?} after {} iteration(s)",
            self.state.phase, iteration
        );
    }
}

/// Whether the signs of lane `f` of a per-variable buffer satisfy every check
fn lane_syndrome<R: Llr>(graph: &ParityCheckGraph, values: &[R], lanes: usize, f: usize) -> bool {
    (0..graph.n_checks()).all(|c| {
        let parity = graph.check_edges(c).iter().fold(false, |acc, &slot| {
            let v = graph.variable_of_edge(slot as usize);
            acc ^ values[v * lanes + f].is_negative()
        });
        !parity
    })
}

/// Extrinsic variable-node update over every variable and lane
fn variable_update<R: Llr>(
    graph: &ParityCheckGraph,
    channel: &[R],
    v_to_c: &mut [R],
    c_to_v: &[R],
    lanes: usize,
    totals: &mut [R],
) {
    for v in 0..graph.n_variables() {
        let edges = graph.variable_edges(v);

        totals.copy_from_slice(&channel[v * lanes..(v + 1) * lanes]);
        for slot in edges.clone() {
            let incoming = &c_to_v[slot * lanes..(slot + 1) * lanes];
            for (total, &value) in totals.iter_mut().zip(incoming) {
                *total = total.sat_add(value);
            }
        }

        for slot in edges {
            let range = slot * lanes..(slot + 1) * lanes;
            let outgoing = &mut v_to_c[range.clone()];
            for ((out, &total), &own) in outgoing.iter_mut().zip(totals.iter()).zip(&c_to_v[range]) {
                *out = total.sat_sub(own);
            }
        }
    }
}

/// Capture `L[v] + sum(C_to_V)` for every variable of one lane
fn settle_lane<R: Llr>(
    graph: &ParityCheckGraph,
    channel: &[R],
    c_to_v: &[R],
    lanes: usize,
    f: usize,
    posteriors: &mut [R],
) {
    for v in 0..graph.n_variables() {
        let total = graph
            .variable_edges(v)
            .fold(channel[v * lanes + f], |acc, slot| acc.sat_add(c_to_v[slot * lanes + f]));
        posteriors[v * lanes + f] = total;
    }
}
