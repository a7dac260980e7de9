//! Per-edge soft-value storage
//!
//! Both message arrays are indexed by variable-order edge slot and hold one
//! value per frame lane: the lanes of slot `s` live at `s * lanes .. (s + 1) * lanes`.

use crate::llr::Llr;

/// Variable-to-check and check-to-variable message arrays
///
/// Allocated once per decoder, sized to the edge count times the frame
/// count, and re-initialized by every decode call.
#[derive(Debug, Clone)]
pub struct MessageBuffers<R> {
    v_to_c: Vec<R>,
    c_to_v: Vec<R>,
    lanes: usize,
}

impl<R: Llr> MessageBuffers<R> {
    /// Allocate zeroed buffers for `edges` edges and `lanes` frames
    pub fn new(edges: usize, lanes: usize) -> Self {
        Self {
            v_to_c: vec![R::ZERO; edges * lanes],
            c_to_v: vec![R::ZERO; edges * lanes],
            lanes,
        }
    }

    /// Number of frame lanes per edge
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Number of edges
    pub fn edges(&self) -> usize {
        self.v_to_c.len() / self.lanes.max(1)
    }

    /// Variable-to-check messages
    pub fn v_to_c(&self) -> &[R] {
        &self.v_to_c
    }

    /// Check-to-variable messages
    pub fn c_to_v(&self) -> &[R] {
        &self.c_to_v
    }

    /// Borrow for the check-node phase: read `V_to_C`, write `C_to_V`
    pub fn check_phase(&mut self) -> (&[R], &mut [R]) {
        (&self.v_to_c, &mut self.c_to_v)
    }

    /// Borrow for the variable-node phase: write `V_to_C`, read `C_to_V`
    pub fn variable_phase(&mut self) -> (&mut [R], &[R]) {
        (&mut self.v_to_c, &self.c_to_v)
    }

    /// Copy a lane-major value set into the `V_to_C` lanes of one edge
    #[inline]
    pub fn set_v_to_c(&mut self, slot: usize, values: &[R]) {
        self.v_to_c[slot * self.lanes..(slot + 1) * self.lanes].copy_from_slice(values);
    }

    /// Zero the check-to-variable messages
    pub fn clear_c_to_v(&mut self) {
        self.c_to_v.fill(R::ZERO);
    }
}
