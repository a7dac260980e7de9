//! # bpflood Core
//!
//! Flooding-schedule belief-propagation decoding of LDPC codes.
//!
//! A [`ParityCheckGraph`] is built once per code and shared read-only. Each
//! [`FloodingDecoder`] owns its message buffers and decodes one frame, or
//! several frames at once in lane-major layout, returning hard decisions and
//! a convergence flag.
//!
//! ## Modules
//!
//! - `constants`: Register width, iteration default, frame-count caps, message bound
//! - `error`: Error taxonomy
//! - `llr`: Soft-value numeric domains (`f32`, `f64`, saturating fixed point)
//! - `graph`: Tanner-graph topology
//! - `alist`: alist text format reader and writer
//! - `messages`: Per-edge message storage
//! - `check_node`: Check-node update strategies (log-domain sum-product)
//! - `decoder`: Flooding decoder, configuration and builder
//! - `reorder`: Per-frame / lane-major reordering
//! - `router`: Type byte-width lookup and routing boundary
//!
//! ## Example
//!
//! ```
//! use bpflood_core::{DecoderBuilder, ParityCheckGraph};
//!
//! let graph = ParityCheckGraph::from_check_rows(
//!     6,
//!     &[vec![0, 1, 3], vec![1, 2, 4], vec![0, 4, 5], vec![2, 3, 5]],
//! )?;
//! let mut decoder = DecoderBuilder::new(graph).iterations(20).build::<f32>()?;
//!
//! // Codeword 001011 received with bit 1 flipped
//! let llrs = [1.4, -1.4, -1.4, 1.4, -1.4, -1.4];
//! let outcome = decoder.decode(&llrs)?;
//! assert!(outcome.converged);
//! assert_eq!(outcome.bits, vec![0, 0, 1, 0, 1, 1]);
//! # Ok::<(), bpflood_core::DecoderError>(())
//! ```

#![warn(missing_docs)]

pub mod alist;
pub mod check_node;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod graph;
pub mod llr;
pub mod messages;
pub mod reorder;
pub mod router;

// Re-export commonly used types
pub use check_node::{CheckNodeUpdate, SumProduct};
pub use decoder::{
    BatchOutcome, DecodeOutcome, DecodePhase, DecoderBuilder, DecoderConfig, DecoderState,
    FloodingDecoder, SoftOutcome,
};
pub use error::DecoderError;
pub use graph::ParityCheckGraph;
pub use llr::{Fixed, Llr, Q16, Q8};
pub use reorder::{Reorderer, StaticReorderer};
pub use router::{compute_bytes, ElementType, Router};

/// Result type alias for bpflood operations
pub type Result<T> = core::result::Result<T, DecoderError>;
