//! Fuzzing entry points for bpflood-core
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Wrap an entry point in a `fuzz_target!` and run it

use bpflood_core::{alist, DecoderBuilder, ParityCheckGraph, Reorderer, Q8};

fn johnson_graph() -> Option<ParityCheckGraph> {
    ParityCheckGraph::from_check_rows(
        6,
        &[vec![0, 1, 3], vec![1, 2, 4], vec![0, 4, 5], vec![2, 3, 5]],
    )
    .ok()
}

/// Decode arbitrary bytes as 8-bit soft values, six per frame
pub fn fuzz_decode(data: &[u8]) {
    let Some(graph) = johnson_graph() else {
        return;
    };
    let Ok(mut decoder) = DecoderBuilder::new(graph).iterations(8).build::<Q8>() else {
        return;
    };

    for chunk in data.chunks_exact(6) {
        let llrs: Vec<Q8> = chunk
            .iter()
            .map(|&b| Q8::from_raw(b as i8 as i32))
            .collect();
        // Should never fail on a well-sized frame
        let _ = decoder.decode(&llrs);
    }
}

/// Parse arbitrary text as an alist document
pub fn fuzz_alist(data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    if let Ok(graph) = alist::parse(&text) {
        // Whatever parses must survive a write/parse round trip
        let _ = alist::parse(&alist::write(&graph));
    }
}

/// Reorder arbitrary bytes as `1 << (data[0] % 5)` frames and back
pub fn fuzz_reorder(data: &[u8]) {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let n_frames = 1usize << (selector % 5);
    let n = rest.len() / n_frames;
    if n == 0 {
        return;
    }

    let frames: Vec<&[u8]> = rest.chunks_exact(n).take(n_frames).collect();
    let mut reorderer = Reorderer::<u8>::new();
    if let Ok(lane_major) = reorderer.reorder(&frames) {
        let _ = reorderer.reorder_rev(&lane_major, n_frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzz_decode_empty() {
        fuzz_decode(&[]);
    }

    #[test]
    fn test_fuzz_decode_random() {
        fuzz_decode(&[0x12, 0x84, 0x56, 0x78, 0x80, 0x7F, 0x00, 0xFF, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_fuzz_alist_garbage() {
        fuzz_alist(&[]);
        fuzz_alist(b"6 4\n2 3\n");
        fuzz_alist(&[0xFF; 256]);
    }

    #[test]
    fn test_fuzz_alist_valid() {
        let graph = johnson_graph().unwrap();
        fuzz_alist(alist::write(&graph).as_bytes());
    }

    #[test]
    fn test_fuzz_reorder() {
        fuzz_reorder(&[]);
        fuzz_reorder(&[3]);
        fuzz_reorder(&[0x02; 1024]);
        fuzz_reorder(&[0x04; 37]);
    }
}
