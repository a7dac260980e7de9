//! Known-answer vectors for small textbook codes
//!
//! Expected values were produced by an independent double-precision run of
//! the log-domain sum-product flooding schedule.

use bpflood_core::{DecoderBuilder, FloodingDecoder, ParityCheckGraph};

/// Example 2.5 of Johnson, "Iterative Error Correction": N = 6, M = 4
fn johnson_graph() -> ParityCheckGraph {
    ParityCheckGraph::from_check_rows(
        6,
        &[vec![0, 1, 3], vec![1, 2, 4], vec![0, 4, 5], vec![2, 3, 5]],
    )
    .unwrap()
}

/// Hamming(7,4) with H rows 1110100, 0111010, 1101001
fn hamming_graph() -> ParityCheckGraph {
    ParityCheckGraph::from_check_rows(
        7,
        &[vec![0, 1, 2, 4], vec![1, 2, 3, 5], vec![0, 1, 3, 6]],
    )
    .unwrap()
}

fn build_decoder(graph: ParityCheckGraph, iterations: usize) -> FloodingDecoder<f64> {
    DecoderBuilder::new(graph)
        .iterations(iterations)
        .build::<f64>()
        .unwrap()
}

fn bpsk(bits: &[u8], magnitude: f64) -> Vec<f64> {
    bits.iter()
        .map(|&b| if b == 0 { magnitude } else { -magnitude })
        .collect()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() < 1e-4, "position {}: {} != {}", i, a, e);
    }
}

#[test]
fn test_vector_johnson_single_error_posteriors() {
    let mut decoder = build_decoder(johnson_graph(), 20);
    let mut llrs = bpsk(&[0, 0, 1, 0, 1, 1], 1.3863);
    llrs[0] = -llrs[0];

    let soft = decoder.decode_soft(&llrs).unwrap();
    assert!(soft.converged);
    assert_eq!(soft.iterations, 2);
    assert_close(
        &soft.posteriors,
        &[1.032308, 2.006045, -2.096231, 2.006045, -2.006045, -2.006045],
    );
}

#[test]
fn test_vector_johnson_every_single_error() {
    let codeword = [0u8, 0, 1, 0, 1, 1];
    let mut decoder = build_decoder(johnson_graph(), 20);

    for flip in 0..6 {
        let mut llrs = bpsk(&codeword, 1.3863);
        llrs[flip] = -llrs[flip];
        let outcome = decoder.decode(&llrs).unwrap();
        assert_eq!(outcome.bits, codeword, "flip at {}", flip);
        assert_eq!(outcome.iterations, 2, "flip at {}", flip);
        assert!(outcome.converged);
    }
}

#[test]
fn test_vector_johnson_uniform_channel() {
    // All-zero word: one check pass already satisfies every check
    let mut decoder = build_decoder(johnson_graph(), 10);
    let soft = decoder.decode_soft(&[1.0; 6]).unwrap();
    assert!(soft.converged);
    assert_eq!(soft.iterations, 0);
    assert_close(&soft.posteriors, &[1.867562; 6]);
}

#[test]
fn test_vector_johnson_exhausted() {
    let mut decoder = build_decoder(johnson_graph(), 8);
    let soft = decoder
        .decode_soft(&[1.2, -0.4, -0.9, 0.3, -1.1, -0.2])
        .unwrap();
    assert!(!soft.converged);
    assert_eq!(soft.iterations, 8);
    assert_close(
        &soft.posteriors,
        &[1.414220, 0.496888, -1.002989, 0.683029, -1.264938, -0.908817],
    );

    // The decisions form a codeword even though the message signs never agreed
    let outcome = decoder.decode(&[1.2, -0.4, -0.9, 0.3, -1.1, -0.2]).unwrap();
    assert_eq!(outcome.bits, vec![0, 0, 1, 0, 1, 1]);
}

#[test]
fn test_vector_johnson_message_agreement_is_not_enough() {
    // After two iterations every check sees an even number of negative
    // messages, yet the decisions 110011 still violate two checks
    let llrs = [-0.5, -3.0, 3.3, 1.0, -3.4, -1.7];
    let graph = johnson_graph();

    let mut decoder = build_decoder(johnson_graph(), 3);
    let soft = decoder.decode_soft(&llrs).unwrap();
    assert!(!soft.converged);
    assert_eq!(soft.iterations, 3);
    assert_close(
        &soft.posteriors,
        &[-0.019229, -5.093559, 5.697099, 0.408651, -5.577611, -1.748389],
    );
    let bits: Vec<u8> = soft.posteriors.iter().map(|&v| (v < 0.0) as u8).collect();
    assert_eq!(graph.unsatisfied_checks(&bits).unwrap(), 2);

    let mut decoder = build_decoder(johnson_graph(), 20);
    let soft = decoder.decode_soft(&llrs).unwrap();
    assert!(soft.converged);
    assert_eq!(soft.iterations, 8);
    assert_close(
        &soft.posteriors,
        &[0.759870, -5.269499, 5.904219, -0.395793, -5.811318, -2.423415],
    );
}

#[test]
fn test_vector_hamming_codewords_are_fixed_points() {
    let graph = hamming_graph();
    let codewords: Vec<Vec<u8>> = (0u8..128)
        .map(|word| (0..7).map(|i| (word >> i) & 1).collect::<Vec<u8>>())
        .filter(|bits| graph.is_codeword(bits))
        .collect();
    assert_eq!(codewords.len(), 16);

    let mut decoder = build_decoder(graph, 20);
    for codeword in &codewords {
        let outcome = decoder.decode(&bpsk(codeword, 2.0)).unwrap();
        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(&outcome.bits, codeword);
    }
}

#[test]
fn test_vector_hamming_short_cycles() {
    // Rows 0 and 1 share variables 1 and 2: belief propagation on this
    // graph does not settle on every single error
    let codeword = [1u8, 0, 1, 1, 0, 0, 0];
    let mut decoder = build_decoder(hamming_graph(), 20);

    let mut llrs = bpsk(&codeword, 3.0);
    llrs[4] = -llrs[4];
    let soft = decoder.decode_soft(&llrs).unwrap();
    assert!(!soft.converged);
    assert_eq!(soft.iterations, 20);
    assert_close(
        &soft.posteriors,
        &[-1.4745, 1.5906, -1.4745, -3.5221, -0.1969, 3.267, 3.267],
    );

    // Here the decisions are right although the checks never settle
    let mut llrs = bpsk(&codeword, 3.0);
    llrs[0] = -llrs[0];
    let outcome = decoder.decode(&llrs).unwrap();
    assert!(!outcome.converged);
    assert_eq!(outcome.bits, codeword);
}

#[test]
fn test_vector_zero_iterations() {
    let mut decoder = build_decoder(hamming_graph(), 0);
    let outcome = decoder
        .decode(&[-0.5, 0.25, -2.0, -1.0, 0.75, 3.0, 0.125])
        .unwrap();
    assert_eq!(outcome.bits, vec![1, 0, 1, 1, 0, 0, 0]);
    assert!(outcome.converged);
    assert_eq!(outcome.iterations, 0);
}
