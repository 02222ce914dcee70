//! Chunker line-boundary properties.
//!
//! For any byte stream and any buffer/threshold sizing, the emitted chunks
//! concatenate back to the exact input, and no chunk boundary falls inside a
//! line (except the final chunk of a terminator-less input).

use ipfreq::{BufferPool, Chunk, Chunker, ChunkerConfig, PoolConfig};
use proptest::prelude::*;
use std::thread;

fn run_chunker(input: &[u8], buffer_len: usize, read_size: usize, threshold: usize) -> Vec<Vec<u8>> {
    let pool = BufferPool::new(PoolConfig {
        buffer_len,
        total_buffers: 4,
        workers: 1,
        local_queue_cap: 1,
    });
    let chunker = Chunker::new(
        pool,
        ChunkerConfig {
            read_size,
            flush_threshold: threshold,
        },
    );
    let (tx, rx) = crossbeam_channel::bounded::<Chunk>(2);
    let consumer = thread::spawn(move || {
        let mut out = Vec::new();
        while let Ok(chunk) = rx.recv() {
            out.push(chunk.data().to_vec());
        }
        out
    });
    chunker.run(input, tx).unwrap();
    consumer.join().unwrap()
}

/// Mix of newline-heavy and newline-free content, including runs that
/// exceed typical buffer sizes.
fn input_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            3 => prop::collection::vec(any::<u8>(), 0..40),
            2 => Just(b"\n".to_vec()),
            1 => prop::collection::vec(prop::num::u8::ANY.prop_filter("no newline", |&b| b != b'\n'), 40..200),
        ],
        0..30,
    )
    .prop_map(|pieces| pieces.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Concatenating all chunks reproduces the input byte-for-byte.
    #[test]
    fn chunks_concatenate_to_input(
        input in input_strategy(),
        buffer_len in 8usize..128,
        read_size in 1usize..64,
        threshold in 1usize..96,
    ) {
        let chunks = run_chunker(&input, buffer_len, read_size, threshold);
        let rejoined: Vec<u8> = chunks.concat();
        prop_assert_eq!(rejoined, input);
    }

    /// Every chunk but the last ends exactly at a line terminator, so no
    /// line is ever split across chunks.
    #[test]
    fn boundaries_fall_on_terminators(
        input in input_strategy(),
        buffer_len in 8usize..128,
        read_size in 1usize..64,
        threshold in 1usize..96,
    ) {
        let chunks = run_chunker(&input, buffer_len, read_size, threshold);

        for chunk in &chunks {
            prop_assert!(!chunk.is_empty(), "empty chunks are suppressed");
        }
        if !chunks.is_empty() {
            for chunk in &chunks[..chunks.len() - 1] {
                prop_assert_eq!(*chunk.last().unwrap(), b'\n');
            }
            // The final chunk may lack a terminator only if the input does.
            let last = chunks.last().unwrap();
            if input.ends_with(b"\n") {
                prop_assert_eq!(*last.last().unwrap(), b'\n');
            }
        }
    }
}
