use tracing::debug;

/// Splits `text` into chunks of at most `chunk_size` words.
///
/// Words are separated by any run of whitespace and rejoined with a single
/// space, so the original spacing inside a chunk is not preserved. Empty or
/// whitespace-only input yields no chunks. The caller guarantees a sensible
/// `chunk_size` (the CLI enforces a minimum of 10); zero is treated as one.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let chunks: Vec<String> = words
        .chunks(chunk_size.max(1))
        .map(|slice| slice.join(" "))
        .collect();
    debug!(
        "Split {} words into {} chunks of up to {} words",
        words.len(),
        chunks.len(),
        chunk_size
    );
    chunks
}
