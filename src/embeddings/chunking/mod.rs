#[cfg(test)]
mod tests;

use tracing::debug;

/// Delimiter between chunks.
pub const CHUNK_DELIMITER: char = '.';

/// Split text into embedding-ready chunks.
///
/// The input is trimmed, split on every `.`, and empty segments are dropped.
/// Segments are otherwise kept verbatim: leading spaces after a period stay,
/// and a segment made only of whitespace is still a chunk. Output order follows
/// the source text, which is what pairs chunk `i` with embedding `i`.
#[inline]
pub fn chunk_text(text: &str) -> Vec<String> {
    let chunks: Vec<String> = text
        .trim()
        .split(CHUNK_DELIMITER)
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect();

    debug!(
        "Chunked {} bytes of text into {} chunks",
        text.len(),
        chunks.len()
    );

    chunks
}
