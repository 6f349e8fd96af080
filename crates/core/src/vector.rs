//! Textual vector codec for the embedding service wire format.
//!
//! The embedding service returns vectors as a bracketed, space-separated list
//! of floats, e.g. `"[0.12 -0.5 3e-05]"`. [`decode`] turns that text into a
//! `Vec<f32>` and [`encode`] produces the same representation.

use crate::error::{Result, SearchError};

/// Decodes a bracketed, whitespace-separated float list into a vector.
///
/// Commas are tolerated as separators. Fails with
/// [`SearchError::EmbeddingDecode`] on an empty vector, an unparsable
/// component, or a non-finite value.
pub fn decode(text: &str) -> Result<Vec<f32>> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);

    let mut vector = Vec::new();
    for (i, part) in inner
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .enumerate()
    {
        let value: f32 = part.parse().map_err(|e| {
            SearchError::EmbeddingDecode(format!("component {i} '{part}': {e}"))
        })?;
        if !value.is_finite() {
            return Err(SearchError::EmbeddingDecode(format!(
                "component {i} is not finite"
            )));
        }
        vector.push(value);
    }

    if vector.is_empty() {
        return Err(SearchError::EmbeddingDecode("empty vector".into()));
    }
    Ok(vector)
}

/// Encodes a vector in the embedding service's textual format.
pub fn encode(vector: &[f32]) -> String {
    let body: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
    format!("[{}]", body.join(" "))
}

/// Checks that `vector` has exactly `expected` components.
pub fn check_dimension(vector: &[f32], expected: usize) -> Result<()> {
    if vector.len() != expected {
        return Err(SearchError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}
