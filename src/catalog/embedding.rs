//! Embedding column codec and placeholder vectors for catalogs shipped
//! without the offline embedding stage.

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use bytemuck::cast_slice;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Dimension of synthesized vectors when the catalog carries none.
pub const PLACEHOLDER_DIMENSION: usize = 8;

/// Decodes an embedding cell: either a bracketed float list
/// (`[0.1, -0.2]`) or base64 of little-endian `f32` bytes.
pub fn decode_embedding(cell: &str) -> Result<Vec<f32>> {
    let cell = cell.trim();
    if cell.starts_with('[') {
        let body = cell.trim_start_matches('[').trim_end_matches(']');
        return body
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f32>()
                    .map_err(|e| anyhow!("Invalid embedding component '{}': {}", s, e))
            })
            .collect();
    }

    let bytes = general_purpose::STANDARD
        .decode(cell)
        .map_err(|e| anyhow!("Embedding is neither a float list nor base64: {}", e))?;
    if bytes.len() % 4 != 0 {
        return Err(anyhow!(
            "Base64 embedding has {} bytes, not a multiple of 4",
            bytes.len()
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Base64 form accepted by [`decode_embedding`].
pub fn encode_embedding(vector: &[f32]) -> String {
    let bytes: &[u8] = cast_slice(vector);
    general_purpose::STANDARD.encode(bytes)
}

/// Deterministic vector for an item without an embedding.
/// Same id and dimension, same vector, so pool building stays reproducible.
pub fn placeholder_embedding(item_id: u64, dimension: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(item_id);
    (0..dimension)
        .map(|_| rng.gen_range(-1.0f32..1.0))
        .collect()
}
