use std::collections::HashMap;

use crate::search::min_max_scale;

/// Inverse frequency of each item's cluster among `cluster_ids`, min-max
/// scaled so the rarest cluster scores 1.0. A single shared cluster scores 0.
pub fn cluster_novelty(cluster_ids: &[i64]) -> Vec<f64> {
    let mut freq: HashMap<i64, usize> = HashMap::new();
    for id in cluster_ids {
        *freq.entry(*id).or_insert(0) += 1;
    }
    let inv_freq: Vec<f64> = cluster_ids
        .iter()
        .map(|id| 1.0 / freq.get(id).copied().unwrap_or(1) as f64)
        .collect();
    min_max_scale(&inv_freq)
}
