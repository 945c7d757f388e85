use rayon::prelude::*;
use std::sync::Arc;

use crate::model::CatalogItem;
use crate::search::vector::{dot, mean, min_max_scale, normalize};

/// Approximates a user's taste before any feedback exists: the unit-length
/// mean of every candidate's embedding.
pub fn cold_start_vector(items: &[Arc<CatalogItem>], dim: usize) -> Vec<f32> {
    let centroid = mean(items.iter().map(|item| item.embedding.as_slice()), dim);
    normalize(&centroid)
}

/// Cosine similarity of each item against the cold-start vector, min-max
/// scaled across `items`. Output order matches input order.
pub fn preference_scores(items: &[Arc<CatalogItem>], dim: usize) -> Vec<f64> {
    if items.is_empty() {
        return Vec::new();
    }
    let user_vector = cold_start_vector(items, dim);
    let raw: Vec<f64> = items
        .par_iter()
        .map(|item| f64::from(dot(&normalize(&item.embedding), &user_vector)))
        .collect();
    min_max_scale(&raw)
}
