//! Small dense-vector helpers used for preference scoring.

type Float = f32;

/// Dot product over the shared prefix of two vectors.
pub fn dot(a: &[Float], b: &[Float]) -> Float {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Unit-length copy of `vector`. A zero vector stays zero.
pub fn normalize(vector: &[Float]) -> Vec<Float> {
    let norm_sq: Float = vector.iter().map(|&x| x * x).sum();
    if norm_sq == 0.0 || !norm_sq.is_finite() {
        return vec![0.0; vector.len()];
    }
    let inv_norm = 1.0 / norm_sq.sqrt();
    vector.iter().map(|&x| x * inv_norm).collect()
}

/// Element-wise mean of equally sized vectors. Empty input gives an empty vector.
pub fn mean<'a, I>(vectors: I, dim: usize) -> Vec<Float>
where
    I: IntoIterator<Item = &'a [Float]>,
{
    let mut sum = vec![0.0f64; dim];
    let mut count = 0usize;
    for v in vectors {
        for (acc, x) in sum.iter_mut().zip(v.iter()) {
            *acc += f64::from(*x);
        }
        count += 1;
    }
    if count == 0 {
        return Vec::new();
    }
    sum.into_iter().map(|s| (s / count as f64) as Float).collect()
}

/// Rescales `values` into [0, 1]. When every value is equal (or the input is
/// degenerate) all outputs are 0.
pub fn min_max_scale(values: &[f64]) -> Vec<f64> {
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = hi - lo;
    if !range.is_finite() || range <= f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|&v| if v.is_finite() { ((v - lo) / range).clamp(0.0, 1.0) } else { 0.0 })
        .collect()
}
