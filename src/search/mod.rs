pub mod preference;
pub mod vector;

pub use preference::{cold_start_vector, preference_scores};
pub use vector::{dot, min_max_scale, normalize};
