pub mod fit;
pub mod novelty;
pub mod pool;

pub use fit::{kcal_score, nutrition_fit, protein_score, KcalRange, ScoringTargets};
pub use novelty::cluster_novelty;
pub use pool::{
    apply_diversity_quota, build_pool_for_slot, build_pools, cluster_quota, rank, score_candidates,
    CandidatePool, PoolSet, PoolWarning, ScoredCandidate,
};
