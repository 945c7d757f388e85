use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::candidates::fit::{nutrition_fit, ScoringTargets};
use crate::candidates::novelty::cluster_novelty;
use crate::catalog::Catalog;
use crate::config::PlannerConfig;
use crate::error::{NoCandidatesReason, PlannerError, Result};
use crate::model::{CatalogItem, DailyTarget, MealTarget, Slot, UserProfile};
use crate::planner::ExclusionMatcher;
use crate::sanitize::finite_f64;
use crate::search::preference_scores;
use crate::targets::split_daily_target;

/// A catalog item with the scores it was ranked by. Every score is in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub item: Arc<CatalogItem>,
    #[serde(serialize_with = "finite_f64")]
    pub preference_score: f64,
    #[serde(serialize_with = "finite_f64")]
    pub nutrition_fit: f64,
    #[serde(serialize_with = "finite_f64")]
    pub novelty_bonus: f64,
    #[serde(serialize_with = "finite_f64")]
    pub model_score: f64,
}

/// Ranked, diversity-capped candidates for one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidatePool {
    slot: Slot,
    candidates: Vec<ScoredCandidate>,
}

impl CandidatePool {
    pub fn new(slot: Slot, candidates: Vec<ScoredCandidate>) -> Self {
        Self { slot, candidates }
    }

    pub fn empty(slot: Slot) -> Self {
        Self::new(slot, Vec::new())
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn candidates(&self) -> &[ScoredCandidate] {
        &self.candidates
    }

    pub fn items(&self) -> impl Iterator<Item = &Arc<CatalogItem>> + '_ {
        self.candidates.iter().map(|c| &c.item)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Items per cluster id.
    pub fn cluster_counts(&self) -> BTreeMap<i64, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.candidates {
            *counts.entry(c.item.cluster_id).or_insert(0) += 1;
        }
        counts
    }
}

/// Non-fatal pool-building events surfaced with the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolWarning {
    /// Exclusion terms removed every item of the slot's meal type.
    SlotExcluded { slot: Slot },
    /// Too few items inside the recall window, so the whole slot was ranked.
    RecallWindowWidened { slot: Slot, in_window: usize, recall_size: usize },
    /// The diversity quota admitted nothing; the pool is the plain top of the ranking.
    QuotaBypassed { slot: Slot },
}

impl fmt::Display for PoolWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolWarning::SlotExcluded { slot } => {
                write!(f, "{}: every candidate matched an exclusion term", slot)
            }
            PoolWarning::RecallWindowWidened { slot, in_window, recall_size } => write!(
                f,
                "{}: only {} items in the calorie window (recall size {}), ranked all items",
                slot, in_window, recall_size
            ),
            PoolWarning::QuotaBypassed { slot } => {
                write!(f, "{}: diversity quota admitted nothing, used top ranked items", slot)
            }
        }
    }
}

/// Output of [`build_pools`]: one pool per configured slot plus the events
/// raised while building them.
#[derive(Debug, Clone, Default)]
pub struct PoolSet {
    pub pools: BTreeMap<Slot, CandidatePool>,
    pub warnings: Vec<PoolWarning>,
}

impl PoolSet {
    pub fn get(&self, slot: Slot) -> Option<&CandidatePool> {
        self.pools.get(&slot)
    }

    /// Pool size per slot.
    pub fn sizes(&self) -> BTreeMap<Slot, usize> {
        self.pools.iter().map(|(slot, pool)| (*slot, pool.len())).collect()
    }
}

/// Builds one pool per slot of the configured split table. Slots are scored
/// in parallel against the shared catalog.
///
/// # Errors
/// `PlannerError::NoCandidates` with [`NoCandidatesReason::EmptyMealType`]
/// when the catalog has no items at all for a configured slot. A slot
/// emptied by exclusions is not an error: it gets an empty pool and a
/// [`PoolWarning::SlotExcluded`].
pub fn build_pools(
    catalog: &Catalog,
    daily: &DailyTarget,
    profile: &UserProfile,
    config: &PlannerConfig,
) -> Result<PoolSet> {
    let splits = config.meal_splits()?;
    let meal_targets: Vec<(Slot, MealTarget)> = split_daily_target(daily, &splits).into_iter().collect();
    let matcher = ExclusionMatcher::new(profile.exclusion_terms().as_slice())?;

    let built: Vec<(Slot, Result<(CandidatePool, Vec<PoolWarning>)>)> = meal_targets
        .par_iter()
        .map(|(slot, target)| (*slot, build_pool_for_slot(catalog, *slot, target, &matcher, config)))
        .collect();

    let mut set = PoolSet::default();
    for (slot, outcome) in built {
        match outcome {
            Ok((pool, warnings)) => {
                set.pools.insert(slot, pool);
                set.warnings.extend(warnings);
            }
            Err(PlannerError::NoCandidates { reason: NoCandidatesReason::AllExcluded, .. }) => {
                warn!(%slot, "Exclusions removed every candidate");
                set.pools.insert(slot, CandidatePool::empty(slot));
                set.warnings.push(PoolWarning::SlotExcluded { slot });
            }
            Err(e) => return Err(e),
        }
    }
    info!(sizes = ?set.sizes(), "Candidate pools built");
    Ok(set)
}

/// Scores, recalls and diversity-caps the candidates of a single slot.
///
/// # Errors
/// `PlannerError::NoCandidates` when the meal type has no items, or when
/// `matcher` excludes all of them.
pub fn build_pool_for_slot(
    catalog: &Catalog,
    slot: Slot,
    target: &MealTarget,
    matcher: &ExclusionMatcher,
    config: &PlannerConfig,
) -> Result<(CandidatePool, Vec<PoolWarning>)> {
    let in_scope: Vec<Arc<CatalogItem>> = catalog.of_meal_type(slot.meal_type()).cloned().collect();
    if in_scope.is_empty() {
        return Err(PlannerError::NoCandidates { slot, reason: NoCandidatesReason::EmptyMealType });
    }

    let eligible: Vec<Arc<CatalogItem>> = in_scope
        .into_iter()
        .filter(|item| !matcher.matches_item(item))
        .collect();
    if eligible.is_empty() {
        return Err(PlannerError::NoCandidates { slot, reason: NoCandidatesReason::AllExcluded });
    }

    let mut warnings = Vec::new();
    let targets = ScoringTargets::for_meal(target, config);
    let scored = score_candidates(&eligible, &targets, catalog.embedding_dim(), config);

    let window = targets.window();
    let in_window: Vec<ScoredCandidate> = scored
        .iter()
        .filter(|c| window.contains(c.item.calories))
        .cloned()
        .collect();
    let mut recalled = if in_window.len() < config.recall_size {
        debug!(%slot, in_window = in_window.len(), "Recall window too narrow, ranking the full slot");
        warnings.push(PoolWarning::RecallWindowWidened {
            slot,
            in_window: in_window.len(),
            recall_size: config.recall_size,
        });
        scored
    } else {
        in_window
    };

    rank(&mut recalled);
    recalled.truncate(config.recall_size);

    let (candidates, bypassed) = apply_diversity_quota(recalled, config.pool_size, config.max_cluster_fraction);
    if bypassed {
        warnings.push(PoolWarning::QuotaBypassed { slot });
    }
    debug!(%slot, pool = candidates.len(), "Pool ready");
    Ok((CandidatePool::new(slot, candidates), warnings))
}

/// Attaches preference, fit, novelty and composite scores. Output order
/// matches `items`.
pub fn score_candidates(
    items: &[Arc<CatalogItem>],
    targets: &ScoringTargets,
    embedding_dim: usize,
    config: &PlannerConfig,
) -> Vec<ScoredCandidate> {
    let preference = preference_scores(items, embedding_dim);
    let cluster_ids: Vec<i64> = items.iter().map(|item| item.cluster_id).collect();
    let novelty = cluster_novelty(&cluster_ids);

    items
        .iter()
        .zip(preference)
        .zip(novelty)
        .map(|((item, preference_score), novelty_bonus)| {
            let fit = nutrition_fit(item.calories, item.protein_g, targets);
            let model_score = (config.alpha_pref * preference_score
                + config.beta_fit * fit
                + config.gamma_nov * novelty_bonus)
                .clamp(0.0, 1.0);
            ScoredCandidate {
                item: Arc::clone(item),
                preference_score,
                nutrition_fit: fit,
                novelty_bonus,
                model_score,
            }
        })
        .collect()
}

fn compare_ranked(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.model_score
        .total_cmp(&a.model_score)
        .then_with(|| b.nutrition_fit.total_cmp(&a.nutrition_fit))
        .then_with(|| b.novelty_bonus.total_cmp(&a.novelty_bonus))
        .then_with(|| b.preference_score.total_cmp(&a.preference_score))
        .then_with(|| a.item.id.cmp(&b.item.id))
}

/// Best first; ties go to the lower item id.
pub fn rank(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(compare_ranked);
}

/// Largest number of pool entries one cluster may hold.
pub fn cluster_quota(pool_size: usize, max_cluster_fraction: f64) -> usize {
    ((max_cluster_fraction * pool_size as f64).floor() as usize).max(1)
}

/// Walks `ranked` in order admitting items whose cluster is still under
/// quota, up to `pool_size`. The flag is set when nothing was admitted and the
/// plain top `pool_size` was returned instead.
pub fn apply_diversity_quota(
    ranked: Vec<ScoredCandidate>,
    pool_size: usize,
    max_cluster_fraction: f64,
) -> (Vec<ScoredCandidate>, bool) {
    let quota = cluster_quota(pool_size, max_cluster_fraction);
    let mut per_cluster: HashMap<i64, usize> = HashMap::new();
    let mut admitted = Vec::with_capacity(pool_size.min(ranked.len()));

    for candidate in &ranked {
        if admitted.len() >= pool_size {
            break;
        }
        let count = per_cluster.entry(candidate.item.cluster_id).or_insert(0);
        if *count >= quota {
            continue;
        }
        *count += 1;
        admitted.push(candidate.clone());
    }

    if admitted.is_empty() && !ranked.is_empty() {
        let mut fallback = ranked;
        fallback.truncate(pool_size);
        return (fallback, true);
    }
    (admitted, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::item;
    use crate::model::MealType;

    fn daily() -> DailyTarget {
        DailyTarget { calories: 2000.0, protein_g: 150.0, fat_g: 65.0, carb_g: 200.0 }
    }

    fn catalog_with_clusters() -> Catalog {
        let mut items = Vec::new();
        let mut id = 1;
        for meal_type in [MealType::Breakfast, MealType::Lunch, MealType::Dinner, MealType::Snack] {
            for n in 0..30u64 {
                let calories = match meal_type {
                    MealType::Breakfast => 380.0 + n as f64 * 8.0,
                    MealType::Snack => 60.0 + n as f64 * 4.0,
                    _ => 520.0 + n as f64 * 12.0,
                };
                let mut it = item(id, meal_type, calories, 10.0 + n as f64);
                it.cluster_id = (n % 3) as i64;
                items.push(it);
                id += 1;
            }
        }
        Catalog::from_items(items).unwrap()
    }

    fn small_config() -> PlannerConfig {
        PlannerConfig { pool_size: 8, recall_size: 20, ..PlannerConfig::default() }
    }

    #[test]
    fn test_pools_respect_size_and_quota() {
        let catalog = catalog_with_clusters();
        let config = small_config();
        let set = build_pools(&catalog, &daily(), &UserProfile::default(), &config).unwrap();
        assert_eq!(set.pools.len(), 4);
        let quota = cluster_quota(config.pool_size, config.max_cluster_fraction);
        assert_eq!(quota, 2);
        for pool in set.pools.values() {
            assert!(pool.len() <= config.pool_size);
            assert!(pool.cluster_counts().values().all(|count| *count <= quota));
        }
    }

    #[test]
    fn test_scores_within_unit_interval() {
        let catalog = catalog_with_clusters();
        let set = build_pools(&catalog, &daily(), &UserProfile::default(), &small_config()).unwrap();
        for c in set.pools.values().flat_map(|p| p.candidates()) {
            for score in [c.preference_score, c.nutrition_fit, c.novelty_bonus, c.model_score] {
                assert!((0.0..=1.0).contains(&score));
            }
        }
    }

    #[test]
    fn test_build_pools_is_deterministic() {
        let catalog = catalog_with_clusters();
        let profile = UserProfile::default();
        let first = build_pools(&catalog, &daily(), &profile, &small_config()).unwrap();
        let second = build_pools(&catalog, &daily(), &profile, &small_config()).unwrap();
        assert_eq!(first.pools, second.pools);
    }

    #[test]
    fn test_ranking_ties_break_by_id() {
        let a = Arc::new(item(9, MealType::Lunch, 500.0, 30.0));
        let b = Arc::new(item(3, MealType::Lunch, 500.0, 30.0));
        let scored = |item: Arc<CatalogItem>| ScoredCandidate {
            item,
            preference_score: 0.5,
            nutrition_fit: 0.5,
            novelty_bonus: 0.5,
            model_score: 0.5,
        };
        let mut ranked = vec![scored(a), scored(b)];
        rank(&mut ranked);
        assert_eq!(ranked[0].item.id, 3);
    }

    #[test]
    fn test_small_catalog_falls_back_to_full_slot() {
        let mut items = vec![
            item(1, MealType::Lunch, 700.0, 50.0),
            item(2, MealType::Lunch, 5000.0, 10.0),
        ];
        for it in items.iter_mut() {
            it.embedding = vec![1.0, 0.0, 0.0];
        }
        let catalog = Catalog::from_items(items).unwrap();
        let target = MealTarget { calories: 700.0, protein_g: 50.0, carbs_g: 70.0, fat_g: 20.0 };
        let matcher = ExclusionMatcher::new::<&str>(&[]).unwrap();
        let (pool, warnings) =
            build_pool_for_slot(&catalog, Slot::Lunch, &target, &matcher, &PlannerConfig::default()).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.candidates()[0].item.id, 1);
        assert!(matches!(warnings[0], PoolWarning::RecallWindowWidened { in_window: 1, .. }));
    }

    #[test]
    fn test_missing_meal_type_is_terminal() {
        let catalog = Catalog::from_items(vec![item(1, MealType::Lunch, 700.0, 50.0)]).unwrap();
        let result = build_pools(&catalog, &daily(), &UserProfile::default(), &PlannerConfig::default());
        assert!(matches!(
            result,
            Err(PlannerError::NoCandidates { reason: NoCandidatesReason::EmptyMealType, .. })
        ));
    }

    #[test]
    fn test_fully_excluded_slot_yields_warning() {
        let mut items = Vec::new();
        for (id, meal_type) in [(1, MealType::Breakfast), (2, MealType::Lunch), (3, MealType::Dinner), (4, MealType::Snack)] {
            items.push(item(id, meal_type, 400.0, 20.0));
        }
        items[3].ingredients = vec!["roasted peanuts".into()];
        let catalog = Catalog::from_items(items).unwrap();
        let profile = UserProfile {
            allergies: ["Peanut".to_string()].into_iter().collect(),
            ..UserProfile::default()
        };
        let set = build_pools(&catalog, &daily(), &profile, &PlannerConfig::default()).unwrap();
        assert!(set.get(Slot::Snack).unwrap().is_empty());
        assert!(set.warnings.contains(&PoolWarning::SlotExcluded { slot: Slot::Snack }));
        assert_eq!(set.get(Slot::Lunch).unwrap().len(), 1);
    }

    #[test]
    fn test_quota_caps_single_cluster() {
        let ranked: Vec<ScoredCandidate> = (1..=10)
            .map(|id| ScoredCandidate {
                item: Arc::new(item(id, MealType::Dinner, 600.0, 40.0)),
                preference_score: 0.0,
                nutrition_fit: 0.0,
                novelty_bonus: 0.0,
                model_score: 1.0 - id as f64 * 0.05,
            })
            .collect();
        let (pool, bypassed) = apply_diversity_quota(ranked, 8, 0.25);
        assert!(!bypassed);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].item.id, 1);
        assert_eq!(pool[1].item.id, 2);
    }

    #[test]
    fn test_quota_fallback_on_empty_input() {
        let (pool, bypassed) = apply_diversity_quota(Vec::new(), 5, 0.25);
        assert!(pool.is_empty());
        assert!(!bypassed);
    }
}
