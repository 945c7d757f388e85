use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::info;

use crate::candidates::{build_pools, PoolSet, PoolWarning};
use crate::catalog::Catalog;
use crate::config::{ConfigPatch, PlannerConfig};
use crate::error::{PlannerError, Result};
use crate::model::{DailyTarget, UserProfile};
use crate::oracle::NutritionTargetOracle;
use crate::planner::{plan_week, PlanWarning, WeekPlan};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MostUsedIngredient {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientStats {
    pub total_unique_ingredients: usize,
    pub most_used_ingredient: Option<MostUsedIngredient>,
    pub ingredients_at_limit: usize,
}

impl IngredientStats {
    /// Ties on the highest count go to the alphabetically first ingredient.
    pub fn from_counts(counts: &BTreeMap<String, u32>, limit: u32) -> Self {
        let most_used_ingredient = counts
            .iter()
            .fold(None::<(&String, u32)>, |best, (name, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((name, *count)),
            })
            .map(|(name, count)| MostUsedIngredient { name: name.clone(), count });
        Self {
            total_unique_ingredients: counts.len(),
            most_used_ingredient,
            ingredients_at_limit: counts.values().filter(|c| **c >= limit).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerationWarning {
    Pool(PoolWarning),
    Plan(PlanWarning),
}

/// Everything one `generate` call hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub success: bool,
    pub nutrition_targets: DailyTarget,
    pub week_plan: WeekPlan,
    pub ingredient_counts: BTreeMap<String, u32>,
    pub candidate_stats: BTreeMap<String, usize>,
    pub ingredient_stats: IngredientStats,
    pub warnings: Vec<GenerationWarning>,
}

/// `{slot}_count` per pool.
pub fn candidate_stats(pools: &PoolSet) -> BTreeMap<String, usize> {
    pools
        .sizes()
        .into_iter()
        .map(|(slot, size)| (format!("{}_count", slot), size))
        .collect()
}

/// Request/response facade over the planner: validate, fetch targets, build
/// pools, plan the week.
///
/// The configuration can be swapped between runs with
/// [`MealPlanService::reconfigure`]; each run works on the snapshot taken
/// when it started.
pub struct MealPlanService {
    config: RwLock<Arc<PlannerConfig>>,
    oracle: Box<dyn NutritionTargetOracle>,
}

impl MealPlanService {
    pub fn new(config: PlannerConfig, oracle: Box<dyn NutritionTargetOracle>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: RwLock::new(Arc::new(config)),
            oracle,
        })
    }

    pub fn config(&self) -> Result<Arc<PlannerConfig>> {
        self.config
            .read()
            .map(|guard| Arc::clone(&*guard))
            .map_err(|_| PlannerError::config("Configuration lock poisoned"))
    }

    /// Applies `patch` if the merged configuration validates; otherwise the
    /// current configuration stays in place.
    pub fn reconfigure(&self, patch: &ConfigPatch) -> Result<Arc<PlannerConfig>> {
        let mut guard = self
            .config
            .write()
            .map_err(|_| PlannerError::config("Configuration lock poisoned"))?;
        let next = Arc::new(guard.patched(patch)?);
        *guard = Arc::clone(&next);
        info!(
            pool_size = next.pool_size,
            recall_size = next.recall_size,
            ingredient_limit = next.ingredient_limit,
            "Planner reconfigured"
        );
        Ok(next)
    }

    /// Full run for one profile.
    ///
    /// # Errors
    /// `Validation` before any work if the profile is malformed, `Oracle` if
    /// no target could be obtained, `NoCandidates` if a configured slot has
    /// no catalog items at all.
    pub async fn generate(&self, catalog: &Catalog, profile: &UserProfile) -> Result<GenerationResult> {
        profile.validate()?;
        let config = self.config()?;
        let daily = self.oracle.daily_target(profile).await?;
        info!(
            oracle = self.oracle.name(),
            calories = daily.calories,
            protein_g = daily.protein_g,
            "Daily target ready"
        );
        generate_with_target(catalog, profile, &daily, &config)
    }
}

/// Planning part of a run once the daily target is known.
pub fn generate_with_target(
    catalog: &Catalog,
    profile: &UserProfile,
    daily: &DailyTarget,
    config: &PlannerConfig,
) -> Result<GenerationResult> {
    if !daily.is_well_formed() {
        return Err(PlannerError::validation("Daily target must be finite and non-negative"));
    }
    let pools = build_pools(catalog, daily, profile, config)?;
    let outcome = plan_week(profile, daily, &pools, &catalog.staples(), config)?;

    let warnings: Vec<GenerationWarning> = pools
        .warnings
        .iter()
        .cloned()
        .map(GenerationWarning::Pool)
        .chain(outcome.warnings.into_iter().map(GenerationWarning::Plan))
        .collect();
    info!(warnings = warnings.len(), "Week planned");

    Ok(GenerationResult {
        success: true,
        nutrition_targets: *daily,
        candidate_stats: candidate_stats(&pools),
        ingredient_stats: IngredientStats::from_counts(&outcome.ingredient_counts, config.ingredient_limit),
        ingredient_counts: outcome.ingredient_counts,
        week_plan: outcome.week_plan,
        warnings,
    })
}
