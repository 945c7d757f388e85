use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use crate::error::{PlannerError, Result};
use crate::targets::{MealSplits, DEFAULT_SPLITS};

pub const CONFIG_PATH_ENV_VAR: &str = "PLANNER_CONFIG";
pub const ENV_PREFIX: &str = "PLANNER";

/// Tunables for one planning run. Passed explicitly into pool building and
/// week planning; nothing here is process-global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Candidates kept per slot after the diversity quota.
    pub pool_size: usize,
    /// Candidates kept after ranking, before the diversity quota.
    pub recall_size: usize,
    /// Cap on the share of a pool a single cluster may take.
    pub max_cluster_fraction: f64,
    /// How far the recall window extends beyond the ideal band.
    pub recall_window_pct: f64,
    /// Full width of the ideal calorie band (0.20 = target ± 10 %).
    pub kcal_band_width: f64,
    /// Protein error still scored as a perfect fit, as a share of target.
    pub protein_tolerance: f64,
    pub alpha_pref: f64,
    pub beta_fit: f64,
    pub gamma_nov: f64,
    /// Weekly uses after which an ingredient counts as overused.
    pub ingredient_limit: u32,
    /// Main meals must sit within this share of the slot's calorie target.
    pub meal_calorie_tolerance: f64,
    /// Closest-by-calories candidates used when nothing is within tolerance.
    pub fallback_nearest: usize,
    /// Ranked options a main meal is picked from.
    pub top_choices: usize,
    /// Minimum calorie gap (kcal) that triggers a deficit snack.
    pub snack_deficit_threshold: f64,
    pub snack_calorie_tolerance: f64,
    pub splits: BTreeMap<String, f64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            pool_size: 40,
            recall_size: 200,
            max_cluster_fraction: 0.25,
            recall_window_pct: 0.40,
            kcal_band_width: 0.20,
            protein_tolerance: 0.20,
            alpha_pref: 0.55,
            beta_fit: 0.35,
            gamma_nov: 0.10,
            ingredient_limit: 4,
            meal_calorie_tolerance: 0.10,
            fallback_nearest: 50,
            top_choices: 5,
            snack_deficit_threshold: 50.0,
            snack_calorie_tolerance: 0.15,
            splits: DEFAULT_SPLITS
                .iter()
                .map(|(slot, fraction)| (slot.to_string(), *fraction))
                .collect(),
        }
    }
}

/// Partial update applied between runs by [`crate::service::MealPlanService::reconfigure`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigPatch {
    pub pool_size: Option<usize>,
    pub recall_size: Option<usize>,
    pub ingredient_limit: Option<u32>,
    pub alpha_pref: Option<f64>,
    pub beta_fit: Option<f64>,
    pub gamma_nov: Option<f64>,
    pub max_cluster_fraction: Option<f64>,
    pub splits: Option<BTreeMap<String, f64>>,
}

impl PlannerConfig {
    /// Load configuration from file and environment variables
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (PLANNER__POOL_SIZE, PLANNER__SPLITS__LUNCH, ...)
    /// 2. Config file given by `config_path` or `PLANNER_CONFIG`
    /// 3. Built-in defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let file_path = config_path
            .map(|p| p.to_string_lossy().into_owned())
            .or_else(|| env::var(CONFIG_PATH_ENV_VAR).ok());

        let mut builder = ConfigBuilder::builder();
        if let Some(path) = file_path {
            if !Path::new(&path).exists() {
                return Err(PlannerError::config(format!("Config file not found: {}", path)));
            }
            builder = builder.add_source(File::with_name(&path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let loaded: PlannerConfig = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Rejects configurations that would make scoring or selection undefined.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(PlannerError::config("pool_size must be at least 1"));
        }
        if self.recall_size == 0 {
            return Err(PlannerError::config("recall_size must be at least 1"));
        }
        if !(self.max_cluster_fraction > 0.0 && self.max_cluster_fraction <= 1.0) {
            return Err(PlannerError::config("max_cluster_fraction must be in (0, 1]"));
        }
        for (name, weight) in [
            ("alpha_pref", self.alpha_pref),
            ("beta_fit", self.beta_fit),
            ("gamma_nov", self.gamma_nov),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PlannerError::config(format!(
                    "{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        if self.alpha_pref + self.beta_fit + self.gamma_nov <= 0.0 {
            return Err(PlannerError::config("At least one scoring weight must be positive"));
        }
        for (name, value) in [
            ("recall_window_pct", self.recall_window_pct),
            ("kcal_band_width", self.kcal_band_width),
            ("protein_tolerance", self.protein_tolerance),
            ("meal_calorie_tolerance", self.meal_calorie_tolerance),
            ("snack_deficit_threshold", self.snack_deficit_threshold),
            ("snack_calorie_tolerance", self.snack_calorie_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PlannerError::config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.ingredient_limit == 0 {
            return Err(PlannerError::config("ingredient_limit must be at least 1"));
        }
        if self.fallback_nearest == 0 || self.top_choices == 0 {
            return Err(PlannerError::config("fallback_nearest and top_choices must be at least 1"));
        }
        MealSplits::from_named(&self.splits)?;
        Ok(())
    }

    pub fn meal_splits(&self) -> Result<MealSplits> {
        MealSplits::from_named(&self.splits)
    }

    /// Merges `patch` into a copy of `self` and validates the result.
    pub fn patched(&self, patch: &ConfigPatch) -> Result<Self> {
        let mut next = self.clone();
        if let Some(v) = patch.pool_size {
            next.pool_size = v;
        }
        if let Some(v) = patch.recall_size {
            next.recall_size = v;
        }
        if let Some(v) = patch.ingredient_limit {
            next.ingredient_limit = v;
        }
        if let Some(v) = patch.alpha_pref {
            next.alpha_pref = v;
        }
        if let Some(v) = patch.beta_fit {
            next.beta_fit = v;
        }
        if let Some(v) = patch.gamma_nov {
            next.gamma_nov = v;
        }
        if let Some(v) = patch.max_cluster_fraction {
            next.max_cluster_fraction = v;
        }
        if let Some(v) = &patch.splits {
            next.splits = v.clone();
        }
        next.validate()?;
        Ok(next)
    }
}
