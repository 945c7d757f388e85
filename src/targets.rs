use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{PlannerError, Result};
use crate::model::{DailyTarget, MealTarget, Slot};

/// Default share of the daily target given to each slot.
pub const DEFAULT_SPLITS: [(Slot, f64); 4] = [
    (Slot::Breakfast, 0.25),
    (Slot::Lunch, 0.35),
    (Slot::Dinner, 0.35),
    (Slot::Snack, 0.05),
];

/// Validated slot → fraction table. Only slots present here get a pool and a
/// target.
#[derive(Debug, Clone, PartialEq)]
pub struct MealSplits {
    fractions: BTreeMap<Slot, f64>,
}

impl Default for MealSplits {
    fn default() -> Self {
        Self {
            fractions: DEFAULT_SPLITS.into_iter().collect(),
        }
    }
}

impl MealSplits {
    /// Builds the table from slot names as they appear in configuration.
    ///
    /// # Errors
    /// `PlannerError::Config` for an unknown slot name or a negative /
    /// non-finite fraction.
    pub fn from_named<'a, I>(fractions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a f64)>,
    {
        let mut table = BTreeMap::new();
        for (name, fraction) in fractions {
            let slot = Slot::from_str(name.trim())
                .map_err(|_| PlannerError::config(format!("Unknown meal slot '{}' in splits", name)))?;
            if !fraction.is_finite() || *fraction < 0.0 {
                return Err(PlannerError::config(format!(
                    "Split fraction for '{}' must be a non-negative number, got {}",
                    name, fraction
                )));
            }
            table.insert(slot, *fraction);
        }
        if table.is_empty() {
            return Err(PlannerError::config("Split table must name at least one slot"));
        }
        Ok(Self { fractions: table })
    }

    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.fractions.keys().copied()
    }

    pub fn fraction(&self, slot: Slot) -> Option<f64> {
        self.fractions.get(&slot).copied()
    }

    pub fn total(&self) -> f64 {
        self.fractions.values().sum()
    }
}

/// Allocates the daily target across slots by multiplying every macro field
/// by the slot's fraction.
pub fn split_daily_target(daily: &DailyTarget, splits: &MealSplits) -> BTreeMap<Slot, MealTarget> {
    splits
        .fractions
        .iter()
        .map(|(slot, fraction)| {
            (
                *slot,
                MealTarget {
                    calories: daily.calories * fraction,
                    protein_g: daily.protein_g * fraction,
                    carbs_g: daily.carb_g * fraction,
                    fat_g: daily.fat_g * fraction,
                },
            )
        })
        .collect()
}

/// Name-keyed convenience over [`MealSplits::from_named`] + [`split_daily_target`].
pub fn split(daily: &DailyTarget, fractions: &BTreeMap<String, f64>) -> Result<BTreeMap<Slot, MealTarget>> {
    let splits = MealSplits::from_named(fractions)?;
    Ok(split_daily_target(daily, &splits))
}
