use async_trait::async_trait;

use crate::error::Result;
use crate::model::{ActivityLevel, DailyTarget, Demographics, Gender, Goal, UserProfile};
use crate::oracle::{checked_target, NutritionTargetOracle};

const KG_PER_LB: f64 = 0.453_592_37;
const CM_PER_IN: f64 = 2.54;
const MIN_CALORIES: f64 = 1200.0;
const PROTEIN_G_PER_KG: f64 = 1.6;
const FAT_CALORIE_SHARE: f64 = 0.25;
const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARB: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

/// Offline target estimate: Mifflin-St Jeor BMR scaled by activity, shifted
/// by goal, split into macros by fixed ratios.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaOracle;

impl FormulaOracle {
    pub fn new() -> Self {
        Self
    }

    /// BMR = 10·kg + 6.25·cm − 5·age + (5 for men, −161 for women)
    pub fn bmr(demo: &Demographics) -> f64 {
        let weight_kg = demo.weight_lb * KG_PER_LB;
        let height_cm = demo.height_in * CM_PER_IN;
        let offset = match demo.gender {
            Gender::Male => 5.0,
            Gender::Female => -161.0,
        };
        10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(demo.age) + offset
    }

    pub fn activity_factor(level: ActivityLevel) -> f64 {
        match level {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::LightlyActive => 1.375,
            ActivityLevel::ModeratelyActive => 1.55,
            ActivityLevel::VeryActive => 1.725,
            ActivityLevel::ExtraActive => 1.9,
        }
    }

    fn goal_adjustment(goal: Goal) -> f64 {
        match goal {
            Goal::Lose => -500.0,
            Goal::Maintain => 0.0,
            Goal::Gain => 300.0,
        }
    }

    pub fn estimate(demo: &Demographics) -> DailyTarget {
        let tdee = Self::bmr(demo) * Self::activity_factor(demo.activity_level);
        let calories = (tdee + Self::goal_adjustment(demo.goal)).max(MIN_CALORIES);
        let protein_g = demo.weight_lb * KG_PER_LB * PROTEIN_G_PER_KG;
        let fat_g = calories * FAT_CALORIE_SHARE / KCAL_PER_G_FAT;
        let carb_g = ((calories - protein_g * KCAL_PER_G_PROTEIN - fat_g * KCAL_PER_G_FAT) / KCAL_PER_G_CARB).max(0.0);
        DailyTarget {
            calories,
            protein_g,
            fat_g,
            carb_g,
        }
    }
}

#[async_trait]
impl NutritionTargetOracle for FormulaOracle {
    async fn daily_target(&self, profile: &UserProfile) -> Result<DailyTarget> {
        let demo = profile.demographics()?;
        checked_target(Self::estimate(&demo), self.name())
    }

    fn name(&self) -> &'static str {
        "formula"
    }
}
