use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

use crate::sanitize::finite_f64;

/// Daily macro target produced once per run by the nutrition target oracle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyTarget {
    #[serde(serialize_with = "finite_f64")]
    pub calories: f64,
    #[serde(serialize_with = "finite_f64")]
    pub protein_g: f64,
    #[serde(serialize_with = "finite_f64")]
    pub fat_g: f64,
    #[serde(serialize_with = "finite_f64")]
    pub carb_g: f64,
}

impl DailyTarget {
    /// All fields finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        [self.calories, self.protein_g, self.fat_g, self.carb_g]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Per-slot share of the daily target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MealTarget {
    #[serde(serialize_with = "finite_f64")]
    pub calories: f64,
    #[serde(serialize_with = "finite_f64")]
    pub protein_g: f64,
    #[serde(serialize_with = "finite_f64")]
    pub carbs_g: f64,
    #[serde(serialize_with = "finite_f64")]
    pub fat_g: f64,
}

/// Realized nutrition of one or more chosen items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(serialize_with = "finite_f64")]
    pub calories: f64,
    #[serde(serialize_with = "finite_f64")]
    pub protein_g: f64,
    #[serde(serialize_with = "finite_f64")]
    pub carbs_g: f64,
    #[serde(serialize_with = "finite_f64")]
    pub fat_g: f64,
}

impl Add for Nutrition {
    type Output = Nutrition;

    fn add(self, rhs: Nutrition) -> Nutrition {
        Nutrition {
            calories: self.calories + rhs.calories,
            protein_g: self.protein_g + rhs.protein_g,
            carbs_g: self.carbs_g + rhs.carbs_g,
            fat_g: self.fat_g + rhs.fat_g,
        }
    }
}

impl AddAssign for Nutrition {
    fn add_assign(&mut self, rhs: Nutrition) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for Nutrition {
    fn sum<I: Iterator<Item = Nutrition>>(iter: I) -> Nutrition {
        iter.fold(Nutrition::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nutrition_sum() {
        let a = Nutrition { calories: 500.0, protein_g: 30.0, carbs_g: 40.0, fat_g: 10.0 };
        let b = Nutrition { calories: 250.0, protein_g: 5.0, carbs_g: 20.0, fat_g: 12.5 };
        let total: Nutrition = vec![a, b].into_iter().sum();
        assert_eq!(total.calories, 750.0);
        assert_eq!(total.protein_g, 35.0);
        assert_eq!(total.fat_g, 22.5);
    }

    #[test]
    fn test_daily_target_well_formed() {
        let ok = DailyTarget { calories: 2000.0, protein_g: 150.0, fat_g: 65.0, carb_g: 200.0 };
        assert!(ok.is_well_formed());
        let bad = DailyTarget { calories: f64::NAN, ..ok };
        assert!(!bad.is_well_formed());
        let negative = DailyTarget { protein_g: -1.0, ..ok };
        assert!(!negative.is_well_formed());
    }
}
