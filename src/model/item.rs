use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::model::nutrition::Nutrition;
use crate::sanitize::finite_f64;

/// Meal type tag carried by every catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    #[strum(to_string = "snack", serialize = "snacks")]
    Snack,
    #[strum(to_string = "staple", serialize = "staples")]
    Staple,
}

/// A meal slot of the day. Staples never get a slot of their own; they only
/// back the deficit snack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Slot {
    Breakfast,
    Lunch,
    Dinner,
    #[strum(to_string = "snack", serialize = "snacks")]
    Snack,
}

impl Slot {
    pub const MAIN_MEALS: [Slot; 3] = [Slot::Breakfast, Slot::Lunch, Slot::Dinner];

    pub fn meal_type(self) -> MealType {
        match self {
            Slot::Breakfast => MealType::Breakfast,
            Slot::Lunch => MealType::Lunch,
            Slot::Dinner => MealType::Dinner,
            Slot::Snack => MealType::Snack,
        }
    }

    pub fn is_main_meal(self) -> bool {
        !matches!(self, Slot::Snack)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Where a chosen item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemSource {
    Recipe,
    Staple,
}

/// One normalized catalog row. Loaded once, shared by `Arc` between pools
/// and plans, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogItem {
    pub id: u64,
    pub name: String,
    pub meal_type: MealType,
    #[serde(serialize_with = "finite_f64")]
    pub calories: f64,
    #[serde(serialize_with = "finite_f64")]
    pub protein_g: f64,
    #[serde(serialize_with = "finite_f64")]
    pub carbs_g: f64,
    #[serde(serialize_with = "finite_f64")]
    pub fat_g: f64,
    pub ingredients: Vec<String>,
    pub cluster_id: i64,
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
}

impl CatalogItem {
    pub fn nutrition(&self) -> Nutrition {
        Nutrition {
            calories: self.calories,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fat_g: self.fat_g,
        }
    }

    pub fn source(&self) -> ItemSource {
        match self.meal_type {
            MealType::Staple => ItemSource::Staple,
            _ => ItemSource::Recipe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_slot_parsing_accepts_plural_snack() {
        assert_eq!(Slot::from_str("snacks").unwrap(), Slot::Snack);
        assert_eq!(Slot::from_str("Snack").unwrap(), Slot::Snack);
        assert_eq!(Slot::from_str("LUNCH").unwrap(), Slot::Lunch);
        assert!(Slot::from_str("brunch").is_err());
        assert_eq!(Slot::Snack.to_string(), "snack");
    }

    #[test]
    fn test_meal_type_parsing() {
        assert_eq!(MealType::from_str("staples").unwrap(), MealType::Staple);
        assert_eq!(MealType::from_str("dinner").unwrap(), MealType::Dinner);
        assert_eq!(Slot::Dinner.meal_type(), MealType::Dinner);
    }

    #[test]
    fn test_weekday_order_is_monday_first() {
        use strum::IntoEnumIterator;
        let days: Vec<String> = Weekday::iter().map(|d| d.to_string()).collect();
        assert_eq!(days.first().map(String::as_str), Some("Monday"));
        assert_eq!(days.last().map(String::as_str), Some("Sunday"));
        assert!(Weekday::Monday < Weekday::Sunday);
    }
}
