use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{PlannerError, Result};

/// A request's user profile as received from the caller. Demographic fields
/// are optional here so that missing ones surface as a validation error
/// naming every absent field, not as a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, alias = "Height_in")]
    pub height_in: Option<f64>,
    #[serde(default, alias = "Weight_lb")]
    pub weight_lb: Option<f64>,
    #[serde(default, alias = "Age")]
    pub age: Option<i64>,
    #[serde(default, alias = "Gender")]
    pub gender: Option<i64>,
    #[serde(default, alias = "Activity_Level")]
    pub activity_level: Option<i64>,
    #[serde(default, alias = "Goal")]
    pub goal: Option<i64>,
    #[serde(default)]
    pub allergies: BTreeSet<String>,
    /// Disliked terms, excluded exactly like allergies during pool building.
    #[serde(default)]
    pub preferences: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Female,
    Male,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtraActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Goal {
    Lose,
    Maintain,
    Gain,
}

/// Range-checked demographic view of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Demographics {
    pub height_in: f64,
    pub weight_lb: f64,
    pub age: u32,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
}

impl UserProfile {
    /// Checks presence and ranges of the demographic fields.
    ///
    /// # Errors
    /// `PlannerError::Validation` listing missing fields, or naming the first
    /// field found out of range.
    pub fn demographics(&self) -> Result<Demographics> {
        let mut missing = Vec::new();
        if self.height_in.is_none() {
            missing.push("height_in");
        }
        if self.weight_lb.is_none() {
            missing.push("weight_lb");
        }
        if self.age.is_none() {
            missing.push("age");
        }
        if self.gender.is_none() {
            missing.push("gender");
        }
        if self.activity_level.is_none() {
            missing.push("activity_level");
        }
        if self.goal.is_none() {
            missing.push("goal");
        }
        if !missing.is_empty() {
            return Err(PlannerError::validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let height_in = self.height_in.unwrap_or_default();
        let weight_lb = self.weight_lb.unwrap_or_default();
        let age = self.age.unwrap_or_default();

        if !(1.0..=120.0).contains(&height_in) {
            return Err(PlannerError::validation("Height must be between 1 and 120 inches"));
        }
        if !(50.0..=1000.0).contains(&weight_lb) {
            return Err(PlannerError::validation("Weight must be between 50 and 1000 pounds"));
        }
        if !(10..=120).contains(&age) {
            return Err(PlannerError::validation("Age must be between 10 and 120 years"));
        }
        let gender = match self.gender {
            Some(0) => Gender::Female,
            Some(1) => Gender::Male,
            _ => return Err(PlannerError::validation("Gender must be 0 (female) or 1 (male)")),
        };
        let activity_level = match self.activity_level {
            Some(0) => ActivityLevel::Sedentary,
            Some(1) => ActivityLevel::LightlyActive,
            Some(2) => ActivityLevel::ModeratelyActive,
            Some(3) => ActivityLevel::VeryActive,
            Some(4) => ActivityLevel::ExtraActive,
            _ => return Err(PlannerError::validation("Activity level must be 0-4")),
        };
        let goal = match self.goal {
            Some(-1) => Goal::Lose,
            Some(0) => Goal::Maintain,
            Some(1) => Goal::Gain,
            _ => {
                return Err(PlannerError::validation(
                    "Goal must be -1 (lose), 0 (maintain), or 1 (gain)",
                ))
            }
        };

        Ok(Demographics {
            height_in,
            weight_lb,
            age: age as u32,
            gender,
            activity_level,
            goal,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.demographics().map(|_| ())
    }

    /// Allergies, lowercased and trimmed, empty entries dropped.
    pub fn allergy_terms(&self) -> Vec<String> {
        normalized_terms(self.allergies.iter())
    }

    /// Allergies together with disliked terms.
    pub fn exclusion_terms(&self) -> Vec<String> {
        normalized_terms(self.allergies.iter().chain(self.preferences.iter()))
    }
}

fn normalized_terms<'a>(terms: impl Iterator<Item = &'a String>) -> Vec<String> {
    let set: BTreeSet<String> = terms
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    set.into_iter().collect()
}
