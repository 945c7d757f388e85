use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::catalog::normalize_ingredient;
use crate::model::CatalogItem;

/// Cross-day state of one planning run: how often each ingredient has been
/// served and which items were already chosen for a main meal.
///
/// Created fresh per run and threaded through every day; days read it as an
/// immutable snapshot and only [`PlanningSession::record_day`] mutates it.
#[derive(Debug, Clone, Default)]
pub struct PlanningSession {
    ingredient_counts: BTreeMap<String, u32>,
    used_item_ids: HashSet<u64>,
}

impl PlanningSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingredients whose weekly count reached `limit`.
    pub fn overused(&self, limit: u32) -> BTreeSet<String> {
        self.ingredient_counts
            .iter()
            .filter(|(_, count)| **count >= limit)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn is_used(&self, item_id: u64) -> bool {
        self.used_item_ids.contains(&item_id)
    }

    pub fn mark_used(&mut self, item_id: u64) {
        self.used_item_ids.insert(item_id);
    }

    /// Counts each distinct ingredient once for the day, however many of the
    /// day's items contain it.
    pub fn record_day<'a, I>(&mut self, chosen: I)
    where
        I: IntoIterator<Item = &'a CatalogItem>,
    {
        let day_ingredients: BTreeSet<String> = chosen
            .into_iter()
            .flat_map(|item| item.ingredients.iter())
            .map(|i| normalize_ingredient(i))
            .filter(|i| !i.is_empty())
            .collect();
        for ingredient in day_ingredients {
            *self.ingredient_counts.entry(ingredient).or_insert(0) += 1;
        }
    }

    pub fn ingredient_counts(&self) -> &BTreeMap<String, u32> {
        &self.ingredient_counts
    }

    pub fn used_count(&self) -> usize {
        self.used_item_ids.len()
    }

    pub fn into_ingredient_counts(self) -> BTreeMap<String, u32> {
        self.ingredient_counts
    }
}
