use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::candidates::PoolSet;
use crate::catalog::normalize_ingredient;
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::model::{
    CatalogItem, DailyTarget, ItemSource, MealTarget, Nutrition, Slot, UserProfile, Weekday,
};
use crate::planner::exclusion::ExclusionMatcher;
use crate::planner::selector::{filter_staples, select_main_meal, select_snack, MainMealPick};
use crate::planner::session::PlanningSession;
use crate::sanitize::finite_f64;
use crate::targets::split_daily_target;

/// The item chosen for one slot of one day, or `None` when the slot could
/// not be filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealSelection {
    pub item: Option<Arc<CatalogItem>>,
    pub targets: MealTarget,
    pub source: Option<ItemSource>,
    pub nutrition: Nutrition,
}

impl MealSelection {
    fn filled(item: Arc<CatalogItem>, targets: MealTarget) -> Self {
        Self {
            source: Some(item.source()),
            nutrition: item.nutrition(),
            item: Some(item),
            targets,
        }
    }

    fn unfilled(targets: MealTarget) -> Self {
        Self {
            item: None,
            targets,
            source: None,
            nutrition: Nutrition::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayPlan {
    pub nutrition_targets: DailyTarget,
    pub meals: BTreeMap<Slot, MealSelection>,
    pub total_nutrition: Nutrition,
    /// Calories the main meals fell short of the daily target by.
    #[serde(serialize_with = "finite_f64")]
    pub calorie_deficit: f64,
}

impl DayPlan {
    pub fn chosen_items(&self) -> impl Iterator<Item = &Arc<CatalogItem>> + '_ {
        self.meals.values().filter_map(|m| m.item.as_ref())
    }
}

pub type WeekPlan = BTreeMap<Weekday, DayPlan>;

/// Non-fatal planning events, recorded instead of aborting the week.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    /// Every candidate used an overused ingredient; the limit was ignored
    /// for this slot and day. Allergen exclusions still applied.
    OveruseRelaxed { day: Weekday, slot: Slot, overused: Vec<String> },
    /// No candidate at all, even after relaxation.
    SlotUnfilled { day: Weekday, slot: Slot },
    /// Every eligible main meal had been served earlier in the week.
    ItemReused { day: Weekday, slot: Slot, item_id: u64 },
    /// The main meals left a gap but no snack could be found.
    SnackUnavailable {
        day: Weekday,
        #[serde(serialize_with = "finite_f64")]
        deficit: f64,
    },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::OveruseRelaxed { day, slot, overused } => write!(
                f,
                "{} {}: ingredient limit relaxed ({})",
                day,
                slot,
                overused.join(", ")
            ),
            PlanWarning::SlotUnfilled { day, slot } => write!(f, "{} {}: no candidate available", day, slot),
            PlanWarning::ItemReused { day, slot, item_id } => {
                write!(f, "{} {}: item {} repeated, no unused alternative", day, slot, item_id)
            }
            PlanWarning::SnackUnavailable { day, deficit } => {
                write!(f, "{}: no snack found for a {:.0} kcal gap", day, deficit)
            }
        }
    }
}

/// A finished week together with the usage counts it produced.
#[derive(Debug, Clone, Default)]
pub struct WeekOutcome {
    pub week_plan: WeekPlan,
    pub ingredient_counts: BTreeMap<String, u32>,
    pub warnings: Vec<PlanWarning>,
}

/// Per-day candidate lists after the allergen and overuse filters.
struct DayCandidates {
    items: Vec<Arc<CatalogItem>>,
    relaxed: bool,
}

fn uses_any(item: &CatalogItem, overused: &BTreeSet<String>) -> bool {
    !overused.is_empty()
        && item
            .ingredients
            .iter()
            .any(|i| overused.contains(&normalize_ingredient(i)))
}

/// Applies exclusions and the overuse filter. When the overuse filter alone
/// empties the list it is dropped for this list.
fn day_candidates<'a>(
    items: impl Iterator<Item = &'a Arc<CatalogItem>>,
    matcher: &ExclusionMatcher,
    overused: &BTreeSet<String>,
) -> DayCandidates {
    let allowed: Vec<Arc<CatalogItem>> = items
        .filter(|item| !matcher.matches_item(item))
        .cloned()
        .collect();
    let strict: Vec<Arc<CatalogItem>> = allowed
        .iter()
        .filter(|item| !uses_any(item, overused))
        .cloned()
        .collect();
    if strict.is_empty() && !allowed.is_empty() {
        DayCandidates { items: allowed, relaxed: true }
    } else {
        DayCandidates { items: strict, relaxed: false }
    }
}

/// Plans Monday through Sunday starting from an empty session.
pub fn plan_week(
    profile: &UserProfile,
    daily: &DailyTarget,
    pools: &PoolSet,
    staples: &[Arc<CatalogItem>],
    config: &PlannerConfig,
) -> Result<WeekOutcome> {
    plan_week_with_session(profile, daily, pools, staples, config, PlanningSession::new())
}

/// Plans the week on top of an existing session, e.g. one seeded with the
/// previous week's ingredient counts.
///
/// Days run strictly in order since each one reads the usage left by the
/// previous. Within a day the main meals are chosen in parallel against the
/// same session snapshot, then merged before the deficit check.
pub fn plan_week_with_session(
    profile: &UserProfile,
    daily: &DailyTarget,
    pools: &PoolSet,
    staples: &[Arc<CatalogItem>],
    config: &PlannerConfig,
    mut session: PlanningSession,
) -> Result<WeekOutcome> {
    let meal_targets = split_daily_target(daily, &config.meal_splits()?);
    let matcher = ExclusionMatcher::new(profile.exclusion_terms().as_slice())?;
    let snack_staples = filter_staples(staples);
    let snack_share = meal_targets.get(&Slot::Snack).copied().unwrap_or_default();
    let main_slots: Vec<(Slot, MealTarget)> = meal_targets
        .iter()
        .filter(|(slot, _)| slot.is_main_meal())
        .map(|(slot, target)| (*slot, *target))
        .collect();

    let mut outcome = WeekOutcome::default();

    for day in Weekday::iter() {
        let overused = session.overused(config.ingredient_limit);
        let overused_list: Vec<String> = overused.iter().cloned().collect();
        if !overused.is_empty() {
            debug!(%day, overused = ?overused_list, "Filtering overused ingredients");
        }

        let picks: Vec<(Slot, MealTarget, DayCandidates, Option<MainMealPick>)> = main_slots
            .par_iter()
            .map(|(slot, target)| {
                let pool_items = pools.get(*slot).into_iter().flat_map(|pool| pool.items());
                let candidates = day_candidates(pool_items, &matcher, &overused);
                let pick = select_main_meal(&candidates.items, target, &session, config);
                (*slot, *target, candidates, pick)
            })
            .collect();

        let mut meals = BTreeMap::new();
        for (slot, target, candidates, pick) in picks {
            if candidates.relaxed {
                warn!(%day, %slot, "Ingredient limit relaxed, every candidate was overused");
                outcome.warnings.push(PlanWarning::OveruseRelaxed {
                    day,
                    slot,
                    overused: overused_list.clone(),
                });
            }
            match pick {
                Some(pick) => {
                    if pick.reused {
                        outcome.warnings.push(PlanWarning::ItemReused { day, slot, item_id: pick.item.id });
                    }
                    session.mark_used(pick.item.id);
                    meals.insert(slot, MealSelection::filled(pick.item, target));
                }
                None => {
                    warn!(%day, %slot, "Slot left unfilled");
                    outcome.warnings.push(PlanWarning::SlotUnfilled { day, slot });
                    meals.insert(slot, MealSelection::unfilled(target));
                }
            }
        }

        let main_totals: Nutrition = meals.values().map(|m| m.nutrition).sum();
        let calorie_deficit = daily.calories - main_totals.calories;

        if calorie_deficit > config.snack_deficit_threshold {
            let snack_target = MealTarget {
                calories: calorie_deficit,
                protein_g: snack_share.protein_g.max(daily.protein_g - main_totals.protein_g),
                carbs_g: snack_share.carbs_g,
                fat_g: snack_share.fat_g,
            };
            let snack_pool = pools.get(Slot::Snack).into_iter().flat_map(|pool| pool.items());
            let snack_recipes = day_candidates(snack_pool, &matcher, &overused);
            let staple_candidates = day_candidates(snack_staples.iter(), &matcher, &overused);
            if snack_recipes.relaxed || staple_candidates.relaxed {
                outcome.warnings.push(PlanWarning::OveruseRelaxed {
                    day,
                    slot: Slot::Snack,
                    overused: overused_list.clone(),
                });
            }

            match select_snack(&snack_recipes.items, &staple_candidates.items, &snack_target, config) {
                Some(snack) => {
                    debug!(%day, item = snack.item.id, source = %snack.source, deficit = calorie_deficit, "Deficit snack added");
                    meals.insert(Slot::Snack, MealSelection::filled(snack.item, snack_target));
                }
                None => {
                    warn!(%day, deficit = calorie_deficit, "No snack available for calorie gap");
                    outcome.warnings.push(PlanWarning::SnackUnavailable { day, deficit: calorie_deficit });
                    meals.insert(Slot::Snack, MealSelection::unfilled(snack_target));
                }
            }
        }

        let total_nutrition: Nutrition = meals.values().map(|m| m.nutrition).sum();
        let plan = DayPlan {
            nutrition_targets: *daily,
            meals,
            total_nutrition,
            calorie_deficit,
        };
        session.record_day(plan.chosen_items().map(|item| item.as_ref()));
        info!(
            %day,
            calories = plan.total_nutrition.calories,
            protein_g = plan.total_nutrition.protein_g,
            "Day planned"
        );
        outcome.week_plan.insert(day, plan);
    }

    info!(
        distinct_main_meals = session.used_count(),
        warnings = outcome.warnings.len(),
        "Week planned"
    );
    outcome.ingredient_counts = session.into_ingredient_counts();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::build_pools;
    use crate::catalog::test_support::item;
    use crate::catalog::Catalog;
    use crate::model::MealType;

    fn daily() -> DailyTarget {
        DailyTarget { calories: 2000.0, protein_g: 150.0, fat_g: 65.0, carb_g: 200.0 }
    }

    fn catalog(items: Vec<CatalogItem>) -> Catalog {
        Catalog::from_items(items).unwrap()
    }

    fn varied_catalog() -> Catalog {
        let mut items = Vec::new();
        let mut id = 1;
        for (meal_type, base) in [
            (MealType::Breakfast, 500.0),
            (MealType::Lunch, 700.0),
            (MealType::Dinner, 700.0),
            (MealType::Snack, 150.0),
        ] {
            for n in 0..10u64 {
                let mut it = item(id, meal_type, base - 20.0 + n as f64 * 4.0, 20.0 + n as f64);
                it.ingredients = vec![format!("{} base", meal_type), format!("extra {}", n)];
                it.cluster_id = (n % 4) as i64;
                items.push(it);
                id += 1;
            }
        }
        catalog(items)
    }

    #[test]
    fn test_week_covers_every_day_and_main_slot() {
        let catalog = varied_catalog();
        let profile = UserProfile::default();
        let config = PlannerConfig::default();
        let pools = build_pools(&catalog, &daily(), &profile, &config).unwrap();
        let outcome = plan_week(&profile, &daily(), &pools, &catalog.staples(), &config).unwrap();

        assert_eq!(outcome.week_plan.len(), 7);
        assert_eq!(outcome.week_plan.keys().next(), Some(&Weekday::Monday));
        for day in outcome.week_plan.values() {
            for slot in Slot::MAIN_MEALS {
                assert!(day.meals[&slot].item.is_some());
            }
        }
    }

    #[test]
    fn test_main_meals_are_not_repeated_while_alternatives_exist() {
        let catalog = varied_catalog();
        let profile = UserProfile::default();
        let config = PlannerConfig { ingredient_limit: 100, ..PlannerConfig::default() };
        let pools = build_pools(&catalog, &daily(), &profile, &config).unwrap();
        let outcome = plan_week(&profile, &daily(), &pools, &catalog.staples(), &config).unwrap();

        for slot in Slot::MAIN_MEALS {
            let ids: BTreeSet<u64> = outcome
                .week_plan
                .values()
                .filter_map(|d| d.meals[&slot].item.as_ref().map(|i| i.id))
                .collect();
            assert_eq!(ids.len(), 7, "{} repeated an item", slot);
        }
        assert!(!outcome.warnings.iter().any(|w| matches!(w, PlanWarning::ItemReused { .. })));
    }

    #[test]
    fn test_overused_ingredient_is_relaxed_and_flagged() {
        // every lunch shares "rice", so the limit must be relaxed from day 3 on
        let mut items = Vec::new();
        for (id, meal_type) in [(1, MealType::Breakfast), (2, MealType::Dinner), (3, MealType::Snack)] {
            items.push(item(id, meal_type, 500.0, 30.0));
        }
        for id in 10..20 {
            let mut lunch = item(id, MealType::Lunch, 700.0, 40.0);
            lunch.ingredients = vec!["rice".into(), format!("topping {}", id)];
            items.push(lunch);
        }
        let catalog = catalog(items);
        let profile = UserProfile::default();
        let config = PlannerConfig { ingredient_limit: 2, ..PlannerConfig::default() };
        let pools = build_pools(&catalog, &daily(), &profile, &config).unwrap();
        let outcome = plan_week(&profile, &daily(), &pools, &catalog.staples(), &config).unwrap();

        let relaxed_days: Vec<Weekday> = outcome
            .warnings
            .iter()
            .filter_map(|w| match w {
                PlanWarning::OveruseRelaxed { day, slot: Slot::Lunch, .. } => Some(*day),
                _ => None,
            })
            .collect();
        assert_eq!(relaxed_days.first(), Some(&Weekday::Wednesday));
        assert_eq!(relaxed_days.len(), 5);
        assert_eq!(outcome.ingredient_counts["rice"], 7);
    }

    #[test]
    fn test_ingredient_limit_holds_for_mixed_case_terms() {
        let mut items = Vec::new();
        for (id, meal_type) in [(1, MealType::Breakfast), (2, MealType::Dinner), (3, MealType::Snack)] {
            items.push(item(id, meal_type, 500.0, 30.0));
        }
        for id in 10..20 {
            let mut lunch = item(id, MealType::Lunch, 700.0, 60.0);
            lunch.ingredients = vec!["Rice ".into(), format!("Topping {}", id)];
            lunch.cluster_id = 1;
            items.push(lunch);
        }
        for id in 30..40 {
            let mut lunch = item(id, MealType::Lunch, 700.0, 20.0);
            lunch.ingredients = vec![format!("Grain {}", id)];
            lunch.cluster_id = 2;
            items.push(lunch);
        }
        let catalog = catalog(items);
        let profile = UserProfile::default();
        let config = PlannerConfig { ingredient_limit: 2, ..PlannerConfig::default() };
        let pools = build_pools(&catalog, &daily(), &profile, &config).unwrap();
        let outcome = plan_week(&profile, &daily(), &pools, &catalog.staples(), &config).unwrap();

        let rice_days = outcome
            .week_plan
            .values()
            .filter_map(|d| d.meals[&Slot::Lunch].item.as_ref())
            .filter(|lunch| lunch.ingredients.iter().any(|i| i == "rice"))
            .count();
        assert!(rice_days <= 2, "rice served on {} days", rice_days);
        assert!(outcome.ingredient_counts.get("rice").copied().unwrap_or(0) <= 2);
        assert!(!outcome.ingredient_counts.contains_key("Rice "));
        assert!(!outcome
            .warnings
            .iter()
            .any(|w| matches!(w, PlanWarning::OveruseRelaxed { slot: Slot::Lunch, .. })));
    }

    #[test]
    fn test_deficit_snack_fills_gap_from_staples() {
        let mut items = vec![
            item(1, MealType::Breakfast, 400.0, 30.0),
            item(2, MealType::Lunch, 600.0, 40.0),
            item(3, MealType::Dinner, 600.0, 40.0),
            item(4, MealType::Snack, 90.0, 2.0),
        ];
        let mut cheese = item(5, MealType::Staple, 400.0, 28.0);
        cheese.name = "Cottage cheese".into();
        items.push(cheese);
        let catalog = catalog(items);
        let profile = UserProfile::default();
        let config = PlannerConfig::default();
        let pools = build_pools(&catalog, &daily(), &profile, &config).unwrap();
        let outcome = plan_week(&profile, &daily(), &pools, &catalog.staples(), &config).unwrap();

        let monday = &outcome.week_plan[&Weekday::Monday];
        assert!((monday.calorie_deficit - 400.0).abs() < 1e-9);
        let snack = &monday.meals[&Slot::Snack];
        assert_eq!(snack.item.as_ref().map(|i| i.id), Some(5));
        assert_eq!(snack.source, Some(ItemSource::Staple));
        assert!((snack.targets.calories - 400.0).abs() < 1e-9);
        // shortfall 150 - 110 beats the 7.5 g snack share
        assert!((snack.targets.protein_g - 40.0).abs() < 1e-9);
        assert!((monday.total_nutrition.calories - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_snack_when_gap_is_small() {
        let items = vec![
            item(1, MealType::Breakfast, 500.0, 30.0),
            item(2, MealType::Lunch, 700.0, 40.0),
            item(3, MealType::Dinner, 760.0, 40.0),
            item(4, MealType::Snack, 90.0, 2.0),
        ];
        let catalog = catalog(items);
        let profile = UserProfile::default();
        let config = PlannerConfig::default();
        let pools = build_pools(&catalog, &daily(), &profile, &config).unwrap();
        let outcome = plan_week(&profile, &daily(), &pools, &catalog.staples(), &config).unwrap();
        assert!(outcome.week_plan.values().all(|d| !d.meals.contains_key(&Slot::Snack)));
    }

    #[test]
    fn test_excluded_slot_is_reported_unfilled() {
        let mut items = vec![
            item(1, MealType::Breakfast, 500.0, 30.0),
            item(2, MealType::Lunch, 700.0, 40.0),
            item(3, MealType::Dinner, 700.0, 40.0),
            item(4, MealType::Snack, 90.0, 2.0),
        ];
        items[0].ingredients = vec!["peanut butter".into()];
        let catalog = catalog(items);
        let profile = UserProfile {
            allergies: ["peanut".to_string()].into_iter().collect(),
            ..UserProfile::default()
        };
        let config = PlannerConfig::default();
        let pools = build_pools(&catalog, &daily(), &profile, &config).unwrap();
        let outcome = plan_week(&profile, &daily(), &pools, &catalog.staples(), &config).unwrap();

        assert_eq!(outcome.week_plan.len(), 7);
        let unfilled = outcome
            .warnings
            .iter()
            .filter(|w| matches!(w, PlanWarning::SlotUnfilled { slot: Slot::Breakfast, .. }))
            .count();
        assert_eq!(unfilled, 7);
        assert!(outcome.week_plan.values().all(|d| d.meals[&Slot::Breakfast].item.is_none()));
    }
}
