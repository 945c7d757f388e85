use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use crate::config::PlannerConfig;
use crate::model::{CatalogItem, ItemSource, MealTarget};
use crate::planner::session::PlanningSession;

/// Staple names that are supplements or cooking ingredients rather than
/// something eaten as a snack.
const STAPLE_EXCLUDE_KEYWORDS: &[&str] = &[
    "supplement",
    "powder",
    "pill",
    "tablet",
    "capsule",
    "vitamin",
    "mineral",
    "creatine",
    "bcaa",
    "whey",
    "protein powder",
    "mass gainer",
    "pre-workout",
    "oil",
    "extract",
    "syrup",
    "herb",
];

const STAPLE_MIN_KCAL: f64 = 30.0;
const STAPLE_MAX_KCAL: f64 = 500.0;
const STAPLE_MAX_PROTEIN_G: f64 = 100.0;

/// Item picked for a main meal.
#[derive(Debug, Clone, PartialEq)]
pub struct MainMealPick {
    pub item: Arc<CatalogItem>,
    /// Every eligible candidate had been used earlier in the week.
    pub reused: bool,
    /// Nothing sat inside the calorie tolerance; picked from the nearest items.
    pub nearest_fallback: bool,
}

/// Item picked to close a calorie gap.
#[derive(Debug, Clone, PartialEq)]
pub struct SnackPick {
    pub item: Arc<CatalogItem>,
    pub source: ItemSource,
}

/// `0.7 × protein per kcal + 0.3 × closeness to the protein target`.
/// Items with no calories get no efficiency credit.
pub fn protein_efficiency_score(item: &CatalogItem, target_protein: f64) -> f64 {
    let efficiency = if item.calories > 0.0 {
        item.protein_g / item.calories
    } else {
        0.0
    };
    let target_score = 1.0 / (1.0 + (item.protein_g - target_protein).abs());
    let score = 0.7 * efficiency + 0.3 * target_score;
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

fn within_tolerance<'a>(
    items: impl Iterator<Item = &'a Arc<CatalogItem>>,
    target_calories: f64,
    tolerance: f64,
) -> Vec<Arc<CatalogItem>> {
    let margin = target_calories * tolerance;
    let (low, high) = (target_calories - margin, target_calories + margin);
    items
        .filter(|item| item.calories >= low && item.calories <= high)
        .cloned()
        .collect()
}

/// The `n` items closest to `target_calories`, ties to the lower id.
fn nearest_by_calories(items: &[Arc<CatalogItem>], target_calories: f64, n: usize) -> Vec<Arc<CatalogItem>> {
    let mut sorted: Vec<Arc<CatalogItem>> = items.to_vec();
    sorted.sort_by(|a, b| {
        let da = (a.calories - target_calories).abs();
        let db = (b.calories - target_calories).abs();
        da.total_cmp(&db).then_with(|| a.id.cmp(&b.id))
    });
    sorted.truncate(n);
    sorted
}

fn by_score_desc(a: &(f64, Arc<CatalogItem>), b: &(f64, Arc<CatalogItem>)) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id))
}

fn ranked_by_protein(items: Vec<Arc<CatalogItem>>, target_protein: f64) -> Vec<(f64, Arc<CatalogItem>)> {
    let mut scored: Vec<(f64, Arc<CatalogItem>)> = items
        .into_iter()
        .map(|item| (protein_efficiency_score(&item, target_protein), item))
        .collect();
    scored.sort_by(by_score_desc);
    scored
}

/// Picks one main meal out of `candidates`.
///
/// Candidates within `meal_calorie_tolerance` of the target are preferred;
/// without any, the `fallback_nearest` closest are used. Items already in
/// the session's used set are skipped while an unused one remains. The
/// result is the best of the top `top_choices` by protein score.
pub fn select_main_meal(
    candidates: &[Arc<CatalogItem>],
    target: &MealTarget,
    session: &PlanningSession,
    config: &PlannerConfig,
) -> Option<MainMealPick> {
    if candidates.is_empty() {
        return None;
    }

    let mut pool = within_tolerance(candidates.iter(), target.calories, config.meal_calorie_tolerance);
    let nearest_fallback = pool.is_empty();
    if nearest_fallback {
        debug!(target_kcal = target.calories, "No candidate within tolerance, using nearest items");
        pool = nearest_by_calories(candidates, target.calories, config.fallback_nearest);
    }

    let unused: Vec<Arc<CatalogItem>> = pool.iter().filter(|item| !session.is_used(item.id)).cloned().collect();
    let reused = unused.is_empty();
    let eligible = if reused { pool } else { unused };

    let mut ranked = ranked_by_protein(eligible, target.protein_g);
    ranked.truncate(config.top_choices);
    ranked.into_iter().next().map(|(_, item)| MainMealPick {
        item,
        reused,
        nearest_fallback,
    })
}

/// Picks the snack that best closes a calorie gap.
///
/// Snack recipes and `staples` within `snack_calorie_tolerance` of the gap
/// compete together; when none qualifies the nearest snack recipes are used.
/// Repeats across the week are allowed.
pub fn select_snack(
    snack_recipes: &[Arc<CatalogItem>],
    staples: &[Arc<CatalogItem>],
    target: &MealTarget,
    config: &PlannerConfig,
) -> Option<SnackPick> {
    let mut candidates = within_tolerance(
        snack_recipes.iter().chain(staples.iter()),
        target.calories,
        config.snack_calorie_tolerance,
    );
    if candidates.is_empty() {
        debug!(target_kcal = target.calories, "No snack within tolerance, using nearest snack recipes");
        candidates = nearest_by_calories(snack_recipes, target.calories, config.fallback_nearest);
    }

    ranked_by_protein(candidates, target.protein_g)
        .into_iter()
        .next()
        .map(|(_, item)| SnackPick {
            source: item.source(),
            item,
        })
}

/// Drops supplement-like staples and rows with implausible snack nutrition.
pub fn filter_staples(staples: &[Arc<CatalogItem>]) -> Vec<Arc<CatalogItem>> {
    staples
        .iter()
        .filter(|item| {
            let name = item.name.to_lowercase();
            !STAPLE_EXCLUDE_KEYWORDS.iter().any(|kw| name.contains(kw))
        })
        .filter(|item| {
            (STAPLE_MIN_KCAL..=STAPLE_MAX_KCAL).contains(&item.calories)
                && (0.0..=STAPLE_MAX_PROTEIN_G).contains(&item.protein_g)
                && item.carbs_g >= 0.0
                && item.fat_g >= 0.0
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::item;
    use crate::model::MealType;

    fn arc(id: u64, meal_type: MealType, calories: f64, protein_g: f64) -> Arc<CatalogItem> {
        Arc::new(item(id, meal_type, calories, protein_g))
    }

    fn lunch_target() -> MealTarget {
        MealTarget { calories: 700.0, protein_g: 50.0, carbs_g: 70.0, fat_g: 23.0 }
    }

    #[test]
    fn test_protein_efficiency_score() {
        let it = item(1, MealType::Lunch, 500.0, 50.0);
        // 0.7 * 0.1 + 0.3 * 1.0
        assert!((protein_efficiency_score(&it, 50.0) - 0.37).abs() < 1e-9);
        let zero = item(2, MealType::Staple, 0.0, 5.0);
        assert!((protein_efficiency_score(&zero, 5.0) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_main_meal_prefers_in_tolerance_and_protein() {
        let candidates = vec![
            arc(1, MealType::Lunch, 700.0, 20.0),
            arc(2, MealType::Lunch, 720.0, 50.0),
            arc(3, MealType::Lunch, 1200.0, 120.0),
        ];
        let pick = select_main_meal(&candidates, &lunch_target(), &PlanningSession::new(), &PlannerConfig::default())
            .unwrap();
        assert_eq!(pick.item.id, 2);
        assert!(!pick.reused);
        assert!(!pick.nearest_fallback);
    }

    #[test]
    fn test_main_meal_skips_used_items_while_alternatives_exist() {
        let candidates = vec![arc(1, MealType::Lunch, 700.0, 50.0), arc(2, MealType::Lunch, 690.0, 30.0)];
        let mut session = PlanningSession::new();
        session.mark_used(1);
        let config = PlannerConfig::default();
        let pick = select_main_meal(&candidates, &lunch_target(), &session, &config).unwrap();
        assert_eq!(pick.item.id, 2);

        session.mark_used(2);
        let pick = select_main_meal(&candidates, &lunch_target(), &session, &config).unwrap();
        assert_eq!(pick.item.id, 1);
        assert!(pick.reused);
    }

    #[test]
    fn test_main_meal_nearest_fallback() {
        let candidates = vec![arc(1, MealType::Lunch, 300.0, 80.0), arc(2, MealType::Lunch, 1000.0, 10.0)];
        let config = PlannerConfig { fallback_nearest: 1, ..PlannerConfig::default() };
        let pick = select_main_meal(&candidates, &lunch_target(), &PlanningSession::new(), &config).unwrap();
        assert!(pick.nearest_fallback);
        // 1000 is 300 away, 300 is 400 away
        assert_eq!(pick.item.id, 2);
        assert!(select_main_meal(&[], &lunch_target(), &PlanningSession::new(), &config).is_none());
    }

    #[test]
    fn test_snack_draws_from_staples() {
        let snacks = vec![arc(1, MealType::Snack, 400.0, 2.0)];
        let staples = vec![arc(2, MealType::Staple, 210.0, 20.0)];
        let target = MealTarget { calories: 200.0, protein_g: 20.0, carbs_g: 25.0, fat_g: 8.0 };
        let pick = select_snack(&snacks, &staples, &target, &PlannerConfig::default()).unwrap();
        assert_eq!(pick.item.id, 2);
        assert_eq!(pick.source, ItemSource::Staple);
    }

    #[test]
    fn test_snack_falls_back_to_nearest_recipes() {
        let snacks = vec![arc(1, MealType::Snack, 400.0, 2.0), arc(2, MealType::Snack, 900.0, 30.0)];
        let target = MealTarget { calories: 200.0, protein_g: 10.0, carbs_g: 25.0, fat_g: 8.0 };
        let config = PlannerConfig { fallback_nearest: 1, ..PlannerConfig::default() };
        let pick = select_snack(&snacks, &[], &target, &config).unwrap();
        assert_eq!(pick.item.id, 1);
        assert_eq!(pick.source, ItemSource::Recipe);
        assert!(select_snack(&[], &[], &target, &config).is_none());
    }

    #[test]
    fn test_filter_staples() {
        let mut whey = item(1, MealType::Staple, 120.0, 24.0);
        whey.name = "Whey Protein Isolate".into();
        let mut olive = item(2, MealType::Staple, 120.0, 0.0);
        olive.name = "Olive oil".into();
        let tiny = item(3, MealType::Staple, 10.0, 1.0);
        let huge = item(4, MealType::Staple, 900.0, 10.0);
        let mut yogurt = item(5, MealType::Staple, 150.0, 15.0);
        yogurt.name = "Greek yogurt".into();
        let staples: Vec<Arc<CatalogItem>> = [whey, olive, tiny, huge, yogurt].into_iter().map(Arc::new).collect();
        let kept = filter_staples(&staples);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 5);
    }
}
