use crate::config::PlannerConfig;
use crate::model::MealTarget;

/// Calorie band and recall window derived from one slot's target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringTargets {
    pub kcal_low: f64,
    pub kcal_high: f64,
    pub window_low: f64,
    pub window_high: f64,
    pub protein_target: f64,
    pub protein_tolerance: f64,
}

/// Inclusive calorie range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KcalRange {
    pub low: f64,
    pub high: f64,
}

impl KcalRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, calories: f64) -> bool {
        calories >= self.low && calories <= self.high
    }
}

impl ScoringTargets {
    /// The band is `target ± band_width / 2`; the window stretches the band
    /// edges outward by `recall_window_pct` of their own value.
    pub fn for_meal(target: &MealTarget, config: &PlannerConfig) -> Self {
        let half_band = target.calories * (config.kcal_band_width / 2.0);
        let kcal_low = target.calories - half_band;
        let kcal_high = target.calories + half_band;
        Self {
            kcal_low,
            kcal_high,
            window_low: kcal_low * (1.0 - config.recall_window_pct),
            window_high: kcal_high * (1.0 + config.recall_window_pct),
            protein_target: target.protein_g,
            protein_tolerance: config.protein_tolerance,
        }
    }

    pub fn band(&self) -> KcalRange {
        KcalRange::new(self.kcal_low, self.kcal_high)
    }

    pub fn window(&self) -> KcalRange {
        KcalRange::new(self.window_low, self.window_high)
    }
}

/// 1.0 inside the band, 0.0 outside the window, linear in between.
pub fn kcal_score(calories: f64, band: KcalRange, window: KcalRange) -> f64 {
    if !calories.is_finite() || !window.contains(calories) {
        return 0.0;
    }
    let score = if band.contains(calories) {
        1.0
    } else if calories < band.low {
        let denom = (band.low - window.low).max(1e-6);
        1.0 - (band.low - calories) / denom
    } else {
        let denom = (window.high - band.high).max(1e-6);
        1.0 - (calories - band.high) / denom
    };
    score.clamp(0.0, 1.0)
}

/// 1.0 while the protein error stays within `tolerance × target`, 0.0 from
/// three times that error on.
pub fn protein_score(protein_g: f64, protein_target: f64, tolerance: f64) -> f64 {
    if !protein_g.is_finite() {
        return 0.0;
    }
    let tol = tolerance * protein_target;
    let max_error = 3.0 * tol;
    let error = (protein_g - protein_target).abs();
    let score = if error <= tol {
        1.0
    } else if error >= max_error {
        0.0
    } else {
        1.0 - (error - tol) / (max_error - tol)
    };
    score.clamp(0.0, 1.0)
}

/// Weighted calorie/protein fit in [0, 1].
pub fn nutrition_fit(calories: f64, protein_g: f64, targets: &ScoringTargets) -> f64 {
    let kcal = kcal_score(calories, targets.band(), targets.window());
    let protein = protein_score(protein_g, targets.protein_target, targets.protein_tolerance);
    (0.7 * kcal + 0.3 * protein).clamp(0.0, 1.0)
}
