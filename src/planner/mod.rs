pub mod exclusion;
pub mod selector;
pub mod session;
pub mod week;

pub use exclusion::ExclusionMatcher;
pub use selector::{filter_staples, protein_efficiency_score, select_main_meal, select_snack, MainMealPick, SnackPick};
pub use session::PlanningSession;
pub use week::{plan_week, plan_week_with_session, DayPlan, MealSelection, PlanWarning, WeekOutcome, WeekPlan};
