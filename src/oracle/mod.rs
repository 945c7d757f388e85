//! Sources of the daily macro target a week is planned against.

pub mod formula;
pub mod remote;

use async_trait::async_trait;

use crate::error::{PlannerError, Result};
use crate::model::{DailyTarget, UserProfile};

pub use formula::FormulaOracle;
pub use remote::{OracleConnectionError, RemoteOracle, DEFAULT_ORACLE_URL_ENV_VAR};

/// Maps a user profile to a daily calorie and macro target.
///
/// Implementations validate the profile first and return
/// `PlannerError::Validation` for missing or out-of-range fields.
#[async_trait]
pub trait NutritionTargetOracle: Send + Sync {
    async fn daily_target(&self, profile: &UserProfile) -> Result<DailyTarget>;

    fn name(&self) -> &'static str;
}

/// Rejects oracle output with negative or non-finite fields.
pub(crate) fn checked_target(target: DailyTarget, oracle: &str) -> Result<DailyTarget> {
    if target.is_well_formed() {
        Ok(target)
    } else {
        Err(PlannerError::Oracle(format!(
            "{} returned an unusable target: {:?}",
            oracle, target
        )))
    }
}
