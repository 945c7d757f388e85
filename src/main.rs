use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use tokio::fs;
use tracing::{error, info};

use weekly_meal_planner::catalog::load_catalog_csv;
use weekly_meal_planner::cli::parse_args;
use weekly_meal_planner::config::PlannerConfig;
use weekly_meal_planner::logging::init_logging;
use weekly_meal_planner::model::UserProfile;
use weekly_meal_planner::oracle::{FormulaOracle, NutritionTargetOracle, RemoteOracle};
use weekly_meal_planner::service::MealPlanService;

fn select_oracle() -> Box<dyn NutritionTargetOracle> {
    let remote = RemoteOracle::from_default_env();
    if remote.is_configured() {
        Box::new(remote)
    } else {
        Box::new(FormulaOracle::new())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli_args = parse_args();
    init_logging(&cli_args.log_level, cli_args.json_logs)?;

    let config = PlannerConfig::load(cli_args.config.as_deref()).context("Failed to load planner configuration")?;

    let catalog = load_catalog_csv(&cli_args.catalog)
        .with_context(|| format!("Failed to load catalog from '{}'", cli_args.catalog.display()))?;

    let profile_json = fs::read_to_string(&cli_args.profile)
        .await
        .with_context(|| format!("Failed to read profile file '{}'", cli_args.profile.display()))?;
    let profile: UserProfile = serde_json::from_str(&profile_json)
        .with_context(|| format!("Profile file '{}' is not valid JSON", cli_args.profile.display()))?;

    let oracle = select_oracle();
    info!(oracle = oracle.name(), items = catalog.len(), "Starting weekly plan");
    let service = MealPlanService::new(config, oracle)?;

    let run = service.generate(&catalog, &profile);
    let result = match tokio::time::timeout(Duration::from_secs(cli_args.timeout_secs), run).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!(error = %e, "Meal plan generation failed");
            return Err(e.into());
        }
        Err(_) => return Err(anyhow!("Meal plan generation timed out after {}s", cli_args.timeout_secs)),
    };

    let rendered = serde_json::to_string_pretty(&result)?;
    match &cli_args.output {
        Some(path) => {
            fs::write(path, rendered)
                .await
                .with_context(|| format!("Failed to write plan to '{}'", path.display()))?;
            info!(path = %path.display(), "Plan written");
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
