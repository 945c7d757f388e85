use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Plans a week of meals from a recipe catalog", long_about = None)]
pub struct Cli {
    /// Catalog CSV (id, name, meal_type, calories, protein_g, carbs_g, fat_g, ingredients, ...)
    #[arg(short, long)]
    pub catalog: PathBuf,

    /// User profile as JSON
    #[arg(short, long)]
    pub profile: PathBuf,

    /// TOML configuration file; falls back to PLANNER_CONFIG
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Give up on the whole run after this many seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Write the plan here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
