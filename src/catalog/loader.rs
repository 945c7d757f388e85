use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::catalog::embedding::decode_embedding;
use crate::catalog::ingredients::parse_ingredient_list;
use crate::catalog::Catalog;
use crate::model::{CatalogItem, MealType};

// Accepted header names per column, first match wins.
const ID_COLS: &[&str] = &["id", "recipe_id", "fdc_id"];
const NAME_COLS: &[&str] = &["name", "food_name", "description"];
const MEAL_TYPE_COLS: &[&str] = &["meal_type", "mealType"];
const CALORIES_COLS: &[&str] = &["calories", "per_serving_kcal"];
const PROTEIN_COLS: &[&str] = &["protein_g"];
const CARBS_COLS: &[&str] = &["carbs_g", "carb_g"];
const FAT_COLS: &[&str] = &["fat_g"];
const INGREDIENTS_COLS: &[&str] = &["ingredients"];
const CLUSTER_COLS: &[&str] = &["cluster_id"];
const EMBEDDING_COLS: &[&str] = &["embedding"];

struct Columns {
    id: usize,
    name: usize,
    meal_type: usize,
    calories: usize,
    protein: usize,
    carbs: usize,
    fat: usize,
    ingredients: Option<usize>,
    cluster: Option<usize>,
    embedding: Option<usize>,
}

fn find_column(headers: &StringRecord, candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|name| headers.iter().position(|h| h.trim() == *name))
}

fn require_column(headers: &StringRecord, candidates: &[&str]) -> Result<usize> {
    find_column(headers, candidates).ok_or_else(|| anyhow!("Column '{}' not found", candidates[0]))
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        Ok(Self {
            id: require_column(headers, ID_COLS)?,
            name: require_column(headers, NAME_COLS)?,
            meal_type: require_column(headers, MEAL_TYPE_COLS)?,
            calories: require_column(headers, CALORIES_COLS)?,
            protein: require_column(headers, PROTEIN_COLS)?,
            carbs: require_column(headers, CARBS_COLS)?,
            fat: require_column(headers, FAT_COLS)?,
            ingredients: find_column(headers, INGREDIENTS_COLS),
            cluster: find_column(headers, CLUSTER_COLS),
            embedding: find_column(headers, EMBEDDING_COLS),
        })
    }
}

fn required_f64(record: &StringRecord, idx: usize, column: &str, row: usize) -> Result<f64> {
    let raw = record.get(idx).map(str::trim).unwrap_or_default();
    raw.parse::<f64>()
        .map_err(|_| anyhow!("Row {}: invalid or missing '{}' value '{}'", row, column, raw))
}

fn parse_row(record: &StringRecord, cols: &Columns, row: usize) -> Result<CatalogItem> {
    let raw_id = record.get(cols.id).map(str::trim).unwrap_or_default();
    let id = raw_id
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
        .map(|v| v as u64)
        .ok_or_else(|| anyhow!("Row {}: invalid id '{}'", row, raw_id))?;

    let name = record.get(cols.name).map(str::trim).unwrap_or_default().to_string();
    if name.is_empty() {
        return Err(anyhow!("Row {}: empty name", row));
    }

    let raw_meal_type = record.get(cols.meal_type).map(str::trim).unwrap_or_default();
    let meal_type = MealType::from_str(raw_meal_type)
        .map_err(|_| anyhow!("Row {}: unknown meal type '{}'", row, raw_meal_type))?;

    let ingredients = cols
        .ingredients
        .and_then(|idx| record.get(idx))
        .map(parse_ingredient_list)
        .unwrap_or_default();

    let cluster_id = match cols.cluster.and_then(|idx| record.get(idx)).map(str::trim) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v as i64)
            .ok_or_else(|| anyhow!("Row {}: invalid cluster_id '{}'", row, raw))?,
        _ => 0,
    };

    let embedding = match cols.embedding.and_then(|idx| record.get(idx)).map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            decode_embedding(raw).with_context(|| format!("Row {}: bad embedding", row))?
        }
        _ => Vec::new(),
    };

    Ok(CatalogItem {
        id,
        name,
        meal_type,
        calories: required_f64(record, cols.calories, "calories", row)?,
        protein_g: required_f64(record, cols.protein, "protein_g", row)?,
        carbs_g: required_f64(record, cols.carbs, "carbs_g", row)?,
        fat_g: required_f64(record, cols.fat, "fat_g", row)?,
        ingredients,
        cluster_id,
        embedding,
    })
}

/// Reads a flat catalog CSV. Every required field is checked here, so the
/// planner never sees a partially typed row.
pub fn load_catalog_csv(csv_path: &Path) -> Result<Catalog> {
    if !csv_path.exists() {
        return Err(anyhow!("Catalog CSV file not found at: {:?}", csv_path));
    }

    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open catalog CSV file at {:?}", csv_path))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(file);

    let headers = rdr.headers()?.clone();
    let cols = Columns::resolve(&headers)?;
    if cols.embedding.is_none() {
        debug!("Catalog has no embedding column");
    }

    let mut items = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        // +2: one for the header, one for 1-based numbering
        let row = row_index + 2;
        let record = result.with_context(|| format!("Failed to read record at row {}", row))?;
        items.push(parse_row(&record, &cols, row)?);
    }

    if items.is_empty() {
        return Err(anyhow!("No catalog items loaded from {:?}", csv_path));
    }

    let catalog = Catalog::from_items(items)?;
    info!(
        items = catalog.len(),
        embedding_dim = catalog.embedding_dim(),
        "Catalog loaded from {:?}",
        csv_path
    );
    Ok(catalog)
}
