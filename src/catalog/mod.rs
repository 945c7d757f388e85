pub mod embedding;
pub mod ingredients;
pub mod loader;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::error::{PlannerError, Result};
use crate::model::{CatalogItem, MealType};

pub use embedding::{decode_embedding, encode_embedding, placeholder_embedding, PLACEHOLDER_DIMENSION};
pub use ingredients::{normalize_ingredient, normalize_ingredients, parse_ingredient_list};
pub use loader::load_catalog_csv;

/// Read-only item collection shared by every planning run.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<Arc<CatalogItem>>,
    embedding_dim: usize,
}

impl Catalog {
    /// Validates ids and embedding shapes and normalizes ingredient terms.
    /// Items with an empty embedding get a placeholder vector of the
    /// catalog's dimension ([`PLACEHOLDER_DIMENSION`] when no item has one).
    ///
    /// # Errors
    /// `PlannerError::Catalog` on duplicate ids, negative or non-finite
    /// nutrition, or mixed embedding lengths.
    pub fn from_items(mut items: Vec<CatalogItem>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id) {
                return Err(PlannerError::Catalog(format!("Duplicate item id {}", item.id)));
            }
            let macros = [item.calories, item.protein_g, item.carbs_g, item.fat_g];
            if macros.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(PlannerError::Catalog(format!(
                    "Item {} ('{}') has negative or non-finite nutrition values",
                    item.id, item.name
                )));
            }
        }

        for item in items.iter_mut() {
            item.ingredients = normalize_ingredients(&item.ingredients);
        }

        let embedding_dim = items
            .iter()
            .map(|item| item.embedding.len())
            .find(|len| *len > 0)
            .unwrap_or(PLACEHOLDER_DIMENSION);
        let mut synthesized = 0usize;
        for item in items.iter_mut().filter(|item| item.embedding.is_empty()) {
            item.embedding = placeholder_embedding(item.id, embedding_dim);
            synthesized += 1;
        }
        if synthesized > 0 {
            info!(
                count = synthesized,
                dimension = embedding_dim,
                "Synthesized placeholder embeddings for items without one"
            );
        }

        if let Some(bad) = items.iter().find(|item| item.embedding.len() != embedding_dim) {
            return Err(PlannerError::Catalog(format!(
                "Embedding dimension mismatch for item {}: expected {}, got {}",
                bad.id,
                embedding_dim,
                bad.embedding.len()
            )));
        }
        if let Some(bad) = items
            .iter()
            .find(|item| item.embedding.iter().any(|v| !v.is_finite()))
        {
            return Err(PlannerError::Catalog(format!(
                "Embedding for item {} contains NaN or Infinity",
                bad.id
            )));
        }

        Ok(Self {
            items: items.into_iter().map(Arc::new).collect(),
            embedding_dim,
        })
    }

    pub fn items(&self) -> &[Arc<CatalogItem>] {
        &self.items
    }

    pub fn of_meal_type(&self, meal_type: MealType) -> impl Iterator<Item = &Arc<CatalogItem>> + '_ {
        self.items.iter().filter(move |item| item.meal_type == meal_type)
    }

    pub fn staples(&self) -> Vec<Arc<CatalogItem>> {
        self.of_meal_type(MealType::Staple).cloned().collect()
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::item;
    use super::*;

    #[test]
    fn test_duplicate_ids_rejected() {
        let items = vec![item(1, MealType::Lunch, 500.0, 30.0), item(1, MealType::Dinner, 600.0, 40.0)];
        assert!(matches!(Catalog::from_items(items), Err(PlannerError::Catalog(_))));
    }

    #[test]
    fn test_mixed_dimensions_rejected() {
        let mut short = item(2, MealType::Lunch, 500.0, 30.0);
        short.embedding = vec![1.0];
        let items = vec![item(1, MealType::Lunch, 500.0, 30.0), short];
        assert!(Catalog::from_items(items).is_err());
    }

    #[test]
    fn test_negative_nutrition_rejected() {
        let mut bad = item(1, MealType::Lunch, 500.0, 30.0);
        bad.fat_g = -2.0;
        assert!(Catalog::from_items(vec![bad]).is_err());
    }

    #[test]
    fn test_placeholders_synthesized_when_absent() {
        let mut a = item(1, MealType::Lunch, 500.0, 30.0);
        let mut b = item(2, MealType::Snack, 150.0, 5.0);
        a.embedding.clear();
        b.embedding.clear();
        let catalog = Catalog::from_items(vec![a, b]).unwrap();
        assert_eq!(catalog.embedding_dim(), PLACEHOLDER_DIMENSION);
        assert_eq!(catalog.of_meal_type(MealType::Snack).count(), 1);
        assert!(catalog.staples().is_empty());
    }

    #[test]
    fn test_missing_embedding_gets_placeholder_of_catalog_dimension() {
        let mut missing = item(2, MealType::Lunch, 550.0, 35.0);
        missing.embedding.clear();
        let items = vec![item(1, MealType::Lunch, 500.0, 30.0), missing];
        let catalog = Catalog::from_items(items).unwrap();
        assert_eq!(catalog.embedding_dim(), 3);
        let filled = catalog.items().iter().find(|i| i.id == 2).unwrap();
        assert_eq!(filled.embedding, placeholder_embedding(2, 3));
    }

    #[test]
    fn test_ingredients_normalized_on_construction() {
        let mut mixed = item(1, MealType::Lunch, 500.0, 30.0);
        mixed.ingredients = vec![" Rice ".to_string(), "Chicken".to_string(), " ".to_string()];
        let catalog = Catalog::from_items(vec![mixed]).unwrap();
        assert_eq!(catalog.items()[0].ingredients, vec!["rice", "chicken"]);
    }
}
