pub mod item;
pub mod nutrition;
pub mod profile;

pub use item::{CatalogItem, ItemSource, MealType, Slot, Weekday};
pub use nutrition::{DailyTarget, MealTarget, Nutrition};
pub use profile::{ActivityLevel, Demographics, Gender, Goal, UserProfile};
