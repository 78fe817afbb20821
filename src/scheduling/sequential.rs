//! Sequential back-end of the category filtering

use crate::pipeline::Category;

/// Build categories one after the other
pub fn run_categories_impl<T: Send>(
    categories: &[Category],
    build_category: impl Send + Sync + Fn(Category) -> T,
) -> Vec<T> {
    categories.iter().map(|&category| build_category(category)).collect()
}
