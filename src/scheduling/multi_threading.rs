//! Multi-threaded back-end of the category filtering

use crate::pipeline::Category;

use rayon::prelude::*;

/// Build categories in parallel
///
/// Each category is an independent task. Rayon's indexed collection puts the
/// results back in input order, so the output does not depend on scheduling.
///
pub fn run_categories_impl<T: Send>(
    categories: &[Category],
    build_category: impl Send + Sync + Fn(Category) -> T,
) -> Vec<T> {
    categories
        .par_iter()
        .map(|&category| build_category(category))
        .collect()
}
