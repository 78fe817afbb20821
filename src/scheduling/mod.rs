//! This module takes care of scheduling the filtering work, encapsulating use
//! of multiple threads

#[cfg(not(feature = "multi-threading"))] mod sequential;
#[cfg(feature = "multi-threading")] mod multi_threading;

use crate::pipeline::Category;


/// Build the output of every requested category in the manner that was
/// configured at build time.
///
/// Takes as parameters the categories to be built and a kernel that builds the
/// output of one category. Categories do not depend on each other, so they may
/// be processed in any order, but results always come back in the order of
/// the input categories.
///
pub fn run_categories<T: Send>(
    categories: &[Category],
    build_category: impl Send + Sync + Fn(Category) -> T,
) -> Vec<T> {
    // ...in sequential mode
    #[cfg(not(feature = "multi-threading"))]
    { sequential::run_categories_impl(categories, build_category) }

    // ...in multi-threaded mode
    #[cfg(feature = "multi-threading")]
    { multi_threading::run_categories_impl(categories, build_category) }
}
