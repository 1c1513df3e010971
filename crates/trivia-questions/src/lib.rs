//! Question sources for trivia lobbies.
//!
//! A lobby asks its [`QuestionSource`] for one question per round. The
//! shipped implementation is [`QuestionBank`], which loads a JSON file of
//! categories once and picks uniformly at random within a category.

#![allow(async_fn_in_trait)]

mod bank;
mod error;

pub use bank::{Category, QuestionBank};
pub use error::QuestionError;

use trivia_protocol::{CategoryInfo, Question};

/// Supplies questions by category.
///
/// Implementations must be callable concurrently from many lobbies; each
/// call is independent and no ordering is promised across calls.
pub trait QuestionSource: Send + Sync + 'static {
    /// Returns one question from `category`.
    ///
    /// # Errors
    /// - [`QuestionError::UnknownCategory`]: no such category
    /// - [`QuestionError::EmptyCategory`]: the category has no questions
    fn question(
        &self,
        category: &str,
    ) -> impl std::future::Future<Output = Result<Question, QuestionError>> + Send;

    /// Lists the available categories.
    fn categories(&self) -> Vec<CategoryInfo>;

    /// Returns `true` if `category` is one of [`categories`](Self::categories).
    fn has_category(&self, category: &str) -> bool {
        self.categories().iter().any(|c| c.name == category)
    }
}
