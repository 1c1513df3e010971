//! JSON-backed question bank.
//!
//! File format:
//!
//! ```json
//! {
//!   "categories": [
//!     {
//!       "name": "General",
//!       "description": "A bit of everything",
//!       "questions": [
//!         { "question": "How tall is Everest?", "answer": 8849, "unit": "m", "source": "NGS" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use trivia_protocol::{CategoryInfo, Question};

use crate::{QuestionError, QuestionSource};

/// A named set of questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct BankFile {
    categories: Vec<Category>,
}

/// In-memory question bank, loaded once and shared read-only by all lobbies.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    categories: Vec<Category>,
}

impl QuestionBank {
    /// Builds a bank from already-parsed categories.
    pub fn from_categories(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Parses a bank from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, QuestionError> {
        let file: BankFile = serde_json::from_str(json)?;
        let bank = Self::from_categories(file.categories);
        tracing::debug!(
            categories = bank.categories.len(),
            questions = bank.question_count(),
            "question bank parsed"
        );
        Ok(bank)
    }

    /// Reads and parses a bank from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, QuestionError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let bank = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            categories = bank.categories.len(),
            "question bank loaded"
        );
        Ok(bank)
    }

    /// Total number of questions across all categories.
    pub fn question_count(&self) -> usize {
        self.categories.iter().map(|c| c.questions.len()).sum()
    }

    fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }
}

impl QuestionSource for QuestionBank {
    async fn question(&self, category: &str) -> Result<Question, QuestionError> {
        let found = self
            .category(category)
            .ok_or_else(|| QuestionError::UnknownCategory(category.to_owned()))?;

        let picked = {
            let mut rng = rand::rng();
            found.questions.choose(&mut rng).cloned()
        };
        picked.ok_or_else(|| QuestionError::EmptyCategory(category.to_owned()))
    }

    fn categories(&self) -> Vec<CategoryInfo> {
        self.categories
            .iter()
            .map(|c| CategoryInfo {
                name: c.name.clone(),
                description: c.description.clone(),
            })
            .collect()
    }
}
