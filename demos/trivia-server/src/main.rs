use std::path::PathBuf;

use trivia::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_QUESTIONS: &str = "demos/trivia-server/questions.json";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Where to listen and which question file to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    bind: String,
    questions: PathBuf,
}

impl Settings {
    /// Reads `TRIVIA_BIND` and `TRIVIA_QUESTIONS`, falling back to defaults.
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            bind: non_empty("TRIVIA_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            questions: non_empty("TRIVIA_QUESTIONS")
                .unwrap_or_else(|| DEFAULT_QUESTIONS.to_string())
                .into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env();
    let bank = QuestionBank::load(&settings.questions).await?;

    let server = TriviaServer::builder()
        .bind(&settings.bind)
        .build(bank)
        .await?;
    tracing::info!(addr = %settings.bind, questions = %settings.questions.display(), "starting trivia server");

    server.run().await?;
    Ok(())
}
