//! Mock confirmer for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::locator::Confirmer;

/// Answers every prompt with a fixed value and records the prompts.
#[derive(Debug)]
pub struct MockConfirmer {
    answer: bool,
    prompts: Arc<RwLock<Vec<String>>>,
}

impl MockConfirmer {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            prompts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Prompts shown so far.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.read().await.clone()
    }
}

#[async_trait]
impl Confirmer for MockConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        self.prompts.write().await.push(prompt.to_string());
        self.answer
    }
}
