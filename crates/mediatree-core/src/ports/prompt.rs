//! Confirmation prompt port (driving/primary port)
//!
//! The front-end asks the user; the engine only needs the answer.

/// Port trait for yes/no confirmations
#[async_trait::async_trait]
pub trait IConfirmPrompt: Send + Sync {
    /// Asks `question` and returns true when the user agrees
    async fn confirm(&self, question: &str) -> bool;
}

/// Prompt that always gives the same answer
///
/// Used for non-interactive runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

#[async_trait::async_trait]
impl IConfirmPrompt for FixedAnswer {
    async fn confirm(&self, _question: &str) -> bool {
        self.0
    }
}
