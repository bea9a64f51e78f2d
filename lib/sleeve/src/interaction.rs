use async_trait::async_trait;
use tracing::{error, info};

use crate::error::Result;
use crate::traits::{Confirmer, Notifier};

/// Answers every prompt without asking.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm {
    answer: bool,
}

impl AutoConfirm {
    pub fn yes() -> Self {
        Self { answer: true }
    }

    pub fn no() -> Self {
        Self { answer: false }
    }
}

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, prompt: &str, _default: bool) -> Result<bool> {
        info!("{} -> {}", prompt, if self.answer { "yes" } else { "no" });
        Ok(self.answer)
    }
}

/// Reports fatal errors through the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        error!("{}: {}", title, message);
    }
}
