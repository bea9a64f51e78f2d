use async_trait::async_trait;
use dialoguer::Confirm;
use sleeve::{Confirmer, Notifier, Result, SleeveError};
use tokio::sync::oneshot;
use tracing::{error, warn};

/// Asks on the terminal.
///
/// The prompt runs on a detached thread: when the coordinator gives up
/// waiting, the abandoned prompt does not hold up shutdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirmer;

#[async_trait]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        let prompt = prompt.to_string();
        std::thread::spawn(move || {
            let answer = Confirm::new()
                .with_prompt(prompt)
                .default(default)
                .interact();
            let _ = tx.send(answer);
        });

        match rx.await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(e)) => {
                warn!("Prompt unavailable ({}), assuming {}", e, default);
                Ok(default)
            }
            Err(_) => Err(SleeveError::Transient("prompt thread exited".into())),
        }
    }
}

/// Prints fatal errors to stderr in addition to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, title: &str, message: &str) {
        error!("{}: {}", title, message);
        eprintln!("\n*** {title} ***\n{message}\n");
    }
}
