//! Interactive credential capture.
//!
//! Configuration values of `"null"` and second-factor challenges resolve to
//! prompts through this capability. Prompt serialization across bots is the
//! host's concern; implementations only answer one question.

use async_trait::async_trait;
use tokio::task;
use tracing::warn;

/// What a prompt is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialPrompt {
    Login,
    Password,
    ParentalPin,
    /// Email Steam-Guard code.
    SteamGuardCode,
    /// Authenticator TOTP code.
    TwoFactorCode,
}

impl CredentialPrompt {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Password => "password",
            Self::ParentalPin => "parental PIN",
            Self::SteamGuardCode => "Steam Guard code",
            Self::TwoFactorCode => "two-factor code",
        }
    }
}

/// Source of interactively supplied credentials.
#[async_trait]
pub trait CredentialsPrompter: Send + Sync {
    /// Asks the operator for a credential. `None` means the prompt was
    /// abandoned; callers treat that as the credential being unavailable.
    async fn prompt(&self, bot_name: &str, kind: CredentialPrompt) -> Option<String>;
}

/// Prompter reading answers from standard input.
pub struct ConsolePrompter;

#[async_trait]
impl CredentialsPrompter for ConsolePrompter {
    async fn prompt(&self, bot_name: &str, kind: CredentialPrompt) -> Option<String> {
        let question = format!("<{bot_name}> enter {}: ", kind.label());
        let answer = task::spawn_blocking(move || {
            use std::io::{BufRead, Write};

            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            if out.write_all(question.as_bytes()).and_then(|()| out.flush()).is_err() {
                return None;
            }

            let stdin = std::io::stdin();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(line.trim().to_string()),
            }
        })
        .await;

        match answer {
            Ok(Some(value)) if !value.is_empty() => Some(value),
            Ok(_) => None,
            Err(e) => {
                warn!(bot = %bot_name, error = %e, "credential prompt task failed");
                None
            }
        }
    }
}
