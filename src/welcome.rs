//! First-run welcome text.
//!
//! On the first launch the document is replaced by a short greeting so
//! pressing Start immediately has something to read.

use crate::config::AppConfig;

/// Fallback when neither `USER` nor `USERNAME` is set.
const ANONYMOUS: &str = "there";

/// Build the greeting for `user`.
pub fn welcome_message(user: &str, version: &str) -> String {
    format!(
        "Hello {user}, and welcome to TTS Reader {version}!\n\n\
         Type or paste any text into this box, place the cursor where you \
         want to begin, and press Start. The word being read is highlighted \
         as it is spoken. Pause and Stop work from the buttons or from your \
         keyboard's media keys.\n\n\
         Save to file writes the whole document to a WAV file using the \
         selected voice.\n\n\
         (This message will only appear once.)"
    )
}

/// Name of the logged-in user from the environment.
pub fn current_user() -> String {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.trim().is_empty())
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

/// Seed the document with the welcome text once.
///
/// Returns `true` when the config was changed and should be saved.
pub fn seed_first_run(config: &mut AppConfig, user: &str) -> bool {
    if config.ui.has_seen_welcome {
        return false;
    }
    config.ui.has_seen_welcome = true;
    config.document.text = welcome_message(user, env!("CARGO_PKG_VERSION"));
    config.document.selection_start = Some(0);
    log::info!("first run: seeded document with welcome text");
    true
}
