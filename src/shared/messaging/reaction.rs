//! Reactions on messages

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Maximum emoji length (characters); covers ZWJ sequences and `:shortcodes:`
pub const MAX_EMOJI_LEN: usize = 16;

/// Aggregated reactions for one emoji
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionSummary {
    pub emoji: String,
    pub count: u32,
    pub user_ids: Vec<Uuid>,
}

/// Request to toggle a reaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleReactionRequest {
    pub emoji: String,
}

/// Outcome of a toggle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionUpdate {
    pub room_id: Uuid,
    pub message_id: Uuid,
    /// User whose toggle produced this update
    pub user_id: Uuid,
    pub emoji: String,
    /// True when the reaction was added, false when removed
    pub added: bool,
    pub reactions: Vec<ReactionSummary>,
}

pub fn validate_emoji(emoji: &str) -> Result<(), SharedError> {
    let len = emoji.chars().count();
    if len == 0 || len > MAX_EMOJI_LEN {
        return Err(SharedError::validation(
            "emoji",
            format!("Emoji must be 1-{} characters", MAX_EMOJI_LEN),
        ));
    }
    if emoji.chars().any(char::is_whitespace) {
        return Err(SharedError::validation("emoji", "Emoji cannot contain whitespace"));
    }
    Ok(())
}

/// Group `(emoji, user)` rows into summaries, keeping first-use order
pub fn summarize<I>(rows: I) -> Vec<ReactionSummary>
where
    I: IntoIterator<Item = (String, Uuid)>,
{
    let mut summaries: Vec<ReactionSummary> = Vec::new();
    for (emoji, user_id) in rows {
        match summaries.iter_mut().find(|s| s.emoji == emoji) {
            Some(summary) => {
                summary.count += 1;
                summary.user_ids.push(user_id);
            }
            None => summaries.push(ReactionSummary {
                emoji,
                count: 1,
                user_ids: vec![user_id],
            }),
        }
    }
    summaries
}
