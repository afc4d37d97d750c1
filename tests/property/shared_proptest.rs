//! Property-based tests for the shared validation and protocol helpers

use proptest::prelude::*;
use roomline::shared::event::ClientFrame;
use roomline::shared::messaging::{
    direct_key, normalize_content, summarize, validate_emoji, ListMessagesQuery, MAX_PAGE_SIZE,
};
use uuid::Uuid;

fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

proptest! {
    #[test]
    fn normalized_content_is_trimmed_and_bounded(content in ".{0,120}", max_len in 1usize..100) {
        match normalize_content(&content, max_len) {
            Ok(normalized) => {
                prop_assert_eq!(normalized.trim(), normalized.as_str());
                prop_assert!(!normalized.is_empty());
                prop_assert!(normalized.chars().count() <= max_len);
            }
            Err(_) => {
                let trimmed = content.trim();
                prop_assert!(trimmed.is_empty() || trimmed.chars().count() > max_len);
            }
        }
    }

    #[test]
    fn direct_key_ignores_order(a in uuid_strategy(), b in uuid_strategy()) {
        prop_assert_eq!(direct_key(a, b), direct_key(b, a));
    }

    #[test]
    fn summary_counts_match_rows(rows in prop::collection::vec((0usize..4, uuid_strategy()), 0..40)) {
        let emojis = ["👍", "🎉", "❤️", ":shipit:"];
        let rows: Vec<(String, Uuid)> = rows
            .into_iter()
            .map(|(i, user)| (emojis[i].to_string(), user))
            .collect();
        let summaries = summarize(rows.clone());

        let total: u32 = summaries.iter().map(|s| s.count).sum();
        prop_assert_eq!(total as usize, rows.len());
        for summary in &summaries {
            prop_assert_eq!(summary.count as usize, summary.user_ids.len());
        }
        let mut names: Vec<&str> = summaries.iter().map(|s| s.emoji.as_str()).collect();
        names.dedup();
        prop_assert_eq!(names.len(), summaries.len());
    }

    #[test]
    fn emoji_with_whitespace_is_rejected(left in "[a-z]{1,5}", right in "[a-z]{1,5}", ws in "[ \t\n]") {
        let emoji = format!("{}{}{}", left, ws, right);
        prop_assert!(validate_emoji(&emoji).is_err());
    }

    #[test]
    fn page_limit_stays_in_bounds(limit in proptest::option::of(any::<u32>()), default in 1u32..500) {
        let query = ListMessagesQuery { before: None, limit };
        let effective = query.effective_limit(default);
        prop_assert!((1..=MAX_PAGE_SIZE).contains(&effective));
    }

    #[test]
    fn frame_decoding_never_panics(text in ".{0,200}") {
        if let Ok(frame) = ClientFrame::from_text(&text) {
            let _ = frame.parse();
        }
    }

    #[test]
    fn room_join_frames_parse(room in uuid_strategy(), id in "[a-z0-9]{1,8}") {
        let text = format!(r#"{{"event":"room:join","data":{{"room_id":"{}"}},"id":"{}"}}"#, room, id);
        let frame = ClientFrame::from_text(&text).unwrap();
        prop_assert_eq!(frame.id.as_deref(), Some(id.as_str()));
        prop_assert!(frame.parse().is_ok());
    }
}
