//! Unit tests for HistoryStore

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::history::{HistoryLimits, HistoryStore};
    use crate::types::{Role, approx_tokens};

    fn content_of_len(len: usize) -> String {
        "x".repeat(len)
    }

    fn assert_within_limits(store: &HistoryStore, user: &str) {
        let limits = store.limits();
        let history = store.get(user);
        let tokens: usize = history.iter().map(|t| approx_tokens(&t.content)).sum();
        assert!(history.len() <= limits.max_turns);
        assert!(tokens <= limits.max_tokens);
        assert_eq!(tokens, store.token_cost(user));
    }

    #[test]
    fn test_new_user_gets_empty_history() {
        let store = HistoryStore::new();
        assert!(store.get("user-1").is_empty());
        assert_eq!(store.token_cost("user-1"), 0);
    }

    #[test]
    fn test_append_keeps_chronological_order() {
        let store = HistoryStore::new();
        store.append("u", Role::User, "first");
        store.append("u", Role::Assistant, "second");
        store.append("u", Role::User, "third");

        let history = store.get("u");
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "second");
        assert_eq!(history[2].content, "third");
    }

    #[test]
    fn test_count_cap_evicts_oldest_first() {
        let store = HistoryStore::new();
        for i in 0..11 {
            // Every turn is three characters long, so costs one token.
            store.append("u", Role::User, &format!("m{:02}", i));
        }

        let history = store.get("u");
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].content, "m01");
        assert_eq!(history[9].content, "m10");
        assert_eq!(store.token_cost("u"), 10);
    }

    #[test]
    fn test_single_oversized_turn_is_evicted_immediately() {
        let store = HistoryStore::new();
        store.append("u", Role::User, &content_of_len(9000));

        assert!(store.get("u").is_empty());
        assert_eq!(store.token_cost("u"), 0);
    }

    #[test]
    fn test_oversized_turn_evicts_everything_before_it_too() {
        let store = HistoryStore::new();
        store.append("u", Role::User, "tiny");
        store.append("u", Role::Assistant, "tiny");
        store.append("u", Role::User, &content_of_len(9000));

        assert!(store.get("u").is_empty());
    }

    #[test]
    fn test_token_cap_evicts_until_total_fits() {
        let store = HistoryStore::new();
        // 900 tokens each: two fit (1800), a third pushes to 2700.
        store.append("u", Role::User, &content_of_len(2700));
        store.append("u", Role::Assistant, &content_of_len(2700));
        store.append("u", Role::User, "abc");
        assert_eq!(store.get("u").len(), 3);
        assert_eq!(store.token_cost("u"), 1801);

        store.append("u", Role::Assistant, &content_of_len(2700));
        let history = store.get("u");
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, Role::Assistant);
        assert_eq!(history[1].content, "abc");
        assert_eq!(store.token_cost("u"), 1801);
    }

    #[test]
    fn test_bounded_after_every_append() {
        let store = HistoryStore::with_limits(HistoryLimits {
            max_turns: 4,
            max_tokens: 50,
        });
        let lengths = [0, 1, 3, 30, 150, 151, 2, 90, 60, 12, 500, 9, 33, 3];
        for (i, len) in lengths.iter().enumerate() {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store.append("u", role, &content_of_len(*len));
            assert_within_limits(&store, "u");
        }
    }

    #[test]
    fn test_survivors_are_a_suffix_of_appends() {
        let store = HistoryStore::with_limits(HistoryLimits {
            max_turns: 3,
            max_tokens: 10,
        });
        let appended: Vec<String> = (0..8)
            .map(|i| format!("{}{}", i, "y".repeat(i * 4)))
            .collect();
        for content in &appended {
            store.append("u", Role::User, content);
        }

        let kept: Vec<String> = store.get("u").into_iter().map(|t| t.content).collect();
        assert!(appended.ends_with(&kept));
    }

    #[test]
    fn test_users_are_independent() {
        let store = HistoryStore::new();
        store.append("alice", Role::User, "from alice");
        store.append("bob", Role::User, "from bob");
        for _ in 0..20 {
            store.append("alice", Role::Assistant, "abc");
        }

        let bob = store.get("bob");
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].content, "from bob");
        assert_eq!(store.get("alice").len(), 10);
    }

    #[test]
    fn test_clear_reports_whether_anything_was_removed() {
        let store = HistoryStore::new();
        store.append("u", Role::User, "hello");

        assert!(store.clear("u"));
        assert!(store.get("u").is_empty());
        assert_eq!(store.token_cost("u"), 0);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = HistoryStore::new();
        assert!(!store.clear("absent"));
        assert!(store.get("absent").is_empty());

        store.append("u", Role::User, "hello");
        assert!(store.clear("u"));
        assert!(!store.clear("u"));
        assert!(store.get("u").is_empty());
    }

    #[test]
    fn test_append_after_clear_starts_fresh() {
        let store = HistoryStore::new();
        store.append("u", Role::User, "old message");
        store.clear("u");
        store.append("u", Role::User, "new message");

        let history = store.get("u");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "new message");
    }

    #[test]
    fn test_get_returns_snapshot() {
        let store = HistoryStore::new();
        store.append("u", Role::User, "hello");
        let snapshot = store.get("u");
        store.append("u", Role::Assistant, "world");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.get("u").len(), 2);
    }

    #[test]
    fn test_active_users_ignores_empty_histories() {
        let store = HistoryStore::new();
        assert_eq!(store.active_users(), 0);

        store.get("lurker");
        store.append("a", Role::User, "hi");
        store.append("b", Role::User, "hi");
        assert_eq!(store.active_users(), 2);

        store.clear("a");
        assert_eq!(store.active_users(), 1);
    }

    #[test]
    fn test_concurrent_appends_keep_invariants() {
        let store = Arc::new(HistoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let user = format!("user-{}", worker % 3);
                        store.append(&user, Role::User, &"z".repeat((i * 37) % 700));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for user in ["user-0", "user-1", "user-2"] {
            assert_within_limits(&store, user);
        }
    }

    #[test]
    fn test_append_exchange_records_user_then_assistant() {
        let store = HistoryStore::new();
        store.append_exchange("u", "question", "answer");

        let history = store.get("u");
        assert_eq!(history.len(), 2);
        assert_eq!((history[0].role, history[0].content.as_str()), (Role::User, "question"));
        assert_eq!(
            (history[1].role, history[1].content.as_str()),
            (Role::Assistant, "answer")
        );
    }

    #[test]
    fn test_concurrent_exchanges_stay_paired() {
        let store = Arc::new(HistoryStore::with_limits(HistoryLimits {
            max_turns: 1000,
            max_tokens: 100_000,
        }));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let tag = format!("{}-{}", worker, i);
                        store.append_exchange("shared", &format!("q{}", tag), &format!("a{}", tag));
                        if i % 10 == 0 {
                            store.clear("shared");
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let history = store.get("shared");
        assert_eq!(history.len() % 2, 0);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }
}
