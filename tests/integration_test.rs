use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use solveboard::bot::{Bot, BotError};
use solveboard::gateway::router;
use solveboard::identity::{IdentityError, IdentityResolver, IdentityResult};
use solveboard::proof::{ProofImageSource, ProofParams, ProofResult};
use solveboard::protocol::{Action, ActionBatch, InboundMessage};
use solveboard::puzzle::{MiniKey, PipsKey};
use solveboard::store::SolveStore;
use solveboard::types::{Color, GroupId, UserId, REJECTED_REACTION};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const GROUP: &str = "g1";
const BLANK: &[u8] = b"blank badge";

/// Member directory that can be switched into a failing state
struct Directory {
    names: HashMap<UserId, String>,
    down: AtomicBool,
}

impl Directory {
    fn with(names: &[(&str, &str)]) -> Self {
        Self {
            names: names
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
            down: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl IdentityResolver for Directory {
    async fn resolve(
        &self,
        _group_id: &GroupId,
        user_ids: &[UserId],
    ) -> IdentityResult<HashMap<UserId, String>> {
        if self.down.load(Ordering::SeqCst) {
            return Err(IdentityError::Request("bridge unavailable".to_string()));
        }
        let missing: Vec<UserId> = user_ids
            .iter()
            .filter(|id| !self.names.contains_key(*id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(IdentityError::Unresolved(missing));
        }
        Ok(user_ids
            .iter()
            .map(|id| (id.clone(), self.names[id].clone()))
            .collect())
    }

    async fn display_name(&self, user_id: &UserId) -> IdentityResult<String> {
        self.names
            .get(user_id)
            .cloned()
            .ok_or_else(|| IdentityError::Unresolved(vec![user_id.clone()]))
    }
}

/// Renders the blank badge for the credential "deadbeef", a distinct image otherwise
struct Badges;

#[async_trait]
impl ProofImageSource for Badges {
    async fn fetch(&self, params: Option<&ProofParams>) -> ProofResult<Vec<u8>> {
        Ok(match params {
            Some(params) if params.credential != "deadbeef" => {
                format!("badge {} {}", params.credential, params.seconds).into_bytes()
            }
            _ => BLANK.to_vec(),
        })
    }

    fn image_url(&self, params: &ProofParams) -> String {
        format!("https://badges.test/mini.jpg?c={}", params.credential)
    }
}

async fn bot_with(directory: Directory) -> (Arc<Bot>, Arc<Directory>) {
    let store = SolveStore::open_in_memory()
        .await
        .expect("in-memory store should open");
    let directory = Arc::new(directory);
    let bot = Bot::new(
        store,
        directory.clone(),
        Arc::new(Badges),
        chrono_tz::US::Eastern,
    );
    (Arc::new(bot), directory)
}

fn message(author_id: &str, author_name: &str, content: &str) -> InboundMessage {
    InboundMessage {
        message_id: format!("m-{}", author_id),
        group_id: GROUP.to_string(),
        author_id: author_id.to_string(),
        author_name: author_name.to_string(),
        author_is_bot: false,
        content: content.to_string(),
    }
}

fn badge(seconds: u32, credential: &str) -> String {
    format!(
        "https://www.nytimes.com/badges/games/mini.html?d=2024-04-20&t={}&c={}",
        seconds, credential
    )
}

fn card(actions: &[Action]) -> (&str, &str, Option<Color>, Option<&str>) {
    match actions {
        [Action::Card {
            title,
            description,
            color,
            thumbnail_url,
        }, Action::Delete] => (
            title.as_str(),
            description.as_str(),
            *color,
            thumbnail_url.as_deref(),
        ),
        other => panic!("Expected a card followed by a delete, got {:?}", other),
    }
}

fn reply(actions: &[Action]) -> &str {
    match actions {
        [Action::Reply { text }] => text.as_str(),
        other => panic!("Expected a single reply, got {:?}", other),
    }
}

/// Two players trading first place on the same mini
#[tokio::test]
async fn test_mini_crown_changes_hands() {
    let (bot, _) = bot_with(Directory::with(&[("a", "Alice"), ("b", "Bob")])).await;
    let key = MiniKey::new(NaiveDate::from_ymd_opt(2024, 4, 20).unwrap());

    // 1. Alice posts first
    let actions = bot
        .handle(&message("a", "Alice", &badge(52, "aaa111")))
        .await
        .unwrap();
    let (title, description, color, thumbnail) = card(&actions);
    assert_eq!(title, "Alice solved the 2024-04-20 mini in 0:52");
    assert_eq!(description, "1. Alice (0:52) :crown:");
    assert_eq!(color, Some(Color::GOLD));
    assert_eq!(thumbnail, Some("https://badges.test/mini.jpg?c=aaa111"));

    // 2. Bob beats her
    let actions = bot
        .handle(&message("b", "Bob", &badge(40, "bbb222")))
        .await
        .unwrap();
    let (_, description, color, _) = card(&actions);
    assert_eq!(description, "1. Bob (0:40) :crown:\n2. Alice (0:52)");
    assert_eq!(color, Some(Color::GOLD));

    // 3. Alice re-posts the same time: nothing changes, no highlight
    let actions = bot
        .handle(&message("a", "Alice", &badge(52, "aaa111")))
        .await
        .unwrap();
    let (_, description, color, _) = card(&actions);
    assert_eq!(description, "1. Bob (0:40) :crown:\n2. Alice (0:52)");
    assert_eq!(color, None);
    assert_eq!(bot.store().count::<MiniKey>().await.unwrap(), 2);

    // 4. Alice corrects her time and takes the crown back
    let actions = bot
        .handle(&message("a", "Alice", &badge(30, "aaa333")))
        .await
        .unwrap();
    let (title, description, color, _) = card(&actions);
    assert_eq!(title, "Alice solved the 2024-04-20 mini in 0:30");
    assert_eq!(description, "1. Alice (0:30) :crown:\n2. Bob (0:40)");
    assert_eq!(color, Some(Color::GOLD));

    let scope = bot.store().scope(GROUP, &key).await.unwrap();
    assert_eq!(scope.len(), 2);
    assert_eq!(scope[0].user_id, "a");
    assert_eq!(scope[0].credential.as_deref(), Some("aaa333"));
}

#[tokio::test]
async fn test_tied_times_share_the_crown() {
    let (bot, _) = bot_with(Directory::with(&[("a", "Alice"), ("b", "Bob"), ("c", "Cleo")])).await;

    for (id, name, seconds) in [("a", "Alice", 45), ("b", "Bob", 45), ("c", "Cleo", 60)] {
        bot.handle(&message(id, name, &badge(seconds, id)))
            .await
            .unwrap();
    }

    let actions = bot.handle(&message("b", "Bob", "%nyt l 2024-04-20")).await.unwrap();
    assert_eq!(
        reply(&actions),
        "1. Alice (0:45) :crown:\n1. Bob (0:45) :crown:\n2. Cleo (1:00)"
    );
}

#[tokio::test]
async fn test_spoofed_badge_is_rejected() {
    let (bot, _) = bot_with(Directory::with(&[("a", "Alice")])).await;

    let actions = bot
        .handle(&message("a", "Alice", &badge(5, "deadbeef")))
        .await
        .unwrap();

    assert_eq!(
        actions,
        vec![Action::React {
            emoji: REJECTED_REACTION.to_string()
        }]
    );
    assert_eq!(bot.store().count::<MiniKey>().await.unwrap(), 0);
}

#[tokio::test]
async fn test_narrative_solve_is_recorded_without_proof() {
    let (bot, _) = bot_with(Directory::with(&[("a", "Alice")])).await;

    let text = "I solved the 4/21/2024 New York Times Mini Crossword in 1:05! https://www.nytimes.com/crosswords/game/mini";
    let actions = bot.handle(&message("a", "Alice", text)).await.unwrap();

    let (title, description, _, thumbnail) = card(&actions);
    assert_eq!(title, "Alice solved the 2024-04-21 mini in 1:05");
    assert_eq!(description, "1. Alice (1:05) :crown:");
    assert_eq!(thumbnail, None);
}

#[tokio::test]
async fn test_bot_authors_and_chatter_are_ignored() {
    let (bot, _) = bot_with(Directory::with(&[("a", "Alice")])).await;

    let mut from_bot = message("a", "Alice", &badge(52, "aaa111"));
    from_bot.author_is_bot = true;
    assert!(bot.handle(&from_bot).await.unwrap().is_empty());

    assert!(bot
        .handle(&message("a", "Alice", "nice one"))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(bot.store().count::<MiniKey>().await.unwrap(), 0);
}

#[tokio::test]
async fn test_pips_flow() {
    let (bot, _) = bot_with(Directory::with(&[("a", "Alice"), ("b", "Bob")])).await;

    let actions = bot
        .handle(&message("a", "Alice", "Pips #38 Hard \u{1F534}\n3:46"))
        .await
        .unwrap();
    let (title, description, _, thumbnail) = card(&actions);
    assert_eq!(title, "Alice solved the #38 Hard in 3:46");
    assert_eq!(description, "1. Alice (3:46) :crown:");
    assert_eq!(thumbnail, None);

    // Different difficulty is a separate leaderboard
    bot.handle(&message("b", "Bob", "Pips #38 Easy \u{1F7E2}\n0:58"))
        .await
        .unwrap();

    let actions = bot.handle(&message("b", "Bob", "%pip l 38 hard")).await.unwrap();
    assert_eq!(reply(&actions), "1. Alice (3:46) :crown:");

    let actions = bot.handle(&message("b", "Bob", "%pip l 39 hard")).await.unwrap();
    assert_eq!(reply(&actions), "No leaderboard for #39 Hard");

    // Lowercase tiers land on the same leaderboard as the command spelling
    bot.handle(&message("b", "Bob", "Pips #38 hard \u{1F534}\n4:10"))
        .await
        .unwrap();
    let actions = bot.handle(&message("a", "Alice", "%pip l 38 HARD")).await.unwrap();
    assert_eq!(reply(&actions), "1. Alice (3:46) :crown:\n2. Bob (4:10)");

    assert_eq!(bot.store().count::<PipsKey>().await.unwrap(), 3);
    assert_eq!(bot.store().count::<MiniKey>().await.unwrap(), 0);
}

#[tokio::test]
async fn test_commands() {
    let (bot, _) = bot_with(Directory::with(&[("a", "Alice, Esq.")])).await;
    bot.handle(&message("a", "Alice", &badge(52, "aaa111")))
        .await
        .unwrap();

    let actions = bot.handle(&message("a", "Alice", "%nyt l 4/20")).await.unwrap();
    assert_eq!(
        reply(&actions),
        "Invalid date `4/20`, expected YYYY-MM-DD"
    );

    let actions = bot.handle(&message("a", "Alice", "%nyt l 2024-04-19")).await.unwrap();
    assert_eq!(reply(&actions), "No leaderboard for 2024-04-19");

    let actions = bot.handle(&message("a", "Alice", "%nyt ?")).await.unwrap();
    assert!(reply(&actions).contains("leaderboard"));

    let actions = bot.handle(&message("a", "Alice", "%nyt d")).await.unwrap();
    match actions.as_slice() {
        [Action::Attachment { filename, content }] => {
            assert_eq!(filename, "solves.csv");
            let lines: Vec<&str> = content.split("\r\n").collect();
            assert_eq!(lines[0], "display_name,timestamp,date,seconds");
            assert!(lines[1].starts_with("\"Alice, Esq.\","));
            assert!(lines[1].ends_with(",2024-04-20,52"));
        }
        other => panic!("Expected an attachment, got {:?}", other),
    }
}

#[tokio::test]
async fn test_identity_failure_aborts_after_write() {
    let (bot, directory) = bot_with(Directory::with(&[("a", "Alice")])).await;
    directory.down.store(true, Ordering::SeqCst);

    let result = bot.handle(&message("a", "Alice", &badge(52, "aaa111"))).await;
    assert!(matches!(result, Err(BotError::Identity(_))));

    // The solve itself was stored before the leaderboard lookup failed
    assert_eq!(bot.store().count::<MiniKey>().await.unwrap(), 1);
}

#[tokio::test]
async fn test_gateway_routes() {
    let (bot, directory) = bot_with(Directory::with(&[("a", "Alice")])).await;
    let app = router(bot);

    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = serde_json::to_string(&message("a", "Alice", &badge(52, "aaa111"))).unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::post("/messages")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let batch: ActionBatch = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(batch.actions.len(), 2);
    assert_eq!(batch.actions[1], Action::Delete);

    directory.down.store(true, Ordering::SeqCst);
    let body = serde_json::to_string(&message("a", "Alice", "%nyt l 2024-04-20")).unwrap();
    let response = app
        .oneshot(
            Request::post("/messages")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
