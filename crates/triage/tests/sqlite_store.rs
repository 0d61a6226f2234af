use triage::persistence::{ResponseRecord, ResponseSink, SqliteResponseStore};
use triage::survey::{RiskLevel, ScoreResult, TraversalSnapshot};

fn record(user_id: &str, q_idx: usize, finished: bool) -> ResponseRecord {
    let result = finished.then_some(ScoreResult {
        score: 2.0,
        max_score: 2.0,
        probability: 0.9526,
        level: RiskLevel::High,
    });

    ResponseRecord::from_snapshot(
        user_id,
        "2024-05",
        TraversalSnapshot {
            selected_path_id: "phishing".to_string(),
            current_index: q_idx,
            answers: [("q1", "tak"), ("q2", "nie wiem")].into_iter().collect(),
            finished,
            result,
        },
    )
}

#[tokio::test]
async fn records_survive_reopening_the_database() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("responses.sqlite3");

    {
        let store = SqliteResponseStore::open(&path).expect("store opens");
        store.record(&record("alice", 1, false)).await.expect("first");
        store.record(&record("alice", 2, true)).await.expect("second");
        store.record(&record("bob", 1, false)).await.expect("third");
    }

    let store = SqliteResponseStore::open(&path).expect("store reopens");
    assert_eq!(store.count().expect("count"), 3);

    let alice = store.for_user("alice").expect("alice");
    assert_eq!(alice.len(), 2);
    assert_eq!(alice[0].q_idx, 1);
    assert!(!alice[0].finished);
    assert!(alice[0].result.is_none());
    assert_eq!(alice[1].q_idx, 2);
    assert_eq!(alice[1].result.map(|r| r.level), Some(RiskLevel::High));
    assert_eq!(alice[1].answers.get("q2"), Some("nie wiem"));
    assert_eq!(alice[1].survey_version, "2024-05");
    assert_eq!(alice[1].path_id, "phishing");
}

#[test]
fn recent_returns_newest_first_and_honours_the_limit() {
    let store = SqliteResponseStore::open_in_memory().expect("store opens");
    for q_idx in 0..5 {
        store.append(&record("carol", q_idx, false)).expect("append");
    }

    let recent = store.recent(2).expect("recent");

    let indexes: Vec<_> = recent.iter().map(|record| record.q_idx).collect();
    assert_eq!(indexes, vec![4, 3]);
}

#[test]
fn unknown_users_have_no_history() {
    let store = SqliteResponseStore::open_in_memory().expect("store opens");
    store.append(&record("dave", 0, false)).expect("append");

    assert!(store.for_user("erin").expect("query").is_empty());
    assert_eq!(store.name(), "sqlite");
}
