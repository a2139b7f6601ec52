//! The typical request flow end to end: route a task, append the
//! resulting events to the ledger, then replay them into the repository.

mod harness;

use std::sync::Arc;

use axon_ledger::{SessionLedger, replay, replay_batch};
use axon_router::{ModelRouter, RouteReason, RouteRequest, Task};
use axon_store::MemoryStore;
use harness::{Scripted, handlers, repository, standard_router_config};
use serde_json::json;

#[tokio::test]
async fn route_then_ledger_then_replay() {
    harness::init_tracing();

    let store = MemoryStore::new();
    let ledger = SessionLedger::new(Arc::new(store.clone()));
    let repo = repository(Arc::new(store));

    let openai = Scripted::new(json!({"provider": "openai", "output": "answer"}));
    let router = ModelRouter::from_config(&standard_router_config(), handlers(vec![("openai", openai)]));

    // Route two steps of a session
    let session = "sess-42";
    for step in 1..=2 {
        let outcome = router
            .route(&Task::new("openai"), &RouteRequest::new(1000, json!({"step": step})))
            .await
            .unwrap();
        assert_eq!(outcome.decision.reason, RouteReason::BestScore);

        ledger
            .append(session, &json!({"step": step, "provider": outcome.decision.provider}))
            .await
            .unwrap();
    }

    // Spend accrued once per successful route
    assert!((router.budget_status().daily_spend - 0.04).abs() < 1e-9);
    assert_eq!(router.audit_log().len(), 2);

    // Replay reconstructs the session state from the ledger
    let applied = replay(&ledger, &repo, session).await.unwrap();
    assert_eq!(applied.len(), 2);

    let record = repo.get(session).await.unwrap();
    assert_eq!(record.payload["step"], 2);
    assert_eq!(record.payload["provider"], "openai");
    assert_eq!(record.version, 2);
    assert!(repo.validate_integrity(session).await);
    assert!(repo.session_exists(session).await);

    // A second replay of the same session is skipped, not reapplied
    let summary = replay_batch(&ledger, &repo, [session]).await;
    assert!(summary.replayed.is_empty());
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(repo.get(session).await.unwrap().version, 2);
}
