//! Exercises `FcmSender` against an in-process fake gateway served by axum.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};

use matchday_notifier::gateway::FcmSender;
use matchday_notifier::{DeliveryOutcome, ErrorCode, GatewayError, PushGateway, PushMessage};

#[derive(Clone, Copy)]
enum Behaviour {
    /// The token "busy" answers `Unavailable` for the first N calls.
    BusyFor(usize),
    /// First call fails with HTTP 500.
    ServerErrorOnce,
    /// Every call is rejected with HTTP 401.
    Unauthorized,
    /// First call answers with "busy" `Unavailable`, later calls get HTTP 401.
    RevokedAfterFirst,
}

#[derive(Default)]
struct Recorded {
    calls: Vec<Vec<String>>,
    auth: Vec<String>,
}

#[derive(Clone)]
struct FakeGateway {
    behaviour: Behaviour,
    recorded: Arc<Mutex<Recorded>>,
}

async fn handle(
    State(fake): State<FakeGateway>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let tokens: Vec<String> = body["registration_ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap().to_string())
        .collect();

    let call = {
        let mut recorded = fake.recorded.lock();
        recorded.calls.push(tokens.clone());
        recorded.auth.push(
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string(),
        );
        recorded.calls.len()
    };

    match fake.behaviour {
        Behaviour::Unauthorized => {
            return (StatusCode::UNAUTHORIZED, Json(json!({})));
        }
        Behaviour::RevokedAfterFirst if call > 1 => {
            return (StatusCode::UNAUTHORIZED, Json(json!({})));
        }
        Behaviour::ServerErrorOnce if call == 1 => {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})));
        }
        _ => {}
    }

    let results: Vec<Value> = tokens
        .iter()
        .map(|token| match fake.behaviour {
            Behaviour::BusyFor(n) if token == "busy" && call <= n => json!({ "error": "Unavailable" }),
            Behaviour::RevokedAfterFirst if token == "busy" => json!({ "error": "Unavailable" }),
            _ if token == "gone" => json!({ "error": "NotRegistered" }),
            _ if token == "old" => json!({ "message_id": format!("m-{}", token), "registration_id": "new" }),
            _ => json!({ "message_id": format!("m-{}", token) }),
        })
        .collect();

    (
        StatusCode::OK,
        Json(json!({ "multicast_id": 100 + call, "results": results })),
    )
}

async fn spawn_gateway(behaviour: Behaviour) -> (String, Arc<Mutex<Recorded>>) {
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let app = Router::new()
        .route("/fcm/send", post(handle))
        .with_state(FakeGateway {
            behaviour,
            recorded: recorded.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/fcm/send", addr), recorded)
}

fn sender(endpoint: &str) -> FcmSender {
    FcmSender::new(endpoint, "secret", Duration::from_secs(5))
        .unwrap()
        .with_initial_backoff(Duration::from_millis(1))
}

fn tokens(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn test_results_keep_token_order() {
    let (endpoint, recorded) = spawn_gateway(Behaviour::BusyFor(0)).await;

    let result = sender(&endpoint)
        .send_multicast(&PushMessage::new(), &tokens(&["a", "old", "gone"]), 3)
        .await
        .unwrap();

    assert_eq!(result.multicast_id, 101);
    assert!(result.retry_multicast_ids.is_empty());
    assert_eq!(
        result.results,
        vec![
            DeliveryOutcome::Delivered {
                message_id: "m-a".into(),
                canonical_token: None,
            },
            DeliveryOutcome::Delivered {
                message_id: "m-old".into(),
                canonical_token: Some("new".into()),
            },
            DeliveryOutcome::Failed(ErrorCode::NotRegistered),
        ]
    );

    let recorded = recorded.lock();
    assert_eq!(recorded.calls.len(), 1);
    assert_eq!(recorded.auth[0], "key=secret");
}

#[tokio::test]
async fn test_only_unavailable_tokens_are_retried() {
    let (endpoint, recorded) = spawn_gateway(Behaviour::BusyFor(1)).await;

    let result = sender(&endpoint)
        .send_multicast(&PushMessage::new(), &tokens(&["a", "busy", "c"]), 2)
        .await
        .unwrap();

    assert_eq!(result.success(), 3);
    assert_eq!(result.retry_multicast_ids, vec![102]);
    assert_eq!(
        result.results[1],
        DeliveryOutcome::Delivered {
            message_id: "m-busy".into(),
            canonical_token: None,
        }
    );

    let recorded = recorded.lock();
    assert_eq!(recorded.calls, vec![tokens(&["a", "busy", "c"]), tokens(&["busy"])]);
}

#[tokio::test]
async fn test_unavailable_reported_when_retries_exhausted() {
    let (endpoint, recorded) = spawn_gateway(Behaviour::BusyFor(usize::MAX)).await;

    let result = sender(&endpoint)
        .send_multicast(&PushMessage::new(), &tokens(&["a", "busy"]), 1)
        .await
        .unwrap();

    assert!(result.results[0].is_delivered());
    assert_eq!(result.results[1], DeliveryOutcome::Failed(ErrorCode::Unavailable));
    assert_eq!(recorded.lock().calls.len(), 2);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let (endpoint, recorded) = spawn_gateway(Behaviour::ServerErrorOnce).await;

    let result = sender(&endpoint)
        .send_multicast(&PushMessage::new(), &tokens(&["a"]), 1)
        .await
        .unwrap();

    assert_eq!(result.success(), 1);
    assert_eq!(result.multicast_id, 102);
    assert_eq!(recorded.lock().calls.len(), 2);
}

#[tokio::test]
async fn test_server_error_without_retries_fails() {
    let (endpoint, _recorded) = spawn_gateway(Behaviour::ServerErrorOnce).await;

    let err = sender(&endpoint)
        .send_multicast(&PushMessage::new(), &tokens(&["a"]), 0)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Http { status: 500, .. }));
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let (endpoint, recorded) = spawn_gateway(Behaviour::Unauthorized).await;

    let err = sender(&endpoint)
        .send_multicast(&PushMessage::new(), &tokens(&["a"]), 5)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Unauthorized(401)));
    assert_eq!(recorded.lock().calls.len(), 1);
}

#[tokio::test]
async fn test_failed_retry_keeps_first_answers() {
    let (endpoint, recorded) = spawn_gateway(Behaviour::RevokedAfterFirst).await;

    let result = sender(&endpoint)
        .send_multicast(&PushMessage::new(), &tokens(&["old", "busy", "gone"]), 3)
        .await
        .unwrap();

    assert_eq!(result.multicast_id, 101);
    assert!(result.retry_multicast_ids.is_empty());
    assert_eq!(
        result.results,
        vec![
            DeliveryOutcome::Delivered {
                message_id: "m-old".into(),
                canonical_token: Some("new".into()),
            },
            DeliveryOutcome::Failed(ErrorCode::Unavailable),
            DeliveryOutcome::Failed(ErrorCode::NotRegistered),
        ]
    );
    assert_eq!(
        recorded.lock().calls,
        vec![tokens(&["old", "busy", "gone"]), tokens(&["busy"])]
    );
}

#[tokio::test]
async fn test_single_send() {
    let (endpoint, _recorded) = spawn_gateway(Behaviour::BusyFor(0)).await;

    let outcome = sender(&endpoint)
        .send(&PushMessage::match_score("Man Utd 1", "Arsenal 0"), "gone", 0)
        .await
        .unwrap();

    assert_eq!(outcome, DeliveryOutcome::Failed(ErrorCode::NotRegistered));
}
