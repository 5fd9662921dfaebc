//! End-to-end tests: real HTTP server, file-backed ledger, stub routing
//! service and chain.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use syndicate_domain::{Mint, PIGGY_USDC_MINT, SOL_MINT, USDC_MINT};
use syndicate_exec::{CancellationToken, Keypair, StubChain, StubRouting, Venue};
use syndicate_store::{JsonFileStore, LedgerStore};
use syndicated::{Config, Daemon, DaemonResult, SecretKey};

struct Harness {
    base: String,
    routing: Arc<StubRouting>,
    store: Arc<JsonFileStore>,
    shutdown: CancellationToken,
    server: JoinHandle<DaemonResult<()>>,
    client: reqwest::Client,
    _dir: TempDir,
}

impl Harness {
    async fn start(leg_pause: Duration) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::test(dir.path().join("ledger.json"), SecretKey::new("[]"));
        config.execution.leg_pause = leg_pause;

        let keypair = Arc::new(Keypair::from_seed(&[7u8; 32]).unwrap());
        let chain = Arc::new(StubChain::new(20_000_000));
        let store = Arc::new(JsonFileStore::new(
            config.ledger_path.clone(),
            keypair.pubkey_base58(),
        ));

        let routing = Arc::new(StubRouting::new());
        let (sol, usdc, piggy) = mints();
        routing.set_rate(&sol, &usdc, 150, 1000);
        routing.set_rate(&usdc, &piggy, 995, 1000);

        let daemon = Daemon::new(
            config,
            Venue::Ultra(routing.clone()),
            keypair,
            chain,
            store.clone(),
        );
        let shutdown = daemon.shutdown_token();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api/syndicate", listener.local_addr().unwrap());
        let server = tokio::spawn(daemon.serve(listener));

        Self {
            base,
            routing,
            store,
            shutdown,
            server,
            client: reqwest::Client::new(),
            _dir: dir,
        }
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }
}

fn mints() -> (Mint, Mint, Mint) {
    (
        Mint::new(SOL_MINT).unwrap(),
        Mint::new(USDC_MINT).unwrap(),
        Mint::new(PIGGY_USDC_MINT).unwrap(),
    )
}

const BONK_COMMENT: &str = "Token: BONK\nDirection: long\nTimeframe: 1 week\nConviction: HIGH\n\
Reasoning: BONK has shown consistent volume growth across the last quarter. \
Staking pools quote a sustainable apy and protocol tvl keeps climbing while \
exchange listings widen. We size conservatively and exit on a two day close \
below the weekly open to cap drawdown at the treasury limit.";

#[tokio::test]
async fn test_health_and_fresh_ledger_status() {
    let h = Harness::start(Duration::ZERO).await;

    let (code, health) = h.get("/health").await;
    assert_eq!(code, 200);
    assert_eq!(health["status"], "healthy");

    let (code, status) = h.get("/status").await;
    assert_eq!(code, 200);
    assert_eq!(status["syndicate"], "The Agent Syndicate");
    assert_eq!(status["memberCount"], 0);
    assert_eq!(status["thesesCount"], 0);
    assert_eq!(status["tradeCount"], 0);
    assert_eq!(status["treasury"]["seed"], "1 SOL");

    let (_, trades) = h.get("/trades").await;
    assert_eq!(trades["trades"], json!([]));
}

#[tokio::test]
async fn test_approved_thesis_is_recorded() {
    let h = Harness::start(Duration::ZERO).await;

    let (code, body) = h
        .post(
            "/theses",
            json!({"agentId": 42, "agentName": "piggy-bot", "comment": BONK_COMMENT}),
        )
        .await;
    assert_eq!(code, 201);
    assert_eq!(body["evaluation"]["approved"], true);
    assert!(body["evaluation"]["score"].as_u64().unwrap() > 50);
    assert_eq!(body["thesis"]["token"], "BONK");

    let ledger = h.store.load().await.unwrap();
    assert_eq!(ledger.theses.len(), 1);
    let member = ledger.member(42).unwrap();
    assert_eq!(member.agent_name, "piggy-bot");
    assert_eq!(member.theses_count, 1);

    let (_, leaderboard) = h.get("/leaderboard").await;
    assert_eq!(leaderboard["leaderboard"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejected_thesis_leaves_ledger_untouched() {
    let h = Harness::start(Duration::ZERO).await;

    let (code, body) = h
        .post(
            "/theses",
            json!({"agentId": 7, "token": "DOGE", "timeframe": "1 week", "conviction": "high"}),
        )
        .await;
    assert_eq!(code, 200);
    assert_eq!(body["evaluation"]["approved"], false);
    assert_eq!(body["evaluation"]["score"], 0);
    assert!(body.get("thesis").is_none());

    let ledger = h.store.load().await.unwrap();
    assert!(ledger.theses.is_empty());
    assert!(ledger.members.is_empty());
}

#[tokio::test]
async fn test_invalid_thesis_fields_are_bad_requests() {
    let h = Harness::start(Duration::ZERO).await;

    let (code, _) = h
        .post("/theses", json!({"agentId": 7, "token": "JitoSOL", "conviction": "extreme"}))
        .await;
    assert_eq!(code, 400);

    let (code, _) = h.post("/theses", json!({"agentId": 7})).await;
    assert_eq!(code, 400);
}

#[tokio::test]
async fn test_deposit_completes_both_legs() {
    let h = Harness::start(Duration::ZERO).await;

    let (code, body) = h.post("/deposit-piggy", json!({})).await;
    assert_eq!(code, 200, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["legs"].as_array().unwrap().len(), 2);
    assert_eq!(body["legs"][0]["outAmount"], 150_000_000u64);
    assert_eq!(body["legs"][1]["outAmount"], 149_250_000u64);

    let ledger = h.store.load().await.unwrap();
    assert_eq!(ledger.trades.len(), 2);
    assert!(ledger.trades.iter().all(|t| t.thesis_id == "seed-deposit"));
    assert_eq!(ledger.trades[0].agent_id, 896);
    assert_eq!(ledger.treasury.native_balance, dec!(0.02));
    assert_eq!(ledger.treasury.intermediate_balance, dec!(0));
    assert_eq!(ledger.treasury.target_balance, dec!(149.25));
}

#[tokio::test]
async fn test_deposit_second_leg_failure_is_partial() {
    let h = Harness::start(Duration::ZERO).await;
    let (_, _, piggy) = mints();
    h.routing.fail_orders_to(&piggy);

    let (code, body) = h.post("/deposit-piggy", json!({})).await;
    assert_eq!(code, 200);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "partial");
    assert_eq!(body["legs"].as_array().unwrap().len(), 1);
    assert_eq!(body["heldIntermediate"], 150_000_000u64);
    assert_eq!(body["error"]["kind"], "routing_service");

    let ledger = h.store.load().await.unwrap();
    assert_eq!(ledger.trades.len(), 1);
    assert_eq!(ledger.treasury.native_balance, dec!(1));
    assert_eq!(ledger.treasury.target_balance, dec!(0));
}

#[tokio::test]
async fn test_retry_completes_partial_deposit() {
    let h = Harness::start(Duration::ZERO).await;
    let (_, _, piggy) = mints();
    h.routing.fail_orders_to(&piggy);

    let (_, body) = h.post("/deposit-piggy", json!({})).await;
    assert_eq!(body["status"], "partial");
    let first_signature = body["legs"][0]["signature"].clone();

    // Held funds block a fresh deposit
    let (code, body) = h.post("/deposit-piggy", json!({})).await;
    assert_eq!(code, 409);
    assert_eq!(body["error"]["kind"], "partial_pending");
    assert_eq!(body["heldIntermediate"], 150_000_000u64);
    assert_eq!(h.store.load().await.unwrap().trades.len(), 1);

    h.routing.clear_order_failures();
    let (code, body) = h.post("/retry-piggy", json!({})).await;
    assert_eq!(code, 200, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["legs"][0]["signature"], first_signature);
    assert_eq!(body["legs"][1]["inAmount"], 150_000_000u64);
    assert_eq!(body["legs"][1]["outAmount"], 149_250_000u64);

    let ledger = h.store.load().await.unwrap();
    assert_eq!(ledger.trades.len(), 2);
    assert_eq!(ledger.treasury.native_balance, dec!(0.02));
    assert_eq!(ledger.treasury.intermediate_balance, dec!(0));
    assert_eq!(ledger.treasury.target_balance, dec!(149.25));

    let (code, body) = h.post("/retry-piggy", json!({})).await;
    assert_eq!(code, 409);
    assert_eq!(body["error"]["kind"], "nothing_to_retry");

    let (code, body) = h.post("/deposit-piggy", json!({})).await;
    assert_eq!(code, 200);
    assert_eq!(body["status"], "completed");
    assert_eq!(h.store.load().await.unwrap().trades.len(), 4);
}

#[tokio::test]
async fn test_failed_retry_keeps_intermediate_held() {
    let h = Harness::start(Duration::ZERO).await;
    let (_, _, piggy) = mints();
    h.routing.fail_orders_to(&piggy);
    h.post("/deposit-piggy", json!({})).await;

    let (code, body) = h.post("/retry-piggy", json!({})).await;
    assert_eq!(code, 502);
    assert_eq!(body["status"], "partial");
    assert_eq!(body["heldIntermediate"], 150_000_000u64);
    assert_eq!(body["error"]["kind"], "routing_service");

    let ledger = h.store.load().await.unwrap();
    assert_eq!(ledger.trades.len(), 1);
    assert_eq!(ledger.treasury.native_balance, dec!(1));

    h.routing.clear_order_failures();
    let (code, body) = h.post("/retry-piggy", json!({})).await;
    assert_eq!(code, 200);
    assert_eq!(body["status"], "completed");
    assert_eq!(h.store.load().await.unwrap().treasury.target_balance, dec!(149.25));
}

#[tokio::test]
async fn test_retry_without_partial_is_conflict() {
    let h = Harness::start(Duration::ZERO).await;
    let (code, body) = h.post("/retry-piggy", json!({})).await;
    assert_eq!(code, 409);
    assert_eq!(body["error"]["kind"], "nothing_to_retry");
    assert!(h.store.load().await.unwrap().trades.is_empty());
}

#[tokio::test]
async fn test_deposit_first_leg_failure_records_nothing() {
    let h = Harness::start(Duration::ZERO).await;
    let (_, usdc, _) = mints();
    h.routing.fail_orders_to(&usdc);

    let (code, body) = h.post("/deposit-piggy", json!({})).await;
    assert_eq!(code, 502);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error"]["kind"], "routing_service");

    let ledger = h.store.load().await.unwrap();
    assert!(ledger.trades.is_empty());
    assert_eq!(ledger.treasury.native_balance, dec!(1));
}

#[tokio::test]
async fn test_concurrent_deposit_is_rejected() {
    let h = Arc::new(Harness::start(Duration::from_millis(1500)).await);

    let first = {
        let h = h.clone();
        tokio::spawn(async move { h.post("/deposit-piggy", json!({})).await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;

    let (code, body) = h.post("/deposit-piggy", json!({})).await;
    assert_eq!(code, 409);
    assert_eq!(body["status"], "busy");
    assert_eq!(body["error"]["kind"], "deposit_in_progress");

    let (code, body) = first.await.unwrap();
    assert_eq!(code, 200);
    assert_eq!(body["status"], "completed");
    assert_eq!(h.store.load().await.unwrap().trades.len(), 2);
}

#[tokio::test]
async fn test_shutdown_stops_server() {
    let h = Harness::start(Duration::ZERO).await;
    let (code, _) = h.get("/health").await;
    assert_eq!(code, 200);

    h.shutdown.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), h.server)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}
