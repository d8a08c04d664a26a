//! End-to-end test over a real socket.

use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;

use secure_api::{HttpServer, Shutdown};

mod common;

#[tokio::test]
async fn test_serves_and_shuts_down_gracefully() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(common::test_config()).unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    let res = client.get(format!("{}/live", base)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert_eq!(res.headers()["ratelimit-limit"], "50");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ALIVE");

    let res = client
        .post(format!("{}/api/validate", base))
        .json(&json!({ "data": "<script>alert(1)</script>" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["result"]["checks"]["xssAttempt"], true);

    // Peer address comes from the connection itself.
    let res = client.get(format!("{}/api/demo", base)).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["request"]["ip"], "127.0.0.1");

    drop(client);
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server stopped within deadline")
        .unwrap()
        .unwrap();
}
