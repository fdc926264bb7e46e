use streamcraft_chat::server::api::{ router, AppState };

async fn spawn_ui(ws_port: u16) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppState::new(ws_port, "gemini-1.5-pro".into()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn index_page_points_at_websocket_port() {
    let base = spawn_ui(4321).await;
    let resp = reqwest::get(format!("{}/", base)).await.unwrap();
    assert!(resp.status().is_success());

    let html = resp.text().await.unwrap();
    assert!(html.contains(r#"<meta name="ws-port" content="4321">"#));
    assert!(!html.contains("{{WS_PORT}}"));
    assert!(html.contains("Your Message"));
}

#[tokio::test]
async fn health_reports_model() {
    let base = spawn_ui(4000).await;
    let body: serde_json::Value = reqwest
        ::get(format!("{}/health", base)).await
        .unwrap()
        .json().await
        .unwrap();
    assert_eq!(body, serde_json::json!({ "status": "ok", "model": "gemini-1.5-pro" }));
}
