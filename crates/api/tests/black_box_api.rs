use labstock_core::Money;
use labstock_infra::EngineConfig;
use reqwest::StatusCode;
use serde_json::{Value, json};

const ADMIN_SECRET: &str = "integration-admin";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let config = EngineConfig {
            bootstrap_admin_secret: ADMIN_SECRET.to_string(),
            ..EngineConfig::default()
        };
        let engine = labstock_api::app::build_engine(&config).expect("bootstrap failed");
        let app = labstock_api::app::build_app(engine);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, employee_id: &str, secret: &str) -> String {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "employee_id": employee_id, "secret": secret }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn put(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn define_item(&self, token: &str, name: &str, quantity: u64, cost: &str) -> String {
        let res = self
            .post(
                token,
                "/inventory/items",
                json!({
                    "name": name,
                    "category": "microcontrollers",
                    "unit_cost": cost,
                    "opening_quantity": quantity,
                }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn money(value: &Value) -> Money {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn health_is_public_and_everything_else_needs_a_session() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");

    let res = srv.get("not-a-session", "/inventory/items").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_whoami_logout() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "employee_id": "admin", "secret": "wrong-secret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = srv.login("admin", ADMIN_SECRET).await;
    let res = srv.get(&token, "/whoami").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["employee_id"], "admin");
    assert_eq!(body["role"], "admin");

    let res = srv.post(&token, "/auth/logout", json!({})).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv.get(&token, "/whoami").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stock_movements_average_cost_and_reject_overdraw() {
    let srv = TestServer::spawn().await;
    let token = srv.login("admin", ADMIN_SECRET).await;

    let id = srv.define_item(&token, "Arduino Uno", 10, "100").await;

    let res = srv
        .post(
            &token,
            &format!("/inventory/items/{id}/stock-in"),
            json!({ "quantity": 10, "unit_cost": "200", "note": "restock" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let item: Value = srv
        .get(&token, &format!("/inventory/items/{id}"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(item["quantity"], 20);
    assert_eq!(money(&item["unit_cost"]), "150".parse::<Money>().unwrap());

    let res = srv
        .post(
            &token,
            &format!("/inventory/items/{id}/stock-out"),
            json!({ "quantity": 21 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["details"][0]["available"], 20);

    let item: Value = srv
        .get(&token, &format!("/inventory/items/{id}"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(item["quantity"], 20);

    let res = srv.get(&token, "/inventory/items/not-a-uuid").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let ledger: Value = srv
        .get(&token, "/inventory/transactions")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(ledger.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn kit_issue_and_return_over_http() {
    let srv = TestServer::spawn().await;
    let token = srv.login("admin", ADMIN_SECRET).await;

    let motor = srv.define_item(&token, "Motor", 6, "40").await;
    let wheel = srv.define_item(&token, "Wheel", 12, "5").await;

    let res = srv
        .post(
            &token,
            "/kits",
            json!({
                "name": "Rover",
                "components": [
                    { "item_id": motor, "quantity_per_kit": 2 },
                    { "item_id": wheel, "quantity_per_kit": 4 },
                ],
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let kit: Value = res.json().await.unwrap();
    let kit_id = kit["id"].as_str().unwrap().to_string();
    assert!(kit["kit_ref"].as_str().unwrap().contains("/KIT/"));

    // 4 rovers need 8 motors; only 6 exist, so nothing moves.
    let res = srv
        .post(&token, &format!("/kits/{kit_id}/issue"), json!({ "count": 4 }))
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = srv
        .post(&token, &format!("/kits/{kit_id}/issue"), json!({ "count": 3 }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let rows: Value = res.json().await.unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);

    let item: Value = srv
        .get(&token, &format!("/inventory/items/{wheel}"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(item["quantity"], 0);

    let res = srv
        .post(&token, &format!("/kits/{kit_id}/return"), json!({ "count": 5 }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .post(&token, &format!("/kits/{kit_id}/return"), json!({ "count": 3 }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let events: Value = srv
        .get(&token, &format!("/kits/{kit_id}/events"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(events.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn purchase_draft_commit_and_lookup() {
    let srv = TestServer::spawn().await;
    let token = srv.login("admin", ADMIN_SECRET).await;
    let id = srv.define_item(&token, "Jumper wires", 0, "2.50").await;

    let shortages: Value = srv
        .get(&token, "/inventory/shortages")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(shortages.as_array().unwrap().len(), 1);

    let required_by = (chrono::Utc::now().date_naive() + chrono::Duration::days(14)).to_string();
    let res = srv
        .post(
            &token,
            "/purchases/draft",
            json!({
                "lines": [{ "item_id": id, "requested_quantity": 40 }],
                "required_by": required_by,
                "mode": { "mode": "offline" },
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let draft: Value = res.json().await.unwrap();
    assert_eq!(money(&draft["estimated_total"]), "100".parse::<Money>().unwrap());

    let res = srv.post(&token, "/purchases", draft).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: Value = res.json().await.unwrap();
    assert!(order["po_number"].as_str().unwrap().ends_with("/0001"));
    let order_id = order["id"].as_str().unwrap();

    let res = srv.get(&token, &format!("/purchases/{order_id}")).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .delete(srv.url(&format!("/purchases/{order_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv.get(&token, &format!("/purchases/{order_id}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assistants_cannot_reach_admin_routes() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin", ADMIN_SECRET).await;

    let res = srv
        .post(
            &admin,
            "/admin/users",
            json!({
                "employee_id": "E-204",
                "name": "Lab Assistant",
                "role": "assistant",
                "secret": "assistant-pass",
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let assistant = srv.login("E-204", "assistant-pass").await;

    let res = srv.get(&assistant, "/admin/audit").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "permission_denied");

    let res = srv.get(&assistant, "/inventory/summary").await;
    assert_eq!(res.status(), StatusCode::OK);

    let audit: Value = srv.get(&admin, "/admin/audit").await.json().await.unwrap();
    let actions: Vec<&str> = audit
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["action"].as_str())
        .collect();
    assert!(actions.contains(&"user_created"));
}

#[tokio::test]
async fn users_maintain_their_own_profile() {
    let srv = TestServer::spawn().await;
    let token = srv.login("admin", ADMIN_SECRET).await;

    let res = srv
        .put(
            &token,
            "/profile",
            json!({
                "name": "Lab Admin",
                "date_of_birth": "1990-08-15",
                "gender": "Other",
                "address": "Robotics lab, block C",
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let user: Value = res.json().await.unwrap();
    assert_eq!(user["name"], "Lab Admin");
    assert_eq!(user["profile"]["date_of_birth"], "1990-08-15");

    let profile: Value = srv.get(&token, "/profile").await.json().await.unwrap();
    assert_eq!(profile["profile"]["gender"], "Other");
    assert_eq!(profile["profile"]["address"], "Robotics lab, block C");

    // Resubmitting the same values changes nothing and is refused.
    let res = srv.put(&token, "/profile", json!({ "name": "Lab Admin" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let audit: Value = srv.get(&token, "/admin/audit").await.json().await.unwrap();
    let updates = audit
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["action"] == "profile_updated")
        .count();
    assert_eq!(updates, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_stock_outs_over_http_lose_no_updates() {
    let srv = TestServer::spawn().await;
    let token = srv.login("admin", ADMIN_SECRET).await;
    let id = srv.define_item(&token, "Jumper wires", 24, "1").await;

    let mut tasks = Vec::new();
    for _ in 0..24 {
        let client = srv.client.clone();
        let url = srv.url(&format!("/inventory/items/{id}/stock-out"));
        let token = token.clone();
        tasks.push(tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&json!({ "quantity": 1 }))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }

    let mut accepted = 0;
    for task in tasks {
        match task.await.unwrap() {
            StatusCode::CREATED => accepted += 1,
            // Contention past the retry budget is reported, never lost.
            StatusCode::CONFLICT => {}
            other => panic!("unexpected status {other}"),
        }
    }
    assert!(accepted > 0);

    // The server kept answering while writers backed off.
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let item: Value = srv
        .get(&token, &format!("/inventory/items/{id}"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(item["quantity"], 24 - accepted);
}
