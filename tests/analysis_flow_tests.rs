//! End-to-end workflow test: one user registers, analyzes a repository
//! against a stubbed GitHub API, browses and deletes the saved record,
//! and finally deletes the account. Runs the real HTTP surface on
//! in-memory storage.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{test, web, App};

use repolens::config::{Config, StorageBackend};
use repolens::services::{MemoryStorage, ProgressStore};
use repolens::{handlers, AppState, GitHubClient};

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        storage_backend: StorageBackend::Memory,
        database_url: None,
        database_max_connections: 1,
        github_api_url: String::new(),
        github_token: None,
        upstream_timeout_secs: 5,
        llm_api_url: None,
        llm_api_key: None,
    }
}

fn app_state(github_url: &str) -> web::Data<AppState> {
    let storage = Arc::new(MemoryStorage::new());
    web::Data::new(AppState {
        config: test_config(),
        users: storage.clone(),
        repos: storage,
        progress: ProgressStore::new(),
        github: GitHubClient::new(github_url, None, Duration::from_secs(5)).unwrap(),
        llm: None,
    })
}

async fn mock_repo(server: &mut mockito::ServerGuard) {
    server
        .mock("GET", "/repos/octo/demo")
        .with_body(
            serde_json::json!({
                "name": "demo", "full_name": "octo/demo", "private": false,
                "default_branch": "main", "language": "Rust",
                "description": "demo repo", "size": 128,
                "stargazers_count": 11, "forks_count": 2
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/repos/octo/demo/contents")
        .with_body(
            serde_json::json!([
                {"name": "README.md", "path": "README.md", "type": "file", "size": 100},
                {"name": "src", "path": "src", "type": "dir", "size": 0}
            ])
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/repos/octo/demo/contents/src")
        .with_body(
            serde_json::json!([
                {"name": "main.rs", "path": "src/main.rs", "type": "file", "size": 250}
            ])
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/repos/octo/demo/git/trees/main?recursive=1")
        .with_body(
            serde_json::json!({
                "truncated": false,
                "tree": [
                    {"path": "README.md", "type": "blob", "size": 100},
                    {"path": "src", "type": "tree"},
                    {"path": "src/main.rs", "type": "blob", "size": 250}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;
}

#[actix_web::test]
async fn full_user_workflow() {
    let mut server = mockito::Server::new_async().await;
    mock_repo(&mut server).await;
    let state = app_state(&server.url());

    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/v1")
                .configure(handlers::configure_user_routes)
                .configure(handlers::configure_analysis_routes)
                .configure(handlers::configure_record_routes),
        ),
    )
    .await;

    // Register.
    let req = test::TestRequest::post()
        .uri("/v1/users")
        .set_json(serde_json::json!({"displayName": "Octo"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let user_id = body["data"]["userId"].as_str().unwrap().to_string();

    // Validate before committing to a crawl.
    let req = test::TestRequest::post()
        .uri("/v1/analysis/validate")
        .set_json(serde_json::json!({"url": "https://github.com/octo/demo"}))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["defaultBranch"], "main");

    // Analyze.
    let req = test::TestRequest::post()
        .uri("/v1/analysis")
        .insert_header(("X-User-Id", user_id.clone()))
        .set_json(serde_json::json!({"url": "https://github.com/octo/demo", "maxDepth": 5}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["record"]["stats"]["analyzedFiles"], 2);
    assert_eq!(body["data"]["record"]["stats"]["analyzedFolders"], 1);
    assert_eq!(body["data"]["record"]["stats"]["totalFiles"], 2);
    assert_eq!(body["data"]["wasTruncated"], false);
    let record_id = body["data"]["record"]["recordId"]
        .as_str()
        .unwrap()
        .to_string();

    // The global counter reflects the completed analysis.
    let req = test::TestRequest::get().uri("/v1/stats").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["analysesCompleted"], 1);

    // Browse: listing has a summary, fetching has the tree.
    let req = test::TestRequest::get()
        .uri("/v1/records")
        .insert_header(("X-User-Id", user_id.clone()))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert!(body["data"][0].get("tree").is_none());

    let req = test::TestRequest::get()
        .uri(&format!("/v1/records/{record_id}"))
        .insert_header(("X-User-Id", user_id.clone()))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let children = body["data"]["tree"]["children"].as_array().unwrap();
    assert_eq!(children.len(), 2);

    // Delete the record, then the account.
    let req = test::TestRequest::delete()
        .uri(&format!("/v1/records/{record_id}"))
        .insert_header(("X-User-Id", user_id.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    let req = test::TestRequest::delete()
        .uri("/v1/users/me")
        .insert_header(("X-User-Id", user_id.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    let req = test::TestRequest::get()
        .uri("/v1/users/me")
        .insert_header(("X-User-Id", user_id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}
