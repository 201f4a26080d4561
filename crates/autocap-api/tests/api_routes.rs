//! Editor and worker routes through the full middleware stack.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use autocap_api::ApiConfig;
use common::{
    bearer, pipeline_config, request, user, worker_token, TestApp,
};

async fn accepting_worker() -> MockServer {
    let worker = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&worker)
        .await;
    worker
}

#[tokio::test]
async fn test_health_sets_response_headers() {
    let app = TestApp::new(pipeline_config(None));
    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        request(Method::GET, "/health", None, &[("x-request-id", "req-42".into())]),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-42");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");

    let (status, body) = app.send(request(Method::GET, "/healthz", None, &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_render_route_queues_job() {
    let worker = accepting_worker().await;
    let app = TestApp::new(pipeline_config(Some(&worker.uri())));
    app.seed_upload_with_transcript().await;

    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/videos/render",
            Some(json!({"uploadId": "up1", "template": "karaoke", "resolution": "720p"})),
            &[user("u1")],
        ))
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "queued");
    assert_eq!(body["skipped"], false);
    assert_eq!(body["uploadId"], "up1");
    assert_eq!(body["videoPath"], "uploads/u1/source.mp4");
    let job_id = body["jobId"].as_str().unwrap();
    assert_eq!(body["outputPath"], format!("renders/u1/{job_id}/rendered.mp4"));
    assert_eq!(body["captionHash"].as_str().unwrap().len(), 64);

    let sent = worker.received_requests().await.unwrap();
    let worker_body: serde_json::Value = sent[0].body_json().unwrap();
    assert_eq!(worker_body["resolution"], "720p");
}

#[tokio::test]
async fn test_render_route_errors() {
    let app = TestApp::new(pipeline_config(None));
    app.seed_upload_with_transcript().await;

    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/videos/render",
            Some(json!({"template": "karaoke"})),
            &[user("u1")],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // Uploads belong to their owner; the default user sees nothing.
    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/videos/render",
            Some(json!({"uploadId": "up1"})),
            &[],
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Upload not found");

    // No worker configured: the job is recorded as failed and the caller
    // gets a server error.
    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/videos/render",
            Some(json!({"uploadId": "up1"})),
            &[user("u1")],
        ))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "CONFIGURATION_ERROR");
}

#[tokio::test]
async fn test_worker_rejection_is_bad_gateway() {
    let worker = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(500).set_body_string("ffmpeg pool exhausted"))
        .mount(&worker)
        .await;
    let app = TestApp::new(pipeline_config(Some(&worker.uri())));
    app.seed_upload_with_transcript().await;

    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/videos/render",
            Some(json!({"uploadId": "up1"})),
            &[user("u1")],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["detail"], "Worker rejected job");
    assert_eq!(body["code"], "WORKER_REJECTED");
}

#[tokio::test]
async fn test_worker_completion_requires_matching_token() {
    let worker = accepting_worker().await;
    let app = TestApp::new(pipeline_config(Some(&worker.uri())));
    app.seed_upload_with_transcript().await;

    let (_, body) = app
        .send(request(
            Method::POST,
            "/api/videos/render",
            Some(json!({"uploadId": "up1"})),
            &[user("u1")],
        ))
        .await;
    let job_id = body["jobId"].as_str().unwrap().to_string();
    let output_path = body["outputPath"].as_str().unwrap().to_string();
    let complete_uri = format!("/api/render/jobs/{job_id}/complete");

    let (status, _) = app
        .send(request(Method::POST, &complete_uri, Some(json!({})), &[]))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(request(
            Method::POST,
            &complete_uri,
            Some(json!({})),
            &[bearer(&worker_token("another-job", "up1"))],
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Rendered asset not there yet.
    let (status, body) = app
        .send(request(Method::GET, "/api/uploads/up1/render-url", None, &[user("u1")]))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Rendered file not ready");

    let (status, body) = app
        .send(request(
            Method::POST,
            &complete_uri,
            Some(json!({"outputPath": output_path})),
            &[bearer(&worker_token(&job_id, "up1"))],
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "rendered");

    app.objects.put(&output_path, vec![0; 16], "video/mp4").await;
    let (status, body) = app
        .send(request(Method::GET, "/api/uploads/up1/render-url", None, &[user("u1")]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["signedUrl"], format!("https://cdn.test/{output_path}"));
}

#[tokio::test]
async fn test_worker_failure_report() {
    let worker = accepting_worker().await;
    let app = TestApp::new(pipeline_config(Some(&worker.uri())));
    app.seed_upload_with_transcript().await;

    let (_, body) = app
        .send(request(
            Method::POST,
            "/api/videos/render",
            Some(json!({"uploadId": "up1"})),
            &[user("u1")],
        ))
        .await;
    let job_id = body["jobId"].as_str().unwrap().to_string();
    let token = worker_token(&job_id, "up1");

    let (status, body) = app
        .send(request(
            Method::POST,
            &format!("/api/render/jobs/{job_id}/progress"),
            Some(json!({"progress": 35})),
            &[bearer(&token)],
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rendering");

    let (status, body) = app
        .send(request(
            Method::POST,
            &format!("/api/render/jobs/{job_id}/fail"),
            Some(json!({"error": "ffmpeg exited with 1"})),
            &[bearer(&token)],
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");

    let (status, body) = app
        .send(request(
            Method::POST,
            &format!("/api/render/jobs/{job_id}/complete"),
            None,
            &[bearer(&token)],
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_export_and_portal_routes() {
    let app = TestApp::new(pipeline_config(None));
    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/export/start",
            Some(json!({"uploadId": "up1", "fileName": "a.mp4"})),
            &[],
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Portal export disabled");

    let (status, body) = app.send(request(Method::GET, "/api/portal/list", None, &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"portals": []}));

    let mut config = pipeline_config(None);
    config.export.enabled = true;
    config.export.default_url = Some("https://portal.example.com/ingest".into());
    let app = TestApp::new(config);

    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/export/start",
            Some(json!({"uploadId": "up1"})),
            &[],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Missing uploadId or fileName");

    let (_, body) = app.send(request(Method::GET, "/api/portal/list", None, &[])).await;
    assert_eq!(body["portals"][0]["id"], "default");
    assert_eq!(body["portals"][0]["url"], "https://portal.example.com/ingest");
}

#[tokio::test]
async fn test_transcript_edit_route() {
    let app = TestApp::new(pipeline_config(None));
    app.seed_upload_with_transcript().await;

    let (status, body) = app
        .send(request(
            Method::PATCH,
            "/api/transcripts/t1",
            Some(json!({"text": "   "})),
            &[user("u1")],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Transcript text is required");

    let (status, _) = app
        .send(request(
            Method::PATCH,
            "/api/transcripts/t1",
            Some(json!({"text": "Hello"})),
            &[user("someone-else")],
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(request(
            Method::PATCH,
            "/api/transcripts/t1",
            Some(json!({
                "text": "Hello there world",
                "language": "en",
                "segments": [{"start": 0, "end": 1.5, "text": "Hello there world"}]
            })),
            &[user("u1")],
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["transcript"]["id"], "t1");
    assert_eq!(body["transcript"]["text"], "Hello there world");
    assert_eq!(body["transcript"]["source_language"], "en");
    assert_eq!(body["transcript"]["segments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_signed_url_promotes_pending_upload() {
    let app = TestApp::new(pipeline_config(None));
    app.seed(
        "uploads",
        "up2",
        json!({"user_id": "u1", "storage_path": "uploads/u1/pending.mp4", "status": "pending_upload"}),
    )
    .await;
    app.objects
        .put("uploads/u1/pending.mp4", vec![1; 2048], "video/mp4")
        .await;

    let (status, body) = app
        .send(request(Method::GET, "/api/uploads/up2/signed-url", None, &[user("u1")]))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["signedUrl"], "https://cdn.test/uploads/u1/pending.mp4");

    let upload = autocap_firestore::DocumentStore::get(app.store.as_ref(), "uploads", "up2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(upload["status"], "uploaded");
    assert_eq!(upload["file_size"], 2048);
}

#[tokio::test]
async fn test_rate_limit_applies_per_client() {
    let api_config = ApiConfig {
        rate_limit_rps: 1,
        ..ApiConfig::default()
    };
    let app = TestApp::with_api_config(api_config, pipeline_config(None));
    let from = ("x-forwarded-for", "198.51.100.23".to_string());

    let (first, _) = app
        .send(request(Method::GET, "/api/portal/list", None, &[from.clone()]))
        .await;
    let (second, _) = app
        .send(request(Method::GET, "/api/portal/list", None, &[from]))
        .await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);

    // Health checks sit outside the limiter.
    for _ in 0..3 {
        let (status, _) = app.send(request(Method::GET, "/health", None, &[])).await;
        assert_eq!(status, StatusCode::OK);
    }
}
