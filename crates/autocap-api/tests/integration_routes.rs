//! Integration surface: bearer auth, registration, caption sets and render.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use autocap_api::ApiConfig;
use common::{bearer, integration_token, pipeline_config, request, TestApp};

async fn external_system() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/source.mp4"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp4")
                .set_body_bytes(vec![7u8; 512]),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    for hook in ["/hooks/transcription", "/hooks/render"] {
        Mock::given(method("POST"))
            .and(path(hook))
            .and(header_exists("x-signature"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
    }
    server
}

fn registration(server: &MockServer) -> Value {
    json!({
        "externalVideoId": "ext-1",
        "contentId": "content-9",
        "portalId": "newsroom",
        "videoUrl": format!("{}/source.mp4", server.uri()),
        "transcriptionCallbackUrl": format!("{}/hooks/transcription", server.uri()),
        "renderCallbackUrl": format!("{}/hooks/render", server.uri()),
        "metadata": {"fileName": "Launch Day.mp4"}
    })
}

fn auth() -> (&'static str, String) {
    bearer(&integration_token())
}

#[tokio::test]
async fn test_integration_routes_require_bearer_token() {
    let server = external_system().await;
    let app = TestApp::new(pipeline_config(Some(&server.uri())));

    let (status, _) = app
        .send(request(
            Method::POST,
            "/api/integration/videos",
            Some(registration(&server)),
            &[],
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(request(
            Method::GET,
            "/api/integration/captions/ext-1",
            None,
            &[bearer("not-a-jwt")],
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_registration_rejects_internal_urls() {
    let server = external_system().await;
    let app = TestApp::with_api_config(
        ApiConfig::default(),
        pipeline_config(Some(&server.uri())),
    );

    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/integration/videos",
            Some(registration(&server)),
            &[auth()],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("not allowed"));

    let mut missing = registration(&server);
    missing["contentId"] = json!("");
    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/integration/videos",
            Some(missing),
            &[auth()],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "contentId is required");
}

#[tokio::test]
async fn test_caption_workflow_over_http() {
    let server = external_system().await;
    let app = TestApp::new(pipeline_config(Some(&server.uri())));
    app.seed_upload_with_transcript().await;

    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/integration/videos",
            Some(registration(&server)),
            &[auth()],
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["videoId"], "ext-1");
    assert_eq!(body["status"], "pending_transcription");
    let stored = body["videoStoragePath"].as_str().unwrap();
    assert!(stored.starts_with("uploads/integration/ext-1/"));
    assert!(stored.ends_with("-Launch_Day.mp4"));

    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/integration/videos/ext-1/transcription",
            Some(json!({"uploadId": "up1", "transcriptId": "t1", "transcriptionJobId": "tj-1"})),
            &[auth()],
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "transcribing");
    assert_eq!(body["uploadId"], "up1");

    let (status, body) = app
        .send(request(
            Method::GET,
            "/api/integration/captions/ext-1",
            None,
            &[auth()],
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Caption set not found");

    let (status, draft) = app
        .send(request(
            Method::POST,
            "/api/integration/videos/ext-1/transcription/complete",
            None,
            &[auth()],
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{draft}");
    assert_eq!(draft["videoId"], "ext-1");
    assert_eq!(draft["transcriptId"], "t1");
    assert_eq!(draft["version"], 1);
    assert_eq!(draft["status"], "draft");
    assert_eq!(draft["segments"].as_array().unwrap().len(), 2);
    assert!(draft["segments"][0]["endMs"].as_f64().unwrap() > 0.0);
    let caption_set_id = draft["captionSetId"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(request(
            Method::PUT,
            "/api/integration/captions/ext-1",
            Some(json!({"segments": []})),
            &[auth()],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "segments array is required");

    let (status, saved) = app
        .send(request(
            Method::PUT,
            "/api/integration/captions/ext-1",
            Some(json!({
                "segments": [
                    {"startMs": 0, "endMs": 1800, "text": "This is fire."},
                    {"startMs": 1800, "endMs": 3600, "text": "Money moves today!"}
                ],
                "status": "approved",
                "template": "modern",
                "resolution": "720p"
            })),
            &[auth()],
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{saved}");
    assert_eq!(saved["captionSetId"], caption_set_id.as_str());
    assert_eq!(saved["version"], 2);
    assert_eq!(saved["status"], "approved");
    assert_eq!(saved["template"], "minimal");
    assert_eq!(saved["resolution"], "720p");

    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/integration/render/ext-1",
            Some(json!({"captionSetId": "some-other-set"})),
            &[auth()],
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "Caption set mismatch");

    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/integration/render/ext-1",
            Some(json!({"captionSetId": caption_set_id})),
            &[auth()],
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "queued");
    assert_eq!(body["uploadId"], "up1");

    let worker_request = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.url.path() == "/render")
        .unwrap();
    let worker_body: Value = worker_request.body_json().unwrap();
    assert_eq!(worker_body["integrationVideoId"], "ext-1");
    assert_eq!(worker_body["template"], "minimal");
    assert_eq!(worker_body["resolution"], "720p");
}

#[tokio::test]
async fn test_render_of_unknown_video_is_not_found() {
    let server = external_system().await;
    let app = TestApp::new(pipeline_config(Some(&server.uri())));

    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/integration/render/ghost",
            None,
            &[auth()],
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Video not registered");
}

#[tokio::test]
async fn test_failure_report_sends_error_callback() {
    let server = external_system().await;
    let app = TestApp::new(pipeline_config(Some(&server.uri())));

    let (status, _) = app
        .send(request(
            Method::POST,
            "/api/integration/videos",
            Some(registration(&server)),
            &[auth()],
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(request(
            Method::POST,
            "/api/integration/videos/ext-1/failure",
            Some(json!({"code": "TRANSCRIPTION_FAILED", "message": "speech model timed out"})),
            &[auth()],
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["delivered"], true);

    let callback = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.url.path() == "/hooks/transcription")
        .unwrap();
    let payload: Value = callback.body_json().unwrap();
    assert_eq!(payload["status"], "failed");
    assert_eq!(payload["error"]["code"], "TRANSCRIPTION_FAILED");
    assert_eq!(payload["error"]["message"], "speech model timed out");
}
