//! Integration tests for the WebUI REST contract of `SdWebUiClient`

use sdbatch::backend::{BackendClient, SdWebUiClient, Txt2ImgRequest};
use sdbatch::config::HttpConfig;
use sdbatch::error::BackendError;
use sdbatch::generation::JobSettings;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::integration::test_utils::EchoImages;

fn client(endpoint: &str) -> SdWebUiClient {
    SdWebUiClient::new(endpoint, &HttpConfig::default()).unwrap()
}

fn request(prompt: &str, seed: u64) -> Txt2ImgRequest {
    let settings = JobSettings {
        negative_prompt: "lowres".to_string(),
        ..JobSettings::default()
    };
    Txt2ImgRequest::new(prompt, seed, &settings.params())
}

#[tokio::test]
async fn test_select_model_posts_full_options_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sdapi/v1/options"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sd_model_checkpoint": "old.safetensors [0f1e2d]",
            "CLIP_stop_at_last_layers": 2,
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sdapi/v1/options"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let selection = client(&server.uri())
        .select_model("new.safetensors")
        .await
        .unwrap();

    assert_eq!(selection.previous.as_deref(), Some("old.safetensors [0f1e2d]"));
    // This fake never switches, so the confirmation read still reports the old model
    assert_eq!(selection.active.as_deref(), Some("old.safetensors [0f1e2d]"));
    assert!(!selection.confirmed());

    let requests = server.received_requests().await.unwrap();
    let posted: Vec<Value> = requests
        .iter()
        .filter(|r| r.method.to_string() == "POST")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0]["sd_model_checkpoint"], "new.safetensors");
    assert_eq!(posted[0]["CLIP_stop_at_last_layers"], 2);

    let gets = requests
        .iter()
        .filter(|r| r.method.to_string() == "GET")
        .count();
    assert_eq!(gets, 2, "options are read before and after the switch");
}

#[tokio::test]
async fn test_select_model_reports_unavailable_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sdapi/v1/options"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client(&server.uri()).select_model("m.safetensors").await;
    assert!(matches!(result, Err(BackendError::Unavailable(_))));
}

#[tokio::test]
async fn test_generate_sends_parameters_and_decodes_images() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sdapi/v1/txt2img"))
        .respond_with(EchoImages {
            failing_seeds: vec![],
        })
        .mount(&server)
        .await;

    // Trailing slash must not produce `//sdapi`
    let endpoint = format!("{}/", server.uri());
    let images = client(&endpoint)
        .generate(&request("a red fox", 1234))
        .await
        .unwrap();
    assert_eq!(images, vec![b"a red fox:1234".to_vec()]);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/sdapi/v1/txt2img");
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body,
        json!({
            "seed": 1234,
            "prompt": "a red fox",
            "width": 1024,
            "height": 1024,
            "cfg_scale": 7.0,
            "steps": 25,
            "sampler_name": "DPM++ 2M Karras",
            "negative_prompt": "lowres",
        })
    );
}

#[tokio::test]
async fn test_generate_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sdapi/v1/txt2img"))
        .respond_with(EchoImages {
            failing_seeds: vec![7],
        })
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .generate(&request("cat", 7))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    assert!(err.to_string().contains("CUDA out of memory"));
}

#[tokio::test]
async fn test_generate_rejects_unexpected_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sdapi/v1/txt2img"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "detail": "Not Found" })))
        .mount(&server)
        .await;

    let result = client(&server.uri()).generate(&request("cat", 1)).await;
    assert!(matches!(result, Err(BackendError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_generate_with_zero_images() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sdapi/v1/txt2img"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "images": [] })))
        .mount(&server)
        .await;

    let images = client(&server.uri())
        .generate(&request("cat", 1))
        .await
        .unwrap();
    assert!(images.is_empty());
}

#[tokio::test]
async fn test_request_timeout_is_enforced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sdapi/v1/txt2img"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "images": [] }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let http = HttpConfig {
        connect_timeout_secs: 1,
        request_timeout_secs: 1,
    };
    let client = SdWebUiClient::new(&server.uri(), &http).unwrap();
    let result = client.generate(&request("cat", 1)).await;
    match result {
        Err(BackendError::Unavailable(msg)) => assert!(msg.contains("timeout")),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let result = client("http://127.0.0.1:1")
        .select_model("m.safetensors")
        .await;
    assert!(matches!(result, Err(BackendError::Unavailable(_))));
}
