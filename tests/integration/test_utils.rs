//! Shared test utilities for integration tests
//!
//! Environment isolation for config loading, a throwaway job workspace, and a fake
//! WebUI server built on wiremock.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const ENV_KEYS: [&str; 5] = [
    "HOME",
    "XDG_CONFIG_HOME",
    "SDBATCH_ENV",
    "SDBATCH__POLICY__EXISTING_OUTPUT",
    "SDBATCH__ENDPOINTS",
];

/// Environment variable state to restore after test
struct EnvState {
    values: Vec<(&'static str, Option<String>)>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            values: ENV_KEYS
                .iter()
                .map(|key| (*key, std::env::var(key).ok()))
                .collect(),
        }
    }

    fn restore(self) {
        for (key, value) in self.values {
            match value {
                Some(orig) => std::env::set_var(key, orig),
                None => std::env::remove_var(key),
            }
        }
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into `test_dir`
///
/// Holds a global mutex so parallel tests never observe each other's variables, and
/// restores the original environment afterwards. Extra variables in `vars` are set for
/// the duration of the call.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_home).unwrap();
    std::env::set_var("HOME", test_home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path().to_str().unwrap());
    std::env::remove_var("SDBATCH_ENV");
    std::env::remove_var("SDBATCH__POLICY__EXISTING_OUTPUT");
    std::env::remove_var("SDBATCH__ENDPOINTS");
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let result = f();

    env_state.restore();

    result
}

/// A directory holding the seed file, prompt file and settings files of a run
pub struct JobWorkspace {
    pub dir: TempDir,
}

impl JobWorkspace {
    pub fn new(prompts: &[&str], seeds: &[u64]) -> Self {
        let dir = TempDir::new().unwrap();
        let seed_lines: Vec<String> = seeds.iter().map(u64::to_string).collect();
        std::fs::write(dir.path().join("random_seeds.txt"), seed_lines.join("\n")).unwrap();
        std::fs::write(
            dir.path().join("prompts.json"),
            json!({ "prompts": prompts }).to_string(),
        )
        .unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn add_settings(&self, name: &str, model: &str, generations: u32) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(
            &path,
            json!({
                "model_identifier": model,
                "width": 512,
                "height": 512,
                "steps": 4,
                "generations_per_prompt": generations,
            })
            .to_string(),
        )
        .unwrap();
        path
    }

    /// Sorted file names directly inside `relative`
    pub fn files_in(&self, relative: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path().join(relative))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// txt2img responder returning one image whose bytes are `<prompt>:<seed>`.
/// Requests for seeds in `failing_seeds` get a 500.
pub struct EchoImages {
    pub failing_seeds: Vec<u64>,
}

impl Respond for EchoImages {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let seed = body["seed"].as_u64().unwrap();
        if self.failing_seeds.contains(&seed) {
            return ResponseTemplate::new(500).set_body_string("CUDA out of memory");
        }
        let prompt = body["prompt"].as_str().unwrap();
        let image = BASE64.encode(format!("{}:{}", prompt, seed));
        ResponseTemplate::new(200).set_body_json(json!({ "images": [image], "info": "{}" }))
    }
}

/// Start a fake WebUI: options endpoints plus an echoing txt2img
pub async fn start_webui(failing_seeds: Vec<u64>) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sdapi/v1/options"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "sd_model_checkpoint": "m.safetensors" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sdapi/v1/options"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Null))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sdapi/v1/txt2img"))
        .respond_with(EchoImages { failing_seeds })
        .mount(&server)
        .await;
    server
}

/// Number of txt2img calls the server received
pub async fn txt2img_calls(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/sdapi/v1/txt2img")
        .count()
}
