//! End-to-end runs through `RunContext` against fake WebUI servers

use sdbatch::cli::{Commands, OutputFormat, RunContext, RunOptions};
use sdbatch::config::AppConfig;
use sdbatch::error::ApiError;
use serde_json::Value;
use tokio::runtime::Runtime;
use wiremock::MockServer;

use crate::integration::test_utils::{start_webui, txt2img_calls, JobWorkspace};

fn run(
    workspace: &JobWorkspace,
    endpoints: Vec<String>,
    options: RunOptions,
    format: OutputFormat,
) -> Result<String, ApiError> {
    let config = AppConfig {
        endpoints,
        ..AppConfig::default()
    };
    RunContext::with_config(workspace.path().to_path_buf(), config).execute(&Commands::Run {
        endpoints: vec![],
        settings: vec![],
        options,
        format,
    })
}

fn run_text(workspace: &JobWorkspace, server: &MockServer) -> Result<String, ApiError> {
    run(workspace, vec![server.uri()], RunOptions::default(), OutputFormat::Text)
}

fn read(workspace: &JobWorkspace, relative: &str) -> String {
    String::from_utf8(std::fs::read(workspace.path().join(relative)).unwrap()).unwrap()
}

#[test]
fn test_two_prompts_two_generations_each() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(start_webui(vec![]));
    let workspace = JobWorkspace::new(&["cat", "dog"], &[1, 2, 3]);
    workspace.add_settings("settings_m.json", "m.safetensors", 2);

    let output = run_text(&workspace, &server).unwrap();
    assert!(output.contains("1 completed"));

    for prompt in ["cat", "dog"] {
        let dir = format!("generations_on_m/{}", prompt);
        assert_eq!(
            workspace.files_in(&dir),
            vec!["image_1_seed_1.png", "image_2_seed_2.png"]
        );
        assert_eq!(
            read(&workspace, &format!("{}/image_2_seed_2.png", dir)),
            format!("{}:2", prompt)
        );
    }
    assert_eq!(rt.block_on(txt2img_calls(&server)), 4);
}

#[test]
fn test_jobs_spread_over_endpoint_pool() {
    let rt = Runtime::new().unwrap();
    let first = rt.block_on(start_webui(vec![]));
    let second = rt.block_on(start_webui(vec![]));
    let workspace = JobWorkspace::new(&["cat", "dog"], &[1, 2]);
    workspace.add_settings("settings_a.json", "a.safetensors", 2);
    workspace.add_settings("settings_b.json", "b.safetensors", 2);
    workspace.add_settings("settings_c.json", "c.ckpt", 2);

    let output = run(
        &workspace,
        vec![first.uri(), second.uri()],
        RunOptions::default(),
        OutputFormat::Json,
    )
    .unwrap();

    let summary: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(summary["completed"], 3);
    assert_eq!(summary["images_written"], 12);
    let jobs = summary["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 3);
    for job in jobs {
        let endpoint = job["endpoint"].as_str().unwrap();
        assert!(endpoint == first.uri() || endpoint == second.uri());
    }

    let total = rt.block_on(txt2img_calls(&first)) + rt.block_on(txt2img_calls(&second));
    assert_eq!(total, 12, "each settings file runs exactly once");
    for model in ["a", "b", "c"] {
        assert_eq!(
            workspace
                .files_in(&format!("generations_on_{}/cat", model))
                .len(),
            2
        );
    }
}

#[test]
fn test_failed_generation_is_skipped_and_run_succeeds() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(start_webui(vec![1]));
    let workspace = JobWorkspace::new(&["cat"], &[1, 2]);
    workspace.add_settings("settings_m.json", "m.safetensors", 2);

    let output = run_text(&workspace, &server).unwrap();
    assert!(output.contains("2 generations, 1 failed, 1 images"));
    assert_eq!(
        workspace.files_in("generations_on_m/cat"),
        vec!["image_1_seed_2.png"]
    );
}

#[test]
fn test_seed_exhaustion_reported() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(start_webui(vec![]));
    let workspace = JobWorkspace::new(&["cat", "dog"], &[5, 6]);
    workspace.add_settings("settings_m.json", "m.safetensors", 3);

    let output = run_text(&workspace, &server).unwrap();
    assert!(output.contains("seeds exhausted for 2 prompt(s)"));
    assert_eq!(workspace.files_in("generations_on_m/dog").len(), 2);
}

#[test]
fn test_existing_output_policies() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(start_webui(vec![]));
    let workspace = JobWorkspace::new(&["cat"], &[1, 2]);
    workspace.add_settings("settings_m.json", "m.safetensors", 2);

    run_text(&workspace, &server).unwrap();

    let skip = RunOptions {
        skip_existing: true,
        ..RunOptions::default()
    };
    let output = run(&workspace, vec![server.uri()], skip, OutputFormat::Text).unwrap();
    assert!(output.contains("1 skipped"));
    assert_eq!(workspace.files_in("generations_on_m/cat").len(), 2);

    let yes = RunOptions {
        yes: true,
        ..RunOptions::default()
    };
    run(&workspace, vec![server.uri()], yes, OutputFormat::Text).unwrap();
    assert_eq!(
        workspace.files_in("generations_on_m/cat"),
        vec![
            "image_1_seed_1.png",
            "image_2_seed_2.png",
            "image_3_seed_1.png",
            "image_4_seed_2.png",
        ]
    );
}

#[test]
fn test_input_errors_fail_the_run_but_not_other_jobs() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(start_webui(vec![]));
    let workspace = JobWorkspace::new(&["cat"], &[1]);
    std::fs::write(workspace.path().join("settings_broken.json"), "{ nope").unwrap();
    workspace.add_settings("settings_ok.json", "m.safetensors", 1);

    match run_text(&workspace, &server) {
        Err(ApiError::RunFailed(report)) => {
            assert!(report.contains("settings_broken.json [http"));
            assert!(report.contains("aborted: Configuration error"));
            assert!(report.contains("1 completed"));
        }
        other => panic!("expected failed run, got {:?}", other),
    }
    assert!(workspace
        .path()
        .join("generations_on_m/cat/image_1_seed_1.png")
        .is_file());
}

#[test]
fn test_missing_prompt_file_fails_run() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(start_webui(vec![]));
    let workspace = JobWorkspace::new(&["cat"], &[1]);
    workspace.add_settings("settings_m.json", "m.safetensors", 1);
    std::fs::remove_file(workspace.path().join("prompts.json")).unwrap();

    let result = run_text(&workspace, &server);
    assert!(matches!(result, Err(ApiError::RunFailed(_))));
    assert_eq!(rt.block_on(txt2img_calls(&server)), 0);
}

#[test]
fn test_run_one_uses_endpoint_from_settings() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(start_webui(vec![]));
    let workspace = JobWorkspace::new(&["cat"], &[9, 8]);
    std::fs::write(
        workspace.path().join("legacy.json"),
        serde_json::json!({
            "backend_api": server.uri(),
            "model_name": "m.safetensors",
            "number_of_generations_per_prompt": 2,
        })
        .to_string(),
    )
    .unwrap();

    let output = RunContext::with_config(workspace.path().to_path_buf(), AppConfig::default())
        .execute(&Commands::RunOne {
            settings: "legacy.json".into(),
            options: RunOptions::default(),
        })
        .unwrap();

    assert!(output.starts_with("legacy.json"));
    assert_eq!(
        workspace.files_in("generations_on_m/cat"),
        vec!["image_1_seed_9.png", "image_2_seed_8.png"]
    );
}
