use bundlewright::core::error::AppError;
use bundlewright::core::pipeline::explain::build_explain_output;
use bundlewright::core::pipeline::operators::default_registry;
use bundlewright::core::pipeline::{
    build_plan, execute_plan, ExecutionPlan, PipelineDocument, ReferenceGraph, ResolvedPipeline,
};
use bundlewright::core::types::StepStatus;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const PIPELINE: &str = r#"
version: "1"
steps:
  clean.out:
    params: [out]
  copy.js:
    files:
      - expand: true
        cwd: src
        src: ['*.js']
        dest: out
  concat.bundle:
    options:
      out: out/bundle.js
    files:
      - src: ['out/a.js', 'out/b.js']
        dest: '<%= concat.bundle.options.out %>'
  fingerprint.out:
    options:
      root: out
  copy.busted:
    files:
      - src: '<%= concat.bundle.options.out %>'
        dest: 'out/<%= fingerprint.out.outputs.dir %>/bundle.js'
tasks:
  prepare: [clean.out, copy.js]
  bundle: [prepare, concat.bundle]
  release: [bundle, fingerprint.out, copy.busted]
  broken: [copy.busted, fingerprint.out]
  loop_a: [loop_b]
  loop_b: [loop_a]
  typo: [prepare, concat.bundel]
  overlap: [prepare, bundle, copy.js, release]
"#;

fn resolve(yaml: &str) -> (ReferenceGraph, ResolvedPipeline) {
    let doc = PipelineDocument::parse(yaml).unwrap();
    let config = json!({});
    let graph = ReferenceGraph::build(&doc, &config, &default_registry()).unwrap();
    let resolved = graph.resolve(&doc, &config).unwrap();
    (graph, resolved)
}

fn plan_err(pipeline: &ResolvedPipeline, target: &str) -> AppError {
    build_plan(pipeline, target)
        .err()
        .expect("plan should be rejected")
}

#[test]
fn test_aliases_expand_depth_first_in_order() {
    let (_, pipeline) = resolve(PIPELINE);
    let plan = build_plan(&pipeline, "release").unwrap();
    assert_eq!(
        plan,
        ExecutionPlan {
            target: "release".to_string(),
            steps: vec![
                "clean.out".to_string(),
                "copy.js".to_string(),
                "concat.bundle".to_string(),
                "fingerprint.out".to_string(),
                "copy.busted".to_string(),
            ],
        }
    );
}

#[test]
fn test_repeated_steps_run_once_at_first_position() {
    let (_, pipeline) = resolve(PIPELINE);
    let plan = build_plan(&pipeline, "overlap").unwrap();
    assert_eq!(
        plan.steps,
        vec![
            "clean.out",
            "copy.js",
            "concat.bundle",
            "fingerprint.out",
            "copy.busted",
        ]
    );
}

#[test]
fn test_single_step_is_a_valid_target() {
    let (_, pipeline) = resolve(PIPELINE);
    let plan = build_plan(&pipeline, "concat.bundle").unwrap();
    assert_eq!(plan.steps, vec!["concat.bundle"]);
}

#[test]
fn test_unknown_targets_and_members() {
    let (_, pipeline) = resolve(PIPELINE);
    let err = plan_err(&pipeline, "deploy");
    assert_eq!(err.code, "BW-PLAN-001");
    assert!(err.message.contains("command line"));

    let err = plan_err(&pipeline, "typo");
    assert_eq!(err.code, "BW-PLAN-001");
    assert!(err.message.contains("concat.bundel"));
    assert!(err.message.contains("referenced from typo"));
}

#[test]
fn test_alias_cycles_are_rejected() {
    let (_, pipeline) = resolve(PIPELINE);
    let err = plan_err(&pipeline, "loop_a");
    assert_eq!(err.code, "BW-PLAN-002");
    assert!(err.message.contains("loop_a -> loop_b -> loop_a"));
}

#[test]
fn test_runtime_reader_must_follow_its_producer() {
    let (_, pipeline) = resolve(PIPELINE);
    let err = plan_err(&pipeline, "broken");
    assert_eq!(err.code, "BW-PLAN-003");
    assert!(err.message.contains("fingerprint.out"));
    assert!(!err.recovery_suggestions.is_empty());

    let err = plan_err(&pipeline, "copy.busted");
    assert_eq!(err.code, "BW-PLAN-003");
}

#[test]
fn test_explain_lists_reads_and_pending_outputs() {
    let (graph, pipeline) = resolve(PIPELINE);
    let output = build_explain_output(&pipeline, &graph, "release").unwrap();

    assert_eq!(output.plan.len(), 5);
    let busted = output.steps.iter().find(|step| step.id == "copy.busted").unwrap();
    assert_eq!(busted.kind, "copy");
    assert_eq!(
        busted.reads,
        vec!["concat.bundle.options.out", "fingerprint.out.outputs.dir"]
    );
    assert_eq!(busted.runtime, vec!["fingerprint.out.outputs.dir"]);

    let bundle = output.steps.iter().find(|step| step.id == "concat.bundle").unwrap();
    assert!(bundle.reads.is_empty());
    assert!(output.unscheduled.is_empty());

    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["target"], "release");
    assert!(json["steps"][0].get("description").is_none());
}

#[tokio::test]
async fn test_execution_threads_outputs_into_later_steps() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/a.js"), "var a = 1;").unwrap();
    fs::write(dir.path().join("src/b.js"), "var b = 2;").unwrap();
    fs::create_dir_all(dir.path().join("out")).unwrap();
    fs::write(dir.path().join("out/stale.txt"), "old").unwrap();

    let (_, pipeline) = resolve(PIPELINE);
    let plan = build_plan(&pipeline, "release").unwrap();
    let summary = execute_plan(&pipeline, &plan, &default_registry(), dir.path()).await;

    assert!(summary.succeeded());
    assert_eq!(summary.records.len(), 5);
    assert!(summary
        .records
        .iter()
        .all(|record| record.status == StepStatus::Success));
    assert!(!dir.path().join("out/stale.txt").exists());

    let fingerprint = summary.record("fingerprint.out").unwrap();
    let busted_dir = fingerprint.output["dir"].as_str().unwrap().to_string();
    assert!(busted_dir.starts_with('v'));
    assert_eq!(busted_dir.len(), 11);

    let bundle = fs::read_to_string(dir.path().join("out").join(&busted_dir).join("bundle.js")).unwrap();
    assert_eq!(bundle, "var a = 1;\nvar b = 2;");

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["records"][0]["status"], "success");
    assert!(json.get("error").is_none());
    assert!(summary.into_result().is_ok());
}

#[tokio::test]
async fn test_failure_stops_the_run_and_skips_the_rest() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/a.js"), "var a = 1;").unwrap();

    let (_, pipeline) = resolve(PIPELINE);
    let plan = build_plan(&pipeline, "release").unwrap();
    let summary = execute_plan(&pipeline, &plan, &default_registry(), dir.path()).await;

    assert!(!summary.succeeded());
    let statuses: Vec<StepStatus> = summary.records.iter().map(|record| record.status).collect();
    assert_eq!(
        statuses,
        vec![
            StepStatus::Success,
            StepStatus::Success,
            StepStatus::Failed,
            StepStatus::Skipped,
            StepStatus::Skipped,
        ]
    );
    let failed = summary.record("concat.bundle").unwrap();
    assert_eq!(failed.error_code.as_deref(), Some("BW-GLOB-003"));

    let err = summary.into_result().err().expect("run should fail");
    assert_eq!(err.code, "BW-GLOB-003");
    assert_eq!(err.context.get("step").map(String::as_str), Some("concat.bundle"));
}
