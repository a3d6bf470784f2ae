use bundlewright::core::error::AppError;
use bundlewright::core::pipeline::graph::Slot;
use bundlewright::core::pipeline::operators::default_registry;
use bundlewright::core::pipeline::placeholder::{Reference, references_in};
use bundlewright::core::pipeline::{PipelineDocument, ReferenceGraph, ResolvedPipeline};
use serde_json::{json, Value};

fn config() -> Value {
    json!({
        "build": { "prepare": { "outdir": "build/prepare" }, "compile": { "outdir": "build/compile" } },
        "app": { "files": { "js": ["app/**/*.js", "!app/**/*.spec.js"] } },
        "project": { "name": "shop", "version": "1.0.0" }
    })
}

fn load(yaml: &str) -> Result<(ReferenceGraph, ResolvedPipeline), AppError> {
    let doc = PipelineDocument::parse(yaml)?;
    let config = config();
    let graph = ReferenceGraph::build(&doc, &config, &default_registry())?;
    let resolved = graph.resolve(&doc, &config)?;
    Ok((graph, resolved))
}

fn load_err(yaml: &str) -> AppError {
    load(yaml).err().expect("pipeline should be rejected")
}

#[test]
fn test_options_resolve_through_chains_in_any_declaration_order() {
    let (_, resolved) = load(
        r#"
version: "1"
meta:
  banner: '/*! <%= config.project.name %> v<%= config.project.version %> */'
steps:
  concat.late:
    options:
      out: '<%= copy.early.options.out %>/all.js'
      banner: '<%= meta.banner %>'
    files:
      - src: '<%= copy.early.options.out %>/*.js'
        dest: '<%= concat.late.options.out %>'
  copy.early:
    options:
      out: '<%= config.build.prepare.outdir %>/js'
    files:
      - expand: true
        src: '<%= config.app.files.js %>'
        dest: '<%= copy.early.options.out %>'
"#,
    )
    .unwrap();

    let late = &resolved.steps["concat.late"];
    assert_eq!(late.options["out"], "build/prepare/js/all.js");
    assert_eq!(late.options["banner"], "/*! shop v1.0.0 */");
    assert_eq!(late.files[0].patterns(), vec!["build/prepare/js/*.js"]);
    assert_eq!(late.files[0].dest.as_deref(), Some("build/prepare/js/all.js"));

    let early = &resolved.steps["copy.early"];
    assert_eq!(
        early.files[0].patterns(),
        vec!["app/**/*.js", "!app/**/*.spec.js"]
    );
    assert_eq!(resolved.meta["banner"], "/*! shop v1.0.0 */");
}

#[test]
fn test_embedded_lists_render_comma_joined() {
    let (_, resolved) = load(
        r#"
version: "1"
steps:
  clean.all:
    params: ['<%= config.build.prepare.outdir %>', 'x-<%= config.app.files.js %>']
"#,
    )
    .unwrap();
    assert_eq!(
        resolved.steps["clean.all"].params,
        json!(["build/prepare", "x-app/**/*.js,!app/**/*.spec.js"])
    );
}

#[test]
fn test_dangling_references_name_the_reader() {
    let missing_config = load_err(
        "version: \"1\"\nsteps:\n  clean.a:\n    params: ['<%= config.build.nope %>']\n",
    );
    assert_eq!(missing_config.code, "BW-REF-002");
    assert!(missing_config.message.contains("no such configuration key"));
    assert_eq!(
        missing_config.context.get("slot").map(String::as_str),
        Some("clean.a")
    );

    let missing_step = load_err(
        "version: \"1\"\nsteps:\n  clean.a:\n    params: ['<%= copy.ghost.options.out %>']\n",
    );
    assert!(missing_step.message.contains("no such step"));

    let missing_option = load_err(
        "version: \"1\"\nsteps:\n  copy.b:\n    options: {out: x}\n    files: []\n  clean.a:\n    params: ['<%= copy.b.options.dest %>']\n",
    );
    assert!(missing_option.message.contains("declares no such option"));

    let missing_output = load_err(
        "version: \"1\"\nsteps:\n  copy.b:\n    files: []\n  clean.a:\n    params: ['<%= copy.b.outputs.dir %>']\n",
    );
    assert!(missing_output.message.contains("publishes no such output"));
}

#[test]
fn test_malformed_placeholder_is_rejected() {
    let err = load_err("version: \"1\"\nsteps:\n  clean.a:\n    params: ['<%= build outdir %>']\n");
    assert_eq!(err.code, "BW-REF-001");

    let err = load_err("version: \"1\"\nsteps:\n  clean.a:\n    params: ['<%= copy.b.files.x %>']\n");
    assert_eq!(err.code, "BW-REF-001");
}

#[test]
fn test_cycles_are_rejected() {
    let err = load_err(
        r#"
version: "1"
steps:
  copy.a:
    options:
      out: '<%= copy.b.options.out %>'
    files: []
  copy.b:
    options:
      out: '<%= copy.a.options.out %>/x'
    files: []
"#,
    );
    assert_eq!(err.code, "BW-REF-003");
    assert!(err.message.contains("copy.a.options.out"));
    assert!(err.message.contains("copy.b.options.out"));

    let err = load_err(
        "version: \"1\"\nsteps:\n  copy.a:\n    options:\n      out: '<%= copy.a.options.out %>'\n    files: []\n",
    );
    assert_eq!(err.code, "BW-REF-003");
}

#[test]
fn test_a_step_may_read_its_own_options() {
    let (graph, resolved) = load(
        r#"
version: "1"
steps:
  copy.self:
    options:
      out: '<%= config.build.compile.outdir %>'
    files:
      - src: a.js
        dest: '<%= copy.self.options.out %>/a.js'
"#,
    )
    .unwrap();
    assert_eq!(
        resolved.steps["copy.self"].files[0].dest.as_deref(),
        Some("build/compile/a.js")
    );
    let deps = graph.dependencies_of(&Slot::Step("copy.self".to_string()));
    assert!(deps.contains(&Slot::Option {
        step: "copy.self".to_string(),
        key: "out".to_string()
    }));
}

#[test]
fn test_runtime_outputs_survive_static_resolution() {
    let (graph, resolved) = load(
        r#"
version: "1"
steps:
  fingerprint.out:
    options:
      root: '<%= config.build.compile.outdir %>'
  copy.busted:
    options:
      out: '<%= config.build.compile.outdir %>/<%= fingerprint.out.outputs.dir %>'
    files:
      - expand: true
        cwd: '<%= config.build.compile.outdir %>'
        src: ['**']
        dest: '<%= copy.busted.options.out %>'
"#,
    )
    .unwrap();

    let busted = &resolved.steps["copy.busted"];
    assert_eq!(
        busted.options["out"],
        "build/compile/<%= fingerprint.out.outputs.dir %>"
    );
    assert_eq!(
        busted.files[0].dest.as_deref(),
        Some("build/compile/<%= fingerprint.out.outputs.dir %>")
    );
    assert_eq!(
        resolved.runtime_references("copy.busted").unwrap(),
        vec![Reference::StepOutput {
            step: "fingerprint.out".to_string(),
            key: "dir".to_string()
        }]
    );
    assert!(resolved.runtime_references("fingerprint.out").unwrap().is_empty());

    let dot = graph.to_dot();
    assert!(dot.contains("fingerprint.out.outputs.dir"));
    assert!(dot.contains("runtime"));
}

#[test]
fn test_reference_parsing() {
    let refs = references_in("<%= config.a.b %>/<%= meta.banner %>-<%= copy.x.outputs.dir %>").unwrap();
    assert_eq!(
        refs,
        vec![
            Reference::Config("a.b".to_string()),
            Reference::Meta("banner".to_string()),
            Reference::StepOutput {
                step: "copy.x".to_string(),
                key: "dir".to_string()
            },
        ]
    );
    assert_eq!(refs[2].to_string(), "copy.x.outputs.dir");
    assert!(Reference::parse("config").is_err());
}
