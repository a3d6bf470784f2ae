use bundlewright::core::config::loader::CONFIG_FILE_NAME;
use bundlewright::core::config::{BuildConfig, ConfigLoader, ConfigValidator};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

fn clear_env() {
    for var in [
        "BUNDLEWRIGHT_PROJECT_NAME",
        "BUNDLEWRIGHT_PREPARE_OUTDIR",
        "BUNDLEWRIGHT_COMPILE_OUTDIR",
        "BUNDLEWRIGHT_CACHE_BUSTING_DIR",
        "BUNDLEWRIGHT_BANNER",
        "BUNDLEWRIGHT_APP_MODULE",
    ] {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_full_config_file_round_trips_through_loader() {
    clear_env();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"
[project]
name = "storefront"
version = "2.4.0"

[build.prepare]
outdir = "tmp/stage"

[build.compile]
outdir = "dist"
cache_busting_dir = "r42"

[app]
source_dir = "client"
index = "client/index.html"

[app.angular_module]
regular = "shop"

[app.files]
js = ["app/**/*.js"]

[vendor]
dir = "bower_components"

[vendor.files]
js = ["angular/angular.js", "angular-translate/angular-translate.js"]

[meta]
banner = "/* shop */\n"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_workspace(dir.path()).unwrap();
    ConfigValidator::validate(&config).unwrap();

    assert_eq!(config.project.name, "storefront");
    assert_eq!(config.build.prepare.outdir, "tmp/stage");
    assert_eq!(config.build.compile.cache_busting_dir, "r42");
    assert_eq!(config.app.source_dir, "client");
    assert_eq!(config.app.angular_module.regular, "shop");
    assert_eq!(config.app.angular_module.templates, "templates-app");
    assert_eq!(config.app.files.js, vec!["app/**/*.js"]);
    assert_eq!(config.app.files.css, vec!["styles/**/*.css"]);
    assert_eq!(config.vendor.files.js.len(), 2);
    assert_eq!(config.effective_banner(), "/* shop */\n");
}

#[test]
#[serial]
fn test_explicit_missing_file_falls_back_to_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let config = ConfigLoader::load_with_overrides(&dir.path().join("nope.toml")).unwrap();
    assert_eq!(config.project.name, "web-app");
    assert!(ConfigLoader::load_from_file(&dir.path().join("nope.toml"))
        .unwrap()
        .is_none());
}

#[test]
#[serial]
fn test_env_overrides_apply_on_top_of_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[project]\nname = \"from-file\"\n",
    )
    .unwrap();
    env::set_var("BUNDLEWRIGHT_PROJECT_NAME", "from-env");
    env::set_var("BUNDLEWRIGHT_APP_MODULE", "envApp");
    env::set_var("BUNDLEWRIGHT_BANNER", "/* env */\n");

    let config = ConfigLoader::load_from_workspace(dir.path()).unwrap();
    clear_env();

    assert_eq!(config.project.name, "from-env");
    assert_eq!(config.app.angular_module.regular, "envApp");
    assert_eq!(config.meta.banner, "/* env */\n");
}

#[test]
fn test_env_documentation_lists_every_override() {
    let docs = ConfigLoader::env_var_documentation();
    assert!(docs.iter().any(|line| line.starts_with("BUNDLEWRIGHT_CACHE_BUSTING_DIR")));
    assert!(docs.iter().any(|line| line.starts_with("BUNDLEWRIGHT_COMPILE_OUTDIR")));
}

#[test]
fn test_default_banner_uses_name_and_version() {
    let mut config = BuildConfig::default();
    config.project.name = "shop".to_string();
    config.project.version = "1.2.3".to_string();
    assert_eq!(config.effective_banner(), "/*! shop - v1.2.3 */\n");
}

#[test]
fn test_placeholder_value_exposes_effective_banner() {
    let config = BuildConfig::default();
    let value = config.placeholder_value();
    assert_eq!(value["meta"]["banner"], "/*! web-app - v0.0.1 */\n");
    assert_eq!(value["build"]["compile"]["outdir"], "build/compile");
    assert_eq!(value["app"]["files"]["js"][1], "!app/**/*.spec.js");
}

#[test]
fn test_validator_rejects_overlapping_outdirs() {
    let mut config = BuildConfig::default();
    config.build.prepare.outdir = "build".to_string();
    config.build.compile.outdir = "build/compile".to_string();
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert_eq!(err.code, "BW-CFG-002");
    assert!(err.message.contains("must not overlap"));
}

#[test]
fn test_validator_rejects_escaping_outdir() {
    let mut config = BuildConfig::default();
    config.build.compile.outdir = "../public".to_string();
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert!(err.message.contains("build.compile.outdir"));
}

#[test]
fn test_validator_rejects_bad_cache_busting_dir() {
    for name in ["a/b", "..", "index.html"] {
        let mut config = BuildConfig::default();
        config.build.compile.cache_busting_dir = name.to_string();
        assert!(ConfigValidator::validate(&config).is_err(), "{} accepted", name);
    }
}

#[test]
fn test_validator_rejects_empty_module_and_bad_patterns() {
    let mut config = BuildConfig::default();
    config.app.angular_module.templates = " ".to_string();
    assert!(ConfigValidator::validate(&config)
        .unwrap_err()
        .message
        .contains("app.angular_module.templates"));

    let mut config = BuildConfig::default();
    config.common.files.js = vec!["common/{a,b.js".to_string()];
    assert!(ConfigValidator::validate(&config)
        .unwrap_err()
        .message
        .contains("common.files.js"));
}
