use bundlewright::core::assets::{content_fingerprint, rewrite_references};
use bundlewright::core::pipeline::{build_plan, execute_plan, load_pipeline, PipelineSource};
use regex::Regex;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A compile directory as the compile stage leaves it before cache busting.
fn compiled_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "build/compile/index.html",
        "<html><head><link rel=\"stylesheet\" href=\"main.css\"></head>\
         <body><script src=\"main.js\"></script></body></html>",
    );
    write(
        root,
        "build/compile/main.js",
        "angular.module('app',[]);$http.get('en.json');",
    );
    write(root, "build/compile/main.css", "body{background:url(assets/bg.png)}");
    write(root, "build/compile/en.json", "{\"TITLE\":\"Hello\"}");
    write(
        root,
        "build/compile/app/home/home.html",
        "<img src=\"assets/logo.png\">",
    );
    write(root, "build/compile/assets/logo.png", "png");
    write(root, "build/compile/assets/bg.png", "bg");
    dir
}

fn clear_env() {
    for key in [
        "BUNDLEWRIGHT_CACHE_BUSTING_DIR",
        "BUNDLEWRIGHT_COMPILE_OUTDIR",
        "BUNDLEWRIGHT_PREPARE_OUTDIR",
        "BUNDLEWRIGHT_PROJECT_NAME",
        "BUNDLEWRIGHT_BANNER",
        "BUNDLEWRIGHT_APP_MODULE",
    ] {
        env::remove_var(key);
    }
}

async fn run_cache_busting(root: &Path) {
    let loaded = load_pipeline(&PipelineSource::new(root)).unwrap();
    let plan = build_plan(&loaded.resolved, "cacheBusting").unwrap();
    let summary = execute_plan(&loaded.resolved, &plan, &loaded.registry, root).await;
    assert!(summary.succeeded(), "{:?}", summary.error);
}

fn top_level(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn fingerprint_ignores_listing_order() {
    let a = ("main.js".to_string(), b"js".to_vec());
    let b = ("main.css".to_string(), b"css".to_vec());
    let first = content_fingerprint(&[a.clone(), b.clone()]);
    let second = content_fingerprint(&[b, a]);
    assert_eq!(first, second);
    assert!(Regex::new(r"^v[0-9a-f]{10}$").unwrap().is_match(&first));
}

#[test]
fn fingerprint_depends_on_paths_and_content() {
    let base = content_fingerprint(&[("main.js".to_string(), b"js".to_vec())]);
    let renamed = content_fingerprint(&[("app.js".to_string(), b"js".to_vec())]);
    let edited = content_fingerprint(&[("main.js".to_string(), b"js2".to_vec())]);
    assert_ne!(base, renamed);
    assert_ne!(base, edited);
}

#[test]
fn rewrite_leaves_prefixed_and_nested_references_alone() {
    let entries = vec!["main.js".to_string(), "assets/".to_string()];
    let text = "<script src=\"v1/main.js\"></script><img src=\"vendor/assets/x.png\"><img src=\"assets/y.png\">";
    let result = rewrite_references(text, &entries, "v1");
    assert_eq!(
        result.text,
        "<script src=\"v1/main.js\"></script><img src=\"vendor/assets/x.png\"><img src=\"v1/assets/y.png\">"
    );
    assert_eq!(result.replacements, 1);
}

#[tokio::test]
#[serial]
async fn cache_busting_moves_output_under_content_hash() {
    clear_env();
    let dir = compiled_project();
    let compile = dir.path().join("build/compile");
    run_cache_busting(dir.path()).await;

    let names = top_level(&compile);
    assert_eq!(names.len(), 2, "{:?}", names);
    assert_eq!(names[0], "index.html");
    let busted = &names[1];
    assert!(Regex::new(r"^v[0-9a-f]{10}$").unwrap().is_match(busted), "{}", busted);

    let index = fs::read_to_string(compile.join("index.html")).unwrap();
    assert!(index.contains(&format!("href=\"{}/main.css\"", busted)));
    assert!(index.contains(&format!("src=\"{}/main.js\"", busted)));

    let moved = compile.join(busted);
    assert!(moved.join("assets/logo.png").is_file());
    assert!(moved.join("en.json").is_file());
    let main_js = fs::read_to_string(moved.join("main.js")).unwrap();
    assert!(main_js.contains(&format!("'{}/en.json'", busted)));
    let template = fs::read_to_string(moved.join("app/home/home.html")).unwrap();
    assert_eq!(template, format!("<img src=\"{}/assets/logo.png\">", busted));
}

#[tokio::test]
#[serial]
async fn same_content_yields_same_directory() {
    clear_env();
    let first = compiled_project();
    let second = compiled_project();
    run_cache_busting(first.path()).await;
    run_cache_busting(second.path()).await;
    assert_eq!(
        top_level(&first.path().join("build/compile")),
        top_level(&second.path().join("build/compile"))
    );
}

#[tokio::test]
#[serial]
async fn configured_directory_name_is_used() {
    clear_env();
    let dir = compiled_project();
    write(
        dir.path(),
        "bundlewright.toml",
        "[project]\nname = \"shop\"\nversion = \"1.0.0\"\n\n[build.compile]\ncache_busting_dir = \"release-7\"\n",
    );
    run_cache_busting(dir.path()).await;

    let compile = dir.path().join("build/compile");
    assert_eq!(top_level(&compile), vec!["index.html", "release-7"]);
    let index = fs::read_to_string(compile.join("index.html")).unwrap();
    assert!(index.contains("src=\"release-7/main.js\""));
}

#[tokio::test]
#[serial]
async fn environment_overrides_directory_name() {
    clear_env();
    let dir = compiled_project();
    env::set_var("BUNDLEWRIGHT_CACHE_BUSTING_DIR", "pinned");
    let loaded = load_pipeline(&PipelineSource::new(dir.path()));
    env::remove_var("BUNDLEWRIGHT_CACHE_BUSTING_DIR");
    let loaded = loaded.unwrap();

    let plan = build_plan(&loaded.resolved, "cacheBusting").unwrap();
    let summary = execute_plan(&loaded.resolved, &plan, &loaded.registry, dir.path()).await;
    assert!(summary.succeeded());
    assert!(dir.path().join("build/compile/pinned/main.js").is_file());
}

#[tokio::test]
#[serial]
async fn running_again_with_configured_name_changes_nothing() {
    clear_env();
    let dir = compiled_project();
    write(
        dir.path(),
        "bundlewright.toml",
        "[project]\nname = \"shop\"\nversion = \"1.0.0\"\n\n[build.compile]\ncache_busting_dir = \"release-7\"\n",
    );
    let compile = dir.path().join("build/compile");
    run_cache_busting(dir.path()).await;
    let index_once = fs::read_to_string(compile.join("index.html")).unwrap();
    let main_once = fs::read_to_string(compile.join("release-7/main.js")).unwrap();

    run_cache_busting(dir.path()).await;

    assert_eq!(top_level(&compile), vec!["index.html", "release-7"]);
    assert!(!compile.join("release-7/release-7").exists());
    let index = fs::read_to_string(compile.join("index.html")).unwrap();
    assert_eq!(index, index_once);
    assert!(!index.contains("release-7/release-7"));
    assert_eq!(
        fs::read_to_string(compile.join("release-7/main.js")).unwrap(),
        main_once
    );
}

#[tokio::test]
#[serial]
async fn running_again_keeps_the_content_hash_directory() {
    clear_env();
    let dir = compiled_project();
    let compile = dir.path().join("build/compile");
    run_cache_busting(dir.path()).await;
    let first = top_level(&compile);
    let busted = first[1].clone();

    run_cache_busting(dir.path()).await;

    assert_eq!(top_level(&compile), first);
    assert_eq!(
        top_level(&compile.join(&busted)),
        vec!["app", "assets", "en.json", "main.css", "main.js"]
    );
    let index = fs::read_to_string(compile.join("index.html")).unwrap();
    assert!(index.contains(&format!("src=\"{}/main.js\"", busted)));
    assert!(!index.contains(&format!("{}/{}", busted, busted)));
    let template = fs::read_to_string(compile.join(&busted).join("app/home/home.html")).unwrap();
    assert_eq!(template, format!("<img src=\"{}/assets/logo.png\">", busted));
}
