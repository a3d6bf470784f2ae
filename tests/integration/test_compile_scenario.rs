use bundlewright::cli::{init, InitArgs};
use bundlewright::core::pipeline::{build_plan, execute_plan, load_pipeline, PipelineSource};
use bundlewright::core::types::StepStatus;
use regex::Regex;
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

async fn scaffold(root: &Path) {
    init::run(InitArgs {
        path: Some(root.to_path_buf()),
        name: Some("storefront".to_string()),
        force: false,
    })
    .await
    .unwrap();

    let home = root.join("src/app/home");
    fs::create_dir_all(&home).unwrap();
    fs::write(
        home.join("home.tpl.html"),
        "<div class=\"home\">\n  <h1>{{ 'TITLE' | translate }}</h1>\n</div>\n",
    )
    .unwrap();
    fs::write(
        home.join("home.js"),
        "angular.module('app').controller('HomeCtrl', function ($scope, $http) {\n  // greet\n  $scope.title = 'home';\n});\n",
    )
    .unwrap();
    fs::write(
        root.join("src/i18n/de.json"),
        "{\n  \"TITLE\": \"Hallo\"\n}\n",
    )
    .unwrap();
}

fn busted_dir(compile: &Path) -> String {
    let pattern = Regex::new(r"^v[0-9a-f]{10}$").unwrap();
    let mut names: Vec<String> = fs::read_dir(compile)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names.len(), 2, "unexpected compile output: {:?}", names);
    assert_eq!(names[0], "index.html");
    assert!(pattern.is_match(&names[1]), "{}", names[1]);
    names[1].clone()
}

#[tokio::test]
#[serial]
async fn build_produces_cache_busted_bundle() {
    std::env::remove_var("BUNDLEWRIGHT_CACHE_BUSTING_DIR");
    std::env::remove_var("BUNDLEWRIGHT_COMPILE_OUTDIR");
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    scaffold(root).await;

    let loaded = load_pipeline(&PipelineSource::new(root)).unwrap();
    let plan = build_plan(&loaded.resolved, "build").unwrap();
    let summary = execute_plan(&loaded.resolved, &plan, &loaded.registry, root).await;
    assert!(summary.succeeded(), "{:?}", summary.error);
    assert!(summary
        .records
        .iter()
        .all(|record| record.status == StepStatus::Success));

    let compile = root.join("build/compile");
    let busted = busted_dir(&compile);
    let moved = compile.join(&busted);

    let index = fs::read_to_string(compile.join("index.html")).unwrap();
    assert!(index.contains(&format!("src=\"{}/main.js\"", busted)), "{}", index);
    assert!(index.contains(&format!("href=\"{}/main.css\"", busted)), "{}", index);
    assert!(index.contains("ng-app=\"app\""));
    assert!(!index.contains("<%="));

    let main_js = fs::read_to_string(moved.join("main.js")).unwrap();
    assert!(main_js.starts_with("/*! storefront - v0.0.1 */"), "{}", main_js);
    assert!(main_js.contains("$templateCache"));
    assert!(main_js.contains("$translateProvider"));
    assert!(main_js.contains("'$scope'"));
    assert!(!main_js.contains("// greet"));

    let main_css = fs::read_to_string(moved.join("main.css")).unwrap();
    assert!(main_css.starts_with("/*! storefront - v0.0.1 */"));
    assert!(main_css.contains("body{margin:0"));

    assert_eq!(
        fs::read_to_string(moved.join("en.json")).unwrap(),
        "{\"TITLE\":\"Hello\"}"
    );
    assert!(moved.join("de.json").is_file());
    assert!(moved.join("app/home/home.tpl.html").is_file());
    assert!(root.join("build/prepare").is_dir());
}

#[tokio::test]
#[serial]
async fn rebuilding_unchanged_sources_keeps_the_directory_name() {
    std::env::remove_var("BUNDLEWRIGHT_CACHE_BUSTING_DIR");
    std::env::remove_var("BUNDLEWRIGHT_COMPILE_OUTDIR");
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    scaffold(root).await;

    let mut names = Vec::new();
    for _ in 0..2 {
        let loaded = load_pipeline(&PipelineSource::new(root)).unwrap();
        let plan = build_plan(&loaded.resolved, "build").unwrap();
        let summary = execute_plan(&loaded.resolved, &plan, &loaded.registry, root).await;
        assert!(summary.succeeded(), "{:?}", summary.error);
        names.push(busted_dir(&root.join("build/compile")));
    }
    assert_eq!(names[0], names[1]);

    fs::write(root.join("src/styles/main.css"), "body {\n  margin: 1px;\n}\n").unwrap();
    let loaded = load_pipeline(&PipelineSource::new(root)).unwrap();
    let plan = build_plan(&loaded.resolved, "build").unwrap();
    let summary = execute_plan(&loaded.resolved, &plan, &loaded.registry, root).await;
    assert!(summary.succeeded());
    assert_ne!(busted_dir(&root.join("build/compile")), names[0]);
}

#[tokio::test]
#[serial]
async fn compiled_bundle_keeps_concatenation_order() {
    std::env::remove_var("BUNDLEWRIGHT_CACHE_BUSTING_DIR");
    std::env::remove_var("BUNDLEWRIGHT_COMPILE_OUTDIR");
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    scaffold(root).await;

    fs::write(
        root.join("bundlewright.toml"),
        "[project]\nname = \"storefront\"\nversion = \"0.0.1\"\n\n\
         [app.angular_module]\nregular = \"app\"\n\n\
         [vendor]\ndir = \"vendor\"\n\n\
         [vendor.files]\njs = [\"lib/v.js\"]\n",
    )
    .unwrap();
    fs::write(
        root.join("snippets/module.prefix"),
        "(function (window, angular, undefined) {\n  var wrapper = 'PREFIX_MARK';\n",
    )
    .unwrap();
    fs::write(
        root.join("snippets/module.suffix"),
        "  var closing = 'SUFFIX_MARK';\n})(window, window.angular);\n",
    )
    .unwrap();
    fs::create_dir_all(root.join("vendor/lib")).unwrap();
    fs::write(root.join("vendor/lib/v.js"), "window.vendorMark = 'VENDOR_MARK';\n").unwrap();
    fs::create_dir_all(root.join("src/common/util")).unwrap();
    fs::write(
        root.join("src/common/util/c.js"),
        "angular.module('common', []).constant('commonMark', 'COMMON_MARK');\n",
    )
    .unwrap();
    fs::write(
        root.join("src/app/a.js"),
        "angular.module('app').constant('appMark', 'APP_MARK');\n",
    )
    .unwrap();
    fs::write(
        root.join("src/app/home/home.tpl.html"),
        "<p>TEMPLATE_MARK</p>\n",
    )
    .unwrap();
    fs::write(
        root.join("src/i18n/en.json"),
        "{\n  \"TITLE\": \"TRANSLATION_MARK\"\n}\n",
    )
    .unwrap();

    let loaded = load_pipeline(&PipelineSource::new(root)).unwrap();
    let plan = build_plan(&loaded.resolved, "build").unwrap();
    let summary = execute_plan(&loaded.resolved, &plan, &loaded.registry, root).await;
    assert!(summary.succeeded(), "{:?}", summary.error);

    let compile = root.join("build/compile");
    let busted = busted_dir(&compile);
    let main_js = fs::read_to_string(compile.join(&busted).join("main.js")).unwrap();
    assert!(main_js.starts_with("/*! storefront - v0.0.1 */"), "{}", main_js);

    let markers = [
        "VENDOR_MARK",
        "PREFIX_MARK",
        "COMMON_MARK",
        "APP_MARK",
        "TEMPLATE_MARK",
        "TRANSLATION_MARK",
        "SUFFIX_MARK",
    ];
    let positions: Vec<usize> = markers
        .iter()
        .map(|marker| {
            main_js
                .find(marker)
                .unwrap_or_else(|| panic!("{} missing from bundle:\n{}", marker, main_js))
        })
        .collect();
    for (pair, window) in markers.windows(2).zip(positions.windows(2)) {
        assert!(window[0] < window[1], "{} should precede {}:\n{}", pair[0], pair[1], main_js);
    }
    assert_eq!(main_js.matches("VENDOR_MARK").count(), 1);
}
