use crate::cli::args::InitArgs;
use crate::core::config::loader::CONFIG_FILE_NAME;
use crate::Result;
use anyhow::{anyhow, Context};
use std::fs;
use std::path::{Path, PathBuf};

const MODULE_PREFIX: &str = "(function (window, angular, undefined) {\n";
const MODULE_SUFFIX: &str = "})(window, window.angular);\n";

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html ng-app="<%= angular_module %>">
  <head>
    <meta charset="utf-8">
    <title>{name}</title>
    <%= styles %>
  </head>
  <body>
    <div ng-view></div>
    <%= scripts %>
  </body>
</html>
"#;

const APP_MODULE: &str = r#"angular.module('app', ['templates-app', 'translations-app'])
  .controller('AppCtrl', function ($scope) {
    $scope.ready = true;
  });
"#;

const STYLESHEET: &str = "body {\n  margin: 0;\n}\n";

const TRANSLATIONS: &str = "{\n  \"TITLE\": \"Hello\"\n}\n";

/// Handles `bundlewright init` by writing a minimal project the built-in pipeline can build.
pub async fn run(args: InitArgs) -> Result<()> {
    let path = match args.path {
        Some(path) => path,
        None => std::env::current_dir().context("failed to get current directory")?,
    };
    fs::create_dir_all(&path)
        .with_context(|| format!("failed to create project directory {}", path.display()))?;
    if !path.is_dir() {
        return Err(anyhow!("Path {} is not a directory", path.display()));
    }

    let name = args.name.unwrap_or_else(|| project_name(&path));
    let files = scaffold_files(&name);

    if !args.force {
        let existing: Vec<String> = files
            .iter()
            .map(|(relative, _)| path.join(relative))
            .filter(|target| target.exists())
            .map(|target| target.display().to_string())
            .collect();
        if !existing.is_empty() {
            return Err(anyhow!(
                "refusing to overwrite existing files (use --force): {}",
                existing.join(", ")
            ));
        }
    }

    for (relative, content) in &files {
        let target = path.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, content)
            .with_context(|| format!("failed to write {}", target.display()))?;
        tracing::debug!(file = %target.display(), "scaffolded");
    }

    println!("Initialized bundlewright project '{}' at {}", name, path.display());
    println!("Run: bundlewright build --path {}", path.display());
    Ok(())
}

fn project_name(path: &Path) -> String {
    fs::canonicalize(path)
        .ok()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "web-app".to_string())
}

fn scaffold_files(name: &str) -> Vec<(PathBuf, String)> {
    let config = format!(
        "[project]\nname = \"{}\"\nversion = \"0.0.1\"\n\n\
         [build.compile]\n# Leave empty to name the cache-busting directory after the content hash\n\
         cache_busting_dir = \"\"\n\n\
         [app.angular_module]\nregular = \"app\"\n\n\
         [vendor]\ndir = \"vendor\"\n\n\
         [vendor.files]\njs = []\n",
        name.replace('"', "\\\"")
    );
    vec![
        (PathBuf::from(CONFIG_FILE_NAME), config),
        (PathBuf::from("snippets/module.prefix"), MODULE_PREFIX.to_string()),
        (PathBuf::from("snippets/module.suffix"), MODULE_SUFFIX.to_string()),
        (
            PathBuf::from("src/index.html"),
            INDEX_TEMPLATE.replace("{name}", name),
        ),
        (PathBuf::from("src/app/app.js"), APP_MODULE.to_string()),
        (PathBuf::from("src/styles/main.css"), STYLESHEET.to_string()),
        (PathBuf::from("src/i18n/en.json"), TRANSLATIONS.to_string()),
    ]
}
