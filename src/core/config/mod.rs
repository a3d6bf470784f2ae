use serde::{Deserialize, Serialize};

/// Build configuration loaded from `bundlewright.toml`.
///
/// Every section is exposed to pipeline placeholders under the `config.` root,
/// e.g. `<%= config.build.compile.outdir %>`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildConfig {
    /// Project configuration
    #[serde(default)]
    pub project: ProjectConfig,

    /// Output directories
    #[serde(default)]
    pub build: BuildDirsConfig,

    /// Application sources
    #[serde(default)]
    pub app: AppConfig,

    /// Shared (common) module sources
    #[serde(default)]
    pub common: CommonConfig,

    /// Third-party scripts
    #[serde(default)]
    pub vendor: VendorConfig,

    /// Banner and other metadata
    #[serde(default)]
    pub meta: MetaConfig,

    /// Module wrapper snippets
    #[serde(default)]
    pub snippets: SnippetConfig,
}

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version, used in the default banner
    #[serde(default = "default_version")]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildDirsConfig {
    #[serde(default)]
    pub prepare: PrepareConfig,
    #[serde(default)]
    pub compile: CompileConfig,
}

/// Staging area where sources are copied and annotated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareConfig {
    #[serde(default = "default_prepare_outdir")]
    pub outdir: String,
}

/// Final production output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    #[serde(default = "default_compile_outdir")]
    pub outdir: String,

    /// Fixed cache-busting directory name; empty means derive it from content.
    #[serde(default)]
    pub cache_busting_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root all app/common patterns are relative to
    #[serde(default = "default_source_dir")]
    pub source_dir: String,

    /// Index document template
    #[serde(default = "default_index")]
    pub index: String,

    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    #[serde(default = "default_translations_dir")]
    pub translations_dir: String,

    #[serde(default)]
    pub angular_module: AngularModuleConfig,

    #[serde(default)]
    pub files: AppFiles,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AngularModuleConfig {
    /// Module bootstrapped by the index document
    #[serde(default = "default_regular_module")]
    pub regular: String,

    /// Module holding preloaded templates
    #[serde(default = "default_templates_module")]
    pub templates: String,

    /// Module holding translation tables
    #[serde(default = "default_translations_module")]
    pub translations: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppFiles {
    #[serde(default = "default_app_js")]
    pub js: Vec<String>,
    #[serde(default = "default_app_templates")]
    pub templates: Vec<String>,
    #[serde(default = "default_app_templates2js")]
    pub templates2js: Vec<String>,
    /// Relative to `app.translations_dir`
    #[serde(default = "default_translations")]
    pub translations: Vec<String>,
    #[serde(default = "default_css")]
    pub css: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommonConfig {
    #[serde(default)]
    pub files: CommonFiles,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonFiles {
    #[serde(default = "default_common_js")]
    pub js: Vec<String>,
    #[serde(default = "default_common_templates")]
    pub templates: Vec<String>,
    #[serde(default = "default_common_templates2js")]
    pub templates2js: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    #[serde(default = "default_vendor_dir")]
    pub dir: String,
    #[serde(default)]
    pub files: VendorFiles,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VendorFiles {
    /// Relative to `vendor.dir`, concatenated in list order
    #[serde(default)]
    pub js: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetaConfig {
    /// Banner comment; empty means one is generated from the project name and version
    #[serde(default)]
    pub banner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetConfig {
    #[serde(default = "default_prefix_snippet")]
    pub prefix: String,
    #[serde(default = "default_suffix_snippet")]
    pub suffix: String,
}

// Default functions
fn default_version() -> String {
    "0.0.1".to_string()
}

fn default_prepare_outdir() -> String {
    "build/prepare".to_string()
}

fn default_compile_outdir() -> String {
    "build/compile".to_string()
}

fn default_source_dir() -> String {
    "src".to_string()
}

fn default_index() -> String {
    "src/index.html".to_string()
}

fn default_assets_dir() -> String {
    "src/assets".to_string()
}

fn default_translations_dir() -> String {
    "src/i18n".to_string()
}

fn default_regular_module() -> String {
    "app".to_string()
}

fn default_templates_module() -> String {
    "templates-app".to_string()
}

fn default_translations_module() -> String {
    "translations-app".to_string()
}

fn default_app_js() -> Vec<String> {
    vec!["app/**/*.js".to_string(), "!app/**/*.spec.js".to_string()]
}

fn default_app_templates() -> Vec<String> {
    vec!["app/**/*.html".to_string()]
}

fn default_app_templates2js() -> Vec<String> {
    vec!["app/**/*.tpl.html".to_string()]
}

fn default_translations() -> Vec<String> {
    vec!["*.json".to_string()]
}

fn default_css() -> Vec<String> {
    vec!["styles/**/*.css".to_string()]
}

fn default_common_js() -> Vec<String> {
    vec![
        "common/**/*.js".to_string(),
        "!common/**/*.spec.js".to_string(),
    ]
}

fn default_common_templates() -> Vec<String> {
    vec!["common/**/*.html".to_string()]
}

fn default_common_templates2js() -> Vec<String> {
    vec!["common/**/*.tpl.html".to_string()]
}

fn default_vendor_dir() -> String {
    "vendor".to_string()
}

fn default_prefix_snippet() -> String {
    "snippets/module.prefix".to_string()
}

fn default_suffix_snippet() -> String {
    "snippets/module.suffix".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            name: "web-app".to_string(),
            version: default_version(),
        }
    }
}

impl Default for PrepareConfig {
    fn default() -> Self {
        PrepareConfig {
            outdir: default_prepare_outdir(),
        }
    }
}

impl Default for CompileConfig {
    fn default() -> Self {
        CompileConfig {
            outdir: default_compile_outdir(),
            cache_busting_dir: String::new(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            source_dir: default_source_dir(),
            index: default_index(),
            assets_dir: default_assets_dir(),
            translations_dir: default_translations_dir(),
            angular_module: AngularModuleConfig::default(),
            files: AppFiles::default(),
        }
    }
}

impl Default for AngularModuleConfig {
    fn default() -> Self {
        AngularModuleConfig {
            regular: default_regular_module(),
            templates: default_templates_module(),
            translations: default_translations_module(),
        }
    }
}

impl Default for AppFiles {
    fn default() -> Self {
        AppFiles {
            js: default_app_js(),
            templates: default_app_templates(),
            templates2js: default_app_templates2js(),
            translations: default_translations(),
            css: default_css(),
        }
    }
}

impl Default for CommonFiles {
    fn default() -> Self {
        CommonFiles {
            js: default_common_js(),
            templates: default_common_templates(),
            templates2js: default_common_templates2js(),
        }
    }
}

impl Default for VendorConfig {
    fn default() -> Self {
        VendorConfig {
            dir: default_vendor_dir(),
            files: VendorFiles::default(),
        }
    }
}

impl Default for SnippetConfig {
    fn default() -> Self {
        SnippetConfig {
            prefix: default_prefix_snippet(),
            suffix: default_suffix_snippet(),
        }
    }
}

impl BuildConfig {
    /// Banner placed in front of minified scripts and stylesheets.
    pub fn effective_banner(&self) -> String {
        if self.meta.banner.trim().is_empty() {
            format!(
                "/*! {} - v{} */\n",
                self.project.name, self.project.version
            )
        } else {
            self.meta.banner.clone()
        }
    }

    /// JSON view exposed to pipeline placeholders.
    pub fn placeholder_value(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(meta) = value.get_mut("meta").and_then(|meta| meta.as_object_mut()) {
            meta.insert(
                "banner".to_string(),
                serde_json::Value::String(self.effective_banner()),
            );
        }
        value
    }
}

pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
