//! Pure source transforms used by the build operators.

pub mod annotate;
pub mod cachebust;
pub mod cssminify;
pub mod htmlminify;
pub mod js_lexer;
pub mod jsminify;
pub mod templates;

pub use annotate::{annotate, Annotated};
pub use cachebust::{content_fingerprint, is_fingerprint_name, rewrite_references, Rewritten};
pub use cssminify::{minify_css, minify_css_with_banner, CssMinifyError};
pub use htmlminify::minify_html;
pub use js_lexer::JsLexError;
pub use jsminify::{minify_js, minify_js_with_banner};
pub use templates::{template_cache_script, translations_script};
