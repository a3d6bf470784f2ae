pub mod annotate;
pub mod clean;
pub mod concat;
pub mod copy;
pub mod files;
pub mod fingerprint;
pub mod html2js;
pub mod index_html;
pub mod minify;
pub mod replace;
pub mod translations;

use crate::core::pipeline::operator::{OperatorRegistry, OperatorRegistryBuilder};

/// Register built-in operators into the supplied builder.
pub fn register_builtins(builder: &mut OperatorRegistryBuilder) {
    builder
        .register(copy::CopyOperator::new())
        .register(clean::CleanOperator::new())
        .register(concat::ConcatOperator::new())
        .register(annotate::NgAnnotateOperator::new())
        .register(minify::UglifyOperator)
        .register(minify::CssMinOperator)
        .register(minify::MinJsonOperator)
        .register(minify::HtmlMinOperator)
        .register(html2js::Html2JsOperator)
        .register(translations::Translations2JsOperator)
        .register(index_html::IndexHtmlOperator)
        .register(fingerprint::FingerprintOperator)
        .register(replace::ReplaceOperator);
}

/// Registry holding every built-in step kind.
pub fn default_registry() -> OperatorRegistry {
    let mut builder = OperatorRegistry::builder();
    register_builtins(&mut builder);
    builder.build()
}
