//! Script generators for preloaded templates and translation tables.

use serde_json::Value;

/// Build a script that registers every template in `$templateCache`.
///
/// Each template gets its own module named after its key; `module` depends on
/// all of them so the application only needs to require one name.
pub fn template_cache_script(module: &str, templates: &[(String, String)]) -> String {
    let keys: Vec<String> = templates.iter().map(|(key, _)| js_string(key)).collect();
    let mut out = format!("angular.module({}, [{}]);\n", js_string(module), keys.join(", "));

    for (key, html) in templates {
        let key = js_string(key);
        out.push('\n');
        out.push_str(&format!(
            "angular.module({key}, []).run([\"$templateCache\", function($templateCache) {{\n  $templateCache.put({key},\n    {body});\n}}]);\n",
            key = key,
            body = template_body(html),
        ));
    }
    out
}

/// Build a script that registers every translation table with `$translateProvider`.
pub fn translations_script(module: &str, requires: &[String], tables: &[(String, Value)]) -> String {
    let requires: Vec<String> = requires.iter().map(String::as_str).map(js_string).collect();
    let mut out = format!(
        "angular.module({}, [{}])\n.config(['$translateProvider', function ($translateProvider) {{\n",
        js_string(module),
        requires.join(", ")
    );
    for (lang, table) in tables {
        let body = serde_json::to_string(table).unwrap_or_else(|_| "{}".to_string());
        out.push_str(&format!(
            "  $translateProvider.translations({}, {});\n",
            js_string(lang),
            body
        ));
    }
    out.push_str("}]);\n");
    out
}

/// Split a template into `"line\n" +` chunks, one per source line.
fn template_body(html: &str) -> String {
    let normalized = html.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    let last = lines.len() - 1;
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            if index == last {
                js_string(line)
            } else {
                js_string(&format!("{}\n", line))
            }
        })
        .collect::<Vec<_>>()
        .join(" +\n    ")
}

/// Double-quoted JavaScript string literal.
pub fn js_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}
