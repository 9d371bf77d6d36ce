use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use weftcore::value::{resolve_path, stringify};
use weftcore::ExecutionContext;

static SCOPED_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z0-9_.]+)\s*\}\}")
        .expect("scoped reference pattern is valid")
});

/// Substitute `{{<scope>.<path>}}` references in a template. `data_scope`
/// names the scope resolved against `data` ("input" for URLs, "data" for
/// response templates); `context.<name>` resolves against the run variables.
/// Unresolvable references substitute empty string; unknown scopes are left
/// verbatim.
pub(crate) fn substitute_refs(
    text: &str,
    data_scope: &str,
    data: &Value,
    ctx: &ExecutionContext,
) -> String {
    SCOPED_REF
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let scope = &caps[1];
            let path = &caps[2];
            if scope == data_scope {
                resolve_path(data, path).map(stringify).unwrap_or_default()
            } else if scope == "context" {
                resolve_context_path(ctx, path).unwrap_or_default()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn resolve_context_path(ctx: &ExecutionContext, path: &str) -> Option<String> {
    let (name, rest) = match path.split_once('.') {
        Some((name, rest)) => (name, rest),
        None => (path, ""),
    };
    let value = ctx.get_variable(name)?;
    resolve_path(&value, rest).map(stringify)
}
