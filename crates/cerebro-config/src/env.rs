use std::borrow::Cow;
use std::sync::OnceLock;

use anyhow::{anyhow, bail};
use regex::Regex;

/// `{{ scope.NAME }}` with an optional `| default("value")`
fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\)\s*)?\}\}"#)
            .expect("placeholder pattern is valid")
    })
}

/// Substitute `{{ env.VAR }}` placeholders in raw configuration text
///
/// `{{ env.VAR | default("x") }}` falls back to `x` when `VAR` is unset.
/// Comment lines are left untouched, so a commented-out key may reference
/// a variable that does not exist.
pub fn expand_env(input: &str) -> anyhow::Result<String> {
    let lines = input
        .split('\n')
        .map(|line| {
            if line.trim_start().starts_with('#') {
                Ok(Cow::Borrowed(line))
            } else {
                expand_line(line)
            }
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(lines.join("\n"))
}

fn expand_line(line: &str) -> anyhow::Result<Cow<'_, str>> {
    let mut expanded = String::with_capacity(line.len());
    let mut copied_up_to = 0;

    for captures in placeholder().captures_iter(line) {
        let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        expanded.push_str(&line[copied_up_to..whole.start()]);
        expanded.push_str(&resolve(key.as_str(), captures.get(2).map(|m| m.as_str()))?);
        copied_up_to = whole.end();
    }

    if copied_up_to == 0 {
        return Ok(Cow::Borrowed(line));
    }
    expanded.push_str(&line[copied_up_to..]);
    Ok(Cow::Owned(expanded))
}

fn resolve(key: &str, default: Option<&str>) -> anyhow::Result<String> {
    let Some(name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
        bail!("unsupported placeholder `{key}`: only `env.NAME` is supported");
    };

    std::env::var(name).or_else(|_| {
        default
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("environment variable `{name}` is not set"))
    })
}
