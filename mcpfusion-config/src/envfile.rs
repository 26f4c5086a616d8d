//! Environment-file loading. On startup, the first
//! readable file in precedence order (`/opt/mcpfusion/env`, then
//! `~/.mcpfusion/env`) is parsed as `KEY=VALUE` lines and merged into the
//! process environment without overwriting variables already set — so an
//! operator's shell exports always win over the file.

use std::path::PathBuf;

const SYSTEM_ENV_FILE: &str = "/opt/mcpfusion/env";

pub fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_ENV_FILE)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".mcpfusion").join("env"));
    }
    paths
}

/// Loads the first existing env file and applies its `KEY=VALUE` pairs via
/// `std::env::set_var`, skipping keys already present in the environment.
pub fn load() -> Option<PathBuf> {
    for path in candidate_paths() {
        if let Ok(content) = std::fs::read_to_string(&path) {
            apply(&content);
            return Some(path);
        }
    }
    None
}

fn apply(content: &str) {
    for (key, value) in parse(content) {
        if std::env::var_os(&key).is_none() {
            // SAFETY: single-threaded startup path, before any worker tasks spawn.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }
}

/// Parses `KEY=VALUE` lines, ignoring blanks, `#` comments, and a leading
/// `export ` keyword. Surrounding single or double quotes are stripped.
pub fn parse(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim())))
        })
        .collect()
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"') || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'')) {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

/// Expands `${VAR}` references in a config string against the process
/// environment, leaving unresolved references untouched.
pub fn expand_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(end) = input[i + 2..].find('}') {
                let name = &input[i + 2..i + 2 + end];
                match std::env::var(name) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => out.push_str(&input[i..i + 3 + end]),
                }
                i += 3 + end;
                continue;
            }
        }
        let ch = input[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_lines_skipping_comments() {
        let content = "# comment\nFOO=bar\nexport BAZ=\"qux\"\n\nINVALIDLINE\n";
        let parsed = parse(content);
        assert_eq!(parsed, vec![("FOO".to_string(), "bar".to_string()), ("BAZ".to_string(), "qux".to_string())]);
    }

    #[test]
    fn expand_vars_substitutes_known_variables() {
        // SAFETY: test runs single-threaded within this process.
        unsafe {
            std::env::set_var("MCPFUSION_TEST_VAR", "resolved");
        }
        assert_eq!(expand_vars("prefix ${MCPFUSION_TEST_VAR} suffix"), "prefix resolved suffix");
        assert_eq!(expand_vars("${MCPFUSION_UNSET_VAR}"), "${MCPFUSION_UNSET_VAR}");
    }
}
