use regex::Regex;
use thiserror::Error;

/// Env expansion errors
#[derive(Debug, Error)]
pub enum EnvError {
    /// A referenced environment variable is not set
    #[error("environment variable not found: `{0}`")]
    Missing(String),
    /// The placeholder used a scope other than `env.`
    #[error("only `env.`-scoped variables are supported: `{0}`")]
    UnsupportedScope(String),
}

/// Expand `{{ env.VAR }}` placeholders in raw TOML text
///
/// Expansion happens before deserialization so config structs stay plain
/// `String`/`SecretString`. Comment lines pass through untouched, which
/// keeps commented-out secrets from failing a load.
///
/// # Errors
///
/// Returns an error when a referenced variable is unset or a placeholder
/// uses an unknown scope
pub fn expand_env(input: &str) -> Result<String, EnvError> {
    let placeholder = Regex::new(r"\{\{\s*(?:([a-zA-Z0-9_]+)\.)?([a-zA-Z0-9_]+)\s*\}\}")
        .expect("placeholder pattern is valid");

    let mut output = String::with_capacity(input.len());
    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            output.push_str(line);
            output.push('\n');
            continue;
        }

        let mut cursor = 0;
        for captures in placeholder.captures_iter(line) {
            let whole = captures.get(0).expect("match always has a full capture");
            output.push_str(&line[cursor..whole.start()]);

            let scope = captures.get(1).map(|m| m.as_str());
            let name = captures.get(2).map_or("", |m| m.as_str());
            if scope != Some("env") {
                return Err(EnvError::UnsupportedScope(whole.as_str().to_owned()));
            }
            match std::env::var(name) {
                Ok(value) => output.push_str(&value),
                Err(_) => return Err(EnvError::Missing(name.to_owned())),
            }

            cursor = whole.end();
        }
        output.push_str(&line[cursor..]);
        output.push('\n');
    }

    if !input.ends_with('\n') {
        output.pop();
    }
    Ok(output)
}
