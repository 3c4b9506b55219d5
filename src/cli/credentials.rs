//! GitHub credential resolution.
//!
//! The token is resolved once, before any build starts, and held for the run.

use crate::error::{CliError, Result};
use crate::github::GitHubToken;
use std::io::{BufRead, Write};

/// Environment variables checked for a token, in order
pub const TOKEN_ENV_VARS: [&str; 2] = ["GH_TOKEN", "GITHUB_TOKEN"];

/// Resolve a token from the environment, falling back to one interactive prompt.
pub fn resolve_token() -> Result<GitHubToken> {
    if let Some(token) = token_from_env(|name| std::env::var(name).ok()) {
        return Ok(token);
    }

    let stdin = std::io::stdin();
    prompt_token(&mut stdin.lock(), &mut std::io::stdout())
}

/// First non-empty token among [`TOKEN_ENV_VARS`]
fn token_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<GitHubToken> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(GitHubToken::new)
        .find(|token| !token.is_empty())
}

fn prompt_token(input: &mut impl BufRead, output: &mut impl Write) -> Result<GitHubToken> {
    write!(output, "GitHub token: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let token = GitHubToken::new(line);
    if token.is_empty() {
        return Err(CliError::MissingCredentials {
            reason: "no GitHub token given; --upload needs one".to_string(),
        }
        .into());
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_precedence() {
        let token = token_from_env(|name| match name {
            "GH_TOKEN" => Some("from-gh".to_string()),
            "GITHUB_TOKEN" => Some("from-github".to_string()),
            _ => None,
        });
        assert_eq!(token.unwrap().expose(), "from-gh");
    }

    #[test]
    fn test_blank_env_is_skipped() {
        let token = token_from_env(|name| match name {
            "GH_TOKEN" => Some("   ".to_string()),
            _ => None,
        });
        assert!(token.is_none());
    }

    #[test]
    fn test_prompt_reads_one_line() {
        let mut input = std::io::Cursor::new(b"ghp_abc\nrest".to_vec());
        let mut output = Vec::new();

        let token = prompt_token(&mut input, &mut output).unwrap();
        assert_eq!(token.expose(), "ghp_abc");
        assert_eq!(String::from_utf8(output).unwrap(), "GitHub token: ");
    }

    #[test]
    fn test_prompt_rejects_empty() {
        let mut input = std::io::Cursor::new(b"\n".to_vec());
        let mut output = Vec::new();
        assert!(prompt_token(&mut input, &mut output).is_err());
    }
}
