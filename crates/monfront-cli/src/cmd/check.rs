use crate::output::print_json;
use anyhow::Context;
use monfront_core::api::NO_PERMISSIONS;
use monfront_core::caller::Caller;
use monfront_core::config::Config;
use monfront_core::input::RawInput;
use monfront_core::pipeline;
use monfront_core::response::{FlashKind, Outcome};
use monfront_core::types::{Id, UserType};
use std::path::Path;

/// Userid of the synthetic caller used when no session is named.
const CLI_USERID: Id = 1;

pub fn run(
    path: &Path,
    action: &str,
    params: &[String],
    session: Option<&str>,
    user_type: UserType,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(path).context("failed to load config")?;
    let registry = config.registry();
    let entry = registry.get(action)?;
    let api = config.memory_api().context("failed to load seed data")?;

    let caller = match session {
        Some(token) => config
            .session(token)
            .map(|s| s.caller())
            .with_context(|| format!("no session with token '{token}'"))?,
        None => Caller::new(CLI_USERID, "monfront-cli", user_type),
    };
    let raw = parse_params(params)?;

    let outcome = pipeline::run(entry, &caller, &api, &raw);

    if json {
        print_json(&outcome)?;
    } else {
        print_outcome(&outcome)?;
    }

    match outcome {
        Outcome::Fatal => anyhow::bail!("request aborted: invalid input"),
        Outcome::Denied => anyhow::bail!("{NO_PERMISSIONS}"),
        _ => Ok(()),
    }
}

fn parse_params(params: &[String]) -> anyhow::Result<RawInput> {
    let mut pairs = Vec::with_capacity(params.len());
    for param in params {
        let (key, value) = param
            .split_once('=')
            .with_context(|| format!("parameter '{param}' is not KEY=VALUE"))?;
        pairs.push((key, value));
    }
    Ok(RawInput::from_pairs(pairs))
}

fn print_outcome(outcome: &Outcome) -> anyhow::Result<()> {
    match outcome {
        Outcome::Redirect {
            url,
            flash,
            form_data,
        } => {
            println!("redirect: {url}");
            if let Some(flash) = flash {
                let level = match flash.kind {
                    FlashKind::Success => "success",
                    FlashKind::Error => "error",
                };
                println!("[{level}] {}", flash.title);
                for message in &flash.messages {
                    println!("  - {message}");
                }
            }
            if let Some(form) = form_data {
                let keys: Vec<&str> = form.iter().map(|(k, _)| k.as_str()).collect();
                println!("form data: {}", keys.join(", "));
            }
        }
        Outcome::Data { main_block } => {
            println!("{}", serde_json::to_string_pretty(main_block)?);
        }
        Outcome::Fatal | Outcome::Denied => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_keep_brackets_and_equals_in_values() {
        let raw = parse_params(&[
            "druleids[]=5".to_string(),
            "druleids[]=7".to_string(),
            "iprange=a=b".to_string(),
        ])
        .unwrap();
        assert_eq!(raw.get("druleids").and_then(|v| v.as_list()).map(|l| l.len()), Some(2));
        assert_eq!(raw.get("iprange").and_then(|v| v.as_str()), Some("a=b"));
    }

    #[test]
    fn params_without_equals_are_rejected() {
        assert!(parse_params(&["druleids".to_string()]).is_err());
    }
}
