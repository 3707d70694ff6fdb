use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use monfront_core::config::Config;
use monfront_core::FrontendError;
use std::path::Path;

#[derive(Subcommand)]
pub enum ActionsSubcommand {
    /// List registered actions
    List,

    /// Show the input rules of one action
    Rules { name: String },
}

pub fn run(path: &Path, subcmd: ActionsSubcommand, json: bool) -> anyhow::Result<()> {
    // Without a config every built-in action is listed as enabled.
    let registry = if path.exists() {
        Config::load(path).context("failed to load config")?.registry()
    } else {
        Config::new().registry()
    };

    match subcmd {
        ActionsSubcommand::List => {
            if json {
                let list: Vec<_> = registry
                    .entries()
                    .map(|e| {
                        serde_json::json!({
                            "name": e.name(),
                            "entity": e.def.entity.table(),
                            "style": e.def.style.as_str(),
                            "enabled": registry.is_enabled(e.name()),
                        })
                    })
                    .collect();
                return print_json(&list);
            }
            let rows = registry
                .entries()
                .map(|e| {
                    vec![
                        e.name().to_string(),
                        e.def.entity.table().to_string(),
                        e.def.style.as_str().to_string(),
                        if registry.is_enabled(e.name()) { "yes" } else { "no" }.to_string(),
                    ]
                })
                .collect();
            print_table(&["ACTION", "ENTITY", "RESPONSE", "ENABLED"], rows);
            Ok(())
        }
        ActionsSubcommand::Rules { name } => {
            let entry = registry
                .entries()
                .find(|e| e.name() == name)
                .ok_or_else(|| FrontendError::UnknownAction(name.clone()))?;
            let rules: Vec<String> = entry
                .rules
                .iter()
                .map(|r| format!("{}: {}", r.field, r.describe()))
                .collect();
            if json {
                return print_json(&rules);
            }
            for rule in rules {
                println!("{rule}");
            }
            Ok(())
        }
    }
}
