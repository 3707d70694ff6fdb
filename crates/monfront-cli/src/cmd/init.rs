use anyhow::Context;
use monfront_core::caller::Role;
use monfront_core::config::{Config, SessionEntry};
use monfront_core::types::UserType;
use std::path::Path;

pub fn run(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        println!("  exists:  {}", path.display());
        return Ok(());
    }

    let token = uuid::Uuid::new_v4().simple().to_string();
    let mut config = Config::new();
    config.sessions.push(SessionEntry {
        token: token.clone(),
        userid: 1,
        username: "Admin".to_string(),
        user_type: UserType::SuperAdmin,
        role: Role::named("Super admin role"),
    });
    config
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!("  created: {}", path.display());
    println!();
    println!("Super admin session cookie:");
    println!("  {}={token}", config.session.cookie_name);
    Ok(())
}
