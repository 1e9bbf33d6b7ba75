//! User command handlers

use anyhow::Context;

use crate::config::Config;
use crate::entities::users::Role;
use crate::open_store;

pub async fn cmd_user_list(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let users = store.list_users().await?;

    if users.is_empty() {
        println!("No users yet. The first account to sign up becomes admin.");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<70}", "");
    for user in users {
        println!("{:<8} {} <{}>", user.role.as_str(), user.name, user.email);
        println!("  ID: {} | Created: {}", user.id, user.created_at);
    }

    Ok(())
}

pub async fn cmd_user_set_role(config: &Config, email: &str, role: &str) -> anyhow::Result<()> {
    let role: Role = role.parse().map_err(anyhow::Error::msg)?;
    let store = open_store(config).await?;

    let user = store
        .get_user_by_email(email)
        .await?
        .with_context(|| format!("No user with email {email}"))?;

    store.update_user_role(user.id, role).await?;
    println!("✓ {} is now {}", user.email, role);

    Ok(())
}
