//! Settings command handler

use std::sync::Arc;

use crate::config::Config;
use crate::settings::{ProcessEnv, display_value};
use crate::{init_settings, open_store};

pub async fn cmd_settings(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let settings = init_settings(config, &store, Arc::new(ProcessEnv)).await?;

    let registered = settings.registry().snapshot();
    println!("Settings ({} registered)", registered.len());
    println!("{:-<70}", "");

    for setting in registered {
        let resolved = settings.resolve(&setting.name).await;
        println!(
            "{:<22} {:<8} {}",
            setting.name,
            resolved.source.as_str(),
            display_value(&setting.name, &resolved.value)
        );
    }

    Ok(())
}
