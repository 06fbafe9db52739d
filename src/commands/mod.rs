mod config;
pub mod custom_id;
mod delete;
pub mod dispatch;
mod guard;
mod list;
mod ping;
pub mod registry;
mod submit;
mod upload;
mod view;

use crate::discord::api::DiscordHttp;
use crate::error::Result;
use registry::{Command, Registry};

/// Every top-level command the bot registers.
pub fn all_commands() -> Vec<Command> {
    vec![
        ping::command(),
        config::command(),
        submit::command(),
        upload::command(),
        list::command(),
        view::command(),
        delete::command(),
    ]
}

/// Validated registry of [`all_commands`].
pub fn registry() -> Result<Registry> {
    Registry::new(all_commands())
}

/// Uploads the schema, looking the application id up when it is not configured.
pub async fn register(discord: &dyn DiscordHttp, registry: &Registry, application_id: Option<&str>) -> Result<()> {
    let application_id = match application_id {
        Some(id) => id.to_string(),
        None => discord.application_id().await?,
    };
    discord.register_commands(&application_id, &registry.schema()).await
}
