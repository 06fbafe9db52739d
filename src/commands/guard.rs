use crate::db::settings::Settings;
use crate::error::Result;
use crate::state::BotState;
use crate::types::discord::{Interaction, PERMISSION_ADMINISTRATOR};

pub const GUILD_ONLY: &str = "This command can only be used in a server";
pub const NOT_WHITELISTED: &str = "This command can only be used in the whitelisted server";
pub const ADMIN_ONLY: &str = "Only server administrators can use this command";
pub const OWNER_ONLY: &str = "Only the bot owner can use this command";
pub const MODERATOR_ONLY: &str = "Only image moderators are allowed to manage submissions";
pub const NO_MOD_ROLE: &str =
    "The image moderator role has not been configured. Please ask an admin to set it up.";

pub fn is_owner(state: &BotState, interaction: &Interaction) -> bool {
    interaction
        .invoker_id()
        .is_some_and(|id| state.config.is_owner(id))
}

pub fn is_admin(state: &BotState, interaction: &Interaction) -> bool {
    is_owner(state, interaction) || interaction.has_permission(PERMISSION_ADMINISTRATOR)
}

pub fn is_moderator(state: &BotState, settings: &Settings, interaction: &Interaction) -> bool {
    is_owner(state, interaction)
        || settings
            .mod_role_id
            .as_deref()
            .is_some_and(|role| interaction.has_role(role))
}

/// Whitelisted guild, or the owner anywhere.
pub async fn is_whitelisted(state: &BotState, interaction: &Interaction) -> Result<bool> {
    if is_owner(state, interaction) {
        return Ok(true);
    }
    let Some(guild_id) = interaction.guild_id.as_deref() else {
        return Ok(false);
    };
    let settings = Settings::load(state.stores.settings.as_ref(), guild_id).await?;
    Ok(settings.is_some_and(|s| s.is_whitelisted()))
}
