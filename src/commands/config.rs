use async_trait::async_trait;

use crate::commands::guard::{self, ADMIN_ONLY, GUILD_ONLY, OWNER_ONLY};
use crate::commands::registry::{Command, Execute, Leaf, SubcommandGroup};
use crate::db::images::ImageKind;
use crate::db::settings::Settings;
use crate::discord::response::Reply;
use crate::error::Result;
use crate::state::BotState;
use crate::types::discord::{CommandOption, Interaction, OptionType};

const MAX_COOLDOWN_SECS: i64 = 7 * 24 * 60 * 60;

pub fn command() -> Command {
    Command::group(
        "config",
        "Configure the app settings",
        vec![
            Leaf::new("mod", "Set the image moderator role", ModRole).option(CommandOption::new(
                OptionType::Role,
                "role",
                "Role to be set as image moderator",
            )),
            Leaf::new("cooldown", "Set the submission cooldown", Cooldown).option(
                CommandOption::new(OptionType::Integer, "seconds", "Seconds between submissions, 0 disables it")
                    .range(Some(0), Some(MAX_COOLDOWN_SECS)),
            ),
        ],
        vec![
            SubcommandGroup::new(
                "channel",
                "Configure the app channels",
                vec![
                    Leaf::new("pillow", "Set the pillow channel", Channel(ImageKind::Pillow)).option(
                        CommandOption::new(OptionType::Channel, "channel", "Channel to be set as pillow channel"),
                    ),
                    Leaf::new("photo", "Set the photo channel", Channel(ImageKind::Photo)).option(
                        CommandOption::new(OptionType::Channel, "channel", "Channel to be set as photo channel"),
                    ),
                ],
            ),
            SubcommandGroup::new(
                "global",
                "Configure the global settings",
                vec![
                    Leaf::new("whitelist", "Set the global whitelist", Whitelist)
                        .option(CommandOption::new(OptionType::String, "guild", "Guild ID to be whitelisted"))
                        .option(CommandOption::new(
                            OptionType::String,
                            "name",
                            "Name of the guild to be whitelisted",
                        ))
                        .option(CommandOption::new(OptionType::Boolean, "toggle", "Toggle the whitelist")),
                ],
            ),
        ],
    )
}

/// Admin in a guild, or a reply explaining why not.
fn admin_guild<'a>(state: &BotState, interaction: &'a Interaction) -> std::result::Result<&'a str, Reply> {
    if !guard::is_admin(state, interaction) {
        return Err(Reply::ephemeral(ADMIN_ONLY));
    }
    interaction
        .guild_id
        .as_deref()
        .ok_or_else(|| Reply::ephemeral(GUILD_ONLY))
}

pub struct ModRole;

#[async_trait]
impl Execute for ModRole {
    async fn execute(&self, state: &BotState, interaction: &Interaction) -> Result<Reply> {
        let guild_id = match admin_guild(state, interaction) {
            Ok(id) => id,
            Err(reply) => return Ok(reply),
        };

        if interaction.leaf_options().is_empty() {
            let settings = Settings::load_or_default(state.stores.settings.as_ref(), guild_id).await?;
            return Ok(match settings.mod_role_id {
                Some(role) => Reply::ephemeral(format!("Current mod role: <@&{role}>")),
                None => Reply::ephemeral("No mod role set"),
            });
        }

        let Some(role) = interaction.option_str("role") else {
            return Ok(Reply::ephemeral("Invalid role provided"));
        };
        let patch = Settings {
            mod_role_id: Some(role.to_string()),
            ..Default::default()
        };
        Settings::patch(state.stores.settings.as_ref(), guild_id, patch).await?;
        Ok(Reply::ephemeral("Mod role set successfully"))
    }
}

pub struct Cooldown;

#[async_trait]
impl Execute for Cooldown {
    async fn execute(&self, state: &BotState, interaction: &Interaction) -> Result<Reply> {
        let guild_id = match admin_guild(state, interaction) {
            Ok(id) => id,
            Err(reply) => return Ok(reply),
        };

        if interaction.leaf_options().is_empty() {
            let settings = Settings::load_or_default(state.stores.settings.as_ref(), guild_id).await?;
            return Ok(match settings.cooldown_secs() {
                Some(secs) => Reply::ephemeral(format!("Current cooldown: {secs} seconds")),
                None => Reply::ephemeral("No cooldown set"),
            });
        }

        let Some(secs) = interaction
            .option_i64("seconds")
            .filter(|s| (0..=MAX_COOLDOWN_SECS).contains(s))
        else {
            return Ok(Reply::ephemeral("Invalid cooldown provided"));
        };
        let patch = Settings {
            cooldown: Some(secs as u64),
            ..Default::default()
        };
        Settings::patch(state.stores.settings.as_ref(), guild_id, patch).await?;
        Ok(match secs {
            0 => Reply::ephemeral("Cooldown cleared"),
            n => Reply::ephemeral(format!("Cooldown set to {n} seconds")),
        })
    }
}

pub struct Channel(ImageKind);

#[async_trait]
impl Execute for Channel {
    async fn execute(&self, state: &BotState, interaction: &Interaction) -> Result<Reply> {
        let guild_id = match admin_guild(state, interaction) {
            Ok(id) => id,
            Err(reply) => return Ok(reply),
        };
        let kind = self.0;

        if interaction.leaf_options().is_empty() {
            let settings = Settings::load_or_default(state.stores.settings.as_ref(), guild_id).await?;
            let current = match kind {
                ImageKind::Pillow => settings.pillow_channel_id,
                ImageKind::Photo => settings.photo_channel_id,
            };
            return Ok(match current {
                Some(channel) => Reply::ephemeral(format!("Current {kind} channel: <#{channel}>")),
                None => Reply::ephemeral(format!("No {kind} channel set")),
            });
        }

        let Some(channel) = interaction.option_str("channel") else {
            return Ok(Reply::ephemeral("Invalid channel provided"));
        };
        let mut patch = Settings::default();
        match kind {
            ImageKind::Pillow => patch.pillow_channel_id = Some(channel.to_string()),
            ImageKind::Photo => patch.photo_channel_id = Some(channel.to_string()),
        }
        Settings::patch(state.stores.settings.as_ref(), guild_id, patch).await?;
        Ok(Reply::ephemeral(match kind {
            ImageKind::Pillow => "Pillow channel set successfully",
            ImageKind::Photo => "Photo channel set successfully",
        }))
    }
}

pub struct Whitelist;

#[async_trait]
impl Execute for Whitelist {
    async fn execute(&self, state: &BotState, interaction: &Interaction) -> Result<Reply> {
        if !guard::is_owner(state, interaction) {
            return Ok(Reply::ephemeral(OWNER_ONLY));
        }

        if interaction.leaf_options().is_empty() {
            let kv = state.stores.settings.as_ref();
            let mut lines = Vec::new();
            for guild_id in kv.list_keys(None).await? {
                if let Some(name) = Settings::load(kv, &guild_id).await?.and_then(|s| s.name) {
                    lines.push(format!("{guild_id}: {name}"));
                }
            }
            if lines.is_empty() {
                return Ok(Reply::ephemeral("No whitelist set"));
            }
            return Ok(Reply::ephemeral(format!("Current whitelist: ```\n{}```", lines.join("\n"))));
        }

        let Some(guild_id) = interaction.option_str("guild").map(str::to_string) else {
            return Ok(Reply::ephemeral("Invalid options provided"));
        };

        if interaction.option_bool("toggle") == Some(false) {
            tracing::info!(guild = %guild_id, "removing guild from whitelist");
            state.stores.settings.delete(&guild_id).await?;
            return Ok(Reply::ephemeral("Whitelist removed successfully"));
        }

        let Some(name) = interaction.option_str("name").map(str::to_string) else {
            return Ok(Reply::ephemeral("Invalid name provided"));
        };

        tracing::info!(guild = %guild_id, name = %name, "whitelisting guild");
        let background = state.clone();
        state.background.spawn("whitelist", async move {
            let patch = Settings {
                name: Some(name),
                ..Default::default()
            };
            Settings::patch(background.stores.settings.as_ref(), &guild_id, patch).await?;
            Ok(())
        });
        Ok(Reply::ephemeral("Whitelist set successfully"))
    }
}
