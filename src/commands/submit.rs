use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

use crate::commands::custom_id::custom_id;
use crate::commands::guard::{self, GUILD_ONLY, MODERATOR_ONLY, NO_MOD_ROLE, NOT_WHITELISTED};
use crate::commands::registry::{Command, Execute, ExecuteComponent, Leaf};
use crate::db::images::{PillowData, PillowType, pillow_key};
use crate::db::settings::Settings;
use crate::db::{PutObject, from_metadata, to_metadata};
use crate::discord::components::{self, ACCENT_COLOR, ButtonStyle};
use crate::discord::response::{FileUpload, Reply};
use crate::error::Result;
use crate::state::BotState;
use crate::types::discord::{
    CommandOption, Embed, EmbedField, EmbedFooter, EmbedMedia, Interaction, InteractionResponseData, OptionType,
    User,
};

pub const ALREADY_HANDLED: &str = "This submission has already been handled";
const PNG: &str = "image/png";

pub fn command() -> Command {
    let mut pillow_type = CommandOption::new(OptionType::String, "type", "Type of pillow").required();
    for kind in PillowType::ALL {
        pillow_type = pillow_type.choice(kind.as_ref(), kind.as_ref());
    }

    Command::group(
        "submit",
        "Make a new submission",
        vec![
            Leaf::new("pillow", "Submit your pillow design", SubmitPillow)
                .option(
                    CommandOption::new(OptionType::Attachment, "texture", "The texture for your pillow (png)")
                        .required(),
                )
                .option(CommandOption::new(OptionType::String, "name", "Name for your pillow").required())
                .option(pillow_type)
                .option(CommandOption::new(
                    OptionType::String,
                    "username",
                    "Override, defaults to your username",
                ))
                .component(ReviewPillow),
        ],
        vec![],
    )
}

pub struct SubmitPillow;

#[async_trait]
impl Execute for SubmitPillow {
    async fn execute(&self, state: &BotState, interaction: &Interaction) -> Result<Reply> {
        let (Some(guild_id), Some(user)) = (interaction.guild_id.as_deref(), interaction.invoker()) else {
            return Ok(Reply::ephemeral(GUILD_ONLY));
        };

        let settings = Settings::load_or_default(state.stores.settings.as_ref(), guild_id).await?;
        if !settings.is_whitelisted() && !guard::is_owner(state, interaction) {
            return Ok(Reply::ephemeral(NOT_WHITELISTED));
        }
        if settings.mod_role_id.is_none() {
            return Ok(Reply::ephemeral(NO_MOD_ROLE));
        }
        let Some(channel_id) = settings.pillow_channel_id.as_deref() else {
            return Ok(Reply::ephemeral(
                "The pillow submissions channel has not been configured. Please ask an admin to set it up.",
            ));
        };
        if interaction.channel_id.as_deref() != Some(channel_id) {
            return Ok(Reply::ephemeral(format!(
                "Please use the pillow submissions channel: <#{channel_id}>"
            )));
        }

        let (Some(name), Some(raw_type), Some(texture)) = (
            interaction.option_str("name"),
            interaction.option_str("type"),
            interaction.option_str("texture"),
        ) else {
            return Ok(Reply::ephemeral("Missing required options"));
        };
        let Ok(pillow_type) = raw_type.parse::<PillowType>() else {
            return Ok(Reply::ephemeral(format!("Unknown pillow type: {raw_type}")));
        };
        let user_name = interaction
            .option_str("username")
            .filter(|u| !u.is_empty())
            .unwrap_or(&user.username)
            .to_string();

        let Some(attachment) = interaction.attachment(texture) else {
            return Ok(Reply::ephemeral("Texture attachment not found"));
        };
        if !attachment
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("png"))
        {
            return Ok(Reply::ephemeral("Texture must be a PNG image"));
        }

        let cooldown = settings.cooldown_secs();
        if let Some(secs) = cooldown {
            if state.stores.cooldowns.get(&user.id).await?.is_some() {
                return Ok(Reply::ephemeral(format!("You are on cooldown for {secs} seconds")));
            }
        }

        let download = match state.discord.download(&attachment.url).await {
            Ok(download) => download,
            Err(e) => {
                e.print_tree();
                return Ok(Reply::ephemeral("Failed to download the attachment"));
            }
        };

        let key = pillow_key(&user.id, pillow_type);
        let data = PillowData {
            user_id: user.id.clone(),
            user_name: user_name.clone(),
            name: name.to_string(),
            pillow_type,
            submitted_at: Utc::now(),
            approver_id: None,
            approved_at: None,
        };
        let object = PutObject {
            data: download.bytes.clone(),
            content_type: Some(PNG.to_string()),
            metadata: to_metadata(&data)?,
        };
        if let Err(e) = state.stores.pillow_submissions.put(&key, object).await {
            e.print_tree();
            return Ok(Reply::ephemeral(format!(
                "Failed to upload image to storage: {}",
                e.reason()
            )));
        }
        tracing::info!(key = %key, guild = guild_id, "pillow submitted");

        // Only a stored submission starts the cooldown.
        if let Some(secs) = cooldown {
            state
                .stores
                .cooldowns
                .put(&user.id, "true".to_string(), Some(Duration::from_secs(secs)))
                .await?;
        }

        let filename = format!("{key}.png");
        let embed = Embed {
            title: Some(format!("{user_name}'s Pillow Submission")),
            description: Some(format!(
                "A new pillow submission has been received from <@{}>",
                user.id
            )),
            color: Some(ACCENT_COLOR),
            fields: vec![
                EmbedField {
                    name: "Name:".to_string(),
                    value: name.to_string(),
                    inline: true,
                },
                EmbedField {
                    name: "Type:".to_string(),
                    value: pillow_type.to_string(),
                    inline: true,
                },
            ],
            thumbnail: user.avatar_url().map(|url| EmbedMedia { url }),
            image: Some(EmbedMedia {
                url: format!("attachment://{filename}"),
            }),
            ..Default::default()
        };
        let review = format!("{}-{pillow_type}", user.id);
        let buttons = components::action_row(vec![
            components::button(
                ButtonStyle::Primary,
                "Approve",
                &custom_id(&["submit", "pillow"], &format!("approve-{review}")),
                false,
            ),
            components::button(
                ButtonStyle::Danger,
                "Deny",
                &custom_id(&["submit", "pillow"], &format!("deny-{review}")),
                false,
            ),
        ]);

        Ok(
            Reply::embed(embed, Some("New pillow submission received".to_string()), vec![buttons]).with_attachment(
                FileUpload {
                    filename,
                    content_type: PNG.to_string(),
                    data: download.bytes,
                },
            ),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Review {
    Approve,
    Deny,
}

/// `approve-{userId}-{type}` or `deny-{userId}-{type}`.
fn parse_review(payload: &str) -> Option<(Review, &str, PillowType)> {
    let (action, rest) = payload.split_once('-')?;
    let (user_id, raw_type) = rest.split_once('-')?;
    let action = match action {
        "approve" => Review::Approve,
        "deny" => Review::Deny,
        _ => return None,
    };
    if user_id.is_empty() {
        return None;
    }
    Some((action, user_id, raw_type.parse().ok()?))
}

fn reviewed_embed(interaction: &Interaction, key: &str, verdict: &str, reviewer: &User) -> Embed {
    let mut embed = interaction
        .message
        .as_ref()
        .and_then(|m| m.embeds.first().cloned())
        .unwrap_or_else(|| Embed {
            title: Some("Pillow Submission".to_string()),
            color: Some(ACCENT_COLOR),
            ..Default::default()
        });
    embed.image = Some(EmbedMedia {
        url: format!("attachment://{key}.png"),
    });
    embed.footer = Some(EmbedFooter {
        text: format!("{verdict} by {}", reviewer.username),
        icon_url: reviewer.avatar_url(),
    });
    embed.timestamp = Some(Utc::now().to_rfc3339());
    embed
}

fn reviewed(embed: Embed) -> Reply {
    Reply::update(InteractionResponseData {
        content: Some(String::new()),
        embeds: Some(vec![embed]),
        components: Some(Vec::new()),
        ..Default::default()
    })
}

pub struct ReviewPillow;

#[async_trait]
impl ExecuteComponent for ReviewPillow {
    async fn execute_component(&self, state: &BotState, interaction: &Interaction, payload: &str) -> Result<Reply> {
        let (Some(guild_id), Some(reviewer)) = (interaction.guild_id.as_deref(), interaction.invoker()) else {
            return Ok(Reply::ephemeral(GUILD_ONLY));
        };
        let Some((action, user_id, pillow_type)) = parse_review(payload) else {
            return Ok(Reply::ephemeral("Unknown button interaction"));
        };

        let settings = Settings::load_or_default(state.stores.settings.as_ref(), guild_id).await?;
        if settings.mod_role_id.is_none() && !guard::is_owner(state, interaction) {
            return Ok(Reply::ephemeral("No mod role set"));
        }
        if !guard::is_moderator(state, &settings, interaction) {
            return Ok(Reply::ephemeral(MODERATOR_ONLY));
        }

        let key = pillow_key(user_id, pillow_type);
        match action {
            Review::Approve => approve(state, interaction, &key, reviewer).await,
            Review::Deny => {
                if !state.stores.pillow_submissions.delete(&key).await? {
                    return Ok(Reply::ephemeral(ALREADY_HANDLED));
                }
                tracing::info!(key = %key, reviewer = %reviewer.id, "pillow denied");
                Ok(reviewed(reviewed_embed(interaction, &key, "Denied", reviewer)))
            }
        }
    }
}

async fn approve(state: &BotState, interaction: &Interaction, key: &str, reviewer: &User) -> Result<Reply> {
    let Some(pending) = state.stores.pillow_submissions.get(key).await? else {
        return Ok(Reply::ephemeral(ALREADY_HANDLED));
    };

    let mut data: PillowData = from_metadata(&pending.head.metadata)?;
    data.approver_id = Some(reviewer.id.clone());
    data.approved_at = Some(Utc::now());
    let approved = PutObject {
        data: pending.data.clone(),
        content_type: pending.head.content_type.clone(),
        metadata: to_metadata(&data)?,
    };

    // Only the caller whose delete removed the object may continue.
    if !state.stores.pillow_submissions.delete(key).await? {
        return Ok(Reply::ephemeral(ALREADY_HANDLED));
    }

    if let Err(e) = state.stores.pillows.put(key, approved).await {
        e.print_tree();
        let restore = PutObject {
            data: pending.data,
            content_type: pending.head.content_type,
            metadata: pending.head.metadata,
        };
        if let Err(restore_err) = state.stores.pillow_submissions.put(key, restore).await {
            tracing::error!(key, "failed to restore pending submission");
            restore_err.print_tree();
        }
        return Ok(Reply::ephemeral(format!(
            "An error occurred while approving: {}",
            e.reason()
        )));
    }

    tracing::info!(key, reviewer = %reviewer.id, "pillow approved");
    Ok(reviewed(reviewed_embed(interaction, key, "Approved", reviewer)))
}
