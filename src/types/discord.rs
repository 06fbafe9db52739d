use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Milliseconds between the Unix epoch and the first second of 2015.
pub const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

pub const FLAG_EPHEMERAL: u64 = 1 << 6;
pub const FLAG_IS_COMPONENTS_V2: u64 = 1 << 15;

/// ADMINISTRATOR bit of a member's permission set.
pub const PERMISSION_ADMINISTRATOR: u64 = 0x8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionType {
    Ping = 1,
    ApplicationCommand = 2,
    MessageComponent = 3,
    Autocomplete = 4,
    ModalSubmit = 5,
    Unknown,
}

impl InteractionType {
    pub fn from_u8(kind: u8) -> Self {
        match kind {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            3 => Self::MessageComponent,
            4 => Self::Autocomplete,
            5 => Self::ModalSubmit,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    Subcommand = 1,
    SubcommandGroup = 2,
    String = 3,
    Integer = 4,
    Boolean = 5,
    User = 6,
    Channel = 7,
    Role = 8,
    Mentionable = 9,
    Number = 10,
    Attachment = 11,
    Unknown,
}

impl OptionType {
    pub fn from_u8(kind: u8) -> Self {
        match kind {
            1 => Self::Subcommand,
            2 => Self::SubcommandGroup,
            3 => Self::String,
            4 => Self::Integer,
            5 => Self::Boolean,
            6 => Self::User,
            7 => Self::Channel,
            8 => Self::Role,
            9 => Self::Mentionable,
            10 => Self::Number,
            11 => Self::Attachment,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackType {
    Pong = 1,
    ChannelMessageWithSource = 4,
    UpdateMessage = 7,
}

// Interaction from Discord
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Interaction {
    pub id: String,
    pub application_id: String,
    #[serde(rename = "type")]
    pub interaction_type: u8,
    pub data: Option<InteractionData>,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub member: Option<GuildMember>,
    pub user: Option<User>,
    pub token: String,
    pub message: Option<Message>,
}

impl Interaction {
    pub fn kind(&self) -> InteractionType {
        InteractionType::from_u8(self.interaction_type)
    }

    /// The user who triggered the interaction, in a guild or in DMs.
    pub fn invoker(&self) -> Option<&User> {
        self.member
            .as_ref()
            .map(|m| &m.user)
            .or(self.user.as_ref())
    }

    pub fn invoker_id(&self) -> Option<&str> {
        self.invoker().map(|u| u.id.as_str())
    }

    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.name.as_str())
    }

    pub fn custom_id(&self) -> Option<&str> {
        self.data.as_ref()?.custom_id.as_deref()
    }

    pub fn top_options(&self) -> &[CommandDataOption] {
        self.data.as_ref().map(|d| d.options.as_slice()).unwrap_or(&[])
    }

    /// Options of the invoked leaf, below any subcommand group and subcommand.
    pub fn leaf_options(&self) -> &[CommandDataOption] {
        let mut options = self.top_options();
        while let Some(first) = options.first() {
            match first.kind() {
                OptionType::Subcommand | OptionType::SubcommandGroup => {
                    options = first.options.as_slice();
                }
                _ => break,
            }
        }
        options
    }

    pub fn option(&self, name: &str) -> Option<&CommandDataOption> {
        self.leaf_options().iter().find(|o| o.name == name)
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.option(name)?.value.as_ref()?.as_str()
    }

    pub fn option_i64(&self, name: &str) -> Option<i64> {
        self.option(name)?.value.as_ref()?.as_i64()
    }

    pub fn option_bool(&self, name: &str) -> Option<bool> {
        self.option(name)?.value.as_ref()?.as_bool()
    }

    pub fn attachment(&self, id: &str) -> Option<&Attachment> {
        self.data.as_ref()?.resolved.as_ref()?.attachments.get(id)
    }

    pub fn has_permission(&self, bit: u64) -> bool {
        self.member
            .as_ref()
            .and_then(|m| m.permissions.as_deref())
            .and_then(|p| p.parse::<u64>().ok())
            .is_some_and(|p| p & bit == bit)
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.member
            .as_ref()
            .is_some_and(|m| m.roles.iter().any(|r| r == role_id))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionData {
    pub name: String,
    pub options: Vec<CommandDataOption>,
    pub resolved: Option<ResolvedData>,
    pub custom_id: Option<String>,
    pub component_type: Option<u8>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolvedData {
    pub attachments: HashMap<String, Attachment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandDataOption {
    pub name: String,
    #[serde(rename = "type")]
    pub option_type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandDataOption>,
}

impl CommandDataOption {
    pub fn kind(&self) -> OptionType {
        OptionType::from_u8(self.option_type)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuildMember {
    pub user: User,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl User {
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar
            .as_ref()
            .map(|hash| format!("https://cdn.discordapp.com/avatars/{}/{}.png", self.id, hash))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedMedia {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

// Interaction response to Discord
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub response_type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionResponseData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Embed>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_mentions: Option<AllowedMentions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentRef>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: String,
    pub filename: String,
}

// Application command schema sent to PUT /applications/{id}/commands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationCommand {
    pub name: String,
    #[serde(rename = "type")]
    pub command_type: u8,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOption {
    #[serde(rename = "type")]
    pub option_type: u8,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<CommandOptionChoice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
}

impl CommandOption {
    pub fn new(option_type: OptionType, name: &str, description: &str) -> Self {
        Self {
            option_type: option_type as u8,
            name: name.to_string(),
            description: description.to_string(),
            required: false,
            choices: Vec::new(),
            options: Vec::new(),
            min_value: None,
            max_value: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn choice(mut self, name: &str, value: &str) -> Self {
        self.choices.push(CommandOptionChoice {
            name: name.to_string(),
            value: Value::String(value.to_string()),
        });
        self
    }

    pub fn range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOptionChoice {
    pub name: String,
    pub value: Value,
}

// Discord API error response
#[derive(Debug, Deserialize)]
pub struct DiscordErrorResponse {
    pub message: String,
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub retry_after: Option<f64>,
    #[serde(default)]
    pub global: Option<bool>,
    #[serde(default)]
    pub errors: Option<Value>,
}

impl std::fmt::Display for DiscordErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.unwrap_or(0), self.message)?;

        if let Some(retry) = self.retry_after {
            write!(f, " (retry after {:.3}s)", retry)?;
        }

        if self.global == Some(true) {
            write!(f, " [GLOBAL]")?;
        }

        if let Some(errors) = &self.errors {
            write!(f, "\nDetails: {}", serde_json::to_string_pretty(errors).unwrap_or_default())?;
        }

        Ok(())
    }
}

// Application info
#[derive(Debug, Deserialize)]
pub struct ApplicationInfo {
    pub id: String,
}

/// Creation time of a snowflake in Unix milliseconds.
pub fn snowflake_timestamp_ms(id: &str) -> Option<i64> {
    let raw = id.parse::<u64>().ok()?;
    Some((raw >> 22) as i64 + DISCORD_EPOCH_MS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_ping_parses() {
        let interaction: Interaction = serde_json::from_value(json!({ "type": 1 })).unwrap();
        assert_eq!(interaction.kind(), InteractionType::Ping);
        assert!(interaction.data.is_none());
    }

    #[test]
    fn leaf_options_descend_through_groups() {
        let interaction: Interaction = serde_json::from_value(json!({
            "type": 2,
            "data": {
                "name": "config",
                "options": [{
                    "name": "channel", "type": 2,
                    "options": [{
                        "name": "pillow", "type": 1,
                        "options": [{ "name": "channel", "type": 7, "value": "42" }]
                    }]
                }]
            }
        }))
        .unwrap();

        assert_eq!(interaction.option_str("channel"), Some("42"));
        assert_eq!(interaction.leaf_options().len(), 1);
    }

    #[test]
    fn administrator_bit_is_read_from_permission_string() {
        let mut interaction = Interaction::default();
        interaction.member = Some(GuildMember {
            user: User::default(),
            roles: vec!["7".into()],
            permissions: Some("2147483656".into()),
        });
        assert!(interaction.has_permission(PERMISSION_ADMINISTRATOR));
        assert!(interaction.has_role("7"));
        assert!(!interaction.has_role("8"));
    }

    #[test]
    fn snowflake_decodes_creation_time() {
        // 175928847299117063 was created at 2016-04-30T11:18:25.796Z
        assert_eq!(snowflake_timestamp_ms("175928847299117063"), Some(1_462_015_105_796));
        assert_eq!(snowflake_timestamp_ms("nope"), None);
    }
}
