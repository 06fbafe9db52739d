//! Builders shared by the unit tests: in-memory state, a fake Discord
//! client and hand-rolled interaction payloads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use ed25519_dalek::SigningKey;
use serde_json::Value;

use crate::commands::registry::{Execute, ExecuteComponent};
use crate::config::Config;
use crate::db::{ListOptions, ObjectHead, ObjectStore, PutObject, Stores, StoredObject};
use crate::db::settings::Settings;
use crate::discord::api::{DiscordHttp, Download};
use crate::discord::response::Reply;
use crate::error::{BotError, Result};
use crate::state::BotState;
use crate::types::discord::{
    ApplicationCommand, Attachment, CommandDataOption, DISCORD_EPOCH_MS, GuildMember, Interaction, InteractionData,
    InteractionType, OptionType, PERMISSION_ADMINISTRATOR, ResolvedData, User,
};

pub const GUILD_ID: &str = "5000";
pub const OWNER_ID: &str = "1";

/// PNG signature followed by an empty IHDR-shaped chunk; enough for byte comparisons.
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
];

pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

pub fn public_key_hex() -> String {
    hex::encode(signing_key().verifying_key().to_bytes())
}

#[derive(Default)]
pub struct FakeDiscord {
    downloads: AtomicUsize,
    registered: Mutex<Vec<(String, Vec<ApplicationCommand>)>>,
}

impl FakeDiscord {
    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn registered(&self) -> Vec<(String, Vec<ApplicationCommand>)> {
        self.registered.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiscordHttp for FakeDiscord {
    async fn application_id(&self) -> Result<String> {
        Ok("100000000000000000".to_string())
    }

    async fn register_commands(&self, application_id: &str, commands: &[ApplicationCommand]) -> Result<()> {
        self.registered
            .lock()
            .unwrap()
            .push((application_id.to_string(), commands.to_vec()));
        Ok(())
    }

    async fn download(&self, _url: &str) -> Result<Download> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(Download {
            content_type: Some("image/png".to_string()),
            bytes: Bytes::from_static(PNG_BYTES),
        })
    }
}

pub fn state_with_fake() -> (BotState, Arc<FakeDiscord>) {
    let fake = Arc::new(FakeDiscord::default());
    let state = BotState::new(Config::for_tests(&public_key_hex()), fake.clone(), Stores::memory()).unwrap();
    (state, fake)
}

pub fn state() -> BotState {
    state_with_fake().0
}

/// State over caller-assembled stores, e.g. with one bucket swapped for [`RejectingPuts`].
pub fn state_with_stores(stores: Stores) -> BotState {
    BotState::new(
        Config::for_tests(&public_key_hex()),
        Arc::new(FakeDiscord::default()),
        stores,
    )
    .unwrap()
}

/// Empty bucket whose writes always fail.
pub struct RejectingPuts;

#[async_trait]
impl ObjectStore for RejectingPuts {
    async fn get(&self, _key: &str) -> Result<Option<StoredObject>> {
        Ok(None)
    }

    async fn head(&self, _key: &str) -> Result<Option<ObjectHead>> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _object: PutObject) -> Result<ObjectHead> {
        Err(BotError::new("bucket_unavailable").push_str("bucket is read-only"))
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn list(&self, _options: ListOptions) -> Result<Vec<ObjectHead>> {
        Ok(Vec::new())
    }
}

/// Marks [`GUILD_ID`] as whitelisted on top of `settings`.
pub async fn whitelist(state: &BotState, settings: Settings) {
    let patch = Settings {
        name: Some("Test Guild".to_string()),
        ..Default::default()
    }
    .merge(settings);
    Settings::patch(state.stores.settings.as_ref(), GUILD_ID, patch)
        .await
        .unwrap();
}

/// Snowflake for the current instant.
pub fn snowflake_now() -> String {
    let ms = chrono::Utc::now().timestamp_millis() - DISCORD_EPOCH_MS;
    ((ms as u64) << 22).to_string()
}

pub fn ping() -> Interaction {
    Interaction {
        id: "1".into(),
        interaction_type: InteractionType::Ping as u8,
        ..Default::default()
    }
}

pub fn command(name: &str, options: Vec<CommandDataOption>) -> Interaction {
    Interaction {
        id: "2".into(),
        interaction_type: InteractionType::ApplicationCommand as u8,
        data: Some(InteractionData {
            name: name.to_string(),
            options,
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn component(custom_id: &str) -> Interaction {
    Interaction {
        id: "3".into(),
        interaction_type: InteractionType::MessageComponent as u8,
        data: Some(InteractionData {
            custom_id: Some(custom_id.to_string()),
            component_type: Some(2),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn option(name: &str, kind: OptionType, value: Option<Value>, options: Vec<CommandDataOption>) -> CommandDataOption {
    CommandDataOption {
        name: name.to_string(),
        option_type: kind as u8,
        value,
        options,
    }
}

pub fn sub(name: &str, options: Vec<CommandDataOption>) -> CommandDataOption {
    option(name, OptionType::Subcommand, None, options)
}

pub fn group(name: &str, sub: CommandDataOption) -> CommandDataOption {
    option(name, OptionType::SubcommandGroup, None, vec![sub])
}

pub fn string_option(name: &str, value: &str) -> CommandDataOption {
    option(name, OptionType::String, Some(Value::from(value)), vec![])
}

pub fn integer_option(name: &str, value: i64) -> CommandDataOption {
    option(name, OptionType::Integer, Some(Value::from(value)), vec![])
}

pub fn bool_option(name: &str, value: bool) -> CommandDataOption {
    option(name, OptionType::Boolean, Some(Value::from(value)), vec![])
}

/// Adds a resolved attachment with the given id.
pub fn attach(interaction: &mut Interaction, id: &str, content_type: &str) {
    let data = interaction.data.get_or_insert_with(Default::default);
    data.resolved
        .get_or_insert_with(|| ResolvedData {
            attachments: HashMap::new(),
        })
        .attachments
        .insert(
            id.to_string(),
            Attachment {
                id: id.to_string(),
                filename: format!("{id}.png"),
                content_type: Some(content_type.to_string()),
                url: format!("https://cdn.example.test/{id}.png"),
                size: Some(PNG_BYTES.len() as u64),
            },
        );
}

/// Guild member invoking an interaction in [`GUILD_ID`].
pub struct Member {
    id: String,
    roles: Vec<String>,
    admin: bool,
}

impl Member {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            roles: Vec::new(),
            admin: false,
        }
    }

    pub fn admin(mut self) -> Self {
        self.admin = true;
        self
    }

    pub fn roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn in_guild(self, mut interaction: Interaction) -> Interaction {
        let permissions = if self.admin { PERMISSION_ADMINISTRATOR } else { 0 };
        interaction.guild_id = Some(GUILD_ID.to_string());
        interaction.member = Some(GuildMember {
            user: User {
                username: format!("member-{}", self.id),
                id: self.id,
                avatar: None,
            },
            roles: self.roles,
            permissions: Some(permissions.to_string()),
        });
        interaction
    }
}

/// Records which handler ran, in order.
#[derive(Default, Clone)]
pub struct Counter {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Counter {
    pub fn handler(&self, label: &'static str) -> CountingHandler {
        CountingHandler {
            label,
            calls: self.calls.clone(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

pub struct CountingHandler {
    label: &'static str,
    calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Execute for CountingHandler {
    async fn execute(&self, _state: &BotState, _interaction: &Interaction) -> Result<Reply> {
        self.calls.lock().unwrap().push(self.label.to_string());
        Ok(Reply::message(self.label))
    }
}

#[async_trait]
impl ExecuteComponent for CountingHandler {
    async fn execute_component(&self, _state: &BotState, _interaction: &Interaction, payload: &str) -> Result<Reply> {
        self.calls.lock().unwrap().push(self.label.to_string());
        Ok(Reply::message(format!("{}:{payload}", self.label)))
    }
}

pub struct Echo(pub &'static str);

#[async_trait]
impl Execute for Echo {
    async fn execute(&self, _state: &BotState, _interaction: &Interaction) -> Result<Reply> {
        Ok(Reply::message(self.0))
    }
}

pub struct Failing;

#[async_trait]
impl Execute for Failing {
    async fn execute(&self, _state: &BotState, _interaction: &Interaction) -> Result<Reply> {
        Err(BotError::new("test_failure").push_str("handler always fails"))
    }
}
