use async_trait::async_trait;
use serde_json::Value;

use crate::commands::custom_id::custom_id;
use crate::commands::guard::{self, GUILD_ONLY, MODERATOR_ONLY};
use crate::commands::registry::{Command, Execute, ExecuteComponent, Leaf};
use crate::db::images::{ImageKind, PhotoData, PillowData, PillowType, pillow_key};
use crate::db::settings::Settings;
use crate::db::{ListOptions, ObjectHead};
use crate::discord::components::{self, ButtonStyle};
use crate::discord::response::Reply;
use crate::error::Result;
use crate::state::BotState;
use crate::types::discord::{CommandOption, Interaction, OptionType};

const DANGER_COLOR: u32 = 0xf04847;

pub fn command() -> Command {
    let mut pillow_type = CommandOption::new(
        OptionType::String,
        "type",
        "The type of pillow to delete (requires user to be specified)",
    );
    for kind in PillowType::ALL {
        pillow_type = pillow_type.choice(kind.as_ref(), kind.as_ref());
    }

    Command::group(
        "delete",
        "Delete an image",
        vec![
            Leaf::new("pillow", "Delete a pillow", DeletePillow)
                .option(CommandOption::new(OptionType::User, "user", "The user who owns the pillow"))
                .option(pillow_type)
                .option(CommandOption::new(OptionType::String, "name", "The name of the pillow to delete"))
                .option(CommandOption::new(
                    OptionType::String,
                    "id",
                    "The ID of the pillow to delete, skips search if specified",
                ))
                .component(DeleteAction(ImageKind::Pillow)),
            Leaf::new("photo", "Delete a photo", DeletePhoto)
                .option(CommandOption::new(
                    OptionType::String,
                    "id",
                    "The ID of the photo to delete, skips search if specified",
                ))
                .component(DeleteAction(ImageKind::Photo)),
        ],
        vec![],
    )
}

/// `None` when the caller may proceed, otherwise the refusal.
async fn refuse_non_moderator(state: &BotState, interaction: &Interaction) -> Result<Option<Reply>> {
    let Some(guild_id) = interaction.guild_id.as_deref() else {
        return Ok(Some(Reply::ephemeral(GUILD_ONLY)));
    };
    let settings = Settings::load_or_default(state.stores.settings.as_ref(), guild_id).await?;
    if !guard::is_moderator(state, &settings, interaction) {
        tracing::warn!(guild = guild_id, user = ?interaction.invoker_id(), "delete refused");
        return Ok(Some(Reply::ephemeral(MODERATOR_ONLY)));
    }
    Ok(None)
}

fn path(kind: ImageKind) -> [&'static str; 2] {
    match kind {
        ImageKind::Pillow => ["delete", "pillow"],
        ImageKind::Photo => ["delete", "photo"],
    }
}

fn label(kind: ImageKind, head: &ObjectHead) -> String {
    let field = match kind {
        ImageKind::Pillow => PillowData::NAME,
        ImageKind::Photo => PhotoData::DATE,
    };
    head.metadata.get(field).cloned().unwrap_or_else(|| head.key.clone())
}

fn owner(head: &ObjectHead) -> &str {
    head.metadata.get(PillowData::USER_ID).map(String::as_str).unwrap_or("0")
}

/// Rows shown in a selection; each costs three components of the 40 a message may carry.
const MAX_SELECTION_ROWS: usize = 10;

/// Several candidates: one select button per object, capped at [`MAX_SELECTION_ROWS`].
fn selection(state: &BotState, kind: ImageKind, objects: &[ObjectHead]) -> Reply {
    let base_url = state.config.image_url(kind);
    let rows = objects
        .iter()
        .take(MAX_SELECTION_ROWS)
        .map(|head| {
            components::section(
                format!(
                    "- [{}]({base_url}/{}) by <@{}>",
                    label(kind, head),
                    head.key,
                    owner(head)
                ),
                components::button(
                    ButtonStyle::Secondary,
                    "Select",
                    &custom_id(&path(kind), &format!("select-{}", head.key)),
                    false,
                ),
            )
        })
        .collect::<Vec<_>>();

    let mut out = vec![
        components::text(format!("Found {} items.", objects.len())),
        components::container(rows),
    ];
    if objects.len() > MAX_SELECTION_ROWS {
        out.push(components::text(format!(
            "-# {} more not shown. Pass `id` to pick one directly.",
            objects.len() - MAX_SELECTION_ROWS
        )));
    }
    Reply::ephemeral_components(out)
}

fn confirmation_components(state: &BotState, kind: ImageKind, head: &ObjectHead) -> Vec<Value> {
    let url = format!("{}/{}", state.config.image_url(kind), head.key);
    let metadata = serde_json::to_string_pretty(&head.metadata).unwrap_or_default();
    let mut container = components::container(vec![
        components::media_gallery(&url, &label(kind, head)),
        components::text(format!("Metadata:\n```json\n{metadata}\n```")),
        components::separator(),
        components::text(format!(
            "ID: `{}`\nThis will delete the {kind} permanently.",
            head.key
        )),
        components::action_row(vec![
            components::button(
                ButtonStyle::Danger,
                "Delete",
                &custom_id(&path(kind), &format!("confirm-{}", head.key)),
                false,
            ),
            components::button(
                ButtonStyle::Secondary,
                "Cancel",
                &custom_id(&path(kind), "cancel-x"),
                false,
            ),
        ]),
    ]);
    container["accent_color"] = DANGER_COLOR.into();

    vec![
        components::text(format!(
            "Are you sure you want to delete this {kind}? This action cannot be undone."
        )),
        container,
    ]
}

/// Looks the object up and asks for confirmation.
async fn confirm(state: &BotState, kind: ImageKind, key: &str, update: bool) -> Result<Reply> {
    let Some(head) = state.stores.bucket(kind).head(key).await? else {
        return Ok(Reply::ephemeral("The item was not found or has no metadata."));
    };
    let components = confirmation_components(state, kind, &head);
    Ok(if update {
        Reply::update_components(components)
    } else {
        Reply::ephemeral_components(components)
    })
}

/// One match asks for confirmation, several offer a choice.
async fn resolve(state: &BotState, kind: ImageKind, mut matches: Vec<ObjectHead>) -> Result<Reply> {
    match matches.len() {
        0 => Ok(Reply::ephemeral(format!("No {} found matching the criteria.", kind.plural()))),
        1 => {
            let head = matches.remove(0);
            confirm(state, kind, &head.key, false).await
        }
        _ => Ok(selection(state, kind, &matches)),
    }
}

pub struct DeletePillow;

#[async_trait]
impl Execute for DeletePillow {
    async fn execute(&self, state: &BotState, interaction: &Interaction) -> Result<Reply> {
        if let Some(refusal) = refuse_non_moderator(state, interaction).await? {
            return Ok(refusal);
        }

        let user = interaction.option_str("user");
        let name = interaction.option_str("name");
        let pillow_type = match interaction.option_str("type") {
            Some(raw) => match raw.parse::<PillowType>() {
                Ok(t) => Some(t),
                Err(_) => return Ok(Reply::ephemeral(format!("Unknown pillow type: {raw}"))),
            },
            None => None,
        };

        if let Some(id) = interaction.option_str("id") {
            return confirm(state, ImageKind::Pillow, id, false).await;
        }
        if let (Some(user), Some(pillow_type)) = (user, pillow_type) {
            return confirm(state, ImageKind::Pillow, &pillow_key(user, pillow_type), false).await;
        }

        let matches = match (user, name) {
            (Some(user), _) => {
                state
                    .stores
                    .pillows
                    .list(ListOptions::prefixed(format!("{user}_")))
                    .await?
            }
            (None, Some(name)) => state
                .stores
                .pillows
                .list(ListOptions::with_metadata())
                .await?
                .into_iter()
                .filter(|head| {
                    head.metadata
                        .get(PillowData::NAME)
                        .is_some_and(|n| n.eq_ignore_ascii_case(name))
                })
                .collect(),
            (None, None) if pillow_type.is_some() => {
                return Ok(Reply::ephemeral(
                    "You must specify either a user or a name to delete a pillow.",
                ));
            }
            (None, None) => {
                return Ok(Reply::ephemeral(
                    "You must specify at least one of `id`, `user`, `type`, or `name` to delete a pillow.",
                ));
            }
        };
        resolve(state, ImageKind::Pillow, matches).await
    }
}

pub struct DeletePhoto;

#[async_trait]
impl Execute for DeletePhoto {
    async fn execute(&self, state: &BotState, interaction: &Interaction) -> Result<Reply> {
        if let Some(refusal) = refuse_non_moderator(state, interaction).await? {
            return Ok(refusal);
        }
        if let Some(id) = interaction.option_str("id") {
            return confirm(state, ImageKind::Photo, id, false).await;
        }
        let photos = state.stores.photos.list(ListOptions::with_metadata()).await?;
        resolve(state, ImageKind::Photo, photos).await
    }
}

/// Select, confirm and cancel buttons of both delete subcommands.
pub struct DeleteAction(ImageKind);

#[async_trait]
impl ExecuteComponent for DeleteAction {
    async fn execute_component(&self, state: &BotState, interaction: &Interaction, payload: &str) -> Result<Reply> {
        if let Some(refusal) = refuse_non_moderator(state, interaction).await? {
            return Ok(refusal);
        }
        let kind = self.0;
        let (action, key) = payload.split_once('-').unwrap_or((payload, ""));

        match action {
            "cancel" => Ok(Reply::update_components(vec![components::text(
                "This action has been cancelled.",
            )])),
            _ if key.is_empty() => Ok(Reply::ephemeral(format!("No ID provided for {action}."))),
            "select" => confirm(state, kind, key, true).await,
            "confirm" => match state.stores.bucket(kind).delete(key).await {
                Ok(true) => {
                    tracing::info!(key, kind = %kind, user = ?interaction.invoker_id(), "image deleted");
                    Ok(Reply::update_components(vec![components::text(format!(
                        "The {kind} with ID `{key}` has been deleted."
                    ))]))
                }
                Ok(false) => Ok(Reply::ephemeral(format!(
                    "Failed to delete the {kind}: `{key}` does not exist"
                ))),
                Err(e) => {
                    e.print_tree();
                    Ok(Reply::ephemeral(format!("Failed to delete the {kind}: {}", e.reason())))
                }
            },
            _ => Ok(Reply::ephemeral("Unknown button interaction")),
        }
    }
}
