use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde_json::Value;

use crate::commands::registry::{Command, Execute, Leaf};
use crate::db::images::{ImageKind, PhotoData, PillowData, PillowType, pillow_key};
use crate::db::{ListOptions, ObjectHead, from_metadata};
use crate::discord::components;
use crate::discord::response::Reply;
use crate::error::Result;
use crate::state::BotState;
use crate::types::discord::{CommandOption, Interaction, OptionType};

pub fn command() -> Command {
    let mut pillow_type = CommandOption::new(
        OptionType::String,
        "type",
        "The type of pillow to view (only works with user)",
    );
    for kind in PillowType::ALL {
        pillow_type = pillow_type.choice(kind.as_ref(), kind.as_ref());
    }

    Command::group(
        "view",
        "View an image",
        vec![
            Leaf::new("pillow", "View a pillow", ViewPillow)
                .option(CommandOption::new(
                    OptionType::User,
                    "user",
                    "The user whose pillows to view (all of them unless type is given)",
                ))
                .option(pillow_type)
                .option(CommandOption::new(OptionType::String, "id", "The id of the pillow to view")),
            Leaf::new("photo", "View a group photo", ViewPhoto)
                .option(CommandOption::new(OptionType::String, "id", "The id of the photo to view")),
        ],
        vec![],
    )
}

fn discord_time(at: &DateTime<Utc>) -> String {
    format!("<t:{}:F>", at.timestamp())
}

fn pillow_details(data: &PillowData, url: &str) -> String {
    let submitter = if data.user_name.is_empty() {
        format!("<@{}>", data.user_id)
    } else {
        data.user_name.clone()
    };
    let mut out = format!("- Submitted by {submitter} on {}\n", discord_time(&data.submitted_at));
    if let (Some(approver), Some(at)) = (&data.approver_id, &data.approved_at) {
        out.push_str(&format!("- Approved by <@{approver}> on {}\n", discord_time(at)));
    }
    out.push_str(&format!("\n-# [Click here to view the pillow in your browser]({url})"));
    out
}

fn single_pillow(key: &str, data: &PillowData, base_url: &str) -> Vec<Value> {
    let url = format!("{base_url}/{key}");
    vec![components::container(vec![
        components::text(format!(
            "# Here's <@{}>'s `{}` pillow \"{}\":",
            data.user_id, data.pillow_type, data.name
        )),
        components::media_gallery(&url, &data.name),
        components::separator(),
        components::text(pillow_details(data, &url)),
    ])]
}

/// Picks one entry at random; `None` for an empty listing.
fn pick_random(objects: Vec<ObjectHead>) -> Option<ObjectHead> {
    objects.choose(&mut rand::thread_rng()).cloned()
}

pub struct ViewPillow;

impl ViewPillow {
    async fn one(&self, state: &BotState, key: &str) -> Result<Reply> {
        let not_found = || Reply::ephemeral("The pillow was not found or has no metadata.");
        let Some(head) = state.stores.pillows.head(key).await? else {
            return Ok(not_found());
        };
        let Ok(data) = from_metadata::<PillowData>(&head.metadata) else {
            return Ok(not_found());
        };
        Ok(Reply::components(single_pillow(
            key,
            &data,
            state.config.image_url(ImageKind::Pillow),
        )))
    }

    async fn by_user(&self, state: &BotState, user_id: &str) -> Result<Reply> {
        let objects = state
            .stores
            .pillows
            .list(ListOptions::prefixed(format!("{user_id}_")))
            .await?;
        let pillows = objects
            .iter()
            .filter_map(|head| Some((head.key.as_str(), from_metadata::<PillowData>(&head.metadata).ok()?)))
            .collect::<Vec<_>>();
        if pillows.is_empty() {
            return Ok(Reply::ephemeral(format!("No pillows found for user <@{user_id}>.")));
        }

        let base_url = state.config.image_url(ImageKind::Pillow);
        let mut inner = vec![components::text(format!(
            "# Pillows submitted by <@{user_id}>: ({} found)",
            pillows.len()
        ))];
        for (key, data) in &pillows {
            let url = format!("{base_url}/{key}");
            inner.push(components::separator());
            inner.push(components::text(format!(
                "## `{}` pillow: \"{}\"\n(ID: `{key}`)",
                data.pillow_type, data.name
            )));
            inner.push(components::media_gallery(&url, &data.name));
            inner.push(components::text(pillow_details(data, &url)));
        }
        Ok(Reply::components(vec![components::container(inner)]))
    }
}

#[async_trait]
impl Execute for ViewPillow {
    async fn execute(&self, state: &BotState, interaction: &Interaction) -> Result<Reply> {
        let user = interaction.option_str("user");
        let pillow_type = match interaction.option_str("type") {
            Some(raw) => match raw.parse::<PillowType>() {
                Ok(t) => Some(t),
                Err(_) => return Ok(Reply::ephemeral(format!("Unknown pillow type: {raw}"))),
            },
            None => None,
        };

        // user + type wins over an explicit id
        let key = match (user, pillow_type) {
            (Some(user), Some(pillow_type)) => Some(pillow_key(user, pillow_type)),
            _ => interaction.option_str("id").map(str::to_string),
        };

        match (key, user) {
            (Some(key), _) => self.one(state, &key).await,
            (None, Some(user)) => self.by_user(state, user).await,
            (None, None) => {
                let objects = state.stores.pillows.list(ListOptions::default()).await?;
                match pick_random(objects) {
                    Some(head) => self.one(state, &head.key).await,
                    None => Ok(Reply::ephemeral("No pillows found!")),
                }
            }
        }
    }
}

pub struct ViewPhoto;

#[async_trait]
impl Execute for ViewPhoto {
    async fn execute(&self, state: &BotState, interaction: &Interaction) -> Result<Reply> {
        let key = match interaction.option_str("id") {
            Some(id) => id.to_string(),
            None => {
                let objects = state.stores.photos.list(ListOptions::default()).await?;
                match pick_random(objects) {
                    Some(head) => head.key,
                    None => return Ok(Reply::ephemeral("No photos found!")),
                }
            }
        };

        let Some(head) = state.stores.photos.head(&key).await? else {
            return Ok(Reply::ephemeral("The photo was not found or has no metadata."));
        };
        let Ok(data) = from_metadata::<PhotoData>(&head.metadata) else {
            return Ok(Reply::ephemeral("The photo was not found or has no metadata."));
        };

        let url = format!("{}/{key}", state.config.image_url(ImageKind::Photo));
        Ok(Reply::components(vec![components::container(vec![
            components::text(format!("# Group photo from {}", data.date)),
            components::media_gallery(&url, &data.date),
            components::separator(),
            components::text(format!(
                "- Uploaded by <@{}> on {}\n\n-# [Click here to view the photo in your browser]({url})",
                data.user_id,
                discord_time(&data.submitted_at)
            )),
        ])]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{PutObject, to_metadata};
    use crate::test_utils;

    async fn seed_pillow(state: &BotState, user_id: &str, pillow_type: PillowType, name: &str) {
        let data = PillowData {
            user_id: user_id.into(),
            user_name: format!("user{user_id}"),
            name: name.into(),
            pillow_type,
            submitted_at: Utc::now(),
            approver_id: Some("1".into()),
            approved_at: Some(Utc::now()),
        };
        state
            .stores
            .pillows
            .put(
                &pillow_key(user_id, pillow_type),
                PutObject {
                    metadata: to_metadata(&data).unwrap(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    fn view(sub: &str, options: Vec<crate::types::discord::CommandDataOption>) -> Interaction {
        test_utils::command("view", vec![test_utils::sub(sub, options)])
    }

    fn body(reply: &Reply) -> String {
        serde_json::to_string(reply.interaction_response()).unwrap()
    }

    #[tokio::test]
    async fn user_and_type_resolve_one_pillow() {
        let state = test_utils::state();
        seed_pillow(&state, "42", PillowType::Regular, "Cozy").await;
        seed_pillow(&state, "42", PillowType::Dakimakura, "Long").await;

        let reply = state
            .registry
            .dispatch(
                &state,
                &view(
                    "pillow",
                    vec![
                        test_utils::string_option("user", "42"),
                        test_utils::string_option("type", "Dakimakura"),
                    ],
                ),
            )
            .await;
        assert!(!reply.is_ephemeral());
        let body = body(&reply);
        assert!(body.contains("`Dakimakura` pillow \\\"Long\\\""));
        assert!(!body.contains("Cozy"));
    }

    #[tokio::test]
    async fn user_alone_lists_every_pillow() {
        let state = test_utils::state();
        seed_pillow(&state, "42", PillowType::Regular, "Cozy").await;
        seed_pillow(&state, "42", PillowType::Dakimakura, "Long").await;
        seed_pillow(&state, "420", PillowType::Regular, "Other").await;

        let reply = state
            .registry
            .dispatch(&state, &view("pillow", vec![test_utils::string_option("user", "42")]))
            .await;
        let body = body(&reply);
        assert!(body.contains("(2 found)"));
        assert!(body.contains("Cozy") && body.contains("Long"));
        assert!(!body.contains("Other"));
    }

    #[tokio::test]
    async fn missing_pillow_is_ephemeral() {
        let state = test_utils::state();
        let reply = state
            .registry
            .dispatch(&state, &view("pillow", vec![test_utils::string_option("id", "7_Regular")]))
            .await;
        assert!(reply.is_ephemeral());
    }

    #[tokio::test]
    async fn no_options_picks_a_random_pillow() {
        let state = test_utils::state();
        seed_pillow(&state, "42", PillowType::Regular, "Cozy").await;
        let reply = state.registry.dispatch(&state, &view("pillow", vec![])).await;
        assert!(body(&reply).contains("Cozy"));

        let empty = test_utils::state();
        let reply = empty.registry.dispatch(&empty, &view("photo", vec![])).await;
        assert_eq!(reply.content(), Some("No photos found!"));
    }
}
