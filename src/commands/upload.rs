use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, Utc};

use crate::commands::guard::{self, GUILD_ONLY, NOT_WHITELISTED};
use crate::commands::registry::{Command, Execute, Leaf};
use crate::db::images::PhotoData;
use crate::db::settings::Settings;
use crate::db::{PutObject, to_metadata};
use crate::discord::components;
use crate::discord::response::Reply;
use crate::error::Result;
use crate::state::BotState;
use crate::types::discord::{CommandOption, Interaction, OptionType};

const DATE_FORMAT: &str = "%d/%m/%Y";

pub fn command() -> Command {
    Command::group(
        "upload",
        "Upload an image directly",
        vec![
            Leaf::new("photo", "Upload a group photo", UploadPhoto)
                .option(CommandOption::new(OptionType::Attachment, "image", "The photo (png)").required())
                .option(CommandOption::new(
                    OptionType::String,
                    "date",
                    "Date of the photo as dd/mm/yyyy, defaults to last Friday",
                )),
        ],
        vec![],
    )
}

/// The Friday before `today`; a Friday maps to the one a week earlier.
pub fn last_friday(today: NaiveDate) -> NaiveDate {
    let since_friday = (today.weekday().num_days_from_monday() + 3) % 7;
    let back = if since_friday == 0 { 7 } else { since_friday };
    today
        .checked_sub_days(Days::new(back as u64))
        .unwrap_or(today)
}

pub struct UploadPhoto;

#[async_trait]
impl Execute for UploadPhoto {
    async fn execute(&self, state: &BotState, interaction: &Interaction) -> Result<Reply> {
        let (Some(guild_id), Some(user)) = (interaction.guild_id.as_deref(), interaction.invoker()) else {
            return Ok(Reply::ephemeral(GUILD_ONLY));
        };
        let settings = Settings::load_or_default(state.stores.settings.as_ref(), guild_id).await?;
        if !settings.is_whitelisted() && !guard::is_owner(state, interaction) {
            return Ok(Reply::ephemeral(NOT_WHITELISTED));
        }
        if !guard::is_moderator(state, &settings, interaction) {
            return Ok(Reply::ephemeral("Only image moderators are allowed to upload photos"));
        }

        let Some(attachment) = interaction.option_str("image").and_then(|id| interaction.attachment(id)) else {
            return Ok(Reply::ephemeral("Image attachment not found"));
        };
        if !attachment
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("png"))
        {
            return Ok(Reply::ephemeral("Image must be a PNG image"));
        }

        let date = match interaction.option_str("date") {
            Some(raw) => match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
                Ok(date) => date,
                Err(_) => return Ok(Reply::ephemeral("Invalid date, use dd/mm/yyyy")),
            },
            None => last_friday(Utc::now().date_naive()),
        };
        let date = date.format(DATE_FORMAT).to_string();

        let download = match state.discord.download(&attachment.url).await {
            Ok(download) => download,
            Err(e) => {
                e.print_tree();
                return Ok(Reply::ephemeral("Failed to download the attachment"));
            }
        };

        let key = uuid::Uuid::new_v4().to_string();
        let data = PhotoData {
            user_id: user.id.clone(),
            user_name: user.username.clone(),
            date: date.clone(),
            submitted_at: Utc::now(),
        };
        let object = PutObject {
            data: download.bytes,
            content_type: Some("image/png".to_string()),
            metadata: to_metadata(&data)?,
        };
        if let Err(e) = state.stores.photos.put(&key, object).await {
            e.print_tree();
            return Ok(Reply::ephemeral(format!(
                "Failed to upload image to storage: {}",
                e.reason()
            )));
        }
        tracing::info!(key = %key, guild = guild_id, "photo uploaded");

        let url = format!("{}/{key}", state.config.photo_url);
        Ok(Reply::components(vec![components::container(vec![
            components::text(format!("# Group photo from {date}")),
            components::media_gallery(&url, &date),
            components::separator(),
            components::text(format!("-# Uploaded by <@{}> | ID: `{key}`", user.id)),
        ])]))
    }
}
