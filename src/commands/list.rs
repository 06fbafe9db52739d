use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use crate::commands::custom_id::custom_id;
use crate::commands::registry::{Command, Execute, ExecuteComponent, Leaf};
use crate::db::images::{ImageKind, PhotoData, PillowData};
use crate::db::{ListOptions, ObjectHead};
use crate::discord::components::{self, ButtonStyle};
use crate::discord::response::Reply;
use crate::error::Result;
use crate::state::BotState;
use crate::types::discord::{CommandOption, Interaction, OptionType};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MIN_PAGE_SIZE: i64 = 5;
const MAX_PAGE_SIZE: i64 = 50;

pub fn command() -> Command {
    let leaf = |kind: ImageKind, description: &'static str| {
        Leaf::new(kind.plural(), description, ListImages(kind))
            .option(CommandOption::new(OptionType::Integer, "page", "Page number to list").range(Some(1), None))
            .option(
                CommandOption::new(OptionType::Integer, "page_size", "Number of entries per page (default: 10)")
                    .range(Some(MIN_PAGE_SIZE), Some(MAX_PAGE_SIZE)),
            )
            .component(ListImages(kind))
    };
    Command::group(
        "list",
        "List stored images",
        vec![
            leaf(ImageKind::Pillow, "List stored pillows"),
            leaf(ImageKind::Photo, "List stored photos"),
        ],
        vec![],
    )
}

/// A page that cannot be shown; the message goes back to the user.
struct PageError(String);

fn entry_line(kind: ImageKind, base_url: &str, head: &ObjectHead) -> String {
    let link = format!("{base_url}/{}", head.key);
    match kind {
        ImageKind::Pillow => {
            let name = head.metadata.get(PillowData::NAME).map(String::as_str).unwrap_or(&head.key);
            let owner = head.metadata.get(PillowData::USER_ID).map(String::as_str).unwrap_or("0");
            format!("- [{name}]({link}) by <@{owner}>")
        }
        ImageKind::Photo => {
            let label = head
                .metadata
                .get(PhotoData::DATE)
                .map(|raw| match NaiveDate::parse_from_str(raw, "%d/%m/%Y") {
                    Ok(date) => date
                        .and_hms_opt(0, 0, 0)
                        .map(|dt| format!("<t:{}:D>", dt.and_utc().timestamp()))
                        .unwrap_or_else(|| raw.clone()),
                    Err(_) => raw.clone(),
                })
                .unwrap_or_else(|| head.key.clone());
            let owner = head.metadata.get(PhotoData::USER_ID).map(String::as_str).unwrap_or("0");
            format!("- [{label}]({link}) by <@{owner}>")
        }
    }
}

async fn render(
    state: &BotState,
    kind: ImageKind,
    page: usize,
    page_size: usize,
) -> Result<std::result::Result<Vec<Value>, PageError>> {
    let objects = state.stores.bucket(kind).list(ListOptions::with_metadata()).await?;
    let name = kind.plural();
    let count = objects.len();
    if count == 0 {
        return Ok(Err(PageError(format!("No {name} found!"))));
    }
    let start = page.saturating_mul(page_size);
    if start >= count {
        return Ok(Err(PageError("Page out of range".to_string())));
    }
    let end = (start + page_size).min(count);
    let page_count = count.div_ceil(page_size);
    let base_url = state.config.image_url(kind);

    let lines = objects[start..end]
        .iter()
        .map(|head| entry_line(kind, base_url, head))
        .collect::<Vec<_>>()
        .join("\n");

    let button = |label: &str, target: usize, disabled: bool| {
        components::button(
            ButtonStyle::Primary,
            label,
            &custom_id(&["list", name], &format!("{target}-{page_size}-{count}")),
            disabled,
        )
    };

    Ok(Ok(vec![
        components::text(format!("Here are the {name} I found:")),
        components::container(vec![
            components::text(format!("{name} ({} - {end} | {count})", start + 1)),
            components::text(lines),
            components::separator(),
            components::text(format!("Page {} of {page_count}", page + 1)),
            components::action_row(vec![
                button("Previous", page.saturating_sub(1), page == 0),
                button("Next", page + 1, end >= count),
            ]),
        ]),
    ]))
}

pub struct ListImages(ImageKind);

#[async_trait]
impl Execute for ListImages {
    async fn execute(&self, state: &BotState, interaction: &Interaction) -> Result<Reply> {
        let page = interaction.option_i64("page").unwrap_or(1).max(1) - 1;
        let page_size = interaction
            .option_i64("page_size")
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);

        Ok(match render(state, self.0, page as usize, page_size as usize).await? {
            Ok(components) => Reply::components(components),
            Err(PageError(message)) => Reply::ephemeral(message),
        })
    }
}

#[async_trait]
impl ExecuteComponent for ListImages {
    async fn execute_component(&self, state: &BotState, _interaction: &Interaction, payload: &str) -> Result<Reply> {
        let mut parts = payload.split('-').map(str::parse::<usize>);
        let (Some(Ok(page)), Some(Ok(page_size))) = (parts.next(), parts.next()) else {
            return Ok(Reply::ephemeral("Invalid page number"));
        };
        let page_size = page_size.clamp(MIN_PAGE_SIZE as usize, MAX_PAGE_SIZE as usize);

        Ok(match render(state, self.0, page, page_size).await? {
            Ok(components) => Reply::update_components(components),
            Err(PageError(message)) => Reply::ephemeral(message),
        })
    }
}
