use crate::commands::custom_id::CustomId;
use crate::commands::registry::{CommandKind, Leaf, Registry};
use crate::discord::response::Reply;
use crate::error::Result;
use crate::state::BotState;
use crate::types::discord::{Interaction, InteractionType, OptionType};

pub const COMMAND_NOT_FOUND: &str = "Command not found";
pub const SUBCOMMAND_NOT_FOUND: &str = "Subcommand not found";
pub const GROUP_NOT_FOUND: &str = "Subcommand group not found";
pub const INVALID_OPTIONS: &str = "Invalid command options";
pub const INVALID_CUSTOM_ID: &str = "Invalid custom ID";
pub const COMPONENT_NOT_IMPLEMENTED: &str = "Component handler not implemented";
pub const UNSUPPORTED_INTERACTION: &str = "Unsupported interaction type";
pub const GENERIC_ERROR: &str = "An error occurred while processing the interaction";

impl Registry {
    /// Answers one interaction. Never fails: routing misses and handler
    /// errors both become ephemeral messages.
    pub async fn dispatch(&self, state: &BotState, interaction: &Interaction) -> Reply {
        let outcome = match interaction.kind() {
            InteractionType::Ping => return Reply::pong(),
            InteractionType::ApplicationCommand => match self.resolve_command(interaction) {
                Ok(leaf) => leaf.execute.execute(state, interaction).await,
                Err(message) => return Reply::ephemeral(message),
            },
            InteractionType::MessageComponent => {
                let Some(id) = interaction.custom_id().and_then(CustomId::parse) else {
                    tracing::warn!(custom_id = ?interaction.custom_id(), "unroutable component");
                    return Reply::ephemeral(INVALID_CUSTOM_ID);
                };
                let handler = match self.resolve_component(&id) {
                    Ok(leaf) => leaf.execute_component.as_ref(),
                    Err(message) => return Reply::ephemeral(message),
                };
                match handler {
                    Some(handler) => handler.execute_component(state, interaction, id.payload).await,
                    None => return Reply::ephemeral(COMPONENT_NOT_IMPLEMENTED),
                }
            }
            _ => return Reply::ephemeral(UNSUPPORTED_INTERACTION),
        };
        settle(interaction, outcome)
    }

    fn resolve_command(&self, interaction: &Interaction) -> std::result::Result<&Leaf, &'static str> {
        let command = interaction
            .command_name()
            .and_then(|name| self.get(name))
            .ok_or(COMMAND_NOT_FOUND)?;

        if let CommandKind::Leaf(leaf) = &command.kind {
            return Ok(leaf);
        }

        let first = interaction.top_options().first().ok_or(INVALID_OPTIONS)?;
        match first.kind() {
            OptionType::Subcommand => command.subcommand(&first.name).ok_or(SUBCOMMAND_NOT_FOUND),
            OptionType::SubcommandGroup => {
                let group = command.subcommand_group(&first.name).ok_or(GROUP_NOT_FOUND)?;
                let inner = first
                    .options
                    .first()
                    .filter(|o| o.kind() == OptionType::Subcommand)
                    .ok_or(INVALID_OPTIONS)?;
                group.subcommand(&inner.name).ok_or(SUBCOMMAND_NOT_FOUND)
            }
            _ => Err(INVALID_OPTIONS),
        }
    }

    fn resolve_component(&self, id: &CustomId<'_>) -> std::result::Result<&Leaf, &'static str> {
        let command = self.get(id.command).ok_or(COMMAND_NOT_FOUND)?;
        match (id.group, id.subcommand) {
            (_, None) => match &command.kind {
                CommandKind::Leaf(leaf) => Ok(leaf),
                CommandKind::Group { .. } => Err(COMPONENT_NOT_IMPLEMENTED),
            },
            (None, Some(sub)) => command.subcommand(sub).ok_or(SUBCOMMAND_NOT_FOUND),
            (Some(group), Some(sub)) => command
                .subcommand_group(group)
                .ok_or(GROUP_NOT_FOUND)?
                .subcommand(sub)
                .ok_or(SUBCOMMAND_NOT_FOUND),
        }
    }
}

fn settle(interaction: &Interaction, outcome: Result<Reply>) -> Reply {
    match outcome {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(
                interaction = %interaction.id,
                command = ?interaction.command_name(),
                custom_id = ?interaction.custom_id(),
                "interaction handler failed"
            );
            e.print_tree();
            Reply::ephemeral(GENERIC_ERROR)
        }
    }
}
