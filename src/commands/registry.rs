use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::discord::response::Reply;
use crate::error::{BotError, Result};
use crate::state::BotState;
use crate::types::discord::{ApplicationCommand, CommandOption, Interaction, OptionType};

/// Naming rule for commands, subcommands and options.
static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-_'\p{L}\p{N}\p{Devanagari}\p{Thai}]{1,32}$").expect("command name pattern is valid")
});

const CHAT_INPUT: u8 = 1;

#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(&self, state: &BotState, interaction: &Interaction) -> Result<Reply>;
}

#[async_trait]
pub trait ExecuteComponent: Send + Sync {
    /// `payload` is the part of the custom id after the routing prefix.
    async fn execute_component(&self, state: &BotState, interaction: &Interaction, payload: &str) -> Result<Reply>;
}

pub struct Leaf {
    pub name: &'static str,
    pub description: &'static str,
    pub options: Vec<CommandOption>,
    pub execute: Arc<dyn Execute>,
    pub execute_component: Option<Arc<dyn ExecuteComponent>>,
}

impl Leaf {
    pub fn new(name: &'static str, description: &'static str, execute: impl Execute + 'static) -> Self {
        Self {
            name,
            description,
            options: Vec::new(),
            execute: Arc::new(execute),
            execute_component: None,
        }
    }

    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn component(mut self, handler: impl ExecuteComponent + 'static) -> Self {
        self.execute_component = Some(Arc::new(handler));
        self
    }

    fn schema_option(&self) -> CommandOption {
        let mut option = CommandOption::new(OptionType::Subcommand, self.name, self.description);
        option.options = self.options.clone();
        option
    }
}

pub struct SubcommandGroup {
    pub name: &'static str,
    pub description: &'static str,
    pub subcommands: Vec<Leaf>,
}

impl SubcommandGroup {
    pub fn new(name: &'static str, description: &'static str, subcommands: Vec<Leaf>) -> Self {
        Self {
            name,
            description,
            subcommands,
        }
    }

    pub fn subcommand(&self, name: &str) -> Option<&Leaf> {
        self.subcommands.iter().find(|s| s.name == name)
    }
}

pub enum CommandKind {
    Leaf(Leaf),
    Group {
        subcommands: Vec<Leaf>,
        groups: Vec<SubcommandGroup>,
    },
}

pub struct Command {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: CommandKind,
}

impl Command {
    pub fn leaf(leaf: Leaf) -> Self {
        Self {
            name: leaf.name,
            description: leaf.description,
            kind: CommandKind::Leaf(leaf),
        }
    }

    pub fn group(
        name: &'static str,
        description: &'static str,
        subcommands: Vec<Leaf>,
        groups: Vec<SubcommandGroup>,
    ) -> Self {
        Self {
            name,
            description,
            kind: CommandKind::Group { subcommands, groups },
        }
    }

    pub fn subcommand(&self, name: &str) -> Option<&Leaf> {
        match &self.kind {
            CommandKind::Group { subcommands, .. } => subcommands.iter().find(|s| s.name == name),
            CommandKind::Leaf(_) => None,
        }
    }

    pub fn subcommand_group(&self, name: &str) -> Option<&SubcommandGroup> {
        match &self.kind {
            CommandKind::Group { groups, .. } => groups.iter().find(|g| g.name == name),
            CommandKind::Leaf(_) => None,
        }
    }

    /// Wire schema for this command: subcommands first, then groups, each in
    /// declaration order.
    pub fn schema(&self) -> ApplicationCommand {
        let options = match &self.kind {
            CommandKind::Leaf(leaf) => leaf.options.clone(),
            CommandKind::Group { subcommands, groups } => subcommands
                .iter()
                .map(Leaf::schema_option)
                .chain(groups.iter().map(|g| {
                    let mut option = CommandOption::new(OptionType::SubcommandGroup, g.name, g.description);
                    option.options = g.subcommands.iter().map(Leaf::schema_option).collect();
                    option
                }))
                .collect(),
        };
        ApplicationCommand {
            name: self.name.to_string(),
            command_type: CHAT_INPUT,
            description: self.description.to_string(),
            options,
        }
    }
}

/// Read-only table of every command, validated once at startup.
pub struct Registry {
    commands: Vec<Command>,
}

impl Registry {
    pub fn new(commands: Vec<Command>) -> Result<Self> {
        let mut seen = HashSet::new();
        for command in &commands {
            if !seen.insert(command.name) {
                return Err(invalid(format!("duplicate command `{}`", command.name)));
            }
            validate_command(command)?;
        }
        Ok(Self { commands })
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn schema(&self) -> Vec<ApplicationCommand> {
        self.commands.iter().map(Command::schema).collect()
    }
}

fn invalid(message: String) -> BotError {
    BotError::new("invalid_command_definition").push_str(message)
}

pub fn validate_name(name: &str) -> Result<()> {
    if !NAME_PATTERN.is_match(name) || name.to_lowercase() != name {
        return Err(invalid(format!("invalid name `{name}`")));
    }
    Ok(())
}

fn validate_description(owner: &str, description: &str) -> Result<()> {
    let len = description.chars().count();
    if !(1..=100).contains(&len) {
        return Err(invalid(format!("`{owner}` needs a description of 1-100 characters")));
    }
    Ok(())
}

fn validate_options(owner: &str, options: &[CommandOption]) -> Result<()> {
    let mut seen = HashSet::new();
    let mut optional_seen = false;
    for option in options {
        validate_name(&option.name)?;
        validate_description(&option.name, &option.description)?;
        match OptionType::from_u8(option.option_type) {
            OptionType::Subcommand | OptionType::SubcommandGroup | OptionType::Unknown => {
                return Err(invalid(format!(
                    "`{owner}` declares `{}` as a plain option; leaves cannot nest",
                    option.name
                )));
            }
            _ => {}
        }
        if !seen.insert(option.name.as_str()) {
            return Err(invalid(format!("`{owner}` repeats option `{}`", option.name)));
        }
        if option.required && optional_seen {
            return Err(invalid(format!(
                "`{owner}` lists required option `{}` after an optional one",
                option.name
            )));
        }
        optional_seen |= !option.required;
    }
    Ok(())
}

fn validate_leaf(leaf: &Leaf) -> Result<()> {
    validate_name(leaf.name)?;
    validate_description(leaf.name, leaf.description)?;
    validate_options(leaf.name, &leaf.options)
}

fn validate_command(command: &Command) -> Result<()> {
    validate_name(command.name)?;
    validate_description(command.name, command.description)?;

    match &command.kind {
        CommandKind::Leaf(leaf) => validate_leaf(leaf),
        CommandKind::Group { subcommands, groups } => {
            if subcommands.is_empty() && groups.is_empty() {
                return Err(invalid(format!("group `{}` has no subcommands", command.name)));
            }
            let mut seen = HashSet::new();
            for leaf in subcommands {
                if !seen.insert(leaf.name) {
                    return Err(invalid(format!("`{}` repeats `{}`", command.name, leaf.name)));
                }
                validate_leaf(leaf)?;
            }
            for group in groups {
                if !seen.insert(group.name) {
                    return Err(invalid(format!("`{}` repeats `{}`", command.name, group.name)));
                }
                validate_name(group.name)?;
                validate_description(group.name, group.description)?;
                if group.subcommands.is_empty() {
                    return Err(invalid(format!("group `{}` has no subcommands", group.name)));
                }
                let mut inner = HashSet::new();
                for leaf in &group.subcommands {
                    if !inner.insert(leaf.name) {
                        return Err(invalid(format!("`{}` repeats `{}`", group.name, leaf.name)));
                    }
                    validate_leaf(leaf)?;
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Echo;

    #[test]
    fn names_follow_the_platform_rules() {
        assert!(validate_name("pillow").is_ok());
        assert!(validate_name("page_size").is_ok());
        assert!(validate_name("नमस्ते").is_ok());
        assert!(validate_name("Pillow").is_err());
        assert!(validate_name("pageSize").is_err());
        assert!(validate_name("with space").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"a".repeat(33)).is_err());
    }

    #[test]
    fn empty_groups_are_rejected() {
        let err = Registry::new(vec![Command::group("empty", "nothing inside", vec![], vec![])])
            .err()
            .unwrap();
        assert!(err.reason().contains("no subcommands"));

        let nested = Registry::new(vec![Command::group(
            "outer",
            "outer",
            vec![],
            vec![SubcommandGroup::new("inner", "inner", vec![])],
        )]);
        assert!(nested.is_err());
    }

    #[test]
    fn leaves_cannot_carry_subcommands() {
        let leaf = Leaf::new("ping", "pong", Echo("ping")).option(CommandOption::new(
            OptionType::Subcommand,
            "nested",
            "not allowed",
        ));
        assert!(Registry::new(vec![Command::leaf(leaf)]).is_err());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let registry = Registry::new(vec![
            Command::leaf(Leaf::new("ping", "pong", Echo("a"))),
            Command::leaf(Leaf::new("ping", "pong", Echo("b"))),
        ]);
        assert!(registry.is_err());
    }

    #[test]
    fn schema_is_stable_across_calls() {
        let registry = crate::commands::registry().unwrap();
        let first = serde_json::to_vec(&registry.schema()).unwrap();
        let second = serde_json::to_vec(&registry.schema()).unwrap();
        assert_eq!(first, second);

        let rebuilt = crate::commands::registry().unwrap();
        assert_eq!(first, serde_json::to_vec(&rebuilt.schema()).unwrap());
    }

    #[test]
    fn group_schema_lists_subcommands_before_groups() {
        let registry = Registry::new(vec![Command::group(
            "config",
            "settings",
            vec![Leaf::new("mod", "mod role", Echo("mod"))],
            vec![SubcommandGroup::new(
                "channel",
                "channels",
                vec![Leaf::new("pillow", "pillow channel", Echo("pillow"))],
            )],
        )])
        .unwrap();

        let schema = serde_json::to_value(registry.schema()).unwrap();
        let options = &schema[0]["options"];
        assert_eq!(options[0]["name"], "mod");
        assert_eq!(options[0]["type"], 1);
        assert_eq!(options[1]["name"], "channel");
        assert_eq!(options[1]["type"], 2);
        assert_eq!(options[1]["options"][0]["name"], "pillow");
    }
}
