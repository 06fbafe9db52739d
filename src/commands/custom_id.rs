use once_cell::sync::Lazy;
use regex::Regex;

/// `command[.group.subcommand]-payload`, or `command.subcommand-payload`.
static CUSTOM_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<command>[0-9A-Za-z_]+)(?:(?:\.(?P<group>[0-9A-Za-z_]+))?\.(?P<subcommand>[0-9A-Za-z_]+))?-(?P<payload>.*)",
    )
    .expect("custom id pattern is valid")
});

/// Routing information carried by a button or select menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomId<'a> {
    pub command: &'a str,
    pub group: Option<&'a str>,
    pub subcommand: Option<&'a str>,
    pub payload: &'a str,
}

impl<'a> CustomId<'a> {
    /// `None` when the id has no routing prefix or an empty payload.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let caps = CUSTOM_ID.captures(raw)?;
        let command = caps.name("command")?.as_str();
        let payload = caps.name("payload")?.as_str();
        if payload.is_empty() {
            return None;
        }
        Some(Self {
            command,
            group: caps.name("group").map(|m| m.as_str()),
            subcommand: caps.name("subcommand").map(|m| m.as_str()),
            payload,
        })
    }
}

/// Builds the id for a component owned by the leaf at `path`.
pub fn custom_id(path: &[&str], payload: &str) -> String {
    format!("{}-{}", path.join("."), payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_path_round_trips() {
        let raw = custom_id(&["cmd", "group", "sub"], "payload123");
        assert_eq!(raw, "cmd.group.sub-payload123");
        assert_eq!(
            CustomId::parse(&raw),
            Some(CustomId {
                command: "cmd",
                group: Some("group"),
                subcommand: Some("sub"),
                payload: "payload123",
            })
        );
    }

    #[test]
    fn bare_command_has_no_path() {
        let parsed = CustomId::parse("cmd-payload123").unwrap();
        assert_eq!(parsed.command, "cmd");
        assert_eq!(parsed.group, None);
        assert_eq!(parsed.subcommand, None);
        assert_eq!(parsed.payload, "payload123");
    }

    #[test]
    fn subcommand_without_group() {
        let parsed = CustomId::parse("submit.pillow-approve-10-Regular").unwrap();
        assert_eq!(parsed.command, "submit");
        assert_eq!(parsed.group, None);
        assert_eq!(parsed.subcommand, Some("pillow"));
        assert_eq!(parsed.payload, "approve-10-Regular");
    }

    #[test]
    fn payload_keeps_later_dashes() {
        let parsed = CustomId::parse("list.pillows-0-10-25").unwrap();
        assert_eq!(parsed.payload, "0-10-25");
    }

    #[test]
    fn malformed_ids_do_not_parse() {
        for raw in ["", "nodash", "-leading", "cmd-", "cmd.-x", ".sub-x", "a.b.c.d-x"] {
            assert_eq!(CustomId::parse(raw), None, "{raw:?}");
        }
    }
}
