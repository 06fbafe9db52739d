use async_trait::async_trait;
use chrono::Utc;

use crate::commands::registry::{Command, Execute, Leaf};
use crate::discord::response::Reply;
use crate::error::Result;
use crate::state::BotState;
use crate::types::discord::{Interaction, snowflake_timestamp_ms};

pub struct Ping;

pub fn command() -> Command {
    Command::leaf(Leaf::new("ping", "Replies with Pong and the latency", Ping))
}

#[async_trait]
impl Execute for Ping {
    async fn execute(&self, _state: &BotState, interaction: &Interaction) -> Result<Reply> {
        let latency = snowflake_timestamp_ms(&interaction.id)
            .map(|created| (Utc::now().timestamp_millis() - created).max(0))
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "unknown".to_string());
        Ok(Reply::message(format!("🏓Pong!\n-# Latency: {latency}")))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils;

    #[tokio::test]
    async fn reports_latency_from_the_interaction_id() {
        let state = test_utils::state();
        let mut interaction = test_utils::command("ping", vec![]);
        interaction.id = test_utils::snowflake_now();

        let reply = state.registry.dispatch(&state, &interaction).await;
        let content = reply.content().unwrap();
        assert!(content.starts_with("🏓Pong!\n-# Latency: "), "{content}");
        assert!(content.ends_with("ms"));
        assert!(!reply.is_ephemeral());
    }
}
