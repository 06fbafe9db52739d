use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::commands::registry::Registry;
use crate::config::Config;
use crate::db::Stores;
use crate::discord::api::{DiscordHttp, RestClient};
use crate::error::Result;
use crate::workers::Background;

/// Discord allows ~50 requests per second globally; stay below it.
const DEFAULT_REQUESTS_PER_SECOND: f64 = 40.0;

/// Rate limiter using token bucket algorithm
pub struct RateLimiter {
    tokens: Mutex<f64>,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
    last_refill: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            tokens: Mutex::new(requests_per_second),
            max_tokens: requests_per_second,
            refill_rate: requests_per_second,
            last_refill: Mutex::new(Instant::now()),
        }
    }

    pub async fn acquire(&self) {
        loop {
            let now = Instant::now();
            let mut last_refill = self.last_refill.lock().await;
            let elapsed = now.duration_since(*last_refill).as_secs_f64();

            let mut tokens = self.tokens.lock().await;
            *tokens = (*tokens + elapsed * self.refill_rate).min(self.max_tokens);
            *last_refill = now;

            if *tokens >= 1.0 {
                *tokens -= 1.0;
                return;
            }

            drop(tokens);
            drop(last_refill);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

/// The rate-limited Discord REST client for `config`.
pub fn rest_client(config: &Config) -> Arc<RestClient> {
    Arc::new(RestClient::new(
        config.bot_token.clone(),
        config.api_base.clone(),
        Arc::new(RateLimiter::new(DEFAULT_REQUESTS_PER_SECOND)),
    ))
}

pub struct BotStateInner {
    pub config: Config,
    pub discord: Arc<dyn DiscordHttp>,
    pub stores: Stores,
    pub registry: Registry,
    pub background: Background,
}

/// Shared handle given to every request.
#[derive(Clone)]
pub struct BotState(Arc<BotStateInner>);

impl Deref for BotState {
    type Target = BotStateInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl BotState {
    pub fn new(config: Config, discord: Arc<dyn DiscordHttp>, stores: Stores) -> Result<Self> {
        let registry = crate::commands::registry()?;
        Ok(Self(Arc::new(BotStateInner {
            config,
            discord,
            stores,
            registry,
            background: Background::default(),
        })))
    }

    pub async fn from_config(config: Config) -> Result<Self> {
        let discord = rest_client(&config);
        let stores = Stores::open(&config).await?;
        Self::new(config, discord, stores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limiter_hands_out_the_burst_immediately() {
        let limiter = RateLimiter::new(5.0);
        let started = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_millis(50));

        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
