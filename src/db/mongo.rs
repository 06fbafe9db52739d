use mongodb::{Client, Database};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::{BotError, Result};

static MONGO_POOL: OnceCell<Arc<Database>> = OnceCell::const_new();

pub async fn mongo_pool(url: &str, db_name: &str) -> Result<Arc<Database>> {
    MONGO_POOL
        .get_or_try_init(|| async {
            let client = Client::with_uri_str(url)
                .await
                .map_err(|e| BotError::new("mongo_connect").push_std(e))?;

            tracing::info!(db = db_name, "connected to MongoDB");
            Ok::<_, BotError>(Arc::new(client.database(db_name)))
        })
        .await
        .cloned()
}
