//! MongoDB connection wrapper.

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tracing::info;

/// Handle to the game database.
#[derive(Debug, Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect and verify the server answers a ping.
    ///
    /// # Errors
    /// Returns error if the URI is invalid or the server is unreachable.
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some("gachabot".to_string());
        let client = Client::with_options(options)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            db: client.database(db_name),
        })
    }

    /// Typed handle to a collection.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}
