use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Thin async wrapper over a multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisClient {
    pub async fn connect(url: &str, namespace: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        tracing::info!(url = %url, namespace = %namespace, "connected to Redis");
        Ok(Self {
            conn,
            namespace: namespace.to_string(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.get(self.key(key)).await
    }

    /// Store a value without expiry.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.set(self.key(key), value).await
    }

    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
