//! Direct message repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use super::DbError;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub sender_id: Option<i64>,
    pub sender_name: Option<String>,
    pub receiver_id: Option<i64>,
    pub receiver_name: Option<String>,
    pub item_id: Option<i64>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Option<i64>,
    pub receiver_id: Option<i64>,
    pub item_id: Option<i64>,
    pub content: String,
}

/// Conversation filter; the first given one applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFilter {
    All,
    Item(i64),
    Sender(i64),
    Receiver(i64),
}

impl MessageFilter {
    pub fn from_params(item: Option<i64>, sender: Option<i64>, receiver: Option<i64>) -> Self {
        match (item, sender, receiver) {
            (Some(id), _, _) => Self::Item(id),
            (None, Some(id), _) => Self::Sender(id),
            (None, None, Some(id)) => Self::Receiver(id),
            (None, None, None) => Self::All,
        }
    }
}

const MESSAGE_SELECT: &str = r#"
    SELECT
        m.id, m.sender_id, s.uname AS sender_name,
        m.receiver_id, r.uname AS receiver_name,
        m.item_id, m.content, m.timestamp
    FROM messages m
    LEFT JOIN users s ON s.id = m.sender_id
    LEFT JOIN users r ON r.id = m.receiver_id
"#;

pub struct MessageRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> MessageRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Messages in conversation order, oldest first.
    pub async fn list(&self, filter: MessageFilter) -> Result<Vec<Message>, DbError> {
        let (clause, id) = match filter {
            MessageFilter::All => ("", None),
            MessageFilter::Item(id) => ("WHERE m.item_id = $1", Some(id)),
            MessageFilter::Sender(id) => ("WHERE m.sender_id = $1", Some(id)),
            MessageFilter::Receiver(id) => ("WHERE m.receiver_id = $1", Some(id)),
        };

        let query = format!("{MESSAGE_SELECT} {clause} ORDER BY m.timestamp, m.id");
        let mut builder = sqlx::query_as::<_, Message>(&query);
        if let Some(id) = id {
            builder = builder.bind(id);
        }
        Ok(builder.fetch_all(self.pool).await?)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Message>, DbError> {
        let message = sqlx::query_as(&format!("{MESSAGE_SELECT} WHERE m.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(message)
    }

    pub async fn get(&self, id: i64) -> Result<Message, DbError> {
        self.find(id)
            .await?
            .ok_or_else(|| DbError::not_found("message", id))
    }

    pub async fn create(&self, message: &NewMessage) -> Result<Message, DbError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO messages (sender_id, receiver_id, item_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(message.item_id)
        .bind(&message.content)
        .fetch_one(self.pool)
        .await?;

        self.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_given_filter_applies() {
        assert_eq!(
            MessageFilter::from_params(Some(1), Some(2), Some(3)),
            MessageFilter::Item(1)
        );
        assert_eq!(
            MessageFilter::from_params(None, Some(2), Some(3)),
            MessageFilter::Sender(2)
        );
        assert_eq!(
            MessageFilter::from_params(None, None, Some(3)),
            MessageFilter::Receiver(3)
        );
        assert_eq!(MessageFilter::from_params(None, None, None), MessageFilter::All);
    }
}
