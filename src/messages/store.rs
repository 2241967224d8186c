use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppError, AppResult};

use super::{status::RANK_SQL, Draft, Message, MessageStatus};

const COLUMNS: &str = "id,job_id,sender_id,receiver_id,body,status,created_at";

type MessageRow = (String, String, String, String, String, String, i64);

fn from_row(row: MessageRow) -> AppResult<Message> {
    let (id, job_id, sender_id, receiver_id, body, status, created_at) = row;
    Ok(Message {
        id: Uuid::parse_str(&id)?,
        job_id: Uuid::parse_str(&job_id)?,
        sender_id: Uuid::parse_str(&sender_id)?,
        receiver_id: Uuid::parse_str(&receiver_id)?,
        body,
        status: status.parse()?,
        created_at: from_micros(created_at)?,
    })
}

fn from_micros(micros: i64) -> AppResult<OffsetDateTime> {
    Ok(OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .map_err(anyhow::Error::from)?)
}

fn to_micros(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000) as i64
}

/// Durable record of every message and the only authority on its status.
///
/// Every write is a single targeted statement, so concurrent callers need no
/// lock beyond what SQLite already provides.
#[derive(Clone)]
pub struct MessageStore {
    db_pool: SqlitePool,
}

impl MessageStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        MessageStore { db_pool }
    }

    /// Persists a new message in state `sent`. `acting_user` must be the
    /// draft's sender.
    pub async fn create(&self, acting_user: Uuid, draft: Draft) -> AppResult<Message> {
        let new = draft.validate()?;
        if new.sender_id != acting_user {
            return Err(AppError::not_authorized(format!(
                "u/{acting_user} is not the sender of this message"
            )));
        }

        let id = Uuid::now_v7();
        let created_at = to_micros(OffsetDateTime::now_utc());
        sqlx::query(&format!("INSERT INTO messages ({COLUMNS}) VALUES (?,?,?,?,?,?,?)"))
            .bind(id.to_string())
            .bind(new.job_id.to_string())
            .bind(new.sender_id.to_string())
            .bind(new.receiver_id.to_string())
            .bind(&new.body)
            .bind(MessageStatus::Sent.as_str())
            .bind(created_at)
            .execute(&self.db_pool)
            .await?;

        Ok(Message {
            id,
            job_id: new.job_id,
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            body: new.body,
            status: MessageStatus::Sent,
            created_at: from_micros(created_at)?,
        })
    }

    pub async fn get(&self, message_id: Uuid) -> AppResult<Option<Message>> {
        sqlx::query_as::<_, MessageRow>(&format!("SELECT {COLUMNS} FROM messages WHERE id=?"))
            .bind(message_id.to_string())
            .fetch_optional(&self.db_pool)
            .await?
            .map(from_row)
            .transpose()
    }

    /// Moves a message forward to `target`. Targets that are not strictly
    /// later than the stored status leave the record untouched.
    pub async fn advance(&self, message_id: Uuid, target: MessageStatus) -> AppResult<Message> {
        sqlx::query(&format!("UPDATE messages SET status=? WHERE id=? AND {RANK_SQL} < ?"))
            .bind(target.as_str())
            .bind(message_id.to_string())
            .bind(target.rank())
            .execute(&self.db_pool)
            .await?;

        self.get(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("message {message_id}")))
    }

    /// Marks every not-yet-seen message in `job_id` addressed to `receiver_id`
    /// as seen. Returns how many changed.
    pub async fn bulk_advance_to_seen(&self, job_id: Uuid, receiver_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET status=? WHERE job_id=? AND receiver_id=? AND status<>?",
        )
            .bind(MessageStatus::Seen.as_str())
            .bind(job_id.to_string())
            .bind(receiver_id.to_string())
            .bind(MessageStatus::Seen.as_str())
            .execute(&self.db_pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Messages between `user_a` and `user_b` in `job_id`, oldest first.
    pub async fn find_conversation(
        &self,
        job_id: Uuid,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {COLUMNS} FROM messages \
             WHERE job_id=? \
             AND ((sender_id=? AND receiver_id=?) OR (sender_id=? AND receiver_id=?)) \
             ORDER BY created_at ASC, id ASC"
        ))
            .bind(job_id.to_string())
            .bind(user_a.to_string())
            .bind(user_b.to_string())
            .bind(user_b.to_string())
            .bind(user_a.to_string())
            .fetch_all(&self.db_pool)
            .await?;

        rows.into_iter().map(from_row).collect()
    }

    /// Every message the user sent or received, across all jobs, newest first.
    pub async fn find_all_for_user(&self, user_id: Uuid) -> AppResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {COLUMNS} FROM messages WHERE sender_id=? OR receiver_id=? \
             ORDER BY created_at DESC, id DESC"
        ))
            .bind(user_id.to_string())
            .bind(user_id.to_string())
            .fetch_all(&self.db_pool)
            .await?;

        rows.into_iter().map(from_row).collect()
    }
}
