use super::{ChatStore, Directory, StoreError, StoreResult};
use crate::models::{
    Application, ApplicationStatus, Conversation, ConversationSummary, Message, NewConversation,
    User,
};
use async_trait::async_trait;
use chat_protocol::Role;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const CONVERSATION_COLUMNS: &str = "id, user1_id, user2_id, initiated_by, application_id, job_id, \
     last_message, last_message_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
        _ => StoreError::Database(e),
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    full_name: String,
    role: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let role = Role::from_db(&row.role).unwrap_or_else(|| {
            tracing::warn!(user_id = %row.id, role = %row.role, "unknown role in users table, treating as Student");
            Role::Student
        });
        User {
            id: row.id,
            full_name: row.full_name,
            role,
        }
    }
}

#[derive(FromRow)]
struct ApplicationRow {
    id: Uuid,
    applicant_id: Uuid,
    job_id: Uuid,
    employer_id: Uuid,
    status: String,
}

impl From<ApplicationRow> for Application {
    fn from(row: ApplicationRow) -> Self {
        Application {
            id: row.id,
            applicant_id: row.applicant_id,
            job_id: row.job_id,
            employer_id: row.employer_id,
            status: ApplicationStatus::from_db(&row.status),
        }
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn find_conversation(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1");
        let row = sqlx::query_as::<_, Conversation>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_conversation_by_pair(
        &self,
        user1_id: Uuid,
        user2_id: Uuid,
    ) -> StoreResult<Option<Conversation>> {
        let sql = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE user1_id = $1 AND user2_id = $2"
        );
        let row = sqlx::query_as::<_, Conversation>(&sql)
            .bind(user1_id)
            .bind(user2_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_conversation(&self, new: NewConversation) -> StoreResult<Conversation> {
        let sql = format!(
            r#"
            INSERT INTO conversations (id, user1_id, user2_id, initiated_by, application_id, job_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CONVERSATION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Conversation>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.user1_id)
            .bind(new.user2_id)
            .bind(new.initiated_by)
            .bind(new.application_id)
            .bind(new.job_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)
    }

    async fn list_conversations(&self, user_id: Uuid) -> StoreResult<Vec<ConversationSummary>> {
        let rows = sqlx::query_as::<_, ConversationSummary>(
            r#"
            SELECT c.id, c.user1_id, c.user2_id, c.initiated_by, c.application_id, c.job_id,
                   c.last_message, c.last_message_at, c.created_at, c.updated_at,
                   (
                       SELECT COUNT(*)
                       FROM messages m
                       WHERE m.conversation_id = c.id
                         AND m.sender_id <> $1
                         AND m.is_read = FALSE
                   ) AS unread_count
            FROM conversations c
            WHERE c.user1_id = $1 OR c.user2_id = $1
            ORDER BY c.last_message_at DESC, c.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_messages(&self, conversation_id: Uuid) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
                .bind(conversation_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn count_unread(&self, conversation_id: Uuid, reader_id: Uuid) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, conversation_id, sender_id, content, is_read, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY seq DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
        preview: &str,
    ) -> StoreResult<Message> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, conversation_id, sender_id, content, is_read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE conversations
            SET last_message = $2, last_message_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .bind(preview)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }

    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE
            WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Directory for PgStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, full_name, role::TEXT AS role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, full_name, role::TEXT AS role FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_application(&self, id: Uuid) -> StoreResult<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT a.id, a.applicant_id, a.job_id, j.created_by AS employer_id,
                   a.status::TEXT AS status
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE a.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Application::from))
    }

    async fn search_users(
        &self,
        query: Option<&str>,
        role: Option<Role>,
        limit: i64,
    ) -> StoreResult<Vec<User>> {
        let pattern = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q.replace('%', "\\%").replace('_', "\\_")));
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, full_name, role::TEXT AS role
            FROM users
            WHERE ($1::TEXT IS NULL OR full_name ILIKE $1)
              AND ($2::TEXT IS NULL OR LOWER(role::TEXT) = LOWER($2))
            ORDER BY full_name
            LIMIT $3
            "#,
        )
        .bind(pattern)
        .bind(role.map(|r| r.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}
