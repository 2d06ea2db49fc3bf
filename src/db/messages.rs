use sqlx::{QueryBuilder, Sqlite};

use super::{clean_optional, now, push_page, Database};
use crate::error::{AppError, AppResult};
use crate::models::{Mailbox, Message, MessageFilter, NewMessage, Page, PageRequest, UnreadCount};

const MESSAGE_COLUMNS: &str =
    "id, sender_id, project_id, recipient_id, subject, body, read_at, created_at";

/// Project threads are visible to everyone; direct messages only to their two parties.
fn push_message_filters(
    builder: &mut QueryBuilder<'_, Sqlite>,
    filter: &MessageFilter,
    viewer: i64,
) {
    builder
        .push(" WHERE (recipient_id IS NULL OR recipient_id = ")
        .push_bind(viewer)
        .push(" OR sender_id = ")
        .push_bind(viewer)
        .push(")");
    if let Some(project_id) = filter.project_id {
        builder.push(" AND project_id = ").push_bind(project_id);
    }
    match filter.mailbox {
        Some(Mailbox::Inbox) => {
            builder.push(" AND recipient_id = ").push_bind(viewer);
        }
        Some(Mailbox::Sent) => {
            builder.push(" AND sender_id = ").push_bind(viewer);
        }
        None => {}
    }
    match filter.unread {
        Some(true) => {
            builder.push(" AND read_at IS NULL");
        }
        Some(false) => {
            builder.push(" AND read_at IS NOT NULL");
        }
        None => {}
    }
}

impl Database {
    pub async fn create_message(&self, message: &NewMessage, sender_id: i64) -> AppResult<Message> {
        message.validate()?;
        if let Some(project_id) = message.project_id {
            self.ensure_project(project_id).await?;
        }
        if let Some(recipient_id) = message.recipient_id {
            self.ensure_user(recipient_id).await?;
        }

        let id = sqlx::query(
            r#"
            INSERT INTO messages (sender_id, project_id, recipient_id, subject, body, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sender_id)
        .bind(message.project_id)
        .bind(message.recipient_id)
        .bind(clean_optional(message.subject.clone()))
        .bind(message.body.trim())
        .bind(now())
        .execute(self.get_pool())
        .await?
        .last_insert_rowid();

        tracing::info!(message_id = id, sender_id, "message sent");
        self.get_message(id, sender_id).await
    }

    /// Fetch a message as seen by `viewer`. Other people's direct messages are 404.
    pub async fn get_message(&self, id: i64, viewer: i64) -> AppResult<Message> {
        let message = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?
        .ok_or(AppError::NotFound("message"))?;

        if message.is_direct()
            && message.sender_id != viewer
            && message.recipient_id != Some(viewer)
        {
            return Err(AppError::NotFound("message"));
        }
        Ok(message)
    }

    pub async fn list_messages(
        &self,
        filter: &MessageFilter,
        viewer: i64,
    ) -> AppResult<Page<Message>> {
        let page = PageRequest::new(filter.page, filter.per_page)?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM messages");
        push_message_filters(&mut count, filter, viewer);
        let total = self.count(count).await?;

        let mut select = QueryBuilder::new(format!("SELECT {MESSAGE_COLUMNS} FROM messages"));
        push_message_filters(&mut select, filter, viewer);
        select.push(" ORDER BY created_at DESC, id DESC");
        push_page(&mut select, page);
        let messages = select
            .build_query_as::<Message>()
            .fetch_all(self.get_pool())
            .await?;

        Ok(Page::new(messages, page, total))
    }

    /// Stamp `read_at` once. Direct messages can only be marked by their recipient.
    pub async fn mark_message_read(&self, id: i64, viewer: i64) -> AppResult<Message> {
        let message = self.get_message(id, viewer).await?;
        if message.is_direct() && message.recipient_id != Some(viewer) {
            return Err(AppError::forbidden(
                "only the recipient can mark a direct message as read",
            ));
        }

        sqlx::query("UPDATE messages SET read_at = ? WHERE id = ? AND read_at IS NULL")
            .bind(now())
            .bind(id)
            .execute(self.get_pool())
            .await?;

        self.get_message(id, viewer).await
    }

    pub async fn delete_message(&self, id: i64, viewer: i64) -> AppResult<()> {
        let message = self.get_message(id, viewer).await?;
        if message.sender_id != viewer {
            return Err(AppError::forbidden("only the sender can delete a message"));
        }

        sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(self.get_pool())
            .await?;
        Ok(())
    }

    pub async fn unread_count(&self, viewer: i64) -> AppResult<UnreadCount> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE recipient_id = ? AND read_at IS NULL",
        )
        .bind(viewer)
        .fetch_one(self.get_pool())
        .await?;
        Ok(UnreadCount { count })
    }
}
