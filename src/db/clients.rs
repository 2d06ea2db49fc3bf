use sqlx::{QueryBuilder, Sqlite};

use super::{clean_optional, like_pattern, normalize_email, now, push_page, Database};
use crate::error::{AppError, AppResult};
use crate::models::{Client, ClientFilter, ClientUpdate, NewClient, Page, PageRequest};

const CLIENT_COLUMNS: &str =
    "id, name, email, phone, company, address, notes, created_at, updated_at";

fn push_client_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ClientFilter) {
    builder.push(" WHERE deleted_at IS NULL");
    if let Some(pattern) = like_pattern(filter.q.as_deref()) {
        builder
            .push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR email LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR company LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

fn email_taken(email: &str) -> AppError {
    AppError::Conflict(format!("a client with email {email} already exists"))
}

impl Database {
    // Client operations
    pub async fn create_client(&self, client: &NewClient) -> AppResult<Client> {
        client.validate()?;
        let email = normalize_email(&client.email);
        let now = now();

        // Inserting only when no live client holds the email keeps the check
        // and the write in one statement.
        let result = sqlx::query(
            r#"
            INSERT INTO clients (name, email, phone, company, address, notes, created_at, updated_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (SELECT 1 FROM clients WHERE email = ? AND deleted_at IS NULL)
            "#,
        )
        .bind(client.name.trim())
        .bind(&email)
        .bind(clean_optional(client.phone.clone()))
        .bind(clean_optional(client.company.clone()))
        .bind(clean_optional(client.address.clone()))
        .bind(clean_optional(client.notes.clone()))
        .bind(now)
        .bind(now)
        .bind(&email)
        .execute(self.get_pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(email_taken(&email));
        }
        let id = result.last_insert_rowid();

        tracing::info!(client_id = id, "client created");
        self.get_client(id).await
    }

    pub async fn get_client(&self, id: i64) -> AppResult<Client> {
        sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?
        .ok_or(AppError::NotFound("client"))
    }

    pub async fn list_clients(&self, filter: &ClientFilter) -> AppResult<Page<Client>> {
        let page = PageRequest::new(filter.page, filter.per_page)?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM clients");
        push_client_filters(&mut count, filter);
        let total = self.count(count).await?;

        let mut select = QueryBuilder::new(format!("SELECT {CLIENT_COLUMNS} FROM clients"));
        push_client_filters(&mut select, filter);
        select.push(" ORDER BY name ASC, id ASC");
        push_page(&mut select, page);
        let clients = select
            .build_query_as::<Client>()
            .fetch_all(self.get_pool())
            .await?;

        Ok(Page::new(clients, page, total))
    }

    pub async fn update_client(&self, id: i64, update: ClientUpdate) -> AppResult<Client> {
        update.validate()?;
        let mut client = self.get_client(id).await?;
        update.apply(&mut client);
        client.email = normalize_email(&client.email);
        client.name = client.name.trim().to_string();
        client.phone = clean_optional(client.phone);
        client.company = clean_optional(client.company);
        client.address = clean_optional(client.address);
        client.notes = clean_optional(client.notes);

        let affected = sqlx::query(
            r#"
            UPDATE clients
            SET name = ?, email = ?, phone = ?, company = ?, address = ?, notes = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
              AND NOT EXISTS (
                  SELECT 1 FROM clients WHERE email = ? AND deleted_at IS NULL AND id != ?
              )
            "#,
        )
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.company)
        .bind(&client.address)
        .bind(&client.notes)
        .bind(now())
        .bind(id)
        .bind(&client.email)
        .bind(id)
        .execute(self.get_pool())
        .await?
        .rows_affected();
        if affected == 0 {
            // Either the email is taken or the client went away meanwhile.
            self.check_email_free(&client.email, id).await?;
            return Err(AppError::NotFound("client"));
        }

        self.get_client(id).await
    }

    /// Soft-delete the client together with its projects.
    pub async fn delete_client(&self, id: i64) -> AppResult<()> {
        let deleted_at = now();
        let mut tx = self.get_pool().begin().await?;

        let affected = sqlx::query(
            "UPDATE clients SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(deleted_at)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(AppError::NotFound("client"));
        }

        let projects = sqlx::query(
            "UPDATE projects SET deleted_at = ? WHERE client_id = ? AND deleted_at IS NULL",
        )
        .bind(deleted_at)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        tracing::info!(client_id = id, projects, "client deleted");
        Ok(())
    }

    /// Reject an email already held by another live client.
    async fn check_email_free(&self, email: &str, except_id: i64) -> AppResult<()> {
        let holder: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM clients WHERE email = ? AND deleted_at IS NULL AND id != ?",
        )
        .bind(email)
        .bind(except_id)
        .fetch_optional(self.get_pool())
        .await?;
        match holder {
            Some(_) => Err(email_taken(email)),
            None => Ok(()),
        }
    }

    /// Fail with a 400 unless the client exists and is not deleted.
    pub(crate) async fn ensure_client(&self, id: i64) -> AppResult<()> {
        match self.get_client(id).await {
            Ok(_) => Ok(()),
            Err(AppError::NotFound(_)) => {
                Err(AppError::validation(format!("client {id} does not exist")))
            }
            Err(e) => Err(e),
        }
    }
}
