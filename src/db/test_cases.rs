use sqlx::{QueryBuilder, Sqlite};

use super::{clean_optional, now, push_page, Database};
use crate::error::{AppError, AppResult};
use crate::models::{
    BugSeverity, BugStatus, NewTestCase, Page, PageRequest, TestCase, TestCaseFilter,
    TestCaseUpdate, TestResult, TestStatus,
};

const TEST_CASE_COLUMNS: &str = "id, project_id, title, description, steps, expected_result, \
     actual_result, status, executed_by, executed_at, bug_id, created_at, updated_at";

fn push_test_case_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &TestCaseFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(project_id) = filter.project_id {
        builder.push(" AND project_id = ").push_bind(project_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
}

/// Description of the bug opened for a failed UAT run.
fn failure_report(case: &TestCase, actual: Option<&str>) -> String {
    let mut report = format!("Expected: {}", case.expected_result);
    if let Some(actual) = actual {
        report.push_str(&format!("\nActual: {actual}"));
    }
    if !case.steps.trim().is_empty() {
        report.push_str(&format!("\nSteps:\n{}", case.steps));
    }
    report
}

impl Database {
    pub async fn create_test_case(&self, case: &NewTestCase) -> AppResult<TestCase> {
        case.validate()?;
        self.ensure_project(case.project_id).await?;
        let now = now();

        let id = sqlx::query(
            r#"
            INSERT INTO test_cases (project_id, title, description, steps, expected_result,
                                    status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(case.project_id)
        .bind(case.title.trim())
        .bind(&case.description)
        .bind(&case.steps)
        .bind(&case.expected_result)
        .bind(TestStatus::Pending)
        .bind(now)
        .bind(now)
        .execute(self.get_pool())
        .await?
        .last_insert_rowid();

        self.get_test_case(id).await
    }

    pub async fn get_test_case(&self, id: i64) -> AppResult<TestCase> {
        sqlx::query_as::<_, TestCase>(&format!(
            "SELECT {TEST_CASE_COLUMNS} FROM test_cases WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?
        .ok_or(AppError::NotFound("test case"))
    }

    pub async fn list_test_cases(&self, filter: &TestCaseFilter) -> AppResult<Page<TestCase>> {
        let page = PageRequest::new(filter.page, filter.per_page)?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM test_cases");
        push_test_case_filters(&mut count, filter);
        let total = self.count(count).await?;

        let mut select = QueryBuilder::new(format!("SELECT {TEST_CASE_COLUMNS} FROM test_cases"));
        push_test_case_filters(&mut select, filter);
        select.push(" ORDER BY id ASC");
        push_page(&mut select, page);
        let cases = select
            .build_query_as::<TestCase>()
            .fetch_all(self.get_pool())
            .await?;

        Ok(Page::new(cases, page, total))
    }

    pub async fn update_test_case(&self, id: i64, update: TestCaseUpdate) -> AppResult<TestCase> {
        let mut case = self.get_test_case(id).await?;
        if let Some(Some(bug_id)) = update.bug_id {
            self.ensure_bug(bug_id).await?;
        }
        update.apply(&mut case);
        NewTestCase {
            project_id: case.project_id,
            title: case.title.clone(),
            description: case.description.clone(),
            steps: case.steps.clone(),
            expected_result: case.expected_result.clone(),
        }
        .validate()?;

        sqlx::query(
            r#"
            UPDATE test_cases
            SET title = ?, description = ?, steps = ?, expected_result = ?, bug_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(case.title.trim())
        .bind(&case.description)
        .bind(&case.steps)
        .bind(&case.expected_result)
        .bind(case.bug_id)
        .bind(now())
        .bind(id)
        .execute(self.get_pool())
        .await?;

        self.get_test_case(id).await
    }

    /// Record a UAT run. A failed run with `open_bug` set files a linked bug
    /// in the same transaction.
    pub async fn record_test_result(
        &self,
        id: i64,
        result: &TestResult,
        executed_by: i64,
    ) -> AppResult<TestCase> {
        let case = self.get_test_case(id).await?;
        let actual = clean_optional(result.actual_result.clone());
        let now = now();
        let mut tx = self.get_pool().begin().await?;

        let bug_id = if result.opens_bug() {
            let bug_id = sqlx::query(
                r#"
                INSERT INTO bugs (project_id, title, description, severity, status, reported_by,
                                  created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(case.project_id)
            .bind(format!("UAT failure: {}", case.title))
            .bind(failure_report(&case, actual.as_deref()))
            .bind(BugSeverity::High)
            .bind(BugStatus::Open)
            .bind(executed_by)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
            tracing::info!(test_case_id = id, bug_id, "bug opened for failed UAT run");
            Some(bug_id)
        } else {
            case.bug_id
        };

        sqlx::query(
            r#"
            UPDATE test_cases
            SET status = ?, actual_result = ?, executed_by = ?, executed_at = ?, bug_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(result.status)
        .bind(&actual)
        .bind(executed_by)
        .bind(now)
        .bind(bug_id)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(test_case_id = id, status = result.status.as_str(), "UAT result recorded");
        self.get_test_case(id).await
    }

    pub async fn delete_test_case(&self, id: i64) -> AppResult<()> {
        let affected = sqlx::query("DELETE FROM test_cases WHERE id = ?")
            .bind(id)
            .execute(self.get_pool())
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(AppError::NotFound("test case"));
        }
        Ok(())
    }
}
