//! Remote store tables

use super::{RemoteError, SqliteStore};

impl SqliteStore {
    /// Create the tables if they are missing
    pub(super) fn init_schema(&self) -> Result<(), RemoteError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS survey_responses (
                id TEXT PRIMARY KEY,
                survey TEXT NOT NULL,
                payload TEXT NOT NULL,
                submitted_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_survey_responses_survey ON survey_responses(survey);

            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                client_nit TEXT NOT NULL,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_projects_client_nit ON projects(client_nit);
            "#,
        )?;
        Ok(())
    }
}
