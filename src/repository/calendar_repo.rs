// ==========================================
// 合规规则引擎 - 日历快照仓储
// ==========================================
// 职责: 管理 compliance_calendar 表
// 说明: 快照可随时由任务集重建,同 (company, fy) 取最新
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::task::ComplianceCalendar;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ComplianceCalendarRepository - 日历快照仓储
// ==========================================
pub struct ComplianceCalendarRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ComplianceCalendarRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加日历快照
    pub fn insert(&self, calendar: &ComplianceCalendar) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO compliance_calendar (
                calendar_id, company_id, fiscal_year, calendar_name,
                task_count, is_auto_generated, generated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                calendar.calendar_id,
                calendar.company_id,
                calendar.fiscal_year,
                calendar.calendar_name,
                calendar.task_count,
                calendar.is_auto_generated,
                calendar.generated_at,
            ],
        )?;
        Ok(())
    }

    /// 读取 (company, fiscal_year) 的最新快照
    pub fn latest_for(
        &self,
        company_id: i64,
        fiscal_year: &str,
    ) -> RepositoryResult<Option<ComplianceCalendar>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                "SELECT * FROM compliance_calendar
                 WHERE company_id = ?1 AND fiscal_year = ?2
                 ORDER BY generated_at DESC
                 LIMIT 1",
                params![company_id, fiscal_year],
                Self::map_row,
            )
            .optional()?;
        Ok(result)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<ComplianceCalendar> {
        Ok(ComplianceCalendar {
            calendar_id: row.get("calendar_id")?,
            company_id: row.get("company_id")?,
            fiscal_year: row.get("fiscal_year")?,
            calendar_name: row.get("calendar_name")?,
            task_count: row.get("task_count")?,
            is_auto_generated: row.get("is_auto_generated")?,
            generated_at: row.get("generated_at")?,
        })
    }
}
