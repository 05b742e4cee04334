// ==========================================
// 合规规则引擎 - 合规任务仓储
// ==========================================
// 职责: 管理 compliance_task 表的 CRUD 操作
// 红线: 唯一事实层;
//       - (company_id, rule_code, period) 唯一,重复写入零影响
//       - 延期写入采用乐观前置条件,仅当新日期严格晚于
//         写入时刻的有效截止日才生效(单调向后不变量)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::task::ComplianceTask;
use crate::domain::types::{
    ComplianceCategory, DueDateSource, TaskPriority, TaskStatus,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

/// 非终态状态集合(SQL IN 子句)
const OPEN_STATUSES: &str = "('pending', 'in_progress')";

// ==========================================
// ComplianceTaskRepository - 合规任务仓储
// ==========================================
pub struct ComplianceTaskRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ComplianceTaskRepository {
    /// 创建新的仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
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

    /// 幂等写入: 周期未被覆盖时插入,否则零影响
    ///
    /// # 返回
    /// - true: 实际插入
    /// - false: (company, rule, period) 已存在,跳过
    pub fn insert_if_absent(&self, task: &ComplianceTask) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            INSERT OR IGNORE INTO compliance_task (
                task_id, company_id, rule_code, task_name, category, form_name, act_name,
                period, period_start, period_end, due_date, extended_due_date,
                status, priority, source_of_due_date, due_date_update_reason,
                acknowledgment_number, filing_reference, filed_by, actual_filing_date,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                      ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)
            "#,
            params![
                task.task_id,
                task.company_id,
                task.rule_code,
                task.task_name,
                task.category.as_str(),
                task.form_name,
                task.act_name,
                task.period,
                task.period_start,
                task.period_end,
                task.due_date,
                task.extended_due_date,
                task.status.as_str(),
                task.priority.as_str(),
                task.source_of_due_date.as_str(),
                task.due_date_update_reason,
                task.acknowledgment_number,
                task.filing_reference,
                task.filed_by,
                task.actual_filing_date,
                task.created_at,
                task.updated_at,
            ],
        )?;
        Ok(affected > 0)
    }

    /// 按任务 ID 查找
    pub fn find_by_id(&self, task_id: &str) -> RepositoryResult<ComplianceTask> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT * FROM compliance_task WHERE task_id = ?1",
            params![task_id],
            Self::map_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "compliance_task".to_string(),
                id: task_id.to_string(),
            },
            other => other.into(),
        })
    }

    /// 列出公司全部任务
    pub fn list_by_company(&self, company_id: i64) -> RepositoryResult<Vec<ComplianceTask>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM compliance_task WHERE company_id = ?1 ORDER BY due_date",
        )?;
        let rows = stmt.query_map(params![company_id], Self::map_row)?;
        Self::collect(rows)
    }

    /// 按表单名子串匹配开放任务(核对管线候选匹配)
    ///
    /// # 参数
    /// - company_id: 公司范围
    /// - form_name_fragment: 表单名子串(大小写不敏感)
    /// - period: 给定时要求周期精确匹配
    ///
    /// # 约束
    /// - 仅返回非终态任务
    pub fn list_open_by_form(
        &self,
        company_id: i64,
        form_name_fragment: &str,
        period: Option<&str>,
    ) -> RepositoryResult<Vec<ComplianceTask>> {
        let conn = self.get_conn()?;
        let pattern = format!("%{}%", form_name_fragment);

        let sql = format!(
            "SELECT * FROM compliance_task
             WHERE company_id = ?1
               AND form_name LIKE ?2 COLLATE NOCASE
               AND status IN {}
               {}
             ORDER BY due_date",
            OPEN_STATUSES,
            if period.is_some() { "AND period = ?3" } else { "" }
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = match period {
            Some(p) => stmt.query_map(params![company_id, pattern, p], Self::map_row)?,
            None => stmt.query_map(params![company_id, pattern], Self::map_row)?,
        };
        Self::collect(rows)
    }

    /// 应用延期截止日(乐观并发)
    ///
    /// # 前置条件(写入时刻重新检查,防止并发核对互相覆盖)
    /// - 任务处于非终态
    /// - 新日期严格晚于当前有效截止日 COALESCE(extended_due_date, due_date)
    ///
    /// # 返回
    /// - true: 更新生效
    /// - false: 前置条件不满足,零影响(调用方据此继续批处理)
    pub fn apply_extension(
        &self,
        task_id: &str,
        new_due_date: NaiveDate,
        source: DueDateSource,
        reason: &str,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            &format!(
                "UPDATE compliance_task
                 SET extended_due_date = ?1,
                     source_of_due_date = ?2,
                     due_date_update_reason = ?3,
                     updated_at = ?4
                 WHERE task_id = ?5
                   AND status IN {}
                   AND COALESCE(extended_due_date, due_date) < ?1",
                OPEN_STATUSES
            ),
            params![new_due_date, source.as_str(), reason, Utc::now(), task_id],
        )?;
        Ok(affected > 0)
    }

    /// 状态流转
    pub fn update_status(&self, task_id: &str, status: TaskStatus) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE compliance_task SET status = ?1, updated_at = ?2 WHERE task_id = ?3",
            params![status.as_str(), Utc::now(), task_id],
        )?;
        Ok(affected > 0)
    }

    /// 记录申报完成(状态 + 申报元数据)
    pub fn mark_filed(
        &self,
        task_id: &str,
        acknowledgment_number: &str,
        filed_by: &str,
        filing_date: NaiveDate,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE compliance_task
             SET status = 'filed',
                 acknowledgment_number = ?1,
                 filed_by = ?2,
                 actual_filing_date = ?3,
                 updated_at = ?4
             WHERE task_id = ?5",
            params![acknowledgment_number, filed_by, filing_date, Utc::now(), task_id],
        )?;
        Ok(affected > 0)
    }

    /// 历史任务窗口(风险预测输入,按截止日倒序)
    pub fn list_historical(
        &self,
        company_id: i64,
        limit: usize,
    ) -> RepositoryResult<Vec<ComplianceTask>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM compliance_task
             WHERE company_id = ?1
             ORDER BY due_date DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![company_id, limit as i64], Self::map_row)?;
        Self::collect(rows)
    }

    /// 即将到期的待办任务(风险预测对象,按截止日升序)
    pub fn list_upcoming_pending(
        &self,
        company_id: i64,
        today: NaiveDate,
        limit: usize,
    ) -> RepositoryResult<Vec<ComplianceTask>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM compliance_task
             WHERE company_id = ?1
               AND status = 'pending'
               AND COALESCE(extended_due_date, due_date) >= ?2
             ORDER BY due_date
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![company_id, today, limit as i64], Self::map_row)?;
        Self::collect(rows)
    }

    fn collect<'a>(
        rows: impl Iterator<Item = rusqlite::Result<ComplianceTask>> + 'a,
    ) -> RepositoryResult<Vec<ComplianceTask>> {
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// 行映射
    fn map_row(row: &Row<'_>) -> rusqlite::Result<ComplianceTask> {
        let category: String = row.get("category")?;
        let status: String = row.get("status")?;
        let priority: String = row.get("priority")?;
        let source: String = row.get("source_of_due_date")?;

        Ok(ComplianceTask {
            task_id: row.get("task_id")?,
            company_id: row.get("company_id")?,
            rule_code: row.get("rule_code")?,
            task_name: row.get("task_name")?,
            category: ComplianceCategory::parse(&category),
            form_name: row.get("form_name")?,
            act_name: row.get("act_name")?,
            period: row.get("period")?,
            period_start: row.get("period_start")?,
            period_end: row.get("period_end")?,
            due_date: row.get("due_date")?,
            extended_due_date: row.get("extended_due_date")?,
            status: TaskStatus::parse(&status),
            priority: TaskPriority::parse(&priority),
            source_of_due_date: DueDateSource::parse(&source),
            due_date_update_reason: row.get("due_date_update_reason")?,
            acknowledgment_number: row.get("acknowledgment_number")?,
            filing_reference: row.get("filing_reference")?,
            filed_by: row.get("filed_by")?,
            actual_filing_date: row.get("actual_filing_date")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}
