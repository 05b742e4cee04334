// ==========================================
// 合规规则引擎 - 指标与风险预测仓储
// ==========================================
// 职责: 管理 compliance_metrics (追加序列) 与
//       risk_prediction (追加,按 analyzed_at 取最新) 两张表
// 红线: 指标序列只追加,从不原地修改
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::metrics::{ComplianceMetrics, RiskPrediction, TaskRiskEstimate};
use crate::domain::types::RiskLevel;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ComplianceMetricsRepository - 指标序列仓储
// ==========================================
pub struct ComplianceMetricsRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ComplianceMetricsRepository {
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

    /// 追加指标快照
    pub fn insert(&self, metrics: &ComplianceMetrics) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO compliance_metrics (
                metrics_id, company_id,
                total_tasks, completed_tasks, pending_tasks, overdue_tasks, missed_tasks,
                completion_rate, on_time_filing_rate,
                compliance_score, previous_score, score_change, computed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                metrics.metrics_id,
                metrics.company_id,
                metrics.total_tasks,
                metrics.completed_tasks,
                metrics.pending_tasks,
                metrics.overdue_tasks,
                metrics.missed_tasks,
                metrics.completion_rate,
                metrics.on_time_filing_rate,
                metrics.compliance_score,
                metrics.previous_score,
                metrics.score_change,
                metrics.computed_at,
            ],
        )?;
        Ok(())
    }

    /// 公司最近一次快照的评分(作为下一次快照的 previous_score)
    pub fn latest_score(&self, company_id: i64) -> RepositoryResult<Option<i32>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                "SELECT compliance_score FROM compliance_metrics
                 WHERE company_id = ?1
                 ORDER BY computed_at DESC
                 LIMIT 1",
                params![company_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(result)
    }

    /// 公司指标序列(按计算时间升序)
    pub fn list_by_company(&self, company_id: i64) -> RepositoryResult<Vec<ComplianceMetrics>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM compliance_metrics WHERE company_id = ?1 ORDER BY computed_at",
        )?;
        let rows = stmt.query_map(params![company_id], Self::map_row)?;

        let mut series = Vec::new();
        for row in rows {
            series.push(row?);
        }
        Ok(series)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<ComplianceMetrics> {
        Ok(ComplianceMetrics {
            metrics_id: row.get("metrics_id")?,
            company_id: row.get("company_id")?,
            total_tasks: row.get("total_tasks")?,
            completed_tasks: row.get("completed_tasks")?,
            pending_tasks: row.get("pending_tasks")?,
            overdue_tasks: row.get("overdue_tasks")?,
            missed_tasks: row.get("missed_tasks")?,
            completion_rate: row.get("completion_rate")?,
            on_time_filing_rate: row.get("on_time_filing_rate")?,
            compliance_score: row.get("compliance_score")?,
            previous_score: row.get("previous_score")?,
            score_change: row.get("score_change")?,
            computed_at: row.get("computed_at")?,
        })
    }
}

// ==========================================
// RiskPredictionRepository - 风险预测仓储
// ==========================================
// 存储: 每次预测追加一行,读取按 analyzed_at 取最新(最新生效);
//       历史行保留,构成可回溯的指标序列
pub struct RiskPredictionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RiskPredictionRepository {
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

    /// 追加预测结果
    pub fn insert(&self, prediction: &RiskPrediction) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO risk_prediction (
                prediction_id, company_id, overall_risk_level,
                average_delay_probability, predictions, high_risk_task_ids, analyzed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                prediction.prediction_id,
                prediction.company_id,
                prediction.overall_risk_level.as_str(),
                prediction.average_delay_probability,
                serde_json::to_string(&prediction.predictions)?,
                serde_json::to_string(&prediction.high_risk_task_ids)?,
                prediction.analyzed_at,
            ],
        )?;
        Ok(())
    }

    /// 公司最新预测
    pub fn latest_for_company(
        &self,
        company_id: i64,
    ) -> RepositoryResult<Option<RiskPrediction>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                "SELECT * FROM risk_prediction
                 WHERE company_id = ?1
                 ORDER BY analyzed_at DESC
                 LIMIT 1",
                params![company_id],
                Self::map_row,
            )
            .optional()?;
        Ok(result)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<RiskPrediction> {
        let level: String = row.get("overall_risk_level")?;
        let predictions: String = row.get("predictions")?;
        let high_risk: String = row.get("high_risk_task_ids")?;

        let predictions: Vec<TaskRiskEstimate> =
            serde_json::from_str(&predictions).unwrap_or_default();
        let high_risk_task_ids: Vec<String> =
            serde_json::from_str(&high_risk).unwrap_or_default();

        Ok(RiskPrediction {
            prediction_id: row.get("prediction_id")?,
            company_id: row.get("company_id")?,
            overall_risk_level: RiskLevel::parse(&level),
            average_delay_probability: row.get("average_delay_probability")?,
            predictions,
            high_risk_task_ids,
            analyzed_at: row.get("analyzed_at")?,
        })
    }
}
