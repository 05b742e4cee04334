// ==========================================
// 合规规则引擎 - 公司仓储
// ==========================================
// 职责: 管理 company 表的 CRUD 操作
// 红线: 不含业务逻辑,只负责数据访问
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::company::CompanyProfile;
use crate::domain::types::RiskLevel;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// CompanyRepository - 公司仓储
// ==========================================
pub struct CompanyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CompanyRepository {
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

    /// 写入公司画像
    pub fn insert(&self, company: &CompanyProfile) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO company (
                company_id, company_name, company_type, state, turnover,
                gstin, cin, status, compliance_score, risk_level, last_synced_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                company.company_id,
                company.company_name,
                company.company_type,
                company.state,
                company.turnover,
                company.gstin,
                company.cin,
                company.status,
                company.compliance_score,
                company.risk_level.as_str(),
                company.last_synced_at,
            ],
        )?;
        Ok(())
    }

    /// 按 ID 查找
    pub fn find_by_id(&self, company_id: i64) -> RepositoryResult<CompanyProfile> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT * FROM company WHERE company_id = ?1",
            params![company_id],
            Self::map_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "company".to_string(),
                id: company_id.to_string(),
            },
            other => other.into(),
        })
    }

    /// 列出活动公司(调度周期的迭代范围)
    pub fn list_active(&self) -> RepositoryResult<Vec<CompanyProfile>> {
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare("SELECT * FROM company WHERE status = 'Active' ORDER BY company_id")?;
        let rows = stmt.query_map([], Self::map_row)?;

        let mut companies = Vec::new();
        for row in rows {
            companies.push(row?);
        }
        Ok(companies)
    }

    /// 回写合规评分(ScoreCalculator 产出)
    pub fn update_score(&self, company_id: i64, score: i32) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE company SET compliance_score = ?1 WHERE company_id = ?2",
            params![score, company_id],
        )?;
        Ok(affected > 0)
    }

    /// 回写风险等级(RiskForecaster 产出)
    pub fn update_risk_level(&self, company_id: i64, level: RiskLevel) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE company SET risk_level = ?1 WHERE company_id = ?2",
            params![level.as_str(), company_id],
        )?;
        Ok(affected > 0)
    }

    /// 应用主数据同步结果(MasterDataProvider 富化)
    ///
    /// 说明: 提供方失败时调用方不调用本方法,保留既有数据
    pub fn apply_master_data(
        &self,
        company_id: i64,
        status: Option<&str>,
        state: Option<&str>,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE company
             SET status = COALESCE(?1, status),
                 state = COALESCE(?2, state),
                 last_synced_at = ?3
             WHERE company_id = ?4",
            params![status, state, Utc::now(), company_id],
        )?;
        Ok(affected > 0)
    }

    /// 行映射
    fn map_row(row: &Row<'_>) -> rusqlite::Result<CompanyProfile> {
        let risk_level: String = row.get("risk_level")?;
        Ok(CompanyProfile {
            company_id: row.get("company_id")?,
            company_name: row.get("company_name")?,
            company_type: row.get("company_type")?,
            state: row.get("state")?,
            turnover: row.get("turnover")?,
            gstin: row.get("gstin")?,
            cin: row.get("cin")?,
            status: row.get("status")?,
            compliance_score: row.get("compliance_score")?,
            risk_level: RiskLevel::parse(&risk_level),
            last_synced_at: row.get("last_synced_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};

    fn test_repo() -> CompanyRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        CompanyRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn sample_company(id: i64, status: &str) -> CompanyProfile {
        CompanyProfile {
            company_id: id,
            company_name: format!("Company {}", id),
            company_type: Some("Private Limited".to_string()),
            state: Some("Maharashtra".to_string()),
            turnover: Some(80_000_000.0),
            gstin: Some("27AAACA1234A1Z5".to_string()),
            cin: Some("U72200MH2015PTC123456".to_string()),
            status: status.to_string(),
            compliance_score: 100,
            risk_level: RiskLevel::Low,
            last_synced_at: None,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let repo = test_repo();
        repo.insert(&sample_company(1, "Active")).unwrap();

        let found = repo.find_by_id(1).unwrap();
        assert_eq!(found.company_name, "Company 1");
        assert!(found.is_active());
        assert_eq!(found.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_list_active_excludes_inactive() {
        let repo = test_repo();
        repo.insert(&sample_company(1, "Active")).unwrap();
        repo.insert(&sample_company(2, "Struck Off")).unwrap();
        repo.insert(&sample_company(3, "Active")).unwrap();

        let active = repo.list_active().unwrap();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|c| c.is_active()));
    }

    #[test]
    fn test_update_score_and_risk() {
        let repo = test_repo();
        repo.insert(&sample_company(1, "Active")).unwrap();

        assert!(repo.update_score(1, 72).unwrap());
        assert!(repo.update_risk_level(1, RiskLevel::High).unwrap());

        let updated = repo.find_by_id(1).unwrap();
        assert_eq!(updated.compliance_score, 72);
        assert_eq!(updated.risk_level, RiskLevel::High);

        // 不存在的公司 => 零影响
        assert!(!repo.update_score(99, 50).unwrap());
    }

    #[test]
    fn test_apply_master_data_keeps_existing_on_none() {
        let repo = test_repo();
        repo.insert(&sample_company(1, "Active")).unwrap();

        assert!(repo.apply_master_data(1, None, Some("Karnataka")).unwrap());
        let updated = repo.find_by_id(1).unwrap();
        assert_eq!(updated.status, "Active"); // None => 保留既有值
        assert_eq!(updated.state.as_deref(), Some("Karnataka"));
        assert!(updated.last_synced_at.is_some());
    }
}
