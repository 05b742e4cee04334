// ==========================================
// 合规规则引擎 - 合规规则仓储 (RuleCatalog)
// ==========================================
// 职责: 管理 compliance_rule 表的查找/过滤
// 红线: 不含业务逻辑,只负责数据访问;
//       规则写入时执行加载期校验(数据完整性,拒绝畸形规则)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::rule::{ApplicabilityCriteria, ComplianceRule};
use crate::domain::types::{ComplianceCategory, ComplianceFrequency};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ComplianceRuleRepository - 规则目录
// ==========================================
pub struct ComplianceRuleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ComplianceRuleRepository {
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

    /// 写入规则(加载期校验,畸形规则在此拒绝而非评估期)
    pub fn insert(&self, rule: &ComplianceRule) -> RepositoryResult<()> {
        rule.validate()
            .map_err(RepositoryError::BusinessRuleViolation)?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO compliance_rule (
                rule_code, rule_name, description, category, form_name, act_name,
                company_types, turnover_threshold, states,
                frequency, base_due_day, base_due_month,
                extension_allowed, typical_extension_days,
                is_active, effective_from, effective_to
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                rule.rule_code,
                rule.rule_name,
                rule.description,
                rule.category.as_str(),
                rule.form_name,
                rule.act_name,
                serde_json::to_string(&rule.criteria.company_types)?,
                rule.criteria.turnover_threshold,
                serde_json::to_string(&rule.criteria.states)?,
                rule.frequency.as_str(),
                rule.base_due_day,
                rule.base_due_month,
                rule.extension_allowed,
                rule.typical_extension_days,
                rule.is_active,
                rule.effective_from,
                rule.effective_to,
            ],
        )?;
        Ok(())
    }

    /// 按规则代码查找
    pub fn find_by_code(&self, rule_code: &str) -> RepositoryResult<ComplianceRule> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT * FROM compliance_rule WHERE rule_code = ?1",
            params![rule_code],
            Self::map_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "compliance_rule".to_string(),
                id: rule_code.to_string(),
            },
            other => other.into(),
        })
    }

    /// 列出指定日期生效的活动规则
    ///
    /// # 参数
    /// - on: 判定生效窗口的基准日期
    pub fn list_active_effective(&self, on: NaiveDate) -> RepositoryResult<Vec<ComplianceRule>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM compliance_rule
            WHERE is_active = 1
              AND (effective_from IS NULL OR effective_from <= ?1)
              AND (effective_to IS NULL OR effective_to >= ?1)
            ORDER BY rule_code
            "#,
        )?;
        let rows = stmt.query_map(params![on], Self::map_row)?;

        let mut rules = Vec::new();
        for row in rows {
            rules.push(row?);
        }
        Ok(rules)
    }

    /// 行映射
    fn map_row(row: &Row<'_>) -> rusqlite::Result<ComplianceRule> {
        let category: String = row.get("category")?;
        let frequency: String = row.get("frequency")?;
        let company_types: String = row.get("company_types")?;
        let states: String = row.get("states")?;

        Ok(ComplianceRule {
            rule_code: row.get("rule_code")?,
            rule_name: row.get("rule_name")?,
            description: row.get("description")?,
            category: ComplianceCategory::parse(&category),
            form_name: row.get("form_name")?,
            act_name: row.get("act_name")?,
            criteria: ApplicabilityCriteria {
                company_types: serde_json::from_str(&company_types).unwrap_or_default(),
                turnover_threshold: row.get("turnover_threshold")?,
                states: serde_json::from_str(&states).unwrap_or_default(),
            },
            // 频率列可能被外部写入进程留下枚举之外的值,
            // 读到未知值即拒绝整行映射,不得默认化
            frequency: ComplianceFrequency::try_parse(&frequency).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    format!("unknown compliance frequency '{}'", frequency).into(),
                )
            })?,
            base_due_day: row.get("base_due_day")?,
            base_due_month: row.get("base_due_month")?,
            extension_allowed: row.get("extension_allowed")?,
            typical_extension_days: row.get("typical_extension_days")?,
            is_active: row.get("is_active")?,
            effective_from: row.get("effective_from")?,
            effective_to: row.get("effective_to")?,
        })
    }
}
