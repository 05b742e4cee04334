// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、种子数据构造
// ==========================================

#![allow(dead_code)]

use chrono::Utc;
use compliance_engine::db;
use compliance_engine::domain::company::CompanyProfile;
use compliance_engine::domain::rule::{ApplicabilityCriteria, ComplianceRule};
use compliance_engine::domain::task::ComplianceTask;
use compliance_engine::domain::types::{
    ComplianceCategory, ComplianceFrequency, DueDateSource, RiskLevel, TaskPriority, TaskStatus,
};
use compliance_engine::repository::CompanyRepository;
use rusqlite::Connection;
use std::error::Error;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件(需要保持存活)
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("temp path not utf-8")?
        .to_string();

    let conn = Connection::open(&db_path)?;
    db::configure_sqlite_connection(&conn)?;
    db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 写入测试公司
pub fn seed_company(
    db_path: &str,
    company_id: i64,
    company_type: &str,
) -> Result<CompanyProfile, Box<dyn Error>> {
    let company = CompanyProfile {
        company_id,
        company_name: format!("Company {}", company_id),
        company_type: Some(company_type.to_string()),
        state: Some("Maharashtra".to_string()),
        turnover: Some(80_000_000.0),
        gstin: Some(format!("27AAACA1234A1Z{}", company_id)),
        cin: Some(format!("U72200MH2015PTC10000{}", company_id)),
        status: "Active".to_string(),
        compliance_score: 100,
        risk_level: RiskLevel::Low,
        last_synced_at: None,
    };
    CompanyRepository::new(db_path)?.insert(&company)?;
    Ok(company)
}

/// GSTR-3B 月度规则(次月 20 日截止)
pub fn monthly_gst_rule() -> ComplianceRule {
    ComplianceRule {
        rule_code: "GST-3B".to_string(),
        rule_name: "GSTR-3B Monthly Return".to_string(),
        description: Some("Monthly summary return".to_string()),
        category: ComplianceCategory::Gst,
        form_name: "GSTR-3B".to_string(),
        act_name: Some("CGST Act, 2017".to_string()),
        criteria: ApplicabilityCriteria {
            company_types: vec!["Private Limited".to_string(), "LLP".to_string()],
            turnover_threshold: Some(20_000_000.0),
            states: vec![],
        },
        frequency: ComplianceFrequency::Monthly,
        base_due_day: Some(20),
        base_due_month: None,
        extension_allowed: true,
        typical_extension_days: 5,
        is_active: true,
        effective_from: None,
        effective_to: None,
    }
}

/// 构造待办测试任务
pub fn pending_task(
    company_id: i64,
    rule_code: &str,
    form_name: &str,
    period: &str,
    due: chrono::NaiveDate,
) -> ComplianceTask {
    ComplianceTask {
        task_id: Uuid::new_v4().to_string(),
        company_id,
        rule_code: rule_code.to_string(),
        task_name: format!("{} - {}", form_name, period),
        category: ComplianceCategory::Gst,
        form_name: form_name.to_string(),
        act_name: None,
        period: period.to_string(),
        period_start: due - chrono::Duration::days(50),
        period_end: due - chrono::Duration::days(20),
        due_date: due,
        extended_due_date: None,
        status: TaskStatus::Pending,
        priority: TaskPriority::High,
        source_of_due_date: DueDateSource::System,
        due_date_update_reason: None,
        acknowledgment_number: None,
        filing_reference: None,
        filed_by: None,
        actual_filing_date: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
