// ==========================================
// 合规规则引擎 - 二进制入口
// ==========================================
// 用途: 初始化数据库并对演示数据跑一轮完整调度
// (日历生成 -> 通知核对 -> 评分 -> 风险预测)
// ==========================================

use anyhow::Context;
use chrono::NaiveDate;
use compliance_engine::db;
use compliance_engine::domain::company::CompanyProfile;
use compliance_engine::domain::notification::RegulatoryNotification;
use compliance_engine::domain::rule::{ApplicabilityCriteria, ComplianceRule};
use compliance_engine::domain::types::{ComplianceCategory, ComplianceFrequency, RiskLevel};
use compliance_engine::engine::applicability::ApplicabilityEvaluator;
use compliance_engine::engine::calendar::{CalendarGenerator, GeneratorConfig};
use compliance_engine::engine::coordinator::{CoordinatorConfig, JobType, SchedulerCoordinator};
use compliance_engine::engine::forecast::RiskForecaster;
use compliance_engine::engine::reconcile::{ReconcileConfig, ReconciliationProcessor};
use compliance_engine::logging;
use compliance_engine::provider::extraction::RuleBasedExtractionService;
use compliance_engine::provider::master_data::NoOpMasterDataProvider;
use compliance_engine::provider::notification_feed::InMemoryNotificationFeed;
use compliance_engine::repository::{
    CompanyRepository, ComplianceCalendarRepository, ComplianceMetricsRepository,
    ComplianceRuleRepository, ComplianceTaskRepository, RiskPredictionRepository,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let db_path = std::env::var("COMPLIANCE_DB").unwrap_or_else(|_| "compliance.db".to_string());
    let conn = Connection::open(&db_path).with_context(|| format!("打开数据库失败: {}", db_path))?;
    db::configure_sqlite_connection(&conn).context("配置数据库连接失败")?;
    db::init_schema(&conn).context("初始化 schema 失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let company_repo = Arc::new(CompanyRepository::from_connection(conn.clone()));
    let rule_repo = Arc::new(ComplianceRuleRepository::from_connection(conn.clone()));
    let task_repo = Arc::new(ComplianceTaskRepository::from_connection(conn.clone()));
    let calendar_repo = Arc::new(ComplianceCalendarRepository::from_connection(conn.clone()));
    let metrics_repo = Arc::new(ComplianceMetricsRepository::from_connection(conn.clone()));
    let prediction_repo = Arc::new(RiskPredictionRepository::from_connection(conn));

    seed_demo_data(&company_repo, &rule_repo)?;

    let extraction = Arc::new(RuleBasedExtractionService);
    let generator = Arc::new(CalendarGenerator::new(
        rule_repo,
        task_repo.clone(),
        calendar_repo,
        ApplicabilityEvaluator::new(extraction.clone()),
        GeneratorConfig::default(),
    ));
    let reconciler = Arc::new(ReconciliationProcessor::new(
        task_repo.clone(),
        extraction.clone(),
        ReconcileConfig::default(),
    ));
    let forecaster = Arc::new(RiskForecaster::new(extraction));

    let feed = Arc::new(InMemoryNotificationFeed::new(vec![RegulatoryNotification {
        title: "Notification 12/2025".to_string(),
        content: "The due date for filing GSTR-3B for October 2025 stands extended to 2025-11-25."
            .to_string(),
        published_on: NaiveDate::from_ymd_opt(2025, 11, 10),
        source: "cbic.gov.in".to_string(),
    }]));

    let coordinator = SchedulerCoordinator::new(
        company_repo,
        task_repo,
        metrics_repo,
        prediction_repo,
        generator,
        reconciler,
        forecaster,
        feed,
        Arc::new(NoOpMasterDataProvider),
        CoordinatorConfig::default(),
    );

    for job in [
        JobType::CalendarGeneration,
        JobType::Reconciliation,
        JobType::Scoring,
        JobType::Forecasting,
    ] {
        let report = coordinator.run_cycle(job).await?;
        info!(
            job = report.job_type,
            state = report.state.as_str(),
            processed = report.companies_processed,
            failed = report.companies_failed,
            "周期完成"
        );
    }

    Ok(())
}

/// 空库时写入演示公司与规则
fn seed_demo_data(
    company_repo: &CompanyRepository,
    rule_repo: &ComplianceRuleRepository,
) -> anyhow::Result<()> {
    if !company_repo.list_active()?.is_empty() {
        return Ok(());
    }
    info!("空数据库,写入演示数据");

    company_repo.insert(&CompanyProfile {
        company_id: 1,
        company_name: "Acme Technologies Pvt Ltd".to_string(),
        company_type: Some("Private Limited".to_string()),
        state: Some("Maharashtra".to_string()),
        turnover: Some(80_000_000.0),
        gstin: Some("27AAACA1234A1Z5".to_string()),
        cin: Some("U72200MH2015PTC123456".to_string()),
        status: "Active".to_string(),
        compliance_score: 100,
        risk_level: RiskLevel::Low,
        last_synced_at: None,
    })?;

    rule_repo.insert(&ComplianceRule {
        rule_code: "GST-3B".to_string(),
        rule_name: "GSTR-3B Monthly Return".to_string(),
        description: Some("Monthly summary return of outward and inward supplies".to_string()),
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
    })?;

    rule_repo.insert(&ComplianceRule {
        rule_code: "MCA-AOC4".to_string(),
        rule_name: "AOC-4 Annual Financial Statements".to_string(),
        description: Some("Filing of financial statements with the Registrar".to_string()),
        category: ComplianceCategory::Mca,
        form_name: "AOC-4".to_string(),
        act_name: Some("Companies Act, 2013".to_string()),
        criteria: ApplicabilityCriteria {
            company_types: vec!["Private Limited".to_string()],
            turnover_threshold: None,
            states: vec![],
        },
        frequency: ComplianceFrequency::Annual,
        base_due_day: Some(30),
        base_due_month: Some(10),
        extension_allowed: true,
        typical_extension_days: 15,
        is_active: true,
        effective_from: None,
        effective_to: None,
    })?;

    Ok(())
}
