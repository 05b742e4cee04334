// ==========================================
// ReconciliationProcessor 端到端测试
// ==========================================
// 测试目标: 通知 -> 抽取 -> 校验 -> 任务延期全链路
// 场景来源: GSTR-3B October 2025 延期通知
// ==========================================

mod test_helpers;

use async_trait::async_trait;
use chrono::NaiveDate;
use compliance_engine::domain::company::CompanyProfile;
use compliance_engine::domain::notification::RegulatoryNotification;
use compliance_engine::domain::rule::ComplianceRule;
use compliance_engine::domain::types::DueDateSource;
use compliance_engine::engine::reconcile::{ReconcileConfig, ReconciliationProcessor};
use compliance_engine::provider::extraction::{
    ApplicabilitySignal, DelayRiskSignal, FilingHistoryEntry, RawDueDateExtraction,
    RuleBasedExtractionService, TextExtractionService, UpcomingTaskSummary,
};
use compliance_engine::repository::ComplianceTaskRepository;
use std::error::Error;
use std::sync::Arc;
use test_helpers::{create_test_db, pending_task, seed_company};

fn extension_notice() -> RegulatoryNotification {
    RegulatoryNotification {
        title: "Notification 12/2025".to_string(),
        content: "The due date for filing GSTR-3B for October 2025 stands extended to 2025-11-25 \
                  on account of portal downtime."
            .to_string(),
        published_on: NaiveDate::from_ymd_opt(2025, 11, 10),
        source: "cbic.gov.in".to_string(),
    }
}

#[tokio::test]
async fn test_gstr3b_extension_end_to_end() {
    let (_file, db_path) = create_test_db().unwrap();
    seed_company(&db_path, 1, "Private Limited").unwrap();

    let task_repo = Arc::new(ComplianceTaskRepository::new(&db_path).unwrap());
    let october = pending_task(
        1,
        "GST-3B",
        "GSTR-3B",
        "October 2025",
        NaiveDate::from_ymd_opt(2025, 11, 20).unwrap(),
    );
    let november = pending_task(
        1,
        "GST-3B",
        "GSTR-3B",
        "November 2025",
        NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
    );
    task_repo.insert_if_absent(&october).unwrap();
    task_repo.insert_if_absent(&november).unwrap();

    let processor = ReconciliationProcessor::new(
        task_repo.clone(),
        Arc::new(RuleBasedExtractionService),
        ReconcileConfig::default(),
    );

    let docs = vec![extension_notice()];
    let outcome = processor.reconcile(1, &docs).await.unwrap();
    assert_eq!(outcome.documents_seen, 1);
    assert_eq!(outcome.candidates_extracted, 1);
    assert_eq!(outcome.tasks_updated, 1);

    // 仅 October 2025 周期被延期,November 不受影响
    let updated = task_repo.find_by_id(&october.task_id).unwrap();
    assert_eq!(
        updated.extended_due_date,
        NaiveDate::from_ymd_opt(2025, 11, 25)
    );
    assert_eq!(updated.source_of_due_date, DueDateSource::AutoExtracted);
    assert_eq!(
        updated.effective_due_date(),
        NaiveDate::from_ymd_opt(2025, 11, 25).unwrap()
    );

    let untouched = task_repo.find_by_id(&november.task_id).unwrap();
    assert_eq!(untouched.extended_due_date, None);

    // 同一通知重跑: 候选日期不再严格晚于有效截止日,零更新
    let second = processor.reconcile(1, &docs).await.unwrap();
    assert_eq!(second.tasks_updated, 0);
    assert_eq!(
        task_repo
            .find_by_id(&october.task_id)
            .unwrap()
            .extended_due_date,
        NaiveDate::from_ymd_opt(2025, 11, 25)
    );
}

#[tokio::test]
async fn test_unrelated_notice_changes_nothing() {
    let (_file, db_path) = create_test_db().unwrap();
    seed_company(&db_path, 1, "Private Limited").unwrap();

    let task_repo = Arc::new(ComplianceTaskRepository::new(&db_path).unwrap());
    let task = pending_task(
        1,
        "GST-3B",
        "GSTR-3B",
        "October 2025",
        NaiveDate::from_ymd_opt(2025, 11, 20).unwrap(),
    );
    task_repo.insert_if_absent(&task).unwrap();

    let processor = ReconciliationProcessor::new(
        task_repo.clone(),
        Arc::new(RuleBasedExtractionService),
        ReconcileConfig::default(),
    );

    let docs = vec![RegulatoryNotification {
        title: "Circular 230/2025".to_string(),
        content: "Clarification regarding input tax credit eligibility for demo units".to_string(),
        published_on: None,
        source: "cbic.gov.in".to_string(),
    }];

    let outcome = processor.reconcile(1, &docs).await.unwrap();
    assert_eq!(outcome.documents_filtered, 1);
    assert_eq!(outcome.tasks_updated, 0);
    assert_eq!(
        task_repo.find_by_id(&task.task_id).unwrap().extended_due_date,
        None
    );
}

// ==========================================
// 低置信度候选场景(抽取桩固定返回 0.1)
// ==========================================

struct LowConfidenceExtraction;

#[async_trait]
impl TextExtractionService for LowConfidenceExtraction {
    async fn extract_due_date_change(
        &self,
        _text: &str,
    ) -> Result<Option<RawDueDateExtraction>, Box<dyn Error + Send + Sync>> {
        Ok(Some(RawDueDateExtraction {
            form_name: "GSTR-3B".to_string(),
            category: "gst".to_string(),
            new_due_date: "2025-11-25".to_string(),
            period: Some("October 2025".to_string()),
            is_extension: true,
            reason: "uncertain reading".to_string(),
            confidence: 0.1,
        }))
    }

    async fn evaluate_applicability(
        &self,
        _company: &CompanyProfile,
        _rule: &ComplianceRule,
    ) -> Result<ApplicabilitySignal, Box<dyn Error + Send + Sync>> {
        Err("not used".into())
    }

    async fn predict_delay_risk(
        &self,
        _history: &[FilingHistoryEntry],
        _upcoming: &UpcomingTaskSummary,
    ) -> Result<DelayRiskSignal, Box<dyn Error + Send + Sync>> {
        Err("not used".into())
    }
}

#[tokio::test]
async fn test_low_confidence_candidate_discarded_without_error() {
    let (_file, db_path) = create_test_db().unwrap();
    seed_company(&db_path, 1, "Private Limited").unwrap();

    let task_repo = Arc::new(ComplianceTaskRepository::new(&db_path).unwrap());
    let task = pending_task(
        1,
        "GST-3B",
        "GSTR-3B",
        "October 2025",
        NaiveDate::from_ymd_opt(2025, 11, 20).unwrap(),
    );
    task_repo.insert_if_absent(&task).unwrap();

    let processor = ReconciliationProcessor::new(
        task_repo.clone(),
        Arc::new(LowConfidenceExtraction),
        ReconcileConfig::default(),
    );

    let outcome = processor.reconcile(1, &[extension_notice()]).await.unwrap();
    assert_eq!(outcome.candidates_extracted, 1);
    assert_eq!(outcome.candidates_discarded, 1);
    assert_eq!(outcome.tasks_updated, 0);
    assert!(outcome
        .skip_details
        .iter()
        .any(|d| d.contains("below threshold")));

    assert_eq!(
        task_repo.find_by_id(&task.task_id).unwrap().extended_due_date,
        None
    );
}
