// ==========================================
// 合规规则引擎 - 通知核对管线
// ==========================================
// 职责: 政府通知 -> 截止日变更候选 -> 任务延期写入
// 输入: 公司范围 + 通知序列
// 输出: ReconcileOutcome (计数 + 跳过明细)
// 红线:
// - 单文档失败隔离,绝不中断整批
// - 候选校验(必填/日期可解析/置信度阈值)不过 => 丢弃并计数
// - 延期只向后推,前置条件由仓储在写入时刻重新检查
// ==========================================

use crate::domain::notification::{
    ExtractedDueDateChange, ReconcileOutcome, RegulatoryNotification,
};
use crate::domain::types::{ComplianceCategory, DueDateSource};
use crate::engine::error::EngineResult;
use crate::provider::extraction::{RawDueDateExtraction, TextExtractionService};
use crate::repository::task_repo::ComplianceTaskRepository;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ==========================================
// ReconcileConfig - 核对管线配置
// ==========================================
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// 候选最低置信度(低于此值丢弃)
    pub min_confidence: f64,
    /// 单次抽取调用超时
    pub extraction_timeout: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            extraction_timeout: Duration::from_secs(30),
        }
    }
}

// ==========================================
// ReconciliationProcessor - 核对处理器
// ==========================================
pub struct ReconciliationProcessor<S: TextExtractionService> {
    task_repo: Arc<ComplianceTaskRepository>,
    extraction: Arc<S>,
    config: ReconcileConfig,
}

impl<S: TextExtractionService> ReconciliationProcessor<S> {
    pub fn new(
        task_repo: Arc<ComplianceTaskRepository>,
        extraction: Arc<S>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            task_repo,
            extraction,
            config,
        }
    }

    /// 对一家公司核对一批通知
    ///
    /// # 流程(逐文档)
    /// 1. 关键词预过滤,无截止日相关词汇直接拦截
    /// 2. 带超时的抽取调用,失败计数后继续下一文档
    /// 3. 候选校验,不过即丢弃
    /// 4. 表单名子串(+ 可选周期)匹配开放任务
    /// 5. 条件 UPDATE 应用延期,零影响即记录跳过明细
    pub async fn reconcile(
        &self,
        company_id: i64,
        notifications: &[RegulatoryNotification],
    ) -> EngineResult<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome::default();

        for notification in notifications {
            outcome.documents_seen += 1;

            if !notification.mentions_due_date_change() {
                outcome.documents_filtered += 1;
                continue;
            }

            let text = format!("{}\n{}", notification.title, notification.content);
            let call = self.extraction.extract_due_date_change(&text);
            let raw = match tokio::time::timeout(self.config.extraction_timeout, call).await {
                Ok(Ok(Some(raw))) => raw,
                Ok(Ok(None)) => continue, // 文本不含明确截止日信息
                Ok(Err(e)) => {
                    warn!(source = %notification.source, error = %e, "截止日抽取失败,跳过文档");
                    outcome.extraction_failures += 1;
                    outcome
                        .skip_details
                        .push(format!("document '{}': extraction failed: {}", notification.title, e));
                    continue;
                }
                Err(_) => {
                    warn!(source = %notification.source, "截止日抽取超时,跳过文档");
                    outcome.extraction_failures += 1;
                    outcome
                        .skip_details
                        .push(format!("document '{}': extraction timed out", notification.title));
                    continue;
                }
            };

            outcome.candidates_extracted += 1;
            let change = match self.validate_candidate(raw) {
                Ok(change) => change,
                Err(reason) => {
                    debug!(reason = %reason, "候选校验不通过,丢弃");
                    outcome.candidates_discarded += 1;
                    outcome
                        .skip_details
                        .push(format!("document '{}': {}", notification.title, reason));
                    continue;
                }
            };

            let matched = self.task_repo.list_open_by_form(
                company_id,
                &change.form_name,
                change.period.as_deref(),
            )?;
            if matched.is_empty() {
                outcome.candidates_discarded += 1;
                outcome.skip_details.push(format!(
                    "form '{}' period {:?}: no open task matches",
                    change.form_name, change.period
                ));
                continue;
            }

            for task in &matched {
                let applied = self.task_repo.apply_extension(
                    &task.task_id,
                    change.new_due_date,
                    DueDateSource::AutoExtracted,
                    &change.reason,
                )?;
                if applied {
                    info!(
                        task_id = %task.task_id,
                        form = %change.form_name,
                        new_due_date = %change.new_due_date,
                        "应用截止日延期"
                    );
                    outcome.tasks_updated += 1;
                } else {
                    outcome.skip_details.push(format!(
                        "task {}: candidate date {} not later than current effective due date",
                        task.task_id, change.new_due_date
                    ));
                }
            }
        }

        Ok(outcome)
    }

    /// 候选校验: 必填字段 + 日期可解析 + 置信度阈值
    fn validate_candidate(
        &self,
        raw: RawDueDateExtraction,
    ) -> Result<ExtractedDueDateChange, String> {
        if raw.form_name.trim().is_empty() {
            return Err("candidate missing form name".to_string());
        }

        let new_due_date = NaiveDate::parse_from_str(&raw.new_due_date, "%Y-%m-%d")
            .map_err(|_| format!("unparseable due date '{}'", raw.new_due_date))?;

        if !(0.0..=1.0).contains(&raw.confidence) {
            return Err(format!("confidence {} out of range", raw.confidence));
        }
        if raw.confidence < self.config.min_confidence {
            return Err(format!(
                "confidence {:.2} below threshold {:.2}",
                raw.confidence, self.config.min_confidence
            ));
        }

        Ok(ExtractedDueDateChange {
            form_name: raw.form_name,
            category: ComplianceCategory::parse(&raw.category),
            new_due_date,
            period: raw.period,
            is_extension: raw.is_extension,
            reason: raw.reason,
            confidence: raw.confidence,
        })
    }
}
