// ==========================================
// 合规规则引擎 - 延迟风险预测器
// ==========================================
// 职责: 历史申报窗口 + 待办任务 -> 公司风险预测
// 红线:
// - 历史窗口有界(最近 10 条),防止委托载荷无界增长
// - 单任务委托失败退回中性默认 (0.5 / medium / confidence 0),不中断
// - 聚合边界为闭区间: >=0.7 critical, >=0.5 high, >=0.3 medium
// ==========================================

use crate::domain::company::CompanyProfile;
use crate::domain::metrics::{RiskPrediction, TaskRiskEstimate};
use crate::domain::task::ComplianceTask;
use crate::domain::types::RiskLevel;
use crate::provider::extraction::{
    FilingHistoryEntry, TextExtractionService, UpcomingTaskSummary,
};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// 历史申报窗口大小
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

// ==========================================
// RiskForecaster - 风险预测器
// ==========================================
pub struct RiskForecaster<S: TextExtractionService> {
    extraction: Arc<S>,
    delegate_timeout: Duration,
    history_window: usize,
}

impl<S: TextExtractionService> RiskForecaster<S> {
    pub fn new(extraction: Arc<S>) -> Self {
        Self {
            extraction,
            delegate_timeout: Duration::from_secs(30),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.delegate_timeout = timeout;
        self
    }

    /// 为公司生成风险预测
    ///
    /// # 参数
    /// - historical: 历史任务(调用方按截止日倒序给出,此处截窗口)
    /// - upcoming: 待办任务(逐个委托延迟概率估计)
    /// - today: 逾期派生基准日
    pub async fn forecast(
        &self,
        company: &CompanyProfile,
        historical: &[ComplianceTask],
        upcoming: &[ComplianceTask],
        today: NaiveDate,
    ) -> RiskPrediction {
        let history: Vec<FilingHistoryEntry> = historical
            .iter()
            .take(self.history_window)
            .map(|t| Self::history_entry(t, today))
            .collect();

        let mut predictions = Vec::with_capacity(upcoming.len());
        for task in upcoming {
            predictions.push(self.estimate_task(&history, task).await);
        }

        let average_delay_probability = if predictions.is_empty() {
            0.0
        } else {
            predictions.iter().map(|p| p.delay_probability).sum::<f64>()
                / predictions.len() as f64
        };

        let high_risk_task_ids: Vec<String> = predictions
            .iter()
            .filter(|p| p.delay_probability > 0.6)
            .map(|p| p.task_id.clone())
            .collect();

        RiskPrediction {
            prediction_id: Uuid::new_v4().to_string(),
            company_id: company.company_id,
            overall_risk_level: RiskLevel::from_delay_probability(average_delay_probability),
            average_delay_probability,
            predictions,
            high_risk_task_ids,
            analyzed_at: Utc::now(),
        }
    }

    /// 单任务委托估计(带超时,失败退中性默认)
    async fn estimate_task(
        &self,
        history: &[FilingHistoryEntry],
        task: &ComplianceTask,
    ) -> TaskRiskEstimate {
        let summary = UpcomingTaskSummary {
            task_name: task.task_name.clone(),
            due_date: task.effective_due_date(),
            category: task.category,
            priority: task.priority.to_string(),
        };

        let call = self.extraction.predict_delay_risk(history, &summary);
        match tokio::time::timeout(self.delegate_timeout, call).await {
            Ok(Ok(signal)) if (0.0..=1.0).contains(&signal.delay_probability) => TaskRiskEstimate {
                task_id: task.task_id.clone(),
                task_name: task.task_name.clone(),
                due_date: task.effective_due_date(),
                delay_probability: signal.delay_probability,
                risk_level: signal.risk_level,
                risk_factors: signal.risk_factors,
                recommendations: signal.recommendations,
                confidence: signal.confidence,
            },
            Ok(Ok(signal)) => {
                warn!(
                    task_id = %task.task_id,
                    probability = signal.delay_probability,
                    "延迟概率越界,退回中性默认"
                );
                Self::neutral_estimate(task)
            }
            Ok(Err(e)) => {
                warn!(task_id = %task.task_id, error = %e, "延迟风险委托失败,退回中性默认");
                Self::neutral_estimate(task)
            }
            Err(_) => {
                warn!(task_id = %task.task_id, "延迟风险委托超时,退回中性默认");
                Self::neutral_estimate(task)
            }
        }
    }

    /// 中性默认估计
    fn neutral_estimate(task: &ComplianceTask) -> TaskRiskEstimate {
        TaskRiskEstimate {
            task_id: task.task_id.clone(),
            task_name: task.task_name.clone(),
            due_date: task.effective_due_date(),
            delay_probability: 0.5,
            risk_level: RiskLevel::Medium,
            risk_factors: vec!["delay risk analysis unavailable".to_string()],
            recommendations: Vec::new(),
            confidence: 0.0,
        }
    }

    /// 历史任务 -> 委托载荷条目
    fn history_entry(task: &ComplianceTask, today: NaiveDate) -> FilingHistoryEntry {
        let was_overdue = task.filed_on_time() == Some(false) || task.is_overdue(today);
        FilingHistoryEntry {
            task_name: task.task_name.clone(),
            due_date: task.effective_due_date(),
            status: task.status.to_string(),
            was_overdue,
            days_late: task
                .actual_filing_date
                .map(|filed| (filed - task.effective_due_date()).num_days()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::ComplianceRule;
    use crate::domain::types::{
        ComplianceCategory, DueDateSource, TaskPriority, TaskStatus,
    };
    use crate::provider::extraction::{
        ApplicabilitySignal, DelayRiskSignal, RawDueDateExtraction,
    };
    use async_trait::async_trait;
    use std::error::Error;
    use std::sync::Mutex;

    /// Mock: 按任务名查概率表,记录收到的历史窗口长度
    struct TableExtraction {
        table: Vec<(&'static str, f64)>,
        seen_history_len: Mutex<Option<usize>>,
    }

    #[async_trait]
    impl TextExtractionService for TableExtraction {
        async fn extract_due_date_change(
            &self,
            _text: &str,
        ) -> Result<Option<RawDueDateExtraction>, Box<dyn Error + Send + Sync>> {
            Ok(None)
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
            history: &[FilingHistoryEntry],
            upcoming: &UpcomingTaskSummary,
        ) -> Result<DelayRiskSignal, Box<dyn Error + Send + Sync>> {
            *self.seen_history_len.lock().unwrap() = Some(history.len());
            let probability = self
                .table
                .iter()
                .find(|(name, _)| upcoming.task_name.contains(name))
                .map(|(_, p)| *p)
                .ok_or("unknown task")?;
            Ok(DelayRiskSignal {
                delay_probability: probability,
                risk_level: RiskLevel::from_delay_probability(probability),
                risk_factors: vec![],
                recommendations: vec![],
                confidence: 0.8,
            })
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn company() -> CompanyProfile {
        CompanyProfile {
            company_id: 1,
            company_name: "Acme Pvt Ltd".to_string(),
            company_type: None,
            state: None,
            turnover: None,
            gstin: None,
            cin: None,
            status: "Active".to_string(),
            compliance_score: 100,
            risk_level: RiskLevel::Low,
            last_synced_at: None,
        }
    }

    fn task(name: &str, status: TaskStatus, due: NaiveDate) -> ComplianceTask {
        ComplianceTask {
            task_id: Uuid::new_v4().to_string(),
            company_id: 1,
            rule_code: "GST-3B".to_string(),
            task_name: name.to_string(),
            category: ComplianceCategory::Gst,
            form_name: "GSTR-3B".to_string(),
            act_name: None,
            period: "October 2025".to_string(),
            period_start: d(2025, 10, 1),
            period_end: d(2025, 10, 31),
            due_date: due,
            extended_due_date: None,
            status,
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

    fn forecaster(table: Vec<(&'static str, f64)>) -> RiskForecaster<TableExtraction> {
        RiskForecaster::new(Arc::new(TableExtraction {
            table,
            seen_history_len: Mutex::new(None),
        }))
    }

    #[tokio::test]
    async fn test_aggregate_boundary_inclusive_at_070() {
        let today = d(2025, 11, 1);
        let upcoming = vec![
            task("A", TaskStatus::Pending, d(2025, 11, 20)),
            task("B", TaskStatus::Pending, d(2025, 12, 20)),
        ];

        // 平均恰好 0.7 => Critical
        let f = forecaster(vec![("A", 0.7), ("B", 0.7)]);
        let prediction = f.forecast(&company(), &[], &upcoming, today).await;
        assert_eq!(prediction.average_delay_probability, 0.7);
        assert_eq!(prediction.overall_risk_level, RiskLevel::Critical);

        // 平均低于 0.7 => High
        let f = forecaster(vec![("A", 0.5), ("B", 0.8)]);
        let prediction = f.forecast(&company(), &[], &upcoming, today).await;
        assert!(prediction.average_delay_probability < 0.7);
        assert_eq!(prediction.overall_risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_high_risk_list_excludes_exactly_060() {
        let today = d(2025, 11, 1);
        let upcoming = vec![
            task("A", TaskStatus::Pending, d(2025, 11, 20)),
            task("B", TaskStatus::Pending, d(2025, 12, 20)),
        ];
        let f = forecaster(vec![("A", 0.61), ("B", 0.6)]);

        let prediction = f.forecast(&company(), &[], &upcoming, today).await;
        // 严格大于 0.6 才入高风险列表
        assert_eq!(prediction.high_risk_task_ids.len(), 1);
        assert_eq!(prediction.high_risk_tasks().len(), 1);
        assert_eq!(prediction.high_risk_tasks()[0].delay_probability, 0.61);
    }

    #[tokio::test]
    async fn test_delegate_failure_yields_neutral_default() {
        let today = d(2025, 11, 1);
        // "C" 不在概率表中 => 委托返回错误
        let upcoming = vec![task("C", TaskStatus::Pending, d(2025, 11, 20))];
        let f = forecaster(vec![]);

        let prediction = f.forecast(&company(), &[], &upcoming, today).await;
        assert_eq!(prediction.predictions.len(), 1);
        assert_eq!(prediction.predictions[0].delay_probability, 0.5);
        assert_eq!(prediction.predictions[0].risk_level, RiskLevel::Medium);
        assert_eq!(prediction.predictions[0].confidence, 0.0);
        assert_eq!(prediction.overall_risk_level, RiskLevel::High); // 0.5 => high (闭区间)
    }

    #[tokio::test]
    async fn test_history_window_is_bounded() {
        let today = d(2025, 11, 1);
        let historical: Vec<ComplianceTask> = (0..25)
            .map(|i| task(&format!("H{}", i), TaskStatus::Filed, d(2025, 1, 10)))
            .collect();
        let upcoming = vec![task("A", TaskStatus::Pending, d(2025, 11, 20))];

        let extraction = Arc::new(TableExtraction {
            table: vec![("A", 0.2)],
            seen_history_len: Mutex::new(None),
        });
        let f = RiskForecaster::new(extraction.clone());
        f.forecast(&company(), &historical, &upcoming, today).await;

        assert_eq!(*extraction.seen_history_len.lock().unwrap(), Some(10));
    }

    #[tokio::test]
    async fn test_empty_upcoming_is_low_risk() {
        let f = forecaster(vec![]);
        let prediction = f.forecast(&company(), &[], &[], d(2025, 11, 1)).await;
        assert_eq!(prediction.average_delay_probability, 0.0);
        assert_eq!(prediction.overall_risk_level, RiskLevel::Low);
        assert!(prediction.high_risk_task_ids.is_empty());
    }
}
