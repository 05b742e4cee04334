// ==========================================
// 合规规则引擎 - 合规评分计算器
// ==========================================
// 职责: 任务集 -> 0..=100 合规评分 + 指标快照
// 红线: 纯函数,"当前时间"由调用方传入,同输入必同输出;
//       逾期由有效截止日派生,不读任何存储状态
// ==========================================

use crate::domain::metrics::ComplianceMetrics;
use crate::domain::task::ComplianceTask;
use crate::domain::types::TaskStatus;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

// ==========================================
// ScoreCalculator - 评分计算器
// ==========================================
pub struct ScoreCalculator;

impl ScoreCalculator {
    /// 逾期扣分权重
    const OVERDUE_PENALTY: f64 = 20.0;
    /// 误期扣分权重(高于逾期: 错过申报比迟交更严重)
    const MISSED_PENALTY: f64 = 30.0;

    /// 计算合规评分
    ///
    /// # 公式
    /// - 无可评任务 => 100
    /// - raw = completion_rate * 100
    ///         - 20 * overdue_ratio - 30 * missed_ratio
    /// - 结果压到 [0, 100]
    ///
    /// # 说明
    /// - not_applicable 任务不参与分母
    /// - completed/filed 计入完成
    pub fn score(tasks: &[ComplianceTask], today: NaiveDate) -> i32 {
        let considered: Vec<&ComplianceTask> = tasks
            .iter()
            .filter(|t| t.status != TaskStatus::NotApplicable)
            .collect();
        if considered.is_empty() {
            return 100;
        }

        let total = considered.len() as f64;
        let completed = considered
            .iter()
            .filter(|t| matches!(t.status, TaskStatus::Completed | TaskStatus::Filed))
            .count() as f64;
        let overdue = considered.iter().filter(|t| t.is_overdue(today)).count() as f64;
        let missed = considered
            .iter()
            .filter(|t| t.status == TaskStatus::Missed)
            .count() as f64;

        let raw = (completed / total) * 100.0
            - Self::OVERDUE_PENALTY * (overdue / total)
            - Self::MISSED_PENALTY * (missed / total);
        raw.round().clamp(0.0, 100.0) as i32
    }

    /// 构建指标快照(评分 + 状态计数 + 比率)
    ///
    /// # 参数
    /// - previous_score: 上一快照的评分(用于 score_change)
    /// - today: 逾期派生基准日
    /// - computed_at: 快照时间戳
    pub fn build_metrics(
        company_id: i64,
        tasks: &[ComplianceTask],
        previous_score: Option<i32>,
        today: NaiveDate,
        computed_at: DateTime<Utc>,
    ) -> ComplianceMetrics {
        let considered: Vec<&ComplianceTask> = tasks
            .iter()
            .filter(|t| t.status != TaskStatus::NotApplicable)
            .collect();

        let completed = considered
            .iter()
            .filter(|t| matches!(t.status, TaskStatus::Completed | TaskStatus::Filed))
            .count();
        let pending = considered
            .iter()
            .filter(|t| matches!(t.status, TaskStatus::Pending | TaskStatus::InProgress))
            .count();
        let overdue = considered.iter().filter(|t| t.is_overdue(today)).count();
        let missed = considered
            .iter()
            .filter(|t| t.status == TaskStatus::Missed)
            .count();

        let completion_rate = if considered.is_empty() {
            1.0
        } else {
            completed as f64 / considered.len() as f64
        };

        // 按时申报率: 只统计已有实际申报日期的任务
        let filings: Vec<bool> = considered.iter().filter_map(|t| t.filed_on_time()).collect();
        let on_time_filing_rate = if filings.is_empty() {
            1.0
        } else {
            filings.iter().filter(|&&on_time| on_time).count() as f64 / filings.len() as f64
        };

        let compliance_score = Self::score(tasks, today);

        ComplianceMetrics {
            metrics_id: Uuid::new_v4().to_string(),
            company_id,
            total_tasks: tasks.len() as i32,
            completed_tasks: completed as i32,
            pending_tasks: pending as i32,
            overdue_tasks: overdue as i32,
            missed_tasks: missed as i32,
            completion_rate,
            on_time_filing_rate,
            compliance_score,
            previous_score,
            score_change: previous_score.map(|p| compliance_score - p),
            computed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ComplianceCategory, DueDateSource, TaskPriority};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn task(status: TaskStatus, due: NaiveDate, filed: Option<NaiveDate>) -> ComplianceTask {
        ComplianceTask {
            task_id: Uuid::new_v4().to_string(),
            company_id: 1,
            rule_code: "GST-3B".to_string(),
            task_name: "GSTR-3B".to_string(),
            category: ComplianceCategory::Gst,
            form_name: "GSTR-3B".to_string(),
            act_name: None,
            period: "October 2025".to_string(),
            period_start: d(2025, 10, 1),
            period_end: d(2025, 10, 31),
            due_date: due,
            extended_due_date: None,
            status,
            priority: TaskPriority::Medium,
            source_of_due_date: DueDateSource::System,
            due_date_update_reason: None,
            acknowledgment_number: None,
            filing_reference: None,
            filed_by: None,
            actual_filing_date: filed,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_task_set_scores_100() {
        assert_eq!(ScoreCalculator::score(&[], d(2025, 11, 1)), 100);
    }

    #[test]
    fn test_all_completed_scores_100() {
        let today = d(2025, 12, 1);
        let tasks = vec![
            task(TaskStatus::Filed, d(2025, 11, 20), Some(d(2025, 11, 18))),
            task(TaskStatus::Completed, d(2025, 11, 20), None),
        ];
        assert_eq!(ScoreCalculator::score(&tasks, today), 100);
    }

    #[test]
    fn test_score_formula_mixed_set() {
        let today = d(2025, 12, 1);
        let mut tasks = Vec::new();
        for _ in 0..7 {
            tasks.push(task(TaskStatus::Filed, d(2025, 11, 20), Some(d(2025, 11, 18))));
        }
        // 2 个待办,截止日在未来
        for _ in 0..2 {
            tasks.push(task(TaskStatus::Pending, d(2025, 12, 20), None));
        }
        // 1 个误期(截止日已过,同时计入逾期)
        tasks.push(task(TaskStatus::Missed, d(2025, 11, 10), None));

        // 70 - 20*0.1 - 30*0.1 = 65
        assert_eq!(ScoreCalculator::score(&tasks, today), 65);
    }

    #[test]
    fn test_score_clamps_to_zero() {
        let today = d(2025, 12, 1);
        let tasks = vec![
            task(TaskStatus::Missed, d(2025, 11, 10), None),
            task(TaskStatus::Missed, d(2025, 11, 10), None),
        ];
        // 0 - 20 - 30 => clamp 0
        assert_eq!(ScoreCalculator::score(&tasks, today), 0);
    }

    #[test]
    fn test_missed_scores_below_overdue_pending() {
        let today = d(2025, 12, 1);
        let overdue_only = vec![task(TaskStatus::Pending, d(2025, 11, 10), None)];
        let missed = vec![task(TaskStatus::Missed, d(2025, 11, 10), None)];

        assert!(
            ScoreCalculator::score(&missed, today) < ScoreCalculator::score(&overdue_only, today)
        );
    }

    #[test]
    fn test_not_applicable_excluded() {
        let today = d(2025, 12, 1);
        let tasks = vec![
            task(TaskStatus::Filed, d(2025, 11, 20), Some(d(2025, 11, 18))),
            task(TaskStatus::NotApplicable, d(2025, 11, 20), None),
        ];
        assert_eq!(ScoreCalculator::score(&tasks, today), 100);
    }

    #[test]
    fn test_score_is_stable() {
        let today = d(2025, 12, 1);
        let tasks = vec![
            task(TaskStatus::Filed, d(2025, 11, 20), Some(d(2025, 11, 25))),
            task(TaskStatus::Pending, d(2025, 11, 10), None),
        ];
        let first = ScoreCalculator::score(&tasks, today);
        assert_eq!(first, ScoreCalculator::score(&tasks, today));
    }

    #[test]
    fn test_build_metrics_counts_and_delta() {
        let today = d(2025, 12, 1);
        let tasks = vec![
            task(TaskStatus::Filed, d(2025, 11, 20), Some(d(2025, 11, 18))), // 按期
            task(TaskStatus::Filed, d(2025, 11, 20), Some(d(2025, 11, 28))), // 迟交
            task(TaskStatus::Pending, d(2025, 12, 20), None),
            task(TaskStatus::Missed, d(2025, 11, 10), None),
        ];

        let metrics = ScoreCalculator::build_metrics(1, &tasks, Some(80), today, Utc::now());
        assert_eq!(metrics.total_tasks, 4);
        assert_eq!(metrics.completed_tasks, 2);
        assert_eq!(metrics.pending_tasks, 1);
        assert_eq!(metrics.missed_tasks, 1);
        assert_eq!(metrics.overdue_tasks, 1); // 误期任务的截止日已过
        assert_eq!(metrics.completion_rate, 0.5);
        assert_eq!(metrics.on_time_filing_rate, 0.5);
        assert_eq!(metrics.score_change, Some(metrics.compliance_score - 80));
    }
}
