// ==========================================
// 合规规则引擎 - 通知与抽取结果领域模型
// ==========================================
// 职责: 原始政府通知与截止日变更候选的定义
// 红线: 抽取候选是瞬态对象,要么成功应用于任务,要么丢弃,
//       从不单独持久化
// ==========================================

use crate::domain::types::ComplianceCategory;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// RegulatoryNotification - 原始政府通知
// ==========================================
// 来源: NotificationFeed 采集;内容为非受信自由文本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatoryNotification {
    pub title: String,
    pub content: String,
    pub published_on: Option<NaiveDate>,
    pub source: String, // 如 "cbic.gov.in"
}

impl RegulatoryNotification {
    /// 截止日相关词汇预过滤(避免不必要的抽取调用)
    pub fn mentions_due_date_change(&self) -> bool {
        const KEYWORDS: [&str; 5] = [
            "due date",
            "extension",
            "extended",
            "deadline",
            "filing date",
        ];
        let content = self.content.to_lowercase();
        KEYWORDS.iter().any(|kw| content.contains(kw))
    }
}

// ==========================================
// ExtractedDueDateChange - 截止日变更候选
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDueDateChange {
    pub form_name: String,
    pub category: ComplianceCategory,
    pub new_due_date: NaiveDate,
    pub period: Option<String>,     // 如 "October 2025";缺失时按表单名匹配全部开放周期
    pub is_extension: bool,
    pub reason: String,
    pub confidence: f64,            // 0.0 - 1.0
}

// ==========================================
// ReconcileOutcome - 核对结果
// ==========================================
// 用途: 批处理调用方可见的计数与跳过明细,不抛裸错误
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub documents_seen: usize,       // 收到的通知数
    pub documents_filtered: usize,   // 预过滤拦截数
    pub candidates_extracted: usize, // 抽取出的候选数
    pub candidates_discarded: usize, // 校验不通过/无匹配而丢弃的候选数
    pub tasks_updated: usize,        // 实际更新的任务数
    pub extraction_failures: usize,  // 抽取调用失败数(隔离,不中断批)
    pub skip_details: Vec<String>,   // 跳过原因明细(含任务/表单标识)
}

// ==========================================
// CycleReport - 调度周期报告
// ==========================================

/// 调度周期终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleState {
    Idle,
    Running,
    Completed,
    CompletedWithErrors,
}

impl CycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleState::Idle => "IDLE",
            CycleState::Running => "RUNNING",
            CycleState::Completed => "COMPLETED",
            CycleState::CompletedWithErrors => "COMPLETED_WITH_ERRORS",
        }
    }
}

/// 单次调度周期的汇总报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: String,                 // UUID
    pub job_type: String,
    pub state: CycleState,
    pub companies_processed: usize,
    pub companies_failed: usize,
    pub failures: Vec<CompanyFailure>,    // 按公司隔离的失败明细
    pub cancelled: bool,                  // 是否在公司单元间被取消
    pub started_at: chrono::DateTime<Utc>,
    pub finished_at: chrono::DateTime<Utc>,
}

/// 单个公司工作单元的失败记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyFailure {
    pub company_id: i64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(content: &str) -> RegulatoryNotification {
        RegulatoryNotification {
            title: "Notification 12/2025".to_string(),
            content: content.to_string(),
            published_on: None,
            source: "cbic.gov.in".to_string(),
        }
    }

    #[test]
    fn test_keyword_prefilter_hits() {
        assert!(notification("The due date for GSTR-3B stands extended").mentions_due_date_change());
        assert!(notification("DEADLINE revised for Form 24Q").mentions_due_date_change());
        assert!(notification("filing date notified").mentions_due_date_change());
    }

    #[test]
    fn test_keyword_prefilter_misses() {
        assert!(!notification("Clarification on input tax credit eligibility").mentions_due_date_change());
        assert!(!notification("").mentions_due_date_change());
    }
}
