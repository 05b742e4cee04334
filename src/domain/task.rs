// ==========================================
// 合规规则引擎 - 合规任务领域模型
// ==========================================
// 职责: 任务实体与日历快照定义
// 红线: 有效截止日 = 延期截止日(若有) 否则原截止日;
//       核对管线只允许把有效截止日向后推,严禁前移
// ==========================================

use crate::domain::types::{
    ComplianceCategory, DueDateSource, TaskPriority, TaskStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ComplianceTask - 合规任务
// ==========================================
// 身份: (company_id, rule_code, period) 唯一;
//       日历生成对已覆盖周期幂等跳过
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceTask {
    pub task_id: String,            // UUID
    pub company_id: i64,
    pub rule_code: String,

    // ===== 任务内容 =====
    pub task_name: String,          // 如 "GSTR-3B - October 2025"
    pub category: ComplianceCategory,
    pub form_name: String,
    pub act_name: Option<String>,

    // ===== 周期与截止日 =====
    pub period: String,             // 周期标签,如 "October 2025" / "Q2 FY2025-26"
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub extended_due_date: Option<NaiveDate>, // 存在时优先于 due_date

    // ===== 状态与优先级 =====
    pub status: TaskStatus,
    pub priority: TaskPriority,

    // ===== 截止日管理 =====
    pub source_of_due_date: DueDateSource,
    pub due_date_update_reason: Option<String>,

    // ===== 申报信息 =====
    pub acknowledgment_number: Option<String>,
    pub filing_reference: Option<String>,
    pub filed_by: Option<String>,
    pub actual_filing_date: Option<NaiveDate>,

    // ===== 元数据 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ComplianceTask {
    /// 有效截止日: 延期截止日存在时为权威值
    pub fn effective_due_date(&self) -> NaiveDate {
        self.extended_due_date.unwrap_or(self.due_date)
    }

    /// 逾期判定(派生属性,不入库)
    ///
    /// # 规则
    /// - 已完成/已申报不算逾期
    /// - 当前日期晚于有效截止日即逾期
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        if matches!(self.status, TaskStatus::Completed | TaskStatus::Filed) {
            return false;
        }
        today > self.effective_due_date()
    }

    /// 距有效截止日剩余天数(已过期为负)
    pub fn days_until_due(&self, today: NaiveDate) -> i64 {
        (self.effective_due_date() - today).num_days()
    }

    /// 按期申报判定(用于按时申报率)
    pub fn filed_on_time(&self) -> Option<bool> {
        self.actual_filing_date
            .map(|filed| filed <= self.effective_due_date())
    }
}

// ==========================================
// ComplianceCalendar - 合规日历快照
// ==========================================
// 说明: 公司 + 财年到任务集的聚合视图,可随时由任务集重建,
//       不是独立事实源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceCalendar {
    pub calendar_id: String,        // UUID
    pub company_id: i64,
    pub fiscal_year: String,        // 如 "FY2025-26"
    pub calendar_name: String,
    pub task_count: i32,
    pub is_auto_generated: bool,
    pub generated_at: DateTime<Utc>,
}
