// ==========================================
// 合规规则引擎 - 指标与风险预测领域模型
// ==========================================
// 职责: 合规指标快照(追加序列)与风险预测(最新生效)定义
// ==========================================

use crate::domain::types::RiskLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ComplianceMetrics - 合规指标快照
// ==========================================
// 存储: 追加序列,不原地修改;score_change 相对上一快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceMetrics {
    pub metrics_id: String,         // UUID
    pub company_id: i64,

    // ===== 状态计数 =====
    pub total_tasks: i32,
    pub completed_tasks: i32,
    pub pending_tasks: i32,
    pub overdue_tasks: i32,         // 派生计数(计算时刻)
    pub missed_tasks: i32,

    // ===== 比率 =====
    pub completion_rate: f64,       // 0.0 - 1.0
    pub on_time_filing_rate: f64,   // 0.0 - 1.0

    // ===== 评分 =====
    pub compliance_score: i32,      // 0 - 100
    pub previous_score: Option<i32>,
    pub score_change: Option<i32>,

    pub computed_at: DateTime<Utc>,
}

// ==========================================
// TaskRiskEstimate - 单任务延迟风险估计
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRiskEstimate {
    pub task_id: String,
    pub task_name: String,
    pub due_date: chrono::NaiveDate,
    pub delay_probability: f64,     // 0.0 - 1.0
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub confidence: f64,            // 0.0 = 委托失败后的中性默认
}

// ==========================================
// RiskPrediction - 公司风险预测
// ==========================================
// 存储: 每次运行追加,按 analyzed_at 取最新;历史保留为指标序列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub prediction_id: String,      // UUID
    pub company_id: i64,
    pub overall_risk_level: RiskLevel,
    pub average_delay_probability: f64,
    pub predictions: Vec<TaskRiskEstimate>,
    pub high_risk_task_ids: Vec<String>, // delay_probability > 0.6 的任务
    pub analyzed_at: DateTime<Utc>,
}

impl RiskPrediction {
    /// 高风险任务子集(供调用方直接消费)
    pub fn high_risk_tasks(&self) -> Vec<&TaskRiskEstimate> {
        self.predictions
            .iter()
            .filter(|p| p.delay_probability > 0.6)
            .collect()
    }
}
