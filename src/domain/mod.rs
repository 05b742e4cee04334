// ==========================================
// 合规规则引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod company;
pub mod metrics;
pub mod notification;
pub mod rule;
pub mod task;
pub mod types;

// 重导出核心类型
pub use company::CompanyProfile;
pub use metrics::{ComplianceMetrics, RiskPrediction, TaskRiskEstimate};
pub use notification::{
    CompanyFailure, CycleReport, CycleState, ExtractedDueDateChange, ReconcileOutcome,
    RegulatoryNotification,
};
pub use rule::{ApplicabilityCriteria, ComplianceRule};
pub use task::{ComplianceCalendar, ComplianceTask};
pub use types::{
    ComplianceCategory, ComplianceFrequency, DueDateSource, RiskLevel, TaskPriority, TaskStatus,
};
