// ==========================================
// 合规规则引擎 - 领域类型定义
// ==========================================
// 职责: 合规类别/频率/状态/优先级/风险等级等枚举
// 序列化格式: snake_case (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 合规类别 (Compliance Category)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceCategory {
    Gst,
    IncomeTax,
    Tds,
    Mca,
    Pf,
    Esi,
    Pt,
    Labour,
    Environmental,
    Other,
}

impl ComplianceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceCategory::Gst => "gst",
            ComplianceCategory::IncomeTax => "income_tax",
            ComplianceCategory::Tds => "tds",
            ComplianceCategory::Mca => "mca",
            ComplianceCategory::Pf => "pf",
            ComplianceCategory::Esi => "esi",
            ComplianceCategory::Pt => "pt",
            ComplianceCategory::Labour => "labour",
            ComplianceCategory::Environmental => "environmental",
            ComplianceCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "gst" => ComplianceCategory::Gst,
            "income_tax" => ComplianceCategory::IncomeTax,
            "tds" => ComplianceCategory::Tds,
            "mca" => ComplianceCategory::Mca,
            "pf" => ComplianceCategory::Pf,
            "esi" => ComplianceCategory::Esi,
            "pt" => ComplianceCategory::Pt,
            "labour" => ComplianceCategory::Labour,
            "environmental" => ComplianceCategory::Environmental,
            _ => ComplianceCategory::Other,
        }
    }
}

impl fmt::Display for ComplianceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 申报频率 (Compliance Frequency)
// ==========================================
// 红线: 未支持的频率在展开时必须显式报错,不得静默跳过
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    HalfYearly,
    Annual,
    OneTime,
    EventBased,
}

impl ComplianceFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceFrequency::Daily => "daily",
            ComplianceFrequency::Weekly => "weekly",
            ComplianceFrequency::Monthly => "monthly",
            ComplianceFrequency::Quarterly => "quarterly",
            ComplianceFrequency::HalfYearly => "half_yearly",
            ComplianceFrequency::Annual => "annual",
            ComplianceFrequency::OneTime => "one_time",
            ComplianceFrequency::EventBased => "event_based",
        }
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(ComplianceFrequency::Daily),
            "weekly" => Some(ComplianceFrequency::Weekly),
            "monthly" => Some(ComplianceFrequency::Monthly),
            "quarterly" => Some(ComplianceFrequency::Quarterly),
            "half_yearly" => Some(ComplianceFrequency::HalfYearly),
            "annual" => Some(ComplianceFrequency::Annual),
            "one_time" => Some(ComplianceFrequency::OneTime),
            "event_based" => Some(ComplianceFrequency::EventBased),
            _ => None,
        }
    }
}

impl fmt::Display for ComplianceFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 任务状态 (Task Status)
// ==========================================
// 红线: "逾期"是派生属性(有效截止日 vs 当前时间),不入库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Filed,
    Missed,
    NotApplicable,
}

impl TaskStatus {
    /// 终态判定: 终态任务不接受核对管线的截止日改写
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed
                | TaskStatus::Filed
                | TaskStatus::Missed
                | TaskStatus::NotApplicable
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Filed => "filed",
            TaskStatus::Missed => "missed",
            TaskStatus::NotApplicable => "not_applicable",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => TaskStatus::Pending,
            "in_progress" => TaskStatus::InProgress,
            "completed" => TaskStatus::Completed,
            "filed" => TaskStatus::Filed,
            "missed" => TaskStatus::Missed,
            "not_applicable" => TaskStatus::NotApplicable,
            _ => TaskStatus::Pending, // 默认值
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 任务优先级 (Task Priority)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "low" => TaskPriority::Low,
            "high" => TaskPriority::High,
            "critical" => TaskPriority::Critical,
            _ => TaskPriority::Medium, // 默认值
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 风险等级 (Risk Level)
// ==========================================
// 等级制: Low < Medium < High < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// 由平均延迟概率推导聚合风险等级
    ///
    /// # 边界(闭区间)
    /// - >= 0.7 => Critical
    /// - >= 0.5 => High
    /// - >= 0.3 => Medium
    /// - 其余   => Low
    pub fn from_delay_probability(prob: f64) -> Self {
        if prob >= 0.7 {
            RiskLevel::Critical
        } else if prob >= 0.5 {
            RiskLevel::High
        } else if prob >= 0.3 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "low" => RiskLevel::Low,
            "high" => RiskLevel::High,
            "critical" => RiskLevel::Critical,
            _ => RiskLevel::Medium, // 默认值
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 截止日来源 (Due Date Source)
// ==========================================
// 用途: 标记任务截止日由谁产生,核对管线写入 AutoExtracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueDateSource {
    System,
    AutoExtracted,
    Manual,
}

impl DueDateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DueDateSource::System => "system",
            DueDateSource::AutoExtracted => "auto_extracted",
            DueDateSource::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "auto_extracted" => DueDateSource::AutoExtracted,
            "manual" => DueDateSource::Manual,
            _ => DueDateSource::System, // 默认值
        }
    }
}

impl fmt::Display for DueDateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_boundaries() {
        // 边界为闭区间: 恰好 0.7 => Critical
        assert_eq!(RiskLevel::from_delay_probability(0.7), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_delay_probability(0.69999), RiskLevel::High);
        assert_eq!(RiskLevel::from_delay_probability(0.5), RiskLevel::High);
        assert_eq!(RiskLevel::from_delay_probability(0.49999), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_delay_probability(0.3), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_delay_probability(0.29999), RiskLevel::Low);
        assert_eq!(RiskLevel::from_delay_probability(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_delay_probability(1.0), RiskLevel::Critical);
    }

    #[test]
    fn test_task_status_terminal() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Filed.is_terminal());
        assert!(TaskStatus::Missed.is_terminal());
        assert!(TaskStatus::NotApplicable.is_terminal());
    }

    #[test]
    fn test_frequency_round_trip() {
        for freq in [
            ComplianceFrequency::Daily,
            ComplianceFrequency::Weekly,
            ComplianceFrequency::Monthly,
            ComplianceFrequency::Quarterly,
            ComplianceFrequency::HalfYearly,
            ComplianceFrequency::Annual,
            ComplianceFrequency::OneTime,
            ComplianceFrequency::EventBased,
        ] {
            assert_eq!(ComplianceFrequency::try_parse(freq.as_str()), Some(freq));
        }
        assert_eq!(ComplianceFrequency::try_parse("biweekly"), None);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }
}
