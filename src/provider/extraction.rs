// ==========================================
// 合规规则引擎 - 文本抽取服务接口
// ==========================================
// 职责: 定义引擎依赖的三个文本解析契约(不包含后端模型实现)
// 红线: 三个契约均为无状态请求/响应,至少一次安全;
//       调用点必须在失败/畸形响应时退回文档化安全默认值
// ==========================================

use crate::domain::company::CompanyProfile;
use crate::domain::rule::ComplianceRule;
use crate::domain::types::{ComplianceCategory, RiskLevel};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;

// ==========================================
// 抽取结果载荷
// ==========================================

/// 截止日变更抽取的原始结果
///
/// 说明: 字段保持未校验的原始形态(日期为字符串),
///       必填性/日期可解析性/置信度阈值由核对管线统一校验
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDueDateExtraction {
    pub form_name: String,
    pub category: String,          // gst|income_tax|tds|mca|pf|esi|pt|...
    pub new_due_date: String,      // 期望 "YYYY-MM-DD"
    pub period: Option<String>,    // 如 "October 2025"
    pub is_extension: bool,
    pub reason: String,
    pub confidence: f64,
}

/// 适用性分析结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicabilitySignal {
    pub applicable: bool,
    pub confidence: f64,
    pub reasoning: String,
    pub risk_level: RiskLevel,
}

/// 延迟风险估计结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayRiskSignal {
    pub delay_probability: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub confidence: f64,
}

/// 风险预测的历史申报条目(有界窗口输入)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingHistoryEntry {
    pub task_name: String,
    pub due_date: NaiveDate,
    pub status: String,
    pub was_overdue: bool,
    pub days_late: Option<i64>,    // actual_filing_date - effective_due_date
}

/// 风险预测的待办任务摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingTaskSummary {
    pub task_name: String,
    pub due_date: NaiveDate,
    pub category: ComplianceCategory,
    pub priority: String,
}

// ==========================================
// TextExtractionService Trait
// ==========================================
// 实现者: 外部模型后端,或测试用确定性规则桩 (RuleBasedExtractionService)
#[async_trait]
pub trait TextExtractionService: Send + Sync {
    /// 从政府通知文本抽取截止日变更候选
    ///
    /// # 返回
    /// - Ok(Some(raw)): 抽取到候选(未校验)
    /// - Ok(None): 文本不含明确的截止日信息
    /// - Err: 调用失败(调用方跳过该文档,不中断批)
    async fn extract_due_date_change(
        &self,
        notification_text: &str,
    ) -> Result<Option<RawDueDateExtraction>, Box<dyn Error + Send + Sync>>;

    /// 判断规则是否适用于公司(硬判据不完整时的委托路径)
    ///
    /// # 失败语义
    /// - 调用方必须失败关闭: applicable=false, 低置信度
    async fn evaluate_applicability(
        &self,
        company: &CompanyProfile,
        rule: &ComplianceRule,
    ) -> Result<ApplicabilitySignal, Box<dyn Error + Send + Sync>>;

    /// 基于历史窗口预测申报延迟风险
    ///
    /// # 失败语义
    /// - 调用方必须退回中性默认 (probability=0.5, medium, confidence=0)
    async fn predict_delay_risk(
        &self,
        history: &[FilingHistoryEntry],
        upcoming: &UpcomingTaskSummary,
    ) -> Result<DelayRiskSignal, Box<dyn Error + Send + Sync>>;
}

// ==========================================
// RuleBasedExtractionService - 确定性规则桩
// ==========================================
// 用途: 开发/测试环境替代外部模型后端,保证引擎正确性
//       不依赖任何具体模型
pub struct RuleBasedExtractionService;

/// 已知表单名与类别对照表
const KNOWN_FORMS: [(&str, &str); 8] = [
    ("GSTR-3B", "gst"),
    ("GSTR-1", "gst"),
    ("GSTR-9", "gst"),
    ("Form 24Q", "tds"),
    ("Form 26Q", "tds"),
    ("AOC-4", "mca"),
    ("MGT-7", "mca"),
    ("ITR-6", "income_tax"),
];

impl RuleBasedExtractionService {
    /// 在文本中查找首个 "YYYY-MM-DD" 形态的日期标记
    fn scan_iso_date(text: &str) -> Option<String> {
        for token in text.split(|c: char| c.is_whitespace() || c == ',' || c == ';' || c == '(' || c == ')') {
            let token = token.trim_matches(|c: char| !c.is_ascii_digit());
            if token.len() == 10 && NaiveDate::parse_from_str(token, "%Y-%m-%d").is_ok() {
                return Some(token.to_string());
            }
        }
        None
    }

    /// 在文本中查找 "Month YYYY" 形态的周期标签
    fn scan_period(text: &str) -> Option<String> {
        const MONTHS: [&str; 12] = [
            "January", "February", "March", "April", "May", "June",
            "July", "August", "September", "October", "November", "December",
        ];
        let words: Vec<&str> = text.split_whitespace().collect();
        for pair in words.windows(2) {
            let month = pair[0].trim_matches(|c: char| !c.is_ascii_alphanumeric());
            let year = pair[1].trim_matches(|c: char| !c.is_ascii_alphanumeric());
            if MONTHS.contains(&month) && year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
                return Some(format!("{} {}", month, year));
            }
        }
        None
    }
}

#[async_trait]
impl TextExtractionService for RuleBasedExtractionService {
    async fn extract_due_date_change(
        &self,
        notification_text: &str,
    ) -> Result<Option<RawDueDateExtraction>, Box<dyn Error + Send + Sync>> {
        let form = KNOWN_FORMS
            .iter()
            .find(|(name, _)| notification_text.to_lowercase().contains(&name.to_lowercase()));
        let date = Self::scan_iso_date(notification_text);

        let (form_name, category) = match form {
            Some((name, cat)) => (name.to_string(), cat.to_string()),
            None => return Ok(None),
        };
        let new_due_date = match date {
            Some(d) => d,
            None => return Ok(None),
        };

        let lowered = notification_text.to_lowercase();
        Ok(Some(RawDueDateExtraction {
            form_name,
            category,
            new_due_date,
            period: Self::scan_period(notification_text),
            is_extension: lowered.contains("extend") || lowered.contains("extension"),
            reason: "Auto-extracted from notification text".to_string(),
            confidence: 0.95,
        }))
    }

    async fn evaluate_applicability(
        &self,
        _company: &CompanyProfile,
        rule: &ComplianceRule,
    ) -> Result<ApplicabilitySignal, Box<dyn Error + Send + Sync>> {
        // 规则桩不具备判断力,给出保守信号,由评估器失败关闭
        Ok(ApplicabilitySignal {
            applicable: false,
            confidence: 0.2,
            reasoning: format!(
                "rule {} declares no machine-checkable criteria; manual review required",
                rule.rule_code
            ),
            risk_level: RiskLevel::Medium,
        })
    }

    async fn predict_delay_risk(
        &self,
        history: &[FilingHistoryEntry],
        _upcoming: &UpcomingTaskSummary,
    ) -> Result<DelayRiskSignal, Box<dyn Error + Send + Sync>> {
        // 确定性启发式: 历史逾期率即延迟概率
        let probability = if history.is_empty() {
            0.5
        } else {
            history.iter().filter(|h| h.was_overdue).count() as f64 / history.len() as f64
        };

        let mut risk_factors = Vec::new();
        if history.iter().any(|h| h.was_overdue) {
            risk_factors.push("past filings were overdue".to_string());
        }
        if history.is_empty() {
            risk_factors.push("no filing history available".to_string());
        }

        Ok(DelayRiskSignal {
            delay_probability: probability,
            risk_level: RiskLevel::from_delay_probability(probability),
            risk_factors,
            recommendations: vec!["prepare filing ahead of the due date".to_string()],
            confidence: if history.is_empty() { 0.3 } else { 0.6 },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_extracts_known_form_and_date() {
        let service = RuleBasedExtractionService;
        let text = "The due date for filing GSTR-3B for October 2025 stands extended to 2025-11-25.";

        let raw = service.extract_due_date_change(text).await.unwrap().unwrap();
        assert_eq!(raw.form_name, "GSTR-3B");
        assert_eq!(raw.category, "gst");
        assert_eq!(raw.new_due_date, "2025-11-25");
        assert_eq!(raw.period.as_deref(), Some("October 2025"));
        assert!(raw.is_extension);
        assert!(raw.confidence > 0.9);
    }

    #[tokio::test]
    async fn test_stub_returns_none_without_form_or_date() {
        let service = RuleBasedExtractionService;
        assert!(service
            .extract_due_date_change("Clarification regarding e-invoice applicability")
            .await
            .unwrap()
            .is_none());
        assert!(service
            .extract_due_date_change("GSTR-3B instructions updated, no date given")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_stub_delay_risk_follows_history() {
        let service = RuleBasedExtractionService;
        let upcoming = UpcomingTaskSummary {
            task_name: "GSTR-3B - November 2025".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 12, 20).unwrap(),
            category: ComplianceCategory::Gst,
            priority: "medium".to_string(),
        };

        let entry = |overdue: bool| FilingHistoryEntry {
            task_name: "GSTR-3B".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
            status: "filed".to_string(),
            was_overdue: overdue,
            days_late: None,
        };

        let all_late = vec![entry(true), entry(true)];
        let signal = service.predict_delay_risk(&all_late, &upcoming).await.unwrap();
        assert_eq!(signal.delay_probability, 1.0);
        assert_eq!(signal.risk_level, RiskLevel::Critical);

        let all_on_time = vec![entry(false), entry(false)];
        let signal = service.predict_delay_risk(&all_on_time, &upcoming).await.unwrap();
        assert_eq!(signal.delay_probability, 0.0);
        assert_eq!(signal.risk_level, RiskLevel::Low);
    }
}
