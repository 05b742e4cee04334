// ==========================================
// 合规规则引擎 - 适用性评估器
// ==========================================
// 职责: 判定规则是否适用于公司
// 输入: 公司画像 + 规则
// 输出: RuleApplicability (无副作用)
// 红线: 声明了硬判据且公司数据齐备 => 纯进程内判定;
//       委托路径失败必须失败关闭 (applicable=false, confidence=0)
// ==========================================

use crate::domain::company::CompanyProfile;
use crate::domain::rule::ComplianceRule;
use crate::provider::extraction::TextExtractionService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// 委托外部文本解析服务的默认超时
pub const DEFAULT_DELEGATE_TIMEOUT: Duration = Duration::from_secs(30);

// ==========================================
// RuleApplicability - 适用性判定结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleApplicability {
    pub applicable: bool,
    pub confidence: f64, // 0.0 - 1.0;硬判据路径恒为 1.0
    pub reasoning: String,
}

impl RuleApplicability {
    /// 失败关闭默认值(委托失败/超时/响应畸形)
    fn fail_closed(reason: String) -> Self {
        Self {
            applicable: false,
            confidence: 0.0,
            reasoning: reason,
        }
    }
}

// ==========================================
// ApplicabilityEvaluator - 适用性评估器
// ==========================================
pub struct ApplicabilityEvaluator<S: TextExtractionService> {
    extraction: Arc<S>,
    delegate_timeout: Duration,
}

impl<S: TextExtractionService> ApplicabilityEvaluator<S> {
    pub fn new(extraction: Arc<S>) -> Self {
        Self {
            extraction,
            delegate_timeout: DEFAULT_DELEGATE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.delegate_timeout = timeout;
        self
    }

    /// 评估规则对公司的适用性
    ///
    /// # 路径选择
    /// 1. 声明了硬判据且对应公司字段齐备 => 纯进程内判定
    /// 2. 未声明任何判据,或声明的判据缺少公司数据 => 委托外部服务
    pub async fn evaluate(
        &self,
        company: &CompanyProfile,
        rule: &ComplianceRule,
    ) -> RuleApplicability {
        if rule.criteria.has_hard_criteria() {
            match self.evaluate_hard_criteria(company, rule) {
                Some(result) => return result,
                None => {
                    // 声明的判据缺公司数据,转委托路径
                }
            }
        }
        self.delegate(company, rule).await
    }

    /// 纯进程内硬判据判定
    ///
    /// # 返回
    /// - Some(result): 全部声明判据的数据齐备,判定完成
    /// - None: 某个声明判据缺少对应公司字段
    fn evaluate_hard_criteria(
        &self,
        company: &CompanyProfile,
        rule: &ComplianceRule,
    ) -> Option<RuleApplicability> {
        let criteria = &rule.criteria;
        let mut basis = Vec::new();

        if !criteria.company_types.is_empty() {
            let company_type = company.company_type.as_deref()?;
            if !criteria.company_types.iter().any(|t| t == company_type) {
                return Some(RuleApplicability {
                    applicable: false,
                    confidence: 1.0,
                    reasoning: format!(
                        "company type {} not in rule's applicable types",
                        company_type
                    ),
                });
            }
            basis.push(format!("company type {} matches", company_type));
        }

        if let Some(threshold) = criteria.turnover_threshold {
            let turnover = company.turnover?;
            if turnover < threshold {
                return Some(RuleApplicability {
                    applicable: false,
                    confidence: 1.0,
                    reasoning: format!(
                        "turnover {:.0} below threshold {:.0}",
                        turnover, threshold
                    ),
                });
            }
            basis.push(format!("turnover {:.0} meets threshold {:.0}", turnover, threshold));
        }

        if !criteria.states.is_empty() {
            let state = company.state.as_deref()?;
            if !criteria.states.iter().any(|s| s == state) {
                return Some(RuleApplicability {
                    applicable: false,
                    confidence: 1.0,
                    reasoning: format!("state {} not covered by rule", state),
                });
            }
            basis.push(format!("state {} covered", state));
        }

        Some(RuleApplicability {
            applicable: true,
            confidence: 1.0,
            reasoning: basis.join("; "),
        })
    }

    /// 委托外部文本解析服务(带超时,失败关闭)
    async fn delegate(&self, company: &CompanyProfile, rule: &ComplianceRule) -> RuleApplicability {
        let call = self.extraction.evaluate_applicability(company, rule);
        match tokio::time::timeout(self.delegate_timeout, call).await {
            Ok(Ok(signal)) => {
                // 置信度越界视为响应畸形
                if !(0.0..=1.0).contains(&signal.confidence) {
                    warn!(
                        rule_code = %rule.rule_code,
                        confidence = signal.confidence,
                        "适用性委托响应置信度越界,失败关闭"
                    );
                    return RuleApplicability::fail_closed(format!(
                        "delegated analysis returned out-of-range confidence for rule {}",
                        rule.rule_code
                    ));
                }
                RuleApplicability {
                    applicable: signal.applicable,
                    confidence: signal.confidence,
                    reasoning: signal.reasoning,
                }
            }
            Ok(Err(e)) => {
                warn!(rule_code = %rule.rule_code, error = %e, "适用性委托调用失败,失败关闭");
                RuleApplicability::fail_closed(format!(
                    "delegated analysis failed for rule {}: {}",
                    rule.rule_code, e
                ))
            }
            Err(_) => {
                warn!(rule_code = %rule.rule_code, "适用性委托调用超时,失败关闭");
                RuleApplicability::fail_closed(format!(
                    "delegated analysis timed out for rule {}",
                    rule.rule_code
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::ApplicabilityCriteria;
    use crate::domain::types::{ComplianceCategory, ComplianceFrequency, RiskLevel};
    use crate::provider::extraction::{
        ApplicabilitySignal, DelayRiskSignal, FilingHistoryEntry, RawDueDateExtraction,
        UpcomingTaskSummary,
    };
    use async_trait::async_trait;
    use std::error::Error;

    /// Mock: 记录是否被调用,按预设行为响应
    struct MockExtraction {
        behavior: MockBehavior,
    }

    enum MockBehavior {
        Applicable(f64),
        Fail,
        OutOfRangeConfidence,
    }

    #[async_trait]
    impl TextExtractionService for MockExtraction {
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
            match self.behavior {
                MockBehavior::Applicable(confidence) => Ok(ApplicabilitySignal {
                    applicable: true,
                    confidence,
                    reasoning: "textual analysis".to_string(),
                    risk_level: RiskLevel::Medium,
                }),
                MockBehavior::Fail => Err("backend offline".into()),
                MockBehavior::OutOfRangeConfidence => Ok(ApplicabilitySignal {
                    applicable: true,
                    confidence: 7.5,
                    reasoning: "garbage".to_string(),
                    risk_level: RiskLevel::Medium,
                }),
            }
        }

        async fn predict_delay_risk(
            &self,
            _history: &[FilingHistoryEntry],
            _upcoming: &UpcomingTaskSummary,
        ) -> Result<DelayRiskSignal, Box<dyn Error + Send + Sync>> {
            Err("not used".into())
        }
    }

    fn company(turnover: Option<f64>) -> CompanyProfile {
        CompanyProfile {
            company_id: 1,
            company_name: "Acme Pvt Ltd".to_string(),
            company_type: Some("Private Limited".to_string()),
            state: Some("Maharashtra".to_string()),
            turnover,
            gstin: None,
            cin: None,
            status: "Active".to_string(),
            compliance_score: 100,
            risk_level: RiskLevel::Low,
            last_synced_at: None,
        }
    }

    fn rule(criteria: ApplicabilityCriteria) -> ComplianceRule {
        ComplianceRule {
            rule_code: "GST-3B".to_string(),
            rule_name: "GSTR-3B Monthly Return".to_string(),
            description: None,
            category: ComplianceCategory::Gst,
            form_name: "GSTR-3B".to_string(),
            act_name: None,
            criteria,
            frequency: ComplianceFrequency::Monthly,
            base_due_day: Some(20),
            base_due_month: None,
            extension_allowed: true,
            typical_extension_days: 5,
            is_active: true,
            effective_from: None,
            effective_to: None,
        }
    }

    fn evaluator(behavior: MockBehavior) -> ApplicabilityEvaluator<MockExtraction> {
        ApplicabilityEvaluator::new(Arc::new(MockExtraction { behavior }))
    }

    #[tokio::test]
    async fn test_hard_criteria_pass_without_delegation() {
        // Mock 设为 Fail: 若误走委托路径,结果会失败关闭
        let eval = evaluator(MockBehavior::Fail);
        let criteria = ApplicabilityCriteria {
            company_types: vec!["Private Limited".to_string()],
            turnover_threshold: Some(20_000_000.0),
            states: vec![],
        };

        let result = eval.evaluate(&company(Some(80_000_000.0)), &rule(criteria)).await;
        assert!(result.applicable);
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_hard_criteria_below_threshold_not_applicable() {
        let eval = evaluator(MockBehavior::Fail);
        let criteria = ApplicabilityCriteria {
            company_types: vec![],
            turnover_threshold: Some(20_000_000.0),
            states: vec![],
        };

        let result = eval.evaluate(&company(Some(5_000_000.0)), &rule(criteria)).await;
        assert!(!result.applicable);
        assert_eq!(result.confidence, 1.0); // 确定性判定,非失败关闭
    }

    #[tokio::test]
    async fn test_missing_company_data_delegates() {
        let eval = evaluator(MockBehavior::Applicable(0.8));
        let criteria = ApplicabilityCriteria {
            company_types: vec![],
            turnover_threshold: Some(20_000_000.0),
            states: vec![],
        };

        // 营业额未知 => 委托
        let result = eval.evaluate(&company(None), &rule(criteria)).await;
        assert!(result.applicable);
        assert_eq!(result.confidence, 0.8);
    }

    #[tokio::test]
    async fn test_no_criteria_delegates_and_fails_closed() {
        let eval = evaluator(MockBehavior::Fail);
        let result = eval
            .evaluate(&company(Some(1.0)), &rule(ApplicabilityCriteria::default()))
            .await;

        assert!(!result.applicable);
        assert_eq!(result.confidence, 0.0);
        assert!(result.reasoning.contains("failed"));
    }

    #[tokio::test]
    async fn test_malformed_confidence_fails_closed() {
        let eval = evaluator(MockBehavior::OutOfRangeConfidence);
        let result = eval
            .evaluate(&company(Some(1.0)), &rule(ApplicabilityCriteria::default()))
            .await;

        assert!(!result.applicable);
        assert_eq!(result.confidence, 0.0);
    }
}
