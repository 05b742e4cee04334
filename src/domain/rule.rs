// ==========================================
// 合规规则引擎 - 合规规则领域模型
// ==========================================
// 职责: 规则实体与适用性判据定义,加载期校验
// 红线: 规则由外部规则管理流程维护,引擎只读
// ==========================================

use crate::domain::types::{ComplianceCategory, ComplianceFrequency};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// ApplicabilityCriteria - 适用性判据
// ==========================================
// 说明: 各判据为显式可选字段,而非自由格式 JSON 块;
//       判据缺失时由 ApplicabilityEvaluator 委托外部文本解析服务判断
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicabilityCriteria {
    /// 适用的公司类型集合(空 = 未声明)
    pub company_types: Vec<String>,
    /// 年营业额阈值(达到或超过则适用)
    pub turnover_threshold: Option<f64>,
    /// 适用的邦/省集合(空 = 全国适用)
    pub states: Vec<String>,
}

impl ApplicabilityCriteria {
    /// 是否声明了任何硬判据
    pub fn has_hard_criteria(&self) -> bool {
        !self.company_types.is_empty()
            || self.turnover_threshold.is_some()
            || !self.states.is_empty()
    }
}

// ==========================================
// ComplianceRule - 合规规则
// ==========================================
// 生命周期: 外部维护,运行期不可变;引擎仅读取生效窗口内的活动规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub rule_code: String,          // 规则代码(唯一)
    pub rule_name: String,          // 规则名称
    pub description: Option<String>,

    // ===== 合规内容 =====
    pub category: ComplianceCategory,
    pub form_name: String,          // 表单名称(如 GSTR-3B / Form 24Q)
    pub act_name: Option<String>,   // 法案名称

    // ===== 适用性 =====
    pub criteria: ApplicabilityCriteria,

    // ===== 频率与截止日规则 =====
    pub frequency: ComplianceFrequency,
    pub base_due_day: Option<u32>,   // 次月第几日截止(如 20 日)
    pub base_due_month: Option<u32>, // 年度合规的截止月份

    // ===== 延期政策 =====
    pub extension_allowed: bool,
    pub typical_extension_days: i32,

    // ===== 状态与生效窗口 =====
    pub is_active: bool,
    pub effective_from: Option<NaiveDate>,
    pub effective_to: Option<NaiveDate>,
}

impl ComplianceRule {
    /// 规则加载期校验
    ///
    /// # 校验项
    /// - base_due_day 必须在 1..=31
    /// - base_due_month 必须在 1..=12
    /// - turnover_threshold 非负
    /// - 生效窗口起止有序
    ///
    /// # 返回
    /// - Ok(()): 校验通过
    /// - Err(String): 首个违规项的描述
    pub fn validate(&self) -> Result<(), String> {
        if self.rule_code.trim().is_empty() {
            return Err("rule_code 不能为空".to_string());
        }
        if let Some(day) = self.base_due_day {
            if !(1..=31).contains(&day) {
                return Err(format!(
                    "规则 {} 的 base_due_day 非法: {}",
                    self.rule_code, day
                ));
            }
        }
        if let Some(month) = self.base_due_month {
            if !(1..=12).contains(&month) {
                return Err(format!(
                    "规则 {} 的 base_due_month 非法: {}",
                    self.rule_code, month
                ));
            }
        }
        if let Some(threshold) = self.criteria.turnover_threshold {
            if threshold < 0.0 {
                return Err(format!(
                    "规则 {} 的 turnover_threshold 非法: {}",
                    self.rule_code, threshold
                ));
            }
        }
        if let (Some(from), Some(to)) = (self.effective_from, self.effective_to) {
            if from > to {
                return Err(format!(
                    "规则 {} 的生效窗口起止倒置: {} > {}",
                    self.rule_code, from, to
                ));
            }
        }
        Ok(())
    }

    /// 给定日期是否落在规则生效窗口内
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        if let Some(from) = self.effective_from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.effective_to {
            if date > to {
                return false;
            }
        }
        true
    }
}
