// ==========================================
// 合规规则引擎 - 合规日历生成器
// ==========================================
// 职责: 按财年把适用规则展开成任务集 + 写日历快照
// 输入: 公司画像 + 财年标签
// 输出: GenerationResult (创建/跳过/丢弃计数)
// 红线:
// - 已覆盖 (company, rule, period) 幂等跳过,依赖仓储 INSERT-if-absent
// - daily/weekly 频率是配置错误,显式报错,不得静默跳过
// - 截止日落在规则生效窗口外的周期丢弃并计数
// ==========================================

use crate::domain::company::CompanyProfile;
use crate::domain::rule::ComplianceRule;
use crate::domain::task::{ComplianceCalendar, ComplianceTask};
use crate::domain::types::{
    ComplianceCategory, ComplianceFrequency, DueDateSource, TaskPriority, TaskStatus,
};
use crate::engine::applicability::ApplicabilityEvaluator;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::fiscal::{FiscalCore, Period};
use crate::provider::extraction::TextExtractionService;
use crate::repository::calendar_repo::ComplianceCalendarRepository;
use crate::repository::rule_repo::ComplianceRuleRepository;
use crate::repository::task_repo::ComplianceTaskRepository;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

// ==========================================
// GeneratorConfig - 生成器配置
// ==========================================
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// 财年起始月(默认 4 月)
    pub fiscal_year_start_month: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            fiscal_year_start_month: FiscalCore::DEFAULT_START_MONTH,
        }
    }
}

// ==========================================
// GenerationResult - 生成结果
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationResult {
    pub fiscal_year: String,
    pub rules_considered: usize,
    pub rules_not_applicable: usize,
    pub rules_deferred: usize,     // one_time/event_based,等待显式周期
    pub tasks_created: usize,
    pub tasks_skipped: usize,      // 周期已被覆盖
    pub due_dates_dropped: usize,  // 截止日落在生效窗口外
}

// ==========================================
// CalendarGenerator - 日历生成器
// ==========================================
pub struct CalendarGenerator<S: TextExtractionService> {
    rule_repo: Arc<ComplianceRuleRepository>,
    task_repo: Arc<ComplianceTaskRepository>,
    calendar_repo: Arc<ComplianceCalendarRepository>,
    evaluator: ApplicabilityEvaluator<S>,
    config: GeneratorConfig,
}

impl<S: TextExtractionService> CalendarGenerator<S> {
    pub fn new(
        rule_repo: Arc<ComplianceRuleRepository>,
        task_repo: Arc<ComplianceTaskRepository>,
        calendar_repo: Arc<ComplianceCalendarRepository>,
        evaluator: ApplicabilityEvaluator<S>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            rule_repo,
            task_repo,
            calendar_repo,
            evaluator,
            config,
        }
    }

    /// 为公司生成一个财年的合规日历
    ///
    /// # 参数
    /// - company: 公司画像
    /// - fiscal_year: 财年标签,如 "FY2025-26"
    ///
    /// # 流程
    /// 1. 解析财年,取财年首日生效的活动规则
    /// 2. 逐规则评估适用性(不适用则整条跳过)
    /// 3. 按频率展开周期,推导截止日,幂等写入任务
    /// 4. 写日历快照
    pub async fn generate(
        &self,
        company: &CompanyProfile,
        fiscal_year: &str,
    ) -> EngineResult<GenerationResult> {
        let start_year = FiscalCore::parse_fiscal_year(fiscal_year)?;
        let start_month = self.config.fiscal_year_start_month;
        let (fy_start, _) = FiscalCore::fiscal_year_bounds(start_year, start_month);

        let rules = self.rule_repo.list_active_effective(fy_start)?;
        let mut result = GenerationResult {
            fiscal_year: fiscal_year.to_string(),
            rules_considered: rules.len(),
            ..Default::default()
        };

        for rule in &rules {
            let applicability = self.evaluator.evaluate(company, rule).await;
            if !applicability.applicable {
                debug!(
                    rule_code = %rule.rule_code,
                    reasoning = %applicability.reasoning,
                    "规则不适用,跳过展开"
                );
                result.rules_not_applicable += 1;
                continue;
            }

            let periods = match rule.frequency {
                ComplianceFrequency::Monthly => FiscalCore::monthly_periods(start_year, start_month),
                ComplianceFrequency::Quarterly => {
                    FiscalCore::quarterly_periods(start_year, start_month)
                }
                ComplianceFrequency::HalfYearly => {
                    FiscalCore::half_yearly_periods(start_year, start_month)
                }
                ComplianceFrequency::Annual => {
                    vec![FiscalCore::annual_period(start_year, start_month)]
                }
                ComplianceFrequency::OneTime | ComplianceFrequency::EventBased => {
                    // 自动展开不覆盖,等待 generate_for_period 显式触发
                    result.rules_deferred += 1;
                    continue;
                }
                ComplianceFrequency::Daily | ComplianceFrequency::Weekly => {
                    // 适用却无法展开 => 配置错误,显式上浮
                    return Err(EngineError::UnsupportedFrequency {
                        rule_code: rule.rule_code.clone(),
                        frequency: rule.frequency.to_string(),
                    });
                }
            };

            for period in &periods {
                match self.expand_period(company, rule, period)? {
                    PeriodOutcome::Created => result.tasks_created += 1,
                    PeriodOutcome::AlreadyCovered => result.tasks_skipped += 1,
                    PeriodOutcome::OutsideEffectiveRange => result.due_dates_dropped += 1,
                }
            }
        }

        // 快照计数是财年任务集的视图: 本轮新建 + 既有覆盖
        self.write_snapshot(company, fiscal_year, result.tasks_created + result.tasks_skipped)?;

        info!(
            company_id = company.company_id,
            fiscal_year = %fiscal_year,
            created = result.tasks_created,
            skipped = result.tasks_skipped,
            dropped = result.due_dates_dropped,
            "日历生成完成"
        );
        Ok(result)
    }

    /// 显式周期入口(one_time / event_based 规则)
    ///
    /// # 返回
    /// - Ok(true): 任务已创建
    /// - Ok(false): 周期已覆盖或截止日落在生效窗口外
    pub fn generate_for_period(
        &self,
        company: &CompanyProfile,
        rule: &ComplianceRule,
        period: &Period,
    ) -> EngineResult<bool> {
        rule.validate().map_err(EngineError::InvalidRule)?;
        Ok(matches!(
            self.expand_period(company, rule, period)?,
            PeriodOutcome::Created
        ))
    }

    /// 单个周期的任务写入
    fn expand_period(
        &self,
        company: &CompanyProfile,
        rule: &ComplianceRule,
        period: &Period,
    ) -> EngineResult<PeriodOutcome> {
        let due_date = FiscalCore::due_date_after(period.end, rule.base_due_day, rule.base_due_month);
        if !rule.is_effective_on(due_date) {
            return Ok(PeriodOutcome::OutsideEffectiveRange);
        }

        let now = Utc::now();
        let task = ComplianceTask {
            task_id: Uuid::new_v4().to_string(),
            company_id: company.company_id,
            rule_code: rule.rule_code.clone(),
            task_name: format!("{} - {}", rule.form_name, period.label),
            category: rule.category,
            form_name: rule.form_name.clone(),
            act_name: rule.act_name.clone(),
            period: period.label.clone(),
            period_start: period.start,
            period_end: period.end,
            due_date,
            extended_due_date: None,
            status: TaskStatus::Pending,
            priority: Self::priority_for(rule.category),
            source_of_due_date: DueDateSource::System,
            due_date_update_reason: None,
            acknowledgment_number: None,
            filing_reference: None,
            filed_by: None,
            actual_filing_date: None,
            created_at: now,
            updated_at: now,
        };

        if self.task_repo.insert_if_absent(&task)? {
            Ok(PeriodOutcome::Created)
        } else {
            Ok(PeriodOutcome::AlreadyCovered)
        }
    }

    /// 类别到默认优先级的映射(税务申报误期代价高)
    fn priority_for(category: ComplianceCategory) -> TaskPriority {
        match category {
            ComplianceCategory::Gst | ComplianceCategory::IncomeTax | ComplianceCategory::Tds => {
                TaskPriority::High
            }
            _ => TaskPriority::Medium,
        }
    }

    /// 写日历快照(追加,同财年最新快照生效)
    fn write_snapshot(
        &self,
        company: &CompanyProfile,
        fiscal_year: &str,
        task_count: usize,
    ) -> EngineResult<()> {
        self.calendar_repo.insert(&ComplianceCalendar {
            calendar_id: Uuid::new_v4().to_string(),
            company_id: company.company_id,
            fiscal_year: fiscal_year.to_string(),
            calendar_name: format!("{} - {}", company.company_name, fiscal_year),
            task_count: task_count as i32,
            is_auto_generated: true,
            generated_at: Utc::now(),
        })?;
        Ok(())
    }
}

/// 单周期展开结果
enum PeriodOutcome {
    Created,
    AlreadyCovered,
    OutsideEffectiveRange,
}
