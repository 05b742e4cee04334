// ==========================================
// 合规规则引擎 - 财年周期纯函数库
// ==========================================
// 职责: 财年解析/周期切分/截止日推导的纯逻辑
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use chrono::{Datelike, Duration, NaiveDate};

/// 展开出的合规周期
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub label: String, // 如 "October 2025" / "Q1 FY2025-26"
    pub start: NaiveDate,
    pub end: NaiveDate,
}

// ==========================================
// FiscalCore - 纯函数工具类
// ==========================================
pub struct FiscalCore;

impl FiscalCore {
    /// 财年起始月(4 = 四月,印度财年)
    pub const DEFAULT_START_MONTH: u32 = 4;

    /// 无 base_due_day 规则的默认截止滞后天数
    pub const DEFAULT_DUE_LAG_DAYS: i64 = 20;

    /// 解析财年标签
    ///
    /// # 格式
    /// - "FY2025-26" => 起始年 2025
    /// - 后缀必须是起始年 + 1 的后两位
    pub fn parse_fiscal_year(label: &str) -> EngineResult<i32> {
        let invalid = || EngineError::InvalidFiscalYear(label.to_string());

        let rest = label.strip_prefix("FY").ok_or_else(invalid)?;
        let (year_part, suffix) = rest.split_once('-').ok_or_else(invalid)?;
        if year_part.len() != 4 || suffix.len() != 2 {
            return Err(invalid());
        }

        let start_year: i32 = year_part.parse().map_err(|_| invalid())?;
        let expected_suffix = format!("{:02}", (start_year + 1) % 100);
        if suffix != expected_suffix {
            return Err(invalid());
        }
        Ok(start_year)
    }

    /// 财年标签: 2025 => "FY2025-26"
    pub fn fiscal_year_label(start_year: i32) -> String {
        format!("FY{}-{:02}", start_year, (start_year + 1) % 100)
    }

    /// 给定日期所属财年的起始年
    pub fn fiscal_year_for(date: NaiveDate, start_month: u32) -> i32 {
        if date.month() >= start_month {
            date.year()
        } else {
            date.year() - 1
        }
    }

    /// 财年起止日期(起始月 1 日 ~ 次年起始月前一日)
    pub fn fiscal_year_bounds(start_year: i32, start_month: u32) -> (NaiveDate, NaiveDate) {
        let start = Self::clamped_date(start_year, start_month, 1);
        let (end_year, end_month) = Self::add_months(start_year, start_month, 12);
        let end = Self::clamped_date(end_year, end_month, 1) - Duration::days(1);
        (start, end)
    }

    /// 月份算术: (year, month) + n 个月
    fn add_months(year: i32, month: u32, n: u32) -> (i32, u32) {
        let total = (year * 12 + month as i32 - 1) + n as i32;
        (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
    }

    /// 月末日期
    pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
        let (next_year, next_month) = Self::add_months(year, month, 1);
        Self::clamped_date(next_year, next_month, 1) - Duration::days(1)
    }

    /// 构造日期,日号超出月长时压到月末 (如 2 月 31 日 => 2 月 28/29 日)
    pub fn clamped_date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| {
            let (next_year, next_month) = Self::add_months(year, month, 1);
            // day=1 必然合法,此处仅处理月长溢出
            NaiveDate::from_ymd_opt(next_year, next_month, 1)
                .map(|d| d - Duration::days(1))
                .unwrap_or_default()
        })
    }

    /// 英文月份名
    pub fn month_name(month: u32) -> &'static str {
        const NAMES: [&str; 12] = [
            "January", "February", "March", "April", "May", "June",
            "July", "August", "September", "October", "November", "December",
        ];
        NAMES[(month as usize - 1) % 12]
    }

    /// 月度周期展开: 财年内 12 个月,标签 "October 2025" 风格
    pub fn monthly_periods(start_year: i32, start_month: u32) -> Vec<Period> {
        (0..12)
            .map(|offset| {
                let (year, month) = Self::add_months(start_year, start_month, offset);
                Period {
                    label: format!("{} {}", Self::month_name(month), year),
                    start: Self::clamped_date(year, month, 1),
                    end: Self::last_day_of_month(year, month),
                }
            })
            .collect()
    }

    /// 季度周期展开: Q1 起始月起 3 个月一段,标签 "Q1 FY2025-26"
    pub fn quarterly_periods(start_year: i32, start_month: u32) -> Vec<Period> {
        let fy = Self::fiscal_year_label(start_year);
        (0..4)
            .map(|q| {
                let (sy, sm) = Self::add_months(start_year, start_month, q * 3);
                let (ey, em) = Self::add_months(start_year, start_month, q * 3 + 2);
                Period {
                    label: format!("Q{} {}", q + 1, fy),
                    start: Self::clamped_date(sy, sm, 1),
                    end: Self::last_day_of_month(ey, em),
                }
            })
            .collect()
    }

    /// 半年周期展开: H1/H2 各 6 个月,标签 "H1 FY2025-26"
    pub fn half_yearly_periods(start_year: i32, start_month: u32) -> Vec<Period> {
        let fy = Self::fiscal_year_label(start_year);
        (0..2)
            .map(|h| {
                let (sy, sm) = Self::add_months(start_year, start_month, h * 6);
                let (ey, em) = Self::add_months(start_year, start_month, h * 6 + 5);
                Period {
                    label: format!("H{} {}", h + 1, fy),
                    start: Self::clamped_date(sy, sm, 1),
                    end: Self::last_day_of_month(ey, em),
                }
            })
            .collect()
    }

    /// 年度周期: 整个财年一段,标签即财年标签
    pub fn annual_period(start_year: i32, start_month: u32) -> Period {
        let (start, end) = Self::fiscal_year_bounds(start_year, start_month);
        Period {
            label: Self::fiscal_year_label(start_year),
            start,
            end,
        }
    }

    /// 由周期末推导截止日
    ///
    /// # 规则
    /// - base_due_month 存在(年度合规): 截止于该月,日号取 base_due_day
    ///   (缺省为月末);若落在周期末之前则顺延一年
    /// - base_due_day 存在: 周期末次月的该日(压月末)
    /// - 均缺省: 周期末 + 20 天
    pub fn due_date_after(
        period_end: NaiveDate,
        base_due_day: Option<u32>,
        base_due_month: Option<u32>,
    ) -> NaiveDate {
        if let Some(due_month) = base_due_month {
            let day = base_due_day
                .unwrap_or_else(|| Self::last_day_of_month(period_end.year(), due_month).day());
            let candidate = Self::clamped_date(period_end.year(), due_month, day);
            return if candidate <= period_end {
                Self::clamped_date(period_end.year() + 1, due_month, day)
            } else {
                candidate
            };
        }

        match base_due_day {
            Some(day) => {
                let (year, month) = Self::add_months(period_end.year(), period_end.month(), 1);
                Self::clamped_date(year, month, day)
            }
            None => period_end + Duration::days(Self::DEFAULT_DUE_LAG_DAYS),
        }
    }
}
