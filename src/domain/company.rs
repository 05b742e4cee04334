// ==========================================
// 合规规则引擎 - 公司领域模型
// ==========================================
// 职责: 公司画像实体,供适用性判定与评分/预测读取
// 说明: 租户/账号管理在引擎之外,调用方已完成范围鉴权
// ==========================================

use crate::domain::types::RiskLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// CompanyProfile - 公司画像
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub company_id: i64,
    pub company_name: String,

    // ===== 适用性判定输入 =====
    pub company_type: Option<String>, // Private Limited / LLP / Public Limited ...
    pub state: Option<String>,
    pub turnover: Option<f64>,        // 年营业额
    pub gstin: Option<String>,        // GST 注册号
    pub cin: Option<String>,          // 公司识别号(21 位)

    // ===== 状态与派生指标 =====
    pub status: String,               // Active / Inactive / ...
    pub compliance_score: i32,        // 0-100,由 ScoreCalculator 回写
    pub risk_level: RiskLevel,        // 由 RiskForecaster 回写
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl CompanyProfile {
    pub fn is_active(&self) -> bool {
        self.status == "Active"
    }
}
