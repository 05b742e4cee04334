// ==========================================
// 合规规则引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 配置错误(不支持的频率/非法财年/畸形规则)必须显式上浮,
//       不得静默跳过或默认化
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 配置错误 =====
    #[error("规则 {rule_code} 的频率不支持自动展开: {frequency}")]
    UnsupportedFrequency {
        rule_code: String,
        frequency: String,
    },

    #[error("财年标签非法: {0} (期望形如 FY2025-26)")]
    InvalidFiscalYear(String),

    #[error("规则非法: {0}")]
    InvalidRule(String),

    // ===== 下层错误 =====
    #[error("仓储操作失败: {0}")]
    Repository(#[from] RepositoryError),
}

/// 引擎层统一返回类型
pub type EngineResult<T> = Result<T, EngineError>;
