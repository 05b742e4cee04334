// ==========================================
// 合规规则引擎 - 外部提供方错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 提供方错误一律在调用点按文档化安全默认值就地恢复,
//       不得让引擎调用方崩溃
// ==========================================

use thiserror::Error;

/// 外部提供方(主数据/通知源/文本抽取)错误类型
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("外部调用超时: {0}")]
    Timeout(String),

    #[error("外部服务不可用: {0}")]
    Unavailable(String),

    #[error("标识符非法: {0}")]
    InvalidIdentifier(String),

    #[error("响应格式畸形: {0}")]
    MalformedResponse(String),
}

/// 提供方统一返回类型
pub type ProviderResult<T> = Result<T, ProviderError>;
