// ==========================================
// 合规规则引擎 - 日志初始化
// ==========================================
// 输出格式:
// - 默认 compact 文本(调度周期日志以字段为主,不需要 target)
// - COMPLIANCE_LOG_FORMAT=json 切换为 JSON 行,供采集端消费
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化进程全局日志订阅器
///
/// # 环境变量
/// - RUST_LOG: 级别过滤器,缺省 `compliance_engine=info,warn`
/// - COMPLIANCE_LOG_FORMAT: 设为 `json` 时输出 JSON 行
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("compliance_engine=info,warn"));

    let builder = fmt().with_env_filter(filter).with_target(false);
    if std::env::var("COMPLIANCE_LOG_FORMAT").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

/// 测试用订阅器(debug 级别,写入测试捕获器;重复初始化无害)
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("compliance_engine=debug"))
        .with_test_writer()
        .compact()
        .try_init();
}
