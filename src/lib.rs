// ==========================================
// 合规规则引擎 - 库入口
// ==========================================
// 分层:
// - domain: 领域模型(无数据访问,无引擎逻辑)
// - repository: rusqlite 仓储(无业务逻辑)
// - provider: 外部协作方接口 + 确定性桩
// - engine: 六个引擎组件 + 财年纯函数库
// ==========================================

pub mod db;
pub mod domain;
pub mod engine;
pub mod logging;
pub mod provider;
pub mod repository;
