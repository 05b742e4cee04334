// ==========================================
// 合规规则引擎 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod calendar_repo;
pub mod company_repo;
pub mod error;
pub mod metrics_repo;
pub mod rule_repo;
pub mod task_repo;

// 重导出核心仓储
pub use calendar_repo::ComplianceCalendarRepository;
pub use company_repo::CompanyRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use metrics_repo::{ComplianceMetricsRepository, RiskPredictionRepository};
pub use rule_repo::ComplianceRuleRepository;
pub use task_repo::ComplianceTaskRepository;
