// ==========================================
// 合规规则引擎 - 引擎层
// ==========================================
// 六个引擎组件 + 财年纯函数库:
// - ApplicabilityEvaluator: 规则适用性判定
// - CalendarGenerator: 财年日历生成
// - ReconciliationProcessor: 通知核对管线
// - ScoreCalculator: 合规评分(纯函数)
// - RiskForecaster: 延迟风险预测
// - SchedulerCoordinator: 调度周期协调
// ==========================================

pub mod applicability;
pub mod calendar;
pub mod coordinator;
pub mod error;
pub mod fiscal;
pub mod forecast;
pub mod reconcile;
pub mod score;

// 重导出核心类型
pub use applicability::{ApplicabilityEvaluator, RuleApplicability};
pub use calendar::{CalendarGenerator, GenerationResult, GeneratorConfig};
pub use coordinator::{CoordinatorConfig, JobType, SchedulerCoordinator};
pub use error::{EngineError, EngineResult};
pub use fiscal::{FiscalCore, Period};
pub use forecast::RiskForecaster;
pub use reconcile::{ReconcileConfig, ReconciliationProcessor};
pub use score::ScoreCalculator;
