// ==========================================
// 合规规则引擎 - 外部协作方层
// ==========================================
// 职责: 定义主数据/通知源/文本抽取三类外部协作方接口
// 红线: 引擎正确性不得依赖任何具体后端;
//       所有接口必须可用确定性桩替换以便测试
// ==========================================

pub mod error;
pub mod extraction;
pub mod master_data;
pub mod notification_feed;

// 重导出核心接口
pub use error::{ProviderError, ProviderResult};
pub use extraction::{
    ApplicabilitySignal, DelayRiskSignal, FilingHistoryEntry, RawDueDateExtraction,
    RuleBasedExtractionService, TextExtractionService, UpcomingTaskSummary,
};
pub use master_data::{CompanyMasterData, MasterDataProvider, NoOpMasterDataProvider};
pub use notification_feed::{InMemoryNotificationFeed, NotificationFeed};
