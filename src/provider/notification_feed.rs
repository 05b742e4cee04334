// ==========================================
// 合规规则引擎 - 通知源接口
// ==========================================
// 职责: 定义政府通知采集契约(抓取传输在引擎之外)
// 约定: 可返回空序列;引擎不假设任何分页契约
// ==========================================

use crate::domain::notification::RegulatoryNotification;
use crate::provider::error::ProviderResult;
use async_trait::async_trait;

// ==========================================
// NotificationFeed Trait
// ==========================================
#[async_trait]
pub trait NotificationFeed: Send + Sync {
    /// 拉取最新通知序列
    async fn fetch_latest(&self) -> ProviderResult<Vec<RegulatoryNotification>>;
}

// ==========================================
// InMemoryNotificationFeed - 内存实现
// ==========================================
// 用途: 开发/测试环境注入固定通知序列
pub struct InMemoryNotificationFeed {
    notifications: Vec<RegulatoryNotification>,
}

impl InMemoryNotificationFeed {
    pub fn new(notifications: Vec<RegulatoryNotification>) -> Self {
        Self { notifications }
    }

    pub fn empty() -> Self {
        Self {
            notifications: Vec::new(),
        }
    }
}

#[async_trait]
impl NotificationFeed for InMemoryNotificationFeed {
    async fn fetch_latest(&self) -> ProviderResult<Vec<RegulatoryNotification>> {
        Ok(self.notifications.clone())
    }
}
