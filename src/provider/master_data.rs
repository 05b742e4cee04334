// ==========================================
// 合规规则引擎 - 公司主数据提供方接口
// ==========================================
// 职责: 定义政府门户主数据拉取契约(抓取传输在引擎之外)
// 约定: 任何失败 => 不富化,沿用既有数据继续
// ==========================================

use crate::provider::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// CompanyMasterData - 主数据载荷
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyMasterData {
    pub status: Option<String>,            // 如 "Active" / "Struck Off"
    pub state: Option<String>,
    pub directors: Vec<String>,
    pub incorporation_date: Option<NaiveDate>,
}

// ==========================================
// MasterDataProvider Trait
// ==========================================
#[async_trait]
pub trait MasterDataProvider: Send + Sync {
    /// 按公司标识符(CIN/GSTIN)拉取主数据
    ///
    /// # 失败语义
    /// - 引擎把任何失败视为"不富化,继续",绝不中断调用方
    async fn fetch(&self, identifier: &str) -> ProviderResult<CompanyMasterData>;
}

// ==========================================
// NoOpMasterDataProvider - 空实现
// ==========================================
// 用途: 未接入门户抓取时的默认占位;永远返回"不可用"
pub struct NoOpMasterDataProvider;

#[async_trait]
impl MasterDataProvider for NoOpMasterDataProvider {
    async fn fetch(&self, _identifier: &str) -> ProviderResult<CompanyMasterData> {
        Err(ProviderError::Unavailable(
            "master data provider not configured".to_string(),
        ))
    }
}
