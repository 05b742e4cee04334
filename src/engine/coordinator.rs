// ==========================================
// 合规规则引擎 - 调度协调器
// ==========================================
// 职责: 按作业类型对全部活动公司运行一轮处理
// 状态机: Idle -> Running -> {Completed, CompletedWithErrors}
// 红线:
// - 公司工作单元相互隔离,单元失败计数不中断整轮
// - 单公司单写者: 同一公司的单元串行(按公司锁)
// - 通知源每轮只拉取一次
// - 协作取消只在公司单元之间检查
// - 任一终态都不阻塞下一轮
// ==========================================

use crate::domain::company::CompanyProfile;
use crate::domain::notification::{CompanyFailure, CycleReport, CycleState, RegulatoryNotification};
use crate::engine::calendar::CalendarGenerator;
use crate::engine::error::EngineResult;
use crate::engine::fiscal::FiscalCore;
use crate::engine::forecast::{RiskForecaster, DEFAULT_HISTORY_WINDOW};
use crate::engine::reconcile::ReconciliationProcessor;
use crate::engine::score::ScoreCalculator;
use crate::provider::extraction::TextExtractionService;
use crate::provider::master_data::MasterDataProvider;
use crate::provider::notification_feed::NotificationFeed;
use crate::repository::company_repo::CompanyRepository;
use crate::repository::metrics_repo::{ComplianceMetricsRepository, RiskPredictionRepository};
use crate::repository::task_repo::ComplianceTaskRepository;
use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ==========================================
// JobType - 调度作业类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    CalendarGeneration,
    Reconciliation,
    Scoring,
    Forecasting,
    MasterDataSync,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::CalendarGeneration => "calendar_generation",
            JobType::Reconciliation => "reconciliation",
            JobType::Scoring => "scoring",
            JobType::Forecasting => "forecasting",
            JobType::MasterDataSync => "master_data_sync",
        }
    }
}

// ==========================================
// CoordinatorConfig - 协调器配置
// ==========================================
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// 公司单元有界并发度
    pub max_concurrency: usize,
    /// 财年起始月
    pub fiscal_year_start_month: u32,
    /// 外部提供方调用超时(通知源/主数据)
    pub provider_timeout: Duration,
    /// 风险预测的待办任务上限
    pub forecast_upcoming_limit: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            fiscal_year_start_month: FiscalCore::DEFAULT_START_MONTH,
            provider_timeout: Duration::from_secs(30),
            forecast_upcoming_limit: 20,
        }
    }
}

/// 单个公司工作单元的结果
enum UnitOutcome {
    Done,
    Failed(CompanyFailure),
    Cancelled,
}

// ==========================================
// SchedulerCoordinator - 调度协调器
// ==========================================
pub struct SchedulerCoordinator<S: TextExtractionService> {
    company_repo: Arc<CompanyRepository>,
    task_repo: Arc<ComplianceTaskRepository>,
    metrics_repo: Arc<ComplianceMetricsRepository>,
    prediction_repo: Arc<RiskPredictionRepository>,

    generator: Arc<CalendarGenerator<S>>,
    reconciler: Arc<ReconciliationProcessor<S>>,
    forecaster: Arc<RiskForecaster<S>>,

    feed: Arc<dyn NotificationFeed>,
    master_data: Arc<dyn MasterDataProvider>,

    /// 按公司的单写者锁
    company_locks: AsyncMutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
    state: StdMutex<CycleState>,
    cancel_requested: AtomicBool,
    config: CoordinatorConfig,
}

impl<S: TextExtractionService> SchedulerCoordinator<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        company_repo: Arc<CompanyRepository>,
        task_repo: Arc<ComplianceTaskRepository>,
        metrics_repo: Arc<ComplianceMetricsRepository>,
        prediction_repo: Arc<RiskPredictionRepository>,
        generator: Arc<CalendarGenerator<S>>,
        reconciler: Arc<ReconciliationProcessor<S>>,
        forecaster: Arc<RiskForecaster<S>>,
        feed: Arc<dyn NotificationFeed>,
        master_data: Arc<dyn MasterDataProvider>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            company_repo,
            task_repo,
            metrics_repo,
            prediction_repo,
            generator,
            reconciler,
            forecaster,
            feed,
            master_data,
            company_locks: AsyncMutex::new(HashMap::new()),
            state: StdMutex::new(CycleState::Idle),
            cancel_requested: AtomicBool::new(false),
            config,
        }
    }

    /// 当前周期状态
    pub fn current_state(&self) -> CycleState {
        self.state.lock().map(|s| *s).unwrap_or(CycleState::Idle)
    }

    /// 请求协作取消(在下一个公司单元边界生效)
    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    /// 对全部活动公司运行一轮作业
    pub async fn run_cycle(&self, job_type: JobType) -> EngineResult<CycleReport> {
        let cycle_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        self.set_state(CycleState::Running);
        info!(cycle_id = %cycle_id, job_type = job_type.as_str(), "调度周期开始");

        let companies = self.company_repo.list_active()?;
        let today = started_at.date_naive();
        let fiscal_year = FiscalCore::fiscal_year_label(FiscalCore::fiscal_year_for(
            today,
            self.config.fiscal_year_start_month,
        ));

        // 通知源每轮只拉取一次,各公司共享同一批文档
        let notifications = if job_type == JobType::Reconciliation {
            Arc::new(self.fetch_notifications().await)
        } else {
            Arc::new(Vec::new())
        };

        let fiscal_year_ref: &str = &fiscal_year;
        let outcomes: Vec<UnitOutcome> = stream::iter(companies)
            .map(|company| {
                let notifications = Arc::clone(&notifications);
                async move {
                    // 协作取消: 只在单元之间检查,运行中的单元不被打断
                    if self.cancel_requested.load(Ordering::SeqCst) {
                        return UnitOutcome::Cancelled;
                    }
                    let lock = self.lock_for(company.company_id).await;
                    let _guard = lock.lock().await;

                    match self
                        .process_company(job_type, &company, &notifications, today, fiscal_year_ref)
                        .await
                    {
                        Ok(()) => UnitOutcome::Done,
                        Err(message) => {
                            warn!(
                                company_id = company.company_id,
                                job_type = job_type.as_str(),
                                error = %message,
                                "公司工作单元失败,隔离后继续"
                            );
                            UnitOutcome::Failed(CompanyFailure {
                                company_id: company.company_id,
                                message,
                            })
                        }
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        let mut companies_processed = 0;
        let mut failures = Vec::new();
        let mut cancelled = false;
        for outcome in outcomes {
            match outcome {
                UnitOutcome::Done => companies_processed += 1,
                UnitOutcome::Failed(failure) => failures.push(failure),
                UnitOutcome::Cancelled => cancelled = true,
            }
        }

        let state = if failures.is_empty() {
            CycleState::Completed
        } else {
            CycleState::CompletedWithErrors
        };
        self.set_state(state);
        self.cancel_requested.store(false, Ordering::SeqCst);

        info!(
            cycle_id = %cycle_id,
            state = state.as_str(),
            processed = companies_processed,
            failed = failures.len(),
            cancelled,
            "调度周期结束"
        );

        Ok(CycleReport {
            cycle_id,
            job_type: job_type.as_str().to_string(),
            state,
            companies_processed,
            companies_failed: failures.len(),
            failures,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// 单个公司的工作单元
    async fn process_company(
        &self,
        job_type: JobType,
        company: &CompanyProfile,
        notifications: &[RegulatoryNotification],
        today: NaiveDate,
        fiscal_year: &str,
    ) -> Result<(), String> {
        match job_type {
            JobType::CalendarGeneration => {
                self.generator
                    .generate(company, fiscal_year)
                    .await
                    .map_err(|e| e.to_string())?;
            }
            JobType::Reconciliation => {
                self.reconciler
                    .reconcile(company.company_id, notifications)
                    .await
                    .map_err(|e| e.to_string())?;
            }
            JobType::Scoring => {
                let tasks = self
                    .task_repo
                    .list_by_company(company.company_id)
                    .map_err(|e| e.to_string())?;
                let previous = self
                    .metrics_repo
                    .latest_score(company.company_id)
                    .map_err(|e| e.to_string())?;
                let metrics = ScoreCalculator::build_metrics(
                    company.company_id,
                    &tasks,
                    previous,
                    today,
                    Utc::now(),
                );
                self.metrics_repo.insert(&metrics).map_err(|e| e.to_string())?;
                self.company_repo
                    .update_score(company.company_id, metrics.compliance_score)
                    .map_err(|e| e.to_string())?;
            }
            JobType::Forecasting => {
                let historical = self
                    .task_repo
                    .list_historical(company.company_id, DEFAULT_HISTORY_WINDOW)
                    .map_err(|e| e.to_string())?;
                let upcoming = self
                    .task_repo
                    .list_upcoming_pending(
                        company.company_id,
                        today,
                        self.config.forecast_upcoming_limit,
                    )
                    .map_err(|e| e.to_string())?;

                let prediction = self
                    .forecaster
                    .forecast(company, &historical, &upcoming, today)
                    .await;
                self.prediction_repo
                    .insert(&prediction)
                    .map_err(|e| e.to_string())?;
                self.company_repo
                    .update_risk_level(company.company_id, prediction.overall_risk_level)
                    .map_err(|e| e.to_string())?;
            }
            JobType::MasterDataSync => {
                self.sync_master_data(company).await?;
            }
        }
        Ok(())
    }

    /// 主数据同步: 富化失败时沿用既有数据,不算单元失败
    async fn sync_master_data(&self, company: &CompanyProfile) -> Result<(), String> {
        let identifier = match company.cin.as_deref().or(company.gstin.as_deref()) {
            Some(id) => id,
            None => {
                debug!(company_id = company.company_id, "无 CIN/GSTIN,跳过主数据同步");
                return Ok(());
            }
        };

        let call = self.master_data.fetch(identifier);
        match tokio::time::timeout(self.config.provider_timeout, call).await {
            Ok(Ok(data)) => {
                self.company_repo
                    .apply_master_data(
                        company.company_id,
                        data.status.as_deref(),
                        data.state.as_deref(),
                    )
                    .map_err(|e| e.to_string())?;
            }
            Ok(Err(e)) => {
                warn!(company_id = company.company_id, error = %e, "主数据拉取失败,沿用既有数据");
            }
            Err(_) => {
                warn!(company_id = company.company_id, "主数据拉取超时,沿用既有数据");
            }
        }
        Ok(())
    }

    /// 通知源拉取(失败降级为空批,记录告警)
    async fn fetch_notifications(&self) -> Vec<RegulatoryNotification> {
        let call = self.feed.fetch_latest();
        match tokio::time::timeout(self.config.provider_timeout, call).await {
            Ok(Ok(notifications)) => notifications,
            Ok(Err(e)) => {
                warn!(error = %e, "通知源拉取失败,本轮按空批处理");
                Vec::new()
            }
            Err(_) => {
                warn!("通知源拉取超时,本轮按空批处理");
                Vec::new()
            }
        }
    }

    /// 公司锁注册表(懒创建)
    async fn lock_for(&self, company_id: i64) -> Arc<AsyncMutex<()>> {
        let mut locks = self.company_locks.lock().await;
        locks.entry(company_id).or_default().clone()
    }

    fn set_state(&self, state: CycleState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }
}
