// ==========================================
// 合规规则引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 提供内置 schema 引导(引擎只要求事务性记录存储契约)
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout(毫秒)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema(幂等)
///
/// # 表
/// - company: 公司画像
/// - compliance_rule: 合规规则(引擎只读)
/// - compliance_task: 合规任务,(company_id, rule_code, period) 唯一
/// - compliance_calendar: 日历快照(可重建视图)
/// - compliance_metrics: 指标快照(追加序列)
/// - risk_prediction: 风险预测(追加,按 analyzed_at 取最新)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS company (
            company_id       INTEGER PRIMARY KEY,
            company_name     TEXT NOT NULL,
            company_type     TEXT,
            state            TEXT,
            turnover         REAL,
            gstin            TEXT,
            cin              TEXT,
            status           TEXT NOT NULL DEFAULT 'Active',
            compliance_score INTEGER NOT NULL DEFAULT 100,
            risk_level       TEXT NOT NULL DEFAULT 'low',
            last_synced_at   TEXT
        );

        CREATE TABLE IF NOT EXISTS compliance_rule (
            rule_code              TEXT PRIMARY KEY,
            rule_name              TEXT NOT NULL,
            description            TEXT,
            category               TEXT NOT NULL,
            form_name              TEXT NOT NULL,
            act_name               TEXT,
            company_types          TEXT NOT NULL DEFAULT '[]',
            turnover_threshold     REAL,
            states                 TEXT NOT NULL DEFAULT '[]',
            frequency              TEXT NOT NULL,
            base_due_day           INTEGER,
            base_due_month         INTEGER,
            extension_allowed      INTEGER NOT NULL DEFAULT 0,
            typical_extension_days INTEGER NOT NULL DEFAULT 0,
            is_active              INTEGER NOT NULL DEFAULT 1,
            effective_from         TEXT,
            effective_to           TEXT
        );

        CREATE TABLE IF NOT EXISTS compliance_task (
            task_id                TEXT PRIMARY KEY,
            company_id             INTEGER NOT NULL REFERENCES company(company_id) ON DELETE CASCADE,
            rule_code              TEXT NOT NULL,
            task_name              TEXT NOT NULL,
            category               TEXT NOT NULL,
            form_name              TEXT NOT NULL,
            act_name               TEXT,
            period                 TEXT NOT NULL,
            period_start           TEXT NOT NULL,
            period_end             TEXT NOT NULL,
            due_date               TEXT NOT NULL,
            extended_due_date      TEXT,
            status                 TEXT NOT NULL DEFAULT 'pending',
            priority               TEXT NOT NULL DEFAULT 'medium',
            source_of_due_date     TEXT NOT NULL DEFAULT 'system',
            due_date_update_reason TEXT,
            acknowledgment_number  TEXT,
            filing_reference       TEXT,
            filed_by               TEXT,
            actual_filing_date     TEXT,
            created_at             TEXT NOT NULL,
            updated_at             TEXT NOT NULL,
            UNIQUE (company_id, rule_code, period)
        );
        CREATE INDEX IF NOT EXISTS idx_task_company_status
            ON compliance_task (company_id, status);
        CREATE INDEX IF NOT EXISTS idx_task_due_date
            ON compliance_task (due_date);

        CREATE TABLE IF NOT EXISTS compliance_calendar (
            calendar_id       TEXT PRIMARY KEY,
            company_id        INTEGER NOT NULL REFERENCES company(company_id) ON DELETE CASCADE,
            fiscal_year       TEXT NOT NULL,
            calendar_name     TEXT NOT NULL,
            task_count        INTEGER NOT NULL DEFAULT 0,
            is_auto_generated INTEGER NOT NULL DEFAULT 1,
            generated_at      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_calendar_company_fy
            ON compliance_calendar (company_id, fiscal_year);

        CREATE TABLE IF NOT EXISTS compliance_metrics (
            metrics_id          TEXT PRIMARY KEY,
            company_id          INTEGER NOT NULL REFERENCES company(company_id) ON DELETE CASCADE,
            total_tasks         INTEGER NOT NULL,
            completed_tasks     INTEGER NOT NULL,
            pending_tasks       INTEGER NOT NULL,
            overdue_tasks       INTEGER NOT NULL,
            missed_tasks        INTEGER NOT NULL,
            completion_rate     REAL NOT NULL,
            on_time_filing_rate REAL NOT NULL,
            compliance_score    INTEGER NOT NULL,
            previous_score      INTEGER,
            score_change        INTEGER,
            computed_at         TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_metrics_company
            ON compliance_metrics (company_id, computed_at);

        CREATE TABLE IF NOT EXISTS risk_prediction (
            prediction_id             TEXT PRIMARY KEY,
            company_id                INTEGER NOT NULL REFERENCES company(company_id) ON DELETE CASCADE,
            overall_risk_level        TEXT NOT NULL,
            average_delay_probability REAL NOT NULL,
            predictions               TEXT NOT NULL DEFAULT '[]',
            high_risk_task_ids        TEXT NOT NULL DEFAULT '[]',
            analyzed_at               TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_prediction_company
            ON risk_prediction (company_id, analyzed_at);
        "#,
    )?;
    Ok(())
}
