// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PostgreSQL implementation of the archive capability.
//!
//! Queries are built at runtime; no live database is needed at compile
//! time. Timestamps that participate in freshness windows
//! (`registration_time`, `cmd_date`) are timestamptz columns; container
//! timestamps are carried verbatim as text.

use crate::archive::{Archive, StoreError};
use crate::types::{
    ConnectionParams, ICommand, ProductInfo, RestartableTask, SpectraRow, TaskRecord,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use ql_core::ProductMeta;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, warn};

/// Archive handle backed by a Postgres pool.
///
/// Setting the parameters does not connect; the pool is created on the
/// first operation (or an explicit `open_connection`) and survives
/// until `close_connection`.
pub struct PgArchive {
    params: ConnectionParams,
    pool: Mutex<Option<PgPool>>,
}

impl PgArchive {
    pub fn new(params: ConnectionParams) -> Self {
        Self { params, pool: Mutex::new(None) }
    }

    async fn ensure_open(&self) -> Result<PgPool, StoreError> {
        if let Some(pool) = self.pool.lock().clone() {
            return Ok(pool);
        }
        let pool =
            PgPoolOptions::new().max_connections(4).connect(&self.params.url()).await?;
        debug!(db = %self.params.name, "archive connection opened");
        Ok(self.pool.lock().get_or_insert_with(|| pool.clone()).clone())
    }
}

#[async_trait]
impl Archive for PgArchive {
    async fn open_connection(&self) -> Result<(), StoreError> {
        if self.pool.lock().is_some() {
            warn!("archive connection already open");
            return Ok(());
        }
        self.ensure_open().await.map(|_| ())
    }

    async fn close_connection(&self) -> Result<(), StoreError> {
        let pool = self.pool.lock().take();
        if let Some(pool) = pool {
            pool.close().await;
        }
        Ok(())
    }

    async fn store_products(&self, products: &[ProductMeta]) -> Result<(), StoreError> {
        let pool = self.ensure_open().await?;
        let mut tx = pool.begin().await?;
        for m in products {
            sqlx::query(
                "INSERT INTO products_info \
                 (product_id, product_type, product_status_id, product_version, product_size, \
                  creator_id, instrument_id, obsmode_id, signature, start_time, end_time, \
                  registration_time, url, report) \
                 VALUES ($1, $2, \
                   (SELECT product_status_id FROM product_status WHERE status_desc = 'OK'), \
                   $3, $4, \
                   (SELECT creator_id FROM creators WHERE creator_desc = $5), \
                   (SELECT instrument_id FROM instruments WHERE instrument = $6), \
                   (SELECT obsmode_id FROM observation_modes WHERE obsmode_desc = $7), \
                   $8, $9, $10, NOW(), $11, $12::jsonb) \
                 ON CONFLICT (product_id) DO UPDATE SET report = EXCLUDED.report",
            )
            .bind(&m.id)
            .bind(&m.product_type)
            .bind(&m.version)
            .bind(m.size as i64)
            .bind(&m.creator)
            .bind(&m.instrument)
            .bind(&m.obs_mode)
            .bind(&m.signature)
            .bind(&m.start_time)
            .bind(&m.end_time)
            .bind(&m.url)
            .bind(serde_json::to_value(m).unwrap_or_default())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        sqlx::query("REFRESH MATERIALIZED VIEW products_info_filter").execute(&pool).await?;
        Ok(())
    }

    async fn retrieve_products(&self, criteria: &str) -> Result<Vec<ProductInfo>, StoreError> {
        let pool = self.ensure_open().await?;
        let sql = format!(
            "SELECT p.product_id, p.product_type, s.status_desc, p.product_version, \
             p.product_size, c.creator_desc, i.instrument, m.obsmode_desc, \
             p.start_time, p.end_time, p.registration_time::text AS registration_time, p.url \
             FROM (((products_info AS p \
               INNER JOIN creators AS c ON p.creator_id = c.creator_id) \
                 INNER JOIN instruments AS i ON p.instrument_id = i.instrument_id) \
                   INNER JOIN observation_modes AS m ON p.obsmode_id = m.obsmode_id) \
                     INNER JOIN product_status AS s \
                     ON p.product_status_id = s.product_status_id \
             ORDER BY p.id {criteria}"
        );
        let rows = sqlx::query(&sql).fetch_all(&pool).await?;
        rows.iter()
            .map(|r| {
                Ok(ProductInfo {
                    product_id: r.try_get("product_id")?,
                    product_type: r.try_get("product_type")?,
                    status: r.try_get("status_desc")?,
                    version: r.try_get("product_version")?,
                    size: r.try_get("product_size")?,
                    creator: r.try_get("creator_desc")?,
                    instrument: r.try_get("instrument")?,
                    obs_mode: r.try_get("obsmode_desc")?,
                    start_time: r.try_get("start_time")?,
                    end_time: r.try_get("end_time")?,
                    registration_time: r.try_get("registration_time")?,
                    url: r.try_get("url")?,
                })
            })
            .collect()
    }

    async fn store_task(&self, task: &TaskRecord) -> Result<(), StoreError> {
        let pool = self.ensure_open().await?;
        sqlx::query(
            "INSERT INTO tasks_info \
             (task_id, task_status_id, task_progress, task_exitcode, task_path, task_size, \
              registration_time, start_time, end_time, task_info, task_data) \
             VALUES ($1, $2, $3, $4, $5, 0, NOW(), $6, $7, $8::jsonb, $9::jsonb)",
        )
        .bind(&task.task_id)
        .bind(task.status.value())
        .bind(task.progress as i32)
        .bind(task.exit_code)
        .bind(&task.path)
        .bind(&task.start_time)
        .bind(&task.end_time)
        .bind(&task.info)
        .bind(&task.data)
        .execute(&pool)
        .await?;
        Ok(())
    }

    async fn update_task(&self, task: &TaskRecord) -> Result<(), StoreError> {
        let pool = self.ensure_open().await?;

        // Re-identify a row stored under the placeholder task id to the
        // container id, once, the first time a container id is known.
        let key = match task.container_id() {
            Some(cid) if cid != task.task_id => {
                sqlx::query(
                    "UPDATE tasks_info SET task_id = $1 \
                     WHERE task_id = $2 \
                       AND NOT EXISTS (SELECT 1 FROM tasks_info t WHERE t.task_id = $1)",
                )
                .bind(cid)
                .bind(&task.task_id)
                .execute(&pool)
                .await?;
                cid.to_string()
            }
            _ => task.task_id.clone(),
        };

        sqlx::query(
            "UPDATE tasks_info SET \
             task_status_id = $2, task_progress = $3, task_exitcode = $4, task_path = $5, \
             start_time = $6, end_time = $7, task_info = $8::jsonb, task_data = $9::jsonb \
             WHERE task_id = $1",
        )
        .bind(&key)
        .bind(task.status.value())
        .bind(task.progress as i32)
        .bind(task.exit_code)
        .bind(&task.path)
        .bind(&task.start_time)
        .bind(&task.end_time)
        .bind(&task.info)
        .bind(&task.data)
        .execute(&pool)
        .await?;
        Ok(())
    }

    async fn save_task_status_spectra(
        &self,
        agent: &str,
        row: &SpectraRow,
    ) -> Result<(), StoreError> {
        let pool = self.ensure_open().await?;
        sqlx::query(
            "INSERT INTO task_status_spectra \
             (agent_id, running, waiting, paused, stopped, failed, finished, total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (agent_id) DO UPDATE SET \
             running = EXCLUDED.running, waiting = EXCLUDED.waiting, \
             paused = EXCLUDED.paused, stopped = EXCLUDED.stopped, \
             failed = EXCLUDED.failed, finished = EXCLUDED.finished, \
             total = EXCLUDED.total",
        )
        .bind(agent)
        .bind(row.running)
        .bind(row.waiting)
        .bind(row.paused)
        .bind(row.stopped)
        .bind(row.failed)
        .bind(row.finished)
        .bind(row.total)
        .execute(&pool)
        .await?;
        Ok(())
    }

    async fn store_state(
        &self,
        session: &str,
        node: &str,
        state: &str,
    ) -> Result<(), StoreError> {
        let pool = self.ensure_open().await?;
        sqlx::query(
            "INSERT INTO session_states (timestmp, session_name, node_name, state) \
             VALUES (NOW(), $1, $2, $3)",
        )
        .bind(session)
        .bind(node)
        .bind(state)
        .execute(&pool)
        .await?;
        Ok(())
    }

    async fn get_latest_state(&self) -> Result<Option<(String, String)>, StoreError> {
        let pool = self.ensure_open().await?;
        let row = sqlx::query(
            "SELECT session_name, state FROM session_states ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&pool)
        .await?;
        row.map(|r| Ok((r.try_get("session_name")?, r.try_get("state")?))).transpose()
    }

    async fn get_current_state(
        &self,
        session: &str,
    ) -> Result<Vec<(String, String)>, StoreError> {
        let pool = self.ensure_open().await?;
        let rows = sqlx::query(
            "SELECT node_name, state FROM session_states WHERE session_name = $1 ORDER BY id",
        )
        .bind(session)
        .fetch_all(&pool)
        .await?;
        rows.iter().map(|r| Ok((r.try_get("node_name")?, r.try_get("state")?))).collect()
    }

    async fn add_icommand(
        &self,
        target: &str,
        source: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        let pool = self.ensure_open().await?;
        sqlx::query(
            "INSERT INTO icommands (cmd_date, cmd_source, cmd_target, cmd_executed, cmd_content) \
             VALUES (NOW(), $1, $2, false, $3)",
        )
        .bind(source)
        .bind(target)
        .bind(content)
        .execute(&pool)
        .await?;
        Ok(())
    }

    async fn get_icommand(&self, target: &str) -> Result<Option<ICommand>, StoreError> {
        let pool = self.ensure_open().await?;
        let row = sqlx::query(
            "SELECT id, cmd_source, cmd_content FROM icommands \
             WHERE cmd_target = $1 AND cmd_executed = false \
               AND cmd_date + INTERVAL '15 sec' > NOW() \
             ORDER BY id LIMIT 1",
        )
        .bind(target)
        .fetch_optional(&pool)
        .await?;
        row.map(|r| {
            Ok(ICommand {
                id: r.try_get("id")?,
                source: r.try_get("cmd_source")?,
                content: r.try_get("cmd_content")?,
            })
        })
        .transpose()
    }

    async fn mark_icommand_done(&self, id: i32) -> Result<(), StoreError> {
        let pool = self.ensure_open().await?;
        sqlx::query("UPDATE icommands SET cmd_executed = true WHERE id = $1")
            .bind(id)
            .execute(&pool)
            .await?;
        Ok(())
    }

    async fn remove_icommand(&self, id: i32) -> Result<(), StoreError> {
        let pool = self.ensure_open().await?;
        sqlx::query("DELETE FROM icommands WHERE id = $1").bind(id).execute(&pool).await?;
        Ok(())
    }

    async fn version_counter(&self, proc_name: &str) -> Result<i32, StoreError> {
        let pool = self.ensure_open().await?;
        let row = sqlx::query(
            "SELECT counter FROM version_counters WHERE name LIKE $1 || '%' \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(proc_name)
        .fetch_optional(&pool)
        .await?;
        Ok(row.map(|r| r.try_get("counter")).transpose()?.unwrap_or(0))
    }

    async fn check_signature(
        &self,
        signature: &str,
        product_type: &str,
    ) -> Result<Option<String>, StoreError> {
        let pool = self.ensure_open().await?;
        // The 10 s margin avoids counting products the commander itself
        // registered moments ago while the same file is still in flight.
        let row = sqlx::query(
            "SELECT product_version FROM products_info \
             WHERE signature LIKE $1 || '%' AND product_type = $2 \
               AND (NOW() - registration_time) > INTERVAL '10 sec' \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(signature)
        .bind(product_type)
        .fetch_optional(&pool)
        .await?;
        row.map(|r| Ok(r.try_get("product_version")?)).transpose()
    }

    async fn retrieve_restartable_tasks(&self) -> Result<Vec<RestartableTask>, StoreError> {
        let pool = self.ensure_open().await?;
        let mut tx = pool.begin().await?;
        let rows = sqlx::query(
            "SELECT id, task_info FROM tasks_info \
             WHERE task_status_id = $1 OR task_status_id = $2 ORDER BY id",
        )
        .bind(ql_core::TaskStatus::Scheduled.value())
        .bind(ql_core::TaskStatus::Running.value())
        .fetch_all(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE tasks_info SET task_status_id = $1 \
             WHERE task_status_id = $2 OR task_status_id = $3",
        )
        .bind(ql_core::TaskStatus::Aborted.value())
        .bind(ql_core::TaskStatus::Scheduled.value())
        .bind(ql_core::TaskStatus::Running.value())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        rows.iter()
            .map(|r| Ok(RestartableTask { id: r.try_get("id")?, info: r.try_get("task_info")? }))
            .collect()
    }

    async fn store_node_state(&self, node: &str, state: &str) -> Result<(), StoreError> {
        let pool = self.ensure_open().await?;
        sqlx::query(
            "WITH upsert AS (UPDATE node_states SET node_state = $2 \
             WHERE node_name = $1 RETURNING *) \
             INSERT INTO node_states (node_name, node_state) \
             SELECT $1, $2 WHERE NOT EXISTS (SELECT * FROM upsert)",
        )
        .bind(node)
        .bind(state)
        .execute(&pool)
        .await?;
        Ok(())
    }

    async fn retrieve_node_state(&self, node: &str) -> Result<Option<String>, StoreError> {
        let pool = self.ensure_open().await?;
        let row = sqlx::query("SELECT node_state FROM node_states WHERE node_name = $1")
            .bind(node)
            .fetch_optional(&pool)
            .await?;
        row.map(|r| Ok(r.try_get("node_state")?)).transpose()
    }

    async fn store_var(&self, var: &str, filter: &str, value: &str) -> Result<(), StoreError> {
        let pool = self.ensure_open().await?;
        sqlx::query(
            "WITH upsert AS (UPDATE sys_vars SET var_value = $3 \
             WHERE var_name = $1 AND filter = $2 RETURNING *) \
             INSERT INTO sys_vars (var_name, filter, var_value) \
             SELECT $1, $2, $3 WHERE NOT EXISTS (SELECT * FROM upsert)",
        )
        .bind(var)
        .bind(filter)
        .bind(value)
        .execute(&pool)
        .await?;
        Ok(())
    }

    async fn retrieve_var(&self, var: &str, filter: &str) -> Result<Option<String>, StoreError> {
        let pool = self.ensure_open().await?;
        let row = sqlx::query(
            "SELECT var_value FROM sys_vars WHERE var_name = $1 AND filter = $2",
        )
        .bind(var)
        .bind(filter)
        .fetch_optional(&pool)
        .await?;
        row.map(|r| Ok(r.try_get("var_value")?)).transpose()
    }
}
