//! Command queue queries.
//!
//! Queue mutations for a device run in one transaction with the count that
//! is reported back, so the count always reflects the mutation it follows.

use mdmq_core::db::unix_timestamp;

use super::db::{DatabaseError, MdmDatabase};
use super::models::{CommandRecord, QueueHead};
use crate::protocol::NewCommand;

impl MdmDatabase {
    /// Append a command to the tail of its device's queue.
    pub async fn create_command(&self, command: &NewCommand) -> Result<String, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO commands (command_uuid, udid, request_type, body, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&command.command_uuid)
        .bind(&command.udid)
        .bind(command.request_type.as_str())
        .bind(&command.body)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO command_queue (command_uuid, udid) VALUES (?, ?)")
            .bind(&command.command_uuid)
            .bind(&command.udid)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(command.command_uuid.clone())
    }

    /// Append a command only if its device's queue is empty.
    ///
    /// The emptiness check is part of the insert, so of several concurrent
    /// callers for one device at most one enqueues. Returns `None` when the
    /// queue already held a command.
    pub async fn create_command_if_drained(
        &self,
        command: &NewCommand,
    ) -> Result<Option<String>, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO commands (command_uuid, udid, request_type, body, created_at) SELECT ?, ?, ?, ?, ? WHERE NOT EXISTS (SELECT 1 FROM command_queue WHERE udid = ?)",
        )
        .bind(&command.command_uuid)
        .bind(&command.udid)
        .bind(command.request_type.as_str())
        .bind(&command.body)
        .bind(now)
        .bind(&command.udid)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("INSERT INTO command_queue (command_uuid, udid) VALUES (?, ?)")
            .bind(&command.command_uuid)
            .bind(&command.udid)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(command.command_uuid.clone()))
    }

    /// Peek at the head of a device's queue without removing it.
    pub async fn next_command(&self, udid: &str) -> Result<QueueHead, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let head: Option<(Vec<u8>,)> = sqlx::query_as(
            "SELECT c.body FROM command_queue q JOIN commands c ON c.command_uuid = q.command_uuid WHERE q.udid = ? ORDER BY q.seq ASC LIMIT 1",
        )
        .bind(udid)
        .fetch_optional(&mut *tx)
        .await?;

        let (remaining,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM command_queue WHERE udid = ?")
                .bind(udid)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(QueueHead {
            body: head.map(|(body,)| body).unwrap_or_default(),
            remaining,
        })
    }

    /// Remove a command from a device's queue wherever it sits.
    ///
    /// Unknown or already-removed identifiers are not an error; the current
    /// queue length is returned either way. Metadata stays resolvable and is
    /// stamped with `resolved_at`.
    pub async fn remove_command(
        &self,
        udid: &str,
        command_uuid: &str,
    ) -> Result<i64, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let removed = sqlx::query("DELETE FROM command_queue WHERE udid = ? AND command_uuid = ?")
            .bind(udid)
            .bind(command_uuid)
            .execute(&mut *tx)
            .await?;

        if removed.rows_affected() > 0 {
            sqlx::query("UPDATE commands SET resolved_at = ? WHERE command_uuid = ?")
                .bind(unix_timestamp())
                .bind(command_uuid)
                .execute(&mut *tx)
                .await?;
        }

        let (remaining,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM command_queue WHERE udid = ?")
                .bind(udid)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(remaining)
    }

    /// Look up a command by identifier, pending or resolved.
    pub async fn get_command(&self, command_uuid: &str) -> Result<CommandRecord, DatabaseError> {
        sqlx::query_as::<_, CommandRecord>("SELECT * FROM commands WHERE command_uuid = ?")
            .bind(command_uuid)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Command {command_uuid}")))
    }

    /// List a device's pending commands in delivery order.
    pub async fn pending_commands(&self, udid: &str) -> Result<Vec<CommandRecord>, DatabaseError> {
        let commands = sqlx::query_as::<_, CommandRecord>(
            "SELECT c.* FROM command_queue q JOIN commands c ON c.command_uuid = q.command_uuid WHERE q.udid = ? ORDER BY q.seq ASC",
        )
        .bind(udid)
        .fetch_all(self.pool())
        .await?;

        Ok(commands)
    }

    /// Count a device's pending commands.
    pub async fn count_pending_commands(&self, udid: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM command_queue WHERE udid = ?")
            .bind(udid)
            .fetch_one(self.pool())
            .await?;

        Ok(row.0)
    }

    /// Delete metadata of commands resolved at or before `resolved_before`.
    pub async fn prune_resolved_commands(&self, resolved_before: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM commands WHERE resolved_at IS NOT NULL AND resolved_at <= ?",
        )
        .bind(resolved_before)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }
}
