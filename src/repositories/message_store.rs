//! Message Store: per-channel durable message tables and their transient
//! working-set (op) tables.
//!
//! The five channels persist to table pairs of identical shape
//! (`sms_messages`/`sms_ops`, ...). The `channel_store!` macro instantiates
//! the diesel access layer once per pair; `MessageStore` dispatches on
//! `ChannelKind` so the rest of the pipeline is channel-agnostic.
//!
//! Claim/release protocol for message rows:
//! - `dequeued_at IS NULL` means idle and, when the status is retryable,
//!   eligible for materialization into the working set.
//! - materialization stamps `dequeued_at`, clears the previous attempt's
//!   delivery fields, and copies the row into the ops table under a
//!   skip-locked row lock, so concurrent materializers take disjoint rows
//!   and a row can never be claimed into two working sets.
//! - reconciliation merges op results back and clears `dequeued_at` in the
//!   same transaction that deletes the op rows, restoring eligibility.

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde_json::Value as JsonValue;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{AttemptOutcome, ChannelKind, DeliveryReceipt, DispatchRow, DispatchStatus};

/// Error code written to stale in-flight rows force-reconciled after the
/// staleness threshold.
pub const DISPATCH_TIMEOUT_CODE: &str = "dispatch_timeout";

/// A recipient to persist into a campaign's message table. Message rows are
/// normally written by the upstream upload layer; this is its insert path.
#[derive(Debug, Clone)]
pub struct RecipientSeed {
    pub recipient: String,
    pub params: JsonValue,
}

/// Aggregate view of a campaign's working set, used by the reconciler's
/// settle check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkingSetState {
    /// Op rows currently existing for the campaign.
    pub total: i64,
    /// Op rows claimed for dispatch whose outcome has not been written yet.
    pub in_flight: i64,
    /// Most recent dispatch timestamp across the working set.
    pub last_dispatch_at: Option<NaiveDateTime>,
}

diesel::define_sql_function! {
    /// COALESCE over two nullable expressions of the same type.
    #[sql_name = "COALESCE"]
    fn coalesce<T: diesel::sql_types::SingleValue>(
        a: diesel::sql_types::Nullable<T>,
        b: diesel::sql_types::Nullable<T>,
    ) -> diesel::sql_types::Nullable<T>;
}

macro_rules! channel_store {
    ($module:ident, $messages:ident, $ops:ident) => {
        mod $module {
            use super::*;
            use crate::schema::{$messages, $ops};

            /// Moves one chunk of the campaign's pending messages into the
            /// working set. Returns the number of rows moved; zero means the
            /// campaign has no pending messages left to claim.
            pub(super) async fn materialize_chunk(
                conn: &mut AsyncPgConnection,
                campaign: i64,
                chunk: i64,
                now: NaiveDateTime,
            ) -> AppResult<usize> {
                conn.transaction::<usize, AppError, _>(|conn| {
                    async move {
                        let ids: Vec<i64> = $messages::table
                            .filter($messages::campaign_id.eq(campaign))
                            .filter($messages::dequeued_at.is_null())
                            .filter($messages::status.eq_any([
                                DispatchStatus::Unsent,
                                DispatchStatus::Error,
                            ]))
                            .limit(chunk)
                            .select($messages::id)
                            .for_update()
                            .skip_locked()
                            .load(conn)
                            .await?;

                        if ids.is_empty() {
                            return Ok(0);
                        }

                        // Stamp the claim and clear the previous attempt's
                        // delivery fields so the reconciliation merge sees a
                        // blank slate for this cycle.
                        let rows: Vec<DispatchRow> =
                            diesel::update($messages::table.filter($messages::id.eq_any(&ids)))
                                .set((
                                    $messages::dequeued_at.eq(Some(now)),
                                    $messages::status.eq(DispatchStatus::Unsent),
                                    $messages::message_id.eq(None::<String>),
                                    $messages::error_code.eq(None::<String>),
                                    $messages::sent_at.eq(None::<NaiveDateTime>),
                                    $messages::delivered_at.eq(None::<NaiveDateTime>),
                                    $messages::received_at.eq(None::<NaiveDateTime>),
                                ))
                                .returning((
                                    $messages::id,
                                    $messages::campaign_id,
                                    $messages::recipient,
                                    $messages::params,
                                    $messages::message_id,
                                    $messages::error_code,
                                    $messages::status,
                                    $messages::dequeued_at,
                                    $messages::sent_at,
                                    $messages::delivered_at,
                                    $messages::received_at,
                                ))
                                .get_results(conn)
                                .await?;

                        let ops: Vec<_> = rows
                            .iter()
                            .map(|row| {
                                (
                                    $ops::id.eq(row.id),
                                    $ops::campaign_id.eq(row.campaign_id),
                                    $ops::recipient.eq(row.recipient.clone()),
                                    $ops::params.eq(row.params.clone()),
                                    $ops::status.eq(DispatchStatus::Unsent),
                                    $ops::dequeued_at.eq(Some(now)),
                                )
                            })
                            .collect();

                        diesel::insert_into($ops::table)
                            .values(ops)
                            .execute(conn)
                            .await?;

                        Ok(rows.len())
                    }
                    .scope_boxed()
                })
                .await
            }

            /// Claims up to `limit` unsent op rows for dispatch, marking them
            /// in flight with a dispatch timestamp. Skip-locked, so parallel
            /// claimers drain disjoint batches.
            pub(super) async fn claim_batch(
                conn: &mut AsyncPgConnection,
                campaign: i64,
                limit: i64,
                now: NaiveDateTime,
            ) -> AppResult<Vec<DispatchRow>> {
                conn.transaction::<Vec<DispatchRow>, AppError, _>(|conn| {
                    async move {
                        let ids: Vec<i64> = $ops::table
                            .filter($ops::campaign_id.eq(campaign))
                            .filter($ops::status.eq(DispatchStatus::Unsent))
                            .limit(limit)
                            .select($ops::id)
                            .for_update()
                            .skip_locked()
                            .load(conn)
                            .await?;

                        if ids.is_empty() {
                            return Ok(Vec::new());
                        }

                        let rows = diesel::update($ops::table.filter($ops::id.eq_any(&ids)))
                            .set((
                                $ops::status.eq(DispatchStatus::Sending),
                                $ops::sent_at.eq(Some(now)),
                            ))
                            .returning((
                                $ops::id,
                                $ops::campaign_id,
                                $ops::recipient,
                                $ops::params,
                                $ops::message_id,
                                $ops::error_code,
                                $ops::status,
                                $ops::dequeued_at,
                                $ops::sent_at,
                                $ops::delivered_at,
                                $ops::received_at,
                            ))
                            .get_results(conn)
                            .await?;

                        Ok(rows)
                    }
                    .scope_boxed()
                })
                .await
            }

            /// Writes one provider call's outcome back to the op row that was
            /// claimed for it.
            pub(super) async fn record_attempt(
                conn: &mut AsyncPgConnection,
                outcome: &AttemptOutcome,
            ) -> AppResult<()> {
                diesel::update($ops::table.filter($ops::id.eq(outcome.op_id)))
                    .set((
                        $ops::status.eq(outcome.status),
                        $ops::message_id.eq(outcome.message_id.clone()),
                        $ops::error_code.eq(outcome.error_code.clone()),
                    ))
                    .execute(conn)
                    .await?;

                Ok(())
            }

            /// Applies a delivery receipt keyed by provider message id: to the
            /// op row while the recipient is in flight, else to the durable
            /// message row. Missing receipt fields never erase present ones,
            /// which makes re-delivered receipts harmless.
            ///
            /// Returns false when no row carries the id yet, which happens
            /// when the receipt outruns the worker's own write-back; the
            /// webhook layer redelivers, and a later attempt lands.
            pub(super) async fn record_receipt(
                conn: &mut AsyncPgConnection,
                receipt: &DeliveryReceipt,
            ) -> AppResult<bool> {
                let updated = diesel::update(
                    $ops::table.filter($ops::message_id.eq(&receipt.provider_message_id)),
                )
                .set((
                    $ops::status.eq(receipt.status),
                    $ops::error_code
                        .eq(coalesce(receipt.error_code.clone(), $ops::error_code)),
                    $ops::delivered_at.eq(coalesce(receipt.delivered_at, $ops::delivered_at)),
                    $ops::received_at.eq(coalesce(receipt.received_at, $ops::received_at)),
                ))
                .execute(conn)
                .await?;

                if updated > 0 {
                    return Ok(true);
                }

                let updated = diesel::update(
                    $messages::table.filter($messages::message_id.eq(&receipt.provider_message_id)),
                )
                .set((
                    $messages::status.eq(receipt.status),
                    $messages::error_code
                        .eq(coalesce(receipt.error_code.clone(), $messages::error_code)),
                    $messages::delivered_at
                        .eq(coalesce(receipt.delivered_at, $messages::delivered_at)),
                    $messages::received_at
                        .eq(coalesce(receipt.received_at, $messages::received_at)),
                ))
                .execute(conn)
                .await?;

                Ok(updated > 0)
            }

            pub(super) async fn working_set_state(
                conn: &mut AsyncPgConnection,
                campaign: i64,
            ) -> AppResult<WorkingSetState> {
                let total: i64 = $ops::table
                    .filter($ops::campaign_id.eq(campaign))
                    .count()
                    .get_result(conn)
                    .await?;

                let in_flight: i64 = $ops::table
                    .filter($ops::campaign_id.eq(campaign))
                    .filter($ops::status.eq(DispatchStatus::Sending))
                    .count()
                    .get_result(conn)
                    .await?;

                let last_dispatch_at: Option<NaiveDateTime> = $ops::table
                    .filter($ops::campaign_id.eq(campaign))
                    .select(diesel::dsl::max($ops::sent_at))
                    .get_result(conn)
                    .await?;

                Ok(WorkingSetState {
                    total,
                    in_flight,
                    last_dispatch_at,
                })
            }

            /// Merges the campaign's working set back into the message table
            /// and deletes it, in one transaction so a message row can never
            /// be simultaneously idle (`dequeued_at` NULL) and still present
            /// in the ops table.
            ///
            /// In-flight rows older than `stale_before` are first failed with
            /// [`DISPATCH_TIMEOUT_CODE`]: their worker is presumed dead, and
            /// waiting forever would stall the campaign behind one lost
            /// provider response.
            ///
            /// Merge rule (most authoritative wins): a field the receipt
            /// webhook already wrote onto the message row is kept; absent
            /// fields take the op's value; `sent_at`/`delivered_at` always
            /// take the op's value, the pipeline's own most recent write.
            pub(super) async fn reconcile_working_set(
                conn: &mut AsyncPgConnection,
                campaign: i64,
                stale_before: NaiveDateTime,
            ) -> AppResult<usize> {
                conn.transaction::<usize, AppError, _>(|conn| {
                    async move {
                        diesel::update(
                            $ops::table
                                .filter($ops::campaign_id.eq(campaign))
                                .filter($ops::status.eq(DispatchStatus::Sending))
                                .filter($ops::sent_at.lt(stale_before)),
                        )
                        .set((
                            $ops::status.eq(DispatchStatus::Error),
                            $ops::error_code.eq(Some(DISPATCH_TIMEOUT_CODE.to_string())),
                        ))
                        .execute(conn)
                        .await?;

                        let merged = diesel::sql_query(concat!(
                            "UPDATE ",
                            stringify!($messages),
                            " AS m SET ",
                            "status = CASE WHEN m.status IN ('unsent', 'sending') ",
                            "THEN o.status ELSE m.status END, ",
                            "message_id = COALESCE(m.message_id, o.message_id), ",
                            "error_code = COALESCE(m.error_code, o.error_code), ",
                            "sent_at = o.sent_at, ",
                            "delivered_at = o.delivered_at, ",
                            "received_at = COALESCE(m.received_at, o.received_at), ",
                            "dequeued_at = NULL ",
                            "FROM ",
                            stringify!($ops),
                            " AS o WHERE m.id = o.id AND m.campaign_id = $1"
                        ))
                        .bind::<diesel::sql_types::BigInt, _>(campaign)
                        .execute(conn)
                        .await?;

                        diesel::delete($ops::table.filter($ops::campaign_id.eq(campaign)))
                            .execute(conn)
                            .await?;

                        Ok(merged)
                    }
                    .scope_boxed()
                })
                .await
            }

            pub(super) async fn message_status_counts(
                conn: &mut AsyncPgConnection,
                campaign: i64,
            ) -> AppResult<Vec<(DispatchStatus, i64)>> {
                $messages::table
                    .filter($messages::campaign_id.eq(campaign))
                    .group_by($messages::status)
                    .select(($messages::status, diesel::dsl::count_star()))
                    .load(conn)
                    .await
                    .map_err(AppError::from)
            }

            pub(super) async fn insert_messages(
                conn: &mut AsyncPgConnection,
                campaign: i64,
                seeds: &[RecipientSeed],
            ) -> AppResult<usize> {
                let rows: Vec<_> = seeds
                    .iter()
                    .map(|seed| {
                        (
                            $messages::campaign_id.eq(campaign),
                            $messages::recipient.eq(seed.recipient.clone()),
                            $messages::params.eq(seed.params.clone()),
                            $messages::status.eq(DispatchStatus::Unsent),
                        )
                    })
                    .collect();

                diesel::insert_into($messages::table)
                    .values(rows)
                    .execute(conn)
                    .await
                    .map_err(AppError::from)
            }
        }
    };
}

channel_store!(sms, sms_messages, sms_ops);
channel_store!(email, email_messages, email_ops);
channel_store!(telegram, telegram_messages, telegram_ops);
channel_store!(whatsapp, whatsapp_messages, whatsapp_ops);
channel_store!(govchat, govchat_messages, govchat_ops);

/// Dispatches a per-channel store call on a [`ChannelKind`].
macro_rules! per_channel {
    ($channel:expr, $f:ident ( $($args:expr),* $(,)? )) => {
        match $channel {
            ChannelKind::Sms => sms::$f($($args),*).await,
            ChannelKind::Email => email::$f($($args),*).await,
            ChannelKind::Telegram => telegram::$f($($args),*).await,
            ChannelKind::Whatsapp => whatsapp::$f($($args),*).await,
            ChannelKind::Govchat => govchat::$f($($args),*).await,
        }
    };
}

/// Channel-agnostic facade over the per-channel table pairs.
#[derive(Clone)]
pub struct MessageStore {
    pool: AsyncDbPool,
}

impl MessageStore {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> AppResult<diesel_async::pooled_connection::bb8::PooledConnection<'_, AsyncPgConnection>>
    {
        self.pool.get().await.map_err(|e| AppError::ConnectionPool {
            source: anyhow::Error::from(e),
        })
    }

    /// Materializes the campaign's working set: every idle, retryable
    /// message row is claimed (in chunks, so memory stays bounded for
    /// million-row campaigns) and copied into the ops table. Partially
    /// completed retries re-select only what is actually outstanding.
    ///
    /// Returns the total number of rows moved.
    pub async fn materialize(
        &self,
        channel: ChannelKind,
        campaign_id: i64,
        chunk_size: i64,
    ) -> AppResult<usize> {
        let mut conn = self.conn().await?;
        let mut moved = 0usize;

        loop {
            let now = Utc::now().naive_utc();
            let n = per_channel!(channel, materialize_chunk(&mut conn, campaign_id, chunk_size, now))?;
            if n == 0 {
                break;
            }
            moved += n;
        }

        Ok(moved)
    }

    /// Claims a batch of unsent working-set rows, marking them in flight.
    /// An empty result means the working set is drained.
    pub async fn claim_batch(
        &self,
        channel: ChannelKind,
        campaign_id: i64,
        limit: i64,
    ) -> AppResult<Vec<DispatchRow>> {
        let mut conn = self.conn().await?;
        let now = Utc::now().naive_utc();
        per_channel!(channel, claim_batch(&mut conn, campaign_id, limit, now))
    }

    /// Writes one provider call's outcome back to its op row.
    pub async fn record_attempt(
        &self,
        channel: ChannelKind,
        outcome: &AttemptOutcome,
    ) -> AppResult<()> {
        let mut conn = self.conn().await?;
        per_channel!(channel, record_attempt(&mut conn, outcome))
    }

    /// Applies a delivery receipt (webhook ingestion path). Returns false if
    /// no row matched the provider message id.
    pub async fn record_receipt(
        &self,
        channel: ChannelKind,
        receipt: &DeliveryReceipt,
    ) -> AppResult<bool> {
        let mut conn = self.conn().await?;
        per_channel!(channel, record_receipt(&mut conn, receipt))
    }

    pub async fn working_set_state(
        &self,
        channel: ChannelKind,
        campaign_id: i64,
    ) -> AppResult<WorkingSetState> {
        let mut conn = self.conn().await?;
        per_channel!(channel, working_set_state(&mut conn, campaign_id))
    }

    /// Merges the campaign's working set into the message table and deletes
    /// it (one transaction). Idempotent: with no op rows left this is a
    /// no-op returning zero.
    pub async fn reconcile_working_set(
        &self,
        channel: ChannelKind,
        campaign_id: i64,
        stale_before: NaiveDateTime,
    ) -> AppResult<usize> {
        let mut conn = self.conn().await?;
        per_channel!(
            channel,
            reconcile_working_set(&mut conn, campaign_id, stale_before)
        )
    }

    /// Recounts the campaign's message rows grouped by status.
    pub async fn message_status_counts(
        &self,
        channel: ChannelKind,
        campaign_id: i64,
    ) -> AppResult<Vec<(DispatchStatus, i64)>> {
        let mut conn = self.conn().await?;
        per_channel!(channel, message_status_counts(&mut conn, campaign_id))
    }

    /// Bulk-inserts recipients for a campaign (the upstream upload layer's
    /// write path, exposed for embedding applications and tests).
    pub async fn insert_messages(
        &self,
        channel: ChannelKind,
        campaign_id: i64,
        seeds: &[RecipientSeed],
    ) -> AppResult<usize> {
        let mut conn = self.conn().await?;
        per_channel!(channel, insert_messages(&mut conn, campaign_id, seeds))
    }
}
