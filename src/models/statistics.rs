//! Per-campaign statistics models.
//!
//! Statistics are a derived cache over the Message Store, recomputed at
//! reconciliation time; they are never the source of truth.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::models::message::DispatchStatus;

/// Statistics query model for SELECT operations
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::statistics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Statistics {
    pub campaign_id: i64,
    pub unsent: i64,
    pub errored: i64,
    pub sent: i64,
    pub invalid: i64,
    pub updated_at: NaiveDateTime,
}

/// Status counts bucketed the way users see them.
///
/// `sent` covers both `Sending` (dispatched, no receipt yet) and `Success`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub unsent: i64,
    pub errored: i64,
    pub sent: i64,
    pub invalid: i64,
}

impl StatusCounts {
    /// Buckets a grouped `(status, count)` result set.
    pub fn from_grouped(rows: &[(DispatchStatus, i64)]) -> Self {
        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            match status {
                DispatchStatus::Unsent => counts.unsent += n,
                DispatchStatus::Error => counts.errored += n,
                DispatchStatus::Sending | DispatchStatus::Success => counts.sent += n,
                DispatchStatus::InvalidRecipient => counts.invalid += n,
            }
        }
        counts
    }

    pub fn total(&self) -> i64 {
        self.unsent + self.errored + self.sent + self.invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn buckets_fold_sending_into_sent() {
        let counts = StatusCounts::from_grouped(&[
            (DispatchStatus::Unsent, 2),
            (DispatchStatus::Sending, 3),
            (DispatchStatus::Success, 5),
            (DispatchStatus::Error, 1),
            (DispatchStatus::InvalidRecipient, 4),
        ]);
        assert_eq!(
            counts,
            StatusCounts {
                unsent: 2,
                errored: 1,
                sent: 8,
                invalid: 4,
            }
        );
    }

    #[test]
    fn missing_statuses_count_as_zero() {
        let counts = StatusCounts::from_grouped(&[(DispatchStatus::Success, 3)]);
        assert_eq!(counts.unsent, 0);
        assert_eq!(counts.errored, 0);
        assert_eq!(counts.total(), 3);
    }

    proptest! {
        // Every row lands in exactly one bucket, so the bucket sum always
        // equals the recipient total.
        #[test]
        fn bucket_sum_equals_row_total(
            unsent in 0i64..10_000,
            sending in 0i64..10_000,
            success in 0i64..10_000,
            error in 0i64..10_000,
            invalid in 0i64..10_000,
        ) {
            let counts = StatusCounts::from_grouped(&[
                (DispatchStatus::Unsent, unsent),
                (DispatchStatus::Sending, sending),
                (DispatchStatus::Success, success),
                (DispatchStatus::Error, error),
                (DispatchStatus::InvalidRecipient, invalid),
            ]);
            prop_assert_eq!(counts.total(), unsent + sending + success + error + invalid);
        }
    }
}
