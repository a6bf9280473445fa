//! Followup bucketing for the CRM dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum FollowupBucket {
    #[serde(rename = "overdue")]
    Overdue,
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "tomorrow")]
    Tomorrow,
    #[serde(rename = "next_7_days")]
    Next7Days,
    #[serde(rename = "next_30_days")]
    Next30Days,
    #[serde(rename = "later")]
    Later,
}

/// Whole days from `now` to `followup`, floored.
pub fn day_delta(followup: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (followup - now).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

/// Classifies a followup timestamp relative to `now`. `None` means no followup is set.
pub fn followup_bucket(
    followup: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<FollowupBucket> {
    let delta = day_delta(followup?, now);
    let bucket = match delta {
        d if d < 0 => FollowupBucket::Overdue,
        0 => FollowupBucket::Today,
        1 => FollowupBucket::Tomorrow,
        2..=7 => FollowupBucket::Next7Days,
        8..=30 => FollowupBucket::Next30Days,
        _ => FollowupBucket::Later,
    };
    Some(bucket)
}

/// Per-bucket counts shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FollowupCounts {
    pub overdue: i64,
    pub today: i64,
    pub tomorrow: i64,
    pub next_7_days: i64,
    pub next_30_days: i64,
    pub later: i64,
}

impl FollowupCounts {
    pub fn tally<I>(followups: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let mut counts = Self::default();
        for at in followups {
            match followup_bucket(Some(at), now) {
                Some(FollowupBucket::Overdue) => counts.overdue += 1,
                Some(FollowupBucket::Today) => counts.today += 1,
                Some(FollowupBucket::Tomorrow) => counts.tomorrow += 1,
                Some(FollowupBucket::Next7Days) => counts.next_7_days += 1,
                Some(FollowupBucket::Next30Days) => counts.next_30_days += 1,
                Some(FollowupBucket::Later) => counts.later += 1,
                None => {}
            }
        }
        counts
    }
}
