//! Campaign models for database operations.
//!
//! Campaign rows are created by the upstream management layer; the dispatch
//! pipeline reads them and writes only the `halted` flag.

use chrono::NaiveDateTime;
use diesel::AsExpression;
use diesel::FromSqlRow;
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Delivery channel of a campaign.
///
/// Each channel has its own message/op table pair of identical shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Sms,
    Email,
    Telegram,
    Whatsapp,
    Govchat,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::Sms,
        ChannelKind::Email,
        ChannelKind::Telegram,
        ChannelKind::Whatsapp,
        ChannelKind::Govchat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Sms => "sms",
            ChannelKind::Email => "email",
            ChannelKind::Telegram => "telegram",
            ChannelKind::Whatsapp => "whatsapp",
            ChannelKind::Govchat => "govchat",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sms" => Some(ChannelKind::Sms),
            "email" => Some(ChannelKind::Email),
            "telegram" => Some(ChannelKind::Telegram),
            "whatsapp" => Some(ChannelKind::Whatsapp),
            "govchat" => Some(ChannelKind::Govchat),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl diesel::query_builder::QueryId for ChannelKind {
    type QueryId = ChannelKind;
    const HAS_STATIC_QUERY_ID: bool = false;
}

impl ToSql<Text, Pg> for ChannelKind {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<Text, Pg> for ChannelKind {
    fn from_sql(
        bytes: <Pg as diesel::backend::Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        ChannelKind::parse(&s).ok_or_else(|| format!("Unrecognized channel: {}", s).into())
    }
}

/// Campaign query model for SELECT operations
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::campaigns)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Campaign {
    pub id: i64,
    pub channel: ChannelKind,
    pub send_rate: i32,
    pub halted: bool,
    pub visible_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// NewCampaign insert model for INSERT operations
#[derive(Debug, Insertable, Deserialize, Clone)]
#[diesel(table_name = crate::schema::campaigns)]
pub struct NewCampaign {
    pub channel: ChannelKind,
    pub send_rate: i32,
    pub halted: bool,
    pub visible_at: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_round_trips_through_str() {
        for channel in ChannelKind::ALL {
            assert_eq!(ChannelKind::parse(channel.as_str()), Some(channel));
        }
    }

    #[test]
    fn unknown_channel_is_rejected() {
        assert_eq!(ChannelKind::parse("fax"), None);
    }
}
