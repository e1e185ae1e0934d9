use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub price: Decimal,
    pub date: NaiveDate,            // the day the expense happened
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewEntry<'a> {
    pub user_id: i64,
    pub title: &'a str,
    pub price: Decimal,
    pub date: NaiveDate,
}
