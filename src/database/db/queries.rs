use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, QueryBuilder, Row, Sqlite};

use crate::database::models::{
    Entry, NewEntry, NewUser, Notification, NotificationKind, Role, User, UserChanges,
};

/*
SQL for users, entries and notifications.
Money columns are TEXT holding a Decimal; sums happen in Rust so no float
rounding creeps in.
 */

fn decode_decimal(text: &str, column: &str) -> Result<Decimal, sqlx::Error> {
    Decimal::from_str(text)
        .map_err(|e| sqlx::Error::Decode(format!("Invalid Decimal format for {}: {}", column, e).into()))
}

/*==========User Queries=========== */

const USER_COLUMNS: &str = r#"
    user_id, name, email, password_hash, role, budget_limit, user_created_at, user_updated_at
"#;

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    let role_text: String = row.try_get("role")?;
    let role = Role::parse(&role_text)
        .ok_or_else(|| sqlx::Error::Decode(format!("Unknown role: {}", role_text).into()))?;
    let limit_text: String = row.try_get("budget_limit")?;

    Ok(User {
        id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role,
        budget_limit: decode_decimal(&limit_text, "budget_limit")?,
        created_at: row.try_get("user_created_at")?,
        updated_at: row.try_get("user_updated_at")?,
    })
}

pub async fn create_user(pool: &Pool<Sqlite>, u: &NewUser<'_>) -> Result<User, sqlx::Error> {
    let now = Utc::now();
    let sql = format!(
        r#"
        INSERT INTO users (name, email, password_hash, role, budget_limit, user_created_at, user_updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING {USER_COLUMNS}
        "#
    );

    let row = sqlx::query(&sql)
        .bind(u.name)
        .bind(u.email)
        .bind(u.password_hash)
        .bind(u.role.as_str())
        .bind(u.budget_limit.to_string())
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

    user_from_row(&row)
}

pub async fn get_user_by_id(pool: &Pool<Sqlite>, user_id: i64) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?");
    sqlx::query(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .map(|row| user_from_row(&row))
        .transpose()
}

pub async fn get_user_by_email(pool: &Pool<Sqlite>, email: &str) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    sqlx::query(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?
        .map(|row| user_from_row(&row))
        .transpose()
}

pub async fn get_all_users(pool: &Pool<Sqlite>) -> Result<Vec<User>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY user_id ASC");
    sqlx::query(&sql)
        .fetch_all(pool)
        .await?
        .iter()
        .map(user_from_row)
        .collect()
}

// Update profile fields; untouched fields keep their stored value
pub async fn update_user(
    pool: &Pool<Sqlite>,
    user_id: i64,
    changes: &UserChanges,
) -> Result<Option<User>, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE users
        SET name = COALESCE(?, name),
            email = COALESCE(?, email),
            budget_limit = COALESCE(?, budget_limit),
            user_updated_at = ?
        WHERE user_id = ?
        RETURNING {USER_COLUMNS}
        "#
    );

    sqlx::query(&sql)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.budget_limit.map(|d| d.to_string()))
        .bind(Utc::now())
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .map(|row| user_from_row(&row))
        .transpose()
}

pub async fn update_password_hash(
    pool: &Pool<Sqlite>,
    user_id: i64,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET password_hash = ?, user_updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(password_hash)
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_user_role(pool: &Pool<Sqlite>, user_id: i64, role: Role) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET role = ?, user_updated_at = ? WHERE user_id = ?")
        .bind(role.as_str())
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// Entries and notifications go with the user (ON DELETE CASCADE)
pub async fn delete_user(pool: &Pool<Sqlite>, user_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/*==========Entry Queries=========== */

const ENTRY_COLUMNS: &str = r#"
    entry_id, user_id, title, price, entry_date, entry_created_at, entry_updated_at
"#;

fn entry_from_row(row: &SqliteRow) -> Result<Entry, sqlx::Error> {
    let price_text: String = row.try_get("price")?;

    Ok(Entry {
        id: row.try_get("entry_id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        price: decode_decimal(&price_text, "price")?,
        date: row.try_get("entry_date")?,
        created_at: row.try_get("entry_created_at")?,
        updated_at: row.try_get("entry_updated_at")?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySortField {
    Date,
    Price,
    Title,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySort {
    pub field: EntrySortField,
    pub descending: bool,
}

impl Default for EntrySort {
    // newest expenses first
    fn default() -> Self {
        Self {
            field: EntrySortField::Date,
            descending: true,
        }
    }
}

impl EntrySort {
    /// Parses `date`, `-price`, `createdAt`, ... A leading `-` sorts descending.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (name, descending) = match s.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (s, false),
        };

        let field = match name {
            "date" => EntrySortField::Date,
            "price" => EntrySortField::Price,
            "title" => EntrySortField::Title,
            "createdAt" => EntrySortField::CreatedAt,
            _ => return None,
        };

        Some(Self { field, descending })
    }

    fn order_by(&self) -> &'static str {
        match (self.field, self.descending) {
            (EntrySortField::Date, false) => "entry_date ASC, entry_id ASC",
            (EntrySortField::Date, true) => "entry_date DESC, entry_id DESC",
            (EntrySortField::Price, false) => "CAST(price AS REAL) ASC, entry_id ASC",
            (EntrySortField::Price, true) => "CAST(price AS REAL) DESC, entry_id DESC",
            (EntrySortField::Title, false) => "title COLLATE NOCASE ASC, entry_id ASC",
            (EntrySortField::Title, true) => "title COLLATE NOCASE DESC, entry_id DESC",
            (EntrySortField::CreatedAt, false) => "entry_created_at ASC, entry_id ASC",
            (EntrySortField::CreatedAt, true) => "entry_created_at DESC, entry_id DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub title: Option<String>,     // case-insensitive substring
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub from: Option<NaiveDate>,   // inclusive
    pub to: Option<NaiveDate>,     // inclusive
}

// SQLite's LOWER() only folds ASCII, so titles are folded here on both sides
fn fold_title(title: &str) -> String {
    title.to_lowercase()
}

fn push_entry_filter(qb: &mut QueryBuilder<'_, Sqlite>, user_id: i64, filter: &EntryFilter) {
    qb.push(" WHERE user_id = ").push_bind(user_id);

    if let Some(title) = &filter.title {
        let escaped = fold_title(title)
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        qb.push(" AND title_folded LIKE ")
            .push_bind(format!("%{}%", escaped))
            .push(" ESCAPE '\\'");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND CAST(price AS REAL) >= CAST(")
            .push_bind(min.to_string())
            .push(" AS REAL)");
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND CAST(price AS REAL) <= CAST(")
            .push_bind(max.to_string())
            .push(" AS REAL)");
    }
    if let Some(from) = filter.from {
        qb.push(" AND entry_date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND entry_date <= ").push_bind(to);
    }
}

pub async fn create_entry(pool: &Pool<Sqlite>, e: &NewEntry<'_>) -> Result<Entry, sqlx::Error> {
    let now = Utc::now();
    let sql = format!(
        r#"
        INSERT INTO entries (user_id, title, title_folded, price, entry_date, entry_created_at, entry_updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING {ENTRY_COLUMNS}
        "#
    );

    let row = sqlx::query(&sql)
        .bind(e.user_id)
        .bind(e.title)
        .bind(fold_title(e.title))
        .bind(e.price.to_string())
        .bind(e.date)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

    entry_from_row(&row)
}

// Only returns the entry when it belongs to `user_id`
pub async fn get_entry(pool: &Pool<Sqlite>, user_id: i64, entry_id: i64) -> Result<Option<Entry>, sqlx::Error> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE entry_id = ? AND user_id = ?");
    sqlx::query(&sql)
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .map(|row| entry_from_row(&row))
        .transpose()
}

pub async fn update_entry(
    pool: &Pool<Sqlite>,
    user_id: i64,
    entry_id: i64,
    title: &str,
    price: Decimal,
    date: NaiveDate,
) -> Result<Option<Entry>, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE entries
        SET title = ?, title_folded = ?, price = ?, entry_date = ?, entry_updated_at = ?
        WHERE entry_id = ? AND user_id = ?
        RETURNING {ENTRY_COLUMNS}
        "#
    );

    sqlx::query(&sql)
        .bind(title)
        .bind(fold_title(title))
        .bind(price.to_string())
        .bind(date)
        .bind(Utc::now())
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .map(|row| entry_from_row(&row))
        .transpose()
}

pub async fn delete_entry(pool: &Pool<Sqlite>, user_id: i64, entry_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM entries WHERE entry_id = ? AND user_id = ?")
        .bind(entry_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Sum of the user's entry prices, leaving out `exclude` (the entry being edited).
/// Saturates at `Decimal::MAX`.
pub async fn sum_entries_excluding(
    pool: &Pool<Sqlite>,
    user_id: i64,
    exclude: Option<i64>,
) -> Result<Decimal, sqlx::Error> {
    let prices: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT price
        FROM entries
        WHERE user_id = ?
          AND (? IS NULL OR entry_id <> ?)
        "#,
    )
    .bind(user_id)
    .bind(exclude)
    .bind(exclude)
    .fetch_all(pool)
    .await?;

    prices
        .iter()
        .try_fold(Decimal::ZERO, |acc, p| Ok(acc.saturating_add(decode_decimal(p, "price")?)))
}

/// One page of the user's entries plus the total number of matches.
pub async fn list_entries(
    pool: &Pool<Sqlite>,
    user_id: i64,
    filter: &EntryFilter,
    sort: EntrySort,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Entry>, i64), sqlx::Error> {
    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM entries");
    push_entry_filter(&mut count_qb, user_id, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {ENTRY_COLUMNS} FROM entries"));
    push_entry_filter(&mut qb, user_id, filter);
    qb.push(" ORDER BY ")
        .push(sort.order_by())
        .push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let entries = qb
        .build()
        .fetch_all(pool)
        .await?
        .iter()
        .map(entry_from_row)
        .collect::<Result<Vec<Entry>, sqlx::Error>>()?;

    Ok((entries, total))
}

// Every entry dated within [from, to], oldest first
pub async fn get_entries_between(
    pool: &Pool<Sqlite>,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Entry>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {ENTRY_COLUMNS}
        FROM entries
        WHERE user_id = ? AND entry_date >= ? AND entry_date <= ?
        ORDER BY entry_date ASC, entry_id ASC
        "#
    );

    sqlx::query(&sql)
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?
        .iter()
        .map(entry_from_row)
        .collect()
}

/*==========Notification Queries=========== */

const NOTIFICATION_COLUMNS: &str = r#"
    notification_id, user_id, message, kind, is_read, notification_created_at
"#;

fn notification_from_row(row: &SqliteRow) -> Result<Notification, sqlx::Error> {
    let kind_text: String = row.try_get("kind")?;
    let kind = NotificationKind::parse(&kind_text)
        .ok_or_else(|| sqlx::Error::Decode(format!("Unknown notification kind: {}", kind_text).into()))?;

    Ok(Notification {
        id: row.try_get("notification_id")?,
        user_id: row.try_get("user_id")?,
        message: row.try_get("message")?,
        kind,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("notification_created_at")?,
    })
}

pub async fn create_notification(
    pool: &Pool<Sqlite>,
    user_id: i64,
    kind: NotificationKind,
    message: &str,
) -> Result<Notification, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO notifications (user_id, message, kind, is_read, notification_created_at)
        VALUES (?, ?, ?, 0, ?)
        RETURNING {NOTIFICATION_COLUMNS}
        "#
    );

    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(message)
        .bind(kind.as_str())
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

    notification_from_row(&row)
}

// Newest first
pub async fn get_notifications_by_user(pool: &Pool<Sqlite>, user_id: i64) -> Result<Vec<Notification>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {NOTIFICATION_COLUMNS}
        FROM notifications
        WHERE user_id = ?
        ORDER BY notification_created_at DESC, notification_id DESC
        "#
    );

    sqlx::query(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?
        .iter()
        .map(notification_from_row)
        .collect()
}

pub async fn count_unread_notifications(pool: &Pool<Sqlite>, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub async fn mark_notification_read(
    pool: &Pool<Sqlite>,
    user_id: i64,
    notification_id: i64,
) -> Result<Option<Notification>, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE notifications
        SET is_read = 1
        WHERE notification_id = ? AND user_id = ?
        RETURNING {NOTIFICATION_COLUMNS}
        "#
    );

    sqlx::query(&sql)
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .map(|row| notification_from_row(&row))
        .transpose()
}

// Returns how many notifications flipped from unread to read
pub async fn mark_all_notifications_read(pool: &Pool<Sqlite>, user_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_notifications_by_user(pool: &Pool<Sqlite>, user_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notifications WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_all_notifications(pool: &Pool<Sqlite>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notifications").execute(pool).await?;
    Ok(result.rows_affected())
}
