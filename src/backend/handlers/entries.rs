use axum::{extract::State, http::StatusCode, Json};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::analysis::{self, AnalysisRange, BudgetAnalysis};
use crate::backend::auth::AuthUser;
use crate::backend::extract::{AppJson, AppPath, AppQuery};
use crate::backend::handlers::notifications::notify;
use crate::backend::validate::{positive_price, required_text};
use crate::backend::AppState;
use crate::database::db::queries::{self, EntryFilter, EntrySort};
use crate::database::models::{Entry, NewEntry, NotificationKind};
use crate::error::{AppError, AppResult};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntriesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub title: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
struct ListPlan {
    sort: EntrySort,
    page: i64,
    limit: i64,
    offset: i64,
}

impl ListEntriesQuery {
    // page/limit/sort checks plus the filter handed to the query layer
    fn plan(&self) -> AppResult<(ListPlan, EntryFilter)> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::Validation("page must be 1 or greater".to_string()));
        }

        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit < 1 {
            return Err(AppError::Validation("limit must be 1 or greater".to_string()));
        }
        let limit = limit.min(MAX_PAGE_SIZE);
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| AppError::Validation("page is too large".to_string()))?;

        let sort = match self.sort.as_deref() {
            None | Some("") => EntrySort::default(),
            Some(s) => EntrySort::parse(s)
                .ok_or_else(|| AppError::Validation(format!("Cannot sort entries by '{s}'")))?,
        };

        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(AppError::Validation("minPrice cannot be greater than maxPrice".to_string()));
            }
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(AppError::Validation("from cannot be after to".to_string()));
            }
        }

        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let filter = EntryFilter {
            title,
            min_price: self.min_price,
            max_price: self.max_price,
            from: self.from,
            to: self.to,
        };

        Ok((
            ListPlan {
                sort,
                page,
                limit,
                offset,
            },
            filter,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct ListEntriesResponse {
    pub results: usize,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
    pub data: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub title: String,
    pub price: Decimal,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntryRequest {
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisQuery {
    pub range: Option<String>,
}

/// Rejects the write when the user's other entries plus `price` would pass the
/// budget limit. Read-then-write: two concurrent writers can both pass.
async fn ensure_within_budget(
    state: &AppState,
    user_id: i64,
    exclude: Option<i64>,
    price: Decimal,
) -> AppResult<()> {
    let user = queries::get_user_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let spent = queries::sum_entries_excluding(&state.db, user_id, exclude).await?;

    debug!(user_id, %spent, %price, limit = %user.budget_limit, "budget check");

    // a sum past Decimal::MAX is over any limit
    let within = spent
        .checked_add(price)
        .is_some_and(|total| total <= user.budget_limit);
    if !within {
        return Err(AppError::OverBudget {
            limit: user.budget_limit,
            attempted: spent.saturating_add(price),
        });
    }
    Ok(())
}

fn entry_not_found() -> AppError {
    AppError::NotFound("No entry found with that ID".to_string())
}

pub async fn list_entries(
    auth: AuthUser,
    State(state): State<AppState>,
    AppQuery(params): AppQuery<ListEntriesQuery>,
) -> AppResult<Json<ListEntriesResponse>> {
    let (plan, filter) = params.plan()?;

    let (entries, total) =
        queries::list_entries(&state.db, auth.id, &filter, plan.sort, plan.limit, plan.offset).await?;

    debug!(user_id = auth.id, title = ?filter.title, total, "listed entries");

    Ok(Json(ListEntriesResponse {
        results: entries.len(),
        total,
        page: plan.page,
        pages: (total + plan.limit - 1) / plan.limit,
        data: entries,
    }))
}

pub async fn create_entry(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEntryRequest>,
) -> AppResult<(StatusCode, Json<Entry>)> {
    let title = required_text(&payload.title, "Title")?;
    let price = positive_price(payload.price)?;

    ensure_within_budget(&state, auth.id, None, price).await?;

    let entry = queries::create_entry(
        &state.db,
        &NewEntry {
            user_id: auth.id,
            title: &title,
            price,
            date: payload.date,
        },
    )
    .await?;

    info!(user_id = auth.id, entry_id = entry.id, "entry created");
    notify(&state, auth.id, NotificationKind::Create, &entry.title).await;

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get_entry(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(entry_id): AppPath<i64>,
) -> AppResult<Json<Entry>> {
    queries::get_entry(&state.db, auth.id, entry_id)
        .await?
        .map(Json)
        .ok_or_else(entry_not_found)
}

pub async fn update_entry(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(entry_id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateEntryRequest>,
) -> AppResult<Json<Entry>> {
    let existing = queries::get_entry(&state.db, auth.id, entry_id)
        .await?
        .ok_or_else(entry_not_found)?;

    let title = match payload.title.as_deref() {
        Some(t) => required_text(t, "Title")?,
        None => existing.title,
    };
    let price = positive_price(payload.price.unwrap_or(existing.price))?;
    let date = payload.date.unwrap_or(existing.date);

    ensure_within_budget(&state, auth.id, Some(entry_id), price).await?;

    let entry = queries::update_entry(&state.db, auth.id, entry_id, &title, price, date)
        .await?
        .ok_or_else(entry_not_found)?;

    info!(user_id = auth.id, entry_id, "entry updated");
    notify(&state, auth.id, NotificationKind::Edit, &entry.title).await;

    Ok(Json(entry))
}

pub async fn delete_entry(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(entry_id): AppPath<i64>,
) -> AppResult<StatusCode> {
    let existing = queries::get_entry(&state.db, auth.id, entry_id)
        .await?
        .ok_or_else(entry_not_found)?;

    if !queries::delete_entry(&state.db, auth.id, entry_id).await? {
        return Err(entry_not_found());
    }

    info!(user_id = auth.id, entry_id, "entry deleted");
    notify(&state, auth.id, NotificationKind::Delete, &existing.title).await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn budget_analysis(
    auth: AuthUser,
    State(state): State<AppState>,
    AppQuery(params): AppQuery<AnalysisQuery>,
) -> AppResult<Json<BudgetAnalysis>> {
    let range = match params.range.as_deref().map(str::trim) {
        None | Some("") => AnalysisRange::LastTwelveMonths,
        Some(s) => AnalysisRange::parse(s).ok_or_else(|| {
            AppError::Validation(format!(
                "Unknown range '{s}'. Use last-month, last-6-months or last-12-months"
            ))
        })?,
    };

    let user = queries::get_user_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let today = Utc::now().date_naive();
    let entries =
        queries::get_entries_between(&state.db, auth.id, range.fetch_from(today), today).await?;

    Ok(Json(analysis::analyze(range, today, user.budget_limit, &entries)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::queries::EntrySortField;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_plan() {
        let (plan, filter) = ListEntriesQuery::default().plan().unwrap();
        assert_eq!(plan.page, 1);
        assert_eq!(plan.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(plan.offset, 0);
        assert_eq!(plan.sort, EntrySort::default());
        assert!(filter.title.is_none());
    }

    #[test]
    fn test_plan_clamps_limit_and_parses_sort() {
        let query = ListEntriesQuery {
            page: Some(3),
            limit: Some(500),
            sort: Some("-price".to_string()),
            title: Some("  coffee ".to_string()),
            ..Default::default()
        };
        let (plan, filter) = query.plan().unwrap();
        assert_eq!(plan.limit, MAX_PAGE_SIZE);
        assert_eq!(plan.offset, 2 * MAX_PAGE_SIZE);
        assert_eq!(plan.sort.field, EntrySortField::Price);
        assert!(plan.sort.descending);
        assert_eq!(filter.title.as_deref(), Some("coffee"));
    }

    #[test]
    fn test_plan_rejects_bad_input() {
        let bad = [
            ListEntriesQuery { page: Some(0), ..Default::default() },
            ListEntriesQuery { limit: Some(0), ..Default::default() },
            ListEntriesQuery { page: Some(i64::MAX), ..Default::default() },
            ListEntriesQuery { page: Some(i64::MAX / 5), limit: Some(20), ..Default::default() },
            ListEntriesQuery { sort: Some("colour".to_string()), ..Default::default() },
            ListEntriesQuery {
                min_price: Some(dec!(10)),
                max_price: Some(dec!(5)),
                ..Default::default()
            },
            ListEntriesQuery {
                from: NaiveDate::from_ymd_opt(2025, 2, 1),
                to: NaiveDate::from_ymd_opt(2025, 1, 1),
                ..Default::default()
            },
        ];
        for query in bad {
            assert!(matches!(query.plan(), Err(AppError::Validation(_))), "{query:?}");
        }
    }
}
