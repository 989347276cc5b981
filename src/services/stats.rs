//! Dashboard and report statistics

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

use crate::{
    error::{AppError, AppResult},
    models::stats::{DashboardStats, Overview, ReportsResponse},
    repository::Repository,
};

const POPULAR_BOOKS_LIMIT: i64 = 5;
const RECENT_RESERVATIONS_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn dashboard(&self) -> AppResult<DashboardStats> {
        self.repository.stats.dashboard().await
    }

    pub async fn reports(&self) -> AppResult<ReportsResponse> {
        let dashboard = self.repository.stats.dashboard().await?;
        let popular_books = self.repository.stats.popular_books(POPULAR_BOOKS_LIMIT).await?;
        let recent_reservations = self
            .repository
            .reservations
            .list_recent(RECENT_RESERVATIONS_LIMIT)
            .await?;
        let categories_stats = self.repository.categories.list_with_counts().await?;

        let (start, end) = month_bounds(Utc::now())?;
        let monthly_stats = self.repository.stats.activity_between(start, end).await?;

        Ok(ReportsResponse {
            overview: Overview::from(&dashboard),
            popular_books,
            recent_reservations,
            categories_stats,
            monthly_stats,
        })
    }
}

/// First instant of the month containing `now` and of the following month
pub fn month_bounds(now: DateTime<Utc>) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let (next_year, next_month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };

    let start = first_instant(now.year(), now.month())?;
    let end = first_instant(next_year, next_month)?;
    Ok((start, end))
}

fn first_instant(year: i32, month: u32) -> AppResult<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok_or_else(|| AppError::Internal(format!("Invalid month {}-{}", year, month)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 2, 17, 15, 4, 5).unwrap();
        let (start, end) = month_bounds(now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_month_bounds_december() {
        let now = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let (start, end) = month_bounds(now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }
}
