//! Dashboard aggregates. Independent queries of one report run concurrently, each on its own
//! pooled connection.

use chrono::NaiveDate;
use deadpool_postgres::Pool;
use error_stack::{Report, ResultExt};
use heritage_core::ids::{HeritageId, UserId};
use heritage_core::model::stats::{
    ActivityTrends, CategoryCount, DashboardStats, DayCount, HeritageRef, HeritageStats,
    MonthCount, MostSavedHeritage, PopularSite, RoleCount, UserStatistics, UserStats,
};
use heritage_core::repository::StatsRepository;
use heritage_core::result::{RepoResult, StatsRepoError};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use crate::postgres::rows::{
    RowResult, map_rows, parse_category, parse_role, row_to_heritage_view,
};
use crate::postgres::statements::{self, stats};
use crate::postgres::{RepoInitErr, count};

#[derive(Clone)]
pub struct StatsRepo {
    pool: Pool,
}

impl StatsRepo {
    pub async fn new(pool: Pool) -> Result<Self, Report<RepoInitErr>> {
        let client = pool.get().await.change_context(RepoInitErr("stats"))?;
        statements::verify(&client, stats::ALL)
            .await
            .change_context(RepoInitErr("stats"))?;
        drop(client);

        Ok(Self { pool })
    }

    async fn rows(
        &self,
        sql: &'static str,
        params: &[&(dyn ToSql + Sync)],
        on_err: StatsRepoError,
    ) -> RepoResult<Vec<Row>, StatsRepoError> {
        let client = self.pool.get().await.change_context(on_err)?;
        let statement = client.prepare_cached(sql).await.change_context(on_err)?;
        client
            .query(&statement, params)
            .await
            .change_context(on_err)
            .attach_with(|| format!("statement: {sql}"))
    }

    async fn count(&self, sql: &'static str, on_err: StatsRepoError) -> RepoResult<u64, StatsRepoError> {
        let client = self.pool.get().await.change_context(on_err)?;
        let statement = client.prepare_cached(sql).await.change_context(on_err)?;
        let total: i64 = client
            .query_one(&statement, &[])
            .await
            .change_context(on_err)
            .attach_with(|| format!("statement: {sql}"))?
            .get(0);
        Ok(count(total))
    }

    async fn role_distribution(&self, on_err: StatsRepoError) -> RepoResult<Vec<RoleCount>, StatsRepoError> {
        let rows = self.rows(stats::ROLE_DISTRIBUTION, &[], on_err).await?;
        map_rows(&rows, |row| {
            Ok(RoleCount {
                role: parse_role(row.get("role"))?,
                count: count(row.get("total")),
            })
        })
        .change_context(on_err)
    }

    async fn category_distribution(
        &self,
        on_err: StatsRepoError,
    ) -> RepoResult<Vec<CategoryCount>, StatsRepoError> {
        let rows = self.rows(stats::CATEGORY_DISTRIBUTION, &[], on_err).await?;
        map_rows(&rows, |row| {
            Ok(CategoryCount {
                category: parse_category(row.get("category"))?,
                count: count(row.get("total")),
            })
        })
        .change_context(on_err)
    }

    async fn monthly_registrations(
        &self,
        on_err: StatsRepoError,
    ) -> RepoResult<Vec<MonthCount>, StatsRepoError> {
        let rows = self.rows(stats::MONTHLY_REGISTRATIONS, &[], on_err).await?;
        Ok(rows
            .iter()
            .map(|row| MonthCount {
                month: row.get("month"),
                count: count(row.get("total")),
            })
            .collect())
    }

    async fn daily(&self, sql: &'static str) -> RepoResult<Vec<DayCount>, StatsRepoError> {
        let rows = self.rows(sql, &[], StatsRepoError::Activity).await?;
        Ok(rows.iter().map(row_to_day_count).collect())
    }
}

fn row_to_day_count(row: &Row) -> DayCount {
    let date: NaiveDate = row.get("day");
    DayCount {
        date,
        count: count(row.get("total")),
    }
}

fn row_to_most_saved(row: &Row) -> MostSavedHeritage {
    let id = HeritageId(row.get("id"));
    MostSavedHeritage {
        heritage_id: id,
        save_count: count(row.get("total")),
        heritage: HeritageRef {
            id,
            name: row.get("name"),
            location: row.get("location"),
        },
    }
}

fn row_to_popular_site(row: &Row) -> RowResult<PopularSite> {
    Ok(PopularSite {
        id: HeritageId(row.get("id")),
        name: row.get("name"),
        location: row.get("location"),
        category: parse_category(row.get("category"))?,
        save_count: count(row.get("total")),
    })
}

impl StatsRepository for StatsRepo {
    async fn dashboard(&self) -> RepoResult<DashboardStats, StatsRepoError> {
        let on_err = StatsRepoError::Dashboard;
        let (
            total_users,
            total_heritages,
            total_bookings,
            total_saved,
            active_users_today,
            role_distribution,
            category_distribution,
            monthly_registrations,
        ) = tokio::try_join!(
            self.count(stats::TOTAL_USERS, on_err),
            self.count(stats::TOTAL_HERITAGES, on_err),
            self.count(stats::TOTAL_BOOKINGS, on_err),
            self.count(stats::TOTAL_SAVED, on_err),
            self.count(stats::ACTIVE_USERS_TODAY, on_err),
            self.role_distribution(on_err),
            self.category_distribution(on_err),
            self.monthly_registrations(on_err),
        )?;

        Ok(DashboardStats {
            total_users,
            total_heritages,
            total_bookings,
            total_saved,
            active_users_today,
            role_distribution,
            category_distribution,
            monthly_registrations,
        })
    }

    async fn user_stats(&self) -> RepoResult<UserStats, StatsRepoError> {
        let on_err = StatsRepoError::Users;
        let (
            total_users,
            active_users_today,
            role_distribution,
            new_registrations,
            monthly_registrations,
        ) = tokio::try_join!(
            self.count(stats::TOTAL_USERS, on_err),
            self.count(stats::ACTIVE_USERS_TODAY, on_err),
            self.role_distribution(on_err),
            self.count(stats::NEW_REGISTRATIONS, on_err),
            self.monthly_registrations(on_err),
        )?;

        Ok(UserStats {
            total_users,
            active_users_today,
            role_distribution,
            new_registrations,
            monthly_registrations,
        })
    }

    async fn heritage_stats(&self) -> RepoResult<HeritageStats, StatsRepoError> {
        let on_err = StatsRepoError::Heritages;
        let (total_heritages, recent, category_distribution, most_saved, featured_count) =
            tokio::try_join!(
                self.count(stats::TOTAL_HERITAGES, on_err),
                self.rows(stats::RECENT_HERITAGES, &[], on_err),
                self.category_distribution(on_err),
                self.rows(stats::MOST_SAVED, &[], on_err),
                self.count(stats::FEATURED_COUNT, on_err),
            )?;

        Ok(HeritageStats {
            total_heritages,
            recent_heritages: map_rows(&recent, row_to_heritage_view).change_context(on_err)?,
            category_distribution,
            most_saved_heritage: most_saved.first().map(row_to_most_saved),
            featured_count,
        })
    }

    async fn activity_trends(&self) -> RepoResult<ActivityTrends, StatsRepoError> {
        let (daily_registrations, daily_logins, daily_saves) = tokio::try_join!(
            self.daily(stats::DAILY_REGISTRATIONS),
            self.daily(stats::DAILY_LOGINS),
            self.daily(stats::DAILY_SAVES),
        )?;

        Ok(ActivityTrends {
            daily_registrations,
            daily_logins,
            daily_saves,
        })
    }

    async fn user_statistics(&self, user: UserId) -> RepoResult<UserStatistics, StatsRepoError> {
        let on_err = StatsRepoError::UserActivity;
        let user_param: &[&(dyn ToSql + Sync)] = &[&user.0];
        let (saved, total_heritages, popular) = tokio::try_join!(
            self.rows(stats::USER_SAVED_COUNT, user_param, on_err),
            self.count(stats::TOTAL_HERITAGES, on_err),
            self.rows(stats::POPULAR_SITES, &[], on_err),
        )?;

        let saved_count = saved
            .first()
            .map(|row| count(row.get(0)))
            .unwrap_or_default();

        Ok(UserStatistics {
            saved_count,
            visited_count: 0,
            total_heritages,
            popular_sites: map_rows(&popular, row_to_popular_site).change_context(on_err)?,
        })
    }
}
