use crate::ids::UserId;
use crate::model::stats::{ActivityTrends, DashboardStats, HeritageStats, UserStatistics, UserStats};
use crate::result::{RepoResult, StatsRepoError};

#[cfg_attr(feature = "mocks", mockall::automock)]
pub trait StatsRepository {
    fn dashboard(&self)
    -> impl Future<Output = RepoResult<DashboardStats, StatsRepoError>> + Send;

    fn user_stats(&self) -> impl Future<Output = RepoResult<UserStats, StatsRepoError>> + Send;

    fn heritage_stats(
        &self,
    ) -> impl Future<Output = RepoResult<HeritageStats, StatsRepoError>> + Send;

    fn activity_trends(
        &self,
    ) -> impl Future<Output = RepoResult<ActivityTrends, StatsRepoError>> + Send;

    fn user_statistics(
        &self,
        user: UserId,
    ) -> impl Future<Output = RepoResult<UserStatistics, StatsRepoError>> + Send;
}
