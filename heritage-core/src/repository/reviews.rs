use crate::filter::ReviewSort;
use crate::ids::{HeritageId, ReviewId, UserId};
use crate::list_criteria::PageCriteria;
use crate::model::review::{NewReview, RatingDistribution, Review, ReviewSummary, ReviewUpdate};
use crate::pagination::Page;
use crate::result::{OptRepoResult, RepoResult, ReviewRepoError};

#[cfg_attr(feature = "mocks", mockall::automock)]
pub trait ReviewRepository {
    fn list(
        &self,
        heritage: HeritageId,
        criteria: PageCriteria,
        sort: ReviewSort,
    ) -> impl Future<Output = RepoResult<Page<Review>, ReviewRepoError>> + Send;

    fn summary(
        &self,
        heritage: HeritageId,
    ) -> impl Future<Output = RepoResult<ReviewSummary, ReviewRepoError>> + Send;

    fn distribution(
        &self,
        heritage: HeritageId,
    ) -> impl Future<Output = RepoResult<RatingDistribution, ReviewRepoError>> + Send;

    /// The user's active review of the heritage.
    fn find_by_user(
        &self,
        user: UserId,
        heritage: HeritageId,
    ) -> impl Future<Output = OptRepoResult<Review, ReviewRepoError>> + Send;

    /// Whether the user reviewed the heritage, including deactivated reviews.
    fn exists_for(
        &self,
        user: UserId,
        heritage: HeritageId,
    ) -> impl Future<Output = RepoResult<bool, ReviewRepoError>> + Send;

    /// Fails with [`ReviewRepoError::Duplicate`] when the user already reviewed the heritage.
    fn create(
        &self,
        review: NewReview,
    ) -> impl Future<Output = RepoResult<Review, ReviewRepoError>> + Send;

    /// Only touches an active review owned by `user`.
    fn update_owned(
        &self,
        id: ReviewId,
        user: UserId,
        update: ReviewUpdate,
    ) -> impl Future<Output = OptRepoResult<Review, ReviewRepoError>> + Send;

    fn deactivate_owned(
        &self,
        id: ReviewId,
        user: UserId,
    ) -> impl Future<Output = RepoResult<bool, ReviewRepoError>> + Send;
}
