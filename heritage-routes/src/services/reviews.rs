use error_stack::ResultExt;
use heritage_core::HeritageEngine;
use heritage_core::filter::ReviewSort;
use heritage_core::ids::{HeritageId, ReviewId, UserId};
use heritage_core::list_criteria::PageCriteria;
use heritage_core::model::review::{NewReview, Review, ReviewStats, ReviewSummary, ReviewUpdate};
use heritage_core::repository::{HeritageRepository, ReviewRepository};
use heritage_core::result::ReviewRepoError;
use tracing::{debug, instrument};

use super::{Found, Listing};
use crate::error::ReviewServiceError;
use crate::{OptServiceResult, ServiceResult, metrics};

pub const DEFAULT_REVIEW_PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewListing {
    pub reviews: Listing<Review>,
    pub summary: ReviewSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateReviewOutcome {
    HeritageNotFound,
    AlreadyReviewed,
    Created(Review),
}

#[derive(Clone)]
pub struct ReviewService<T> {
    engine: T,
}

impl<T> ReviewService<T>
where
    T: HeritageEngine,
{
    pub fn new(engine: T) -> Self {
        Self { engine }
    }

    async fn heritage_is_active(
        &self,
        heritage: HeritageId,
        context: ReviewServiceError,
    ) -> ServiceResult<bool, ReviewServiceError> {
        self.engine
            .heritages()
            .is_active(heritage)
            .await
            .change_context(context)
    }

    #[instrument(skip_all, name = "service#list_reviews")]
    pub async fn list(
        &self,
        heritage: HeritageId,
        criteria: PageCriteria,
        sort: ReviewSort,
    ) -> ServiceResult<Found<ReviewListing>, ReviewServiceError> {
        if !self
            .heritage_is_active(heritage, ReviewServiceError::List)
            .await?
        {
            return Ok(Found::NotFound);
        }

        let reviews = self.engine.reviews();
        let (page, summary) = tokio::try_join!(
            async {
                reviews
                    .list(heritage, criteria.clone(), sort)
                    .await
                    .change_context(ReviewServiceError::List)
            },
            async {
                reviews
                    .summary(heritage)
                    .await
                    .change_context(ReviewServiceError::List)
            },
        )?;

        Ok(Found::Yes(ReviewListing {
            reviews: Listing::from_page(page, &criteria),
            summary,
        }))
    }

    #[instrument(skip_all, name = "service#review_stats")]
    pub async fn stats(
        &self,
        heritage: HeritageId,
    ) -> ServiceResult<Found<ReviewStats>, ReviewServiceError> {
        if !self
            .heritage_is_active(heritage, ReviewServiceError::Stats)
            .await?
        {
            return Ok(Found::NotFound);
        }

        let reviews = self.engine.reviews();
        let (summary, distribution) = tokio::try_join!(
            async {
                reviews
                    .summary(heritage)
                    .await
                    .change_context(ReviewServiceError::Stats)
            },
            async {
                reviews
                    .distribution(heritage)
                    .await
                    .change_context(ReviewServiceError::Stats)
            },
        )?;

        Ok(Found::Yes(ReviewStats {
            average_rating: summary.average_rating,
            total_reviews: summary.total_reviews,
            rating_distribution: distribution,
        }))
    }

    #[instrument(skip_all, name = "service#my_review")]
    pub async fn mine(
        &self,
        user: UserId,
        heritage: HeritageId,
    ) -> OptServiceResult<Review, ReviewServiceError> {
        self.engine
            .reviews()
            .find_by_user(user, heritage)
            .await
            .change_context(ReviewServiceError::Mine)
    }

    /// At most one review per user and heritage. A lost race on the unique constraint is
    /// reported the same way as the pre-check.
    #[instrument(skip_all, name = "service#create_review")]
    pub async fn create(
        &self,
        review: NewReview,
    ) -> ServiceResult<CreateReviewOutcome, ReviewServiceError> {
        if !self
            .heritage_is_active(review.heritage_id, ReviewServiceError::Create)
            .await?
        {
            return Ok(CreateReviewOutcome::HeritageNotFound);
        }

        let reviews = self.engine.reviews();
        let exists = reviews
            .exists_for(review.user_id, review.heritage_id)
            .await
            .change_context(ReviewServiceError::Create)?;
        if exists {
            return Ok(CreateReviewOutcome::AlreadyReviewed);
        }

        match reviews.create(review).await {
            Ok(review) => {
                metrics::increment_reviews_created();
                Ok(CreateReviewOutcome::Created(review))
            }
            Err(e) if matches!(e.current_context(), ReviewRepoError::Duplicate) => {
                debug!("lost review race on unique constraint");
                Ok(CreateReviewOutcome::AlreadyReviewed)
            }
            Err(e) => Err(e.change_context(ReviewServiceError::Create)),
        }
    }

    /// `None` when the review does not exist, is inactive or belongs to someone else.
    #[instrument(skip_all, name = "service#update_review")]
    pub async fn update(
        &self,
        id: ReviewId,
        owner: UserId,
        update: ReviewUpdate,
    ) -> OptServiceResult<Review, ReviewServiceError> {
        self.engine
            .reviews()
            .update_owned(id, owner, update)
            .await
            .change_context(ReviewServiceError::Update)
    }

    #[instrument(skip_all, name = "service#delete_review")]
    pub async fn delete(&self, id: ReviewId, owner: UserId) -> ServiceResult<bool, ReviewServiceError> {
        self.engine
            .reviews()
            .deactivate_owned(id, owner)
            .await
            .change_context(ReviewServiceError::Delete)
    }
}
