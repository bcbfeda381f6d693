use deadpool_postgres::{Object, Pool};
use error_stack::{Report, ResultExt};
use heritage_core::filter::{ReviewSort, ReviewSortField};
use heritage_core::ids::{HeritageId, ReviewId, UserId};
use heritage_core::list_criteria::PageCriteria;
use heritage_core::model::review::{
    NewReview, RatingDistribution, Review, ReviewSummary, ReviewUpdate,
};
use heritage_core::pagination::Page;
use heritage_core::repository::ReviewRepository;
use heritage_core::result::{OptRepoResult, RepoResult, ReviewRepoError};
use tracing::debug;

use crate::postgres::rows::{map_rows, row_to_review};
use crate::postgres::statements::{self, reviews};
use crate::postgres::{
    RepoInitErr, count, direction, is_unique_violation, sanitize_pagination,
};

#[derive(Clone)]
pub struct ReviewRepo {
    pool: Pool,
}

impl ReviewRepo {
    pub async fn new(pool: Pool) -> Result<Self, Report<RepoInitErr>> {
        let client = pool.get().await.change_context(RepoInitErr("reviews"))?;
        statements::verify(&client, reviews::ALL)
            .await
            .change_context(RepoInitErr("reviews"))?;
        drop(client);

        Ok(Self { pool })
    }

    async fn client(&self, on_err: ReviewRepoError) -> RepoResult<Object, ReviewRepoError> {
        self.pool.get().await.change_context(on_err)
    }
}

fn order_by(sort: ReviewSort) -> String {
    let column = match sort.field {
        ReviewSortField::CreatedAt => "r.created",
        ReviewSortField::UpdatedAt => "r.updated",
        ReviewSortField::Rating => "r.rating",
    };
    let direction = direction(sort.order);
    format!(" ORDER BY {column} {direction}, r.id {direction}")
}

impl ReviewRepository for ReviewRepo {
    async fn list(
        &self,
        heritage: HeritageId,
        criteria: PageCriteria,
        sort: ReviewSort,
    ) -> RepoResult<Page<Review>, ReviewRepoError> {
        let page = sanitize_pagination(&criteria);
        let list_sql = format!("{}{} LIMIT $2 OFFSET $3", reviews::LIST, order_by(sort));

        let client = self.client(ReviewRepoError::List).await?;
        let list = client
            .prepare_cached(&list_sql)
            .await
            .change_context(ReviewRepoError::List)
            .attach_with(|| list_sql.clone())?;
        let total = client
            .prepare_cached(reviews::COUNT)
            .await
            .change_context(ReviewRepoError::List)?;

        let rows = client
            .query(&list, &[&heritage.0, &page.limit, &page.offset])
            .await
            .change_context(ReviewRepoError::List)?;
        let total: i64 = client
            .query_one(&total, &[&heritage.0])
            .await
            .change_context(ReviewRepoError::List)?
            .get(0);

        let reviews = map_rows(&rows, row_to_review).change_context(ReviewRepoError::List)?;
        Ok(Page::new(reviews, count(total)))
    }

    async fn summary(&self, heritage: HeritageId) -> RepoResult<ReviewSummary, ReviewRepoError> {
        let client = self.client(ReviewRepoError::Stats).await?;
        let statement = client
            .prepare_cached(reviews::SUMMARY)
            .await
            .change_context(ReviewRepoError::Stats)?;
        let row = client
            .query_one(&statement, &[&heritage.0])
            .await
            .change_context(ReviewRepoError::Stats)?;

        let total: i64 = row.get("total");
        Ok(ReviewSummary::new(row.get("average"), count(total)))
    }

    async fn distribution(
        &self,
        heritage: HeritageId,
    ) -> RepoResult<RatingDistribution, ReviewRepoError> {
        let client = self.client(ReviewRepoError::Stats).await?;
        let statement = client
            .prepare_cached(reviews::DISTRIBUTION)
            .await
            .change_context(ReviewRepoError::Stats)?;
        let rows = client
            .query(&statement, &[&heritage.0])
            .await
            .change_context(ReviewRepoError::Stats)?;

        Ok(RatingDistribution::from_counts(rows.iter().map(|row| {
            let rating: i16 = row.get("rating");
            let total: i64 = row.get("total");
            (i64::from(rating), count(total))
        })))
    }

    async fn find_by_user(
        &self,
        user: UserId,
        heritage: HeritageId,
    ) -> OptRepoResult<Review, ReviewRepoError> {
        let client = self.client(ReviewRepoError::Get).await?;
        let statement = client
            .prepare_cached(reviews::FIND_BY_USER)
            .await
            .change_context(ReviewRepoError::Get)?;
        client
            .query_opt(&statement, &[&user.0, &heritage.0])
            .await
            .change_context(ReviewRepoError::Get)?
            .map(|row| row_to_review(&row))
            .transpose()
            .change_context(ReviewRepoError::Get)
    }

    async fn exists_for(&self, user: UserId, heritage: HeritageId) -> RepoResult<bool, ReviewRepoError> {
        let client = self.client(ReviewRepoError::Get).await?;
        let statement = client
            .prepare_cached(reviews::EXISTS_FOR)
            .await
            .change_context(ReviewRepoError::Get)?;
        let row = client
            .query_one(&statement, &[&user.0, &heritage.0])
            .await
            .change_context(ReviewRepoError::Get)?;
        Ok(row.get(0))
    }

    async fn create(&self, review: NewReview) -> RepoResult<Review, ReviewRepoError> {
        let client = self.client(ReviewRepoError::Create).await?;
        let statement = client
            .prepare_cached(reviews::CREATE)
            .await
            .change_context(ReviewRepoError::Create)?;

        let result = client
            .query_one(
                &statement,
                &[
                    &ReviewId::new().0,
                    &review.user_id.0,
                    &review.heritage_id.0,
                    &i16::from(review.rating),
                    &review.title,
                    &review.comment,
                ],
            )
            .await;

        match result {
            Ok(row) => row_to_review(&row).change_context(ReviewRepoError::Create),
            Err(e) if is_unique_violation(&e) => {
                debug!(user = %review.user_id, heritage = %review.heritage_id, "duplicate review");
                Err(Report::new(e)).change_context(ReviewRepoError::Duplicate)
            }
            Err(e) => Err(Report::new(e)).change_context(ReviewRepoError::Create),
        }
    }

    async fn update_owned(
        &self,
        id: ReviewId,
        user: UserId,
        update: ReviewUpdate,
    ) -> OptRepoResult<Review, ReviewRepoError> {
        let client = self.client(ReviewRepoError::Update).await?;
        let statement = client
            .prepare_cached(reviews::UPDATE_OWNED)
            .await
            .change_context(ReviewRepoError::Update)?;
        client
            .query_opt(
                &statement,
                &[
                    &id.0,
                    &user.0,
                    &update.rating.map(i16::from),
                    &update.title,
                    &update.comment,
                ],
            )
            .await
            .change_context(ReviewRepoError::Update)?
            .map(|row| row_to_review(&row))
            .transpose()
            .change_context(ReviewRepoError::Update)
    }

    async fn deactivate_owned(&self, id: ReviewId, user: UserId) -> RepoResult<bool, ReviewRepoError> {
        let client = self.client(ReviewRepoError::Delete).await?;
        let statement = client
            .prepare_cached(reviews::DEACTIVATE_OWNED)
            .await
            .change_context(ReviewRepoError::Delete)?;
        let updated = client
            .execute(&statement, &[&id.0, &user.0])
            .await
            .change_context(ReviewRepoError::Delete)?;
        Ok(updated > 0)
    }
}
