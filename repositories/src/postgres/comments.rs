use deadpool_postgres::{Object, Pool};
use error_stack::{Report, ResultExt};
use heritage_core::filter::{CommentSort, CommentSortField};
use heritage_core::ids::{CommentId, HeritageId, UserId};
use heritage_core::list_criteria::PageCriteria;
use heritage_core::model::comment::{Comment, CommentStats, NewComment};
use heritage_core::pagination::Page;
use heritage_core::repository::CommentRepository;
use heritage_core::result::{CommentRepoError, OptRepoResult, RepoResult};
use uuid::Uuid;

use crate::postgres::rows::{map_rows, row_to_comment};
use crate::postgres::statements::{self, comments};
use crate::postgres::{RepoInitErr, count, direction, sanitize_pagination};

#[derive(Clone)]
pub struct CommentRepo {
    pool: Pool,
}

impl CommentRepo {
    pub async fn new(pool: Pool) -> Result<Self, Report<RepoInitErr>> {
        let client = pool.get().await.change_context(RepoInitErr("comments"))?;
        statements::verify(&client, comments::ALL)
            .await
            .change_context(RepoInitErr("comments"))?;
        drop(client);

        Ok(Self { pool })
    }

    async fn client(&self, on_err: CommentRepoError) -> RepoResult<Object, CommentRepoError> {
        self.pool.get().await.change_context(on_err)
    }
}

fn order_by(sort: CommentSort) -> String {
    let column = match sort.field {
        CommentSortField::CreatedAt => "c.created",
        CommentSortField::UpdatedAt => "c.updated",
    };
    let direction = direction(sort.order);
    format!(" ORDER BY {column} {direction}, c.id {direction}")
}

impl CommentRepository for CommentRepo {
    async fn list_top_level(
        &self,
        heritage: HeritageId,
        criteria: PageCriteria,
        sort: CommentSort,
    ) -> RepoResult<Page<Comment>, CommentRepoError> {
        let page = sanitize_pagination(&criteria);
        let list_sql = format!(
            "{}{} LIMIT $2 OFFSET $3",
            comments::LIST_TOP_LEVEL,
            order_by(sort)
        );

        let client = self.client(CommentRepoError::List).await?;
        let list = client
            .prepare_cached(&list_sql)
            .await
            .change_context(CommentRepoError::List)
            .attach_with(|| list_sql.clone())?;
        let total = client
            .prepare_cached(comments::COUNT_TOP_LEVEL)
            .await
            .change_context(CommentRepoError::List)?;

        let rows = client
            .query(&list, &[&heritage.0, &page.limit, &page.offset])
            .await
            .change_context(CommentRepoError::List)?;
        let total: i64 = client
            .query_one(&total, &[&heritage.0])
            .await
            .change_context(CommentRepoError::List)?
            .get(0);

        let comments = map_rows(&rows, row_to_comment).change_context(CommentRepoError::List)?;
        Ok(Page::new(comments, count(total)))
    }

    async fn replies_for(&self, parents: Vec<CommentId>) -> RepoResult<Vec<Comment>, CommentRepoError> {
        if parents.is_empty() {
            return Ok(vec![]);
        }

        let parents: Vec<Uuid> = parents.into_iter().map(|p| p.0).collect();

        let client = self.client(CommentRepoError::List).await?;
        let statement = client
            .prepare_cached(comments::REPLIES_FOR)
            .await
            .change_context(CommentRepoError::List)?;
        let rows = client
            .query(&statement, &[&parents])
            .await
            .change_context(CommentRepoError::List)?;

        map_rows(&rows, row_to_comment).change_context(CommentRepoError::List)
    }

    async fn find_active_in_heritage(
        &self,
        id: CommentId,
        heritage: HeritageId,
    ) -> OptRepoResult<Comment, CommentRepoError> {
        let client = self.client(CommentRepoError::Get).await?;
        let statement = client
            .prepare_cached(comments::FIND_ACTIVE_IN_HERITAGE)
            .await
            .change_context(CommentRepoError::Get)?;
        client
            .query_opt(&statement, &[&id.0, &heritage.0])
            .await
            .change_context(CommentRepoError::Get)?
            .map(|row| row_to_comment(&row))
            .transpose()
            .change_context(CommentRepoError::Get)
    }

    async fn exists(&self, id: CommentId) -> RepoResult<bool, CommentRepoError> {
        let client = self.client(CommentRepoError::Get).await?;
        let statement = client
            .prepare_cached(comments::EXISTS)
            .await
            .change_context(CommentRepoError::Get)?;
        let row = client
            .query_one(&statement, &[&id.0])
            .await
            .change_context(CommentRepoError::Get)?;
        Ok(row.get(0))
    }

    async fn list_replies(
        &self,
        parent: CommentId,
        criteria: PageCriteria,
    ) -> RepoResult<Page<Comment>, CommentRepoError> {
        let page = sanitize_pagination(&criteria);

        let client = self.client(CommentRepoError::List).await?;
        let list = client
            .prepare_cached(comments::LIST_REPLIES)
            .await
            .change_context(CommentRepoError::List)?;
        let total = client
            .prepare_cached(comments::COUNT_REPLIES)
            .await
            .change_context(CommentRepoError::List)?;

        let rows = client
            .query(&list, &[&parent.0, &page.limit, &page.offset])
            .await
            .change_context(CommentRepoError::List)?;
        let total: i64 = client
            .query_one(&total, &[&parent.0])
            .await
            .change_context(CommentRepoError::List)?
            .get(0);

        let replies = map_rows(&rows, row_to_comment).change_context(CommentRepoError::List)?;
        Ok(Page::new(replies, count(total)))
    }

    async fn create(&self, comment: NewComment) -> RepoResult<Comment, CommentRepoError> {
        let client = self.client(CommentRepoError::Create).await?;
        let statement = client
            .prepare_cached(comments::CREATE)
            .await
            .change_context(CommentRepoError::Create)?;
        let row = client
            .query_one(
                &statement,
                &[
                    &CommentId::new().0,
                    &comment.user_id.0,
                    &comment.heritage_id.0,
                    &comment.parent_id.map(|p| p.0),
                    &comment.content,
                ],
            )
            .await
            .change_context(CommentRepoError::Create)?;

        row_to_comment(&row).change_context(CommentRepoError::Create)
    }

    async fn update_owned(
        &self,
        id: CommentId,
        user: UserId,
        content: String,
    ) -> OptRepoResult<Comment, CommentRepoError> {
        let client = self.client(CommentRepoError::Update).await?;
        let statement = client
            .prepare_cached(comments::UPDATE_OWNED)
            .await
            .change_context(CommentRepoError::Update)?;
        client
            .query_opt(&statement, &[&id.0, &user.0, &content])
            .await
            .change_context(CommentRepoError::Update)?
            .map(|row| row_to_comment(&row))
            .transpose()
            .change_context(CommentRepoError::Update)
    }

    async fn deactivate_owned(&self, id: CommentId, user: UserId) -> RepoResult<bool, CommentRepoError> {
        let client = self.client(CommentRepoError::Delete).await?;
        let statement = client
            .prepare_cached(comments::DEACTIVATE_OWNED)
            .await
            .change_context(CommentRepoError::Delete)?;
        let updated = client
            .execute(&statement, &[&id.0, &user.0])
            .await
            .change_context(CommentRepoError::Delete)?;
        Ok(updated > 0)
    }

    async fn stats(&self, heritage: HeritageId) -> RepoResult<CommentStats, CommentRepoError> {
        let client = self.client(CommentRepoError::Stats).await?;
        let statement = client
            .prepare_cached(comments::STATS)
            .await
            .change_context(CommentRepoError::Stats)?;
        let row = client
            .query_one(&statement, &[&heritage.0])
            .await
            .change_context(CommentRepoError::Stats)?;

        Ok(CommentStats {
            total_comments: count(row.get("total")),
            top_level_comments: count(row.get("top_level")),
            replies_count: count(row.get("replies")),
        })
    }
}
