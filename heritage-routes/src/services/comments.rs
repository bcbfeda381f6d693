use error_stack::ResultExt;
use heritage_core::HeritageEngine;
use heritage_core::comment_tree::assemble_threads;
use heritage_core::filter::CommentSort;
use heritage_core::ids::{CommentId, HeritageId, UserId};
use heritage_core::list_criteria::PageCriteria;
use heritage_core::model::comment::{Comment, CommentStats, CommentThread, NewComment};
use heritage_core::pagination::Page;
use heritage_core::repository::{CommentRepository, HeritageRepository};
use itertools::Itertools;
use tracing::instrument;

use super::{Found, Listing};
use crate::error::CommentServiceError;
use crate::{OptServiceResult, ServiceResult, metrics};

pub const DEFAULT_COMMENT_PAGE_SIZE: u64 = 20;
pub const DEFAULT_REPLY_PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum CreateCommentOutcome {
    HeritageNotFound,
    ParentNotFound,
    Created(Comment),
}

#[derive(Clone)]
pub struct CommentService<T> {
    engine: T,
}

impl<T> CommentService<T>
where
    T: HeritageEngine,
{
    pub fn new(engine: T) -> Self {
        Self { engine }
    }

    async fn heritage_is_active(
        &self,
        heritage: HeritageId,
        context: CommentServiceError,
    ) -> ServiceResult<bool, CommentServiceError> {
        self.engine
            .heritages()
            .is_active(heritage)
            .await
            .change_context(context)
    }

    /// A page of top level comments, each with its active direct replies.
    #[instrument(skip_all, name = "service#list_comments")]
    pub async fn list(
        &self,
        heritage: HeritageId,
        criteria: PageCriteria,
        sort: CommentSort,
    ) -> ServiceResult<Found<Listing<CommentThread>>, CommentServiceError> {
        if !self
            .heritage_is_active(heritage, CommentServiceError::List)
            .await?
        {
            return Ok(Found::NotFound);
        }

        let comments = self.engine.comments();
        let page = comments
            .list_top_level(heritage, criteria.clone(), sort)
            .await
            .change_context(CommentServiceError::List)?;

        let replies = if page.items.is_empty() {
            Vec::new()
        } else {
            let parents = page.items.iter().map(|c| c.id).collect_vec();
            comments
                .replies_for(parents)
                .await
                .change_context(CommentServiceError::List)?
        };

        let page = Page::new(assemble_threads(page.items, replies), page.total);

        Ok(Found::Yes(Listing::from_page(page, &criteria)))
    }

    #[instrument(skip_all, name = "service#comment_stats")]
    pub async fn stats(
        &self,
        heritage: HeritageId,
    ) -> ServiceResult<Found<CommentStats>, CommentServiceError> {
        if !self
            .heritage_is_active(heritage, CommentServiceError::Stats)
            .await?
        {
            return Ok(Found::NotFound);
        }

        self.engine
            .comments()
            .stats(heritage)
            .await
            .change_context(CommentServiceError::Stats)
            .map(Found::Yes)
    }

    /// Replies must point at an active comment of the same heritage.
    #[instrument(skip_all, name = "service#create_comment")]
    pub async fn create(
        &self,
        comment: NewComment,
    ) -> ServiceResult<CreateCommentOutcome, CommentServiceError> {
        if !self
            .heritage_is_active(comment.heritage_id, CommentServiceError::Create)
            .await?
        {
            return Ok(CreateCommentOutcome::HeritageNotFound);
        }

        let comments = self.engine.comments();
        if let Some(parent) = comment.parent_id {
            let found = comments
                .find_active_in_heritage(parent, comment.heritage_id)
                .await
                .change_context(CommentServiceError::Create)?;
            if found.is_none() {
                return Ok(CreateCommentOutcome::ParentNotFound);
            }
        }

        let created = comments
            .create(comment)
            .await
            .change_context(CommentServiceError::Create)?;

        metrics::increment_comments_created();
        Ok(CreateCommentOutcome::Created(created))
    }

    /// Replies of a comment in any state, so threads stay readable after the parent is deleted.
    #[instrument(skip_all, name = "service#replies")]
    pub async fn replies(
        &self,
        parent: CommentId,
        criteria: PageCriteria,
    ) -> ServiceResult<Found<Listing<Comment>>, CommentServiceError> {
        let comments = self.engine.comments();

        let exists = comments
            .exists(parent)
            .await
            .change_context(CommentServiceError::Replies)?;
        if !exists {
            return Ok(Found::NotFound);
        }

        let page = comments
            .list_replies(parent, criteria.clone())
            .await
            .change_context(CommentServiceError::Replies)?;

        Ok(Found::Yes(Listing::from_page(page, &criteria)))
    }

    #[instrument(skip_all, name = "service#update_comment")]
    pub async fn update(
        &self,
        id: CommentId,
        owner: UserId,
        content: String,
    ) -> OptServiceResult<Comment, CommentServiceError> {
        self.engine
            .comments()
            .update_owned(id, owner, content)
            .await
            .change_context(CommentServiceError::Update)
    }

    #[instrument(skip_all, name = "service#delete_comment")]
    pub async fn delete(
        &self,
        id: CommentId,
        owner: UserId,
    ) -> ServiceResult<bool, CommentServiceError> {
        self.engine
            .comments()
            .deactivate_owned(id, owner)
            .await
            .change_context(CommentServiceError::Delete)
    }
}
