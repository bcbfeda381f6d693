use crate::filter::CommentSort;
use crate::ids::{CommentId, HeritageId, UserId};
use crate::list_criteria::PageCriteria;
use crate::model::comment::{Comment, CommentStats, NewComment};
use crate::pagination::Page;
use crate::result::{CommentRepoError, OptRepoResult, RepoResult};

#[cfg_attr(feature = "mocks", mockall::automock)]
pub trait CommentRepository {
    /// Active comments without a parent.
    fn list_top_level(
        &self,
        heritage: HeritageId,
        criteria: PageCriteria,
        sort: CommentSort,
    ) -> impl Future<Output = RepoResult<Page<Comment>, CommentRepoError>> + Send;

    /// Active replies to any of `parents`, oldest first.
    fn replies_for(
        &self,
        parents: Vec<CommentId>,
    ) -> impl Future<Output = RepoResult<Vec<Comment>, CommentRepoError>> + Send;

    fn find_active_in_heritage(
        &self,
        id: CommentId,
        heritage: HeritageId,
    ) -> impl Future<Output = OptRepoResult<Comment, CommentRepoError>> + Send;

    /// Existence in any state.
    fn exists(&self, id: CommentId)
    -> impl Future<Output = RepoResult<bool, CommentRepoError>> + Send;

    /// Active replies of one comment, oldest first.
    fn list_replies(
        &self,
        parent: CommentId,
        criteria: PageCriteria,
    ) -> impl Future<Output = RepoResult<Page<Comment>, CommentRepoError>> + Send;

    fn create(
        &self,
        comment: NewComment,
    ) -> impl Future<Output = RepoResult<Comment, CommentRepoError>> + Send;

    /// Only touches an active comment owned by `user`.
    fn update_owned(
        &self,
        id: CommentId,
        user: UserId,
        content: String,
    ) -> impl Future<Output = OptRepoResult<Comment, CommentRepoError>> + Send;

    fn deactivate_owned(
        &self,
        id: CommentId,
        user: UserId,
    ) -> impl Future<Output = RepoResult<bool, CommentRepoError>> + Send;

    fn stats(
        &self,
        heritage: HeritageId,
    ) -> impl Future<Output = RepoResult<CommentStats, CommentRepoError>> + Send;
}
