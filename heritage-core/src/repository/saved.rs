use crate::ids::{HeritageId, UserId};
use crate::list_criteria::PageCriteria;
use crate::model::saved::SavedHeritage;
use crate::pagination::Page;
use crate::result::{RepoResult, SavedRepoError};

#[cfg_attr(feature = "mocks", mockall::automock)]
pub trait SavedHeritageRepository {
    fn is_saved(
        &self,
        user: UserId,
        heritage: HeritageId,
    ) -> impl Future<Output = RepoResult<bool, SavedRepoError>> + Send;

    /// Removes the bookmark if present, otherwise adds it. Returns whether it is saved now.
    fn toggle(
        &self,
        user: UserId,
        heritage: HeritageId,
    ) -> impl Future<Output = RepoResult<bool, SavedRepoError>> + Send;

    fn list_page(
        &self,
        user: UserId,
        criteria: PageCriteria,
    ) -> impl Future<Output = RepoResult<Page<SavedHeritage>, SavedRepoError>> + Send;

    /// Most recently saved first. All of them when `limit` is `None`.
    fn list_recent(
        &self,
        user: UserId,
        limit: Option<u64>,
    ) -> impl Future<Output = RepoResult<Vec<SavedHeritage>, SavedRepoError>> + Send;
}
