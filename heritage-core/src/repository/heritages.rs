use crate::filter::{HeritageListCriteria, HeritageSort};
use crate::ids::{HeritageId, UserId};
use crate::model::heritage::{FilterOptions, HeritageUpdate, HeritageView, NewHeritage, NewImage};
use crate::pagination::Page;
use crate::result::{HeritageRepoError, OptRepoResult, RepoResult};

#[cfg_attr(feature = "mocks", mockall::automock)]
pub trait HeritageRepository {
    /// Active heritages matching every filter, each with its primary image and creator.
    fn list(
        &self,
        criteria: HeritageListCriteria,
        sort: HeritageSort,
    ) -> impl Future<Output = RepoResult<Page<HeritageView>, HeritageRepoError>> + Send;

    /// An active heritage with all of its images, primary first then oldest first.
    fn find_active(
        &self,
        id: HeritageId,
    ) -> impl Future<Output = OptRepoResult<HeritageView, HeritageRepoError>> + Send;

    fn is_active(
        &self,
        id: HeritageId,
    ) -> impl Future<Output = RepoResult<bool, HeritageRepoError>> + Send;

    /// Writes the heritage and its images in one transaction.
    fn create(
        &self,
        heritage: NewHeritage,
        images: Vec<NewImage>,
    ) -> impl Future<Output = RepoResult<HeritageView, HeritageRepoError>> + Send;

    /// Applies the update and appends the images in one transaction.
    fn update(
        &self,
        id: HeritageId,
        update: HeritageUpdate,
        images: Vec<NewImage>,
    ) -> impl Future<Output = OptRepoResult<HeritageView, HeritageRepoError>> + Send;

    fn deactivate(
        &self,
        id: HeritageId,
    ) -> impl Future<Output = RepoResult<bool, HeritageRepoError>> + Send;

    fn filter_options(
        &self,
    ) -> impl Future<Output = RepoResult<FilterOptions, HeritageRepoError>> + Send;

    fn list_created_by(
        &self,
        user: UserId,
    ) -> impl Future<Output = RepoResult<Vec<HeritageView>, HeritageRepoError>> + Send;
}
