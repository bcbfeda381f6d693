use crate::filter::{UserListCriteria, UserSort};
use crate::ids::UserId;
use crate::model::user::{AdminUserUpdate, NewUser, ProfileUpdate, User, UserCredentials};
use crate::pagination::Page;
use crate::result::{OptRepoResult, RepoResult, UserRepoError};

#[cfg_attr(feature = "mocks", mockall::automock)]
pub trait UserRepository {
    fn find(&self, id: UserId) -> impl Future<Output = OptRepoResult<User, UserRepoError>> + Send;

    fn find_credentials_by_email(
        &self,
        email: String,
    ) -> impl Future<Output = OptRepoResult<UserCredentials, UserRepoError>> + Send;

    fn find_credentials(
        &self,
        id: UserId,
    ) -> impl Future<Output = OptRepoResult<UserCredentials, UserRepoError>> + Send;

    /// Matches users in any state, deactivated accounts still own their email and username.
    fn exists_with_email_or_username(
        &self,
        email: String,
        username: String,
    ) -> impl Future<Output = RepoResult<bool, UserRepoError>> + Send;

    fn email_taken_by_other(
        &self,
        email: String,
        id: UserId,
    ) -> impl Future<Output = RepoResult<bool, UserRepoError>> + Send;

    /// Fails with [`UserRepoError::Duplicate`] when the email or username is taken.
    fn create(&self, user: NewUser)
    -> impl Future<Output = RepoResult<User, UserRepoError>> + Send;

    fn record_login(
        &self,
        id: UserId,
    ) -> impl Future<Output = OptRepoResult<User, UserRepoError>> + Send;

    fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> impl Future<Output = OptRepoResult<User, UserRepoError>> + Send;

    fn set_profile_image(
        &self,
        id: UserId,
        path: String,
    ) -> impl Future<Output = OptRepoResult<User, UserRepoError>> + Send;

    fn set_password(
        &self,
        id: UserId,
        password_hash: String,
    ) -> impl Future<Output = RepoResult<bool, UserRepoError>> + Send;

    fn list(
        &self,
        criteria: UserListCriteria,
        sort: UserSort,
    ) -> impl Future<Output = RepoResult<Page<User>, UserRepoError>> + Send;

    /// Fails with [`UserRepoError::Duplicate`] when the new email or username is taken.
    fn admin_update(
        &self,
        id: UserId,
        update: AdminUserUpdate,
    ) -> impl Future<Output = OptRepoResult<User, UserRepoError>> + Send;

    /// Soft delete. `false` when no such user exists.
    fn deactivate(&self, id: UserId) -> impl Future<Output = RepoResult<bool, UserRepoError>> + Send;
}
