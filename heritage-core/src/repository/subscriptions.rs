use crate::ids::UserId;
use crate::model::push::{NewSubscription, PushSubscription, SubscriptionStats};
use crate::result::{RepoResult, SubscriptionRepoError};

#[cfg_attr(feature = "mocks", mockall::automock)]
pub trait SubscriptionRepository {
    /// Inserts the subscription, or replaces keys and owner of an already known endpoint.
    fn upsert(
        &self,
        subscription: NewSubscription,
    ) -> impl Future<Output = RepoResult<PushSubscription, SubscriptionRepoError>> + Send;

    fn remove_endpoint(
        &self,
        endpoint: String,
    ) -> impl Future<Output = RepoResult<u64, SubscriptionRepoError>> + Send;

    fn remove_for_user(
        &self,
        user: UserId,
    ) -> impl Future<Output = RepoResult<u64, SubscriptionRepoError>> + Send;

    fn list_all(
        &self,
    ) -> impl Future<Output = RepoResult<Vec<PushSubscription>, SubscriptionRepoError>> + Send;

    fn list_for_user(
        &self,
        user: UserId,
    ) -> impl Future<Output = RepoResult<Vec<PushSubscription>, SubscriptionRepoError>> + Send;

    fn stats(
        &self,
    ) -> impl Future<Output = RepoResult<SubscriptionStats, SubscriptionRepoError>> + Send;
}
