use deadpool_postgres::{Object, Pool};
use error_stack::{Report, ResultExt};
use heritage_core::ids::{SubscriptionId, UserId};
use heritage_core::model::push::{NewSubscription, PushSubscription, SubscriptionStats};
use heritage_core::repository::SubscriptionRepository;
use heritage_core::result::{RepoResult, SubscriptionRepoError};

use crate::postgres::rows::row_to_subscription;
use crate::postgres::statements::{self, subscriptions};
use crate::postgres::{RepoInitErr, count};

#[derive(Clone)]
pub struct SubscriptionRepo {
    pool: Pool,
}

impl SubscriptionRepo {
    pub async fn new(pool: Pool) -> Result<Self, Report<RepoInitErr>> {
        let client = pool
            .get()
            .await
            .change_context(RepoInitErr("push subscriptions"))?;
        statements::verify(&client, subscriptions::ALL)
            .await
            .change_context(RepoInitErr("push subscriptions"))?;
        drop(client);

        Ok(Self { pool })
    }

    async fn client(&self, on_err: SubscriptionRepoError) -> RepoResult<Object, SubscriptionRepoError> {
        self.pool.get().await.change_context(on_err)
    }

    async fn remove(
        &self,
        sql: &str,
        key: &(dyn tokio_postgres::types::ToSql + Sync),
    ) -> RepoResult<u64, SubscriptionRepoError> {
        let client = self.client(SubscriptionRepoError::Delete).await?;
        let statement = client
            .prepare_cached(sql)
            .await
            .change_context(SubscriptionRepoError::Delete)?;
        client
            .execute(&statement, &[key])
            .await
            .change_context(SubscriptionRepoError::Delete)
    }
}

impl SubscriptionRepository for SubscriptionRepo {
    async fn upsert(
        &self,
        subscription: NewSubscription,
    ) -> RepoResult<PushSubscription, SubscriptionRepoError> {
        let client = self.client(SubscriptionRepoError::Upsert).await?;
        let statement = client
            .prepare_cached(subscriptions::UPSERT)
            .await
            .change_context(SubscriptionRepoError::Upsert)?;
        let row = client
            .query_one(
                &statement,
                &[
                    &SubscriptionId::new().0,
                    &subscription.endpoint,
                    &subscription.p256dh,
                    &subscription.auth,
                    &subscription.user_id.map(|u| u.0),
                ],
            )
            .await
            .change_context(SubscriptionRepoError::Upsert)?;

        Ok(row_to_subscription(&row))
    }

    async fn remove_endpoint(&self, endpoint: String) -> RepoResult<u64, SubscriptionRepoError> {
        self.remove(subscriptions::REMOVE_ENDPOINT, &endpoint).await
    }

    async fn remove_for_user(&self, user: UserId) -> RepoResult<u64, SubscriptionRepoError> {
        self.remove(subscriptions::REMOVE_FOR_USER, &user.0).await
    }

    async fn list_all(&self) -> RepoResult<Vec<PushSubscription>, SubscriptionRepoError> {
        let client = self.client(SubscriptionRepoError::List).await?;
        let statement = client
            .prepare_cached(subscriptions::LIST_ALL)
            .await
            .change_context(SubscriptionRepoError::List)?;
        let rows = client
            .query(&statement, &[])
            .await
            .change_context(SubscriptionRepoError::List)?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }

    async fn list_for_user(
        &self,
        user: UserId,
    ) -> RepoResult<Vec<PushSubscription>, SubscriptionRepoError> {
        let client = self.client(SubscriptionRepoError::List).await?;
        let statement = client
            .prepare_cached(subscriptions::LIST_FOR_USER)
            .await
            .change_context(SubscriptionRepoError::List)?;
        let rows = client
            .query(&statement, &[&user.0])
            .await
            .change_context(SubscriptionRepoError::List)?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }

    async fn stats(&self) -> RepoResult<SubscriptionStats, SubscriptionRepoError> {
        let client = self.client(SubscriptionRepoError::Stats).await?;
        let statement = client
            .prepare_cached(subscriptions::STATS)
            .await
            .change_context(SubscriptionRepoError::Stats)?;
        let row = client
            .query_one(&statement, &[])
            .await
            .change_context(SubscriptionRepoError::Stats)?;

        Ok(SubscriptionStats {
            total_subscriptions: count(row.get("total")),
            users_with_subscriptions: count(row.get("users")),
        })
    }
}
