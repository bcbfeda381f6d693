use std::sync::Arc;

use error_stack::ResultExt;
use heritage_core::HeritageEngine;
use heritage_core::ids::UserId;
use heritage_core::model::saved::SavedHeritageCard;
use heritage_core::model::stats::UserStatistics;
use heritage_core::model::user::User;
use heritage_core::repository::{SavedHeritageRepository, StatsRepository, UserRepository};
use heritage_core::result::SavedRepoError;
use tracing::instrument;

use crate::error::UserServiceError;
use crate::{OptServiceResult, ServiceResult};

/// Number of cards on the dashboard summary.
pub const SAVED_SUMMARY_SIZE: u64 = 3;

#[derive(Clone)]
pub struct UserService<T> {
    engine: T,
    base_url: Arc<str>,
}

impl<T> UserService<T>
where
    T: HeritageEngine,
{
    pub fn new(engine: T, base_url: Arc<str>) -> Self {
        Self { engine, base_url }
    }

    #[instrument(skip_all, name = "service#user_profile")]
    pub async fn profile(&self, id: UserId) -> OptServiceResult<User, UserServiceError> {
        self.engine
            .users()
            .find(id)
            .await
            .change_context(UserServiceError::Profile)
    }

    /// Most recently saved first, every saved heritage when `limit` is `None`.
    #[instrument(skip_all, name = "service#saved_cards")]
    pub async fn saved(
        &self,
        id: UserId,
        limit: Option<u64>,
    ) -> ServiceResult<Vec<SavedHeritageCard>, UserServiceError> {
        self.cards(id, limit, true)
            .await
            .change_context(UserServiceError::Saved)
    }

    #[instrument(skip_all, name = "service#saved_summary")]
    pub async fn saved_summary(
        &self,
        id: UserId,
    ) -> ServiceResult<Vec<SavedHeritageCard>, UserServiceError> {
        self.cards(id, Some(SAVED_SUMMARY_SIZE), false)
            .await
            .change_context(UserServiceError::SavedSummary)
    }

    async fn cards(
        &self,
        id: UserId,
        limit: Option<u64>,
        with_description: bool,
    ) -> ServiceResult<Vec<SavedHeritageCard>, SavedRepoError> {
        let saved = self.engine.saved().list_recent(id, limit).await?;

        Ok(saved
            .into_iter()
            .map(|mut s| {
                s.heritage = s.heritage.with_image_urls(&self.base_url);
                SavedHeritageCard::from_saved(&s, with_description)
            })
            .collect())
    }

    #[instrument(skip_all, name = "service#user_statistics")]
    pub async fn statistics(&self, id: UserId) -> ServiceResult<UserStatistics, UserServiceError> {
        self.engine
            .stats()
            .user_statistics(id)
            .await
            .change_context(UserServiceError::Statistics)
    }
}
