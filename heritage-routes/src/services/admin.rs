use std::sync::Arc;

use error_stack::ResultExt;
use heritage_core::HeritageEngine;
use heritage_core::filter::{HeritageListCriteria, HeritageSort, UserListCriteria, UserSort};
use heritage_core::ids::UserId;
use heritage_core::model::heritage::HeritageView;
use heritage_core::model::stats::{ActivityTrends, DashboardStats, HeritageStats, UserStats};
use heritage_core::model::user::{AdminUserUpdate, User};
use heritage_core::repository::{HeritageRepository, StatsRepository, UserRepository};
use tracing::{debug, instrument};

use super::Listing;
use super::auth::is_duplicate;
use crate::error::AdminServiceError;
use crate::{OptServiceResult, ServiceResult};

#[derive(Debug, Clone, PartialEq)]
pub enum AdminUpdateOutcome {
    UserNotFound,
    /// The new email belongs to another user.
    EmailTaken,
    /// The new email or username collided on the unique constraint.
    Duplicate,
    Updated(User),
}

#[derive(Clone)]
pub struct AdminService<T> {
    engine: T,
    base_url: Arc<str>,
}

impl<T> AdminService<T>
where
    T: HeritageEngine,
{
    pub fn new(engine: T, base_url: Arc<str>) -> Self {
        Self { engine, base_url }
    }

    #[instrument(skip_all, name = "service#list_users")]
    pub async fn users(
        &self,
        criteria: UserListCriteria,
        sort: UserSort,
    ) -> ServiceResult<Listing<User>, AdminServiceError> {
        let page = self
            .engine
            .users()
            .list(criteria.clone(), sort)
            .await
            .change_context(AdminServiceError::Users)?;

        Ok(Listing::from_page(page, &criteria))
    }

    #[instrument(skip_all, name = "service#get_user")]
    pub async fn user(&self, id: UserId) -> OptServiceResult<User, AdminServiceError> {
        self.engine
            .users()
            .find(id)
            .await
            .change_context(AdminServiceError::User)
    }

    #[instrument(skip_all, name = "service#update_user")]
    pub async fn update_user(
        &self,
        id: UserId,
        update: AdminUserUpdate,
    ) -> ServiceResult<AdminUpdateOutcome, AdminServiceError> {
        let users = self.engine.users();

        let Some(current) = users
            .find(id)
            .await
            .change_context(AdminServiceError::UpdateUser)?
        else {
            return Ok(AdminUpdateOutcome::UserNotFound);
        };

        if let Some(email) = update.email.as_ref().filter(|e| **e != current.email) {
            let taken = users
                .email_taken_by_other(email.clone(), id)
                .await
                .change_context(AdminServiceError::UpdateUser)?;
            if taken {
                return Ok(AdminUpdateOutcome::EmailTaken);
            }
        }

        match users.admin_update(id, update).await {
            Ok(Some(user)) => Ok(AdminUpdateOutcome::Updated(user)),
            Ok(None) => Ok(AdminUpdateOutcome::UserNotFound),
            Err(e) if is_duplicate(&e) => {
                debug!("admin update of {id} collided on a unique constraint");
                Ok(AdminUpdateOutcome::Duplicate)
            }
            Err(e) => Err(e.change_context(AdminServiceError::UpdateUser)),
        }
    }

    /// Soft delete. `false` when there was no such user.
    #[instrument(skip_all, name = "service#deactivate_user")]
    pub async fn deactivate_user(&self, id: UserId) -> ServiceResult<bool, AdminServiceError> {
        self.engine
            .users()
            .deactivate(id)
            .await
            .change_context(AdminServiceError::DeleteUser)
    }

    #[instrument(skip_all, name = "service#dashboard")]
    pub async fn dashboard(&self) -> ServiceResult<DashboardStats, AdminServiceError> {
        self.engine
            .stats()
            .dashboard()
            .await
            .change_context(AdminServiceError::Dashboard)
    }

    #[instrument(skip_all, name = "service#heritage_management")]
    pub async fn heritage_management(
        &self,
        criteria: HeritageListCriteria,
        sort: HeritageSort,
    ) -> ServiceResult<Listing<HeritageView>, AdminServiceError> {
        let page = self
            .engine
            .heritages()
            .list(criteria.clone(), sort)
            .await
            .change_context(AdminServiceError::HeritageManagement)?;

        Ok(Listing::from_page(page, &criteria).map(|v| v.with_image_urls(&self.base_url)))
    }

    #[instrument(skip_all, name = "service#user_stats")]
    pub async fn user_stats(&self) -> ServiceResult<UserStats, AdminServiceError> {
        self.engine
            .stats()
            .user_stats()
            .await
            .change_context(AdminServiceError::UserStats)
    }

    #[instrument(skip_all, name = "service#heritage_stats")]
    pub async fn heritage_stats(&self) -> ServiceResult<HeritageStats, AdminServiceError> {
        let mut stats = self
            .engine
            .stats()
            .heritage_stats()
            .await
            .change_context(AdminServiceError::HeritageStats)?;

        stats.recent_heritages = stats
            .recent_heritages
            .into_iter()
            .map(|v| v.with_image_urls(&self.base_url))
            .collect();
        Ok(stats)
    }

    #[instrument(skip_all, name = "service#activity_trends")]
    pub async fn activity_trends(&self) -> ServiceResult<ActivityTrends, AdminServiceError> {
        self.engine
            .stats()
            .activity_trends()
            .await
            .change_context(AdminServiceError::ActivityTrends)
    }
}
