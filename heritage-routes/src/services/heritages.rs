use std::sync::Arc;

use error_stack::ResultExt;
use heritage_core::HeritageEngine;
use heritage_core::filter::{DEFAULT_HERITAGE_PAGE_SIZE, HeritageListCriteria, HeritageSort};
use heritage_core::ids::{HeritageId, UserId};
use heritage_core::list_criteria::PageCriteria;
use heritage_core::model::comment::CommentStats;
use heritage_core::model::heritage::{
    CategoryInfo, Category, FilterOptions, HeritageUpdate, HeritageView, NewHeritage, NewImage,
    short_description,
};
use heritage_core::model::review::ReviewSummary;
use heritage_core::model::saved::SavedHeritage;
use heritage_core::pagination::Pagination;
use heritage_core::repository::{
    CommentRepository, HeritageRepository, ReviewRepository, SavedHeritageRepository,
};
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::{Listing, NotificationService};
use crate::error::HeritageServiceError;
use crate::notifications::{NotificationPayload, PushSender};
use crate::uploads::{StoredFile, UploadStore};
use crate::{OptServiceResult, ServiceResult, metrics};

pub const NEW_HERITAGE_TITLE: &str = "New Heritage Site Added!";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeritageDetail {
    pub heritage: HeritageView,
    pub is_saved: bool,
    pub review_stats: ReviewSummary,
    pub comment_stats: CommentStats,
}

/// A heritage as submitted by an admin, before defaults are applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeritageDraft {
    pub name: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub location: String,
    pub category: Category,
    pub historical_period: Option<String>,
    pub built_year: Option<i32>,
    pub architect: Option<String>,
    pub significance: Option<String>,
    pub visiting_hours: Option<String>,
    pub entry_fee: Option<f64>,
    pub accessibility: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub featured: bool,
}

impl HeritageDraft {
    fn into_new_heritage(self, created_by: UserId) -> NewHeritage {
        let short = self
            .short_description
            .or_else(|| self.description.as_deref().map(short_description));

        NewHeritage {
            name: self.name,
            long_description: self.description.clone(),
            description: self.description,
            short_description: short,
            location: self.location,
            category: self.category,
            historical_period: self.historical_period,
            built_year: self.built_year,
            architect: self.architect,
            significance: self.significance,
            opening_hours: self.visiting_hours.clone(),
            visiting_hours: self.visiting_hours,
            entry_fee: self.entry_fee,
            accessibility: self.accessibility,
            latitude: self.latitude,
            longitude: self.longitude,
            featured: self.featured,
            created_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleSaveOutcome {
    HeritageNotFound,
    Toggled { is_saved: bool },
}

/// Image rows for freshly stored files. The first file becomes primary when `first_is_primary`.
pub fn new_images(
    files: &[StoredFile],
    captions: &[String],
    first_is_primary: bool,
    uploaded_by: UserId,
) -> Vec<NewImage> {
    files
        .iter()
        .enumerate()
        .map(|(i, file)| NewImage {
            filename: file.filename.clone(),
            original_name: file.original_name.clone(),
            path: file.path.clone(),
            size: file.size,
            mime_type: file.mime_type.clone(),
            is_primary: first_is_primary && i == 0,
            caption: captions
                .get(i)
                .filter(|c| !c.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| format!("Image {}", i + 1)),
            uploaded_by,
        })
        .collect()
}

#[derive(Clone)]
pub struct HeritageService<T, P> {
    engine: T,
    base_url: Arc<str>,
    uploads: UploadStore,
    notifications: NotificationService<T, P>,
}

impl<T, P> HeritageService<T, P>
where
    T: HeritageEngine,
    P: PushSender,
{
    pub fn new(
        engine: T,
        base_url: Arc<str>,
        uploads: UploadStore,
        notifications: NotificationService<T, P>,
    ) -> Self {
        Self {
            engine,
            base_url,
            uploads,
            notifications,
        }
    }

    fn with_urls(&self, view: HeritageView) -> HeritageView {
        view.with_image_urls(&self.base_url)
    }

    #[instrument(skip_all, name = "service#list_heritages")]
    pub async fn list(
        &self,
        criteria: HeritageListCriteria,
        sort: HeritageSort,
    ) -> ServiceResult<Listing<HeritageView>, HeritageServiceError> {
        let page = self
            .engine
            .heritages()
            .list(criteria.clone(), sort)
            .await
            .change_context(HeritageServiceError::List)?;

        metrics::increment_heritages_retrieved_by(page.items.len());
        Ok(Listing::from_page(page, &criteria).map(|v| self.with_urls(v)))
    }

    /// `is_saved` is only ever true for a signed in `viewer`.
    #[instrument(skip_all, name = "service#heritage_detail")]
    pub async fn detail(
        &self,
        id: HeritageId,
        viewer: Option<UserId>,
    ) -> OptServiceResult<HeritageDetail, HeritageServiceError> {
        let Some(heritage) = self
            .engine
            .heritages()
            .find_active(id)
            .await
            .change_context(HeritageServiceError::Get)?
        else {
            return Ok(None);
        };

        let is_saved = async {
            match viewer {
                Some(user) => self
                    .engine
                    .saved()
                    .is_saved(user, id)
                    .await
                    .change_context(HeritageServiceError::Get),
                None => Ok(false),
            }
        };
        let review_stats = async {
            self.engine
                .reviews()
                .summary(id)
                .await
                .change_context(HeritageServiceError::Get)
        };
        let comment_stats = async {
            self.engine
                .comments()
                .stats(id)
                .await
                .change_context(HeritageServiceError::Get)
        };

        let (is_saved, review_stats, comment_stats) =
            tokio::try_join!(is_saved, review_stats, comment_stats)?;

        metrics::increment_heritages_retrieved();
        Ok(Some(HeritageDetail {
            heritage: self.with_urls(heritage),
            is_saved,
            review_stats,
            comment_stats,
        }))
    }

    pub fn categories(&self) -> Vec<CategoryInfo> {
        Category::catalogue()
    }

    #[instrument(skip_all, name = "service#filter_options")]
    pub async fn filter_options(&self) -> ServiceResult<FilterOptions, HeritageServiceError> {
        self.engine
            .heritages()
            .filter_options()
            .await
            .change_context(HeritageServiceError::FilterOptions)
    }

    #[instrument(skip_all, name = "service#toggle_save")]
    pub async fn toggle_save(
        &self,
        user: UserId,
        heritage: HeritageId,
    ) -> ServiceResult<ToggleSaveOutcome, HeritageServiceError> {
        let active = self
            .engine
            .heritages()
            .is_active(heritage)
            .await
            .change_context(HeritageServiceError::ToggleSave)?;
        if !active {
            return Ok(ToggleSaveOutcome::HeritageNotFound);
        }

        let is_saved = self
            .engine
            .saved()
            .toggle(user, heritage)
            .await
            .change_context(HeritageServiceError::ToggleSave)?;

        Ok(ToggleSaveOutcome::Toggled { is_saved })
    }

    #[instrument(skip_all, name = "service#saved_heritages")]
    pub async fn saved(
        &self,
        user: UserId,
        pagination: Pagination,
    ) -> ServiceResult<Listing<SavedHeritage>, HeritageServiceError> {
        let criteria = PageCriteria::new(pagination, DEFAULT_HERITAGE_PAGE_SIZE);
        let page = self
            .engine
            .saved()
            .list_page(user, criteria.clone())
            .await
            .change_context(HeritageServiceError::Saved)?;

        Ok(Listing::from_page(page, &criteria).map(|mut saved| {
            saved.heritage = self.with_urls(saved.heritage);
            saved
        }))
    }

    /// Writes the heritage with its images and announces it to every push subscriber.
    #[instrument(skip_all, name = "service#create_heritage")]
    pub async fn create(
        &self,
        draft: HeritageDraft,
        files: Vec<StoredFile>,
        captions: Vec<String>,
        created_by: UserId,
    ) -> ServiceResult<HeritageView, HeritageServiceError> {
        let images = new_images(&files, &captions, true, created_by);

        let created = self
            .engine
            .heritages()
            .create(draft.into_new_heritage(created_by), images)
            .await
            .change_context(HeritageServiceError::Create);

        let view = match created {
            Ok(view) => self.with_urls(view),
            Err(e) => {
                self.uploads.discard(&files).await;
                return Err(e);
            }
        };

        metrics::increment_heritages_created();
        debug!("announcing heritage {}", view.heritage.id);
        self.notifications.broadcast_in_background(announcement(&view));

        Ok(view)
    }

    /// New images are appended. The first of them becomes primary only when the heritage has
    /// no images yet.
    #[instrument(skip_all, name = "service#update_heritage")]
    pub async fn update(
        &self,
        id: HeritageId,
        update: HeritageUpdate,
        files: Vec<StoredFile>,
        captions: Vec<String>,
        updated_by: UserId,
    ) -> OptServiceResult<HeritageView, HeritageServiceError> {
        let result = self.apply_update(id, update, &files, captions, updated_by).await;

        if !matches!(result, Ok(Some(_))) {
            self.uploads.discard(&files).await;
        }
        result
    }

    async fn apply_update(
        &self,
        id: HeritageId,
        update: HeritageUpdate,
        files: &[StoredFile],
        captions: Vec<String>,
        updated_by: UserId,
    ) -> OptServiceResult<HeritageView, HeritageServiceError> {
        let heritages = self.engine.heritages();

        let Some(current) = heritages
            .find_active(id)
            .await
            .change_context(HeritageServiceError::Update)?
        else {
            return Ok(None);
        };

        let images = new_images(files, &captions, current.images.is_empty(), updated_by);
        let updated = heritages
            .update(id, update, images)
            .await
            .change_context(HeritageServiceError::Update)?;

        if updated.is_some() {
            metrics::increment_heritages_updated();
        }
        Ok(updated.map(|v| self.with_urls(v)))
    }

    /// Soft delete. `false` when there was no such heritage.
    #[instrument(skip_all, name = "service#delete_heritage")]
    pub async fn delete(&self, id: HeritageId) -> ServiceResult<bool, HeritageServiceError> {
        let deleted = self
            .engine
            .heritages()
            .deactivate(id)
            .await
            .change_context(HeritageServiceError::Delete)?;

        if deleted {
            metrics::increment_heritages_deleted();
        }
        Ok(deleted)
    }
}

fn announcement(view: &HeritageView) -> NotificationPayload {
    let heritage = &view.heritage;
    NotificationPayload::new(
        NEW_HERITAGE_TITLE.to_owned(),
        format!(
            "Discover {} - {}",
            heritage.name,
            heritage.short_description.as_deref().unwrap_or_default()
        ),
        Some(format!("/heritage/{}", heritage.id)),
        None,
    )
}
