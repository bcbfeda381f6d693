use std::str::FromStr;

use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use chrono::{Datelike, Utc};
use garde::Validate;
use heritage_core::HeritageEngine;
use heritage_core::filter::{
    DEFAULT_HERITAGE_PAGE_SIZE, HeritageFilter, HeritageListCriteria, HeritageSort, SearchScope,
};
use heritage_core::ids::HeritageId;
use heritage_core::list_criteria::ListFilter;
use heritage_core::model::heritage::{Category, CategoryInfo, FilterOptions, HeritageUpdate, HeritageView};
use heritage_core::model::saved::SavedHeritage;
use heritage_core::pagination::{PageMeta, Pagination};
use optional_field::Field;
use routing::response::{ApiError, ApiResponse, EndpointError, FieldError};
use routing::router::Access;
use serde::{Deserialize, Serialize};
use serde_with::{NoneAsEmptyString, serde_as};
use tracing::instrument;
use utoipa::{IntoParams, OpenApi, ToSchema};

use super::extract::{ApiPath, ApiQuery, validate};
use super::{Builder, CurrentUser};
use crate::error::HeritageServiceError;
use crate::notifications::PushSender;
use crate::roles::HeritageRoles;
use crate::services::{HeritageDetail, HeritageDraft, HeritageService, ToggleSaveOutcome};
use crate::uploads::{FormError, MAX_HERITAGE_IMAGES, MultipartForm, StoredFile, UploadStore};

const LIST_PATH: &str = "/heritages";
const HERITAGE_PATH: &str = "/heritage/{id}";
const CREATE_PATH: &str = "/heritage";
const CATEGORIES_PATH: &str = "/categories";
const FILTER_OPTIONS_PATH: &str = "/filter-options";
const TOGGLE_SAVE_PATH: &str = "/saveHeritage/{id}";
const SAVED_PATH: &str = "/savedHeritages";

pub const HERITAGE_NOT_FOUND: &str = "Heritage site not found";
const IMAGES_FIELD: &str = "images";
const CATEGORY_ALL: &str = "all";

#[derive(OpenApi)]
#[openapi(
    paths(
        list_heritages,
        get_heritage,
        categories,
        filter_options,
        toggle_save,
        saved_heritages,
        create_heritage,
        update_heritage,
        delete_heritage,
    ),
    components(schemas(HeritageList, HeritageDetail, SavedHeritageList, SaveState, CategoryInfo, FilterOptions))
)]
pub(super) struct HeritageDocs;

pub(super) fn routes<T: HeritageEngine, P: PushSender>(builder: Builder<T, P>) -> Builder<T, P> {
    builder
        .get(LIST_PATH, list_heritages::<T, P>, Access::Public)
        .get(HERITAGE_PATH, get_heritage::<T, P>, Access::Public)
        .get(CATEGORIES_PATH, categories::<T, P>, Access::Public)
        .get(FILTER_OPTIONS_PATH, filter_options::<T, P>, Access::Public)
        .post(TOGGLE_SAVE_PATH, toggle_save::<T, P>, Access::Authenticated)
        .get(SAVED_PATH, saved_heritages::<T, P>, Access::Authenticated)
        .post(
            CREATE_PATH,
            create_heritage::<T, P>,
            Access::Roles(HeritageRoles::ADMIN),
        )
        .put(
            HERITAGE_PATH,
            update_heritage::<T, P>,
            Access::Roles(HeritageRoles::ADMIN),
        )
        .delete(
            HERITAGE_PATH,
            delete_heritage::<T, P>,
            Access::Roles(HeritageRoles::ADMIN),
        )
}

/// Listing filters. Blank values are ignored, so are `category=all` and any `featured` other
/// than `true`.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub(super) struct HeritageQuery {
    pub category: Option<String>,
    /// Case insensitive substring of name, descriptions, location, period, architect or significance
    pub search: Option<String>,
    pub featured: Option<String>,
    pub location: Option<String>,
    pub historical_period: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<i32>)]
    pub built_year_from: Option<i32>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<i32>)]
    pub built_year_to: Option<i32>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<f64>)]
    pub entry_fee_from: Option<f64>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<f64>)]
    pub entry_fee_to: Option<f64>,
    pub accessibility: Option<String>,
    /// createdAt, updatedAt, name, location, category, builtYear, entryFee or featured
    pub sort_by: Option<String>,
    /// ASC or DESC
    pub sort_order: Option<String>,
}

impl HeritageQuery {
    fn category(&self) -> Result<Option<HeritageFilter>, ApiError> {
        match self.category.as_deref().map(str::trim) {
            None | Some("") | Some(CATEGORY_ALL) => Ok(None),
            Some(c) => Category::from_str(c)
                .map(|c| Some(HeritageFilter::Category(c)))
                .map_err(|e| ApiError::bad_request(e.to_string())),
        }
    }

    fn featured(&self) -> Option<HeritageFilter> {
        (self.featured.as_deref() == Some("true")).then_some(HeritageFilter::Featured(true))
    }

    fn sort(&self) -> HeritageSort {
        HeritageSort::parse(self.sort_by.as_deref(), self.sort_order.as_deref())
    }

    /// The public listing applies every filter.
    fn into_criteria(self, pagination: Pagination) -> Result<HeritageListCriteria, ApiError> {
        let criteria = HeritageFilter::criteria(pagination, DEFAULT_HERITAGE_PAGE_SIZE)
            .with_opt(self.category()?)
            .with_opt(self.featured())
            .with_opt(HeritageFilter::built_year(self.built_year_from, self.built_year_to))
            .with_opt(HeritageFilter::entry_fee(self.entry_fee_from, self.entry_fee_to))
            .with_opt(self.location.and_then(HeritageFilter::location))
            .with_opt(self.historical_period.and_then(HeritageFilter::historical_period))
            .with_opt(self.accessibility.and_then(HeritageFilter::accessibility))
            .with_opt(
                self.search
                    .and_then(|s| HeritageFilter::search(s, SearchScope::Full)),
            );
        Ok(criteria)
    }

    /// The admin listing only searches, filters by category and featured.
    pub(super) fn into_management_criteria(
        self,
        pagination: Pagination,
    ) -> Result<HeritageListCriteria, ApiError> {
        let criteria = HeritageFilter::criteria(pagination, DEFAULT_HERITAGE_PAGE_SIZE)
            .with_opt(self.category()?)
            .with_opt(self.featured())
            .with_opt(
                self.search
                    .and_then(|s| HeritageFilter::search(s, SearchScope::Basic)),
            );
        Ok(criteria)
    }

    pub(super) fn parts(
        self,
        pagination: Pagination,
        management: bool,
    ) -> Result<(HeritageListCriteria, HeritageSort), ApiError> {
        let sort = self.sort();
        let criteria = if management {
            self.into_management_criteria(pagination)?
        } else {
            self.into_criteria(pagination)?
        };
        Ok((criteria, sort))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub(super) struct HeritageList {
    pub heritages: Vec<HeritageView>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct SavedHeritageList {
    saved_heritages: Vec<SavedHeritage>,
    pagination: PageMeta,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct SaveState {
    is_saved: bool,
}

#[utoipa::path(
    get,
    path = LIST_PATH,
    tag = "heritage",
    params(Pagination, HeritageQuery),
    responses(
        (status = OK, description = "One page of active heritages with their primary image", body = HeritageList),
        (status = BAD_REQUEST, description = "Malformed query"),
    )
)]
#[instrument(skip(service, query), err(Debug), fields(req.page = pagination.page, req.limit = pagination.limit))]
async fn list_heritages<T: HeritageEngine, P: PushSender>(
    State(service): State<HeritageService<T, P>>,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(query): ApiQuery<HeritageQuery>,
) -> Result<Response, EndpointError<HeritageServiceError>> {
    let (criteria, sort) = match query.parts(pagination, false) {
        Ok(parts) => parts,
        Err(e) => return Ok(e.into_response()),
    };

    let listing = service.list(criteria, sort).await?;
    Ok(ApiResponse::ok(HeritageList {
        heritages: listing.items,
        pagination: listing.pagination,
    })
    .into_response())
}

/// An active heritage with all of its images. `isSaved` reflects the caller when a token is sent.
#[utoipa::path(
    get,
    path = HERITAGE_PATH,
    tag = "heritage",
    params(("id" = HeritageId, Path, description = "The heritage to fetch")),
    responses(
        (status = OK, description = "The heritage", body = HeritageDetail),
        (status = NOT_FOUND, description = "No active heritage with this id"),
    )
)]
#[instrument(skip(service, user), err(Debug))]
async fn get_heritage<T: HeritageEngine, P: PushSender>(
    State(service): State<HeritageService<T, P>>,
    user: Option<CurrentUser>,
    ApiPath(id): ApiPath<HeritageId>,
) -> Result<Response, EndpointError<HeritageServiceError>> {
    let viewer = user.map(|u| u.id.into());

    Ok(match service.detail(id, viewer).await? {
        Some(detail) => ApiResponse::ok(detail).into_response(),
        None => ApiError::not_found(HERITAGE_NOT_FOUND).into_response(),
    })
}

#[utoipa::path(
    get,
    path = CATEGORIES_PATH,
    tag = "heritage",
    responses((status = OK, description = "Every category with its label", body = Vec<CategoryInfo>))
)]
async fn categories<T: HeritageEngine, P: PushSender>(
    State(service): State<HeritageService<T, P>>,
) -> Response {
    ApiResponse::ok(service.categories()).into_response()
}

#[utoipa::path(
    get,
    path = FILTER_OPTIONS_PATH,
    tag = "heritage",
    responses((status = OK, description = "Values available to the listing filters", body = FilterOptions))
)]
#[instrument(skip(service), err(Debug))]
async fn filter_options<T: HeritageEngine, P: PushSender>(
    State(service): State<HeritageService<T, P>>,
) -> Result<Response, EndpointError<HeritageServiceError>> {
    let options = service.filter_options().await?;
    Ok(ApiResponse::ok(options).into_response())
}

/// Save the heritage if it is not saved yet, otherwise remove it from the saved list.
#[utoipa::path(
    post,
    path = TOGGLE_SAVE_PATH,
    tag = "heritage",
    params(("id" = HeritageId, Path, description = "The heritage to toggle")),
    responses(
        (status = OK, description = "The new saved state", body = SaveState),
        (status = NOT_FOUND, description = "No active heritage with this id"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug), fields(user.id = %user.id))]
async fn toggle_save<T: HeritageEngine, P: PushSender>(
    State(service): State<HeritageService<T, P>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<HeritageId>,
) -> Result<Response, EndpointError<HeritageServiceError>> {
    Ok(match service.toggle_save(user.id.into(), id).await? {
        ToggleSaveOutcome::Toggled { is_saved: true } => {
            ApiResponse::ok_with_message("Added to saved heritages", SaveState { is_saved: true })
                .into_response()
        }
        ToggleSaveOutcome::Toggled { is_saved: false } => ApiResponse::ok_with_message(
            "Removed from saved heritages",
            SaveState { is_saved: false },
        )
        .into_response(),
        ToggleSaveOutcome::HeritageNotFound => {
            ApiError::not_found(HERITAGE_NOT_FOUND).into_response()
        }
    })
}

#[utoipa::path(
    get,
    path = SAVED_PATH,
    tag = "heritage",
    params(Pagination),
    responses((status = OK, description = "The caller's saved heritages, newest first", body = SavedHeritageList)),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug), fields(user.id = %user.id))]
async fn saved_heritages<T: HeritageEngine, P: PushSender>(
    State(service): State<HeritageService<T, P>>,
    user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> Result<Response, EndpointError<HeritageServiceError>> {
    let listing = service.saved(user.id.into(), pagination).await?;
    Ok(ApiResponse::ok(SavedHeritageList {
        saved_heritages: listing.items,
        pagination: listing.pagination,
    })
    .into_response())
}

/// Create a heritage from a multipart form. Up to 5 files in `images`, the first one is the
/// primary image, captions in `imageCaptions[i]`.
#[utoipa::path(
    post,
    path = CREATE_PATH,
    tag = "heritage",
    request_body(content_type = "multipart/form-data", description = "heritage fields, `images` and `imageCaptions[i]`"),
    responses(
        (status = CREATED, description = "The created heritage with its images", body = HeritageView),
        (status = BAD_REQUEST, description = "Validation failed or the files were rejected"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug), fields(user.id = %user.id))]
async fn create_heritage<T: HeritageEngine, P: PushSender>(
    State(service): State<HeritageService<T, P>>,
    State(uploads): State<UploadStore>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<Response, EndpointError<HeritageServiceError>> {
    let (form, files, captions) =
        match read_heritage_form(&uploads, multipart, HeritageServiceError::Create).await? {
            Ok(parsed) => parsed,
            Err(rejection) => return Ok(rejection),
        };

    let draft = match form.into_draft() {
        Ok(draft) => draft,
        Err(errors) => {
            uploads.discard(&files).await;
            return Ok(ApiError::validation(errors).into_response());
        }
    };

    let view = service
        .create(draft, files, captions, user.id.into())
        .await?;
    Ok(ApiResponse::created("Heritage site created successfully", view).into_response())
}

/// Update a heritage. Omitted fields are kept, empty ones clear optional values. New files in
/// `images` are appended.
#[utoipa::path(
    put,
    path = HERITAGE_PATH,
    tag = "heritage",
    params(("id" = HeritageId, Path, description = "The heritage to update")),
    request_body(content_type = "multipart/form-data", description = "heritage fields, `images` and `imageCaptions[i]`"),
    responses(
        (status = OK, description = "The updated heritage with all of its images", body = HeritageView),
        (status = BAD_REQUEST, description = "Validation failed or the files were rejected"),
        (status = NOT_FOUND, description = "No active heritage with this id"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service, uploads, multipart), err(Debug), fields(user.id = %user.id))]
async fn update_heritage<T: HeritageEngine, P: PushSender>(
    State(service): State<HeritageService<T, P>>,
    State(uploads): State<UploadStore>,
    user: CurrentUser,
    ApiPath(id): ApiPath<HeritageId>,
    multipart: Multipart,
) -> Result<Response, EndpointError<HeritageServiceError>> {
    let (form, files, captions) =
        match read_heritage_form(&uploads, multipart, HeritageServiceError::Update).await? {
            Ok(parsed) => parsed,
            Err(rejection) => return Ok(rejection),
        };

    let update = form.into_update();
    Ok(
        match service
            .update(id, update, files, captions, user.id.into())
            .await?
        {
            Some(view) => {
                ApiResponse::ok_with_message("Heritage site updated successfully", view)
                    .into_response()
            }
            None => ApiError::not_found(HERITAGE_NOT_FOUND).into_response(),
        },
    )
}

#[utoipa::path(
    delete,
    path = HERITAGE_PATH,
    tag = "heritage",
    params(("id" = HeritageId, Path, description = "The heritage to deactivate")),
    responses(
        (status = OK, description = "The heritage was deactivated"),
        (status = NOT_FOUND, description = "No heritage with this id"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug))]
async fn delete_heritage<T: HeritageEngine, P: PushSender>(
    State(service): State<HeritageService<T, P>>,
    ApiPath(id): ApiPath<HeritageId>,
) -> Result<Response, EndpointError<HeritageServiceError>> {
    Ok(if service.delete(id).await? {
        ApiResponse::done("Heritage site deleted successfully").into_response()
    } else {
        ApiError::not_found(HERITAGE_NOT_FOUND).into_response()
    })
}

type ParsedForm = (HeritageForm, Vec<StoredFile>, Vec<String>);

/// Reads and validates the multipart form. The inner `Err` is a ready 400 response, stored
/// files are already discarded in that case.
async fn read_heritage_form(
    uploads: &UploadStore,
    multipart: Multipart,
    context: HeritageServiceError,
) -> Result<Result<ParsedForm, Response>, error_stack::Report<HeritageServiceError>> {
    let mut form = match uploads
        .read_form(multipart, IMAGES_FIELD, MAX_HERITAGE_IMAGES)
        .await
    {
        Ok(form) => form,
        Err(FormError::Rejected(message)) => {
            return Ok(Err(ApiError::bad_request(message).into_response()));
        }
        Err(FormError::Storage(e)) => return Err(e.change_context(context)),
    };

    let captions = (0..form.files.len())
        .map(|i| {
            form.take_text(&format!("imageCaptions[{i}]"))
                .unwrap_or_default()
        })
        .collect();

    let parsed = HeritageForm::parse(&mut form).and_then(|heritage| {
        let mut errors = validate(&heritage).err().unwrap_or_default();
        errors.extend(heritage.range_errors());
        if errors.is_empty() {
            Ok(heritage)
        } else {
            Err(errors)
        }
    });

    match parsed {
        Ok(heritage) => Ok(Ok((heritage, form.files, captions))),
        Err(errors) => {
            uploads.discard(&form.files).await;
            Ok(Err(ApiError::validation(errors).into_response()))
        }
    }
}

/// The text fields of a heritage form. `Missing` when the field was not sent,
/// `Present(None)` when it was sent empty.
#[derive(Debug, Default, Validate)]
struct HeritageForm {
    #[garde(length(chars, min = 2, max = 200))]
    name: Option<String>,
    #[garde(skip)]
    description: Option<String>,
    #[garde(length(chars, max = 500))]
    short_description: Option<String>,
    #[garde(length(chars, min = 2, max = 200))]
    location: Option<String>,
    #[garde(skip)]
    category: Option<Category>,
    #[garde(skip)]
    historical_period: Field<String>,
    #[garde(skip)]
    built_year: Field<i32>,
    #[garde(skip)]
    architect: Field<String>,
    #[garde(skip)]
    significance: Field<String>,
    #[garde(skip)]
    visiting_hours: Field<String>,
    #[garde(skip)]
    entry_fee: Field<f64>,
    #[garde(skip)]
    accessibility: Field<String>,
    #[garde(skip)]
    latitude: Field<f64>,
    #[garde(skip)]
    longitude: Field<f64>,
    #[garde(skip)]
    featured: Option<bool>,
}

fn text(form: &mut MultipartForm, name: &str) -> Field<String> {
    match form.take_text(name) {
        None => Field::Missing,
        Some(value) if value.trim().is_empty() => Field::Present(None),
        Some(value) => Field::Present(Some(value.trim().to_owned())),
    }
}

fn number<N: FromStr>(
    form: &mut MultipartForm,
    name: &str,
    errors: &mut Vec<FieldError>,
) -> Field<N> {
    match text(form, name) {
        Field::Missing => Field::Missing,
        Field::Present(None) => Field::Present(None),
        Field::Present(Some(value)) => match value.parse() {
            Ok(n) => Field::Present(Some(n)),
            Err(_) => {
                errors.push(FieldError {
                    field: name.to_owned(),
                    message: "must be a number".to_owned(),
                });
                Field::Missing
            }
        },
    }
}

fn present<V>(field: Field<V>) -> Option<V> {
    match field {
        Field::Present(value) => value,
        Field::Missing => None,
    }
}

fn present_ref<V>(field: &Field<V>) -> Option<&V> {
    match field {
        Field::Present(value) => value.as_ref(),
        Field::Missing => None,
    }
}

impl HeritageForm {
    fn parse(form: &mut MultipartForm) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();

        let category = match present(text(form, "category")) {
            None => None,
            Some(c) => match Category::from_str(&c) {
                Ok(c) => Some(c),
                Err(e) => {
                    errors.push(FieldError {
                        field: "category".to_owned(),
                        message: e.to_string(),
                    });
                    None
                }
            },
        };

        let parsed = Self {
            name: present(text(form, "name")),
            description: present(text(form, "description")),
            short_description: present(text(form, "shortDescription")),
            location: present(text(form, "location")),
            category,
            historical_period: text(form, "historicalPeriod"),
            built_year: number(form, "builtYear", &mut errors),
            architect: text(form, "architect"),
            significance: text(form, "significance"),
            visiting_hours: text(form, "visitingHours"),
            entry_fee: number(form, "entryFee", &mut errors),
            accessibility: text(form, "accessibility"),
            latitude: number(form, "latitude", &mut errors),
            longitude: number(form, "longitude", &mut errors),
            featured: present(text(form, "featured")).map(|f| f == "true"),
        };

        if errors.is_empty() {
            Ok(parsed)
        } else {
            Err(errors)
        }
    }

    fn range_errors(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let mut check = |field: &str, ok: bool, message: String| {
            if !ok {
                errors.push(FieldError {
                    field: field.to_owned(),
                    message,
                });
            }
        };

        if let Some(year) = present_ref(&self.built_year) {
            let current = Utc::now().year();
            check(
                "builtYear",
                (1000..=current).contains(year),
                format!("must be between 1000 and {current}"),
            );
        }
        if let Some(fee) = present_ref(&self.entry_fee) {
            check("entryFee", *fee >= 0.0, "must not be negative".to_owned());
        }
        if let Some(lat) = present_ref(&self.latitude) {
            check(
                "latitude",
                (-90.0..=90.0).contains(lat),
                "must be between -90 and 90".to_owned(),
            );
        }
        if let Some(lng) = present_ref(&self.longitude) {
            check(
                "longitude",
                (-180.0..=180.0).contains(lng),
                "must be between -180 and 180".to_owned(),
            );
        }

        errors
    }

    fn into_draft(self) -> Result<HeritageDraft, Vec<FieldError>> {
        let required = |field: &str| FieldError {
            field: field.to_owned(),
            message: "is required".to_owned(),
        };

        match (self.name, self.location) {
            (Some(name), Some(location)) => Ok(HeritageDraft {
                name,
                description: self.description,
                short_description: self.short_description,
                location,
                category: self.category.unwrap_or_default(),
                historical_period: present(self.historical_period),
                built_year: present(self.built_year),
                architect: present(self.architect),
                significance: present(self.significance),
                visiting_hours: present(self.visiting_hours),
                entry_fee: present(self.entry_fee),
                accessibility: present(self.accessibility),
                latitude: present(self.latitude),
                longitude: present(self.longitude),
                featured: self.featured.unwrap_or_default(),
            }),
            (name, location) => Err(name
                .is_none()
                .then(|| required("name"))
                .into_iter()
                .chain(location.is_none().then(|| required("location")))
                .collect()),
        }
    }

    fn into_update(self) -> HeritageUpdate {
        HeritageUpdate {
            name: self.name,
            description: self.description,
            short_description: self.short_description,
            location: self.location,
            category: self.category,
            featured: self.featured,
            historical_period: self.historical_period,
            built_year: self.built_year,
            architect: self.architect,
            significance: self.significance,
            visiting_hours: self.visiting_hours,
            entry_fee: self.entry_fee,
            accessibility: self.accessibility,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}
