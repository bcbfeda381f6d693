use deadpool_postgres::{GenericClient, Object, Pool};
use error_stack::{Report, ResultExt};
use heritage_core::filter::{
    HeritageFilter, HeritageListCriteria, HeritageSort, HeritageSortField, SearchScope,
};
use heritage_core::ids::{HeritageId, ImageId, UserId};
use heritage_core::model::heritage::{
    FeeRange, FilterOptions, HeritageUpdate, HeritageView, NewHeritage, NewImage, YearRange,
};
use heritage_core::pagination::Page;
use heritage_core::repository::HeritageRepository;
use heritage_core::result::{HeritageRepoError, OptRepoResult, RepoResult};
use tracing::debug;
use uuid::Uuid;

use crate::postgres::insert_many::{InsertManyBuilder, value_set};
use crate::postgres::rows::{
    map_rows, row_to_author, row_to_heritage, row_to_heritage_view, row_to_image,
};
use crate::postgres::statements::{self, heritages};
use crate::postgres::where_builder::{Float, Where, WhereBuilder};
use crate::postgres::{RepoInitErr, count, direction, field_parts, sanitize_pagination};

const FULL_SEARCH_COLUMNS: &[&str] = &[
    "h.name",
    "h.description",
    "h.short_description",
    "h.location",
    "h.historical_period",
    "h.architect",
    "h.significance",
];
const BASIC_SEARCH_COLUMNS: &[&str] = &["h.name", "h.description", "h.location"];

const IMAGE_COLUMNS: [&str; 10] = [
    "id",
    "filename",
    "original_name",
    "path",
    "size",
    "mime_type",
    "is_primary",
    "caption",
    "heritage_id",
    "uploaded_by",
];

#[derive(Clone)]
pub struct HeritageRepo {
    pool: Pool,
}

impl HeritageRepo {
    pub async fn new(pool: Pool) -> Result<Self, Report<RepoInitErr>> {
        let client = pool.get().await.change_context(RepoInitErr("heritages"))?;
        statements::verify(&client, heritages::ALL)
            .await
            .change_context(RepoInitErr("heritages"))?;
        drop(client);

        Ok(Self { pool })
    }

    async fn client(&self, on_err: HeritageRepoError) -> RepoResult<Object, HeritageRepoError> {
        self.pool.get().await.change_context(on_err)
    }
}

fn heritage_where(criteria: &HeritageListCriteria) -> Where {
    let mut builder = WhereBuilder::new();
    builder.fixed("h.is_active");

    for filter in criteria.filters() {
        match filter {
            HeritageFilter::Category(category) => builder.eq("h.category", category.as_str()),
            HeritageFilter::Featured(featured) => builder.eq("h.featured", *featured),
            HeritageFilter::Location(location) => builder.contains("h.location", location),
            HeritageFilter::HistoricalPeriod(period) => {
                builder.contains("h.historical_period", period)
            }
            HeritageFilter::BuiltYear { from, to } => builder.between("h.built_year", *from, *to),
            HeritageFilter::EntryFee { from, to } => {
                builder.between("h.entry_fee", from.map(Float), to.map(Float))
            }
            HeritageFilter::Accessibility(accessibility) => {
                builder.eq("h.accessibility", accessibility.clone())
            }
            HeritageFilter::Search { text, scope } => {
                let columns = match scope {
                    SearchScope::Full => FULL_SEARCH_COLUMNS,
                    SearchScope::Basic => BASIC_SEARCH_COLUMNS,
                };
                builder.contains_any(columns, text)
            }
        };
    }

    builder.build()
}

fn order_by(sort: HeritageSort) -> String {
    let column = match sort.field {
        HeritageSortField::CreatedAt => "h.created",
        HeritageSortField::UpdatedAt => "h.updated",
        HeritageSortField::Name => "h.name",
        HeritageSortField::Location => "h.location",
        HeritageSortField::Category => "h.category",
        HeritageSortField::BuiltYear => "h.built_year",
        HeritageSortField::EntryFee => "h.entry_fee",
        HeritageSortField::Featured => "h.featured",
    };
    let direction = direction(sort.order);
    format!(" ORDER BY {column} {direction}, h.id {direction}")
}

/// Loads a heritage with every image. Works on pooled clients and open transactions alike.
async fn load_view<C>(
    client: &C,
    id: HeritageId,
    active_only: bool,
    on_err: HeritageRepoError,
) -> OptRepoResult<HeritageView, HeritageRepoError>
where
    C: GenericClient + Sync,
{
    let sql = if active_only {
        heritages::FIND_ACTIVE
    } else {
        heritages::FIND
    };
    let statement = client.prepare_cached(sql).await.change_context(on_err)?;
    let Some(row) = client
        .query_opt(&statement, &[&id.0])
        .await
        .change_context(on_err)?
    else {
        return Ok(None);
    };

    let images = client
        .prepare_cached(heritages::IMAGES)
        .await
        .change_context(on_err)?;
    let images = client
        .query(&images, &[&id.0])
        .await
        .change_context(on_err)?
        .iter()
        .filter_map(row_to_image)
        .collect();

    let heritage = row_to_heritage(&row).change_context(on_err)?;

    Ok(Some(HeritageView {
        heritage,
        images,
        creator: row_to_author(&row),
    }))
}

async fn insert_images<C>(
    client: &C,
    heritage: HeritageId,
    images: Vec<NewImage>,
    on_err: HeritageRepoError,
) -> RepoResult<(), HeritageRepoError>
where
    C: GenericClient + Sync,
{
    let rows = images.into_iter().map(|image| {
        value_set![
            ImageId::new().0 => Uuid,
            image.filename => String,
            image.original_name => String,
            image.path => String,
            image.size => i64,
            image.mime_type => String,
            image.is_primary => bool,
            image.caption => String,
            heritage.0 => Uuid,
            image.uploaded_by.0 => Uuid,
        ]
    });

    let Some(builder) = InsertManyBuilder::from_rows("images", IMAGE_COLUMNS, rows) else {
        return Ok(());
    };
    let insert = builder.build();

    let inserted = client
        .execute(insert.query.as_str(), &insert.params())
        .await
        .change_context(on_err)?;
    debug!(inserted, "stored heritage images");

    Ok(())
}

impl HeritageRepository for HeritageRepo {
    async fn list(
        &self,
        criteria: HeritageListCriteria,
        sort: HeritageSort,
    ) -> RepoResult<Page<HeritageView>, HeritageRepoError> {
        let page = sanitize_pagination(&criteria);
        let filter = heritage_where(&criteria);

        let next = filter.next_placeholder();
        let list_sql = format!(
            "{}{}{} LIMIT ${} OFFSET ${}",
            heritages::LIST,
            filter.clause,
            order_by(sort),
            next,
            next + 1
        );
        let count_sql = format!("{}{}", heritages::COUNT, filter.clause);

        let client = self.client(HeritageRepoError::List).await?;
        let list_statement = client
            .prepare_cached(&list_sql)
            .await
            .change_context(HeritageRepoError::List)
            .attach_with(|| list_sql.clone())?;
        let count_statement = client
            .prepare_cached(&count_sql)
            .await
            .change_context(HeritageRepoError::List)
            .attach_with(|| count_sql.clone())?;

        let rows = client
            .query(
                &list_statement,
                &filter.params_with(&[&page.limit, &page.offset]),
            )
            .await
            .change_context(HeritageRepoError::List)?;
        let total: i64 = client
            .query_one(&count_statement, &filter.params())
            .await
            .change_context(HeritageRepoError::List)?
            .get(0);

        let heritages =
            map_rows(&rows, row_to_heritage_view).change_context(HeritageRepoError::List)?;
        Ok(Page::new(heritages, count(total)))
    }

    async fn find_active(&self, id: HeritageId) -> OptRepoResult<HeritageView, HeritageRepoError> {
        let client = self.client(HeritageRepoError::Get).await?;
        load_view(&client, id, true, HeritageRepoError::Get).await
    }

    async fn is_active(&self, id: HeritageId) -> RepoResult<bool, HeritageRepoError> {
        let client = self.client(HeritageRepoError::Get).await?;
        let statement = client
            .prepare_cached(heritages::IS_ACTIVE)
            .await
            .change_context(HeritageRepoError::Get)?;
        let row = client
            .query_one(&statement, &[&id.0])
            .await
            .change_context(HeritageRepoError::Get)?;
        Ok(row.get(0))
    }

    async fn create(
        &self,
        heritage: NewHeritage,
        images: Vec<NewImage>,
    ) -> RepoResult<HeritageView, HeritageRepoError> {
        let mut client = self.client(HeritageRepoError::Create).await?;
        let tx = client
            .transaction()
            .await
            .change_context(HeritageRepoError::Create)?;

        let id = HeritageId::new();
        let statement = tx
            .prepare_cached(heritages::CREATE)
            .await
            .change_context(HeritageRepoError::Create)?;
        tx.execute(
            &statement,
            &[
                &id.0,
                &heritage.name,
                &heritage.description,
                &heritage.short_description,
                &heritage.long_description,
                &heritage.location,
                &heritage.category.as_str(),
                &heritage.historical_period,
                &heritage.built_year,
                &heritage.architect,
                &heritage.significance,
                &heritage.visiting_hours,
                &heritage.opening_hours,
                &heritage.entry_fee,
                &heritage.accessibility,
                &heritage.latitude,
                &heritage.longitude,
                &heritage.featured,
                &heritage.created_by.0,
            ],
        )
        .await
        .change_context(HeritageRepoError::Create)?;

        insert_images(&tx, id, images, HeritageRepoError::Create).await?;

        let view = load_view(&tx, id, false, HeritageRepoError::Create)
            .await?
            .ok_or(HeritageRepoError::Create)
            .attach("created heritage could not be read back")?;

        tx.commit()
            .await
            .change_context(HeritageRepoError::Create)?;

        Ok(view)
    }

    async fn update(
        &self,
        id: HeritageId,
        update: HeritageUpdate,
        images: Vec<NewImage>,
    ) -> OptRepoResult<HeritageView, HeritageRepoError> {
        let (period_set, period) = field_parts(&update.historical_period);
        let (year_set, year) = field_parts(&update.built_year);
        let (architect_set, architect) = field_parts(&update.architect);
        let (significance_set, significance) = field_parts(&update.significance);
        let (hours_set, hours) = field_parts(&update.visiting_hours);
        let (fee_set, fee) = field_parts(&update.entry_fee);
        let (accessibility_set, accessibility) = field_parts(&update.accessibility);
        let (latitude_set, latitude) = field_parts(&update.latitude);
        let (longitude_set, longitude) = field_parts(&update.longitude);

        let mut client = self.client(HeritageRepoError::Update).await?;
        let tx = client
            .transaction()
            .await
            .change_context(HeritageRepoError::Update)?;

        let statement = tx
            .prepare_cached(heritages::UPDATE)
            .await
            .change_context(HeritageRepoError::Update)?;
        let updated = tx
            .query_opt(
                &statement,
                &[
                    &id.0,
                    &update.name,
                    &update.description,
                    &update.short_description,
                    &update.location,
                    &update.category.map(|c| c.as_str()),
                    &update.featured,
                    &period_set,
                    &period,
                    &year_set,
                    &year,
                    &architect_set,
                    &architect,
                    &significance_set,
                    &significance,
                    &hours_set,
                    &hours,
                    &fee_set,
                    &fee,
                    &accessibility_set,
                    &accessibility,
                    &latitude_set,
                    &latitude,
                    &longitude_set,
                    &longitude,
                ],
            )
            .await
            .change_context(HeritageRepoError::Update)?;

        if updated.is_none() {
            debug!(%id, "no active heritage to update");
            return Ok(None);
        }

        insert_images(&tx, id, images, HeritageRepoError::Update).await?;
        let view = load_view(&tx, id, true, HeritageRepoError::Update).await?;

        tx.commit()
            .await
            .change_context(HeritageRepoError::Update)?;

        Ok(view)
    }

    async fn deactivate(&self, id: HeritageId) -> RepoResult<bool, HeritageRepoError> {
        let client = self.client(HeritageRepoError::Delete).await?;
        let statement = client
            .prepare_cached(heritages::DEACTIVATE)
            .await
            .change_context(HeritageRepoError::Delete)?;
        let updated = client
            .execute(&statement, &[&id.0])
            .await
            .change_context(HeritageRepoError::Delete)?;
        Ok(updated > 0)
    }

    async fn filter_options(&self) -> RepoResult<FilterOptions, HeritageRepoError> {
        let client = self.client(HeritageRepoError::FilterOptions).await?;

        let locations = client
            .prepare_cached(heritages::LOCATIONS)
            .await
            .change_context(HeritageRepoError::FilterOptions)?;
        let periods = client
            .prepare_cached(heritages::HISTORICAL_PERIODS)
            .await
            .change_context(HeritageRepoError::FilterOptions)?;
        let ranges = client
            .prepare_cached(heritages::RANGES)
            .await
            .change_context(HeritageRepoError::FilterOptions)?;

        let locations = client
            .query(&locations, &[])
            .await
            .change_context(HeritageRepoError::FilterOptions)?
            .iter()
            .map(|row| row.get(0))
            .collect();
        let historical_periods = client
            .query(&periods, &[])
            .await
            .change_context(HeritageRepoError::FilterOptions)?
            .iter()
            .map(|row| row.get(0))
            .collect();
        let ranges = client
            .query_one(&ranges, &[])
            .await
            .change_context(HeritageRepoError::FilterOptions)?;

        Ok(FilterOptions {
            locations,
            historical_periods,
            year_range: YearRange {
                min_year: ranges.get("min_year"),
                max_year: ranges.get("max_year"),
            },
            fee_range: FeeRange {
                min_fee: ranges.get("min_fee"),
                max_fee: ranges.get("max_fee"),
            },
        })
    }

    async fn list_created_by(&self, user: UserId) -> RepoResult<Vec<HeritageView>, HeritageRepoError> {
        let client = self.client(HeritageRepoError::List).await?;
        let statement = client
            .prepare_cached(heritages::CREATED_BY)
            .await
            .change_context(HeritageRepoError::List)?;
        let rows = client
            .query(&statement, &[&user.0])
            .await
            .change_context(HeritageRepoError::List)?;
        map_rows(&rows, row_to_heritage_view).change_context(HeritageRepoError::List)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heritage_core::filter::{DEFAULT_HERITAGE_PAGE_SIZE, SortOrder};
    use heritage_core::list_criteria::ListFilter;
    use heritage_core::model::heritage::Category;
    use heritage_core::pagination::Pagination;

    fn criteria() -> HeritageListCriteria {
        HeritageFilter::criteria(Pagination::default(), DEFAULT_HERITAGE_PAGE_SIZE)
    }

    #[test]
    fn only_active_heritages_without_filters() {
        let built = heritage_where(&criteria());
        assert_eq!(" WHERE h.is_active", built.clause);
        assert_eq!(1, built.next_placeholder());
    }

    #[test]
    fn filters_bind_in_order() {
        let criteria = criteria()
            .with(HeritageFilter::Category(Category::Palace))
            .with(HeritageFilter::EntryFee {
                from: Some(100.0),
                to: None,
            })
            .with(HeritageFilter::Search {
                text: "durbar".into(),
                scope: SearchScope::Basic,
            });

        let built = heritage_where(&criteria);

        assert_eq!(
            " WHERE h.is_active AND h.category = $1 AND h.entry_fee >= $2 \
             AND (h.name ILIKE $3 OR h.description ILIKE $3 OR h.location ILIKE $3)",
            built.clause
        );
        assert_eq!(4, built.next_placeholder());
    }

    #[test]
    fn full_search_covers_descriptive_columns() {
        let criteria = criteria().with(HeritageFilter::Search {
            text: "malla".into(),
            scope: SearchScope::Full,
        });

        let built = heritage_where(&criteria);

        assert!(built.clause.contains("h.architect ILIKE $1"));
        assert!(built.clause.contains("h.significance ILIKE $1"));
        assert_eq!(2, built.next_placeholder());
    }

    #[test]
    fn accessibility_matches_exactly() {
        let criteria =
            criteria().with(HeritageFilter::Accessibility("Wheelchair accessible".into()));

        let built = heritage_where(&criteria);

        assert_eq!(" WHERE h.is_active AND h.accessibility = $1", built.clause);
        assert_eq!(2, built.next_placeholder());
    }

    #[test]
    fn order_by_breaks_ties_on_id() {
        let sort = HeritageSort {
            field: HeritageSortField::EntryFee,
            order: SortOrder::Asc,
        };
        assert_eq!(" ORDER BY h.entry_fee ASC, h.id ASC", order_by(sort));
    }
}
