use heritage_core::filter::{
    DEFAULT_HERITAGE_PAGE_SIZE, HeritageFilter, HeritageSort, HeritageSortField, SearchScope,
    SortOrder,
};
use heritage_core::ids::HeritageId;
use heritage_core::list_criteria::ListFilter;
use heritage_core::model::heritage::{Category, HeritageUpdate};
use heritage_core::pagination::Pagination;
use heritage_core::repository::HeritageRepository;
use optional_field::Field;
use rstest::rstest;

use crate::{TestRuntime, create_heritage, create_user, new_heritage, new_image, runtime};

fn criteria() -> heritage_core::filter::HeritageListCriteria {
    HeritageFilter::criteria(Pagination::default(), DEFAULT_HERITAGE_PAGE_SIZE)
}

#[rstest]
#[tokio::test]
async fn create_stores_images_primary_first(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.heritages;
    let admin = create_user(&runtime.repos, "admin").await;

    let created = repo
        .create(
            new_heritage("Pashupatinath", Category::Temple, admin.id),
            vec![
                new_image("a.jpg", false, admin.id),
                new_image("b.jpg", true, admin.id),
            ],
        )
        .await
        .unwrap();

    assert_eq!(2, created.images.len());
    assert_eq!("b.jpg", created.images[0].filename);
    assert_eq!(admin.id, created.creator.as_ref().unwrap().id);

    let found = repo.find_active(created.heritage.id).await.unwrap().unwrap();
    assert_eq!(created, found);
}

#[rstest]
#[tokio::test]
async fn list_only_carries_primary_image(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.heritages;
    let admin = create_user(&runtime.repos, "admin").await;

    repo.create(
        new_heritage("Boudhanath", Category::Monastery, admin.id),
        vec![
            new_image("primary.jpg", true, admin.id),
            new_image("second.jpg", false, admin.id),
        ],
    )
    .await
    .unwrap();

    let page = repo.list(criteria(), HeritageSort::default()).await.unwrap();

    assert_eq!(1, page.total);
    assert_eq!(1, page.items[0].images.len());
    assert_eq!("primary.jpg", page.items[0].images[0].filename);
}

#[rstest]
#[tokio::test]
async fn list_applies_filters_and_sort(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.heritages;
    let admin = create_user(&runtime.repos, "admin").await;

    let mut palace = new_heritage("Patan Durbar", Category::Palace, admin.id);
    palace.entry_fee = Some(1000.0);
    repo.create(palace, vec![]).await.unwrap();

    let mut cheap = new_heritage("Kasthamandap", Category::Temple, admin.id);
    cheap.entry_fee = Some(0.0);
    repo.create(cheap, vec![]).await.unwrap();

    create_heritage(&runtime.repos, "Changu Narayan", admin.id).await;

    let page = repo
        .list(
            criteria().with(HeritageFilter::Category(Category::Palace)),
            HeritageSort::default(),
        )
        .await
        .unwrap();
    assert_eq!(1, page.total);
    assert_eq!("Patan Durbar", page.items[0].heritage.name);

    let page = repo
        .list(
            criteria().with(HeritageFilter::EntryFee {
                from: None,
                to: Some(100.0),
            }),
            HeritageSort {
                field: HeritageSortField::Name,
                order: SortOrder::Asc,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        vec!["Changu Narayan", "Kasthamandap"],
        page.items
            .iter()
            .map(|h| h.heritage.name.as_str())
            .collect::<Vec<_>>()
    );

    let page = repo
        .list(
            criteria().with(HeritageFilter::Search {
                text: "durbar".into(),
                scope: SearchScope::Basic,
            }),
            HeritageSort::default(),
        )
        .await
        .unwrap();
    assert_eq!(1, page.total);
}

#[rstest]
#[tokio::test]
async fn update_is_partial_and_appends_images(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.heritages;
    let admin = create_user(&runtime.repos, "admin").await;
    let created = create_heritage(&runtime.repos, "Nyatapola", admin.id).await;

    let updated = repo
        .update(
            created.heritage.id,
            HeritageUpdate {
                featured: Some(true),
                historical_period: Field::Present(None),
                ..Default::default()
            },
            vec![new_image("new.jpg", false, admin.id)],
        )
        .await
        .unwrap()
        .unwrap();

    assert!(updated.heritage.featured);
    assert_eq!(None, updated.heritage.historical_period);
    assert_eq!(created.heritage.name, updated.heritage.name);
    assert_eq!(created.heritage.built_year, updated.heritage.built_year);
    assert_eq!(1, updated.images.len());
}

#[rstest]
#[tokio::test]
async fn deactivated_heritage_is_hidden(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.heritages;
    let admin = create_user(&runtime.repos, "admin").await;
    let created = create_heritage(&runtime.repos, "Swayambhu", admin.id).await;
    let id = created.heritage.id;

    assert!(repo.deactivate(id).await.unwrap());

    assert!(repo.find_active(id).await.unwrap().is_none());
    assert!(!repo.is_active(id).await.unwrap());
    assert_eq!(0, repo.list(criteria(), HeritageSort::default()).await.unwrap().total);
    assert!(
        repo.update(id, HeritageUpdate::default(), vec![])
            .await
            .unwrap()
            .is_none()
    );
    assert!(!repo.deactivate(HeritageId::new()).await.unwrap());
}

#[rstest]
#[tokio::test]
async fn filter_options_cover_active_heritages(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.heritages;
    let admin = create_user(&runtime.repos, "admin").await;

    let mut lumbini = new_heritage("Lumbini", Category::Monastery, admin.id);
    lumbini.location = "Rupandehi".into();
    lumbini.built_year = Some(1896);
    lumbini.entry_fee = None;
    repo.create(lumbini, vec![]).await.unwrap();
    create_heritage(&runtime.repos, "Hanuman Dhoka", admin.id).await;

    let options = repo.filter_options().await.unwrap();

    assert_eq!(vec!["Kathmandu", "Rupandehi"], options.locations);
    assert_eq!(vec!["Malla"], options.historical_periods);
    assert_eq!(Some(1600), options.year_range.min_year);
    assert_eq!(Some(1896), options.year_range.max_year);
    assert_eq!(Some(100.0), options.fee_range.max_fee);
}
