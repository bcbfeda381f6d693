use error_stack::Report;
use heritage_core::filter::{DEFAULT_USER_PAGE_SIZE, UserFilter, UserSort, UserSortField};
use heritage_core::ids::UserId;
use heritage_core::list_criteria::ListFilter;
use heritage_core::model::user::{AdminUserUpdate, ProfileUpdate, Role};
use heritage_core::pagination::Pagination;
use heritage_core::repository::UserRepository;
use heritage_core::result::UserRepoError;
use optional_field::Field;
use rstest::rstest;

use crate::{TestRuntime, create_user, new_user, runtime};

fn is_duplicate(report: &Report<UserRepoError>) -> bool {
    matches!(report.current_context(), UserRepoError::Duplicate)
}

#[rstest]
#[tokio::test]
async fn find_unknown_user_returns_none(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.users;

    assert!(repo.find(UserId::new()).await.unwrap().is_none());
}

#[rstest]
#[tokio::test]
async fn create_then_find_returns_created_user(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.users;

    let created = repo.create(new_user("sita")).await.unwrap();
    let found = repo.find(created.id).await.unwrap().expect("created user exists");

    assert_eq!(created, found);
    assert_eq!(Role::User, found.role);
    assert!(found.is_active);

    let credentials = repo
        .find_credentials_by_email("sita@example.com".into())
        .await
        .unwrap()
        .expect("credentials exist");
    assert_eq!("not-a-real-hash", credentials.password_hash);
}

#[rstest]
#[tokio::test]
async fn duplicate_email_or_username_is_rejected(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.users;

    repo.create(new_user("ram")).await.unwrap();

    let mut same_username = new_user("ram");
    same_username.email = "other@example.com".into();
    let err = repo.create(same_username).await.unwrap_err();
    assert!(is_duplicate(&err));

    assert!(
        repo.exists_with_email_or_username("ram@example.com".into(), "nobody".into())
            .await
            .unwrap()
    );
    assert!(
        !repo
            .exists_with_email_or_username("new@example.com".into(), "new".into())
            .await
            .unwrap()
    );
}

#[rstest]
#[tokio::test]
async fn list_filters_by_search_and_role(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.users;

    create_user(&runtime.repos, "hari").await;
    create_user(&runtime.repos, "gita").await;
    let mut admin = new_user("admin");
    admin.role = Role::Admin;
    repo.create(admin).await.unwrap();

    let criteria = UserFilter::criteria(Pagination::default(), DEFAULT_USER_PAGE_SIZE)
        .with_opt(UserFilter::search("HAR".into()));
    let page = repo.list(criteria, UserSort::default()).await.unwrap();
    assert_eq!(1, page.total);
    assert_eq!("hari", page.items[0].username);

    let criteria = UserFilter::criteria(Pagination::default(), DEFAULT_USER_PAGE_SIZE)
        .with(UserFilter::Role(Role::User));
    let sort = UserSort {
        field: UserSortField::Username,
        ..UserSort::default()
    };
    let page = repo.list(criteria, sort).await.unwrap();
    assert_eq!(2, page.total);
    assert_eq!(
        vec!["hari", "gita"],
        page.items.iter().map(|u| u.username.as_str()).collect::<Vec<_>>()
    );
}

#[rstest]
#[tokio::test]
async fn list_pages_past_the_end_are_empty(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.users;

    create_user(&runtime.repos, "one").await;
    create_user(&runtime.repos, "two").await;

    let criteria = UserFilter::criteria(Pagination::with_limit(3, 1), DEFAULT_USER_PAGE_SIZE);
    let page = repo.list(criteria, UserSort::default()).await.unwrap();

    assert!(page.items.is_empty());
    assert_eq!(2, page.total);
}

#[rstest]
#[tokio::test]
async fn profile_update_keeps_missing_fields_and_clears_bio(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.users;
    let user = create_user(&runtime.repos, "maya").await;

    let updated = repo
        .update_profile(
            user.id,
            ProfileUpdate {
                bio: Field::Present(Some("hello".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(Some("hello"), updated.bio.as_deref());
    assert_eq!(user.first_name, updated.first_name);

    let updated = repo
        .update_profile(
            user.id,
            ProfileUpdate {
                first_name: Some("Maya".into()),
                bio: Field::Present(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(None, updated.bio);
    assert_eq!("Maya", updated.first_name);
    assert!(updated.updated.is_some());
}

#[rstest]
#[tokio::test]
async fn admin_update_and_deactivate(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.users;
    let user = create_user(&runtime.repos, "kiran").await;
    create_user(&runtime.repos, "taken").await;

    let err = repo
        .admin_update(
            user.id,
            AdminUserUpdate {
                username: Some("taken".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(is_duplicate(&err));

    let updated = repo
        .admin_update(
            user.id,
            AdminUserUpdate {
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(Role::Admin, updated.role);

    assert!(repo.deactivate(user.id).await.unwrap());
    assert!(!repo.find(user.id).await.unwrap().unwrap().is_active);
    assert!(!repo.deactivate(UserId::new()).await.unwrap());
}

#[rstest]
#[tokio::test]
async fn record_login_sets_last_login(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.users;
    let user = create_user(&runtime.repos, "login").await;
    assert!(user.last_login.is_none());

    let user = repo.record_login(user.id).await.unwrap().unwrap();

    assert!(user.last_login.is_some());
}
