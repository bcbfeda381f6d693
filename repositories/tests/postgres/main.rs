use heritage_core::ids::UserId;
use heritage_core::model::heritage::{Category, HeritageView, NewHeritage, NewImage};
use heritage_core::model::user::{NewUser, Role, User};
use heritage_core::repository::{HeritageRepository, UserRepository};
use repositories::postgres::ConnectionDetails;
use repositories::postgres::initializer::{PgRepos, RepoCreator};
use rstest::fixture;
use testcontainers_modules::{
    postgres::Postgres,
    testcontainers::{ContainerAsync, runners::AsyncRunner},
};

mod engagement;
mod heritages;
mod stats;
mod users;

pub struct TestRuntime {
    _container: ContainerAsync<Postgres>,
    pub repos: PgRepos,
}

#[fixture]
pub async fn runtime(#[future] container: ContainerAsync<Postgres>) -> TestRuntime {
    let container = container.await;
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();

    let repos = RepoCreator::default()
        .with_heritage_repos()
        .create(
            ConnectionDetails::Url(format!(
                "postgresql://testuser:testpass@{host}:{port}/heritage"
            )),
            Some(4),
        )
        .await
        .unwrap();

    TestRuntime {
        _container: container,
        repos,
    }
}

#[fixture]
pub async fn container() -> ContainerAsync<Postgres> {
    Postgres::default()
        .with_db_name("heritage")
        .with_user("testuser")
        .with_password("testpass")
        .start()
        .await
        .unwrap()
}

pub fn new_user(username: &str) -> NewUser {
    NewUser {
        first_name: "Test".into(),
        last_name: username.into(),
        username: username.into(),
        email: format!("{username}@example.com"),
        password_hash: "not-a-real-hash".into(),
        phone: None,
        role: Role::User,
    }
}

pub async fn create_user(repos: &PgRepos, username: &str) -> User {
    repos.users.create(new_user(username)).await.unwrap()
}

pub fn new_heritage(name: &str, category: Category, created_by: UserId) -> NewHeritage {
    NewHeritage {
        name: name.into(),
        description: Some(format!("{name} description")),
        short_description: Some(format!("{name} description")),
        long_description: None,
        location: "Kathmandu".into(),
        category,
        historical_period: Some("Malla".into()),
        built_year: Some(1600),
        architect: None,
        significance: None,
        visiting_hours: None,
        opening_hours: None,
        entry_fee: Some(100.0),
        accessibility: None,
        latitude: Some(27.7),
        longitude: Some(85.3),
        featured: false,
        created_by,
    }
}

pub fn new_image(filename: &str, is_primary: bool, uploaded_by: UserId) -> NewImage {
    NewImage {
        filename: filename.into(),
        original_name: format!("original-{filename}"),
        path: format!("uploads/{filename}"),
        size: 1024,
        mime_type: "image/jpeg".into(),
        is_primary,
        caption: String::new(),
        uploaded_by,
    }
}

pub async fn create_heritage(repos: &PgRepos, name: &str, created_by: UserId) -> HeritageView {
    repos
        .heritages
        .create(new_heritage(name, Category::Temple, created_by), vec![])
        .await
        .unwrap()
}
