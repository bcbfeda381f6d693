//! All tests in this module are intended to test the contract made by the API,
//! e.g. return codes, envelopes, query parameters and the role guards.
use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use chrono::Utc;
use heritage_core::HeritageEngine;
use heritage_core::ids::{CommentId, HeritageId, ReviewId, SubscriptionId, UserId};
use heritage_core::model::comment::Comment;
use heritage_core::model::heritage::{Category, Heritage, HeritageView};
use heritage_core::model::push::PushSubscription;
use heritage_core::model::review::{Rating, Review};
use heritage_core::model::user::{Role, User};
use heritage_core::repository::{
    MockCommentRepository, MockHeritageRepository, MockReviewRepository,
    MockSavedHeritageRepository, MockStatsRepository, MockSubscriptionRepository,
    MockUserRepository,
};
use routing::{AuthState, JwtKeys};

use crate::notifications::FanOutConfig;
use crate::notifications::fake::FakeSender;
use crate::routes;
use crate::state::{HeritageAppState, ServiceSettings};
use crate::uploads::UploadStore;

mod comment_endpoints;
mod review_endpoints;

const SECRET: &[u8] = b"heritage-test-secret";
const BASE_URL: &str = "http://localhost:5000";

#[derive(Default)]
struct Mocks {
    users: MockUserRepository,
    heritages: MockHeritageRepository,
    saved: MockSavedHeritageRepository,
    reviews: MockReviewRepository,
    comments: MockCommentRepository,
    subscriptions: MockSubscriptionRepository,
    stats: MockStatsRepository,
}

#[derive(Clone)]
struct TestEngine(Arc<Mocks>);

impl HeritageEngine for TestEngine {
    type Users = MockUserRepository;
    type Heritages = MockHeritageRepository;
    type Saved = MockSavedHeritageRepository;
    type Reviews = MockReviewRepository;
    type Comments = MockCommentRepository;
    type Subscriptions = MockSubscriptionRepository;
    type Stats = MockStatsRepository;

    fn users(&self) -> &Self::Users {
        &self.0.users
    }

    fn heritages(&self) -> &Self::Heritages {
        &self.0.heritages
    }

    fn saved(&self) -> &Self::Saved {
        &self.0.saved
    }

    fn reviews(&self) -> &Self::Reviews {
        &self.0.reviews
    }

    fn comments(&self) -> &Self::Comments {
        &self.0.comments
    }

    fn subscriptions(&self) -> &Self::Subscriptions {
        &self.0.subscriptions
    }

    fn stats(&self) -> &Self::Stats {
        &self.0.stats
    }
}

fn keys() -> JwtKeys {
    JwtKeys::new(SECRET, 1)
}

fn user_token(id: UserId) -> String {
    keys().issue(id.0, "ram@example.com", "user").unwrap()
}

fn admin_token(id: UserId) -> String {
    keys().issue(id.0, "admin@example.com", "admin").unwrap()
}

fn server(mocks: Mocks) -> TestServer {
    server_with(mocks, FakeSender::new())
}

fn server_with(mocks: Mocks, sender: FakeSender) -> TestServer {
    let settings = ServiceSettings {
        base_url: Arc::from(BASE_URL),
        uploads: UploadStore::new(std::env::temp_dir().join("heritage-routes-tests")),
        jwt: Arc::new(keys()),
        fan_out: FanOutConfig {
            concurrency: 4,
            max_attempts: 2,
            base_backoff: Duration::from_millis(1),
        },
    };

    let state =
        HeritageAppState::new_without_metrics(TestEngine(Arc::new(mocks)), sender, settings);
    let router = routes::build(state, AuthState::new(keys()), None);

    TestServer::new(router).unwrap()
}

fn user(id: UserId, role: Role) -> User {
    User {
        id,
        first_name: "Ram".into(),
        last_name: "Shrestha".into(),
        username: "ramshrestha".into(),
        email: "ram@example.com".into(),
        phone: None,
        profile_image: None,
        bio: None,
        role,
        is_active: true,
        last_login: None,
        created: Utc::now(),
        updated: None,
    }
}

fn heritage_view(id: HeritageId) -> HeritageView {
    HeritageView {
        heritage: Heritage {
            id,
            name: "Pashupatinath Temple".into(),
            description: Some("Hindu temple on the banks of the Bagmati".into()),
            short_description: Some("Hindu temple".into()),
            long_description: Some("Hindu temple on the banks of the Bagmati".into()),
            location: "Kathmandu".into(),
            category: Category::Temple,
            historical_period: Some("Licchavi".into()),
            built_year: Some(1692),
            architect: None,
            significance: None,
            visiting_hours: None,
            opening_hours: None,
            entry_fee: Some(1000.0),
            accessibility: None,
            latitude: None,
            longitude: None,
            is_active: true,
            featured: false,
            created_by: UserId::new(),
            created: Utc::now(),
            updated: None,
        },
        images: vec![],
        creator: None,
    }
}

fn review(id: ReviewId, author: UserId, heritage: HeritageId) -> Review {
    Review {
        id,
        user_id: author,
        heritage_id: heritage,
        rating: Rating::new(4).unwrap(),
        title: "Worth the trip".into(),
        comment: "Crowded in the morning but beautiful".into(),
        is_verified: false,
        is_active: true,
        created: Utc::now(),
        updated: None,
        user: user(author, Role::User).summary(),
    }
}

fn comment(id: CommentId, author: UserId, heritage: HeritageId) -> Comment {
    Comment {
        id,
        user_id: author,
        heritage_id: heritage,
        parent_id: None,
        content: "The evening aarti is a must".into(),
        is_active: true,
        created: Utc::now(),
        updated: None,
        user: user(author, Role::User).summary(),
    }
}

fn subscription(endpoint: &str, owner: Option<UserId>) -> PushSubscription {
    PushSubscription {
        id: SubscriptionId::new(),
        endpoint: endpoint.to_owned(),
        p256dh: "p256dh-key".into(),
        auth: "auth-secret".into(),
        user_id: owner,
        created: Utc::now(),
    }
}

mod return_scenario {
    use error_stack::Report;
    use futures::FutureExt;
    use futures::future::BoxFuture;

    pub fn ok<T, E>(value: T) -> BoxFuture<'static, Result<T, Report<E>>>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        async move { Ok(value) }.boxed()
    }

    pub fn fail<T, E>(error: E) -> BoxFuture<'static, Result<T, Report<E>>>
    where
        T: Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let report = Report::new(error);
        async move { Err(report) }.boxed()
    }
}
