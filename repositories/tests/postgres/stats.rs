use heritage_core::model::heritage::Category;
use heritage_core::model::user::Role;
use heritage_core::repository::{SavedHeritageRepository, StatsRepository, UserRepository};
use rstest::rstest;

use crate::{TestRuntime, create_heritage, create_user, runtime};

#[rstest]
#[tokio::test]
async fn empty_database_has_zero_totals(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.stats;

    let dashboard = repo.dashboard().await.unwrap();

    assert_eq!(0, dashboard.total_users);
    assert_eq!(0, dashboard.total_bookings);
    assert!(dashboard.role_distribution.is_empty());

    let heritages = repo.heritage_stats().await.unwrap();
    assert!(heritages.most_saved_heritage.is_none());
    assert!(heritages.recent_heritages.is_empty());
}

#[rstest]
#[tokio::test]
async fn dashboard_counts_users_heritages_and_saves(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repos = &runtime.repos;
    let user = create_user(repos, "visitor").await;
    let heritage = create_heritage(repos, "Pokhara Bindhyabasini", user.id).await;
    repos.saved.toggle(user.id, heritage.heritage.id).await.unwrap();
    repos.users.record_login(user.id).await.unwrap();

    let dashboard = repos.stats.dashboard().await.unwrap();

    assert_eq!(1, dashboard.total_users);
    assert_eq!(1, dashboard.total_heritages);
    assert_eq!(1, dashboard.total_saved);
    assert_eq!(1, dashboard.active_users_today);
    assert_eq!(Role::User, dashboard.role_distribution[0].role);
    assert_eq!(Category::Temple, dashboard.category_distribution[0].category);
    assert_eq!(1, dashboard.monthly_registrations.len());

    let heritages = repos.stats.heritage_stats().await.unwrap();
    let most_saved = heritages.most_saved_heritage.unwrap();
    assert_eq!(heritage.heritage.id, most_saved.heritage_id);
    assert_eq!(1, most_saved.save_count);

    let trends = repos.stats.activity_trends().await.unwrap();
    assert_eq!(1, trends.daily_registrations.len());
    assert_eq!(1, trends.daily_saves[0].count);

    let statistics = repos.stats.user_statistics(user.id).await.unwrap();
    assert_eq!(1, statistics.saved_count);
    assert_eq!(0, statistics.visited_count);
    assert_eq!(1, statistics.popular_sites.len());
}
