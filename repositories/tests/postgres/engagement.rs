use heritage_core::filter::{CommentSort, ReviewSort};
use heritage_core::ids::ReviewId;
use heritage_core::list_criteria::PageCriteria;
use heritage_core::model::comment::NewComment;
use heritage_core::model::push::NewSubscription;
use heritage_core::model::review::{NewReview, Rating, ReviewUpdate};
use heritage_core::pagination::Pagination;
use heritage_core::repository::{
    CommentRepository, HeritageRepository, ReviewRepository, SavedHeritageRepository,
    SubscriptionRepository,
};
use heritage_core::result::ReviewRepoError;
use rstest::rstest;

use crate::{TestRuntime, create_heritage, create_user, runtime};

fn page() -> PageCriteria {
    PageCriteria::new(Pagination::default(), 10)
}

fn new_review(
    user: heritage_core::ids::UserId,
    heritage: heritage_core::ids::HeritageId,
    rating: i64,
) -> NewReview {
    NewReview {
        user_id: user,
        heritage_id: heritage,
        rating: Rating::new(rating).unwrap(),
        title: "Worth it".into(),
        comment: "Beautiful courtyard".into(),
    }
}

#[rstest]
#[tokio::test]
async fn toggle_saved_twice_restores_state(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.saved;
    let user = create_user(&runtime.repos, "saver").await;
    let heritage = create_heritage(&runtime.repos, "Bhaktapur", user.id).await;
    let id = heritage.heritage.id;

    assert!(!repo.is_saved(user.id, id).await.unwrap());
    assert!(repo.toggle(user.id, id).await.unwrap());
    assert!(repo.is_saved(user.id, id).await.unwrap());

    let saved = repo.list_page(user.id, page()).await.unwrap();
    assert_eq!(1, saved.total);
    assert_eq!(id, saved.items[0].heritage_id);
    assert_eq!("Bhaktapur", saved.items[0].heritage.heritage.name);

    assert!(!repo.toggle(user.id, id).await.unwrap());
    assert!(!repo.is_saved(user.id, id).await.unwrap());
    assert!(repo.list_recent(user.id, None).await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn saved_list_hides_deactivated_heritages(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let user = create_user(&runtime.repos, "saver").await;
    let kept = create_heritage(&runtime.repos, "Gorkha", user.id).await;
    let removed = create_heritage(&runtime.repos, "Nuwakot", user.id).await;

    runtime.repos.saved.toggle(user.id, kept.heritage.id).await.unwrap();
    runtime
        .repos
        .saved
        .toggle(user.id, removed.heritage.id)
        .await
        .unwrap();
    runtime
        .repos
        .heritages
        .deactivate(removed.heritage.id)
        .await
        .unwrap();

    let recent = runtime.repos.saved.list_recent(user.id, Some(3)).await.unwrap();

    assert_eq!(1, recent.len());
    assert_eq!(kept.heritage.id, recent[0].heritage_id);
}

#[rstest]
#[tokio::test]
async fn second_review_by_same_user_is_duplicate(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.reviews;
    let user = create_user(&runtime.repos, "reviewer").await;
    let heritage = create_heritage(&runtime.repos, "Janaki Mandir", user.id).await;
    let id = heritage.heritage.id;

    let review = repo.create(new_review(user.id, id, 4)).await.unwrap();
    assert_eq!(user.id, review.user.id);
    assert!(repo.exists_for(user.id, id).await.unwrap());

    let err = repo.create(new_review(user.id, id, 5)).await.unwrap_err();
    assert!(matches!(err.current_context(), ReviewRepoError::Duplicate));
}

#[rstest]
#[tokio::test]
async fn review_summary_and_distribution(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.reviews;
    let owner = create_user(&runtime.repos, "owner").await;
    let heritage = create_heritage(&runtime.repos, "Muktinath", owner.id).await;
    let id = heritage.heritage.id;

    assert_eq!(0, repo.summary(id).await.unwrap().total_reviews);

    for (name, rating) in [("a", 5), ("b", 5), ("c", 2)] {
        let user = create_user(&runtime.repos, name).await;
        repo.create(new_review(user.id, id, rating)).await.unwrap();
    }

    let summary = repo.summary(id).await.unwrap();
    assert_eq!(3, summary.total_reviews);
    assert!((summary.average_rating - 4.0).abs() < f64::EPSILON);

    let distribution = repo.distribution(id).await.unwrap();
    assert_eq!(2, distribution.count(Rating::new(5).unwrap()));
    assert_eq!(0, distribution.count(Rating::new(1).unwrap()));

    let listed = repo.list(id, page(), ReviewSort::default()).await.unwrap();
    assert_eq!(3, listed.total);
}

#[rstest]
#[tokio::test]
async fn only_owner_can_change_review(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.reviews;
    let owner = create_user(&runtime.repos, "owner").await;
    let other = create_user(&runtime.repos, "other").await;
    let heritage = create_heritage(&runtime.repos, "Rani Mahal", owner.id).await;
    let review = repo
        .create(new_review(owner.id, heritage.heritage.id, 3))
        .await
        .unwrap();

    let update = ReviewUpdate {
        rating: Some(Rating::new(1).unwrap()),
        ..Default::default()
    };
    assert!(
        repo.update_owned(review.id, other.id, update.clone())
            .await
            .unwrap()
            .is_none()
    );
    assert!(!repo.deactivate_owned(review.id, other.id).await.unwrap());

    let updated = repo
        .update_owned(review.id, owner.id, update)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(1, updated.rating.get());
    assert_eq!(review.title, updated.title);

    assert!(repo.deactivate_owned(review.id, owner.id).await.unwrap());
    assert!(
        repo.find_by_user(owner.id, heritage.heritage.id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(!repo.deactivate_owned(ReviewId::new(), owner.id).await.unwrap());
}

#[rstest]
#[tokio::test]
async fn comments_with_replies_and_stats(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.comments;
    let user = create_user(&runtime.repos, "commenter").await;
    let heritage = create_heritage(&runtime.repos, "Kirtipur", user.id).await;
    let id = heritage.heritage.id;

    let top = repo
        .create(NewComment {
            user_id: user.id,
            heritage_id: id,
            parent_id: None,
            content: "Lovely place".into(),
        })
        .await
        .unwrap();
    let reply = repo
        .create(NewComment {
            user_id: user.id,
            heritage_id: id,
            parent_id: Some(top.id),
            content: "Agreed".into(),
        })
        .await
        .unwrap();

    let listed = repo
        .list_top_level(id, page(), CommentSort::default())
        .await
        .unwrap();
    assert_eq!(1, listed.total);
    assert_eq!(top.id, listed.items[0].id);

    let replies = repo.replies_for(vec![top.id]).await.unwrap();
    assert_eq!(vec![reply.clone()], replies);
    assert_eq!(1, repo.list_replies(top.id, page()).await.unwrap().total);

    let stats = repo.stats(id).await.unwrap();
    assert_eq!(2, stats.total_comments);
    assert_eq!(1, stats.top_level_comments);
    assert_eq!(1, stats.replies_count);

    assert!(repo.deactivate_owned(reply.id, user.id).await.unwrap());
    assert!(repo.replies_for(vec![top.id]).await.unwrap().is_empty());
    assert!(repo.exists(reply.id).await.unwrap());
    assert!(
        repo.find_active_in_heritage(reply.id, id)
            .await
            .unwrap()
            .is_none()
    );
}

#[rstest]
#[tokio::test]
async fn deleted_parent_keeps_its_replies_reachable(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.comments;
    let user = create_user(&runtime.repos, "threadstarter").await;
    let heritage = create_heritage(&runtime.repos, "Panauti", user.id).await;
    let id = heritage.heritage.id;

    let top = repo
        .create(NewComment {
            user_id: user.id,
            heritage_id: id,
            parent_id: None,
            content: "Go early in the morning".into(),
        })
        .await
        .unwrap();
    let reply = repo
        .create(NewComment {
            user_id: user.id,
            heritage_id: id,
            parent_id: Some(top.id),
            content: "The river walk too".into(),
        })
        .await
        .unwrap();

    assert!(repo.deactivate_owned(top.id, user.id).await.unwrap());

    let listed = repo
        .list_top_level(id, page(), CommentSort::default())
        .await
        .unwrap();
    assert_eq!(0, listed.total);
    assert!(listed.items.is_empty());

    let replies = repo.list_replies(top.id, page()).await.unwrap();
    assert_eq!(1, replies.total);
    assert_eq!(reply.id, replies.items[0].id);

    assert!(
        repo.find_active_in_heritage(top.id, id)
            .await
            .unwrap()
            .is_none()
    );
}

#[rstest]
#[tokio::test]
async fn resubscribing_endpoint_refreshes_keys_and_keeps_owner(#[future] runtime: TestRuntime) {
    let runtime = runtime.await;
    let repo = &runtime.repos.subscriptions;
    let user = create_user(&runtime.repos, "subscriber").await;

    let first = repo
        .upsert(NewSubscription {
            endpoint: "https://push.example.com/abc".into(),
            p256dh: "key-1".into(),
            auth: "auth-1".into(),
            user_id: Some(user.id),
        })
        .await
        .unwrap();
    let second = repo
        .upsert(NewSubscription {
            endpoint: "https://push.example.com/abc".into(),
            p256dh: "key-2".into(),
            auth: "auth-2".into(),
            user_id: None,
        })
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!("key-2", second.p256dh);
    assert_eq!(Some(user.id), second.user_id);

    let stats = repo.stats().await.unwrap();
    assert_eq!(1, stats.total_subscriptions);
    assert_eq!(1, stats.users_with_subscriptions);
    assert_eq!(1, repo.list_for_user(user.id).await.unwrap().len());

    assert_eq!(1, repo.remove_for_user(user.id).await.unwrap());
    assert!(repo.list_all().await.unwrap().is_empty());
    assert_eq!(
        0,
        repo.remove_endpoint("https://push.example.com/abc".into())
            .await
            .unwrap()
    );
}
