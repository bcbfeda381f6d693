use axum::http::StatusCode;
use heritage_core::filter::{ReviewSort, ReviewSortField, SortOrder};
use heritage_core::ids::{HeritageId, ReviewId, UserId};
use heritage_core::list_criteria::PageCriteria;
use heritage_core::model::review::{NewReview, RatingDistribution, ReviewSummary, ReviewUpdate};
use heritage_core::pagination::{Page, Pagination};
use heritage_core::result::ReviewRepoError;
use mockall::predicate;
use serde_json::{Value, json};

use super::{Mocks, return_scenario, review, server, user_token};
use crate::routes::HERITAGE_NOT_FOUND;
use crate::services::DEFAULT_REVIEW_PAGE_SIZE;

const ALREADY_REVIEWED: &str = "You have already reviewed this heritage site";

fn reviews_path(heritage: HeritageId) -> String {
    format!("/api/reviews/heritage/{heritage}/reviews")
}

fn valid_review() -> Value {
    json!({
        "rating": 5,
        "title": "Breathtaking",
        "comment": "Go early to avoid the crowds at the ghats"
    })
}

fn heritage_is_active(mocks: &mut Mocks, heritage: HeritageId, active: bool) {
    mocks
        .heritages
        .expect_is_active()
        .with(predicate::eq(heritage))
        .once()
        .return_once(move |_| return_scenario::ok(active));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn list_defaults_to_newest_first_with_summary() {
    let heritage = HeritageId::new();
    let author = UserId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, true);
    mocks
        .reviews
        .expect_list()
        .with(
            predicate::eq(heritage),
            predicate::eq(PageCriteria::new(
                Pagination::default(),
                DEFAULT_REVIEW_PAGE_SIZE,
            )),
            predicate::eq(ReviewSort::default()),
        )
        .once()
        .return_once(move |h, _, _| {
            return_scenario::ok(Page::new(vec![review(ReviewId::new(), author, h)], 1))
        });
    mocks
        .reviews
        .expect_summary()
        .once()
        .return_once(|_| return_scenario::ok(ReviewSummary::new(Some(4.0), 1)));

    let response = server(mocks).get(&reviews_path(heritage)).await;

    response.assert_status_ok();
    let data = &response.json::<Value>()["data"];
    assert_eq!(json!(4.0), data["averageRating"]);
    assert_eq!(json!(1), data["totalReviews"]);
    assert_eq!(json!(1), data["pagination"]["totalItems"]);
    assert_eq!(json!(4), data["reviews"][0]["rating"]);
    assert_eq!(json!("ramshrestha"), data["reviews"][0]["user"]["username"]);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn list_sorts_by_rating_when_asked() {
    let heritage = HeritageId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, true);
    mocks
        .reviews
        .expect_list()
        .with(
            predicate::always(),
            predicate::always(),
            predicate::eq(ReviewSort {
                field: ReviewSortField::Rating,
                order: SortOrder::Asc,
            }),
        )
        .once()
        .return_once(|_, _, _| return_scenario::ok(Page::empty()));
    mocks
        .reviews
        .expect_summary()
        .once()
        .return_once(|_| return_scenario::ok(ReviewSummary::default()));

    let response = server(mocks)
        .get(&format!("{}?sortBy=rating&sortOrder=asc", reviews_path(heritage)))
        .await;

    response.assert_status_ok();
    assert_eq!(json!(0.0), response.json::<Value>()["data"]["averageRating"]);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn list_of_inactive_heritage_is_not_found() {
    let heritage = HeritageId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, false);
    mocks.reviews.expect_list().never();

    let response = server(mocks).get(&reviews_path(heritage)).await;

    response.assert_status_not_found();
    response.assert_json(&json!({"success": false, "message": HERITAGE_NOT_FOUND}));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn stats_include_every_star_bucket() {
    let heritage = HeritageId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, true);
    mocks
        .reviews
        .expect_summary()
        .once()
        .return_once(|_| return_scenario::ok(ReviewSummary::new(Some(4.5), 2)));
    mocks
        .reviews
        .expect_distribution()
        .once()
        .return_once(|_| return_scenario::ok(RatingDistribution::from_counts([(4, 1), (5, 1)])));

    let response = server(mocks)
        .get(&format!("{}/stats", reviews_path(heritage)))
        .await;

    response.assert_status_ok();
    let data = &response.json::<Value>()["data"];
    assert_eq!(json!(2), data["totalReviews"]);
    assert_eq!(
        json!({"1": 0, "2": 0, "3": 0, "4": 1, "5": 1}),
        data["ratingDistribution"]
    );
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn my_review_is_null_when_missing() {
    let heritage = HeritageId::new();
    let user = UserId::new();

    let mut mocks = Mocks::default();
    mocks
        .reviews
        .expect_find_by_user()
        .with(predicate::eq(user), predicate::eq(heritage))
        .once()
        .return_once(|_, _| return_scenario::ok(None));

    let response = server(mocks)
        .get(&format!("{}/my", reviews_path(heritage)))
        .authorization_bearer(user_token(user))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({"success": true, "data": null}));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn create_review_returns_created() {
    let heritage = HeritageId::new();
    let user = UserId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, true);
    mocks
        .reviews
        .expect_exists_for()
        .with(predicate::eq(user), predicate::eq(heritage))
        .once()
        .return_once(|_, _| return_scenario::ok(false));
    mocks
        .reviews
        .expect_create()
        .withf(move |new: &NewReview| {
            new.user_id == user && new.heritage_id == heritage && new.rating.get() == 5
        })
        .once()
        .return_once(|new| {
            let mut created = review(ReviewId::new(), new.user_id, new.heritage_id);
            created.rating = new.rating;
            return_scenario::ok(created)
        });

    let response = server(mocks)
        .post(&reviews_path(heritage))
        .authorization_bearer(user_token(user))
        .json(&valid_review())
        .await;

    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(json!("Review submitted successfully"), body["message"]);
    assert_eq!(json!(5), body["data"]["rating"]);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn second_review_is_rejected() {
    let heritage = HeritageId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, true);
    mocks
        .reviews
        .expect_exists_for()
        .once()
        .return_once(|_, _| return_scenario::ok(true));
    mocks.reviews.expect_create().never();

    let response = server(mocks)
        .post(&reviews_path(heritage))
        .authorization_bearer(user_token(UserId::new()))
        .json(&valid_review())
        .await;

    response.assert_status_bad_request();
    response.assert_json(&json!({"success": false, "message": ALREADY_REVIEWED}));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn concurrent_duplicate_review_is_rejected() {
    let heritage = HeritageId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, true);
    mocks
        .reviews
        .expect_exists_for()
        .once()
        .return_once(|_, _| return_scenario::ok(false));
    mocks
        .reviews
        .expect_create()
        .once()
        .return_once(|_| return_scenario::fail(ReviewRepoError::Duplicate));

    let response = server(mocks)
        .post(&reviews_path(heritage))
        .authorization_bearer(user_token(UserId::new()))
        .json(&valid_review())
        .await;

    response.assert_status_bad_request();
    response.assert_json(&json!({"success": false, "message": ALREADY_REVIEWED}));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn review_for_inactive_heritage_is_not_found() {
    let heritage = HeritageId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, false);
    mocks.reviews.expect_exists_for().never();

    let response = server(mocks)
        .post(&reviews_path(heritage))
        .authorization_bearer(user_token(UserId::new()))
        .json(&valid_review())
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn review_out_of_range_rating_is_a_validation_error() {
    let response = server(Mocks::default())
        .post(&reviews_path(HeritageId::new()))
        .authorization_bearer(user_token(UserId::new()))
        .json(&json!({"rating": 6, "title": "Too good", "comment": "Better than anything else"}))
        .await;

    response.assert_status_bad_request();
    let body = response.json::<Value>();
    assert_eq!(json!("Validation failed"), body["message"]);
    assert_eq!(json!("rating"), body["errors"][0]["field"]);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn posting_a_review_requires_a_token() {
    let response = server(Mocks::default())
        .post(&reviews_path(HeritageId::new()))
        .json(&valid_review())
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn update_only_touches_given_fields() {
    let id = ReviewId::new();
    let owner = UserId::new();

    let mut mocks = Mocks::default();
    mocks
        .reviews
        .expect_update_owned()
        .withf(move |review, user, update: &ReviewUpdate| {
            *review == id
                && *user == owner
                && update.rating.map(|r| r.get()) == Some(3)
                && update.title.is_none()
                && update.comment.is_none()
        })
        .once()
        .return_once(move |id, owner, _| {
            return_scenario::ok(Some(review(id, owner, HeritageId::new())))
        });

    let response = server(mocks)
        .put(&format!("/api/reviews/reviews/{id}"))
        .authorization_bearer(user_token(owner))
        .json(&json!({"rating": 3}))
        .await;

    response.assert_status_ok();
    assert_eq!(
        json!("Review updated successfully"),
        response.json::<Value>()["message"]
    );
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn update_of_someone_elses_review_is_not_found() {
    let mut mocks = Mocks::default();
    mocks
        .reviews
        .expect_update_owned()
        .once()
        .return_once(|_, _, _| return_scenario::ok(None));

    let response = server(mocks)
        .put(&format!("/api/reviews/reviews/{}", ReviewId::new()))
        .authorization_bearer(user_token(UserId::new()))
        .json(&json!({"title": "Changed my mind"}))
        .await;

    response.assert_status_not_found();
    response.assert_json(&json!({
        "success": false,
        "message": "Review not found or you are not authorized to edit it"
    }));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn delete_deactivates_own_review() {
    let id = ReviewId::new();
    let owner = UserId::new();

    let mut mocks = Mocks::default();
    mocks
        .reviews
        .expect_deactivate_owned()
        .with(predicate::eq(id), predicate::eq(owner))
        .once()
        .return_once(|_, _| return_scenario::ok(true));

    let response = server(mocks)
        .delete(&format!("/api/reviews/reviews/{id}"))
        .authorization_bearer(user_token(owner))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({"success": true, "message": "Review deleted successfully"}));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn delete_of_missing_review_is_not_found() {
    let mut mocks = Mocks::default();
    mocks
        .reviews
        .expect_deactivate_owned()
        .once()
        .return_once(|_, _| return_scenario::ok(false));

    let response = server(mocks)
        .delete(&format!("/api/reviews/reviews/{}", ReviewId::new()))
        .authorization_bearer(user_token(UserId::new()))
        .await;

    response.assert_status_not_found();
}
