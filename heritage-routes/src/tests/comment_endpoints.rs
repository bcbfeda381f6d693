use axum::http::StatusCode;
use heritage_core::filter::CommentSort;
use heritage_core::ids::{CommentId, HeritageId, UserId};
use heritage_core::list_criteria::PageCriteria;
use heritage_core::model::comment::{CommentStats, NewComment};
use heritage_core::pagination::{Page, Pagination};
use mockall::predicate;
use serde_json::{Value, json};

use super::{Mocks, comment, return_scenario, server, user_token};
use crate::routes::HERITAGE_NOT_FOUND;
use crate::services::{DEFAULT_COMMENT_PAGE_SIZE, DEFAULT_REPLY_PAGE_SIZE};

const PARENT_NOT_FOUND: &str = "Parent comment not found";

fn comments_path(heritage: HeritageId) -> String {
    format!("/api/comments/heritage/{heritage}/comments")
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
async fn list_nests_replies_under_their_parent() {
    let heritage = HeritageId::new();
    let parent = comment(CommentId::new(), UserId::new(), heritage);
    let mut reply = comment(CommentId::new(), UserId::new(), heritage);
    reply.parent_id = Some(parent.id);
    reply.content = "Agreed, go at dusk".into();

    let parent_id = parent.id;
    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, true);
    mocks
        .comments
        .expect_list_top_level()
        .with(
            predicate::eq(heritage),
            predicate::eq(PageCriteria::new(
                Pagination::default(),
                DEFAULT_COMMENT_PAGE_SIZE,
            )),
            predicate::eq(CommentSort::default()),
        )
        .once()
        .return_once(move |_, _, _| return_scenario::ok(Page::new(vec![parent], 1)));
    mocks
        .comments
        .expect_replies_for()
        .with(predicate::eq(vec![parent_id]))
        .once()
        .return_once(move |_| return_scenario::ok(vec![reply]));

    let response = server(mocks).get(&comments_path(heritage)).await;

    response.assert_status_ok();
    let data = &response.json::<Value>()["data"];
    assert_eq!(json!(parent_id.to_string()), data["comments"][0]["id"]);
    assert_eq!(
        json!("Agreed, go at dusk"),
        data["comments"][0]["replies"][0]["content"]
    );
    assert_eq!(json!(DEFAULT_COMMENT_PAGE_SIZE), data["pagination"]["itemsPerPage"]);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn empty_page_skips_reply_lookup() {
    let heritage = HeritageId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, true);
    mocks
        .comments
        .expect_list_top_level()
        .once()
        .return_once(|_, _, _| return_scenario::ok(Page::empty()));
    mocks.comments.expect_replies_for().never();

    let response = server(mocks).get(&comments_path(heritage)).await;

    response.assert_status_ok();
    assert_eq!(json!([]), response.json::<Value>()["data"]["comments"]);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn list_of_inactive_heritage_is_not_found() {
    let heritage = HeritageId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, false);

    let response = server(mocks).get(&comments_path(heritage)).await;

    response.assert_status_not_found();
    response.assert_json(&json!({"success": false, "message": HERITAGE_NOT_FOUND}));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn stats_count_active_comments() {
    let heritage = HeritageId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, true);
    mocks
        .comments
        .expect_stats()
        .with(predicate::eq(heritage))
        .once()
        .return_once(|_| {
            return_scenario::ok(CommentStats {
                total_comments: 3,
                top_level_comments: 2,
                replies_count: 1,
            })
        });

    let response = server(mocks)
        .get(&format!("{}/stats", comments_path(heritage)))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({
        "success": true,
        "data": {"totalComments": 3, "topLevelComments": 2, "repliesCount": 1}
    }));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn replies_of_unknown_comment_are_not_found() {
    let mut mocks = Mocks::default();
    mocks
        .comments
        .expect_exists()
        .once()
        .return_once(|_| return_scenario::ok(false));
    mocks.comments.expect_list_replies().never();

    let response = server(mocks)
        .get(&format!("/api/comments/comments/{}/replies", CommentId::new()))
        .await;

    response.assert_status_not_found();
    response.assert_json(&json!({"success": false, "message": PARENT_NOT_FOUND}));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn replies_are_paged() {
    let parent = CommentId::new();

    let mut mocks = Mocks::default();
    mocks
        .comments
        .expect_exists()
        .with(predicate::eq(parent))
        .once()
        .return_once(|_| return_scenario::ok(true));
    mocks
        .comments
        .expect_list_replies()
        .with(
            predicate::eq(parent),
            predicate::eq(PageCriteria::new(
                Pagination::with_default_limit(2),
                DEFAULT_REPLY_PAGE_SIZE,
            )),
        )
        .once()
        .return_once(|_, _| return_scenario::ok(Page::new(vec![], 12)));

    let response = server(mocks)
        .get(&format!("/api/comments/comments/{parent}/replies?page=2"))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({
        "success": true,
        "data": {
            "replies": [],
            "pagination": {
                "currentPage": 2,
                "totalPages": 2,
                "totalItems": 12,
                "itemsPerPage": DEFAULT_REPLY_PAGE_SIZE
            }
        }
    }));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn top_level_comment_is_created() {
    let heritage = HeritageId::new();
    let author = UserId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, true);
    mocks.comments.expect_find_active_in_heritage().never();
    mocks
        .comments
        .expect_create()
        .withf(move |new: &NewComment| {
            new.user_id == author && new.heritage_id == heritage && new.parent_id.is_none()
        })
        .once()
        .return_once(|new| {
            let mut created = comment(CommentId::new(), new.user_id, new.heritage_id);
            created.content = new.content;
            return_scenario::ok(created)
        });

    let response = server(mocks)
        .post(&comments_path(heritage))
        .authorization_bearer(user_token(author))
        .json(&json!({"content": "Bring a scarf for the temple"}))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(json!("Comment posted successfully"), body["message"]);
    assert_eq!(json!("Bring a scarf for the temple"), body["data"]["content"]);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn reply_to_comment_of_other_heritage_is_not_found() {
    let heritage = HeritageId::new();
    let parent = CommentId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, true);
    mocks
        .comments
        .expect_find_active_in_heritage()
        .with(predicate::eq(parent), predicate::eq(heritage))
        .once()
        .return_once(|_, _| return_scenario::ok(None));
    mocks.comments.expect_create().never();

    let response = server(mocks)
        .post(&comments_path(heritage))
        .authorization_bearer(user_token(UserId::new()))
        .json(&json!({"content": "Same here", "parentId": parent}))
        .await;

    response.assert_status_not_found();
    response.assert_json(&json!({"success": false, "message": PARENT_NOT_FOUND}));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn reply_to_active_parent_is_created() {
    let heritage = HeritageId::new();
    let parent = CommentId::new();

    let mut mocks = Mocks::default();
    heritage_is_active(&mut mocks, heritage, true);
    mocks
        .comments
        .expect_find_active_in_heritage()
        .once()
        .return_once(move |id, h| return_scenario::ok(Some(comment(id, UserId::new(), h))));
    mocks
        .comments
        .expect_create()
        .withf(move |new: &NewComment| new.parent_id == Some(parent))
        .once()
        .return_once(|new| {
            let mut created = comment(CommentId::new(), new.user_id, new.heritage_id);
            created.parent_id = new.parent_id;
            return_scenario::ok(created)
        });

    let response = server(mocks)
        .post(&comments_path(heritage))
        .authorization_bearer(user_token(UserId::new()))
        .json(&json!({"content": "Same here", "parentId": parent}))
        .await;

    response.assert_status(StatusCode::CREATED);
    assert_eq!(
        json!(parent.to_string()),
        response.json::<Value>()["data"]["parentId"]
    );
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn overlong_comment_is_a_validation_error() {
    let mut mocks = Mocks::default();
    mocks.heritages.expect_is_active().never();

    let response = server(mocks)
        .post(&comments_path(HeritageId::new()))
        .authorization_bearer(user_token(UserId::new()))
        .json(&json!({"content": "a".repeat(501)}))
        .await;

    response.assert_status_bad_request();
    let body = response.json::<Value>();
    assert_eq!(json!("Validation failed"), body["message"]);
    assert_eq!(json!("content"), body["errors"][0]["field"]);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn update_of_foreign_comment_is_not_found() {
    let mut mocks = Mocks::default();
    mocks
        .comments
        .expect_update_owned()
        .once()
        .return_once(|_, _, _| return_scenario::ok(None));

    let response = server(mocks)
        .put(&format!("/api/comments/comments/{}", CommentId::new()))
        .authorization_bearer(user_token(UserId::new()))
        .json(&json!({"content": "Edited"}))
        .await;

    response.assert_status_not_found();
    response.assert_json(&json!({
        "success": false,
        "message": "Comment not found or you are not authorized to edit it"
    }));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn update_of_own_comment_returns_it() {
    let id = CommentId::new();
    let owner = UserId::new();

    let mut mocks = Mocks::default();
    mocks
        .comments
        .expect_update_owned()
        .with(
            predicate::eq(id),
            predicate::eq(owner),
            predicate::eq("Edited".to_owned()),
        )
        .once()
        .return_once(|id, owner, content| {
            let mut updated = comment(id, owner, HeritageId::new());
            updated.content = content;
            return_scenario::ok(Some(updated))
        });

    let response = server(mocks)
        .put(&format!("/api/comments/comments/{id}"))
        .authorization_bearer(user_token(owner))
        .json(&json!({"content": "Edited"}))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(json!("Comment updated successfully"), body["message"]);
    assert_eq!(json!("Edited"), body["data"]["content"]);
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn delete_of_own_comment_succeeds() {
    let id = CommentId::new();
    let owner = UserId::new();

    let mut mocks = Mocks::default();
    mocks
        .comments
        .expect_deactivate_owned()
        .with(predicate::eq(id), predicate::eq(owner))
        .once()
        .return_once(|_, _| return_scenario::ok(true));

    let response = server(mocks)
        .delete(&format!("/api/comments/comments/{id}"))
        .authorization_bearer(user_token(owner))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({"success": true, "message": "Comment deleted successfully"}));
}
