use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ids::{CommentId, HeritageId, UserId};
use crate::model::user::UserSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub user_id: UserId,
    pub heritage_id: HeritageId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated: Option<DateTime<Utc>>,
    pub user: UserSummary,
}

/// A top level comment with its direct replies, oldest reply first.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub user_id: UserId,
    pub heritage_id: HeritageId,
    pub parent_id: Option<CommentId>,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommentStats {
    pub total_comments: u64,
    pub top_level_comments: u64,
    pub replies_count: u64,
}
