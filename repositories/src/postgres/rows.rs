use error_stack::{Report, ResultExt};
use heritage_core::ids::{
    CommentId, HeritageId, ImageId, ReviewId, SavedHeritageId, SubscriptionId, UserId,
};
use heritage_core::model::comment::Comment;
use heritage_core::model::heritage::{Category, Heritage, HeritageView, Image};
use heritage_core::model::push::PushSubscription;
use heritage_core::model::review::{Rating, Review};
use heritage_core::model::saved::SavedHeritage;
use heritage_core::model::user::{Role, User, UserCredentials, UserSummary};
use tokio_postgres::Row;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("failed to map row")]
pub struct RowError;

pub type RowResult<T> = Result<T, Report<RowError>>;

pub fn parse_role(value: &str) -> RowResult<Role> {
    value.parse().change_context(RowError)
}

pub fn parse_category(value: &str) -> RowResult<Category> {
    value.parse().change_context(RowError)
}

pub fn row_to_user(row: &Row) -> RowResult<User> {
    Ok(User {
        id: UserId(row.get("id")),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        username: row.get("username"),
        email: row.get("email"),
        phone: row.get("phone"),
        profile_image: row.get("profile_image"),
        bio: row.get("bio"),
        role: parse_role(row.get("role"))?,
        is_active: row.get("is_active"),
        last_login: row.get("last_login"),
        created: row.get("created"),
        updated: row.get("updated"),
    })
}

pub fn row_to_credentials(row: &Row) -> RowResult<UserCredentials> {
    Ok(UserCredentials {
        user: row_to_user(row)?,
        password_hash: row.get("password_hash"),
    })
}

/// The `author_*` columns of a left joined user, `None` when the join found nothing.
pub fn row_to_author(row: &Row) -> Option<UserSummary> {
    let id: Option<Uuid> = row.get("author_id");
    id.map(|id| UserSummary {
        id: UserId(id),
        first_name: row.get("author_first_name"),
        last_name: row.get("author_last_name"),
        username: row.get("author_username"),
        profile_image: row.get("author_profile_image"),
    })
}

fn required_author(row: &Row) -> RowResult<UserSummary> {
    row_to_author(row)
        .ok_or(RowError)
        .attach("author columns are missing")
}

pub fn row_to_heritage(row: &Row) -> RowResult<Heritage> {
    Ok(Heritage {
        id: HeritageId(row.get("id")),
        name: row.get("name"),
        description: row.get("description"),
        short_description: row.get("short_description"),
        long_description: row.get("long_description"),
        location: row.get("location"),
        category: parse_category(row.get("category"))?,
        historical_period: row.get("historical_period"),
        built_year: row.get("built_year"),
        architect: row.get("architect"),
        significance: row.get("significance"),
        visiting_hours: row.get("visiting_hours"),
        opening_hours: row.get("opening_hours"),
        entry_fee: row.get("entry_fee"),
        accessibility: row.get("accessibility"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        is_active: row.get("is_active"),
        featured: row.get("featured"),
        created_by: UserId(row.get("created_by")),
        created: row.get("created"),
        updated: row.get("updated"),
    })
}

/// The `img_*` columns, `None` when a left join found no image.
pub fn row_to_image(row: &Row) -> Option<Image> {
    let id: Option<Uuid> = row.get("img_id");
    id.map(|id| Image {
        id: ImageId(id),
        filename: row.get("img_filename"),
        original_name: row.get("img_original_name"),
        path: row.get("img_path"),
        size: row.get("img_size"),
        mime_type: row.get("img_mime_type"),
        is_primary: row.get("img_is_primary"),
        caption: row.get("img_caption"),
        heritage_id: HeritageId(row.get("img_heritage_id")),
        uploaded_by: UserId(row.get("img_uploaded_by")),
        created: row.get("img_created"),
        updated: row.get("img_updated"),
        url: None,
    })
}

/// A listing row: heritage, creator and at most the primary image.
pub fn row_to_heritage_view(row: &Row) -> RowResult<HeritageView> {
    Ok(HeritageView {
        heritage: row_to_heritage(row)?,
        images: row_to_image(row).into_iter().collect(),
        creator: row_to_author(row),
    })
}

pub fn row_to_saved(row: &Row) -> RowResult<SavedHeritage> {
    let heritage = row_to_heritage_view(row)?;
    Ok(SavedHeritage {
        id: SavedHeritageId(row.get("saved_id")),
        user_id: UserId(row.get("saved_user_id")),
        heritage_id: heritage.heritage.id,
        created: row.get("saved_created"),
        heritage,
    })
}

pub fn row_to_review(row: &Row) -> RowResult<Review> {
    let rating: i16 = row.get("rating");
    Ok(Review {
        id: ReviewId(row.get("id")),
        user_id: UserId(row.get("user_id")),
        heritage_id: HeritageId(row.get("heritage_id")),
        rating: Rating::new(rating.into()).change_context(RowError)?,
        title: row.get("title"),
        comment: row.get("comment"),
        is_verified: row.get("is_verified"),
        is_active: row.get("is_active"),
        created: row.get("created"),
        updated: row.get("updated"),
        user: required_author(row)?,
    })
}

pub fn row_to_comment(row: &Row) -> RowResult<Comment> {
    let parent: Option<Uuid> = row.get("parent_id");
    Ok(Comment {
        id: CommentId(row.get("id")),
        user_id: UserId(row.get("user_id")),
        heritage_id: HeritageId(row.get("heritage_id")),
        parent_id: parent.map(CommentId),
        content: row.get("content"),
        is_active: row.get("is_active"),
        created: row.get("created"),
        updated: row.get("updated"),
        user: required_author(row)?,
    })
}

pub fn row_to_subscription(row: &Row) -> PushSubscription {
    let user: Option<Uuid> = row.get("user_id");
    PushSubscription {
        id: SubscriptionId(row.get("id")),
        endpoint: row.get("endpoint"),
        p256dh: row.get("p256dh"),
        auth: row.get("auth"),
        user_id: user.map(UserId),
        created: row.get("created"),
    }
}

/// Maps every row, failing on the first row that cannot be mapped.
pub fn map_rows<T>(rows: &[Row], f: impl Fn(&Row) -> RowResult<T>) -> RowResult<Vec<T>> {
    rows.iter().map(f).collect()
}
