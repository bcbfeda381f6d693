//! SQL for every fixed statement. Statements are bound to a connection, so they are prepared
//! through the pool's per connection statement cache rather than held by the repos.

use deadpool_postgres::Client;
use error_stack::{Report, ResultExt};

#[derive(Debug, thiserror::Error)]
#[error("failed to prepare statement")]
pub struct StatementPrepareError;

macro_rules! user_columns {
    () => {
        "u.id, u.first_name, u.last_name, u.username, u.email, u.phone, u.profile_image, u.bio, \
         u.role, u.is_active, u.last_login, u.created, u.updated"
    };
}

macro_rules! author_columns {
    () => {
        "a.id as author_id, a.first_name as author_first_name, a.last_name as author_last_name, \
         a.username as author_username, a.profile_image as author_profile_image"
    };
}

macro_rules! heritage_columns {
    () => {
        "h.id, h.name, h.description, h.short_description, h.long_description, h.location, \
         h.category, h.historical_period, h.built_year, h.architect, h.significance, \
         h.visiting_hours, h.opening_hours, h.entry_fee, h.accessibility, h.latitude, \
         h.longitude, h.is_active, h.featured, h.created_by, h.created, h.updated"
    };
}

macro_rules! image_columns {
    () => {
        "i.id as img_id, i.filename as img_filename, i.original_name as img_original_name, \
         i.path as img_path, i.size as img_size, i.mime_type as img_mime_type, \
         i.is_primary as img_is_primary, i.caption as img_caption, \
         i.heritage_id as img_heritage_id, i.uploaded_by as img_uploaded_by, \
         i.created as img_created, i.updated as img_updated"
    };
}

/// Heritage, creator and primary image of every `h` row.
macro_rules! heritage_view_from {
    () => {
        concat!(
            heritage_columns!(),
            ", ",
            author_columns!(),
            ", ",
            image_columns!(),
            " from heritages h left join users a on a.id = h.created_by \
             left join lateral (select * from images pi where pi.heritage_id = h.id and pi.is_primary \
             order by pi.created asc limit 1) i on true"
        )
    };
}

macro_rules! review_columns {
    () => {
        concat!(
            "r.id, r.user_id, r.heritage_id, r.rating, r.title, r.comment, r.is_verified, \
             r.is_active, r.created, r.updated, ",
            author_columns!()
        )
    };
}

macro_rules! comment_columns {
    () => {
        concat!(
            "c.id, c.user_id, c.heritage_id, c.parent_id, c.content, c.is_active, c.created, \
             c.updated, ",
            author_columns!()
        )
    };
}

macro_rules! subscription_columns {
    () => {
        "id, endpoint, p256dh, auth, user_id, created"
    };
}

pub mod users {
    pub const FIND: &str = concat!("select ", user_columns!(), " from users u where u.id = $1");
    pub const FIND_CREDENTIALS_BY_EMAIL: &str = concat!(
        "select ",
        user_columns!(),
        ", u.password_hash from users u where u.email = $1"
    );
    pub const FIND_CREDENTIALS: &str = concat!(
        "select ",
        user_columns!(),
        ", u.password_hash from users u where u.id = $1"
    );
    pub const EXISTS_WITH_EMAIL_OR_USERNAME: &str =
        "select exists(select 1 from users where email = $1 or username = $2)";
    pub const EMAIL_TAKEN_BY_OTHER: &str =
        "select exists(select 1 from users where email = $1 and id <> $2)";
    pub const CREATE: &str = concat!(
        "insert into users as u (id, first_name, last_name, username, email, password_hash, phone, role) \
         values ($1, $2, $3, $4, $5, $6, $7, $8) returning ",
        user_columns!()
    );
    pub const RECORD_LOGIN: &str = concat!(
        "update users u set last_login = now() where u.id = $1 returning ",
        user_columns!()
    );
    pub const UPDATE_PROFILE: &str = concat!(
        "update users u set \
         first_name = coalesce($2::text, u.first_name), \
         last_name = coalesce($3::text, u.last_name), \
         phone = coalesce($4::text, u.phone), \
         bio = case when $5::boolean then $6::text else u.bio end, \
         updated = now() \
         where u.id = $1 returning ",
        user_columns!()
    );
    pub const SET_PROFILE_IMAGE: &str = concat!(
        "update users u set profile_image = $2, updated = now() where u.id = $1 returning ",
        user_columns!()
    );
    pub const SET_PASSWORD: &str =
        "update users set password_hash = $2, updated = now() where id = $1";
    pub const ADMIN_UPDATE: &str = concat!(
        "update users u set \
         first_name = coalesce($2::text, u.first_name), \
         last_name = coalesce($3::text, u.last_name), \
         username = coalesce($4::text, u.username), \
         email = coalesce($5::text, u.email), \
         role = coalesce($6::text, u.role), \
         is_active = coalesce($7::boolean, u.is_active), \
         phone = case when $8::boolean then $9::text else u.phone end, \
         bio = case when $10::boolean then $11::text else u.bio end, \
         updated = now() \
         where u.id = $1 returning ",
        user_columns!()
    );
    pub const DEACTIVATE: &str =
        "update users set is_active = false, updated = now() where id = $1";
    pub const LIST: &str = concat!("select ", user_columns!(), " from users u");
    pub const COUNT: &str = "select count(*) from users u";

    pub const ALL: &[&str] = &[
        FIND,
        FIND_CREDENTIALS_BY_EMAIL,
        FIND_CREDENTIALS,
        EXISTS_WITH_EMAIL_OR_USERNAME,
        EMAIL_TAKEN_BY_OTHER,
        CREATE,
        RECORD_LOGIN,
        UPDATE_PROFILE,
        SET_PROFILE_IMAGE,
        SET_PASSWORD,
        ADMIN_UPDATE,
        DEACTIVATE,
    ];
}

pub mod heritages {
    pub const LIST: &str = concat!("select ", heritage_view_from!());
    pub const COUNT: &str = "select count(*) from heritages h";
    pub const FIND_ACTIVE: &str = concat!(
        "select ",
        heritage_columns!(),
        ", ",
        author_columns!(),
        " from heritages h left join users a on a.id = h.created_by where h.id = $1 and h.is_active"
    );
    pub const FIND: &str = concat!(
        "select ",
        heritage_columns!(),
        ", ",
        author_columns!(),
        " from heritages h left join users a on a.id = h.created_by where h.id = $1"
    );
    pub const IMAGES: &str = concat!(
        "select ",
        image_columns!(),
        " from images i where i.heritage_id = $1 order by i.is_primary desc, i.created asc, i.id asc"
    );
    pub const IS_ACTIVE: &str = "select exists(select 1 from heritages where id = $1 and is_active)";
    pub const CREATE: &str = "insert into heritages (id, name, description, short_description, \
         long_description, location, category, historical_period, built_year, architect, \
         significance, visiting_hours, opening_hours, entry_fee, accessibility, latitude, \
         longitude, featured, created_by) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)";
    /// Nullable columns take a "present" flag followed by the value, opening hours follow
    /// visiting hours.
    pub const UPDATE: &str = "update heritages h set \
         name = coalesce($2::text, h.name), \
         description = coalesce($3::text, h.description), \
         short_description = coalesce($4::text, h.short_description), \
         location = coalesce($5::text, h.location), \
         category = coalesce($6::text, h.category), \
         featured = coalesce($7::boolean, h.featured), \
         historical_period = case when $8::boolean then $9::text else h.historical_period end, \
         built_year = case when $10::boolean then $11::integer else h.built_year end, \
         architect = case when $12::boolean then $13::text else h.architect end, \
         significance = case when $14::boolean then $15::text else h.significance end, \
         visiting_hours = case when $16::boolean then $17::text else h.visiting_hours end, \
         opening_hours = case when $16::boolean then $17::text else h.opening_hours end, \
         entry_fee = case when $18::boolean then $19::float8 else h.entry_fee end, \
         accessibility = case when $20::boolean then $21::text else h.accessibility end, \
         latitude = case when $22::boolean then $23::float8 else h.latitude end, \
         longitude = case when $24::boolean then $25::float8 else h.longitude end, \
         updated = now() \
         where h.id = $1 and h.is_active returning h.id";
    pub const DEACTIVATE: &str =
        "update heritages set is_active = false, updated = now() where id = $1";
    pub const LOCATIONS: &str =
        "select distinct location from heritages where is_active order by location";
    pub const HISTORICAL_PERIODS: &str = "select distinct historical_period from heritages \
         where is_active and historical_period is not null and historical_period <> '' \
         order by historical_period";
    pub const RANGES: &str = "select min(built_year) as min_year, max(built_year) as max_year, \
         min(entry_fee) as min_fee, max(entry_fee) as max_fee from heritages where is_active";
    pub const CREATED_BY: &str = concat!(
        "select ",
        heritage_view_from!(),
        " where h.created_by = $1 and h.is_active order by h.created desc"
    );

    pub const ALL: &[&str] = &[
        FIND_ACTIVE,
        FIND,
        IMAGES,
        IS_ACTIVE,
        CREATE,
        UPDATE,
        DEACTIVATE,
        LOCATIONS,
        HISTORICAL_PERIODS,
        RANGES,
        CREATED_BY,
    ];
}

pub mod saved {
    pub const IS_SAVED: &str =
        "select exists(select 1 from saved_heritages where user_id = $1 and heritage_id = $2)";
    pub const DELETE: &str = "delete from saved_heritages where user_id = $1 and heritage_id = $2";
    pub const INSERT: &str = "insert into saved_heritages (id, user_id, heritage_id) values ($1, $2, $3) \
         on conflict (user_id, heritage_id) do nothing";
    pub const LIST_PAGE: &str = concat!(
        "select s.id as saved_id, s.user_id as saved_user_id, s.created as saved_created, ",
        heritage_view_from!(),
        " join saved_heritages s on s.heritage_id = h.id \
         where s.user_id = $1 and h.is_active order by s.created desc, s.id desc limit $2 offset $3"
    );
    pub const COUNT: &str = "select count(*) from saved_heritages s join heritages h on h.id = s.heritage_id \
         where s.user_id = $1 and h.is_active";
    /// `limit null` returns every row.
    pub const LIST_RECENT: &str = concat!(
        "select s.id as saved_id, s.user_id as saved_user_id, s.created as saved_created, ",
        heritage_view_from!(),
        " join saved_heritages s on s.heritage_id = h.id \
         where s.user_id = $1 and h.is_active order by s.created desc, s.id desc limit $2::bigint"
    );

    pub const ALL: &[&str] = &[IS_SAVED, DELETE, INSERT, LIST_PAGE, COUNT, LIST_RECENT];
}

pub mod reviews {
    pub const LIST: &str = concat!(
        "select ",
        review_columns!(),
        " from reviews r join users a on a.id = r.user_id where r.heritage_id = $1 and r.is_active"
    );
    pub const COUNT: &str =
        "select count(*) from reviews where heritage_id = $1 and is_active";
    pub const SUMMARY: &str = "select avg(rating)::float8 as average, count(*) as total \
         from reviews where heritage_id = $1 and is_active";
    pub const DISTRIBUTION: &str = "select rating, count(*) as total from reviews \
         where heritage_id = $1 and is_active group by rating";
    pub const FIND_BY_USER: &str = concat!(
        "select ",
        review_columns!(),
        " from reviews r join users a on a.id = r.user_id \
         where r.user_id = $1 and r.heritage_id = $2 and r.is_active"
    );
    pub const EXISTS_FOR: &str =
        "select exists(select 1 from reviews where user_id = $1 and heritage_id = $2)";
    pub const CREATE: &str = concat!(
        "with r as (insert into reviews (id, user_id, heritage_id, rating, title, comment) \
         values ($1, $2, $3, $4, $5, $6) returning *) select ",
        review_columns!(),
        " from r join users a on a.id = r.user_id"
    );
    pub const UPDATE_OWNED: &str = concat!(
        "with r as (update reviews set \
         rating = coalesce($3::smallint, rating), \
         title = coalesce($4::text, title), \
         comment = coalesce($5::text, comment), \
         updated = now() \
         where id = $1 and user_id = $2 and is_active returning *) select ",
        review_columns!(),
        " from r join users a on a.id = r.user_id"
    );
    pub const DEACTIVATE_OWNED: &str = "update reviews set is_active = false, updated = now() \
         where id = $1 and user_id = $2 and is_active";

    pub const ALL: &[&str] = &[
        COUNT,
        SUMMARY,
        DISTRIBUTION,
        FIND_BY_USER,
        EXISTS_FOR,
        CREATE,
        UPDATE_OWNED,
        DEACTIVATE_OWNED,
    ];
}

pub mod comments {
    pub const LIST_TOP_LEVEL: &str = concat!(
        "select ",
        comment_columns!(),
        " from comments c join users a on a.id = c.user_id \
         where c.heritage_id = $1 and c.parent_id is null and c.is_active"
    );
    pub const COUNT_TOP_LEVEL: &str = "select count(*) from comments \
         where heritage_id = $1 and parent_id is null and is_active";
    pub const REPLIES_FOR: &str = concat!(
        "select ",
        comment_columns!(),
        " from comments c join users a on a.id = c.user_id \
         where c.parent_id = any($1::uuid[]) and c.is_active order by c.created asc, c.id asc"
    );
    pub const FIND_ACTIVE_IN_HERITAGE: &str = concat!(
        "select ",
        comment_columns!(),
        " from comments c join users a on a.id = c.user_id \
         where c.id = $1 and c.heritage_id = $2 and c.is_active"
    );
    pub const EXISTS: &str = "select exists(select 1 from comments where id = $1)";
    pub const LIST_REPLIES: &str = concat!(
        "select ",
        comment_columns!(),
        " from comments c join users a on a.id = c.user_id \
         where c.parent_id = $1 and c.is_active order by c.created asc, c.id asc limit $2 offset $3"
    );
    pub const COUNT_REPLIES: &str =
        "select count(*) from comments where parent_id = $1 and is_active";
    pub const CREATE: &str = concat!(
        "with c as (insert into comments (id, user_id, heritage_id, parent_id, content) \
         values ($1, $2, $3, $4, $5) returning *) select ",
        comment_columns!(),
        " from c join users a on a.id = c.user_id"
    );
    pub const UPDATE_OWNED: &str = concat!(
        "with c as (update comments set content = $3, updated = now() \
         where id = $1 and user_id = $2 and is_active returning *) select ",
        comment_columns!(),
        " from c join users a on a.id = c.user_id"
    );
    pub const DEACTIVATE_OWNED: &str = "update comments set is_active = false, updated = now() \
         where id = $1 and user_id = $2 and is_active";
    pub const STATS: &str = "select count(*) as total, \
         count(*) filter (where parent_id is null) as top_level, \
         count(*) filter (where parent_id is not null) as replies \
         from comments where heritage_id = $1 and is_active";

    pub const ALL: &[&str] = &[
        COUNT_TOP_LEVEL,
        REPLIES_FOR,
        FIND_ACTIVE_IN_HERITAGE,
        EXISTS,
        LIST_REPLIES,
        COUNT_REPLIES,
        CREATE,
        UPDATE_OWNED,
        DEACTIVATE_OWNED,
        STATS,
    ];
}

pub mod subscriptions {
    /// Re-subscribing an endpoint refreshes its keys, the owner is only replaced when given.
    pub const UPSERT: &str = concat!(
        "insert into push_subscriptions (id, endpoint, p256dh, auth, user_id) \
         values ($1, $2, $3, $4, $5) \
         on conflict (endpoint) do update set p256dh = excluded.p256dh, auth = excluded.auth, \
         user_id = coalesce(excluded.user_id, push_subscriptions.user_id) returning ",
        subscription_columns!()
    );
    pub const REMOVE_ENDPOINT: &str = "delete from push_subscriptions where endpoint = $1";
    pub const REMOVE_FOR_USER: &str = "delete from push_subscriptions where user_id = $1";
    pub const LIST_ALL: &str = concat!(
        "select ",
        subscription_columns!(),
        " from push_subscriptions order by created asc"
    );
    pub const LIST_FOR_USER: &str = concat!(
        "select ",
        subscription_columns!(),
        " from push_subscriptions where user_id = $1 order by created asc"
    );
    pub const STATS: &str = "select count(*) as total, count(distinct user_id) as users \
         from push_subscriptions";

    pub const ALL: &[&str] = &[
        UPSERT,
        REMOVE_ENDPOINT,
        REMOVE_FOR_USER,
        LIST_ALL,
        LIST_FOR_USER,
        STATS,
    ];
}

pub mod stats {
    pub const TOTAL_USERS: &str = "select count(*) from users";
    pub const TOTAL_HERITAGES: &str = "select count(*) from heritages where is_active";
    pub const TOTAL_BOOKINGS: &str = "select count(*) from bookings";
    pub const TOTAL_SAVED: &str = "select count(*) from saved_heritages";
    pub const ACTIVE_USERS_TODAY: &str =
        "select count(*) from users where last_login >= date_trunc('day', now())";
    pub const ROLE_DISTRIBUTION: &str =
        "select role, count(*) as total from users group by role order by role";
    pub const CATEGORY_DISTRIBUTION: &str = "select category, count(*) as total from heritages \
         where is_active group by category order by category";
    pub const MONTHLY_REGISTRATIONS: &str = "select to_char(date_trunc('month', created), 'YYYY-MM') as month, \
         count(*) as total from users where created >= now() - interval '6 months' \
         group by 1 order by 1";
    pub const NEW_REGISTRATIONS: &str =
        "select count(*) from users where created >= now() - interval '7 days'";
    pub const RECENT_HERITAGES: &str = concat!(
        "select ",
        heritage_view_from!(),
        " where h.is_active order by h.created desc limit 5"
    );
    pub const MOST_SAVED: &str = "select h.id, h.name, h.location, count(*) as total \
         from saved_heritages s join heritages h on h.id = s.heritage_id \
         where h.is_active group by h.id, h.name, h.location order by total desc, h.id limit 1";
    pub const FEATURED_COUNT: &str =
        "select count(*) from heritages where is_active and featured";
    pub const DAILY_REGISTRATIONS: &str = "select created::date as day, count(*) as total from users \
         where created >= now() - interval '7 days' group by 1 order by 1";
    pub const DAILY_LOGINS: &str = "select last_login::date as day, count(*) as total from users \
         where last_login >= now() - interval '30 days' group by 1 order by 1";
    pub const DAILY_SAVES: &str = "select created::date as day, count(*) as total from saved_heritages \
         where created >= now() - interval '7 days' group by 1 order by 1";
    pub const USER_SAVED_COUNT: &str = "select count(*) from saved_heritages where user_id = $1";
    pub const POPULAR_SITES: &str = "select h.id, h.name, h.location, h.category, count(*) as total \
         from saved_heritages s join heritages h on h.id = s.heritage_id \
         where h.is_active group by h.id, h.name, h.location, h.category \
         order by total desc, h.id limit 5";

    pub const ALL: &[&str] = &[
        TOTAL_USERS,
        TOTAL_HERITAGES,
        TOTAL_BOOKINGS,
        TOTAL_SAVED,
        ACTIVE_USERS_TODAY,
        ROLE_DISTRIBUTION,
        CATEGORY_DISTRIBUTION,
        MONTHLY_REGISTRATIONS,
        NEW_REGISTRATIONS,
        RECENT_HERITAGES,
        MOST_SAVED,
        FEATURED_COUNT,
        DAILY_REGISTRATIONS,
        DAILY_LOGINS,
        DAILY_SAVES,
        USER_SAVED_COUNT,
        POPULAR_SITES,
    ];
}

/// Prepares every fixed statement once so broken SQL fails at start up instead of on first use.
pub async fn verify(client: &Client, statements: &[&str]) -> Result<(), Report<StatementPrepareError>> {
    for sql in statements {
        client
            .prepare_cached(sql)
            .await
            .change_context(StatementPrepareError)
            .attach_with(|| format!("statement: {sql}"))?;
    }
    Ok(())
}
