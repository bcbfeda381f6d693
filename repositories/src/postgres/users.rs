use deadpool_postgres::{Object, Pool};
use error_stack::{Report, ResultExt};
use heritage_core::filter::{UserFilter, UserListCriteria, UserSort, UserSortField};
use heritage_core::ids::UserId;
use heritage_core::model::user::{AdminUserUpdate, NewUser, ProfileUpdate, User, UserCredentials};
use heritage_core::pagination::Page;
use heritage_core::repository::UserRepository;
use heritage_core::result::{OptRepoResult, RepoResult, UserRepoError};
use tracing::debug;

use crate::postgres::rows::{map_rows, row_to_credentials, row_to_user};
use crate::postgres::statements::{self, users};
use crate::postgres::where_builder::WhereBuilder;
use crate::postgres::{
    RepoInitErr, count, direction, field_parts, is_unique_violation, sanitize_pagination,
};

#[derive(Clone)]
pub struct UserRepo {
    pool: Pool,
}

impl UserRepo {
    pub async fn new(pool: Pool) -> Result<Self, Report<RepoInitErr>> {
        let client = pool.get().await.change_context(RepoInitErr("users"))?;
        statements::verify(&client, users::ALL)
            .await
            .change_context(RepoInitErr("users"))?;
        drop(client);

        Ok(Self { pool })
    }

    async fn client(&self, on_err: UserRepoError) -> RepoResult<Object, UserRepoError> {
        self.pool.get().await.change_context(on_err)
    }

    async fn find_one(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        on_err: UserRepoError,
    ) -> OptRepoResult<User, UserRepoError> {
        let client = self.client(on_err).await?;
        let statement = client.prepare_cached(sql).await.change_context(on_err)?;
        client
            .query_opt(&statement, params)
            .await
            .change_context(on_err)?
            .map(|row| row_to_user(&row))
            .transpose()
            .change_context(on_err)
    }
}

fn order_by(sort: UserSort) -> String {
    let column = match sort.field {
        UserSortField::CreatedAt => "u.created",
        UserSortField::UpdatedAt => "u.updated",
        UserSortField::FirstName => "u.first_name",
        UserSortField::LastName => "u.last_name",
        UserSortField::Username => "u.username",
        UserSortField::Email => "u.email",
        UserSortField::LastLogin => "u.last_login",
        UserSortField::Role => "u.role",
    };
    let direction = direction(sort.order);
    format!(" ORDER BY {column} {direction}, u.id {direction}")
}

impl UserRepository for UserRepo {
    async fn find(&self, id: UserId) -> OptRepoResult<User, UserRepoError> {
        self.find_one(users::FIND, &[&id.0], UserRepoError::Get)
            .await
    }

    async fn find_credentials_by_email(
        &self,
        email: String,
    ) -> OptRepoResult<UserCredentials, UserRepoError> {
        let client = self.client(UserRepoError::Get).await?;
        let statement = client
            .prepare_cached(users::FIND_CREDENTIALS_BY_EMAIL)
            .await
            .change_context(UserRepoError::Get)?;
        client
            .query_opt(&statement, &[&email])
            .await
            .change_context(UserRepoError::Get)?
            .map(|row| row_to_credentials(&row))
            .transpose()
            .change_context(UserRepoError::Get)
    }

    async fn find_credentials(&self, id: UserId) -> OptRepoResult<UserCredentials, UserRepoError> {
        let client = self.client(UserRepoError::Get).await?;
        let statement = client
            .prepare_cached(users::FIND_CREDENTIALS)
            .await
            .change_context(UserRepoError::Get)?;
        client
            .query_opt(&statement, &[&id.0])
            .await
            .change_context(UserRepoError::Get)?
            .map(|row| row_to_credentials(&row))
            .transpose()
            .change_context(UserRepoError::Get)
    }

    async fn exists_with_email_or_username(
        &self,
        email: String,
        username: String,
    ) -> RepoResult<bool, UserRepoError> {
        let client = self.client(UserRepoError::Exists).await?;
        let statement = client
            .prepare_cached(users::EXISTS_WITH_EMAIL_OR_USERNAME)
            .await
            .change_context(UserRepoError::Exists)?;
        let row = client
            .query_one(&statement, &[&email, &username])
            .await
            .change_context(UserRepoError::Exists)?;
        Ok(row.get(0))
    }

    async fn email_taken_by_other(
        &self,
        email: String,
        id: UserId,
    ) -> RepoResult<bool, UserRepoError> {
        let client = self.client(UserRepoError::Exists).await?;
        let statement = client
            .prepare_cached(users::EMAIL_TAKEN_BY_OTHER)
            .await
            .change_context(UserRepoError::Exists)?;
        let row = client
            .query_one(&statement, &[&email, &id.0])
            .await
            .change_context(UserRepoError::Exists)?;
        Ok(row.get(0))
    }

    async fn create(&self, user: NewUser) -> RepoResult<User, UserRepoError> {
        let client = self.client(UserRepoError::Create).await?;
        let statement = client
            .prepare_cached(users::CREATE)
            .await
            .change_context(UserRepoError::Create)?;

        let result = client
            .query_one(
                &statement,
                &[
                    &UserId::new().0,
                    &user.first_name,
                    &user.last_name,
                    &user.username,
                    &user.email,
                    &user.password_hash,
                    &user.phone,
                    &user.role.as_str(),
                ],
            )
            .await;

        match result {
            Ok(row) => row_to_user(&row).change_context(UserRepoError::Create),
            Err(e) if is_unique_violation(&e) => {
                debug!("user with email or username already exists");
                Err(Report::new(e)).change_context(UserRepoError::Duplicate)
            }
            Err(e) => Err(Report::new(e)).change_context(UserRepoError::Create),
        }
    }

    async fn record_login(&self, id: UserId) -> OptRepoResult<User, UserRepoError> {
        self.find_one(users::RECORD_LOGIN, &[&id.0], UserRepoError::Update)
            .await
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> OptRepoResult<User, UserRepoError> {
        let (bio_set, bio) = field_parts(&update.bio);
        self.find_one(
            users::UPDATE_PROFILE,
            &[
                &id.0,
                &update.first_name,
                &update.last_name,
                &update.phone,
                &bio_set,
                &bio,
            ],
            UserRepoError::Update,
        )
        .await
    }

    async fn set_profile_image(&self, id: UserId, path: String) -> OptRepoResult<User, UserRepoError> {
        self.find_one(users::SET_PROFILE_IMAGE, &[&id.0, &path], UserRepoError::Update)
            .await
    }

    async fn set_password(&self, id: UserId, password_hash: String) -> RepoResult<bool, UserRepoError> {
        let client = self.client(UserRepoError::Update).await?;
        let statement = client
            .prepare_cached(users::SET_PASSWORD)
            .await
            .change_context(UserRepoError::Update)?;
        let updated = client
            .execute(&statement, &[&id.0, &password_hash])
            .await
            .change_context(UserRepoError::Update)?;
        Ok(updated > 0)
    }

    async fn list(
        &self,
        criteria: UserListCriteria,
        sort: UserSort,
    ) -> RepoResult<Page<User>, UserRepoError> {
        let page = sanitize_pagination(&criteria);

        let mut builder = WhereBuilder::new();
        for filter in criteria.filters() {
            match filter {
                UserFilter::Search(text) => builder.contains_any(
                    &["u.first_name", "u.last_name", "u.username", "u.email"],
                    text,
                ),
                UserFilter::Role(role) => builder.eq("u.role", role.as_str()),
                UserFilter::Active(active) => builder.eq("u.is_active", *active),
            };
        }
        let filter = builder.build();

        let next = filter.next_placeholder();
        let list_sql = format!(
            "{}{}{} LIMIT ${} OFFSET ${}",
            users::LIST,
            filter.clause,
            order_by(sort),
            next,
            next + 1
        );
        let count_sql = format!("{}{}", users::COUNT, filter.clause);

        let client = self.client(UserRepoError::List).await?;
        let list_statement = client
            .prepare_cached(&list_sql)
            .await
            .change_context(UserRepoError::List)
            .attach_with(|| list_sql.clone())?;
        let count_statement = client
            .prepare_cached(&count_sql)
            .await
            .change_context(UserRepoError::List)?;

        let rows = client
            .query(&list_statement, &filter.params_with(&[&page.limit, &page.offset]))
            .await
            .change_context(UserRepoError::List)?;
        let total: i64 = client
            .query_one(&count_statement, &filter.params())
            .await
            .change_context(UserRepoError::List)?
            .get(0);

        let users = map_rows(&rows, row_to_user).change_context(UserRepoError::List)?;
        Ok(Page::new(users, count(total)))
    }

    async fn admin_update(
        &self,
        id: UserId,
        update: AdminUserUpdate,
    ) -> OptRepoResult<User, UserRepoError> {
        let (phone_set, phone) = field_parts(&update.phone);
        let (bio_set, bio) = field_parts(&update.bio);

        let client = self.client(UserRepoError::Update).await?;
        let statement = client
            .prepare_cached(users::ADMIN_UPDATE)
            .await
            .change_context(UserRepoError::Update)?;

        let result = client
            .query_opt(
                &statement,
                &[
                    &id.0,
                    &update.first_name,
                    &update.last_name,
                    &update.username,
                    &update.email,
                    &update.role.map(|r| r.as_str()),
                    &update.is_active,
                    &phone_set,
                    &phone,
                    &bio_set,
                    &bio,
                ],
            )
            .await;

        match result {
            Ok(row) => row
                .map(|row| row_to_user(&row))
                .transpose()
                .change_context(UserRepoError::Update),
            Err(e) if is_unique_violation(&e) => {
                Err(Report::new(e)).change_context(UserRepoError::Duplicate)
            }
            Err(e) => Err(Report::new(e)).change_context(UserRepoError::Update),
        }
    }

    async fn deactivate(&self, id: UserId) -> RepoResult<bool, UserRepoError> {
        let client = self.client(UserRepoError::Delete).await?;
        let statement = client
            .prepare_cached(users::DEACTIVATE)
            .await
            .change_context(UserRepoError::Delete)?;
        let updated = client
            .execute(&statement, &[&id.0])
            .await
            .change_context(UserRepoError::Delete)?;
        Ok(updated > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heritage_core::filter::SortOrder;

    #[test]
    fn order_by_uses_whitelisted_column_and_id_tiebreak() {
        let sort = UserSort {
            field: UserSortField::LastLogin,
            order: SortOrder::Asc,
        };
        assert_eq!(" ORDER BY u.last_login ASC, u.id ASC", order_by(sort));
        assert_eq!(
            " ORDER BY u.created DESC, u.id DESC",
            order_by(UserSort::default())
        );
    }
}
