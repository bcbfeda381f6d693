use deadpool_postgres::{Object, Pool};
use error_stack::{Report, ResultExt};
use heritage_core::ids::{HeritageId, SavedHeritageId, UserId};
use heritage_core::list_criteria::PageCriteria;
use heritage_core::model::saved::SavedHeritage;
use heritage_core::pagination::Page;
use heritage_core::repository::SavedHeritageRepository;
use heritage_core::result::{RepoResult, SavedRepoError};
use tracing::debug;

use crate::postgres::rows::{map_rows, row_to_saved};
use crate::postgres::statements::{self, saved};
use crate::postgres::{RepoInitErr, count, sanitize_pagination};

#[derive(Clone)]
pub struct SavedHeritageRepo {
    pool: Pool,
}

impl SavedHeritageRepo {
    pub async fn new(pool: Pool) -> Result<Self, Report<RepoInitErr>> {
        let client = pool.get().await.change_context(RepoInitErr("saved heritages"))?;
        statements::verify(&client, saved::ALL)
            .await
            .change_context(RepoInitErr("saved heritages"))?;
        drop(client);

        Ok(Self { pool })
    }

    async fn client(&self, on_err: SavedRepoError) -> RepoResult<Object, SavedRepoError> {
        self.pool.get().await.change_context(on_err)
    }
}

impl SavedHeritageRepository for SavedHeritageRepo {
    async fn is_saved(&self, user: UserId, heritage: HeritageId) -> RepoResult<bool, SavedRepoError> {
        let client = self.client(SavedRepoError::Get).await?;
        let statement = client
            .prepare_cached(saved::IS_SAVED)
            .await
            .change_context(SavedRepoError::Get)?;
        let row = client
            .query_one(&statement, &[&user.0, &heritage.0])
            .await
            .change_context(SavedRepoError::Get)?;
        Ok(row.get(0))
    }

    async fn toggle(&self, user: UserId, heritage: HeritageId) -> RepoResult<bool, SavedRepoError> {
        let mut client = self.client(SavedRepoError::Toggle).await?;
        let tx = client
            .transaction()
            .await
            .change_context(SavedRepoError::Toggle)?;

        let delete = tx
            .prepare_cached(saved::DELETE)
            .await
            .change_context(SavedRepoError::Toggle)?;
        let removed = tx
            .execute(&delete, &[&user.0, &heritage.0])
            .await
            .change_context(SavedRepoError::Toggle)?;

        let saved_now = if removed > 0 {
            false
        } else {
            let insert = tx
                .prepare_cached(saved::INSERT)
                .await
                .change_context(SavedRepoError::Toggle)?;
            tx.execute(&insert, &[&SavedHeritageId::new().0, &user.0, &heritage.0])
                .await
                .change_context(SavedRepoError::Toggle)?;
            true
        };

        tx.commit().await.change_context(SavedRepoError::Toggle)?;
        debug!(%user, %heritage, saved_now, "toggled saved heritage");

        Ok(saved_now)
    }

    async fn list_page(
        &self,
        user: UserId,
        criteria: PageCriteria,
    ) -> RepoResult<Page<SavedHeritage>, SavedRepoError> {
        let page = sanitize_pagination(&criteria);

        let client = self.client(SavedRepoError::List).await?;
        let list = client
            .prepare_cached(saved::LIST_PAGE)
            .await
            .change_context(SavedRepoError::List)?;
        let total = client
            .prepare_cached(saved::COUNT)
            .await
            .change_context(SavedRepoError::List)?;

        let rows = client
            .query(&list, &[&user.0, &page.limit, &page.offset])
            .await
            .change_context(SavedRepoError::List)?;
        let total: i64 = client
            .query_one(&total, &[&user.0])
            .await
            .change_context(SavedRepoError::List)?
            .get(0);

        let saved = map_rows(&rows, row_to_saved).change_context(SavedRepoError::List)?;
        Ok(Page::new(saved, count(total)))
    }

    async fn list_recent(
        &self,
        user: UserId,
        limit: Option<u64>,
    ) -> RepoResult<Vec<SavedHeritage>, SavedRepoError> {
        let limit = limit
            .map(i64::try_from)
            .transpose()
            .change_context(SavedRepoError::List)?;

        let client = self.client(SavedRepoError::List).await?;
        let statement = client
            .prepare_cached(saved::LIST_RECENT)
            .await
            .change_context(SavedRepoError::List)?;
        let rows = client
            .query(&statement, &[&user.0, &limit])
            .await
            .change_context(SavedRepoError::List)?;

        map_rows(&rows, row_to_saved).change_context(SavedRepoError::List)
    }
}
