use crate::postgres::comments::CommentRepo;
use crate::postgres::heritages::HeritageRepo;
use crate::postgres::reviews::ReviewRepo;
use crate::postgres::saved::SavedHeritageRepo;
use crate::postgres::stats::StatsRepo;
use crate::postgres::subscriptions::SubscriptionRepo;
use crate::postgres::users::UserRepo;
use crate::postgres::{ConnectionDetails, RepoInitErr, RepoMigrationErr};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use error_stack::{IntoReport, Report, ResultExt};
use std::str::FromStr;
use tokio_postgres::{Client, Config, NoTls};
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("./src/postgres/migrations");
}

pub trait Init {
    type Repo;
    fn init(self, pool: Pool) -> impl Future<Output = Result<Self::Repo, Report<RepoInitErr>>>;
    fn run_migrations(
        &self,
        client: &mut Client,
    ) -> impl Future<Output = Result<(), Report<RepoMigrationErr>>>;
}

impl Init for () {
    type Repo = ();

    async fn init(self, _: Pool) -> Result<Self::Repo, Report<RepoInitErr>> {
        Err(RepoInitErr("unknown").into_report())
            .attach("init was called without specifying the repos to initialize")
    }

    async fn run_migrations(&self, _: &mut Client) -> Result<(), Report<RepoMigrationErr>> {
        Err(RepoMigrationErr.into_report())
            .attach("migrations were invoked without specifying the repos to initialize")
    }
}

/// Every repository of the heritage service, sharing one pool.
#[derive(Clone)]
pub struct PgRepos {
    pub users: UserRepo,
    pub heritages: HeritageRepo,
    pub saved: SavedHeritageRepo,
    pub reviews: ReviewRepo,
    pub comments: CommentRepo,
    pub subscriptions: SubscriptionRepo,
    pub stats: StatsRepo,
}

pub struct HeritageInit;

impl Init for HeritageInit {
    type Repo = PgRepos;

    async fn init(self, pool: Pool) -> Result<Self::Repo, Report<RepoInitErr>> {
        Ok(PgRepos {
            users: UserRepo::new(pool.clone()).await?,
            heritages: HeritageRepo::new(pool.clone()).await?,
            saved: SavedHeritageRepo::new(pool.clone()).await?,
            reviews: ReviewRepo::new(pool.clone()).await?,
            comments: CommentRepo::new(pool.clone()).await?,
            subscriptions: SubscriptionRepo::new(pool.clone()).await?,
            stats: StatsRepo::new(pool).await?,
        })
    }

    async fn run_migrations(&self, client: &mut Client) -> Result<(), Report<RepoMigrationErr>> {
        let report = embedded::migrations::runner()
            .run_async(client)
            .await
            .change_context(RepoMigrationErr)
            .attach("heritage repos")?;
        debug!(
            applied = report.applied_migrations().len(),
            "postgres migrations finished"
        );
        Ok(())
    }
}

pub struct RepoCreator<T: Init = ()> {
    initializer: T,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to create repos")]
pub struct RepoCreationErr;

impl<T> RepoCreator<T>
where
    T: Init,
{
    pub async fn create(
        self,
        connection_details: ConnectionDetails,
        pool_size: Option<usize>,
    ) -> Result<T::Repo, Report<RepoCreationErr>> {
        let config = match connection_details {
            ConnectionDetails::Url(url) => {
                Config::from_str(&url).change_context(RepoCreationErr)?
            }
        };

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(config, NoTls, mgr_config);
        let mut pool_builder = Pool::builder(mgr);
        if let Some(pool_size) = pool_size {
            pool_builder = pool_builder.max_size(pool_size);
        }
        debug!("building connection pool..");
        let pool = pool_builder.build().change_context(RepoCreationErr)?;
        debug!("connection pool built, running migrations");

        self.run_migrations(&pool)
            .await
            .change_context(RepoCreationErr)?;

        self.initializer
            .init(pool)
            .await
            .change_context(RepoCreationErr)
    }

    // a pool of size 1 only has one connection: hold it for the migrations, then release it
    // so the repos can verify their statements
    async fn run_migrations(&self, pool: &Pool) -> Result<(), Report<RepoMigrationErr>> {
        let mut handle = pool.get().await.change_context(RepoMigrationErr)?;

        let client = &mut **handle;

        self.initializer.run_migrations(client).await
    }
}

impl Default for RepoCreator<()> {
    fn default() -> Self {
        Self { initializer: () }
    }
}

impl RepoCreator<()> {
    pub fn with_heritage_repos(self) -> RepoCreator<HeritageInit> {
        RepoCreator {
            initializer: HeritageInit,
        }
    }
}
