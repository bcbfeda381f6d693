use error_stack::Report;

pub type RepoResult<T, E> = Result<T, Report<E>>;
pub type OptRepoResult<T, E> = Result<Option<T>, Report<E>>;

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum UserRepoError {
    #[error("failed to get user")]
    Get,
    #[error("failed to list users")]
    List,
    #[error("failed to check for existing users")]
    Exists,
    #[error("failed to create user")]
    Create,
    #[error("failed to update user")]
    Update,
    #[error("failed to deactivate user")]
    Delete,
    #[error("a user with this email or username already exists")]
    Duplicate,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum HeritageRepoError {
    #[error("failed to get heritage")]
    Get,
    #[error("failed to list heritages")]
    List,
    #[error("failed to create heritage")]
    Create,
    #[error("failed to update heritage")]
    Update,
    #[error("failed to deactivate heritage")]
    Delete,
    #[error("failed to collect heritage filter options")]
    FilterOptions,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum SavedRepoError {
    #[error("failed to check saved heritage")]
    Get,
    #[error("failed to list saved heritages")]
    List,
    #[error("failed to toggle saved heritage")]
    Toggle,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum ReviewRepoError {
    #[error("failed to get review")]
    Get,
    #[error("failed to list reviews")]
    List,
    #[error("failed to create review")]
    Create,
    #[error("failed to update review")]
    Update,
    #[error("failed to deactivate review")]
    Delete,
    #[error("failed to aggregate review statistics")]
    Stats,
    #[error("user already reviewed this heritage")]
    Duplicate,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum CommentRepoError {
    #[error("failed to get comment")]
    Get,
    #[error("failed to list comments")]
    List,
    #[error("failed to create comment")]
    Create,
    #[error("failed to update comment")]
    Update,
    #[error("failed to deactivate comment")]
    Delete,
    #[error("failed to aggregate comment statistics")]
    Stats,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum SubscriptionRepoError {
    #[error("failed to list push subscriptions")]
    List,
    #[error("failed to store push subscription")]
    Upsert,
    #[error("failed to remove push subscription")]
    Delete,
    #[error("failed to aggregate push subscription statistics")]
    Stats,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum StatsRepoError {
    #[error("failed to aggregate dashboard statistics")]
    Dashboard,
    #[error("failed to aggregate user statistics")]
    Users,
    #[error("failed to aggregate heritage statistics")]
    Heritages,
    #[error("failed to aggregate activity trends")]
    Activity,
    #[error("failed to aggregate statistics for user")]
    UserActivity,
}
