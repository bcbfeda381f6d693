use repository::{
    CommentRepository, HeritageRepository, ReviewRepository, SavedHeritageRepository,
    StatsRepository, SubscriptionRepository, UserRepository,
};

pub mod comment_tree;
pub mod filter;
pub mod ids;
pub mod list_criteria;
pub mod model;
pub mod pagination;
pub mod repository;
pub mod result;

/// Bundles one implementation of every repository. Services are generic over it.
pub trait HeritageEngine: Clone + Send + Sync + 'static {
    type Users: UserRepository + Send + Sync + 'static;
    type Heritages: HeritageRepository + Send + Sync + 'static;
    type Saved: SavedHeritageRepository + Send + Sync + 'static;
    type Reviews: ReviewRepository + Send + Sync + 'static;
    type Comments: CommentRepository + Send + Sync + 'static;
    type Subscriptions: SubscriptionRepository + Send + Sync + 'static;
    type Stats: StatsRepository + Send + Sync + 'static;

    fn users(&self) -> &Self::Users;
    fn heritages(&self) -> &Self::Heritages;
    fn saved(&self) -> &Self::Saved;
    fn reviews(&self) -> &Self::Reviews;
    fn comments(&self) -> &Self::Comments;
    fn subscriptions(&self) -> &Self::Subscriptions;
    fn stats(&self) -> &Self::Stats;
}
