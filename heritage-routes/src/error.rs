//! Service errors. The display text of each variant is the message returned to clients
//! with the 500 response of the failed operation.

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum AuthServiceError {
    #[error("Registration failed")]
    Register,
    #[error("Login failed")]
    Login,
    #[error("Failed to get profile")]
    Profile,
    #[error("Failed to update profile")]
    UpdateProfile,
    #[error("Failed to upload profile image")]
    ProfileImage,
    #[error("Failed to change password")]
    ChangePassword,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum HeritageServiceError {
    #[error("Failed to fetch heritages")]
    List,
    #[error("Failed to fetch heritage")]
    Get,
    #[error("Failed to create heritage site")]
    Create,
    #[error("Failed to update heritage site")]
    Update,
    #[error("Failed to delete heritage site")]
    Delete,
    #[error("Failed to fetch filter options")]
    FilterOptions,
    #[error("Failed to toggle save heritage")]
    ToggleSave,
    #[error("Failed to fetch saved heritages")]
    Saved,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("Failed to fetch reviews")]
    List,
    #[error("Failed to submit review")]
    Create,
    #[error("Failed to update review")]
    Update,
    #[error("Failed to delete review")]
    Delete,
    #[error("Failed to fetch user review")]
    Mine,
    #[error("Failed to fetch review statistics")]
    Stats,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Failed to fetch comments")]
    List,
    #[error("Failed to post comment")]
    Create,
    #[error("Failed to update comment")]
    Update,
    #[error("Failed to delete comment")]
    Delete,
    #[error("Failed to fetch replies")]
    Replies,
    #[error("Failed to fetch comment statistics")]
    Stats,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum AdminServiceError {
    #[error("Failed to fetch users")]
    Users,
    #[error("Failed to fetch user")]
    User,
    #[error("Failed to update user")]
    UpdateUser,
    #[error("Failed to delete user")]
    DeleteUser,
    #[error("Failed to fetch dashboard statistics")]
    Dashboard,
    #[error("Failed to fetch heritage management data")]
    HeritageManagement,
    #[error("Failed to fetch user statistics")]
    UserStats,
    #[error("Failed to fetch heritage statistics")]
    HeritageStats,
    #[error("Failed to fetch activity trends")]
    ActivityTrends,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum UserServiceError {
    #[error("Failed to get user profile")]
    Profile,
    #[error("Failed to get saved heritage sites")]
    Saved,
    #[error("Failed to get saved heritage sites summary")]
    SavedSummary,
    #[error("Failed to get user statistics")]
    Statistics,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum NotificationServiceError {
    #[error("Failed to subscribe to notifications")]
    Subscribe,
    #[error("Failed to unsubscribe from notifications")]
    Unsubscribe,
    #[error("Failed to send notifications")]
    SendToAll,
    #[error("Failed to send notification to user")]
    SendToUser,
    #[error("Failed to get notification statistics")]
    Stats,
}
