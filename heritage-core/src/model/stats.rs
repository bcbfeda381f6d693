use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ids::HeritageId;
use crate::model::heritage::{Category, HeritageView};
use crate::model::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleCount {
    pub role: Role,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryCount {
    pub category: Category,
    pub count: u64,
}

/// Count for a calendar month, `month` formatted as `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MonthCount {
    pub month: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_heritages: u64,
    pub total_bookings: u64,
    pub total_saved: u64,
    pub active_users_today: u64,
    pub role_distribution: Vec<RoleCount>,
    pub category_distribution: Vec<CategoryCount>,
    pub monthly_registrations: Vec<MonthCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: u64,
    pub active_users_today: u64,
    pub role_distribution: Vec<RoleCount>,
    pub new_registrations: u64,
    pub monthly_registrations: Vec<MonthCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MostSavedHeritage {
    pub heritage_id: HeritageId,
    pub save_count: u64,
    pub heritage: HeritageRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HeritageRef {
    pub id: HeritageId,
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeritageStats {
    pub total_heritages: u64,
    pub recent_heritages: Vec<HeritageView>,
    pub category_distribution: Vec<CategoryCount>,
    pub most_saved_heritage: Option<MostSavedHeritage>,
    pub featured_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTrends {
    pub daily_registrations: Vec<DayCount>,
    pub daily_logins: Vec<DayCount>,
    pub daily_saves: Vec<DayCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PopularSite {
    pub id: HeritageId,
    pub name: String,
    pub location: String,
    pub category: Category,
    pub save_count: u64,
}

/// Per user activity shown on the user dashboard. Visits are not tracked, `visited_count` stays 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    pub saved_count: u64,
    pub visited_count: u64,
    pub total_heritages: u64,
    pub popular_sites: Vec<PopularSite>,
}
