use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use optional_field::Field;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ids::{HeritageId, ImageId, UserId};
use crate::model::user::UserSummary;

pub const SHORT_DESCRIPTION_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Temple,
    Palace,
    Monument,
    Museum,
    Natural,
    Fortress,
    Monastery,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CategoryInfo {
    pub value: Category,
    pub label: &'static str,
    pub description: &'static str,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Temple,
        Category::Palace,
        Category::Monument,
        Category::Museum,
        Category::Natural,
        Category::Fortress,
        Category::Monastery,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Temple => "temple",
            Category::Palace => "palace",
            Category::Monument => "monument",
            Category::Museum => "museum",
            Category::Natural => "natural",
            Category::Fortress => "fortress",
            Category::Monastery => "monastery",
            Category::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Temple => "Temple",
            Category::Palace => "Palace",
            Category::Monument => "Monument",
            Category::Museum => "Museum",
            Category::Natural => "Natural Site",
            Category::Fortress => "Fortress",
            Category::Monastery => "Monastery",
            Category::Other => "Other",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Category::Temple => "Religious temples and shrines",
            Category::Palace => "Royal palaces and residences",
            Category::Monument => "Historical monuments and memorials",
            Category::Museum => "Museums and cultural centers",
            Category::Natural => "Natural heritage sites and landscapes",
            Category::Fortress => "Fortresses and defensive structures",
            Category::Monastery => "Buddhist monasteries and religious centers",
            Category::Other => "Other heritage sites and landmarks",
        }
    }

    pub fn catalogue() -> Vec<CategoryInfo> {
        Self::ALL
            .iter()
            .map(|c| CategoryInfo {
                value: *c,
                label: c.label(),
                description: c.description(),
            })
            .collect()
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown heritage category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Heritage {
    pub id: HeritageId,
    pub name: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub location: String,
    pub category: Category,
    pub historical_period: Option<String>,
    pub built_year: Option<i32>,
    pub architect: Option<String>,
    pub significance: Option<String>,
    pub visiting_hours: Option<String>,
    pub opening_hours: Option<String>,
    pub entry_fee: Option<f64>,
    pub accessibility: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
    pub featured: bool,
    pub created_by: UserId,
    #[serde(rename = "createdAt")]
    pub created: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: ImageId,
    pub filename: String,
    pub original_name: String,
    pub path: String,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
    pub is_primary: bool,
    pub caption: Option<String>,
    pub heritage_id: HeritageId,
    pub uploaded_by: UserId,
    #[serde(rename = "createdAt")]
    pub created: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated: Option<DateTime<Utc>>,
    /// public url, filled in when the image leaves the service layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Image {
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.url = Some(format!(
            "{}/uploads/{}",
            base_url.trim_end_matches('/'),
            self.filename
        ));
        self
    }
}

/// A heritage together with its images and creator. Listings only carry the primary image,
/// detail reads carry all of them, primary first then oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HeritageView {
    #[serde(flatten)]
    pub heritage: Heritage,
    pub images: Vec<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserSummary>,
}

impl HeritageView {
    pub fn with_image_urls(mut self, base_url: &str) -> Self {
        self.images = self
            .images
            .into_iter()
            .map(|i| i.with_base_url(base_url))
            .collect();
        self
    }

    pub fn primary_image(&self) -> Option<&Image> {
        self.images
            .iter()
            .find(|i| i.is_primary)
            .or_else(|| self.images.first())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHeritage {
    pub name: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub location: String,
    pub category: Category,
    pub historical_period: Option<String>,
    pub built_year: Option<i32>,
    pub architect: Option<String>,
    pub significance: Option<String>,
    pub visiting_hours: Option<String>,
    pub opening_hours: Option<String>,
    pub entry_fee: Option<f64>,
    pub accessibility: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub featured: bool,
    pub created_by: UserId,
}

/// First [`SHORT_DESCRIPTION_LEN`] characters of the description.
pub fn short_description(description: &str) -> String {
    description.chars().take(SHORT_DESCRIPTION_LEN).collect()
}

/// Partial heritage update. `Missing` and `None` keep the stored value,
/// `Present(None)` clears a nullable column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeritageUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub location: Option<String>,
    pub category: Option<Category>,
    pub featured: Option<bool>,
    pub historical_period: Field<String>,
    pub built_year: Field<i32>,
    pub architect: Field<String>,
    pub significance: Field<String>,
    pub visiting_hours: Field<String>,
    pub entry_fee: Field<f64>,
    pub accessibility: Field<String>,
    pub latitude: Field<f64>,
    pub longitude: Field<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewImage {
    pub filename: String,
    pub original_name: String,
    pub path: String,
    pub size: i64,
    pub mime_type: String,
    pub is_primary: bool,
    pub caption: String,
    pub uploaded_by: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct YearRange {
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeeRange {
    pub min_fee: Option<f64>,
    pub max_fee: Option<f64>,
}

/// Distinct values available for the listing filters, computed over active heritages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub locations: Vec<String>,
    pub historical_periods: Vec<String>,
    pub year_range: YearRange,
    pub fee_range: FeeRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_every_category_once() {
        let catalogue = Category::catalogue();
        assert_eq!(8, catalogue.len());
        assert_eq!(Category::Temple, catalogue[0].value);
        assert_eq!("Natural Site", Category::Natural.label());
        for info in catalogue {
            assert_eq!(info.value, info.value.as_str().parse().unwrap());
        }
    }

    #[test]
    fn short_description_respects_char_boundaries() {
        let long = "नेपाल".repeat(100);
        let short = short_description(&long);
        assert_eq!(SHORT_DESCRIPTION_LEN, short.chars().count());

        assert_eq!("tiny", short_description("tiny"));
    }

    #[test]
    fn image_url_is_built_from_filename() {
        let image = Image {
            id: ImageId::new(),
            filename: "abc.jpg".into(),
            original_name: "temple.jpg".into(),
            path: "uploads/abc.jpg".into(),
            size: Some(10),
            mime_type: Some("image/jpeg".into()),
            is_primary: true,
            caption: None,
            heritage_id: HeritageId::new(),
            uploaded_by: UserId::new(),
            created: Utc::now(),
            updated: None,
            url: None,
        };

        let image = image.with_base_url("http://localhost:5000/");
        assert_eq!(
            Some("http://localhost:5000/uploads/abc.jpg"),
            image.url.as_deref()
        );
    }
}
