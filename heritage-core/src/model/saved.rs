use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ids::{HeritageId, SavedHeritageId, UserId};
use crate::model::heritage::{Category, HeritageView};

/// A bookmark of an active heritage, with the heritage and its images.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavedHeritage {
    pub id: SavedHeritageId,
    pub user_id: UserId,
    pub heritage_id: HeritageId,
    #[serde(rename = "createdAt")]
    pub created: DateTime<Utc>,
    pub heritage: HeritageView,
}

/// A saved heritage in the compact form used by the user dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavedHeritageCard {
    pub id: SavedHeritageId,
    pub heritage_id: HeritageId,
    pub saved_date: DateTime<Utc>,
    pub heritage: HeritageCard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeritageCard {
    pub id: HeritageId,
    pub name: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Category,
}

impl SavedHeritageCard {
    /// Builds the card from a saved heritage. `image_url` is taken from the primary image.
    pub fn from_saved(saved: &SavedHeritage, with_description: bool) -> Self {
        let view = &saved.heritage;
        Self {
            id: saved.id,
            heritage_id: saved.heritage_id,
            saved_date: saved.created,
            heritage: HeritageCard {
                id: view.heritage.id,
                name: view.heritage.name.clone(),
                location: view.heritage.location.clone(),
                description: if with_description {
                    view.heritage.description.clone()
                } else {
                    None
                },
                image_url: view.primary_image().and_then(|i| i.url.clone()),
                category: view.heritage.category,
            },
        }
    }
}
