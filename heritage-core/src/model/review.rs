use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ids::{HeritageId, ReviewId, UserId};
use crate::model::user::UserSummary;

/// A star rating, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "i64", into = "i16")]
#[schema(value_type = i16)]
pub struct Rating(u8);

#[derive(Debug, thiserror::Error)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct InvalidRating(pub i64);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, InvalidRating> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(InvalidRating(value))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = InvalidRating;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i16 {
    fn from(value: Rating) -> Self {
        value.0 as i16
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub heritage_id: HeritageId,
    pub rating: Rating,
    pub title: String,
    pub comment: String,
    pub is_verified: bool,
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated: Option<DateTime<Utc>>,
    pub user: UserSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub user_id: UserId,
    pub heritage_id: HeritageId,
    pub rating: Rating,
    pub title: String,
    pub comment: String,
}

/// `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReviewUpdate {
    pub rating: Option<Rating>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub average_rating: f64,
    pub total_reviews: u64,
}

impl ReviewSummary {
    /// An average over zero reviews is 0.
    pub fn new(average_rating: Option<f64>, total_reviews: u64) -> Self {
        Self {
            average_rating: if total_reviews == 0 {
                0.0
            } else {
                average_rating.unwrap_or_default()
            },
            total_reviews,
        }
    }
}

/// Review counts per star, always all five buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ToSchema)]
#[schema(value_type = Object)]
pub struct RatingDistribution([u64; 5]);

impl RatingDistribution {
    /// Buckets missing from `counts` stay at zero. Counts for ratings outside 1..=5 are ignored.
    pub fn from_counts(counts: impl IntoIterator<Item = (i64, u64)>) -> Self {
        let mut buckets = [0; 5];
        for (rating, count) in counts {
            if let Ok(rating) = Rating::new(rating) {
                buckets[(rating.get() - 1) as usize] += count;
            }
        }
        Self(buckets)
    }

    pub fn count(&self, rating: Rating) -> u64 {
        self.0[(rating.get() - 1) as usize]
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

impl Serialize for RatingDistribution {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let map: BTreeMap<String, u64> = self
            .0
            .iter()
            .enumerate()
            .map(|(i, count)| ((i + 1).to_string(), *count))
            .collect();
        map.serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub average_rating: f64,
    pub total_reviews: u64,
    pub rating_distribution: RatingDistribution,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert_eq!(5, Rating::new(5).unwrap().get());
        assert!(serde_json::from_value::<Rating>(json!(7)).is_err());
        assert_eq!(3, serde_json::from_value::<Rating>(json!(3)).unwrap().get());
    }

    #[test]
    fn distribution_is_zero_filled() {
        let distribution = RatingDistribution::from_counts([(5, 2), (3, 1)]);

        assert_eq!(
            json!({"1": 0, "2": 0, "3": 1, "4": 0, "5": 2}),
            serde_json::to_value(distribution).unwrap()
        );
        assert_eq!(3, distribution.total());
    }

    #[test]
    fn distribution_ignores_out_of_range_buckets() {
        let distribution = RatingDistribution::from_counts([(0, 4), (9, 1), (1, 1)]);
        assert_eq!(1, distribution.total());
        assert_eq!(1, distribution.count(Rating::new(1).unwrap()));
    }

    #[test]
    fn summary_of_no_reviews_is_zero() {
        let summary = ReviewSummary::new(None, 0);
        assert_eq!(0.0, summary.average_rating);

        let summary = ReviewSummary::new(Some(13.0 / 3.0), 3);
        assert!((summary.average_rating - 4.333).abs() < 0.001);
    }
}
