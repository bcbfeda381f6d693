use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use utoipa::ToSchema;
use uuid::Uuid;

macro_rules! uuid_id {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash, Copy, Clone)]
            #[repr(transparent)]
            #[serde(transparent)]
            #[schema(value_type = String, format = Uuid)]
            pub struct $name(pub Uuid);

            impl $name {
                /// Generates a new, time ordered id.
                pub fn new() -> Self {
                    Self(Uuid::now_v7())
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl From<Uuid> for $name {
                fn from(value: Uuid) -> Self {
                    Self(value)
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

uuid_id!(
    UserId,
    HeritageId,
    ImageId,
    CommentId,
    ReviewId,
    SavedHeritageId,
    /// Identifies a stored push subscription. The endpoint url is the natural key,
    /// this is only used as the row id.
    SubscriptionId,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_uuid_strings() {
        let id = HeritageId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(format!("\"{}\"", id.0), json);
    }

    #[test]
    fn new_ids_are_time_ordered() {
        let first = CommentId::new();
        let second = CommentId::new();
        assert!(first.0 < second.0);
    }
}
