use std::str::FromStr;

use crate::list_criteria::{ListCriteria, ListFilter, Tag};
use crate::model::heritage::Category;
use crate::model::user::Role;

pub const DEFAULT_HERITAGE_PAGE_SIZE: u64 = 10;
pub const DEFAULT_USER_PAGE_SIZE: u64 = 10;

/// Which columns a free text heritage search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// name, description, short description, location, historical period, architect, significance
    Full,
    /// name, description, location
    Basic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeritageFilter {
    Category(Category),
    Featured(bool),
    /// case insensitive substring
    Location(String),
    /// case insensitive substring
    HistoricalPeriod(String),
    /// inclusive, at least one bound is set
    BuiltYear { from: Option<i32>, to: Option<i32> },
    /// inclusive, at least one bound is set
    EntryFee { from: Option<f64>, to: Option<f64> },
    Accessibility(String),
    Search { text: String, scope: SearchScope },
}

impl ListFilter for HeritageFilter {
    fn tag(&self) -> Tag {
        match self {
            HeritageFilter::Category(_) => Tag::One,
            HeritageFilter::Featured(_) => Tag::Two,
            HeritageFilter::Location(_) => Tag::Four,
            HeritageFilter::HistoricalPeriod(_) => Tag::Eight,
            HeritageFilter::BuiltYear { .. } => Tag::Sixteen,
            HeritageFilter::EntryFee { .. } => Tag::ThirtyTwo,
            HeritageFilter::Accessibility(_) => Tag::SixtyFour,
            HeritageFilter::Search { .. } => Tag::OneTwentyEight,
        }
    }
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_owned())
    }
}

impl HeritageFilter {
    pub fn location(location: String) -> Option<Self> {
        non_blank(location).map(Self::Location)
    }

    pub fn historical_period(period: String) -> Option<Self> {
        non_blank(period).map(Self::HistoricalPeriod)
    }

    pub fn accessibility(accessibility: String) -> Option<Self> {
        non_blank(accessibility).map(Self::Accessibility)
    }

    pub fn search(text: String, scope: SearchScope) -> Option<Self> {
        non_blank(text).map(|text| Self::Search { text, scope })
    }

    pub fn built_year(from: Option<i32>, to: Option<i32>) -> Option<Self> {
        (from.is_some() || to.is_some()).then_some(Self::BuiltYear { from, to })
    }

    pub fn entry_fee(from: Option<f64>, to: Option<f64>) -> Option<Self> {
        (from.is_some() || to.is_some()).then_some(Self::EntryFee { from, to })
    }
}

pub type HeritageListCriteria = ListCriteria<HeritageFilter>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    /// case insensitive substring of first name, last name, username or email
    Search(String),
    Role(Role),
    Active(bool),
}

impl UserFilter {
    pub fn search(text: String) -> Option<Self> {
        non_blank(text).map(Self::Search)
    }
}

impl ListFilter for UserFilter {
    fn tag(&self) -> Tag {
        match self {
            UserFilter::Search(_) => Tag::One,
            UserFilter::Role(_) => Tag::Two,
            UserFilter::Active(_) => Tag::Four,
        }
    }
}

pub type UserListCriteria = ListCriteria<UserFilter>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(UnknownSortKey)
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown sort key")]
pub struct UnknownSortKey;

/// A whitelisted sort column and a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort<F> {
    pub field: F,
    pub order: SortOrder,
}

impl<F> Sort<F>
where
    F: FromStr + Default,
{
    /// Unknown or missing keys fall back to the defaults instead of failing the request.
    pub fn parse(field: Option<&str>, order: Option<&str>) -> Self {
        Self {
            field: field.and_then(|f| f.parse().ok()).unwrap_or_default(),
            order: order.and_then(|o| o.parse().ok()).unwrap_or_default(),
        }
    }
}

macro_rules! sort_fields {
    ($name:ident { $($variant:ident => $key:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl FromStr for $name {
            type Err = UnknownSortKey;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($key => Ok(Self::$variant),)+
                    _ => Err(UnknownSortKey),
                }
            }
        }
    };
}

sort_fields!(HeritageSortField {
    CreatedAt => "createdAt",
    UpdatedAt => "updatedAt",
    Name => "name",
    Location => "location",
    Category => "category",
    BuiltYear => "builtYear",
    EntryFee => "entryFee",
    Featured => "featured",
});

sort_fields!(UserSortField {
    CreatedAt => "createdAt",
    UpdatedAt => "updatedAt",
    FirstName => "firstName",
    LastName => "lastName",
    Username => "username",
    Email => "email",
    LastLogin => "lastLogin",
    Role => "role",
});

sort_fields!(ReviewSortField {
    CreatedAt => "createdAt",
    UpdatedAt => "updatedAt",
    Rating => "rating",
});

sort_fields!(CommentSortField {
    CreatedAt => "createdAt",
    UpdatedAt => "updatedAt",
});

pub type HeritageSort = Sort<HeritageSortField>;
pub type UserSort = Sort<UserSortField>;
pub type ReviewSort = Sort<ReviewSortField>;
pub type CommentSort = Sort<CommentSortField>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::Pagination;

    #[test]
    fn blank_text_filters_are_dropped() {
        assert_eq!(None, HeritageFilter::location("   ".into()));
        assert_eq!(None, HeritageFilter::search("".into(), SearchScope::Full));
        assert_eq!(
            Some(HeritageFilter::Location("Kathmandu".into())),
            HeritageFilter::location(" Kathmandu ".into())
        );
    }

    #[test]
    fn range_filters_need_a_bound() {
        assert_eq!(None, HeritageFilter::built_year(None, None));
        assert_eq!(
            Some(HeritageFilter::BuiltYear {
                from: Some(1500),
                to: None
            }),
            HeritageFilter::built_year(Some(1500), None)
        );
        assert_eq!(None, HeritageFilter::entry_fee(None, None));
    }

    #[test]
    fn all_heritage_filters_can_be_combined() {
        let criteria = HeritageFilter::criteria(Pagination::default(), DEFAULT_HERITAGE_PAGE_SIZE)
            .with(HeritageFilter::Category(Category::Temple))
            .with(HeritageFilter::Featured(true))
            .with(HeritageFilter::Location("Patan".into()))
            .with(HeritageFilter::HistoricalPeriod("Malla".into()))
            .with(HeritageFilter::BuiltYear {
                from: Some(1600),
                to: Some(1700),
            })
            .with(HeritageFilter::EntryFee {
                from: None,
                to: Some(500.0),
            })
            .with(HeritageFilter::Accessibility("wheelchair".into()))
            .with(HeritageFilter::Search {
                text: "durbar".into(),
                scope: SearchScope::Full,
            });

        assert_eq!(8, criteria.filters().len());
    }

    #[test]
    fn sort_parse_falls_back_to_defaults() {
        let sort = HeritageSort::parse(Some("name; drop table users"), Some("sideways"));
        assert_eq!(HeritageSortField::CreatedAt, sort.field);
        assert_eq!(SortOrder::Desc, sort.order);

        let sort = HeritageSort::parse(Some("builtYear"), Some("asc"));
        assert_eq!(HeritageSortField::BuiltYear, sort.field);
        assert_eq!(SortOrder::Asc, sort.order);

        let sort = UserSort::parse(Some("lastLogin"), Some("ASC"));
        assert_eq!(UserSortField::LastLogin, sort.field);
        assert_eq!(SortOrder::Asc, sort.order);
    }
}
