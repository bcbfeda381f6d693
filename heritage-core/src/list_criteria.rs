use crate::pagination::{MAX_PAGE_SIZE, Pagination};

type TagBits = u8;

/// Identifies the kind of a filter. Each kind can be applied to a [`ListCriteria`] once.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Tag {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
    Sixteen = 16,
    ThirtyTwo = 32,
    SixtyFour = 64,
    OneTwentyEight = 128,
}

pub trait ListFilter: Sized {
    fn tag(&self) -> Tag;

    fn criteria(pagination: Pagination, default_limit: u64) -> ListCriteria<Self> {
        ListCriteria::new(pagination, default_limit)
    }
}

/// Filters for listings that only paginate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoFilter {}

impl ListFilter for NoFilter {
    fn tag(&self) -> Tag {
        match *self {}
    }
}

pub type PageCriteria = ListCriteria<NoFilter>;

#[derive(Debug, Clone, PartialEq)]
pub struct ListCriteria<T> {
    filters: Vec<T>,
    applied: TagBits,
    pagination: Pagination,
    default_limit: u64,
}

impl<T> ListCriteria<T> {
    pub fn new(pagination: Pagination, default_limit: u64) -> Self {
        Self {
            filters: Vec::new(),
            applied: 0,
            pagination,
            default_limit,
        }
    }

    /// 1 based, a requested page of 0 is treated as the first page
    pub fn page(&self) -> u64 {
        self.pagination.page.max(1)
    }

    pub fn limit(&self) -> u64 {
        self.pagination
            .limit
            .unwrap_or(self.default_limit)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn filters(&self) -> &[T] {
        &self.filters
    }
}

impl<T> ListCriteria<T>
where
    T: ListFilter,
{
    /// Adds the filter unless a filter of the same kind was already applied.
    pub fn add(&mut self, filter: T) -> &mut Self {
        let tag = filter.tag() as TagBits;

        if tag & self.applied == 0 {
            self.applied |= tag;
            self.filters.push(filter);
        }

        self
    }

    pub fn with(mut self, filter: T) -> Self {
        self.add(filter);
        self
    }

    pub fn with_opt(mut self, filter: Option<T>) -> Self {
        if let Some(filter) = filter {
            self.add(filter);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, PartialEq, Debug, Eq)]
    enum TestFilter {
        Test1(u8),
        Test2,
        Test3,
    }

    impl ListFilter for TestFilter {
        fn tag(&self) -> Tag {
            match self {
                TestFilter::Test1(_) => Tag::One,
                TestFilter::Test2 => Tag::Two,
                TestFilter::Test3 => Tag::Four,
            }
        }
    }

    #[test]
    fn each_filter_can_only_be_applied_once() {
        let mut criteria = TestFilter::criteria(Pagination::default(), 10);
        for i in 0..10 {
            criteria.add(TestFilter::Test1(i));
        }

        for _ in 0..10 {
            criteria.add(TestFilter::Test2);
        }

        for _ in 0..10 {
            criteria.add(TestFilter::Test3);
        }

        assert_eq!(
            &[TestFilter::Test1(0), TestFilter::Test2, TestFilter::Test3],
            criteria.filters()
        );
    }

    #[test]
    fn default_limit_used_when_none_requested() {
        let criteria = TestFilter::criteria(Pagination::with_default_limit(3), 20);
        assert_eq!(20, criteria.limit());
        assert_eq!(40, criteria.offset());
    }

    #[test]
    fn limit_is_clamped() {
        let zero = TestFilter::criteria(Pagination::with_limit(1, 0), 20);
        assert_eq!(1, zero.limit());

        let huge = TestFilter::criteria(Pagination::with_limit(1, 10_000), 20);
        assert_eq!(MAX_PAGE_SIZE, huge.limit());
    }

    #[test]
    fn page_zero_is_first_page() {
        let criteria = TestFilter::criteria(Pagination::with_limit(0, 10), 20);
        assert_eq!(1, criteria.page());
        assert_eq!(0, criteria.offset());
    }

    #[test]
    fn huge_page_does_not_overflow_offset() {
        let criteria = TestFilter::criteria(Pagination::with_limit(u64::MAX, 50), 20);
        assert_eq!(u64::MAX, criteria.offset());
    }
}
