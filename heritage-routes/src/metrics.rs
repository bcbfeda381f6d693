const HERITAGES_RETRIEVED_METRIC_NAME: &str = "heritages_retrieved";
const HERITAGES_CREATED_METRIC_NAME: &str = "num_heritages_created";
const HERITAGES_UPDATED_METRIC_NAME: &str = "num_heritages_updated";
const HERITAGES_DELETED_METRIC_NAME: &str = "num_heritages_deleted";

const USERS_REGISTERED_METRIC_NAME: &str = "num_users_registered";
const LOGINS_METRIC_NAME: &str = "num_logins";
const FAILED_LOGINS_METRIC_NAME: &str = "num_failed_logins";

const REVIEWS_CREATED_METRIC_NAME: &str = "num_reviews_created";
const COMMENTS_CREATED_METRIC_NAME: &str = "num_comments_created";

const NOTIFICATIONS_SENT_METRIC_NAME: &str = "num_notifications_sent";
const NOTIFICATIONS_FAILED_METRIC_NAME: &str = "num_notifications_failed";
const SUBSCRIPTIONS_EVICTED_METRIC_NAME: &str = "num_push_subscriptions_evicted";

#[inline]
pub fn increment_heritages_retrieved_by(amt: usize) {
    metrics::counter!(HERITAGES_RETRIEVED_METRIC_NAME).increment(amt as u64);
}

#[inline]
pub fn increment_heritages_retrieved() {
    increment_heritages_retrieved_by(1);
}

#[inline]
pub fn increment_heritages_created() {
    metrics::counter!(HERITAGES_CREATED_METRIC_NAME).increment(1);
}

#[inline]
pub fn increment_heritages_updated() {
    metrics::counter!(HERITAGES_UPDATED_METRIC_NAME).increment(1);
}

#[inline]
pub fn increment_heritages_deleted() {
    metrics::counter!(HERITAGES_DELETED_METRIC_NAME).increment(1);
}

#[inline]
pub fn increment_users_registered() {
    metrics::counter!(USERS_REGISTERED_METRIC_NAME).increment(1);
}

#[inline]
pub fn increment_logins() {
    metrics::counter!(LOGINS_METRIC_NAME).increment(1);
}

#[inline]
pub fn increment_failed_logins() {
    metrics::counter!(FAILED_LOGINS_METRIC_NAME).increment(1);
}

#[inline]
pub fn increment_reviews_created() {
    metrics::counter!(REVIEWS_CREATED_METRIC_NAME).increment(1);
}

#[inline]
pub fn increment_comments_created() {
    metrics::counter!(COMMENTS_CREATED_METRIC_NAME).increment(1);
}

#[inline]
pub fn increment_notifications_sent_by(amt: usize) {
    metrics::counter!(NOTIFICATIONS_SENT_METRIC_NAME).increment(amt as u64);
}

#[inline]
pub fn increment_notifications_failed_by(amt: usize) {
    metrics::counter!(NOTIFICATIONS_FAILED_METRIC_NAME).increment(amt as u64);
}

#[inline]
pub fn increment_subscriptions_evicted_by(amt: u64) {
    metrics::counter!(SUBSCRIPTIONS_EVICTED_METRIC_NAME).increment(amt);
}
