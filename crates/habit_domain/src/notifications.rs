use chrono::NaiveDate;

/// Front-end adapters implement this to learn when their view is out of date.
pub trait ChangeListener: Send + Sync {
    /// A habit owned by `owner` changed in storage; refetch before rendering.
    fn habits_changed(&self, owner: &str);
    fn day_changed(&self, today: NaiveDate);
}
