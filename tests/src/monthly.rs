use crate::models::Post;

use chrono::{NaiveDate, NaiveDateTime};
use tabula::{schema::app, Condition, MappingRule, TableNameResolver};

/// Shards an entity type into one table per month: `Post` on 2019-09-05
/// resolves to `Post201909`.
///
/// The condition is a `NaiveDate` or `NaiveDateTime`. Any other condition
/// resolves to an empty name, which a remap rejects.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonthlyResolver;

impl TableNameResolver for MonthlyResolver {
    fn table_name(&self, model: &app::Model, condition: &Condition) -> String {
        let date = match (
            condition.downcast_ref::<NaiveDate>(),
            condition.downcast_ref::<NaiveDateTime>(),
        ) {
            (Some(date), _) => *date,
            (None, Some(date_time)) => date_time.date(),
            (None, None) => return String::new(),
        };

        format!("{}{}", model.name, date.format("%Y%m"))
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn day(date: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
}

/// Maps `Post` to the monthly table of `date`.
pub fn month_rule(date: &str) -> MappingRule {
    MappingRule::new::<Post>(MonthlyResolver, day(date))
}
