//! Field lookups used to find an existing Location for an address.
//!
//! A `None` query value only matches a `None` column, whatever the lookup,
//! mirroring SQL `IS NULL`.

use crate::domain::model::{Condition, Location, LocationMatch, LocationQuery, Lookup};

pub fn condition_matches(location: &Location, condition: &Condition) -> bool {
    let actual = condition.field.value_of(location);
    match (condition.value.as_deref(), actual) {
        (None, None) => true,
        (None, Some(_)) | (Some(_), None) => false,
        (Some(wanted), Some(actual)) => match condition.lookup {
            Lookup::Exact => actual == wanted,
            Lookup::IExact => actual.to_lowercase() == wanted.to_lowercase(),
            Lookup::StartsWith => actual.starts_with(wanted),
        },
    }
}

pub fn query_matches(location: &Location, query: &LocationQuery) -> bool {
    query
        .conditions
        .iter()
        .all(|condition| condition_matches(location, condition))
}

/// Runs `query` over `locations`; only a single hit counts as a match.
pub fn find_matching<'a, I>(locations: I, query: &LocationQuery) -> LocationMatch
where
    I: IntoIterator<Item = &'a Location>,
{
    let mut hits: Vec<Location> = locations
        .into_iter()
        .filter(|location| query_matches(location, query))
        .cloned()
        .collect();

    match hits.len() {
        0 => LocationMatch::None,
        1 => LocationMatch::Unique(hits.remove(0)),
        _ => LocationMatch::Ambiguous(hits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{LocationField, LocationFields};

    fn location(id: i64, street: Option<&str>, city: &str, zip: &str) -> Location {
        Location {
            id,
            name: None,
            fields: LocationFields {
                street_address: street.map(str::to_string),
                city: Some(city.to_string()),
                state: Some("PA".to_string()),
                zip_code: Some(zip.to_string()),
                ..LocationFields::default()
            },
        }
    }

    #[test]
    fn test_address_query_is_case_insensitive_with_zip_prefix() {
        let locations = vec![
            location(1, Some("1501 Buena Vista Road"), "Pittsburgh", "15212-1234"),
            location(2, Some("100 Grant Street"), "Pittsburgh", "15219"),
        ];
        let fields = LocationFields {
            street_address: Some("1501 BUENA VISTA ROAD".to_string()),
            city: Some("pittsburgh".to_string()),
            state: Some("pa".to_string()),
            zip_code: Some("15212".to_string()),
            ..LocationFields::default()
        };

        let found = find_matching(&locations, &LocationQuery::by_address(&fields));
        assert_eq!(found.unique().map(|l| l.id), Some(1));
    }

    #[test]
    fn test_exact_lookup_keeps_whitespace_differences_apart() {
        let locations = vec![location(
            1,
            Some("1501 Buena Vista  Road"),
            "Pittsburgh",
            "15212",
        )];
        let query = LocationQuery::new().with(
            LocationField::StreetAddress,
            Lookup::IExact,
            Some("1501 Buena Vista Road"),
        );

        assert_eq!(find_matching(&locations, &query), LocationMatch::None);
    }

    #[test]
    fn test_none_value_matches_only_missing_column() {
        let locations = vec![
            location(1, None, "Pittsburgh", "15212"),
            location(2, Some("100 Grant Street"), "Pittsburgh", "15212"),
        ];
        let query = LocationQuery::new()
            .with(LocationField::StreetAddress, Lookup::IExact, None)
            .with(LocationField::ZipCode, Lookup::StartsWith, Some("152"));

        assert_eq!(find_matching(&locations, &query).unique().map(|l| l.id), Some(1));
    }

    #[test]
    fn test_several_hits_are_ambiguous() {
        let locations = vec![
            location(1, Some("100 Grant Street"), "Pittsburgh", "15219"),
            location(2, Some("100 grant street"), "Pittsburgh", "15219"),
        ];
        let query = LocationQuery::new().with(
            LocationField::StreetAddress,
            Lookup::IExact,
            Some("100 Grant Street"),
        );

        match find_matching(&locations, &query) {
            LocationMatch::Ambiguous(hits) => assert_eq!(hits.len(), 2),
            other => panic!("expected ambiguous match, got {other:?}"),
        }
    }
}
