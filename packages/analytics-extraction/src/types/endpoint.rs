//! Endpoint descriptors for the Algolia Analytics API.
//!
//! Every stream runs through the same engine; what differs between them is
//! captured here as data: the path, where the record array lives in the
//! response, the primary keys, paging and window defaults, and any fixed
//! query parameters.

use serde::Serialize;
use serde_json::{json, Map, Value};

/// Field the engine bookmarks on.
pub const REPLICATION_KEY: &str = "date";

/// Cold-start lookback when neither state nor config gives a start date.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Page size for offset pagination.
pub const DEFAULT_PAGE_LIMIT: u32 = 1000;

/// Location of the record array in a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordArray {
    /// Count-style endpoints: `{"dates": [...]}`
    Dates,
    /// Query-list endpoints: `{"searches": [...]}`
    Searches,
}

impl RecordArray {
    pub fn key(&self) -> &'static str {
        match self {
            RecordArray::Dates => "dates",
            RecordArray::Searches => "searches",
        }
    }
}

/// JSON type of a declared property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Date,
    ClickPositions,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Property {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: PropertyType,
}

const fn prop(name: &'static str, kind: PropertyType) -> Property {
    Property { name, kind }
}

/// Static description of one analytics stream.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointDescriptor {
    pub name: &'static str,
    pub path: &'static str,
    pub record_array: RecordArray,
    pub primary_keys: &'static [&'static str],
    pub default_window_days: u32,
    pub page_limit: u32,
    pub supports_click_analytics: bool,
    /// Fixed query parameters sent on every page.
    pub extra_params: &'static [(&'static str, &'static str)],
    pub properties: &'static [Property],
}

const DATE_KEYS: &[&str] = &["index_name", "date"];
const SEARCH_KEYS: &[&str] = &["index_name", "search", "date"];

use PropertyType::{ClickPositions, Date, Integer, Number, String as Str};

static CATALOG: [EndpointDescriptor; 8] = [
    EndpointDescriptor {
        name: "users_count",
        path: "/2/users/count",
        record_array: RecordArray::Dates,
        primary_keys: DATE_KEYS,
        default_window_days: DEFAULT_WINDOW_DAYS,
        page_limit: DEFAULT_PAGE_LIMIT,
        supports_click_analytics: false,
        extra_params: &[],
        properties: &[
            prop("index_name", Str),
            prop("count", Integer),
            prop("date", Str),
            prop("start_date", Str),
            prop("end_date", Str),
        ],
    },
    EndpointDescriptor {
        name: "top_searches",
        path: "/2/searches",
        record_array: RecordArray::Searches,
        primary_keys: SEARCH_KEYS,
        default_window_days: DEFAULT_WINDOW_DAYS,
        page_limit: DEFAULT_PAGE_LIMIT,
        supports_click_analytics: true,
        extra_params: &[
            ("revenueAnalytics", "false"),
            ("orderBy", "searchCount"),
            ("direction", "desc"),
        ],
        properties: &[
            prop("index_name", Str),
            prop("search", Str),
            prop("count", Integer),
            prop("nbHits", Integer),
            prop("trackedSearchCount", Integer),
            prop("clickCount", Integer),
            prop("clickThroughRate", Number),
            prop("conversionCount", Integer),
            prop("conversionRate", Number),
            prop("averageClickPosition", Number),
            prop("clickPositions", ClickPositions),
            prop("date", Str),
            prop("start_date", Str),
            prop("end_date", Str),
        ],
    },
    EndpointDescriptor {
        name: "searches_count",
        path: "/2/searches/count",
        record_array: RecordArray::Dates,
        primary_keys: DATE_KEYS,
        default_window_days: DEFAULT_WINDOW_DAYS,
        page_limit: DEFAULT_PAGE_LIMIT,
        supports_click_analytics: false,
        extra_params: &[],
        properties: &[
            prop("index_name", Str),
            prop("count", Integer),
            prop("date", Str),
            prop("start_date", Str),
            prop("end_date", Str),
        ],
    },
    EndpointDescriptor {
        name: "no_results_rate",
        path: "/2/searches/noResultRate",
        record_array: RecordArray::Dates,
        primary_keys: DATE_KEYS,
        default_window_days: DEFAULT_WINDOW_DAYS,
        page_limit: DEFAULT_PAGE_LIMIT,
        supports_click_analytics: false,
        extra_params: &[],
        properties: &[
            prop("index_name", Str),
            prop("count", Integer),
            prop("noResultCount", Integer),
            prop("rate", Number),
            prop("date", Date),
            prop("start_date", Date),
            prop("end_date", Date),
        ],
    },
    EndpointDescriptor {
        name: "click_through_rate",
        path: "/2/clicks/clickThroughRate",
        record_array: RecordArray::Dates,
        primary_keys: DATE_KEYS,
        default_window_days: DEFAULT_WINDOW_DAYS,
        page_limit: DEFAULT_PAGE_LIMIT,
        supports_click_analytics: false,
        extra_params: &[],
        properties: &[
            prop("index_name", Str),
            prop("clickCount", Integer),
            prop("trackedSearchCount", Integer),
            prop("rate", Number),
            prop("date", Date),
            prop("start_date", Date),
            prop("end_date", Date),
        ],
    },
    EndpointDescriptor {
        name: "no_click_rate",
        path: "/2/searches/noClickRate",
        record_array: RecordArray::Dates,
        primary_keys: DATE_KEYS,
        default_window_days: DEFAULT_WINDOW_DAYS,
        page_limit: DEFAULT_PAGE_LIMIT,
        supports_click_analytics: false,
        extra_params: &[],
        properties: &[
            prop("index_name", Str),
            prop("count", Integer),
            prop("noClickCount", Integer),
            prop("rate", Number),
            prop("date", Date),
            prop("start_date", Date),
            prop("end_date", Date),
        ],
    },
    EndpointDescriptor {
        name: "no_results_searches",
        path: "/2/searches/noResults",
        record_array: RecordArray::Searches,
        primary_keys: SEARCH_KEYS,
        default_window_days: DEFAULT_WINDOW_DAYS,
        page_limit: DEFAULT_PAGE_LIMIT,
        supports_click_analytics: false,
        extra_params: &[],
        properties: &[
            prop("index_name", Str),
            prop("search", Str),
            prop("count", Integer),
            prop("withFilterCount", Integer),
            prop("date", Str),
            prop("start_date", Str),
            prop("end_date", Str),
        ],
    },
    EndpointDescriptor {
        name: "no_clicks_searches",
        path: "/2/searches/noClicks",
        record_array: RecordArray::Searches,
        primary_keys: SEARCH_KEYS,
        default_window_days: DEFAULT_WINDOW_DAYS,
        page_limit: DEFAULT_PAGE_LIMIT,
        supports_click_analytics: false,
        extra_params: &[],
        properties: &[
            prop("index_name", Str),
            prop("search", Str),
            prop("count", Integer),
            prop("nbHits", Integer),
            prop("date", Str),
            prop("start_date", Str),
            prop("end_date", Str),
        ],
    },
];

/// All known streams, in sync order.
pub fn catalog() -> &'static [EndpointDescriptor] {
    &CATALOG
}

/// Look up a stream by name.
pub fn find_endpoint(name: &str) -> Option<&'static EndpointDescriptor> {
    CATALOG.iter().find(|e| e.name == name)
}

impl EndpointDescriptor {
    /// JSON schema for the records this stream emits.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for property in self.properties {
            properties.insert(property.name.to_string(), property_schema(property.kind));
        }
        json!({
            "type": "object",
            "properties": properties,
        })
    }
}

fn property_schema(kind: PropertyType) -> Value {
    match kind {
        PropertyType::String => json!({"type": ["string", "null"]}),
        PropertyType::Integer => json!({"type": ["integer", "null"]}),
        PropertyType::Number => json!({"type": ["number", "null"]}),
        PropertyType::Date => json!({"type": ["string", "null"], "format": "date"}),
        PropertyType::ClickPositions => json!({
            "type": ["array", "null"],
            "items": {
                "type": "object",
                "properties": {
                    "position": {"type": ["array", "null"], "items": {"type": "integer"}},
                    "clickCount": {"type": ["integer", "null"]},
                },
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let names: HashSet<_> = catalog().iter().map(|e| e.name).collect();
        assert_eq!(names.len(), catalog().len());
    }

    #[test]
    fn test_every_stream_declares_the_replication_key() {
        for endpoint in catalog() {
            assert!(endpoint.primary_keys.contains(&REPLICATION_KEY), "{}", endpoint.name);
            assert!(
                endpoint.properties.iter().any(|p| p.name == REPLICATION_KEY),
                "{}",
                endpoint.name
            );
        }
    }

    #[test]
    fn test_query_list_streams_read_searches() {
        let top = find_endpoint("top_searches").unwrap();
        assert_eq!(top.record_array, RecordArray::Searches);
        assert!(top.supports_click_analytics);
        assert!(top.extra_params.contains(&("orderBy", "searchCount")));

        let users = find_endpoint("users_count").unwrap();
        assert_eq!(users.record_array.key(), "dates");
        assert!(find_endpoint("nope").is_none());
    }

    #[test]
    fn test_json_schema_marks_dates() {
        let schema = find_endpoint("no_results_rate").unwrap().json_schema();
        assert_eq!(schema["properties"]["date"]["format"], "date");
        assert_eq!(schema["properties"]["rate"]["type"][0], "number");
    }
}
