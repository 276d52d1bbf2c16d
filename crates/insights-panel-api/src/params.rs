use crate::compat::{canonical_filter_field, CanonicalField};
use crate::errors::ApiError;
use chrono::NaiveDate;
use insights_panel_query::{FilterCriteria, SortMode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Format for the `start_date` / `end_date` bounds.
pub const BOUND_DATE_FORMAT: &str = "%Y-%m-%d";

/// A fully parsed data request, shared by the GET and POST surfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataRequestParams {
    pub criteria: FilterCriteria,
    pub sort: SortMode,
    pub include_pairs: bool,
    pub pretty: bool,
}

/// Wire body for `POST /api/data` and `POST /api/options`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataRequestBody {
    #[serde(default)]
    pub filters: Option<Value>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub include_pairs: Option<bool>,
    #[serde(default)]
    pub sort: Option<String>,
}

/// Parses the `GET /api/getData` query string.
pub fn parse_data_query(query: &BTreeMap<String, String>) -> Result<DataRequestParams, ApiError> {
    let mut criteria = match query.get("filters") {
        Some(raw) => parse_filters_json(raw)?,
        None => FilterCriteria::default(),
    };
    criteria.search = clean_search(query.get("search").map(String::as_str));
    criteria.start_date = parse_bound(query.get("start_date").map(String::as_str), "start_date")?;
    criteria.end_date = parse_bound(query.get("end_date").map(String::as_str), "end_date")?;
    Ok(DataRequestParams {
        criteria,
        sort: parse_sort(query.get("sort").map(String::as_str))?,
        include_pairs: flag(query.get("include_pairs").map(String::as_str)),
        pretty: flag(query.get("pretty").map(String::as_str)),
    })
}

/// Parses the POST body shared by `/api/data` and `/api/options`.
pub fn params_from_body(body: &DataRequestBody) -> Result<DataRequestParams, ApiError> {
    let mut criteria = match &body.filters {
        Some(Value::Object(map)) => criteria_from_object(map)?,
        Some(Value::Null) | None => FilterCriteria::default(),
        Some(_) => return Err(ApiError::invalid_filter_json("filters must be a JSON object")),
    };
    criteria.search = clean_search(body.search.as_deref());
    criteria.start_date = parse_bound(body.start_date.as_deref(), "start_date")?;
    criteria.end_date = parse_bound(body.end_date.as_deref(), "end_date")?;
    Ok(DataRequestParams {
        criteria,
        sort: parse_sort(body.sort.as_deref())?,
        include_pairs: body.include_pairs.unwrap_or(false),
        pretty: false,
    })
}

fn parse_filters_json(raw: &str) -> Result<FilterCriteria, ApiError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ApiError::invalid_filter_json(&e.to_string()))?;
    match value {
        Value::Object(map) => criteria_from_object(&map),
        Value::Null => Ok(FilterCriteria::default()),
        _ => Err(ApiError::invalid_filter_json("filters must be a JSON object")),
    }
}

fn criteria_from_object(map: &Map<String, Value>) -> Result<FilterCriteria, ApiError> {
    let mut criteria = FilterCriteria::default();
    // Two passes: legacy labels first, canonical keys second, so the
    // canonical spelling wins whenever a request carries both. Unknown
    // keys are ignored.
    for legacy_pass in [true, false] {
        for (key, raw) in map {
            let Some((field, is_legacy)) = canonical_filter_field(key) else {
                continue;
            };
            if is_legacy != legacy_pass {
                continue;
            }
            let values = accepted_values(key, raw)?;
            match field {
                CanonicalField::Brand => criteria.brand = values,
                CanonicalField::Platform => criteria.platform = values,
                CanonicalField::InsightType => criteria.insight_type = values,
                CanonicalField::Month => criteria.month = values,
            }
        }
    }
    Ok(criteria)
}

fn accepted_values(key: &str, raw: &Value) -> Result<Vec<String>, ApiError> {
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(vec![trimmed.to_string()])
            }
        }
        Value::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) if !s.trim().is_empty() => values.push(s.trim().to_string()),
                    Value::String(_) => {}
                    other => {
                        return Err(ApiError::invalid_param(key, &other.to_string()));
                    }
                }
            }
            Ok(values)
        }
        other => Err(ApiError::invalid_param(key, &other.to_string())),
    }
}

fn clean_search(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn parse_bound(raw: Option<&str>, name: &str) -> Result<Option<NaiveDate>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, BOUND_DATE_FORMAT)
        .map(Some)
        .map_err(|_| ApiError::invalid_param(name, raw))
}

fn parse_sort(raw: Option<&str>) -> Result<SortMode, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(SortMode::default()),
        Some("report_date") => Ok(SortMode::ReportDate),
        Some("month") => Ok(SortMode::MonthOrdinal),
        Some(other) => Err(ApiError::invalid_param("sort", other)),
    }
}

fn flag(raw: Option<&str>) -> bool {
    raw.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}
