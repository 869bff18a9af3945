use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::database::Collection;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::registry::Registry;
use crate::schema::{CompiledSchema, FieldType};

pub fn resolve_collection(registry: &Registry, kind: &str) -> Result<Arc<Collection>, ApiError> {
    registry.resolve(kind).ok_or_else(|| ApiError::unknown_kind(kind))
}

/// Strip write-only fields from every record
pub fn redact_all(collection: &Collection, records: Vec<Map<String, Value>>) -> Vec<Map<String, Value>> {
    records.into_iter().map(|record| collection.schema().redact(record)).collect()
}

/// Build a filter from `?field=value&sort=-field&limit=10&offset=20`.
/// `sort`, `limit` and `offset` are reserved; every other parameter is an
/// equality match.
/// Values are coerced to the declared field type so `?done=true` matches a
/// boolean and `?points=3` a number.
pub fn filter_from_query(schema: &CompiledSchema, params: HashMap<String, String>) -> Result<FilterData, ApiError> {
    let mut filter = FilterData::default();
    let mut where_clause = Map::new();

    for (key, raw) in params {
        match key.as_str() {
            "sort" => filter.order = Some(Value::String(raw)),
            "limit" => filter.limit = Some(parse_paging(&key, &raw)?),
            "offset" => filter.offset = Some(parse_paging(&key, &raw)?),
            _ => {
                let value = coerce(schema, &key, raw)?;
                where_clause.insert(key, value);
            }
        }
    }

    if !where_clause.is_empty() {
        filter.where_clause = Some(where_clause);
    }
    Ok(filter)
}

fn parse_paging(key: &str, raw: &str) -> Result<i32, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Query parameter '{}' must be an integer", key)))
}

fn coerce(schema: &CompiledSchema, key: &str, raw: String) -> Result<Value, ApiError> {
    if raw == "null" {
        return Ok(Value::Null);
    }

    let declared = schema.shape.leaf(key).map(|spec| &spec.field_type);
    match declared {
        Some(FieldType::Text) | Some(FieldType::Timestamp) => Ok(Value::String(raw)),
        Some(FieldType::Number) => raw
            .parse::<i64>()
            .map(Number::from)
            .ok()
            .or_else(|| raw.parse::<f64>().ok().and_then(Number::from_f64))
            .map(Value::Number)
            .ok_or_else(|| ApiError::bad_request(format!("Query parameter '{}' must be a number", key))),
        Some(FieldType::Boolean) => raw
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| ApiError::bad_request(format!("Query parameter '{}' must be true or false", key))),
        // Undeclared or structured fields: JSON literal if it parses, else text
        _ => Ok(serde_json::from_str(&raw).unwrap_or(Value::String(raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{compile_definition, EntityDefinition};
    use serde_json::json;

    fn schema() -> CompiledSchema {
        let definition = EntityDefinition::from_value(
            json!({ "properties": {
                "title": { "type": "string" },
                "points": { "type": "integer" },
                "done": { "type": "boolean" }
            } }),
            "Task",
        )
        .unwrap();
        compile_definition(&definition, 8).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_query_values_follow_field_types() {
        let filter = filter_from_query(
            &schema(),
            params(&[("title", "123"), ("points", "3"), ("done", "true"), ("extra", "[1]")]),
        )
        .unwrap();
        let where_clause = filter.where_clause.unwrap();
        assert_eq!(where_clause["title"], json!("123"));
        assert_eq!(where_clause["points"], json!(3));
        assert_eq!(where_clause["done"], json!(true));
        assert_eq!(where_clause["extra"], json!([1]));
    }

    #[test]
    fn test_reserved_params() {
        let filter =
            filter_from_query(&schema(), params(&[("sort", "-points"), ("limit", "5"), ("offset", "2")])).unwrap();
        assert!(filter.where_clause.is_none());
        assert_eq!(filter.order, Some(json!("-points")));
        assert_eq!(filter.limit, Some(5));
        assert_eq!(filter.offset, Some(2));
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(filter_from_query(&schema(), params(&[("points", "many")])).is_err());
        assert!(filter_from_query(&schema(), params(&[("done", "yes")])).is_err());
        assert!(filter_from_query(&schema(), params(&[("limit", "ten")])).is_err());
    }
}
