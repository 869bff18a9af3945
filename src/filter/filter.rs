use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{validate_column, FilterWhere};
use super::types::{FilterData, FilterOrderInfo, SqlResult};

/// Validated query over one collection, renderable to SQL or applied in memory
#[derive(Debug, Clone)]
pub struct Filter {
    table_name: String,
    where_data: Map<String, Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            where_data: Map::new(),
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn from_data(table_name: impl Into<String>, data: FilterData) -> Result<Self, FilterError> {
        let mut filter = Self::new(table_name)?;
        filter.assign(data)?;
        Ok(filter)
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if data.limit.is_some() || data.offset.is_some() { self.limit(data.limit, data.offset)?; }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Map<String, Value>) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = conditions;
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: Option<i32>, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if let Some(l) = limit { if l < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); } }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }

        // Apply max limit from config
        let max_limit = crate::config::CONFIG.filter.max_limit.unwrap_or(i32::MAX);
        let applied_limit = match limit {
            Some(l) if l > max_limit => {
                if crate::config::CONFIG.filter.debug_logging {
                    tracing::warn!("Limit {} exceeds max {}, capping to max", l, max_limit);
                }
                Some(max_limit)
            }
            other => other,
        };

        self.limit = applied_limit;
        self.offset = offset;
        Ok(self)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Apply to an in-memory record set, preserving input order among equals
    pub fn apply<'a, I>(&self, records: I) -> Vec<Map<String, Value>>
    where
        I: IntoIterator<Item = &'a Map<String, Value>>,
    {
        let mut matched: Vec<Map<String, Value>> = records
            .into_iter()
            .filter(|record| FilterWhere::matches(&self.where_data, record))
            .cloned()
            .collect();

        if !self.order_data.is_empty() {
            matched.sort_by(|a, b| FilterOrder::compare(&self.order_data, a, b));
        }

        let offset = self.offset.unwrap_or(0).max(0) as usize;
        let limit = self.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        matched.into_iter().skip(offset).take(limit).collect()
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.where_data, 0)?;
        let order_clause = FilterOrder::generate(&self.order_data)?;
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT \"data\"".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        if name.is_empty() { return Err(FilterError::InvalidTableName("Table name cannot be empty".to_string())); }
        validate_column(name)
            .map_err(|_| FilterError::InvalidTableName(format!("Invalid table name format: {}", name)))
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> FilterData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_to_sql() {
        let filter = Filter::from_data(
            "Task",
            data(json!({ "where": { "status": "open" }, "order": "-created_date", "limit": 10, "offset": 5 })),
        )
        .unwrap();
        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"data\" FROM \"Task\" WHERE \"data\"->'status' = $1::jsonb ORDER BY \"data\"->'created_date' DESC LIMIT 10 OFFSET 5"
        );
        assert_eq!(sql.params, vec![json!("open")]);
    }

    #[test]
    fn test_apply_in_memory() {
        let records: Vec<Map<String, Value>> = [
            json!({ "title": "b", "status": "open" }),
            json!({ "title": "a", "status": "open" }),
            json!({ "title": "c", "status": "done" }),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();

        let filter = Filter::from_data("Task", data(json!({ "where": { "status": "open" }, "sort": "title" }))).unwrap();
        let titles: Vec<Value> = filter.apply(&records).into_iter().map(|r| r["title"].clone()).collect();
        assert_eq!(titles, vec![json!("a"), json!("b")]);

        let filter = Filter::from_data("Task", data(json!({ "limit": 1, "offset": 1 }))).unwrap();
        assert_eq!(filter.apply(&records)[0]["title"], "a");
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(Filter::new("").is_err());
        assert!(Filter::new("tasks; drop").is_err());
        assert!(Filter::from_data("Task", data(json!({ "limit": -1 }))).is_err());
    }
}
