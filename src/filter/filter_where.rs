use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::FilterWhereInfo;
use crate::schema::values_equal;

/// Structural-equality predicate over top-level record fields.
/// `{ field: null }` matches records where the field is null or missing.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    pub fn validate(where_data: &Map<String, Value>) -> Result<(), FilterError> {
        for column in where_data.keys() {
            validate_column(column)?;
        }
        Ok(())
    }

    /// In-memory evaluation
    pub fn matches(where_data: &Map<String, Value>, record: &Map<String, Value>) -> bool {
        where_data.iter().all(|(column, expected)| match (record.get(column), expected) {
            (None, Value::Null) | (Some(Value::Null), Value::Null) => true,
            (Some(actual), expected) => values_equal(actual, expected),
            (None, _) => false,
        })
    }

    /// SQL over a JSONB `data` column. Returns the clause and its parameters,
    /// numbered from `starting_param_index + 1`.
    pub fn generate(
        where_data: &Map<String, Value>,
        starting_param_index: usize,
    ) -> Result<(String, Vec<Value>), FilterError> {
        Self::validate(where_data)?;
        let mut filter_where = Self::new(starting_param_index);
        for (column, data) in where_data {
            filter_where.conditions.push(FilterWhereInfo { column: column.clone(), data: data.clone() });
        }
        Ok(filter_where.build())
    }

    fn build(&mut self) -> (String, Vec<Value>) {
        let conditions = std::mem::take(&mut self.conditions);
        let mut sql_conditions = Vec::with_capacity(conditions.len());
        for condition in &conditions {
            let accessor = format!("\"data\"->'{}'", condition.column);
            if condition.data.is_null() {
                sql_conditions.push(format!("({0} IS NULL OR {0} = 'null'::jsonb)", accessor));
            } else {
                let param = self.param(condition.data.clone());
                sql_conditions.push(format!("{} = {}::jsonb", accessor, param));
            }
        }
        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        (where_clause, std::mem::take(&mut self.param_values))
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// Field names are interpolated into SQL, so only identifiers are allowed
pub fn validate_column(column: &str) -> Result<(), FilterError> {
    let mut chars = column.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column)))
    }
}
