use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Query over one collection: structural-equality matches plus sort/paging
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    #[serde(rename = "where", alias = "where_clause", default)]
    pub where_clause: Option<Map<String, Value>>,
    #[serde(alias = "sort", default)]
    pub order: Option<Value>,
    #[serde(default)]
    pub limit: Option<i32>,
    #[serde(default)]
    pub offset: Option<i32>,
}

impl FilterData {
    pub fn matching(where_clause: Map<String, Value>) -> Self {
        Self { where_clause: Some(where_clause), ..Default::default() }
    }

    pub fn with_order(mut self, order: impl Into<Value>) -> Self {
        self.order = Some(order.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub column: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}
