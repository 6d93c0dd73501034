use std::{
    fmt,
    rc::Rc,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use orb_shared::Value;

use crate::search::error::SearchError;

static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identifier of a [`Query`], doubling as the correlation
/// identifier of the search that runs it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(u64);

impl QueryId {
    fn mint() -> Self {
        Self(NEXT_QUERY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for QueryId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Comparison codes understood by the native search
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Contains,
}

impl Comparison {
    pub fn code(&self) -> u8 {
        match self {
            Comparison::Equal => 0,
            Comparison::NotEqual => 1,
            Comparison::Greater => 2,
            Comparison::GreaterOrEqual => 3,
            Comparison::Less => 4,
            Comparison::LessOrEqual => 5,
            Comparison::Contains => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Comparison::Equal),
            1 => Some(Comparison::NotEqual),
            2 => Some(Comparison::Greater),
            3 => Some(Comparison::GreaterOrEqual),
            4 => Some(Comparison::Less),
            5 => Some(Comparison::LessOrEqual),
            6 => Some(Comparison::Contains),
            _ => None,
        }
    }
}

/// Programme fields a query may compare against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchField {
    StartTime,
    EndTime,
    Name,
    ProgrammeId,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::StartTime => "Programme.startTime",
            SearchField::EndTime => "Programme.endTime",
            SearchField::Name => "Programme.name",
            SearchField::ProgrammeId => "Programme.programmeID",
        }
    }
}

impl FromStr for SearchField {
    type Err = SearchError;

    fn from_str(field: &str) -> Result<Self, Self::Err> {
        match field {
            "Programme.startTime" => Ok(SearchField::StartTime),
            "Programme.endTime" => Ok(SearchField::EndTime),
            "Programme.name" => Ok(SearchField::Name),
            "Programme.programmeID" => Ok(SearchField::ProgrammeId),
            _ => Err(SearchError::UnsupportedField {
                field: field.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryExpr {
    Compare {
        field: SearchField,
        comparison: Comparison,
        value: Value,
    },
    And(Rc<QueryExpr>, Rc<QueryExpr>),
    Or(Rc<QueryExpr>, Rc<QueryExpr>),
    Not(Rc<QueryExpr>),
}

impl QueryExpr {
    fn to_json(&self) -> Map<String, Value> {
        let value = match self {
            QueryExpr::Compare {
                field,
                comparison,
                value,
            } => json!({
                "comparison": comparison.code(),
                "field": field.as_str(),
                "value": value,
            }),
            QueryExpr::And(lhs, rhs) => json!({
                "arguments": [lhs.to_json(), rhs.to_json()],
                "operation": "AND",
            }),
            QueryExpr::Or(lhs, rhs) => json!({
                "arguments": [lhs.to_json(), rhs.to_json()],
                "operation": "OR",
            }),
            QueryExpr::Not(operand) => json!({
                "arguments": [operand.to_json()],
                "operation": "NOT",
            }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// An immutable search expression tagged with a process-unique id.
///
/// Combinators never modify their operands; every new query gets a fresh id.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    id: QueryId,
    expr: Rc<QueryExpr>,
}

impl Query {
    pub fn new(field: SearchField, comparison: Comparison, value: impl Into<Value>) -> Self {
        Self::from_expr(Rc::new(QueryExpr::Compare {
            field,
            comparison,
            value: value.into(),
        }))
    }

    fn from_expr(expr: Rc<QueryExpr>) -> Self {
        Self {
            id: QueryId::mint(),
            expr,
        }
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn expr(&self) -> &QueryExpr {
        &self.expr
    }

    pub fn and(&self, other: &Query) -> Query {
        Self::from_expr(Rc::new(QueryExpr::And(
            self.expr.clone(),
            other.expr.clone(),
        )))
    }

    pub fn or(&self, other: &Query) -> Query {
        Self::from_expr(Rc::new(QueryExpr::Or(
            self.expr.clone(),
            other.expr.clone(),
        )))
    }

    pub fn not(&self) -> Query {
        Self::from_expr(Rc::new(QueryExpr::Not(self.expr.clone())))
    }

    /// The same expression under a freshly minted id
    pub fn reissued(&self) -> Query {
        Self::from_expr(self.expr.clone())
    }

    /// Wire form handed to the native search. Only the top level carries
    /// the `queryId`.
    pub fn to_json(&self) -> Value {
        let mut map = self.expr.to_json();
        map.insert("queryId".to_string(), json!(self.id.as_u64()));
        Value::Object(map)
    }
}
