use serde::{Deserialize, Serialize};

/// Logical connector applied uniformly between all terms of one query node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// Comparison operator of a filter term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    Equal,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Like,
}

impl Condition {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Condition::Equal => "=",
            Condition::LessThan => "<",
            Condition::LessOrEqual => "<=",
            Condition::GreaterThan => ">",
            Condition::GreaterOrEqual => ">=",
            Condition::Like => "LIKE",
        }
    }
}

/// One position of a query node: either a direct comparison against an
/// attribute or a join into a related object. A join with no nested query
/// matches objects that have no such relation at all.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum QueryTerm {
    Filter {
        attribute: String,
        condition: Condition,
        value: String,
    },
    Join {
        attribute: String,
        nested: Option<Box<ExtendedQuery>>,
    },
}

/// Structured instance search over one class: filters and joins combined by
/// a single connector, compiled into one native store query.
///
/// The distinguished join attribute `parent` walks the containment relation
/// up to the holding object instead of a list-type relation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtendedQuery {
    pub class_name: String,
    pub connector: Connector,
    pub terms: Vec<QueryTerm>,
    pub visible_attributes: Vec<String>,
    pub page: i64,
    pub limit: i64,
}

impl ExtendedQuery {
    pub fn new(class_name: impl Into<String>, connector: Connector) -> Self {
        Self {
            class_name: class_name.into(),
            connector,
            terms: Vec::new(),
            visible_attributes: Vec::new(),
            page: 0,
            limit: -1,
        }
    }

    pub fn filter(
        mut self,
        attribute: impl Into<String>,
        condition: Condition,
        value: impl Into<String>,
    ) -> Self {
        self.terms.push(QueryTerm::Filter {
            attribute: attribute.into(),
            condition,
            value: value.into(),
        });
        self
    }

    pub fn join(mut self, attribute: impl Into<String>, nested: Option<ExtendedQuery>) -> Self {
        self.terms.push(QueryTerm::Join {
            attribute: attribute.into(),
            nested: nested.map(Box::new),
        });
        self
    }

    pub fn visible(mut self, attributes: &[&str]) -> Self {
        self.visible_attributes = attributes.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn paged(mut self, page: i64, limit: i64) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }
}

/// Identity and display data of one matched object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLight {
    pub id: String,
    pub class_name: String,
    pub display_value: String,
}

/// One row of a query result. Position 0 of every result is a synthetic
/// header record: no object, and the visible-attribute titles as columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub object: Option<ObjectLight>,
    pub columns: Vec<String>,
}

impl ResultRecord {
    pub fn header(columns: Vec<String>) -> Self {
        Self {
            object: None,
            columns,
        }
    }
}
