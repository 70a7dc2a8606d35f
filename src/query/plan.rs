//! Query planning: an `ExtendedQuery` tree is lowered into a small plan
//! tree by recursive descent, then rendered into a single SQL statement in
//! one linear pass.

use crate::errors::CatalogError;
use crate::meta::{
    AttributeType, Catalog, PROP_NAME, PSEUDO_ATTRIBUTE_ID, REL_CHILD_OF, REL_CHILD_OF_SPECIAL,
    REL_INSTANCE_OF, REL_RELATED_TO,
};

use super::model::{Condition, Connector, ExtendedQuery, QueryTerm};

pub(crate) const ALIAS_INSTANCE: &str = "instance";
pub(crate) const ALIAS_PARENT: &str = "parent";
const LIST_TYPE_PREFIX: &str = "listType_";
const PARENT_SUFFIX: &str = "_P";

pub(crate) struct QueryPlan {
    root: JoinPlan,
    page: i64,
    limit: i64,
}

struct JoinPlan {
    alias: String,
    link: JoinLink,
    /// Concrete classes whose instances satisfy this node; an abstract
    /// query class is expanded to its concrete subclasses at plan time.
    class_names: Vec<String>,
    connector: Connector,
    terms: Vec<TermPlan>,
    visible: Vec<String>,
}

enum JoinLink {
    Primary,
    /// Named list-type relation from `source`.
    Related { source: String, attribute: String },
    /// Containment-up relation from `source`.
    Parent { source: String },
}

enum TermPlan {
    Filter {
        attribute: String,
        condition: Condition,
        value: FilterValue,
    },
    /// A join position with no nested query: the object must have no
    /// relation under this name at all.
    MissingRelation { attribute: String },
    Join(JoinPlan),
}

enum FilterValue {
    Id(i64),
    Text(String),
    Number(String),
    Bool(bool),
}

impl QueryPlan {
    pub(crate) fn build(catalog: &Catalog, query: &ExtendedQuery) -> Result<Self, CatalogError> {
        let root = build_node(
            catalog,
            query,
            ALIAS_INSTANCE.to_string(),
            JoinLink::Primary,
            query.visible_attributes.clone(),
        )?;
        Ok(Self {
            root,
            page: query.page,
            limit: query.limit,
        })
    }

    /// Every alias with its visible attributes, in traversal order. Drives
    /// both the column projection and result decoding.
    pub(crate) fn aliases(&self) -> Vec<(&str, &[String])> {
        let mut out = Vec::new();
        collect_aliases(&self.root, &mut out);
        out
    }

    pub(crate) fn sql(&self) -> String {
        let mut select = Vec::new();
        let mut joins = String::new();
        let mut predicates: Vec<(String, Connector)> = Vec::new();
        render_node(&self.root, &mut select, &mut joins, &mut predicates);

        let mut sql = format!(
            "SELECT {} FROM graph_nodes {}{}",
            select.join(", "),
            ALIAS_INSTANCE,
            joins
        );
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            let last = predicates.len() - 1;
            for (i, (fragment, connector)) in predicates.iter().enumerate() {
                sql.push_str(fragment);
                if i < last {
                    sql.push(' ');
                    sql.push_str(connector.sql());
                    sql.push(' ');
                }
            }
        }
        sql.push_str(&format!(
            " ORDER BY json_extract({ALIAS_INSTANCE}.data, '$.{PROP_NAME}') ASC"
        ));
        if self.page > 0 && self.limit > 0 {
            let skip = (self.page - 1) * self.limit + (self.page - 1);
            let limit_bound = skip + self.limit;
            sql.push_str(&format!(" LIMIT {limit_bound} OFFSET {skip}"));
        }
        sql
    }
}

fn build_node(
    catalog: &Catalog,
    query: &ExtendedQuery,
    alias: String,
    link: JoinLink,
    visible: Vec<String>,
) -> Result<JoinPlan, CatalogError> {
    let class = catalog.class(query.class_name.as_str())?;
    let class_names = if class.abstract_class {
        catalog
            .subclasses(&class.name, false, false)?
            .into_iter()
            .map(|c| c.name)
            .collect()
    } else {
        vec![class.name.clone()]
    };

    let under_parent = alias == ALIAS_PARENT;
    let mut terms = Vec::new();
    for term in &query.terms {
        match term {
            QueryTerm::Filter {
                attribute,
                condition,
                value,
            } => {
                let value = if attribute == PSEUDO_ATTRIBUTE_ID {
                    FilterValue::Id(value.parse().map_err(|_| {
                        CatalogError::invalid_argument(format!(
                            "{value} is not a valid object id"
                        ))
                    })?)
                } else if attribute == PROP_NAME {
                    FilterValue::Text(value.clone())
                } else {
                    let def = class.attribute(attribute).ok_or_else(|| {
                        CatalogError::invalid_argument(format!(
                            "attribute {attribute} does not exist in class {}",
                            class.name
                        ))
                    })?;
                    typed_value(&def.attribute_type, attribute, value)?
                };
                terms.push(TermPlan::Filter {
                    attribute: attribute.clone(),
                    condition: *condition,
                    value,
                });
            }
            QueryTerm::Join { attribute, nested } => match nested {
                None => terms.push(TermPlan::MissingRelation {
                    attribute: attribute.clone(),
                }),
                Some(nested) => {
                    let (child_alias, child_link) = if attribute == ALIAS_PARENT {
                        (
                            ALIAS_PARENT.to_string(),
                            JoinLink::Parent {
                                source: alias.clone(),
                            },
                        )
                    } else {
                        let mut child_alias = format!("{LIST_TYPE_PREFIX}{attribute}");
                        if under_parent {
                            child_alias.push_str(PARENT_SUFFIX);
                        }
                        (
                            child_alias,
                            JoinLink::Related {
                                source: alias.clone(),
                                attribute: attribute.clone(),
                            },
                        )
                    };
                    let child_visible = if nested.visible_attributes.is_empty() {
                        vec![PROP_NAME.to_string()]
                    } else {
                        nested.visible_attributes.clone()
                    };
                    terms.push(TermPlan::Join(build_node(
                        catalog,
                        nested,
                        child_alias,
                        child_link,
                        child_visible,
                    )?));
                }
            },
        }
    }
    Ok(JoinPlan {
        alias,
        link,
        class_names,
        connector: query.connector,
        terms,
        visible,
    })
}

fn typed_value(
    attribute_type: &AttributeType,
    attribute: &str,
    raw: &str,
) -> Result<FilterValue, CatalogError> {
    match attribute_type {
        AttributeType::String => Ok(FilterValue::Text(raw.to_string())),
        AttributeType::Integer
        | AttributeType::Float
        | AttributeType::Long
        | AttributeType::Date
        | AttributeType::Timestamp => {
            raw.parse::<f64>().map_err(|_| {
                CatalogError::invalid_argument(format!(
                    "{raw} is not a valid numeric value for attribute {attribute}"
                ))
            })?;
            Ok(FilterValue::Number(raw.to_string()))
        }
        AttributeType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(FilterValue::Bool(true)),
            "false" => Ok(FilterValue::Bool(false)),
            _ => Err(CatalogError::invalid_argument(format!(
                "{raw} is not a valid boolean value for attribute {attribute}"
            ))),
        },
        AttributeType::ListOf(_) => Err(CatalogError::invalid_argument(format!(
            "list type attribute {attribute} must be queried through a join"
        ))),
    }
}

fn collect_aliases<'a>(node: &'a JoinPlan, out: &mut Vec<(&'a str, &'a [String])>) {
    out.push((&node.alias, &node.visible));
    for term in &node.terms {
        if let TermPlan::Join(child) = term {
            collect_aliases(child, out);
        }
    }
}

fn render_node(
    node: &JoinPlan,
    select: &mut Vec<String>,
    joins: &mut String,
    predicates: &mut Vec<(String, Connector)>,
) {
    let alias = &node.alias;
    select.push(format!("{alias}.id AS {alias}"));

    match &node.link {
        JoinLink::Primary => {}
        JoinLink::Related { source, attribute } => {
            joins.push_str(&format!(
                " JOIN graph_edges {alias}_rel ON {alias}_rel.from_id = {source}.id \
                 AND {alias}_rel.edge_type = '{REL_RELATED_TO}' \
                 AND json_extract({alias}_rel.data, '$.{PROP_NAME}') = '{}' \
                 JOIN graph_nodes {alias} ON {alias}.id = {alias}_rel.to_id",
                escape(attribute)
            ));
        }
        JoinLink::Parent { source } => {
            joins.push_str(&format!(
                " JOIN graph_edges {alias}_rel ON {alias}_rel.from_id = {source}.id \
                 AND {alias}_rel.edge_type = '{REL_CHILD_OF}' \
                 JOIN graph_nodes {alias} ON {alias}.id = {alias}_rel.to_id"
            ));
        }
    }

    joins.push_str(&format!(
        " JOIN graph_edges {alias}_isa ON {alias}_isa.from_id = {alias}.id \
         AND {alias}_isa.edge_type = '{REL_INSTANCE_OF}' \
         JOIN graph_nodes {alias}_class ON {alias}_class.id = {alias}_isa.to_id \
         AND {}",
        class_membership(&format!("{alias}_class"), &node.class_names)
    ));

    for term in &node.terms {
        match term {
            TermPlan::Filter {
                attribute,
                condition,
                value,
            } => {
                predicates.push((filter_sql(alias, attribute, *condition, value), node.connector));
            }
            TermPlan::MissingRelation { attribute } => {
                // "parent" is the containment relation, not a named
                // RELATED_TO edge; an instance parked as a special child
                // still has a parent.
                let fragment = if attribute == ALIAS_PARENT {
                    format!(
                        "NOT EXISTS (SELECT 1 FROM graph_edges nr \
                         WHERE nr.from_id = {alias}.id \
                         AND nr.edge_type IN ('{REL_CHILD_OF}', '{REL_CHILD_OF_SPECIAL}'))"
                    )
                } else {
                    format!(
                        "NOT EXISTS (SELECT 1 FROM graph_edges nr \
                         WHERE nr.from_id = {alias}.id \
                         AND nr.edge_type = '{REL_RELATED_TO}' \
                         AND json_extract(nr.data, '$.{PROP_NAME}') = '{}')",
                        escape(attribute)
                    )
                };
                predicates.push((fragment, node.connector));
            }
            TermPlan::Join(child) => render_node(child, select, joins, predicates),
        }
    }
}

fn class_membership(class_alias: &str, names: &[String]) -> String {
    match names {
        [] => "1 = 0".to_string(),
        [single] => format!("{class_alias}.{PROP_NAME} = '{}'", escape(single)),
        many => {
            let list: Vec<String> = many.iter().map(|n| format!("'{}'", escape(n))).collect();
            format!("{class_alias}.{PROP_NAME} IN ({})", list.join(", "))
        }
    }
}

fn filter_sql(alias: &str, attribute: &str, condition: Condition, value: &FilterValue) -> String {
    match value {
        FilterValue::Id(id) => format!("{alias}.id {} {id}", condition.sql()),
        FilterValue::Text(text) => {
            let escaped = escape(text);
            if condition == Condition::Like {
                format!(
                    "json_extract({alias}.data, '$.{}') LIKE '%{escaped}%'",
                    escape(attribute)
                )
            } else {
                format!(
                    "json_extract({alias}.data, '$.{}') {} '{escaped}'",
                    escape(attribute),
                    condition.sql()
                )
            }
        }
        FilterValue::Number(number) => format!(
            "CAST(json_extract({alias}.data, '$.{}') AS REAL) {} {number}",
            escape(attribute),
            condition.sql()
        ),
        FilterValue::Bool(flag) => format!(
            "json_extract({alias}.data, '$.{}') = {}",
            escape(attribute),
            if *flag { 1 } else { 0 }
        ),
    }
}

fn escape(text: &str) -> String {
    text.replace('\'', "''")
}
