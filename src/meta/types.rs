use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute value type: one of the primitive types, or a reference to
/// another catalog class used as an enumeration of instances ("list type").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    String,
    Integer,
    Float,
    Long,
    Boolean,
    Date,
    Timestamp,
    ListOf(String),
}

impl AttributeType {
    pub fn is_primitive(&self) -> bool {
        !matches!(self, AttributeType::ListOf(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            AttributeType::Integer
                | AttributeType::Float
                | AttributeType::Long
                | AttributeType::Date
                | AttributeType::Timestamp
        )
    }

    /// Type referenced by name: a primitive name maps to the primitive, any
    /// other name is read as a list-type class reference.
    pub fn parse(name: &str) -> AttributeType {
        match name {
            "String" => AttributeType::String,
            "Integer" => AttributeType::Integer,
            "Float" => AttributeType::Float,
            "Long" => AttributeType::Long,
            "Boolean" => AttributeType::Boolean,
            "Date" => AttributeType::Date,
            "Timestamp" => AttributeType::Timestamp,
            other => AttributeType::ListOf(other.to_string()),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => write!(f, "String"),
            AttributeType::Integer => write!(f, "Integer"),
            AttributeType::Float => write!(f, "Float"),
            AttributeType::Long => write!(f, "Long"),
            AttributeType::Boolean => write!(f, "Boolean"),
            AttributeType::Date => write!(f, "Date"),
            AttributeType::Timestamp => write!(f, "Timestamp"),
            AttributeType::ListOf(class) => write!(f, "{class}"),
        }
    }
}

/// Full definition of a class attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub attribute_type: AttributeType,
    pub read_only: bool,
    pub visible: bool,
    pub administrative: bool,
    pub no_copy: bool,
    pub unique: bool,
    pub mandatory: bool,
    pub multiple: bool,
    pub order: i64,
    pub creation_date: i64,
}

impl AttributeDefinition {
    /// A fresh attribute with the given name and type and default flags.
    pub fn new(name: &str, attribute_type: AttributeType) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            display_name: String::new(),
            description: String::new(),
            attribute_type,
            read_only: false,
            visible: true,
            administrative: false,
            no_copy: false,
            unique: false,
            mandatory: false,
            multiple: false,
            order: 1000,
            creation_date: 0,
        }
    }
}

/// Full class definition as stored in the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub color: i64,
    pub icon: Vec<u8>,
    pub small_icon: Vec<u8>,
    pub abstract_class: bool,
    pub custom: bool,
    pub countable: bool,
    pub in_design: bool,
    pub creation_date: i64,
    /// None only for the designated root class.
    pub parent_class_name: Option<String>,
    pub attributes: Vec<AttributeDefinition>,
}

impl ClassDefinition {
    pub fn new(name: &str, parent_class_name: Option<&str>) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            display_name: String::new(),
            description: String::new(),
            color: 0,
            icon: Vec::new(),
            small_icon: Vec::new(),
            abstract_class: false,
            custom: true,
            countable: true,
            in_design: false,
            creation_date: 0,
            parent_class_name: parent_class_name.map(str::to_string),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Light projection of a class used by hierarchy and containment listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub abstract_class: bool,
    pub custom: bool,
    pub in_design: bool,
}

impl From<&ClassDefinition> for ClassInfo {
    fn from(def: &ClassDefinition) -> Self {
        ClassInfo {
            id: def.id,
            name: def.name.clone(),
            display_name: def.display_name.clone(),
            abstract_class: def.abstract_class,
            custom: def.custom,
            in_design: def.in_design,
        }
    }
}

/// Addresses a class by internal id or by unique name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassRef {
    Id(i64),
    Name(String),
}

impl From<i64> for ClassRef {
    fn from(id: i64) -> Self {
        ClassRef::Id(id)
    }
}

impl From<&str> for ClassRef {
    fn from(name: &str) -> Self {
        ClassRef::Name(name.to_string())
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassRef::Id(id) => write!(f, "class with id {id}"),
            ClassRef::Name(name) => write!(f, "class {name}"),
        }
    }
}

/// Field-by-field class update; absent fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct ClassUpdate {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub color: Option<i64>,
    pub icon: Option<Vec<u8>>,
    pub small_icon: Option<Vec<u8>>,
    pub abstract_class: Option<bool>,
    pub custom: Option<bool>,
    pub countable: Option<bool>,
    pub in_design: Option<bool>,
    pub attributes: Vec<AttributeUpdate>,
}

/// Field-by-field attribute update addressed by attribute id.
#[derive(Clone, Debug, Default)]
pub struct AttributeUpdate {
    pub id: i64,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub attribute_type: Option<AttributeType>,
    pub read_only: Option<bool>,
    pub visible: Option<bool>,
    pub administrative: Option<bool>,
    pub no_copy: Option<bool>,
    pub unique: Option<bool>,
    pub mandatory: Option<bool>,
    pub multiple: Option<bool>,
    pub order: Option<i64>,
}

/// Audit-trail summary returned by mutation operations. One entry per
/// applied field change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeDescriptor {
    pub affected_properties: Vec<String>,
    pub old_values: Vec<String>,
    pub new_values: Vec<String>,
    pub notes: String,
}

impl ChangeDescriptor {
    pub fn record(&mut self, property: &str, old_value: impl ToString, new_value: impl ToString) {
        self.affected_properties.push(property.to_string());
        self.old_values.push(old_value.to_string());
        self.new_values.push(new_value.to_string());
    }

    pub fn merge(&mut self, other: ChangeDescriptor) {
        self.affected_properties.extend(other.affected_properties);
        self.old_values.extend(other.old_values);
        self.new_values.extend(other.new_values);
    }

    pub fn is_empty(&self) -> bool {
        self.affected_properties.is_empty()
    }
}
