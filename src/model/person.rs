use database::{consts::consts::ObjectId, model::document::Document};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

use super::validation::{validate_name, Validate, ValidationError};

/// Updatable fields of a person, iteration order is the order updates are applied in
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, IntoStaticStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PersonField {
    Firstname,
    Lastname,
}

impl PersonField {
    /// Key of the field in the stored document
    pub fn key(&self) -> &'static str {
        self.into()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Person {
    /// `None` until the store has assigned an id
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub firstname: String,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub lastname: String,
}

/// A `null` name is a missing name, left for validation to reject
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Person {
    pub fn new(firstname: &str, lastname: &str) -> Self {
        Person {
            id: None,
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
        }
    }

    pub fn new_test() -> Self {
        Person::new("David", "Hernandez")
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn get(&self, field: PersonField) -> &str {
        match field {
            PersonField::Firstname => &self.firstname,
            PersonField::Lastname => &self.lastname,
        }
    }

    pub fn to_document(&self) -> Result<Document, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(document) => Ok(document),
            // A struct always serializes to an object
            other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "person serialized to a non object value: {}",
                other
            ))),
        }
    }

    pub fn from_document(document: Document) -> Result<Person, serde_json::Error> {
        serde_json::from_value(Value::Object(document))
    }
}

impl Validate for Person {
    fn validate(&self) -> Result<(), ValidationError> {
        PersonField::iter().try_for_each(|field| validate_name(field, self.get(field)))
    }
}

/// Ordered people, in the order the store returned them
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(transparent)]
pub struct People(pub Vec<Person>);

impl People {
    pub fn push(&mut self, person: Person) {
        self.0.push(person)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Person> {
        self.0.iter()
    }
}

/// Sparse update of a person, absent (or `null`) fields are left untouched
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct PersonUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
}

impl PersonUpdate {
    pub fn get(&self, field: PersonField) -> Option<&str> {
        match field {
            PersonField::Firstname => self.firstname.as_deref(),
            PersonField::Lastname => self.lastname.as_deref(),
        }
    }

    /// Fields supplied by the client, in `PersonField` order
    pub fn present_fields(&self) -> Vec<(PersonField, &str)> {
        PersonField::iter()
            .filter_map(|field| self.get(field).map(|value| (field, value)))
            .collect()
    }
}

impl Validate for PersonUpdate {
    fn validate(&self) -> Result<(), ValidationError> {
        self.present_fields()
            .into_iter()
            .try_for_each(|(field, value)| validate_name(field, value))
    }
}
