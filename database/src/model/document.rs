use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts::consts::{CursorId, ObjectId, ID_KEY};

/// A stored document, the database owns the `_id` key
pub type Document = Map<String, Value>;

/// Reads the identity of a document, `None` if the document has not been stored yet
pub fn document_id(document: &Document) -> Option<&Value> {
    document.get(ID_KEY)
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InsertOneResult {
    // Wire name read by existing clients
    #[serde(rename = "InsertedID")]
    pub inserted_id: ObjectId,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// One batch of documents returned by a find or a get more
///
/// `cursor_id` is `None` once the server side cursor is exhausted
#[derive(Clone, Debug, PartialEq)]
pub struct CursorBatch {
    pub cursor_id: Option<CursorId>,
    pub documents: Vec<Document>,
}
