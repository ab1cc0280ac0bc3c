use std::collections::{HashMap, VecDeque};

use serde_json::Value;

use crate::{
    collection::{StoreError, StoreResult},
    consts::consts::{CursorId, ObjectId, ID_KEY},
    model::document::{
        document_id, CursorBatch, DeleteResult, Document, InsertOneResult, UpdateResult,
    },
};

use super::filter::Filter;

/// Documents of a single collection, kept in insertion order
pub struct DocumentTable {
    documents: Vec<(ObjectId, Document)>,
    /// Server side cursors, remaining documents of a find that did not fit in the first batch
    cursors: HashMap<CursorId, VecDeque<Document>>,
    last_cursor_id: CursorId,
}

impl DocumentTable {
    pub fn new() -> Self {
        Self {
            documents: vec![],
            cursors: HashMap::new(),
            last_cursor_id: CursorId(0),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn open_cursors(&self) -> usize {
        self.cursors.len()
    }

    // Each mutation can be broken up into 3 steps
    //  - Verifying validity / constraints (uniqueness)
    //  - Applying
    //  - Returning the outcome
    pub fn insert(&mut self, mut document: Document) -> StoreResult<InsertOneResult> {
        let id = match document_id(&document) {
            None => {
                let id = ObjectId::new();
                document.insert(ID_KEY.to_string(), Value::String(id.to_hex()));
                id
            }
            Some(Value::String(hex)) => ObjectId::parse_str(hex)
                .map_err(|err| StoreError::InvalidDocument(err.to_string()))?,
            Some(other) => {
                return Err(StoreError::InvalidDocument(format!(
                    "_id must be a hex string, got {}",
                    other
                )))
            }
        };

        if self.position(&id).is_some() {
            return Err(StoreError::DuplicateKey(id));
        }

        self.documents.push((id, document));

        Ok(InsertOneResult { inserted_id: id })
    }

    pub fn find_one(&self, id: &ObjectId) -> Option<Document> {
        self.position(id)
            .map(|position| self.documents[position].1.clone())
    }

    /// Returns the first batch of matches, registering a cursor if more remain
    #[tracing::instrument(skip(self))]
    pub fn find(&mut self, filter: &Filter, batch_size: usize) -> CursorBatch {
        let mut matches: VecDeque<Document> = self
            .documents
            .iter()
            .filter(|(_, document)| filter.matches(document))
            .map(|(_, document)| document.clone())
            .collect();

        let documents = take_batch(&mut matches, batch_size);

        if matches.is_empty() {
            return CursorBatch {
                cursor_id: None,
                documents,
            };
        }

        self.last_cursor_id = self.last_cursor_id.increment();
        let cursor_id = self.last_cursor_id;
        self.cursors.insert(cursor_id, matches);

        CursorBatch {
            cursor_id: Some(cursor_id),
            documents,
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn get_more(&mut self, cursor_id: CursorId, batch_size: usize) -> StoreResult<CursorBatch> {
        let remaining = self
            .cursors
            .get_mut(&cursor_id)
            .ok_or(StoreError::CursorNotFound(cursor_id))?;

        let documents = take_batch(remaining, batch_size);

        if remaining.is_empty() {
            self.cursors.remove(&cursor_id);

            return Ok(CursorBatch {
                cursor_id: None,
                documents,
            });
        }

        Ok(CursorBatch {
            cursor_id: Some(cursor_id),
            documents,
        })
    }

    pub fn kill_cursor(&mut self, cursor_id: CursorId) -> StoreResult<()> {
        self.cursors
            .remove(&cursor_id)
            .map(|_| ())
            .ok_or(StoreError::CursorNotFound(cursor_id))
    }

    pub fn delete_one(&mut self, id: &ObjectId) -> DeleteResult {
        match self.position(id) {
            Some(position) => {
                self.documents.remove(position);
                DeleteResult { deleted_count: 1 }
            }
            None => DeleteResult { deleted_count: 0 },
        }
    }

    /// `$set` semantics, setting a field to the value it already holds is not a modification
    pub fn update_one_field(
        &mut self,
        id: &ObjectId,
        field: &str,
        value: Value,
    ) -> StoreResult<UpdateResult> {
        if field == ID_KEY {
            return Err(StoreError::ImmutableField(field.to_string()));
        }

        let position = match self.position(id) {
            Some(position) => position,
            None => {
                return Ok(UpdateResult {
                    matched_count: 0,
                    modified_count: 0,
                })
            }
        };

        let document = &mut self.documents[position].1;

        if document.get(field) == Some(&value) {
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: 0,
            });
        }

        document.insert(field.to_string(), value);

        Ok(UpdateResult {
            matched_count: 1,
            modified_count: 1,
        })
    }

    fn position(&self, id: &ObjectId) -> Option<usize> {
        self.documents
            .iter()
            .position(|(document_id, _)| document_id == id)
    }
}

impl Default for DocumentTable {
    fn default() -> Self {
        Self::new()
    }
}

fn take_batch(remaining: &mut VecDeque<Document>, batch_size: usize) -> Vec<Document> {
    // A batch size of 0 would never make progress
    let size = batch_size.max(1).min(remaining.len());

    remaining.drain(..size).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::database::table::filter::RegexOptions;

    fn person(firstname: &str, lastname: &str) -> Document {
        match json!({ "firstname": firstname, "lastname": lastname }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn firstnames(documents: &[Document]) -> Vec<&str> {
        documents
            .iter()
            .map(|document| document["firstname"].as_str().unwrap_or_default())
            .collect()
    }

    mod insert {
        use super::*;

        #[test]
        fn assigns_an_id_when_absent() {
            // Given an empty table
            let mut table = DocumentTable::new();

            // When we insert a document without an id
            let result = table.insert(person("Ana", "Lopez")).unwrap();

            // Then the stored document carries the generated id
            let stored = table.find_one(&result.inserted_id).expect("should be stored");
            assert_eq!(stored[ID_KEY], json!(result.inserted_id.to_hex()));
        }

        #[test]
        fn keeps_a_provided_id() {
            let mut table = DocumentTable::new();
            let id = ObjectId::new();
            let mut document = person("Ana", "Lopez");
            document.insert(ID_KEY.to_string(), json!(id.to_hex()));

            let result = table.insert(document).unwrap();

            assert_eq!(result.inserted_id, id);
        }

        #[test]
        fn rejects_duplicate_ids() {
            let mut table = DocumentTable::new();
            let id = ObjectId::new();
            let mut document = person("Ana", "Lopez");
            document.insert(ID_KEY.to_string(), json!(id.to_hex()));

            table.insert(document.clone()).unwrap();
            let result = table.insert(document);

            assert_eq!(result, Err(StoreError::DuplicateKey(id)));
            assert_eq!(table.len(), 1);
        }

        #[test]
        fn rejects_non_string_ids() {
            let mut table = DocumentTable::new();
            let mut document = person("Ana", "Lopez");
            document.insert(ID_KEY.to_string(), json!(12));

            let result = table.insert(document);

            assert!(matches!(result, Err(StoreError::InvalidDocument(_))));
        }
    }

    mod find {
        use super::*;

        #[test]
        fn returns_documents_in_insertion_order() {
            let mut table = DocumentTable::new();
            table.insert(person("Carla", "A")).unwrap();
            table.insert(person("Ana", "B")).unwrap();
            table.insert(person("Beto", "C")).unwrap();

            let batch = table.find(&Filter::All, 10);

            assert_eq!(firstnames(&batch.documents), vec!["Carla", "Ana", "Beto"]);
            assert_eq!(batch.cursor_id, None);
            assert_eq!(table.open_cursors(), 0);
        }

        #[test]
        fn applies_the_filter() {
            let mut table = DocumentTable::new();
            table.insert(person("Ana", "A")).unwrap();
            table.insert(person("Anabella", "B")).unwrap();
            let filter = Filter::regex(
                "firstname",
                r"(?:\A|\s)(ana)(?:\s|\z)",
                RegexOptions {
                    case_insensitive: true,
                },
            )
            .unwrap();

            let batch = table.find(&filter, 10);

            assert_eq!(firstnames(&batch.documents), vec!["Ana"]);
        }

        #[test]
        fn empty_collection_yields_an_empty_exhausted_batch() {
            let mut table = DocumentTable::new();

            let batch = table.find(&Filter::All, 10);

            assert!(batch.documents.is_empty());
            assert_eq!(batch.cursor_id, None);
        }
    }

    mod cursors {
        use super::*;

        fn table_with(count: usize) -> DocumentTable {
            let mut table = DocumentTable::new();
            for index in 0..count {
                table
                    .insert(person(&format!("Name{}", index), "Last"))
                    .unwrap();
            }
            table
        }

        #[test]
        fn remaining_documents_are_served_by_get_more() {
            // Given five documents and a batch size of two
            let mut table = table_with(5);

            // When we find and then exhaust the cursor
            let first = table.find(&Filter::All, 2);
            let cursor_id = first.cursor_id.expect("more documents remain");
            let second = table.get_more(cursor_id, 2).unwrap();
            let third = table.get_more(cursor_id, 2).unwrap();

            // Then every document is returned exactly once, in order
            assert_eq!(firstnames(&first.documents), vec!["Name0", "Name1"]);
            assert_eq!(firstnames(&second.documents), vec!["Name2", "Name3"]);
            assert_eq!(firstnames(&third.documents), vec!["Name4"]);
            assert_eq!(second.cursor_id, Some(cursor_id));
            assert_eq!(third.cursor_id, None);

            // And the exhausted cursor is dropped
            assert_eq!(table.open_cursors(), 0);
        }

        #[test]
        fn unknown_cursor_is_an_error() {
            let mut table = table_with(1);

            let result = table.get_more(CursorId(42), 2);

            assert_eq!(result, Err(StoreError::CursorNotFound(CursorId(42))));
        }

        #[test]
        fn killed_cursor_cannot_be_resumed() {
            let mut table = table_with(3);
            let cursor_id = table.find(&Filter::All, 1).cursor_id.unwrap();

            table.kill_cursor(cursor_id).unwrap();

            assert_eq!(
                table.get_more(cursor_id, 1),
                Err(StoreError::CursorNotFound(cursor_id))
            );
            assert_eq!(
                table.kill_cursor(cursor_id),
                Err(StoreError::CursorNotFound(cursor_id))
            );
        }

        #[test]
        fn zero_batch_size_still_makes_progress() {
            let mut table = table_with(2);

            let batch = table.find(&Filter::All, 0);

            assert_eq!(batch.documents.len(), 1);
        }
    }

    mod delete {
        use super::*;

        #[test]
        fn counts_deleted_documents() {
            let mut table = DocumentTable::new();
            let id = table.insert(person("Ana", "B")).unwrap().inserted_id;

            assert_eq!(table.delete_one(&id), DeleteResult { deleted_count: 1 });
            assert_eq!(table.delete_one(&id), DeleteResult { deleted_count: 0 });
            assert_eq!(table.len(), 0);
        }
    }

    mod update {
        use super::*;

        #[test]
        fn sets_a_single_field() {
            let mut table = DocumentTable::new();
            let id = table.insert(person("Ana", "B")).unwrap().inserted_id;

            let result = table.update_one_field(&id, "lastname", json!("X")).unwrap();

            assert_eq!(
                result,
                UpdateResult {
                    matched_count: 1,
                    modified_count: 1
                }
            );
            let stored = table.find_one(&id).unwrap();
            assert_eq!(stored["lastname"], json!("X"));
            assert_eq!(stored["firstname"], json!("Ana"));
        }

        #[test]
        fn setting_the_same_value_twice_modifies_nothing_the_second_time() {
            let mut table = DocumentTable::new();
            let id = table.insert(person("Ana", "B")).unwrap().inserted_id;

            table.update_one_field(&id, "lastname", json!("X")).unwrap();
            let second = table.update_one_field(&id, "lastname", json!("X")).unwrap();

            assert_eq!(
                second,
                UpdateResult {
                    matched_count: 1,
                    modified_count: 0
                }
            );
        }

        #[test]
        fn missing_document_matches_nothing() {
            let mut table = DocumentTable::new();

            let result = table
                .update_one_field(&ObjectId::new(), "lastname", json!("X"))
                .unwrap();

            assert_eq!(
                result,
                UpdateResult {
                    matched_count: 0,
                    modified_count: 0
                }
            );
        }

        #[test]
        fn id_is_immutable() {
            let mut table = DocumentTable::new();
            let id = table.insert(person("Ana", "B")).unwrap().inserted_id;

            let result = table.update_one_field(&id, ID_KEY, json!("other"));

            assert_eq!(result, Err(StoreError::ImmutableField(ID_KEY.to_string())));
        }
    }
}
