use std::time::Duration;

use serde_json::Value;

use crate::{
    collection::StoreResult,
    consts::consts::{CursorId, ObjectId},
    model::document::{CursorBatch, DeleteResult, Document, InsertOneResult, UpdateResult},
};

use super::table::filter::Filter;

/// Database commands are how we interact with the database, they are how we ask the database to
/// insert, find, update, shutdown, etc
///
/// The majority of interactions operate on documents, but there are also commands that are used
/// to control the database (e.g. shutdown, sleep).
#[derive(Debug, strum::IntoStaticStr)]
pub enum DatabaseCommand {
    InsertOne(Document),
    FindOne(ObjectId),
    Find { filter: Filter, batch_size: usize },
    GetMore { cursor_id: CursorId, batch_size: usize },
    KillCursor(CursorId),
    DeleteOne(ObjectId),
    UpdateOneField {
        id: ObjectId,
        field: String,
        value: Value,
    },

    /// Commands that control the database
    Control(Control),
}

impl DatabaseCommand {
    /// Prints complex logs in a more readable format, documents are not logged
    pub fn log_format(&self) -> String {
        let name: &'static str = self.into();

        match self {
            DatabaseCommand::FindOne(id) | DatabaseCommand::DeleteOne(id) => {
                format!("{} [id: {}]", name, id)
            }
            DatabaseCommand::UpdateOneField { id, field, .. } => {
                format!("{} [id: {}, field: {}]", name, id, field)
            }
            DatabaseCommand::GetMore { cursor_id, .. } | DatabaseCommand::KillCursor(cursor_id) => {
                format!("{} [cursor: {}]", name, cursor_id)
            }
            DatabaseCommand::Control(control) => format!("{} [{:?}]", name, control),
            _ => name.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum Control {
    /// Answers the request, then stops the database worker. Requests sent afterwards fail with
    /// a disconnected error
    Shutdown,
    /// Blocks the database worker, requests queue up behind it
    Sleep(Duration),
}

#[derive(Clone, Debug, PartialEq)]
pub enum DatabaseCommandResponse {
    Inserted(InsertOneResult),
    Found(Option<Document>),
    Batch(CursorBatch),
    CursorKilled,
    Deleted(DeleteResult),
    Updated(UpdateResult),
    /// Successfully performed the control
    Control(String),
}

pub struct DatabaseRequest {
    pub resolver: oneshot::Sender<StoreResult<DatabaseCommandResponse>>,
    pub command: DatabaseCommand,
}
