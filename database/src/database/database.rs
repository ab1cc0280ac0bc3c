use std::{io, thread};

use crate::{
    collection::{StoreError, StoreResult},
    model::document::CursorBatch,
};

use super::{
    commands::{DatabaseCommand, DatabaseCommandResponse, DatabaseRequest},
    control::DatabaseControlAction,
    options::DatabaseOptions,
    request_manager::RequestManager,
    table::table::DocumentTable,
};

pub struct Database {
    pub(super) table: DocumentTable,
    pub(super) options: DatabaseOptions,
}

impl Database {
    pub fn new(options: DatabaseOptions) -> Self {
        Self {
            table: DocumentTable::new(),
            options,
        }
    }

    /// Starts the database on its own thread, the returned request manager is the only way to
    /// talk to it
    pub fn run(self) -> io::Result<RequestManager> {
        let (database_sender, database_receiver) = flume::unbounded::<DatabaseRequest>();

        let batch_size = self.options.batch_size;

        thread::Builder::new()
            .name(format!("database-{}", self.options.collection))
            .spawn(move || self.process_requests(database_receiver))?;

        Ok(RequestManager::new(database_sender, batch_size))
    }

    fn process_requests(mut self, database_receiver: flume::Receiver<DatabaseRequest>) {
        log::info!(
            "📀 Database running [Collection: {}, BatchSize: {}]",
            self.options.collection,
            self.options.batch_size
        );

        // Process incoming requests from the channel, stops once every request manager is dropped
        let shutdown = loop {
            let DatabaseRequest { resolver, command } = match database_receiver.recv() {
                Ok(request) => request,
                Err(_) => break None,
            };

            log::debug!("Received request: {}", command.log_format());

            let (response, action) = match command {
                DatabaseCommand::Control(control) => {
                    let (response, action) = self.run_control(control);
                    (Ok(response), action)
                }
                command => (self.apply(command), DatabaseControlAction::Continue),
            };

            if let DatabaseControlAction::Exit = action {
                break Some((resolver, response));
            }

            self.respond(resolver, response);
        };

        // Requests queued behind the shutdown never get processed
        for DatabaseRequest { resolver, command } in database_receiver.drain() {
            log::debug!("Rejecting request after shutdown: {}", command.log_format());
            let _ = resolver.send(Err(StoreError::Disconnected));
        }
        drop(database_receiver);

        // Acknowledged only once the channel is closed, any later request fails to send
        if let Some((resolver, response)) = shutdown {
            self.respond(resolver, response);
        }

        log::info!("Database stopped [Collection: {}]", self.options.collection);
    }

    fn respond(
        &mut self,
        resolver: oneshot::Sender<StoreResult<DatabaseCommandResponse>>,
        response: StoreResult<DatabaseCommandResponse>,
    ) {
        // The requester may have given up on the request (timeout / cancellation)
        let unclaimed = match resolver.send(response) {
            Ok(()) => return,
            Err(err) => err.into_inner(),
        };

        log::warn!("Requester dropped before receiving the database response");

        // Nobody holds the cursor of an unclaimed batch, it would never be fetched or killed
        if let Ok(DatabaseCommandResponse::Batch(CursorBatch {
            cursor_id: Some(cursor_id),
            ..
        })) = unclaimed
        {
            log::debug!("Killing unclaimed cursor {}", cursor_id);
            let _ = self.table.kill_cursor(cursor_id);
        }
    }

    pub fn apply(&mut self, command: DatabaseCommand) -> StoreResult<DatabaseCommandResponse> {
        let response = match command {
            DatabaseCommand::InsertOne(document) => {
                DatabaseCommandResponse::Inserted(self.table.insert(document)?)
            }
            DatabaseCommand::FindOne(id) => DatabaseCommandResponse::Found(self.table.find_one(&id)),
            DatabaseCommand::Find { filter, batch_size } => {
                DatabaseCommandResponse::Batch(self.table.find(&filter, batch_size))
            }
            DatabaseCommand::GetMore {
                cursor_id,
                batch_size,
            } => DatabaseCommandResponse::Batch(self.table.get_more(cursor_id, batch_size)?),
            DatabaseCommand::KillCursor(cursor_id) => {
                self.table.kill_cursor(cursor_id)?;
                DatabaseCommandResponse::CursorKilled
            }
            DatabaseCommand::DeleteOne(id) => {
                DatabaseCommandResponse::Deleted(self.table.delete_one(&id))
            }
            DatabaseCommand::UpdateOneField { id, field, value } => {
                DatabaseCommandResponse::Updated(self.table.update_one_field(&id, &field, value)?)
            }
            DatabaseCommand::Control(control) => self.run_control(control).0,
        };

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::{
        consts::consts::ObjectId,
        database::{commands::Control, table::filter::Filter},
        model::document::{DeleteResult, Document},
    };

    fn person(firstname: &str) -> Document {
        match json!({ "firstname": firstname, "lastname": "Test" }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn insert_then_find_one() {
        let mut database = Database::new(DatabaseOptions::new_test());

        let inserted = match database.apply(DatabaseCommand::InsertOne(person("Ana"))) {
            Ok(DatabaseCommandResponse::Inserted(result)) => result,
            other => panic!("unexpected response {:?}", other),
        };

        let found = database
            .apply(DatabaseCommand::FindOne(inserted.inserted_id))
            .unwrap();

        match found {
            DatabaseCommandResponse::Found(Some(document)) => {
                assert_eq!(document["firstname"], json!("Ana"))
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn delete_of_missing_document_is_not_an_error() {
        let mut database = Database::new(DatabaseOptions::new_test());

        let response = database
            .apply(DatabaseCommand::DeleteOne(ObjectId::new()))
            .unwrap();

        assert_eq!(
            response,
            DatabaseCommandResponse::Deleted(DeleteResult { deleted_count: 0 })
        );
    }

    #[test]
    fn table_errors_are_returned_not_panicked() {
        let mut database = Database::new(DatabaseOptions::new_test());

        let response = database.apply(DatabaseCommand::GetMore {
            cursor_id: crate::consts::consts::CursorId(7),
            batch_size: 1,
        });

        assert!(matches!(response, Err(StoreError::CursorNotFound(_))));
    }

    #[test]
    fn find_uses_the_requested_batch_size() {
        let mut database = Database::new(DatabaseOptions::new_test());
        for name in ["Ana", "Beto", "Carla"] {
            database.apply(DatabaseCommand::InsertOne(person(name))).unwrap();
        }

        let response = database
            .apply(DatabaseCommand::Find {
                filter: Filter::All,
                batch_size: 2,
            })
            .unwrap();

        match response {
            DatabaseCommandResponse::Batch(batch) => {
                assert_eq!(batch.documents.len(), 2);
                assert!(batch.cursor_id.is_some());
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn unclaimed_find_does_not_leave_a_cursor_behind() {
        // Given a find that leaves documents on the server
        let mut database = Database::new(DatabaseOptions::new_test());
        for name in ["Ana", "Beto", "Carla"] {
            database.apply(DatabaseCommand::InsertOne(person(name))).unwrap();
        }
        let response = database.apply(DatabaseCommand::Find {
            filter: Filter::All,
            batch_size: 1,
        });
        assert_eq!(database.table.open_cursors(), 1);

        // When the requester is gone by the time the batch is sent
        let (resolver, receiver) = oneshot::channel();
        drop(receiver);
        database.respond(resolver, response);

        // Then the cursor is killed
        assert_eq!(database.table.open_cursors(), 0);
    }

    #[test]
    fn control_commands_answer_with_a_status() {
        let mut database = Database::new(DatabaseOptions::new_test());

        let response = database
            .apply(DatabaseCommand::Control(Control::Sleep(
                std::time::Duration::from_millis(1),
            )))
            .unwrap();

        assert_eq!(
            response,
            DatabaseCommandResponse::Control("Successfully slept database for 1ms".to_string())
        );
    }
}
