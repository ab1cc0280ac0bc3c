use async_trait::async_trait;
use serde_json::Value;

use crate::{
    collection::{Collection, Cursor, OperationContext, StoreError, StoreResult},
    consts::consts::{CursorId, ObjectId},
    cursor::RemoteCursor,
    model::document::{CursorBatch, DeleteResult, Document, InsertOneResult, UpdateResult},
};

use super::{
    commands::{Control, DatabaseCommand, DatabaseCommandResponse, DatabaseRequest},
    table::filter::Filter,
};

/// Goal of the request manager is to provide a simple interface for interacting with the database
///
/// Every request is sent over the database channel together with a one shot resolver, the
/// database answers on the resolver once it has processed the command. Waiting for the answer is
/// bounded by the caller's `OperationContext`, a slow database surfaces as a timeout, never as a
/// hang.
#[derive(Clone)]
pub struct RequestManager {
    database_sender: flume::Sender<DatabaseRequest>,
    batch_size: usize,
}

impl RequestManager {
    pub fn new(database_sender: flume::Sender<DatabaseRequest>, batch_size: usize) -> Self {
        Self {
            database_sender,
            batch_size,
        }
    }

    pub async fn send_command(
        &self,
        ctx: &OperationContext,
        command: DatabaseCommand,
    ) -> StoreResult<DatabaseCommandResponse> {
        let database_sender = &self.database_sender;

        ctx.run(async move {
            let (resolver, response_receiver) =
                oneshot::channel::<StoreResult<DatabaseCommandResponse>>();

            // Sends the request to the database worker, database will respond on the
            //  response_receiver once it's finished processing the request
            database_sender
                .send(DatabaseRequest { resolver, command })
                .map_err(|_| StoreError::Disconnected)?;

            match response_receiver.await {
                Ok(response) => response,
                Err(_) => Err(StoreError::Disconnected),
            }
        })
        .await
    }

    pub async fn send_control(&self, ctx: &OperationContext, control: Control) -> StoreResult<String> {
        match self.send_command(ctx, DatabaseCommand::Control(control)).await? {
            DatabaseCommandResponse::Control(status) => Ok(status),
            other => Err(unexpected("Control", other)),
        }
    }

    /// Sends a shutdown request to the database and returns the database's response
    pub async fn send_shutdown_request(&self, ctx: &OperationContext) -> StoreResult<String> {
        self.send_control(ctx, Control::Shutdown).await
    }

    pub(crate) async fn send_get_more(
        &self,
        ctx: &OperationContext,
        cursor_id: CursorId,
    ) -> StoreResult<CursorBatch> {
        let command = DatabaseCommand::GetMore {
            cursor_id,
            batch_size: self.batch_size,
        };

        match self.send_command(ctx, command).await? {
            DatabaseCommandResponse::Batch(batch) => Ok(batch),
            other => Err(unexpected("GetMore", other)),
        }
    }

    pub(crate) async fn send_kill_cursor(
        &self,
        ctx: &OperationContext,
        cursor_id: CursorId,
    ) -> StoreResult<()> {
        match self
            .send_command(ctx, DatabaseCommand::KillCursor(cursor_id))
            .await?
        {
            DatabaseCommandResponse::CursorKilled => Ok(()),
            other => Err(unexpected("KillCursor", other)),
        }
    }
}

fn unexpected(command: &str, response: DatabaseCommandResponse) -> StoreError {
    StoreError::UnexpectedResponse(format!("{} answered with {:?}", command, response))
}

#[async_trait]
impl Collection for RequestManager {
    async fn insert_one(
        &self,
        ctx: &OperationContext,
        document: Document,
    ) -> StoreResult<InsertOneResult> {
        match self
            .send_command(ctx, DatabaseCommand::InsertOne(document))
            .await?
        {
            DatabaseCommandResponse::Inserted(result) => Ok(result),
            other => Err(unexpected("InsertOne", other)),
        }
    }

    async fn find_one_by_id(
        &self,
        ctx: &OperationContext,
        id: &ObjectId,
    ) -> StoreResult<Option<Document>> {
        match self.send_command(ctx, DatabaseCommand::FindOne(*id)).await? {
            DatabaseCommandResponse::Found(document) => Ok(document),
            other => Err(unexpected("FindOne", other)),
        }
    }

    async fn find(&self, ctx: &OperationContext, filter: Filter) -> StoreResult<Box<dyn Cursor>> {
        let command = DatabaseCommand::Find {
            filter,
            batch_size: self.batch_size,
        };

        match self.send_command(ctx, command).await? {
            DatabaseCommandResponse::Batch(batch) => Ok(Box::new(RemoteCursor::new(
                self.clone(),
                ctx.clone(),
                batch,
            ))),
            other => Err(unexpected("Find", other)),
        }
    }

    async fn delete_one_by_id(
        &self,
        ctx: &OperationContext,
        id: &ObjectId,
    ) -> StoreResult<DeleteResult> {
        match self.send_command(ctx, DatabaseCommand::DeleteOne(*id)).await? {
            DatabaseCommandResponse::Deleted(result) => Ok(result),
            other => Err(unexpected("DeleteOne", other)),
        }
    }

    async fn update_one_field_by_id(
        &self,
        ctx: &OperationContext,
        id: &ObjectId,
        field: &str,
        value: Value,
    ) -> StoreResult<UpdateResult> {
        let command = DatabaseCommand::UpdateOneField {
            id: *id,
            field: field.to_string(),
            value,
        };

        match self.send_command(ctx, command).await? {
            DatabaseCommandResponse::Updated(result) => Ok(result),
            other => Err(unexpected("UpdateOneField", other)),
        }
    }
}
