use std::collections::VecDeque;

use async_trait::async_trait;

use crate::{
    collection::{Cursor, OperationContext, StoreResult},
    consts::consts::CursorId,
    database::request_manager::RequestManager,
    model::document::{CursorBatch, Document},
};

/// Client side of a server cursor
///
/// Holds the current batch, once it runs dry the next batch is requested from the database
/// under the same context the query was opened with.
pub struct RemoteCursor {
    request_manager: RequestManager,
    ctx: OperationContext,
    buffer: VecDeque<Document>,
    cursor_id: Option<CursorId>,
    failed: bool,
}

impl RemoteCursor {
    pub fn new(request_manager: RequestManager, ctx: OperationContext, batch: CursorBatch) -> Self {
        Self {
            request_manager,
            ctx,
            buffer: batch.documents.into(),
            cursor_id: batch.cursor_id,
            failed: false,
        }
    }
}

#[async_trait]
impl Cursor for RemoteCursor {
    async fn next(&mut self) -> Option<StoreResult<Document>> {
        if self.failed {
            return None;
        }

        if let Some(document) = self.buffer.pop_front() {
            return Some(Ok(document));
        }

        let cursor_id = self.cursor_id?;

        match self.request_manager.send_get_more(&self.ctx, cursor_id).await {
            Ok(batch) => {
                self.cursor_id = batch.cursor_id;
                self.buffer = batch.documents.into();
                self.buffer.pop_front().map(Ok)
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    async fn close(&mut self) -> StoreResult<()> {
        self.buffer.clear();

        match self.cursor_id.take() {
            Some(cursor_id) => {
                log::debug!("Killing cursor {}", cursor_id);
                self.request_manager
                    .send_kill_cursor(&self.ctx, cursor_id)
                    .await
            }
            None => Ok(()),
        }
    }
}
