use std::{future::Future, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::{sync::watch, time::Instant};

use crate::{
    consts::consts::{CursorId, ObjectId},
    database::table::filter::Filter,
    model::document::{DeleteResult, Document, InsertOneResult, UpdateResult},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("context deadline exceeded")]
    Timeout,

    #[error("operation was cancelled")]
    Cancelled,

    #[error("database is not running")]
    Disconnected,

    #[error("duplicate key, a document already exists with _id: {0}")]
    DuplicateKey(ObjectId),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("performing an update on the path '{0}' would modify the immutable field")]
    ImmutableField(String),

    #[error("cursor id {0} not found")]
    CursorNotFound(CursorId),

    #[error("unexpected response from the database: {0}")]
    UnexpectedResponse(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Bounds a single store operation: a deadline plus an optional cancellation signal
///
/// Every request builds its own context, nothing is shared across requests except the
/// cancellation signal, which is flipped once on shutdown.
#[derive(Clone, Debug)]
pub struct OperationContext {
    deadline: Instant,
    cancellation: Option<watch::Receiver<bool>>,
}

impl OperationContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, cancellation: watch::Receiver<bool>) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// Runs `operation` until it completes, the deadline passes or the context is cancelled
    pub async fn run<T, F>(&self, operation: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let cancellation = self.cancellation.clone();

        // Cancellation is checked first, a cancelled context never starts the operation
        tokio::select! {
            biased;
            _ = cancelled(cancellation) => Err(StoreError::Cancelled),
            result = tokio::time::timeout_at(self.deadline, operation) => match result {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout),
            },
        }
    }
}

async fn cancelled(cancellation: Option<watch::Receiver<bool>>) {
    if let Some(mut receiver) = cancellation {
        // A dropped sender means nobody can cancel anymore, not that we were cancelled
        if receiver.wait_for(|cancelled| *cancelled).await.is_ok() {
            return;
        }
    }

    std::future::pending::<()>().await
}

/// Document store scoped to a single collection
#[async_trait]
pub trait Collection: Send + Sync {
    async fn insert_one(
        &self,
        ctx: &OperationContext,
        document: Document,
    ) -> StoreResult<InsertOneResult>;

    /// `Ok(None)` means the call succeeded and matched no document
    async fn find_one_by_id(
        &self,
        ctx: &OperationContext,
        id: &ObjectId,
    ) -> StoreResult<Option<Document>>;

    async fn find(&self, ctx: &OperationContext, filter: Filter) -> StoreResult<Box<dyn Cursor>>;

    async fn delete_one_by_id(
        &self,
        ctx: &OperationContext,
        id: &ObjectId,
    ) -> StoreResult<DeleteResult>;

    /// `$set` of a single field on a single document
    async fn update_one_field_by_id(
        &self,
        ctx: &OperationContext,
        id: &ObjectId,
        field: &str,
        value: Value,
    ) -> StoreResult<UpdateResult>;
}

/// Yields query results one document at a time
///
/// An `Err` is terminal, every call after it returns `None`.
#[async_trait]
pub trait Cursor: Send {
    async fn next(&mut self) -> Option<StoreResult<Document>>;

    async fn close(&mut self) -> StoreResult<()>;
}
