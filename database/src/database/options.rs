use crate::consts::consts::{DEFAULT_BATCH_SIZE, DEFAULT_COLLECTION};

#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub collection: String,
    pub batch_size: usize,
}

// Implements: https://rust-unofficial.github.io/patterns/patterns/creational/builder.html
impl DatabaseOptions {
    /// Name of the collection served by this database, used in logs and the worker thread name
    pub fn set_collection(mut self, collection: &str) -> Self {
        self.collection = collection.to_string();
        self
    }

    /// Number of documents returned per find / get more round trip
    pub fn set_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl DatabaseOptions {
    pub fn new_test() -> Self {
        DatabaseOptions::default().set_collection("people_test")
    }
}
