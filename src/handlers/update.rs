use database::{
    collection::{Collection, OperationContext, StoreError},
    consts::consts::ObjectId,
};
use serde_json::Value;
use thiserror::Error;

use crate::model::person::{PersonField, PersonUpdate};

#[derive(Debug, Default, PartialEq)]
pub struct UpdateSummary {
    /// Single field updates sent to the store
    pub operations: usize,
    pub modified_count: u64,
}

impl UpdateSummary {
    pub fn is_noop(&self) -> bool {
        self.modified_count == 0
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("updating '{field}' failed after {modified_count} modification(s): {source}")]
pub struct UpdateAbort {
    pub field: PersonField,
    /// Modifications applied by the fields before `field`, they are not rolled back
    pub modified_count: u64,
    pub source: StoreError,
}

/// Applies every present field of `update` as its own `$set`, in `PersonField` order
///
/// Stops at the first store error.
pub async fn apply_person_update(
    collection: &dyn Collection,
    ctx: &OperationContext,
    id: &ObjectId,
    update: &PersonUpdate,
) -> Result<UpdateSummary, UpdateAbort> {
    let mut summary = UpdateSummary::default();

    for (field, value) in update.present_fields() {
        let result = collection
            .update_one_field_by_id(ctx, id, field.key(), Value::String(value.to_string()))
            .await
            .map_err(|source| UpdateAbort {
                field,
                modified_count: summary.modified_count,
                source,
            })?;

        summary.operations += 1;
        summary.modified_count += result.modified_count;
    }

    Ok(summary)
}
