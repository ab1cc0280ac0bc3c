use database::{
    collection::{Collection, Cursor, OperationContext, StoreError},
    database::table::filter::Filter,
};

use crate::model::person::{People, Person};

/// Walks the cursor to the end, appending every document that decodes as a person to `people`
///
/// Documents that do not decode are logged and skipped. A cursor error is returned even when
/// people were already collected, an empty result is not an error.
pub async fn drain_people(cursor: &mut dyn Cursor, mut people: People) -> Result<People, StoreError> {
    while let Some(next) = cursor.next().await {
        let document = next?;

        match Person::from_document(document) {
            Ok(person) => people.push(person),
            Err(err) => log::warn!("Skipping document that does not decode as a person: {}", err),
        }
    }

    Ok(people)
}

/// Opens a cursor for `filter`, drains it and closes it whatever the drain outcome
pub async fn find_people(
    collection: &dyn Collection,
    ctx: &OperationContext,
    filter: Filter,
) -> Result<People, StoreError> {
    let mut cursor = collection.find(ctx, filter).await?;

    let drained = drain_people(cursor.as_mut(), People::default()).await;

    if let Err(err) = cursor.close().await {
        log::warn!("Error closing cursor: {}", err);
    }

    drained
}
