use std::{sync::Arc, time::Duration};

use actix_web::{web, HttpResponse};
use database::{
    collection::{Collection, OperationContext},
    consts::consts::ObjectId,
    database::table::filter::{Filter, RegexOptions},
};
use futures_util::StreamExt;
use tokio::sync::watch;

use crate::{
    consts::consts::DEFAULT_OPERATION_TIMEOUT,
    middleware::validate::Validated,
    model::{
        message::MessageResponse,
        person::{Person, PersonField, PersonUpdate},
    },
};

use super::{cursor::find_people, error::ApiError, update::apply_person_update};

/// Shared by the handlers of one route, every store call gets a fresh context bounded by `timeout`
#[derive(Clone)]
pub struct EndpointHandler {
    collection: Arc<dyn Collection>,
    timeout: Duration,
    shutdown: Option<watch::Receiver<bool>>,
}

// Implements: https://rust-unofficial.github.io/patterns/patterns/creational/builder.html
impl EndpointHandler {
    pub fn new(collection: Arc<dyn Collection>) -> Self {
        Self {
            collection,
            timeout: DEFAULT_OPERATION_TIMEOUT,
            shutdown: None,
        }
    }

    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// In flight store calls are cancelled once the signal flips to `true`
    pub fn set_shutdown(mut self, shutdown: Option<watch::Receiver<bool>>) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn context(&self) -> OperationContext {
        let ctx = OperationContext::with_timeout(self.timeout);

        match &self.shutdown {
            Some(shutdown) => ctx.with_cancellation(shutdown.clone()),
            None => ctx,
        }
    }
}

fn parse_id(raw: &str, operation: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|err| {
        log::error!("Error parsing id for {} [id: {}]: {}", operation, raw, err);
        ApiError::from(err)
    })
}

fn not_found_by_id(id: &str) -> ApiError {
    log::info!("No Person was found with the id: {}", id);
    ApiError::NotFound(format!("No Person was found with the id: {}", id))
}

/// Reads whatever is left of the request body so the connection can be reused
async fn drain_body(mut payload: web::Payload) {
    while let Some(chunk) = payload.next().await {
        if let Err(err) = chunk {
            log::warn!("Error draining request body: {}", err);
            break;
        }
    }
}

/// Matches `name` as a whole word, ignoring case
fn name_filter(name: &str) -> Result<Filter, ApiError> {
    let pattern = format!(r"(?:\A|\s)({})(?:\s|\z)", regex::escape(name));

    Filter::regex(
        PersonField::Firstname.key(),
        &pattern,
        RegexOptions {
            case_insensitive: true,
        },
    )
    .map_err(ApiError::from)
}

/// `POST /person`
pub async fn create_person(
    handler: web::Data<EndpointHandler>,
    Validated(person): Validated<Person>,
) -> Result<HttpResponse, ApiError> {
    // Identity is always assigned by the store
    let person = Person { id: None, ..person };

    let document = person.to_document().map_err(|err| {
        log::error!("Error encoding person for insert: {}", err);
        ApiError::Internal
    })?;

    let result = handler
        .collection
        .insert_one(&handler.context(), document)
        .await
        .map_err(|err| {
            log::error!("Error inserting person: {}", err);
            ApiError::Internal
        })?;

    log::info!("Inserted person [id: {}]", result.inserted_id);

    Ok(HttpResponse::Ok().json(result))
}

/// `GET /person/{id}`
pub async fn get_person(
    handler: web::Data<EndpointHandler>,
    path: web::Path<String>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    drain_body(payload).await;

    let raw_id = path.into_inner();
    let id = parse_id(&raw_id, "get")?;

    let document = handler
        .collection
        .find_one_by_id(&handler.context(), &id)
        .await
        .map_err(|err| {
            log::error!("Error finding person [id: {}]: {}", raw_id, err);
            ApiError::from(err)
        })?
        .ok_or_else(|| not_found_by_id(&raw_id))?;

    let person = Person::from_document(document).map_err(|err| {
        log::error!("Error decoding stored person [id: {}]: {}", raw_id, err);
        ApiError::Internal
    })?;

    Ok(HttpResponse::Ok().json(person))
}

/// `GET /personName/{name}`
pub async fn get_people_by_name(
    handler: web::Data<EndpointHandler>,
    path: web::Path<String>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    drain_body(payload).await;

    let name = path.into_inner();
    let filter = name_filter(&name)?;

    let people = find_people(handler.collection.as_ref(), &handler.context(), filter)
        .await
        .map_err(|err| {
            log::error!("Error finding people [name: {}]: {}", name, err);
            ApiError::from(err)
        })?;

    if people.is_empty() {
        let message = format!("No Person was found with the name: '{}'", name);
        log::info!("{}", message);
        return Err(ApiError::NotFound(message));
    }

    Ok(HttpResponse::Ok().json(people))
}

/// `GET /people`
pub async fn get_people(
    handler: web::Data<EndpointHandler>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    drain_body(payload).await;

    let people = find_people(handler.collection.as_ref(), &handler.context(), Filter::All)
        .await
        .map_err(|err| {
            log::error!("Error listing people: {}", err);
            ApiError::from(err)
        })?;

    if people.is_empty() {
        log::info!("No Person was found");
        return Err(ApiError::NotFound("No Person was found".to_string()));
    }

    Ok(HttpResponse::Ok().json(people))
}

/// `DELETE /person/{id}`
pub async fn delete_person(
    handler: web::Data<EndpointHandler>,
    path: web::Path<String>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    drain_body(payload).await;

    let raw_id = path.into_inner();
    let id = parse_id(&raw_id, "delete")?;

    let result = handler
        .collection
        .delete_one_by_id(&handler.context(), &id)
        .await
        .map_err(|err| {
            log::error!("Error deleting person [id: {}]: {}", raw_id, err);
            ApiError::from(err)
        })?;

    if result.deleted_count == 0 {
        return Err(not_found_by_id(&raw_id));
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new(format!(
        "Person with id: {} was deleted",
        raw_id
    ))))
}

/// `PUT /person/{id}`
pub async fn update_person(
    handler: web::Data<EndpointHandler>,
    path: web::Path<String>,
    Validated(update): Validated<PersonUpdate>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    drain_body(payload).await;

    let raw_id = path.into_inner();
    let id = parse_id(&raw_id, "update")?;

    let summary = apply_person_update(handler.collection.as_ref(), &handler.context(), &id, &update)
        .await
        .map_err(|abort| {
            log::error!("Error updating person [id: {}]: {}", raw_id, abort);
            ApiError::Store(abort.source)
        })?;

    let message = if summary.is_noop() {
        format!("No update operation was done to document with id: {}", raw_id)
    } else {
        format!("Person with id: {} was updated", raw_id)
    };

    Ok(HttpResponse::Ok().json(MessageResponse::new(message)))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::{json, Value};

    use super::*;

    #[rstest]
    #[case("Ana", true)]
    #[case("ana", true)]
    #[case("Ana Maria", true)]
    #[case("Maria Ana", true)]
    #[case("Anabel", false)]
    #[case("Mariana", false)]
    fn name_filter_matches_whole_words_ignoring_case(#[case] firstname: &str, #[case] matches: bool) {
        let filter = name_filter("ANA").unwrap();
        let document = match json!({ "firstname": firstname }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        assert_eq!(filter.matches(&document), matches);
    }

    #[test]
    fn name_filter_escapes_pattern_characters() {
        let filter = name_filter(".*").unwrap();
        let document = match json!({ "firstname": "Ana" }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        assert!(!filter.matches(&document));
    }

    #[test]
    fn malformed_id_is_a_parse_error() {
        let result = parse_id("not-an-id", "get");

        assert!(matches!(result, Err(ApiError::IdentifierParse(_))));
    }
}
