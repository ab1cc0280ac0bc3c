use std::future::{ready, Ready};

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{Payload, ServiceRequest, ServiceResponse},
    web::Bytes,
    Error, FromRequest, HttpMessage, HttpRequest,
};
use actix_web_lab::middleware::Next;
use serde::de::DeserializeOwned;

use crate::{
    handlers::error::ApiError,
    model::{
        person::{Person, PersonUpdate},
        validation::Validate,
    },
};

/// Body that went through the validation middleware, only the middleware can build one
#[derive(Debug)]
pub struct Validated<T>(pub(crate) T);

impl<T> Validated<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: 'static> FromRequest for Validated<T> {
    type Error = ApiError;
    type Future = Ready<Result<Self, ApiError>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let validated = req.extensions_mut().remove::<Validated<T>>();

        ready(validated.ok_or_else(|| {
            log::error!(
                "No validated body on {} {}, is the validation middleware registered?",
                req.method(),
                req.path()
            );
            ApiError::MissingValidatedBody
        }))
    }
}

/// Guards `POST /person`
pub async fn validate_person(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    validate_body::<Person, _>(req, next).await
}

/// Guards `PUT /person/{id}`
pub async fn validate_person_update(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    validate_body::<PersonUpdate, _>(req, next).await
}

async fn validate_body<T, B>(
    mut req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error>
where
    T: DeserializeOwned + Validate + 'static,
    B: MessageBody + 'static,
{
    match decode_and_validate::<T>(&mut req).await {
        Ok(value) => {
            req.extensions_mut().insert(Validated(value));

            next.call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        }
        Err(err) => {
            match &err {
                ApiError::Validation(_) => log::info!("Rejected {}: {}", req.path(), err),
                _ => log::error!("Error decoding body for {}: {}", req.path(), err),
            }

            Ok(req.error_response(err).map_into_right_body())
        }
    }
}

async fn decode_and_validate<T>(req: &mut ServiceRequest) -> Result<T, ApiError>
where
    T: DeserializeOwned + Validate,
{
    let body = req
        .extract::<Bytes>()
        .await
        .map_err(|err| ApiError::Decode(err.to_string()))?;

    let value: T = serde_json::from_slice(&body).map_err(|err| ApiError::Decode(err.to_string()))?;

    value.validate()?;

    Ok(value)
}
