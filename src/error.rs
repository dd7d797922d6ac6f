// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::envelope::{ErrorDetail, ErrorEnvelope, ErrorSource};
use snafu::{ErrorCompat, IntoError, Snafu};
use std::fmt::{self, Display, Formatter};
use tide::StatusCode;

/// Errors which can be rendered as an [ErrorEnvelope] in a response body.
///
/// This trait defines the standard error type returned by all API endpoints. When a request fails
/// for any reason, the body of the response contains the envelope produced by
/// [Error::envelope], and the status line carries [Error::status].
///
/// Errors which don't downcast to the API's error type (for instance errors generated by the
/// [tide] framework itself, or a body that failed to parse) are converted using their [Display]
/// instance and the status they were raised with, via [Error::catch_all]. This is what gives every
/// error response the same shape regardless of where it originated.
pub trait Error: Sized + std::error::Error + Send + Sync + 'static {
    fn catch_all(status: StatusCode, msg: String) -> Self;
    fn status(&self) -> StatusCode;
    fn envelope(&self) -> ErrorEnvelope;

    /// Convert from a generic HTTP error to a specific error type.
    ///
    /// If `source` can be downcast to `Self`, it is simply downcasted. Otherwise, it is converted
    /// to a [String] using [Display] and then converted to `Self` using [Error::catch_all], keeping
    /// the status of the original error.
    fn from_client_error(source: surf::Error) -> Self {
        let status = source.status();
        match source.downcast::<Self>() {
            Ok(err) => err,
            Err(err) => Self::catch_all(status, err.to_string()),
        }
    }
}

/// Machine-readable error codes carried in [ErrorDetail::code].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Anything the API did not classify itself, e.g. framework dispatch errors.
    Unclassified,
    InvalidInput,
    NotFound,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Unclassified => "ERR-1000",
            ErrorCode::InvalidInput => "ERR-1001",
            ErrorCode::NotFound => "ERR-1002",
            ErrorCode::Internal => "ERR-1003",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

/// The error taxonomy of the posts API.
///
/// Validation and not-found conditions are raised by handlers and collaborators; they are turned
/// into an [ErrorEnvelope] exactly once, at the response boundary (see
/// [crate::server::error_response]). [ApiError::Serialization] signals a defect in entity
/// construction: it is logged in full but rendered to clients as a generic internal error.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ApiError {
    #[snafu(display("invalid attribute {}: {}", attribute, message))]
    InvalidAttribute { attribute: String, message: String },

    #[snafu(display("invalid query parameter {}: {}", parameter, message))]
    InvalidParameter { parameter: String, message: String },

    #[snafu(display("malformed request body at {}: {}", pointer, message))]
    MalformedBody { pointer: String, message: String },

    #[snafu(display("{} {} not found", resource, uuid))]
    NotFound { resource: String, uuid: String },

    #[snafu(display("serialization error: {} is missing required field {}", entity, field))]
    Serialization {
        entity: &'static str,
        field: &'static str,
    },

    #[snafu(display("{} validation failures", errors.len()))]
    Aggregate { errors: Vec<ApiError> },

    #[snafu(display("{}", message))]
    Unhandled { status: StatusCode, message: String },
}

impl ApiError {
    /// Combine validation failures into one error, preserving their order.
    ///
    /// Returns `None` when there is nothing to report, and the failure itself when there is
    /// exactly one, so that a single bad field does not get wrapped.
    pub fn aggregate(mut errors: Vec<ApiError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(ApiError::Aggregate { errors }),
        }
    }

    fn details(&self) -> Vec<ErrorDetail> {
        match self {
            ApiError::InvalidAttribute { attribute, message } => vec![ErrorDetail::new(
                ErrorCode::InvalidInput,
                "Invalid attribute",
                message.clone(),
                StatusCode::BadRequest,
            )
            .with_source(ErrorSource::attribute(attribute))],
            ApiError::InvalidParameter { parameter, message } => vec![ErrorDetail::new(
                ErrorCode::InvalidInput,
                "Invalid query parameter",
                message.clone(),
                StatusCode::BadRequest,
            )
            .with_source(ErrorSource::parameter(parameter))],
            ApiError::NotFound { .. } => vec![ErrorDetail::new(
                ErrorCode::NotFound,
                "Not found",
                self.to_string(),
                StatusCode::NotFound,
            )],
            ApiError::MalformedBody { pointer, message } => vec![ErrorDetail::new(
                ErrorCode::InvalidInput,
                "Malformed request body",
                message.clone(),
                StatusCode::BadRequest,
            )
            .with_source(ErrorSource::pointer(pointer.clone()))],
            ApiError::Serialization { .. } => vec![ErrorDetail::new(
                ErrorCode::Internal,
                "Internal server error",
                "the server was unable to render the requested resource",
                StatusCode::InternalServerError,
            )],
            ApiError::Aggregate { errors } => errors.iter().flat_map(ApiError::details).collect(),
            ApiError::Unhandled { status, message } => vec![ErrorDetail::new(
                ErrorCode::Unclassified,
                status.canonical_reason(),
                message.clone(),
                *status,
            )],
        }
    }
}

impl Error for ApiError {
    fn catch_all(status: StatusCode, msg: String) -> Self {
        ApiError::Unhandled {
            status,
            message: msg,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidAttribute { .. }
            | ApiError::InvalidParameter { .. }
            | ApiError::MalformedBody { .. } => StatusCode::BadRequest,
            ApiError::NotFound { .. } => StatusCode::NotFound,
            ApiError::Serialization { .. } => StatusCode::InternalServerError,
            ApiError::Aggregate { errors } => errors
                .first()
                .map(Error::status)
                .unwrap_or(StatusCode::BadRequest),
            ApiError::Unhandled { status, .. } => *status,
        }
    }

    fn envelope(&self) -> ErrorEnvelope {
        self.details().into_iter().collect()
    }
}

/// Convert a concrete error type into a server error.
///
/// The error is first converted into an `E` using the [From] instance. That error is then
/// upcasted into the [tide::Error], using the status code indicated by [Error::status]. Handlers
/// return this and leave rendering to [crate::server::add_error_body], so no handler ever formats
/// an error body by hand.
///
/// ```ignore
/// fn api_error(error: impl Into<ApiError>) -> tide::Error {
///     server_error(error)
/// }
///
/// let post = service.get_by_uuid(uuid).await.ok_or_else(|| not_found(uuid)).map_err(api_error)?;
/// ```
pub fn server_error<E: Error>(error: impl Into<E>) -> tide::Error {
    let error = error.into();
    tide::Error::new(error.status(), error)
}

/// Context for embedding network client errors into specific error types.
///
/// This type implements the [IntoError] trait from SNAFU, so it can be used with
/// [snafu::ResultExt::context] just like automatically generated SNAFU contexts.
///
/// Calling `some_result.context(ClientError)` will convert a potential error from a [surf::Error]
/// to a specific error type `E` using the method `E::from_client_error`, provided by the
/// [Error] trait.
///
/// This is the inverse of [server_error]. Clients that want the decoded wire envelope should use
/// [ErrorEnvelope] as `E`: the client middleware in [crate::client] embeds exactly that type.
pub struct ClientError;

impl<E: Error + ErrorCompat + std::error::Error> IntoError<E> for ClientError {
    type Source = surf::Error;

    fn into_error(self, source: Self::Source) -> E {
        E::from_client_error(source)
    }
}

/// Convert a concrete error type into a client error.
///
/// This is the equivalent for [server_error] for errors generated on the client side; for instance,
/// in middleware.
pub fn client_error<E: Error>(error: impl Into<E>) -> surf::Error {
    let error = error.into();
    surf::Error::new(error.status(), error)
}
