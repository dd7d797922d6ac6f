// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::error::Error;
use futures::future::BoxFuture;
use mime::Mime;
use serde::{Deserialize, Serialize};
use tide::http::{content::Accept, mime};
use tide::{Body, Next, Request, Response, StatusCode};
use tracing::{event, Level};

/// Deserialize the JSON body of a request.
///
/// Requests without a JSON Content-Type are rejected with 400 before the body is read.
pub async fn request_body<T: for<'de> Deserialize<'de>, S>(
    req: &mut Request<S>,
) -> Result<T, tide::Error> {
    match req.content_type() {
        Some(content_type) if content_type.essence() == mime::JSON.essence() => {
            req.body_json().await.map_err(|err| {
                tide::Error::from_str(
                    StatusCode::BadRequest,
                    format!("unable to deserialize request body: {}", err),
                )
            })
        }
        Some(content_type) => Err(tide::Error::from_str(
            StatusCode::BadRequest,
            format!("unsupported content type {}", content_type),
        )),
        None => Err(tide::Error::from_str(
            StatusCode::BadRequest,
            "unspecified content type",
        )),
    }
}

/// Pick the first of `available` acceptable to the client, in the client's order of preference.
pub fn best_response_type(
    accept: &mut Option<Accept>,
    available: &[Mime],
) -> Result<Mime, tide::Error> {
    let not_acceptable =
        || tide::Error::from_str(StatusCode::NotAcceptable, "No suitable Content-Type found");
    let fallback = available.first().cloned().ok_or_else(not_acceptable)?;
    let accept = match accept {
        Some(accept) => accept,
        // Nothing explicitly requested.
        None => return Ok(fallback),
    };

    // The Accept type has a `negotiate` method, but it only handles a bare * wildcard: for
    // proposals like */* and basetype/* it looks for a literal match in `available`. So we match
    // proposals ourselves, after sorting them by weight.
    accept.sort();
    for proposed in accept.iter() {
        if proposed.basetype() == "*" {
            // */* is the only valid proposal with a wildcard basetype.
            return Ok(fallback);
        } else if proposed.subtype() == "*" {
            if let Some(mime) = available
                .iter()
                .find(|mime| mime.basetype() == proposed.basetype())
            {
                return Ok(mime.clone());
            }
        } else if let Some(mime) = available
            .iter()
            .find(|mime| mime.essence() == proposed.essence())
        {
            return Ok(mime.clone());
        }
    }

    if accept.wildcard() {
        Ok(fallback)
    } else {
        Err(not_acceptable())
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response, tide::Error> {
    Ok(Response::builder(status)
        .body(Body::from_json(body)?)
        .content_type(mime::JSON)
        .build())
}

fn respond_with<T: Serialize>(
    accept: &mut Option<Accept>,
    status: StatusCode,
    body: T,
) -> Result<Response, tide::Error> {
    best_response_type(accept, &[mime::JSON])?;
    json_response(status, &body)
}

/// Serialize the body of a 200 response.
///
/// The Accept header of the request is checked against the JSON content type.
///
/// This function combined with the [add_error_body] middleware defines the server-side protocol
/// for encoding envelopes in HTTP responses.
pub fn response<T: Serialize, S>(req: &Request<S>, body: T) -> Result<Response, tide::Error> {
    response_with_status(req, StatusCode::Ok, body)
}

/// Serialize the body of a response with a success status other than 200, e.g. 201 Created.
pub fn response_with_status<T: Serialize, S>(
    req: &Request<S>,
    status: StatusCode,
    body: T,
) -> Result<Response, tide::Error> {
    respond_with(&mut Accept::from_headers(req)?, status, body)
}

/// Render any error as an error envelope response.
///
/// This is the one place where errors become response bodies. The error is converted into `E`
/// (by downcasting if a handler raised an instance of `E`, or through [Error::catch_all]
/// otherwise), and `E`'s envelope and status make up the response. Error bodies are always JSON,
/// whatever the client asked for, so that there is a single error format to parse.
pub fn error_response<E: Error>(error: tide::Error) -> Result<Response, tide::Error> {
    let error = E::from_client_error(error);
    let status = error.status();
    if status.is_server_error() {
        event!(Level::ERROR, "responding with error {}: {}", status, error);
    } else {
        event!(Level::WARN, "responding with error {}: {}", status, error);
    }
    json_response(status, &error.envelope())
}

// Framework-generated failures (no matching route, method not allowed) come back as an error
// status with an empty body and no error attached.
fn is_bare_failure(res: &Response) -> bool {
    let status = res.status();
    (status.is_client_error() || status.is_server_error()) && res.is_empty().unwrap_or(false)
}

/// Server middleware which populates the body of error responses.
///
/// Responses carrying an error are rendered by [error_response]. Error responses produced by the
/// framework without any error attached get an envelope built from their status. Anything else is
/// passed through unchanged.
///
/// This middleware is the inverse of the client-side middleware `parse_error_body`, which
/// converts error responses back into [Err] variants.
pub fn add_error_body<'a, T: Clone + Send + Sync + 'static, E: Error>(
    req: Request<T>,
    next: Next<'a, T>,
) -> BoxFuture<'a, tide::Result> {
    Box::pin(async {
        let mut res = next.run(req).await;
        if let Some(error) = res.take_error() {
            error_response::<E>(error)
        } else if is_bare_failure(&res) {
            let status = res.status();
            error_response::<E>(tide::Error::from_str(status, status.canonical_reason()))
        } else {
            Ok(res)
        }
    })
}

/// Server middleware which logs requests and responses.
pub fn trace<'a, T: Clone + Send + Sync + 'static>(
    req: tide::Request<T>,
    next: tide::Next<'a, T>,
) -> BoxFuture<'a, tide::Result> {
    Box::pin(async {
        event!(
            Level::INFO,
            "<-- received request {{method: {}, url: {}, content-type: {:?}}}",
            req.method(),
            req.url(),
            req.content_type(),
        );
        let res = next.run(req).await;
        event!(
            Level::INFO,
            "--> responding with {{status: {}, content-type: {:?}, error: {:?}}}",
            res.status(),
            res.content_type(),
            res.error(),
        );
        Ok(res)
    })
}
