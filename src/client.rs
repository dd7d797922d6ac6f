// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::envelope::ErrorEnvelope;
use crate::error::Error;
use futures::future::BoxFuture;
use futures::prelude::*;
use serde::Deserialize;
use surf::{http::mime, middleware::Next, Client, Request, Response, StatusCode};

/// Deserialize the JSON body of a response.
///
/// This function combined with the [parse_error_body] middleware defines the client-side
/// protocol for decoding envelopes from HTTP responses.
pub async fn response_body<T: for<'de> Deserialize<'de>>(
    res: &mut Response,
) -> Result<T, surf::Error> {
    match res.content_type() {
        Some(content_type) if content_type.essence() == mime::JSON.essence() => {
            res.body_json().await.map_err(|err| {
                surf::Error::from_str(
                    StatusCode::InternalServerError,
                    format!("response body fails to deserialize: {}", err),
                )
            })
        }
        Some(content_type) => Err(surf::Error::from_str(
            StatusCode::UnsupportedMediaType,
            format!("unsupported content type {}", content_type),
        )),
        None => Err(surf::Error::from_str(
            StatusCode::UnsupportedMediaType,
            "unspecified content type in response",
        )),
    }
}

/// Interpret the body of a failed response.
///
/// A well-formed error envelope is returned as is. Anything else (a proxy's HTML error page, an
/// empty body) is wrapped in a catch-all envelope carrying the response status, so callers only
/// ever have to handle [ErrorEnvelope].
pub fn error_from_body(status: StatusCode, body: &[u8]) -> ErrorEnvelope {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.is_empty() => envelope,
        _ => {
            let text = String::from_utf8_lossy(body);
            let msg = if text.trim().is_empty() {
                status.canonical_reason().to_string()
            } else {
                text.into_owned()
            };
            ErrorEnvelope::catch_all(status, msg)
        }
    }
}

pub async fn response_to_result(mut res: Response) -> surf::Result<Response> {
    let status = res.status();
    if status.is_success() {
        Ok(res)
    } else {
        let body = res.body_bytes().await?;
        let envelope = error_from_body(status, &body);
        Err(surf::Error::new(status, envelope))
    }
}

/// Client middleware which turns responses with non-success statuses into errors.
///
/// If the status code of the response is 2xx, the response is passed through unchanged.
/// Otherwise, the body of the response is decoded as an [ErrorEnvelope] which is lifted into a
/// [surf::Error]. This can then be converted into a module-specific error type using
/// [Error::from_client_error] (or recovered directly with `E = ErrorEnvelope`).
///
/// If the request fails without producing a response at all, the [surf::Error] from the failed
/// request is passed through.
///
/// This middleware is the inverse of the server-side middleware `add_error_body`, which
/// prepares the body of error responses for interpretation by this client side middleware.
pub fn parse_error_body(
    req: Request,
    client: Client,
    next: Next<'_>,
) -> BoxFuture<surf::Result<Response>> {
    Box::pin(next.run(req, client).and_then(response_to_result))
}
