// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Response and error envelopes for RESTful web APIs.
//!
//! Every successful response body is an [Envelope]: the payload under `data` and auxiliary
//! information (such as the `total` of a collection) under `metadata`. Payloads are *views*:
//! dedicated types built from domain entities by the [Present] trait, holding only the fields that
//! may be shown to clients. Internal surrogate keys have no place in a view type, so they cannot be
//! serialized by accident. In HATEOAS mode, views get a `_links` object via [present_links].
//!
//! Every failed response body is an [ErrorEnvelope], a list of [ErrorDetail]s with a code, a
//! title, a detail message, the HTTP status as a string and an optional source pointer. Errors are
//! raised as [ApiError]s (or any other type implementing the [Error] trait) and converted to an
//! envelope in exactly one place, [server::error_response], which the [server::add_error_body]
//! middleware calls for every failed response, including those produced by the framework itself.
//!
//! The `server` and `client` modules contain helpers and middleware which can be attached to a
//! `tide::Server` and `surf::Client` respectively, so that both ends speak the same envelopes. The
//! `routes` module wires all of this into a reference `/posts` API on top of a
//! [routes::PostService].

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod present;
pub mod query;
pub mod routes;
pub mod server;
pub mod types;

pub use config::*;
pub use envelope::*;
pub use error::*;
pub use present::*;
pub use query::*;
pub use types::*;
