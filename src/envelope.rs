// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Success and error envelopes.
//!
//! Every successful response body is an [Envelope]: the payload under `data`, auxiliary
//! information under `metadata`. Whether `data` is one view or a sequence of views is fixed by the
//! type parameter, so an endpoint cannot drift between the two. Every failed response body is an
//! [ErrorEnvelope] holding one [ErrorDetail] per problem.

use crate::error::{ApiError, Error};
use crate::present::{present_links, Embed, Identified, Linked, Present, Relations};
use crate::types::fmt_as_json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::ErrorCompat;
use std::convert::TryFrom;
use std::fmt::{self, Display, Formatter};
use std::iter::FromIterator;
use tide::StatusCode;

/// Open key/value information attached to a response, e.g. the `total` of a collection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_total(self, total: usize) -> Self {
        self.with("total", total)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn total(&self) -> Option<u64> {
        self.get("total").and_then(Value::as_u64)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A successful response body.
///
/// `Envelope<V>` is the body of a single-resource endpoint and `Envelope<Vec<V>>` the body of a
/// collection endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<D> {
    pub data: D,
    #[serde(default)]
    pub metadata: Metadata,
}

impl<D> Envelope<D> {
    pub fn new(data: D, metadata: Metadata) -> Self {
        Self { data, metadata }
    }
}

impl<V: Identified> Envelope<V> {
    /// Attach `_links` to the single view in this envelope.
    pub fn link(self, relations: &Relations) -> Envelope<Linked<V>> {
        Envelope::new(present_links(self.data, relations), self.metadata)
    }
}

impl<V: Identified> Envelope<Vec<V>> {
    /// Attach `_links` to each view in this envelope, preserving order.
    pub fn link_each(self, relations: &Relations) -> Envelope<Vec<Linked<V>>> {
        let data = self
            .data
            .into_iter()
            .map(|view| present_links(view, relations))
            .collect();
        Envelope::new(data, self.metadata)
    }
}

impl<D: Serialize> Display for Envelope<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt_as_json(self, f)
    }
}

/// Wrap the public view of a single entity.
///
/// The caller is responsible for having found the entity; there is no not-found branch here.
pub fn present_one<T: Present>(
    entity: &T,
    embed: Embed,
    metadata: Metadata,
) -> Result<Envelope<T::View>, ApiError> {
    Ok(Envelope::new(entity.present(embed)?, metadata))
}

/// Wrap the public views of an ordered collection of entities.
///
/// Order and length are preserved. An empty collection is not an error: it presents as an empty
/// `data` array next to the given metadata. The first entity that fails to present fails the
/// whole envelope.
pub fn present_collection<'a, T, I>(
    entities: I,
    embed: Embed,
    metadata: Metadata,
) -> Result<Envelope<Vec<T::View>>, ApiError>
where
    T: Present + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let data = entities
        .into_iter()
        .map(|entity| entity.present(embed))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Envelope::new(data, metadata))
}

/// Where in the request an error originated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSource {
    /// JSON pointer into the request document, e.g. `/data/attributes/title`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    /// Name of the offending query parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl ErrorSource {
    pub fn pointer(pointer: impl Into<String>) -> Self {
        Self {
            pointer: Some(pointer.into()),
            parameter: None,
        }
    }

    /// Pointer to an attribute of the primary resource in a request document.
    pub fn attribute(name: &str) -> Self {
        Self::pointer(format!("/data/attributes/{}", name))
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Self {
            pointer: None,
            parameter: Some(name.into()),
        }
    }
}

/// One reported problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub title: String,
    pub detail: String,
    /// The HTTP status as a decimal string, e.g. `"404"`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

impl ErrorDetail {
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        detail: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            detail: detail.into(),
            status: u16::from(status).to_string(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: ErrorSource) -> Self {
        self.source = Some(source);
        self
    }

    /// The status this detail was reported with, if it is a valid HTTP status.
    pub fn status_code(&self) -> Option<StatusCode> {
        let code = self.status.parse::<u16>().ok()?;
        StatusCode::try_from(code).ok()
    }
}

/// A failed response body: `{ "errors": [...] }`.
///
/// Details accumulate. Neither [ErrorEnvelope::push] nor [ErrorEnvelope::merge] ever replaces an
/// entry that is already present, so several validation failures for one request end up side by
/// side in the order they were reported.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub errors: Vec<ErrorDetail>,
}

impl ErrorEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, detail: ErrorDetail) {
        self.errors.push(detail);
    }

    pub fn merge(mut self, other: ErrorEnvelope) -> Self {
        self.errors.extend(other.errors);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl FromIterator<ErrorDetail> for ErrorEnvelope {
    fn from_iter<I: IntoIterator<Item = ErrorDetail>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl Extend<ErrorDetail> for ErrorEnvelope {
    fn extend<I: IntoIterator<Item = ErrorDetail>>(&mut self, iter: I) {
        self.errors.extend(iter)
    }
}

impl Display for ErrorEnvelope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for detail in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", detail.title, detail.detail)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorEnvelope {}

impl ErrorCompat for ErrorEnvelope {}

/// A decoded envelope is itself an API error, which is what clients receive from
/// [crate::client::parse_error_body].
impl Error for ErrorEnvelope {
    fn catch_all(status: StatusCode, msg: String) -> Self {
        present_error(
            crate::error::ErrorCode::Unclassified,
            status.canonical_reason(),
            msg,
            status,
            None,
        )
    }

    fn status(&self) -> StatusCode {
        self.errors
            .first()
            .and_then(ErrorDetail::status_code)
            .unwrap_or(StatusCode::InternalServerError)
    }

    fn envelope(&self) -> ErrorEnvelope {
        self.clone()
    }
}

/// Build a one-entry error envelope.
///
/// Use [ErrorEnvelope::merge] or [Extend] to aggregate several of these for one response.
pub fn present_error(
    code: impl Into<String>,
    title: impl Into<String>,
    detail: impl Into<String>,
    status: StatusCode,
    source_pointer: Option<&str>,
) -> ErrorEnvelope {
    let mut detail = ErrorDetail::new(code, title, detail, status);
    if let Some(pointer) = source_pointer {
        detail = detail.with_source(ErrorSource::pointer(pointer));
    }
    std::iter::once(detail).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::{Media, Post};
    use proptest::prelude::*;
    use rstest::rstest;
    use serde_json::json;
    use uuid::Uuid;

    fn uuid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn africa() -> Post {
        Post {
            id: Some(7),
            uuid: Some(uuid(1)),
            title: Some("Travel through Africa".into()),
            description: Some("Notes from the road".into()),
            media: None,
        }
    }

    #[test]
    fn present_one_omits_internal_id() {
        let envelope = present_one(&africa(), Embed::Exclude, Metadata::new()).unwrap();
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "data": {
                    "uuid": "00000000-0000-0000-0000-000000000001",
                    "title": "Travel through Africa",
                    "description": "Notes from the road",
                },
                "metadata": {},
            })
        );
    }

    #[test]
    fn present_collection_of_nothing_is_empty_data() {
        let metadata = Metadata::new().with_total(0);
        let envelope =
            present_collection(&Vec::<Post>::new(), Embed::Include, metadata.clone()).unwrap();
        assert!(envelope.data.is_empty());
        assert_eq!(envelope.metadata, metadata);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "data": [], "metadata": { "total": 0 } })
        );
    }

    #[test]
    fn present_collection_fails_on_a_broken_entity() {
        let mut broken = africa();
        broken.title = None;
        let err = present_collection(&[africa(), broken], Embed::Exclude, Metadata::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Serialization {
                field: "title",
                ..
            }
        ));
    }

    #[test]
    fn embedded_media_keeps_order_and_drops_ids() {
        let mut post = africa();
        post.media = Some(vec![
            Media {
                id: Some(11),
                post_id: Some(7),
                uuid: Some(uuid(0xa)),
                source: Some("https://cdn.example.com/a.jpg".into()),
            },
            Media {
                id: Some(12),
                post_id: Some(7),
                uuid: Some(uuid(0xb)),
                source: Some("https://cdn.example.com/b.jpg".into()),
            },
        ]);
        let envelope = present_one(&post, Embed::Include, Metadata::new()).unwrap();
        let media = envelope.data.media.as_ref().unwrap();
        assert_eq!(media.len(), 2);
        assert_eq!(media[0].uuid, uuid(0xa));
        assert_eq!(media[1].uuid, uuid(0xb));

        let value = serde_json::to_value(&envelope).unwrap();
        for item in value["data"]["media"].as_array().unwrap() {
            assert!(item.get("id").is_none());
            assert!(item.get("post_id").is_none());
        }
    }

    #[test]
    fn error_envelope_shape() {
        let envelope = present_error(
            ErrorCode::InvalidInput,
            "Invalid attribute",
            "title must not be blank",
            StatusCode::BadRequest,
            Some("/data/attributes/title"),
        );
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "errors": [{
                    "code": "ERR-1001",
                    "title": "Invalid attribute",
                    "detail": "title must not be blank",
                    "status": "400",
                    "source": { "pointer": "/data/attributes/title" },
                }]
            })
        );
    }

    #[test]
    fn error_envelopes_aggregate_without_overwriting() {
        let title = present_error(
            ErrorCode::InvalidInput,
            "Invalid attribute",
            "title must not be blank",
            StatusCode::BadRequest,
            Some("/data/attributes/title"),
        );
        let description = present_error(
            ErrorCode::InvalidInput,
            "Invalid attribute",
            "description must not be blank",
            StatusCode::BadRequest,
            Some("/data/attributes/description"),
        );
        let mut envelope = title.clone().merge(description.clone());
        envelope.push(title.errors[0].clone());
        assert_eq!(
            envelope.errors,
            vec![
                title.errors[0].clone(),
                description.errors[0].clone(),
                title.errors[0].clone()
            ]
        );
    }

    #[rstest]
    #[case(StatusCode::Ok, "200")]
    #[case(StatusCode::Created, "201")]
    #[case(StatusCode::BadRequest, "400")]
    #[case(StatusCode::NotFound, "404")]
    fn status_is_a_decimal_string(#[case] status: StatusCode, #[case] expected: &str) {
        let envelope = present_error(ErrorCode::Unclassified, "t", "d", status, None);
        assert_eq!(envelope.errors[0].status, expected);
        assert_eq!(envelope.status(), status);
    }

    #[test]
    fn envelope_status_falls_back_to_internal_error() {
        let mut envelope = ErrorEnvelope::new();
        assert_eq!(envelope.status(), StatusCode::InternalServerError);
        envelope.push(ErrorDetail {
            code: "ERR-9".into(),
            title: "t".into(),
            detail: "d".into(),
            status: "teapot".into(),
            source: None,
        });
        assert_eq!(envelope.status(), StatusCode::InternalServerError);
    }

    fn arb_post() -> impl Strategy<Value = Post> {
        (any::<i64>(), any::<u128>(), ".*", ".*").prop_map(|(id, n, title, description)| Post {
            id: Some(id),
            uuid: Some(Uuid::from_u128(n)),
            title: Some(title),
            description: Some(description),
            media: Some(vec![]),
        })
    }

    proptest! {
        #[test]
        fn present_collection_preserves_order_and_length(
            posts in proptest::collection::vec(arb_post(), 0..16)
        ) {
            let envelope = present_collection(&posts, Embed::Include, Metadata::new()).unwrap();
            prop_assert_eq!(envelope.data.len(), posts.len());
            for (view, post) in envelope.data.iter().zip(&posts) {
                prop_assert_eq!(Some(view.uuid), post.uuid);
                prop_assert_eq!(Some(&view.title), post.title.as_ref());
            }
        }

        #[test]
        fn presented_posts_never_carry_an_id(post in arb_post()) {
            let value = serde_json::to_value(post.present(Embed::Include).unwrap()).unwrap();
            prop_assert!(value.get("id").is_none());
        }
    }
}
