// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::error::{ApiError, InvalidAttributeSnafu, MalformedBodySnafu, SerializationSnafu};
use crate::present::{Embed, Identified, Present};
use fmt::{Display, Formatter};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

// Entities arrive from the lookup service possibly partially loaded, so every column is optional
// here and checked when the entity is presented.

/// A blog post, as loaded by the lookup service.
///
/// `id` is the storage surrogate key and is never exposed. Presenting a post embeds its media
/// unless [Embed::Exclude] is asked for; see [Post::DEFAULT_EMBED].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Post {
    pub id: Option<i64>,
    pub uuid: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// `None` when the relation was not loaded.
    pub media: Option<Vec<Media>>,
}

impl Post {
    /// Media is embedded unless the request excludes it.
    pub const DEFAULT_EMBED: Embed = Embed::Include;
}

/// A media item owned by exactly one [Post].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Media {
    pub id: Option<i64>,
    pub post_id: Option<i64>,
    pub uuid: Option<Uuid>,
    /// URI of the media file.
    pub source: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub uuid: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<MediaView>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaView {
    pub uuid: Uuid,
    pub source: String,
}

fn required<'a, T>(
    value: &'a Option<T>,
    entity: &'static str,
    field: &'static str,
) -> Result<&'a T, ApiError> {
    value
        .as_ref()
        .ok_or_else(|| SerializationSnafu { entity, field }.build())
}

impl Present for Media {
    type View = MediaView;

    fn present(&self, _embed: Embed) -> Result<MediaView, ApiError> {
        Ok(MediaView {
            uuid: *required(&self.uuid, "media", "uuid")?,
            source: required(&self.source, "media", "source")?.clone(),
        })
    }
}

impl Present for Post {
    type View = PostView;

    fn present(&self, embed: Embed) -> Result<PostView, ApiError> {
        let media = match embed {
            Embed::Include => Some(
                required(&self.media, "post", "media")?
                    .iter()
                    .map(|media| media.present(embed))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Embed::Exclude => None,
        };
        Ok(PostView {
            uuid: *required(&self.uuid, "post", "uuid")?,
            title: required(&self.title, "post", "title")?.clone(),
            description: required(&self.description, "post", "description")?.clone(),
            media,
        })
    }
}

impl Identified for PostView {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl Identified for MediaView {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl Display for PostView {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt_as_json(self, f)
    }
}

/// Request body wrapper: `{ "data": { "attributes": { ... } } }`.
///
/// Error pointers such as `/data/attributes/title` address fields inside this document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document<T> {
    pub data: Resource<T>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource<T> {
    pub attributes: T,
}

impl<T> Document<T> {
    pub fn new(attributes: T) -> Self {
        Self {
            data: Resource { attributes },
        }
    }

    pub fn into_attributes(self) -> T {
        self.data.attributes
    }
}

impl<T: DeserializeOwned> Document<T> {
    /// Decode the attributes of a request document.
    ///
    /// A missing `data` or `attributes` object is reported against `/data` or `/data/attributes`.
    /// When the attributes themselves fail to decode, each attribute is decoded on its own to find
    /// the one at fault, which only works if every attribute of `T` is optional.
    pub fn attributes_from_value(body: Value) -> Result<T, ApiError> {
        let data = body
            .get("data")
            .filter(|data| data.is_object())
            .ok_or_else(|| {
                MalformedBodySnafu {
                    pointer: "/data",
                    message: "expected a data object",
                }
                .build()
            })?;
        let attributes = data
            .get("attributes")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                MalformedBodySnafu {
                    pointer: "/data/attributes",
                    message: "expected an attributes object",
                }
                .build()
            })?;
        serde_json::from_value(Value::Object(attributes.clone())).map_err(|err| {
            let culprit = attributes.iter().find(|(name, value)| {
                let mut single = Map::new();
                single.insert(name.to_string(), (*value).clone());
                serde_json::from_value::<T>(Value::Object(single)).is_err()
            });
            match culprit {
                Some((name, _)) => InvalidAttributeSnafu {
                    attribute: name.as_str(),
                    message: format!("{}: {}", name, err),
                }
                .build(),
                None => MalformedBodySnafu {
                    pointer: "/data/attributes",
                    message: err.to_string(),
                }
                .build(),
            }
        })
    }
}

/// Request attributes for the POST /posts endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A [NewPost] that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidPost {
    pub title: String,
    pub description: String,
}

fn non_blank(value: &Option<String>, attribute: &str) -> Result<String, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        Some(_) => InvalidAttributeSnafu {
            attribute,
            message: format!("{} must not be blank", attribute),
        }
        .fail(),
        None => InvalidAttributeSnafu {
            attribute,
            message: format!("{} is required", attribute),
        }
        .fail(),
    }
}

impl NewPost {
    /// Check every attribute, reporting all failures at once.
    pub fn validate(&self) -> Result<ValidPost, ApiError> {
        let title = non_blank(&self.title, "title");
        let description = non_blank(&self.description, "description");
        match (title, description) {
            (Ok(title), Ok(description)) => Ok(ValidPost { title, description }),
            (Err(title), Err(description)) => Err(ApiError::Aggregate {
                errors: vec![title, description],
            }),
            (Err(err), _) | (_, Err(err)) => Err(err),
        }
    }
}

// Display implementation for types which serialize to JSON. Displays as a valid JSON object.
pub fn fmt_as_json<T: Serialize>(v: &T, f: &mut Formatter<'_>) -> fmt::Result {
    let string = serde_json::to_string(v).map_err(|_| fmt::Error)?;
    write!(f, "{}", string)
}
