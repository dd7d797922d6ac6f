// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Whether a related collection is embedded in the owning entity's view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Embed {
    Include,
    Exclude,
}

impl Default for Embed {
    fn default() -> Self {
        Embed::Include
    }
}

/// Domain entities with a client-facing view.
///
/// The view is a separate type containing only exposable fields, so internal fields such as
/// surrogate keys cannot leak no matter where the view is built.
pub trait Present {
    type View: Serialize;

    /// Build the public view of this entity.
    ///
    /// Fails with [ApiError::Serialization] if a field the view requires was never loaded.
    /// Entities without relations ignore `embed`.
    fn present(&self, embed: Embed) -> Result<Self::View, ApiError>;
}

/// Views addressed by a UUID, which is what link templates are resolved against.
pub trait Identified {
    fn uuid(&self) -> Uuid;
}

/// Relation name to resolved URI.
pub type LinkSet = BTreeMap<String, String>;

/// Link templates for one resource type.
///
/// Templates may contain a `{uuid}` placeholder. The relations supported are the resource itself
/// (`self`), its collection, and one sub-resource:
///
/// ```ignore
/// let relations = Relations::resource("posts").sub_resource("media");
/// // self  -> /posts/{uuid}
/// // media -> /posts/{uuid}/media
/// // posts -> /posts
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relations {
    templates: Vec<(String, String)>,
}

impl Relations {
    pub fn resource(collection: &str) -> Self {
        Self {
            templates: vec![
                ("self".into(), format!("/{}/{{uuid}}", collection)),
                (collection.into(), format!("/{}", collection)),
            ],
        }
    }

    pub fn sub_resource(mut self, name: &str) -> Self {
        let owner = self
            .template("self")
            .unwrap_or("/{uuid}")
            .trim_end_matches('/')
            .to_string();
        self.templates
            .push((name.into(), format!("{}/{}", owner, name)));
        self
    }

    /// Prefix every template with `base`, e.g. `/api/v1`. An empty base is a no-op.
    pub fn with_base(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        if !base.is_empty() {
            for (_, template) in &mut self.templates {
                *template = format!("{}{}", base, template);
            }
        }
        self
    }

    pub fn template(&self, rel: &str) -> Option<&str> {
        self.templates
            .iter()
            .find(|(name, _)| name == rel)
            .map(|(_, template)| template.as_str())
    }

    /// Resolve every template against `uuid`.
    pub fn resolve(&self, uuid: &Uuid) -> LinkSet {
        let uuid = uuid.to_string();
        self.templates
            .iter()
            .map(|(rel, template)| (rel.clone(), template.replace("{uuid}", &uuid)))
            .collect()
    }
}

/// A view with hypermedia links attached under `_links`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Linked<V> {
    #[serde(flatten)]
    pub view: V,
    #[serde(rename = "_links")]
    pub links: LinkSet,
}

/// Attach resolved links to a view. Pure; no I/O.
pub fn present_links<V: Identified>(view: V, relations: &Relations) -> Linked<V> {
    let links = relations.resolve(&view.uuid());
    Linked { view, links }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PostView;
    use serde_json::json;

    fn view() -> PostView {
        PostView {
            uuid: Uuid::from_u128(1),
            title: "Travel through Africa".into(),
            description: "Notes from the road".into(),
            media: None,
        }
    }

    #[test]
    fn default_is_include() {
        assert_eq!(Embed::default(), Embed::Include);
    }

    #[test]
    fn posts_links() {
        let relations = Relations::resource("posts").sub_resource("media");
        let linked = present_links(view(), &relations);
        assert_eq!(
            linked.links["self"],
            "/posts/00000000-0000-0000-0000-000000000001"
        );
        assert_eq!(
            linked.links["media"],
            "/posts/00000000-0000-0000-0000-000000000001/media"
        );
        assert_eq!(linked.links["posts"], "/posts");
        assert_eq!(linked.links.len(), 3);
    }

    #[test]
    fn links_serialize_next_to_the_view_fields() {
        let relations = Relations::resource("posts");
        let value = serde_json::to_value(present_links(view(), &relations)).unwrap();
        assert_eq!(
            value,
            json!({
                "uuid": "00000000-0000-0000-0000-000000000001",
                "title": "Travel through Africa",
                "description": "Notes from the road",
                "_links": {
                    "self": "/posts/00000000-0000-0000-0000-000000000001",
                    "posts": "/posts",
                },
            })
        );
    }

    #[test]
    fn base_path_prefixes_every_link() {
        let relations = Relations::resource("posts")
            .sub_resource("media")
            .with_base("/api/v1/");
        let links = relations.resolve(&Uuid::from_u128(2));
        assert!(links.values().all(|link| link.starts_with("/api/v1/posts")));
        assert_eq!(
            relations.template("media"),
            Some("/api/v1/posts/{uuid}/media")
        );
        assert_eq!(Relations::resource("posts").with_base(""), Relations::resource("posts"));
    }
}
