// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::present::Relations;
use serde::{Deserialize, Serialize};

/// Presentation settings for an API.
///
/// Deserializable so that it can be embedded as a table in the host application's own
/// configuration file. Every field has a default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Prefix for every generated link, e.g. `/api/v1`.
    pub base_path: String,
    /// Attach `_links` to every presented entity.
    pub links: bool,
}

impl ApiConfig {
    /// Link templates for `collection`, prefixed by [ApiConfig::base_path].
    pub fn relations(&self, collection: &str, sub_resource: Option<&str>) -> Relations {
        let relations = Relations::resource(collection);
        let relations = match sub_resource {
            Some(name) => relations.sub_resource(name),
            None => relations,
        };
        relations.with_base(&self.base_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default() {
        let config: ApiConfig = serde_json::from_str(r#"{"links":true}"#).unwrap();
        assert_eq!(
            config,
            ApiConfig {
                base_path: String::new(),
                links: true,
            }
        );
    }

    #[test]
    fn relations_use_the_base_path() {
        let config = ApiConfig {
            base_path: "/api".into(),
            links: true,
        };
        let relations = config.relations("posts", Some("media"));
        assert_eq!(relations.template("self"), Some("/api/posts/{uuid}"));
        assert_eq!(relations.template("posts"), Some("/api/posts"));
    }
}
