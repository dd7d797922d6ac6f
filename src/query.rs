// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::error::{ApiError, InvalidParameterSnafu};
use crate::present::Embed;
use serde::Deserialize;

/// Query parameters understood by the posts API (`?search=&include=&exclude=`).
///
/// `include` and `exclude` take comma-separated relation names. `search` is passed through to the
/// lookup service untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RelationQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default)]
    pub exclude: Option<String>,
}

fn names(list: &Option<String>) -> impl Iterator<Item = &str> {
    list.as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

impl RelationQuery {
    /// Resolve the embedding policy for `relation`.
    ///
    /// An explicit exclusion wins over an inclusion of the same relation. When neither mentions
    /// it, `default` applies.
    pub fn embed(&self, relation: &str, default: Embed) -> Embed {
        if names(&self.exclude).any(|name| name == relation) {
            Embed::Exclude
        } else if names(&self.include).any(|name| name == relation) {
            Embed::Include
        } else {
            default
        }
    }

    /// Reject relation names the endpoint doesn't know about.
    pub fn validate(&self, known: &[&str]) -> Result<(), ApiError> {
        let params = [("include", &self.include), ("exclude", &self.exclude)];
        let errors = params
            .iter()
            .flat_map(|(param, list)| {
                names(list)
                    .filter(|name| !known.contains(name))
                    .map(move |name| {
                        InvalidParameterSnafu {
                            parameter: *param,
                            message: format!("unknown relation {}", name),
                        }
                        .build()
                    })
            })
            .collect();
        match ApiError::aggregate(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The search term, if one was given and is not blank.
    pub fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}
