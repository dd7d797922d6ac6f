// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Net library.

// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Reference routes for the posts API.
//!
//! Entity lookup is delegated to a [PostService]; the handlers here only resolve the request,
//! present what the service returns, and hand errors to [add_error_body] for rendering.

use crate::config::ApiConfig;
use crate::envelope::{present_collection, present_one, Metadata};
use crate::error::{
    server_error, ApiError, InvalidParameterSnafu, NotFoundSnafu, SerializationSnafu,
};
use crate::present::Relations;
use crate::query::RelationQuery;
use crate::server::{add_error_body, request_body, response, response_with_status, trace};
use crate::types::{Document, NewPost, Post, ValidPost};
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use tide::{Request, StatusCode};
use tracing::{event, Level};
use uuid::Uuid;

const COLLECTION: &str = "posts";
const MEDIA: &str = "media";

/// The entity lookup collaborator.
///
/// Implementations own persistence; they return fully loaded entities (including the `media`
/// relation) or `None` when nothing matches.
pub trait PostService: Clone + Send + Sync + 'static {
    fn get_by_uuid(&self, uuid: Uuid) -> BoxFuture<'_, Option<Post>>;
    /// All posts, optionally filtered by a search term, in the order they should be listed.
    fn get_all(&self, search: Option<String>) -> BoxFuture<'_, Vec<Post>>;
    fn create(&self, post: ValidPost) -> BoxFuture<'_, Post>;
}

/// Server state for the posts API.
#[derive(Clone)]
pub struct Api<S> {
    pub service: S,
    pub config: Arc<ApiConfig>,
}

impl<S> Api<S> {
    fn relations(&self) -> Relations {
        self.config.relations(COLLECTION, Some(MEDIA))
    }
}

/// Build a server exposing `/posts`, `/posts/:uuid` and `/posts/:uuid/media`.
pub fn app<S: PostService>(service: S, config: ApiConfig) -> tide::Server<Api<S>> {
    let mut app = tide::with_state(Api {
        service,
        config: Arc::new(config),
    });
    app.with(add_error_body::<Api<S>, ApiError>);
    app.with(trace::<Api<S>>);
    app.at("/posts").get(list_posts::<S>).post(create_post::<S>);
    app.at("/posts/:uuid").get(show_post::<S>);
    app.at("/posts/:uuid/media").get(list_media::<S>);
    app
}

fn api_error(error: impl Into<ApiError>) -> tide::Error {
    server_error::<ApiError>(error)
}

fn path_uuid<S>(req: &Request<S>) -> tide::Result<Uuid> {
    let raw = req.param("uuid")?;
    Uuid::parse_str(raw).map_err(|err| {
        api_error(
            InvalidParameterSnafu {
                parameter: "uuid",
                message: format!("{} is not a valid UUID: {}", raw, err),
            }
            .build(),
        )
    })
}

fn relation_query<S>(req: &Request<S>, known: &[&str]) -> tide::Result<RelationQuery> {
    let query: RelationQuery = req.query()?;
    query.validate(known).map_err(api_error)?;
    Ok(query)
}

async fn find_post<S: PostService>(service: &S, uuid: Uuid) -> tide::Result<Post> {
    service.get_by_uuid(uuid).await.ok_or_else(|| {
        api_error(
            NotFoundSnafu {
                resource: "post",
                uuid: uuid.to_string(),
            }
            .build(),
        )
    })
}

async fn list_posts<S: PostService>(req: Request<Api<S>>) -> tide::Result {
    let query = relation_query(&req, &[MEDIA])?;
    let service = req.state().service.clone();
    let posts = service.get_all(query.search().map(String::from)).await;
    event!(Level::DEBUG, "listing {} posts", posts.len());

    let metadata = Metadata::new().with_total(posts.len());
    let envelope = present_collection(&posts, query.embed(MEDIA, Post::DEFAULT_EMBED), metadata)
        .map_err(api_error)?;
    if req.state().config.links {
        response(&req, envelope.link_each(&req.state().relations()))
    } else {
        response(&req, envelope)
    }
}

async fn show_post<S: PostService>(req: Request<Api<S>>) -> tide::Result {
    let uuid = path_uuid(&req)?;
    let query = relation_query(&req, &[MEDIA])?;
    let service = req.state().service.clone();
    let post = find_post(&service, uuid).await?;

    let envelope = present_one(&post, query.embed(MEDIA, Post::DEFAULT_EMBED), Metadata::new())
        .map_err(api_error)?;
    if req.state().config.links {
        response(&req, envelope.link(&req.state().relations()))
    } else {
        response(&req, envelope)
    }
}

async fn list_media<S: PostService>(req: Request<Api<S>>) -> tide::Result {
    let uuid = path_uuid(&req)?;
    // Media has no relations of its own.
    relation_query(&req, &[])?;
    let service = req.state().service.clone();
    let post = find_post(&service, uuid).await?;

    let media = post.media.as_ref().ok_or_else(|| {
        api_error(
            SerializationSnafu {
                entity: "post",
                field: MEDIA,
            }
            .build(),
        )
    })?;
    let metadata = Metadata::new().with_total(media.len());
    let envelope =
        present_collection(media, Post::DEFAULT_EMBED, metadata).map_err(api_error)?;
    response(&req, envelope)
}

async fn create_post<S: PostService>(mut req: Request<Api<S>>) -> tide::Result {
    let body: Value = request_body(&mut req).await?;
    let query = relation_query(&req, &[MEDIA])?;
    let valid = Document::<NewPost>::attributes_from_value(body)
        .and_then(|post| post.validate())
        .map_err(api_error)?;
    let service = req.state().service.clone();
    let post = service.create(valid).await;

    let envelope = present_one(&post, query.embed(MEDIA, Post::DEFAULT_EMBED), Metadata::new())
        .map_err(api_error)?;
    let relations = req.state().relations();
    let location = relations
        .resolve(&envelope.data.uuid)
        .remove("self")
        .unwrap_or_default();
    event!(Level::INFO, "created post {}", location);

    let mut res = if req.state().config.links {
        response_with_status(&req, StatusCode::Created, envelope.link(&relations))?
    } else {
        response_with_status(&req, StatusCode::Created, envelope)?
    };
    res.insert_header("Location", location);
    Ok(res)
}
