//! In-memory post service and request helpers shared by the API tests.

use async_std::sync::RwLock;
use futures::future::BoxFuture;
use rest_envelope::routes::{app, Api, PostService};
use rest_envelope::{ApiConfig, Media, Post, ValidPost};
use serde_json::Value;
use std::sync::Arc;
use tide::http::{Method, Request, Response, Url};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MemoryPosts {
    posts: Arc<RwLock<Vec<Post>>>,
}

impl MemoryPosts {
    pub fn with(posts: Vec<Post>) -> Self {
        Self {
            posts: Arc::new(RwLock::new(posts)),
        }
    }
}

impl PostService for MemoryPosts {
    fn get_by_uuid(&self, uuid: Uuid) -> BoxFuture<'_, Option<Post>> {
        Box::pin(async move {
            self.posts
                .read()
                .await
                .iter()
                .find(|post| post.uuid == Some(uuid))
                .cloned()
        })
    }

    fn get_all(&self, search: Option<String>) -> BoxFuture<'_, Vec<Post>> {
        Box::pin(async move {
            self.posts
                .read()
                .await
                .iter()
                .filter(|post| match (&search, &post.title) {
                    (Some(term), Some(title)) => {
                        title.to_lowercase().contains(&term.to_lowercase())
                    }
                    (Some(_), None) => false,
                    (None, _) => true,
                })
                .cloned()
                .collect()
        })
    }

    fn create(&self, post: ValidPost) -> BoxFuture<'_, Post> {
        Box::pin(async move {
            let mut posts = self.posts.write().await;
            let post = Post {
                id: Some(posts.len() as i64 + 1),
                uuid: Some(Uuid::new_v4()),
                title: Some(post.title),
                description: Some(post.description),
                media: Some(vec![]),
            };
            posts.push(post.clone());
            post
        })
    }
}

pub fn uuid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// The post from the article: id 7, two media items.
pub fn africa() -> Post {
    Post {
        id: Some(7),
        uuid: Some(uuid(1)),
        title: Some("Travel through Africa".into()),
        description: Some("Notes from the road".into()),
        media: Some(vec![
            Media {
                id: Some(70),
                post_id: Some(7),
                uuid: Some(uuid(0x70)),
                source: Some("https://cdn.example.com/lion.jpg".into()),
            },
            Media {
                id: Some(71),
                post_id: Some(7),
                uuid: Some(uuid(0x71)),
                source: Some("https://cdn.example.com/dunes.jpg".into()),
            },
        ]),
    }
}

pub fn iceland() -> Post {
    Post {
        id: Some(8),
        uuid: Some(uuid(2)),
        title: Some("Iceland in winter".into()),
        description: Some("Short days".into()),
        media: Some(vec![]),
    }
}

pub fn server(posts: Vec<Post>, config: ApiConfig) -> tide::Server<Api<MemoryPosts>> {
    app(MemoryPosts::with(posts), config)
}

pub fn request(method: Method, path: &str) -> Request {
    Request::new(
        method,
        Url::parse("http://localhost").unwrap().join(path).unwrap(),
    )
}

pub async fn call<S: Clone + Send + Sync + 'static>(
    app: &tide::Server<S>,
    req: Request,
) -> (u16, Value, Response) {
    let mut res: Response = app.respond(req).await.unwrap();
    let status = u16::from(res.status());
    let body = res.body_string().await.unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).unwrap()
    };
    (status, value, res)
}
