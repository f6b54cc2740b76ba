use super::query::QueryService;
use crate::domain::UserIdentifier;
use crate::library::EmptyResult;
use async_trait::async_trait;
use jatsl::{Job, JobManager};
use serde_json::json;
use std::net::SocketAddr;
use tracing::info;
use warp::{Filter, Rejection, Reply};

fn reply_inbox(query: &QueryService, user: String) -> impl Reply {
    // Ids which can not belong to any user have an empty inbox just like unknown ones
    let result = user
        .parse::<UserIdentifier>()
        .ok()
        .map(|user| query.query(user));

    if let Some(result) = result.filter(|result| result.found) {
        warp::reply::json(&result)
    } else {
        warp::reply::json(&json!({
            "found": false,
            "message": "No notifications found",
            "notifications": [],
        }))
    }
}

/// `GET /notifications/<userId>` replying with the inbox of the user
pub fn routes(query: QueryService) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::get()
        .and(warp::path!("notifications" / String))
        .map(move |user: String| reply_inbox(&query, user))
        .with(warp::trace::named("notifications"))
}

/// Job serving the query endpoint
pub struct ServerJob {
    port: u16,
    query: QueryService,
}

impl ServerJob {
    /// Creates a new instance from raw parts
    pub fn new(port: u16, query: QueryService) -> Self {
        Self { port, query }
    }
}

#[async_trait]
impl Job for ServerJob {
    const NAME: &'static str = module_path!();
    const SUPPORTS_GRACEFUL_TERMINATION: bool = true;

    async fn execute(&self, manager: JobManager) -> EmptyResult {
        let routes = routes(self.query.clone()).with(warp::trace::request());

        let source_addr: SocketAddr = ([0, 0, 0, 0], self.port).into();
        let (addr, server) = warp::serve(routes)
            .bind_with_graceful_shutdown(source_addr, manager.termination_signal());

        info!(?addr, "Serving notification queries");
        manager.ready().await;
        server.await;

        Ok(())
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::domain::{NotificationEnvelope, User};
    use crate::module::consumer::store::NotificationStore;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::sync::Arc;
    use warp::http::StatusCode;

    async fn get(store: &Arc<NotificationStore>, path: &str) -> (StatusCode, Value) {
        let response = warp::test::request()
            .method("GET")
            .path(path)
            .reply(&routes(QueryService::new(store.clone())))
            .await;

        let body = serde_json::from_slice(response.body()).unwrap_or(Value::Null);
        (response.status(), body)
    }

    #[tokio::test]
    async fn list_notifications_of_known_users() {
        let store = Arc::new(NotificationStore::default());
        store.record(
            2,
            NotificationEnvelope::new(User::new(1, "Emma"), User::new(2, "Bruno"), "hi".into()),
        );

        let (status, body) = get(&store, "/notifications/2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "found": true,
                "notifications": [{
                    "from": { "id": 1, "name": "Emma" },
                    "to": { "id": 2, "name": "Bruno" },
                    "message": "hi"
                }]
            })
        );
    }

    #[tokio::test]
    async fn succeed_for_unknown_users() {
        let store = Arc::new(NotificationStore::default());
        let (status, body) = get(&store, "/notifications/5").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "found": false, "message": "No notifications found", "notifications": [] })
        );
    }

    #[tokio::test]
    async fn treat_malformed_ids_as_unknown_users() {
        let store = Arc::new(NotificationStore::default());

        for path in [
            "/notifications/bruno",
            "/notifications/-1",
            "/notifications/99999999999999999999",
        ] {
            let (status, body) = get(&store, path).await;

            assert_eq!(status, StatusCode::OK, "{}", path);
            assert_eq!(
                body,
                json!({ "found": false, "message": "No notifications found", "notifications": [] })
            );
        }
    }

    #[tokio::test]
    async fn reject_other_paths() {
        let store = Arc::new(NotificationStore::default());
        let (status, _) = get(&store, "/notifications").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
