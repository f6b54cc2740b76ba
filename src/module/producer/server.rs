use super::publisher::{Publisher, SendError};
use crate::domain::UserIdentifier;
use crate::library::communication::event::NotificationPublisher;
use crate::library::communication::ErrorChain;
use crate::library::EmptyResult;
use async_trait::async_trait;
use jatsl::{Job, JobManager};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

const MAX_FORM_SIZE: u64 = 16 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    from_id: String,
    to_id: String,
    #[serde(default)]
    message: String,
}

fn reply(status: StatusCode, body: serde_json::Value) -> Response {
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn handle_send<P>(
    publisher: Arc<Publisher<P>>,
    request: SendRequest,
) -> Result<Response, Infallible>
where
    P: NotificationPublisher + Send + Sync,
{
    let ids = (
        request.from_id.trim().parse::<UserIdentifier>(),
        request.to_id.trim().parse::<UserIdentifier>(),
    );

    let (from, to) = match ids {
        (Ok(from), Ok(to)) => (from, to),
        _ => {
            return Ok(reply(
                StatusCode::BAD_REQUEST,
                json!({ "message": "User ids must be integers" }),
            ))
        }
    };

    let response = match publisher.send(from, to, request.message).await {
        Ok(_) => reply(
            StatusCode::OK,
            json!({ "message": "Notification sent successfully!" }),
        ),
        Err(SendError::UserNotFound(_)) => reply(
            StatusCode::NOT_FOUND,
            json!({ "message": "User not found" }),
        ),
        Err(e) => {
            warn!(error = %e, "Unable to send notification");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": ErrorChain::new(&e) }),
            )
        }
    };

    Ok(response)
}

/// `POST /send` accepting the form fields `fromId`, `toId`, and `message`
pub fn routes<P>(
    publisher: Arc<Publisher<P>>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone
where
    P: NotificationPublisher + Send + Sync + 'static,
{
    warp::post()
        .and(warp::path("send"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_FORM_SIZE))
        .and(warp::body::form())
        .and_then(move |request: SendRequest| handle_send(publisher.clone(), request))
        .with(warp::trace::named("send"))
}

/// Job serving the send endpoint of a [`Publisher`]
pub struct ServerJob<P> {
    port: u16,
    publisher: Arc<Publisher<P>>,
}

impl<P> ServerJob<P> {
    /// Creates a new instance from raw parts
    pub fn new(port: u16, publisher: Publisher<P>) -> Self {
        Self {
            port,
            publisher: Arc::new(publisher),
        }
    }
}

#[async_trait]
impl<P> Job for ServerJob<P>
where
    P: NotificationPublisher + Send + Sync + 'static,
{
    const NAME: &'static str = module_path!();
    const SUPPORTS_GRACEFUL_TERMINATION: bool = true;

    async fn execute(&self, manager: JobManager) -> EmptyResult {
        let routes = routes(self.publisher.clone()).with(warp::trace::request());

        let source_addr: SocketAddr = ([0, 0, 0, 0], self.port).into();
        let (addr, server) = warp::serve(routes)
            .bind_with_graceful_shutdown(source_addr, manager.termination_signal());

        info!(?addr, "Accepting notifications");
        manager.ready().await;
        server.await;

        Ok(())
    }
}
