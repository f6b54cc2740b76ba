use redis::aio::{Connection, MultiplexedConnection};
use redis::Client;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{instrument, trace, warn};

const RETRY_INTERVAL: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(4);

/// Establishes a standalone connection, retrying until the server is reachable
#[instrument(skip(client))]
pub(super) async fn connect_owned(client: &Client) -> Connection {
    connect_with_retry(|| client.get_async_connection()).await
}

/// Establishes a multiplexed connection, retrying until the server is reachable
#[instrument(skip(client))]
pub(super) async fn connect_multiplexed(client: &Client) -> MultiplexedConnection {
    connect_with_retry(|| client.get_multiplexed_tokio_connection()).await
}

async fn connect_with_retry<C, F, Fut>(connect: F) -> C
where
    F: Fn() -> Fut,
    Fut: Future<Output = redis::RedisResult<C>>,
{
    let mut attempt = 0;

    loop {
        trace!(attempt, "Connecting to redis");

        match timeout(REQUEST_TIMEOUT, connect()).await {
            Ok(Ok(connection)) => return connection,
            Ok(Err(error)) => warn!(?error, "Failed to connect to redis"),
            Err(error) => warn!(?error, "Timeout connecting to redis"),
        }

        sleep(RETRY_INTERVAL).await;
        attempt += 1;
    }
}
