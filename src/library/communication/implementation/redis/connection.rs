use futures::FutureExt;
use redis::aio::ConnectionLike;
use redis::{Cmd, Pipeline, RedisFuture, Value};
use tracing::trace;

/// Type-erased redis connection which optionally traces all commands sent over it
pub struct RedisConnection {
    con: Box<dyn ConnectionLike + Send + Sync>,
    logging_enabled: bool,
}

impl RedisConnection {
    /// Wraps an established connection
    pub fn new<C>(con: C) -> Self
    where
        C: ConnectionLike + Send + Sync + 'static,
    {
        Self {
            con: Box::new(con),
            logging_enabled: false,
        }
    }

    /// Enables or disables `trace` level logging of commands and replies
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    fn log_cmd(&self, cmd: &Cmd) {
        let packed = cmd.get_packed_command();
        trace!(command = %String::from_utf8_lossy(&packed).escape_debug(), "Redis SEND");
    }

    fn log_pipeline(&self, pipeline: &Pipeline) {
        let packed = pipeline.get_packed_pipeline();
        trace!(pipeline = %String::from_utf8_lossy(&packed).escape_debug(), "Redis SEND");
    }
}

impl ConnectionLike for RedisConnection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        (async move {
            if self.logging_enabled {
                self.log_cmd(cmd);
            }

            let result = self.con.req_packed_command(cmd).await;

            if self.logging_enabled {
                match result {
                    Ok(ref value) => trace!(?value, "Redis RECV"),
                    Err(ref error) => trace!(?error, "Redis RECV failed"),
                }
            }

            result
        })
        .boxed()
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        (async move {
            if self.logging_enabled {
                self.log_pipeline(cmd);
            }

            let result = self.con.req_packed_commands(cmd, offset, count).await;

            if self.logging_enabled {
                match &result {
                    Ok(ref values) => {
                        for value in values {
                            trace!(?value, "Redis RECV");
                        }
                    }
                    Err(ref error) => {
                        trace!(?error, "Redis RECV failed");
                    }
                }
            }

            result
        })
        .boxed()
    }

    fn get_db(&self) -> i64 {
        self.con.get_db()
    }
}
