use serde::Serialize;
use std::error::Error;

/// Messages of an error and all its sources, outermost first
///
/// Used to hand failures to remote parties (e.g. in an HTTP response body) which can not know
/// the concrete error types but should still see why a request failed.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorChain {
    causes: Vec<String>,
}

impl ErrorChain {
    /// Collects the messages of `error` and its source chain
    pub fn new(error: &(dyn Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = Some(error);

        while let Some(error) = source {
            causes.push(error.to_string());
            source = error.source();
        }

        Self { causes }
    }

    /// Messages of the error chain, outermost first
    pub fn causes(&self) -> &[String] {
        &self.causes
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("connection refused")]
    struct Refused;

    #[derive(Error, Debug)]
    #[error("publish failed")]
    struct PublishFailed(#[source] Refused);

    #[test]
    fn collect_sources_outermost_first() {
        let chain = ErrorChain::new(&PublishFailed(Refused));

        assert_eq!(chain.causes(), ["publish failed", "connection refused"]);
    }

    #[test]
    fn serialize_as_list_of_causes() {
        let json = serde_json::to_string(&ErrorChain::new(&Refused)).unwrap();

        assert_eq!(json, r#"{"causes":["connection refused"]}"#);
    }
}
