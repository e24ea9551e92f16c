//! async-graphql adapter
//!
//! Inspects the raw query before it is parsed and annotates the response
//! once the whole request has run. The client identity is read from request
//! data, so callers attach a [`ClientIdentity`] with `Request::data`.

use async_graphql::extensions::{
    Extension, ExtensionContext, ExtensionFactory, NextParseQuery, NextRequest,
};
use async_graphql::parser::types::ExecutableDocument;
use async_graphql::{Response, ServerResult, Variables};
use std::sync::{Arc, Mutex};

use super::{ClientIdentity, GuardedRequest, QueryGuard};

/// Installs the guard on a schema
pub struct GuardExtension {
    guard: Arc<QueryGuard>,
    production: bool,
}

impl GuardExtension {
    pub fn new(guard: Arc<QueryGuard>, production: bool) -> Self {
        Self { guard, production }
    }
}

impl ExtensionFactory for GuardExtension {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(GuardRequestExtension {
            guard: self.guard.clone(),
            production: self.production,
            admitted: Mutex::new(None),
        })
    }
}

// One instance per request
struct GuardRequestExtension {
    guard: Arc<QueryGuard>,
    production: bool,
    admitted: Mutex<Option<GuardedRequest>>,
}

#[async_trait::async_trait]
impl Extension for GuardRequestExtension {
    async fn request(&self, ctx: &ExtensionContext<'_>, next: NextRequest<'_>) -> Response {
        let mut response = next.run(ctx).await;

        let admitted = self.admitted.lock().ok().and_then(|mut slot| slot.take());
        if let Some(request) = admitted {
            if let Some(error) = self.guard.close(request) {
                response.errors.push(error.to_server_error());
            }
        }

        response
    }

    async fn parse_query(
        &self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
        next: NextParseQuery<'_>,
    ) -> ServerResult<ExecutableDocument> {
        let client = ctx
            .data_opt::<ClientIdentity>()
            .cloned()
            .unwrap_or_else(ClientIdentity::unknown);

        let request = self
            .guard
            .admit(query, &client, self.production)
            .await
            .map_err(|e| e.to_server_error())?;

        if let Ok(mut slot) = self.admitted.lock() {
            *slot = Some(request);
        }

        next.run(ctx, query, variables).await
    }
}
