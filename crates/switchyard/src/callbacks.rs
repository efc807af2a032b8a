//! Before and after hooks run around every execution.
//!
//! Hooks are registered on a [`ClientBuilder`](crate::ClientBuilder) and
//! fixed once the client is built. They run in registration order; the
//! first failure stops the pipeline and surfaces as
//! [`Error::Callback`](crate::Error::Callback).

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use switchyard_net::{Context, GraphQLError, GraphQLResponse, Variables};

use crate::error::{Error, HookError, Result};

/// Called with `(document, operation_name, variables, context)` before the
/// adapter runs. The context is the merged per-call context; changes made
/// here are what the adapter sends.
pub type BeforeExecuteHook = Arc<
    dyn Fn(&str, &str, &Variables, &mut Context) -> std::result::Result<(), HookError>
        + Send
        + Sync,
>;

/// Called with `(data, errors, extensions)` after the adapter answered.
pub type AfterExecuteHook = Arc<
    dyn Fn(Option<&Value>, &[GraphQLError], &Map<String, Value>) -> std::result::Result<(), HookError>
        + Send
        + Sync,
>;

/// Ordered hook lists of one client type.
#[derive(Clone, Default)]
pub struct CallbackPipeline {
    before: Vec<BeforeExecuteHook>,
    after: Vec<AfterExecuteHook>,
}

impl CallbackPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a before-hook.
    pub fn before_execute<F>(&mut self, hook: F)
    where
        F: Fn(&str, &str, &Variables, &mut Context) -> std::result::Result<(), HookError>
            + Send
            + Sync
            + 'static,
    {
        self.before.push(Arc::new(hook));
    }

    /// Append an after-hook.
    pub fn after_execute<F>(&mut self, hook: F)
    where
        F: Fn(Option<&Value>, &[GraphQLError], &Map<String, Value>) -> std::result::Result<(), HookError>
            + Send
            + Sync
            + 'static,
    {
        self.after.push(Arc::new(hook));
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    pub(crate) fn run_before(
        &self,
        document: &str,
        operation_name: &str,
        variables: &Variables,
        context: &mut Context,
    ) -> Result<()> {
        for hook in &self.before {
            hook(document, operation_name, variables, context).map_err(Error::Callback)?;
        }
        Ok(())
    }

    pub(crate) fn run_after(&self, response: &GraphQLResponse) -> Result<()> {
        for hook in &self.after {
            hook(response.data.as_ref(), &response.errors, &response.extensions)
                .map_err(Error::Callback)?;
        }
        Ok(())
    }
}

impl fmt::Debug for CallbackPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackPipeline")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}
