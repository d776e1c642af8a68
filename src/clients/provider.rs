//! Connection-provider abstraction (REDESIGN FLAG "Variant polymorphism",
//! `spec.md` §10): rather than re-deriving the full resource/pod/cluster
//! operation surface per client variant, every variant is just a small
//! implementation of this trait, and [`super::client::ClusterClient`]
//! carries the one shared implementation of that surface.

use super::connection::Connection;
use crate::clients::context::ContextInfo;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Resolves `kube_context` (empty string means "current") to the
    /// connection object bundle to use for one call.
    async fn connection(&self, kube_context: &str) -> Result<Arc<Connection>>;

    fn list_contexts(&self) -> Vec<ContextInfo>;

    fn current_context(&self) -> String;

    fn switch_context(&self, kube_context: &str) -> Result<()>;
}
