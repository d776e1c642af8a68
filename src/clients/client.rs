//! The one shared implementation of the uniform resource/pod/cluster
//! operation surface (`spec.md` §4.H), generic over a
//! [`ConnectionProvider`]. Every call: Safety Gate, then Resolver, then
//! Kernel — `spec.md` §2's control-flow line in code.

use super::context::ContextInfo;
use super::provider::ConnectionProvider;
use crate::error::Result;
use crate::kernel::{
    ClusterHealth, DescribeResponse, ExecResult, GetApiResourcesResponse, ListOptions, ListResponse, LogOptions,
    PortForwardSession, PortSpec,
};
use crate::metadata::ScopeMetadata;
use crate::safety::{Operation, SafetyGate};
use kube::api::DynamicObject;
use tokio::io::AsyncRead;

/// A client variant: `kubeConfig multi-context`, `in-cluster`,
/// `bearer-token`, or `federated`, parameterised by how it is that variant.
pub struct ClusterClient<P> {
    provider: P,
    safety: SafetyGate,
}

impl<P: ConnectionProvider> ClusterClient<P> {
    pub(crate) fn new(provider: P, safety: SafetyGate) -> Self {
        Self { provider, safety }
    }

    pub fn list_contexts(&self) -> Vec<ContextInfo> {
        self.provider.list_contexts()
    }

    pub fn current_context(&self) -> String {
        self.provider.current_context()
    }

    pub fn switch_context(&self, kube_context: &str) -> Result<()> {
        self.provider.switch_context(kube_context)
    }

    async fn resolve(
        &self,
        kube_context: &str,
        resource_type: &str,
        api_group_hint: &str,
    ) -> Result<(crate::kernel::Kernel, crate::gvr::Gvr, bool)> {
        let connection = self.provider.connection(kube_context).await?;
        let (gvr, namespaced) = connection.resolver().await?.resolve(resource_type, api_group_hint).await?;
        let kernel = connection.kernel().await?;
        Ok((kernel, gvr, namespaced))
    }

    pub async fn get(
        &self,
        kube_context: &str,
        resource_type: &str,
        api_group_hint: &str,
        namespace: &str,
        name: &str,
    ) -> Result<(DynamicObject, ScopeMetadata)> {
        self.safety.check_operation(Operation::Get)?;
        if !namespace.is_empty() {
            self.safety.check_namespace(namespace)?;
        }
        let (kernel, gvr, namespaced) = self.resolve(kube_context, resource_type, api_group_hint).await?;
        kernel.get(&gvr, namespaced, namespace, resource_type, name).await
    }

    pub async fn list(
        &self,
        kube_context: &str,
        resource_type: &str,
        api_group_hint: &str,
        namespace: &str,
        opts: ListOptions,
    ) -> Result<ListResponse> {
        self.safety.check_operation(Operation::List)?;
        if !namespace.is_empty() && !opts.all_namespaces {
            self.safety.check_namespace(namespace)?;
        }
        let (kernel, gvr, namespaced) = self.resolve(kube_context, resource_type, api_group_hint).await?;
        kernel.list(&gvr, namespaced, namespace, resource_type, opts).await
    }

    pub async fn describe(
        &self,
        kube_context: &str,
        resource_type: &str,
        api_group_hint: &str,
        namespace: &str,
        name: &str,
    ) -> Result<DescribeResponse> {
        self.safety.check_operation(Operation::Describe)?;
        if !namespace.is_empty() {
            self.safety.check_namespace(namespace)?;
        }
        let (kernel, gvr, namespaced) = self.resolve(kube_context, resource_type, api_group_hint).await?;
        kernel.describe(&gvr, namespaced, namespace, resource_type, name).await
    }

    pub async fn create(
        &self,
        kube_context: &str,
        resource_type: &str,
        api_group_hint: &str,
        namespace: &str,
        payload: DynamicObject,
        dry_run: bool,
    ) -> Result<(DynamicObject, ScopeMetadata)> {
        self.safety.check_operation(Operation::Create)?;
        if !namespace.is_empty() {
            self.safety.check_namespace(namespace)?;
        }
        let dry_run = dry_run || self.safety.dry_run();
        let (kernel, gvr, namespaced) = self.resolve(kube_context, resource_type, api_group_hint).await?;
        kernel.create(&gvr, namespaced, namespace, resource_type, payload, dry_run).await
    }

    pub async fn apply(
        &self,
        kube_context: &str,
        resource_type: &str,
        api_group_hint: &str,
        namespace: &str,
        payload: DynamicObject,
        dry_run: bool,
    ) -> Result<(DynamicObject, ScopeMetadata)> {
        self.safety.check_operation(Operation::Apply)?;
        if !namespace.is_empty() {
            self.safety.check_namespace(namespace)?;
        }
        let dry_run = dry_run || self.safety.dry_run();
        let (kernel, gvr, namespaced) = self.resolve(kube_context, resource_type, api_group_hint).await?;
        kernel.apply(&gvr, namespaced, namespace, resource_type, payload, dry_run).await
    }

    pub async fn delete(
        &self,
        kube_context: &str,
        resource_type: &str,
        api_group_hint: &str,
        namespace: &str,
        name: &str,
        dry_run: bool,
    ) -> Result<ScopeMetadata> {
        self.safety.check_operation(Operation::Delete)?;
        if !namespace.is_empty() {
            self.safety.check_namespace(namespace)?;
        }
        let dry_run = dry_run || self.safety.dry_run();
        let (kernel, gvr, namespaced) = self.resolve(kube_context, resource_type, api_group_hint).await?;
        kernel.delete(&gvr, namespaced, namespace, resource_type, name, dry_run).await
    }

    pub async fn patch(
        &self,
        kube_context: &str,
        resource_type: &str,
        api_group_hint: &str,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
        dry_run: bool,
    ) -> Result<(DynamicObject, ScopeMetadata)> {
        self.safety.check_operation(Operation::Patch)?;
        if !namespace.is_empty() {
            self.safety.check_namespace(namespace)?;
        }
        let dry_run = dry_run || self.safety.dry_run();
        let (kernel, gvr, namespaced) = self.resolve(kube_context, resource_type, api_group_hint).await?;
        kernel.patch(&gvr, namespaced, namespace, resource_type, name, patch, dry_run).await
    }

    pub async fn scale(
        &self,
        kube_context: &str,
        resource_type: &str,
        api_group_hint: &str,
        namespace: &str,
        name: &str,
        replicas: i32,
        dry_run: bool,
    ) -> Result<ScopeMetadata> {
        self.safety.check_operation(Operation::Scale)?;
        if !namespace.is_empty() {
            self.safety.check_namespace(namespace)?;
        }
        let dry_run = dry_run || self.safety.dry_run();
        let (kernel, gvr, namespaced) = self.resolve(kube_context, resource_type, api_group_hint).await?;
        kernel.scale(&gvr, namespaced, namespace, resource_type, name, replicas, dry_run).await
    }

    pub async fn get_logs(
        &self,
        kube_context: &str,
        namespace: &str,
        pod: &str,
        opts: LogOptions,
    ) -> Result<impl AsyncRead + Unpin> {
        self.safety.check_operation(Operation::GetLogs)?;
        self.safety.check_namespace(namespace)?;
        let connection = self.provider.connection(kube_context).await?;
        connection.kernel().await?.get_logs(namespace, pod, opts).await
    }

    pub async fn exec(
        &self,
        kube_context: &str,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        command: Vec<String>,
        tty: bool,
        stdin: Option<impl AsyncRead + Unpin + Send + 'static>,
    ) -> Result<ExecResult> {
        self.safety.check_operation(Operation::Exec)?;
        self.safety.check_namespace(namespace)?;
        let connection = self.provider.connection(kube_context).await?;
        connection.kernel().await?.exec(namespace, pod, container, command, tty, stdin).await
    }

    pub async fn port_forward_to_pod(
        &self,
        kube_context: &str,
        namespace: &str,
        pod: &str,
        ports: &[PortSpec],
    ) -> Result<PortForwardSession> {
        self.safety.check_operation(Operation::PortForward)?;
        self.safety.check_namespace(namespace)?;
        let connection = self.provider.connection(kube_context).await?;
        connection.kernel().await?.port_forward_to_pod(namespace, pod, ports).await
    }

    pub async fn port_forward_to_service(
        &self,
        kube_context: &str,
        namespace: &str,
        service_name: &str,
        ports: &[PortSpec],
    ) -> Result<PortForwardSession> {
        self.safety.check_operation(Operation::PortForward)?;
        self.safety.check_namespace(namespace)?;
        let connection = self.provider.connection(kube_context).await?;
        connection
            .kernel()
            .await?
            .port_forward_to_service(namespace, service_name, ports)
            .await
    }

    pub async fn get_api_resources(
        &self,
        kube_context: &str,
        api_group: Option<&str>,
        namespaced_only: bool,
        required_verbs: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<GetApiResourcesResponse> {
        self.safety.check_operation(Operation::GetAPIResources)?;
        let connection = self.provider.connection(kube_context).await?;
        connection
            .kernel()
            .await?
            .get_api_resources(api_group, namespaced_only, required_verbs, limit, offset)
            .await
    }

    pub async fn get_cluster_health(&self, kube_context: &str) -> Result<ClusterHealth> {
        self.safety.check_operation(Operation::GetClusterHealth)?;
        let connection = self.provider.connection(kube_context).await?;
        connection.kernel().await?.get_cluster_health().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::connection::Connection;
    use crate::error::Error;
    use async_trait::async_trait;
    use kube::api::ApiResource;
    use std::sync::Arc;

    /// A provider whose `connection` always fails, so tests can assert the
    /// Safety Gate rejects a call before the Resolver/Kernel are ever reached.
    struct UnreachableProvider;

    #[async_trait]
    impl ConnectionProvider for UnreachableProvider {
        async fn connection(&self, _kube_context: &str) -> Result<Arc<Connection>> {
            panic!("safety gate should have rejected this call before touching the provider");
        }

        fn list_contexts(&self) -> Vec<ContextInfo> {
            vec![]
        }

        fn current_context(&self) -> String {
            String::new()
        }

        fn switch_context(&self, _kube_context: &str) -> Result<()> {
            Ok(())
        }
    }

    fn client_with(safety: SafetyGate) -> ClusterClient<UnreachableProvider> {
        ClusterClient::new(UnreachableProvider, safety)
    }

    #[tokio::test]
    async fn disallowed_operation_is_rejected_before_resolving() {
        let safety = SafetyGate::new(vec!["get".into()], false, false, vec![]);
        let client = client_with(safety);
        let err = client.list("", "pods", "", "default", ListOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::OperationForbidden(_)));
    }

    #[tokio::test]
    async fn restricted_namespace_is_rejected_before_resolving() {
        let safety = SafetyGate::new(vec![], false, false, vec!["kube-system".into()]);
        let client = client_with(safety);
        let err = client.get("", "pods", "", "kube-system", "coredns").await.unwrap_err();
        assert!(matches!(err, Error::NamespaceRestricted(_)));
    }

    #[tokio::test]
    async fn destructive_op_without_dry_run_is_rejected() {
        let safety = SafetyGate::new(vec![], true, false, vec![]);
        let client = client_with(safety);
        let resource = ApiResource {
            group: String::new(),
            version: "v1".into(),
            api_version: "v1".into(),
            kind: "Pod".into(),
            plural: "pods".into(),
        };
        let payload = DynamicObject::new("x", &resource);
        let err = client.create("", "pods", "", "default", payload, false).await.unwrap_err();
        assert!(matches!(err, Error::OperationForbidden(_)));
    }
}
