//! Resource Operation Kernel (`spec.md` §4.F): the shared implementation of
//! every resource operation, composed by every client variant. Operates
//! against an already-resolved `(Gvr, namespaced)` pair and a plain
//! `kube::Client`; it knows nothing about kubeconfig contexts, in-cluster
//! validation, or bearer tokens.

mod facilities;
mod podops;

pub use facilities::{ApiResourceInfo, ClusterHealth, ComponentHealth, GetApiResourcesResponse, HealthStatus, NodeHealth};
pub use podops::{ExecResult, LogOptions, PortForwardSession, PortSpec};

use crate::error::{Error, Result};
use crate::gvr::Gvr;
use crate::metadata::{self, ScopeMetadata};
use k8s_openapi::api::core::v1::Event;
use kube::api::{
    Api, ApiResource, DeleteParams, DynamicObject, GroupVersionKind, ListParams, Patch, PatchParams, PostParams,
};
use kube::Client;

pub(crate) fn to_api_resource(gvr: &Gvr) -> ApiResource {
    let gvk = GroupVersionKind {
        group: gvr.group.clone(),
        version: gvr.version.clone(),
        kind: titlecase_singular(&gvr.resource),
    };
    ApiResource::from_gvk_with_plural(&gvk, &gvr.resource)
}

fn titlecase_singular(plural: &str) -> String {
    let singular = plural.strip_suffix('s').unwrap_or(plural);
    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[derive(Debug, Clone)]
pub struct ListResponse {
    pub items: Vec<DynamicObject>,
    pub continue_token: Option<String>,
    pub remaining_items_hint: Option<i64>,
    pub resource_version: String,
    pub total_items: usize,
    pub meta: ScopeMetadata,
}

#[derive(Debug, Clone)]
pub struct DescribeResponse {
    pub object: DynamicObject,
    pub events: Vec<Event>,
    pub meta: ScopeMetadata,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
    pub limit: Option<u32>,
    pub continue_token: Option<String>,
    pub all_namespaces: bool,
}

/// Shared implementation of every resource operation, composed by every
/// client variant alongside its Safety Gate and Resolver.
#[derive(Clone)]
pub struct Kernel {
    client: Client,
}

impl Kernel {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, gvr: &Gvr, namespaced: bool, namespace: &str) -> Api<DynamicObject> {
        let ar = to_api_resource(gvr);
        if namespaced && !namespace.is_empty() {
            Api::namespaced_with(self.client.clone(), namespace, &ar)
        } else {
            Api::all_with(self.client.clone(), &ar)
        }
    }

    fn effective_namespace(namespaced: bool, namespace: &str) -> &str {
        if namespaced {
            namespace
        } else {
            ""
        }
    }

    pub async fn get(
        &self,
        gvr: &Gvr,
        namespaced: bool,
        namespace: &str,
        resource_type: &str,
        name: &str,
    ) -> Result<(DynamicObject, ScopeMetadata)> {
        let api = self.api(gvr, namespaced, namespace);
        let object = api
            .get(name)
            .await
            .map_err(|e| Error::upstream(format!("get {resource_type}/{name}"), e))?;
        let effective = Self::effective_namespace(namespaced, namespace);
        let meta = metadata::build(namespaced, namespace, effective, resource_type, false);
        Ok((object, meta))
    }

    pub async fn list(
        &self,
        gvr: &Gvr,
        namespaced: bool,
        namespace: &str,
        resource_type: &str,
        opts: ListOptions,
    ) -> Result<ListResponse> {
        let scope_namespace = if opts.all_namespaces { "" } else { namespace };
        let api = if opts.all_namespaces {
            let ar = to_api_resource(gvr);
            Api::all_with(self.client.clone(), &ar)
        } else {
            self.api(gvr, namespaced, scope_namespace)
        };

        let mut lp = ListParams::default();
        if let Some(sel) = opts.label_selector {
            lp = lp.labels(&sel);
        }
        if let Some(sel) = opts.field_selector {
            lp = lp.fields(&sel);
        }
        if let Some(limit) = opts.limit {
            lp = lp.limit(limit);
        }
        if let Some(cont) = opts.continue_token {
            lp.continue_token = Some(cont);
        }

        let list = api
            .list(&lp)
            .await
            .map_err(|e| Error::upstream(format!("list {resource_type}"), e))?;

        let continue_token = list.metadata.continue_.clone();
        let remaining_items_hint = continue_token.as_ref().map(|_| -1);
        let resource_version = list.metadata.resource_version.clone().unwrap_or_default();
        let total_items = list.items.len();
        let effective = Self::effective_namespace(namespaced && !opts.all_namespaces, scope_namespace);
        let meta = metadata::build(namespaced, namespace, effective, resource_type, opts.all_namespaces);

        Ok(ListResponse {
            items: list.items,
            continue_token,
            remaining_items_hint,
            resource_version,
            total_items,
            meta,
        })
    }

    pub async fn describe(
        &self,
        gvr: &Gvr,
        namespaced: bool,
        namespace: &str,
        resource_type: &str,
        name: &str,
    ) -> Result<DescribeResponse> {
        let (object, meta) = self.get(gvr, namespaced, namespace, resource_type, name).await?;

        let events_api: Api<Event> = if namespaced && !namespace.is_empty() {
            Api::namespaced(self.client.clone(), namespace)
        } else {
            Api::all(self.client.clone())
        };
        let lp = ListParams::default().fields(&format!("involvedObject.name={name}"));
        let events = match events_api.list(&lp).await {
            Ok(list) => list.items,
            Err(error) => {
                tracing::warn!(%resource_type, %name, %error, "describe: event lookup failed, continuing without events");
                Vec::new()
            }
        };

        Ok(DescribeResponse { object, events, meta })
    }

    pub async fn create(
        &self,
        gvr: &Gvr,
        namespaced: bool,
        namespace: &str,
        resource_type: &str,
        mut payload: DynamicObject,
        dry_run: bool,
    ) -> Result<(DynamicObject, ScopeMetadata)> {
        if namespaced && !namespace.is_empty() {
            payload.metadata.namespace = Some(namespace.to_string());
        }
        let api = self.api(gvr, namespaced, namespace);
        let mut pp = PostParams::default();
        if dry_run {
            pp.dry_run = true;
        }
        let created = api
            .create(&pp, &payload)
            .await
            .map_err(|e| Error::upstream(format!("create {resource_type}"), e))?;
        let effective = Self::effective_namespace(namespaced, namespace);
        let meta = metadata::build(namespaced, namespace, effective, resource_type, false);
        Ok((created, meta))
    }

    pub async fn apply(
        &self,
        gvr: &Gvr,
        namespaced: bool,
        namespace: &str,
        resource_type: &str,
        mut payload: DynamicObject,
        dry_run: bool,
    ) -> Result<(DynamicObject, ScopeMetadata)> {
        if namespaced && !namespace.is_empty() {
            payload.metadata.namespace = Some(namespace.to_string());
        }
        let api = self.api(gvr, namespaced, namespace);
        let name = payload
            .metadata
            .name
            .clone()
            .ok_or_else(|| Error::UnknownResource(format!("{resource_type}: payload has no metadata.name")))?;

        match api.get(&name).await {
            Ok(existing) => {
                payload.metadata.resource_version = existing.metadata.resource_version.clone();
                let mut pp = PostParams::default();
                if dry_run {
                    pp.dry_run = true;
                }
                let updated = api
                    .replace(&name, &pp, &payload)
                    .await
                    .map_err(|e| Error::upstream(format!("apply {resource_type}/{name}"), e))?;
                let effective = Self::effective_namespace(namespaced, namespace);
                let meta = metadata::build(namespaced, namespace, effective, resource_type, false);
                Ok((updated, meta))
            }
            Err(_) => self.create(gvr, namespaced, namespace, resource_type, payload, dry_run).await,
        }
    }

    pub async fn delete(
        &self,
        gvr: &Gvr,
        namespaced: bool,
        namespace: &str,
        resource_type: &str,
        name: &str,
        dry_run: bool,
    ) -> Result<ScopeMetadata> {
        let api = self.api(gvr, namespaced, namespace);
        let mut dp = DeleteParams::default();
        if dry_run {
            dp.dry_run = true;
        }
        let _ = api
            .delete(name, &dp)
            .await
            .map_err(|e| Error::upstream(format!("delete {resource_type}/{name}"), e))?;
        let effective = Self::effective_namespace(namespaced, namespace);
        Ok(metadata::build(namespaced, namespace, effective, resource_type, false))
    }

    pub async fn patch(
        &self,
        gvr: &Gvr,
        namespaced: bool,
        namespace: &str,
        resource_type: &str,
        name: &str,
        patch: &serde_json::Value,
        dry_run: bool,
    ) -> Result<(DynamicObject, ScopeMetadata)> {
        let api = self.api(gvr, namespaced, namespace);
        let mut pp = PatchParams::default();
        if dry_run {
            pp.dry_run = true;
        }
        let patched = api
            .patch(name, &pp, &Patch::Merge(patch))
            .await
            .map_err(|e| Error::upstream(format!("patch {resource_type}/{name}"), e))?;
        let effective = Self::effective_namespace(namespaced, namespace);
        let meta = metadata::build(namespaced, namespace, effective, resource_type, false);
        Ok((patched, meta))
    }

    /// `spec.md` §4.F "scale": only scalable types are accepted.
    pub fn is_scalable(resource_type: &str) -> bool {
        const SCALABLE: &[&str] = &[
            "deployments", "deployment", "deploy", "replicasets", "replicaset", "rs", "statefulsets",
            "statefulset", "sts",
        ];
        SCALABLE.contains(&resource_type.to_lowercase().as_str())
    }

    pub async fn scale(
        &self,
        gvr: &Gvr,
        namespaced: bool,
        namespace: &str,
        resource_type: &str,
        name: &str,
        replicas: i32,
        dry_run: bool,
    ) -> Result<ScopeMetadata> {
        if !Self::is_scalable(resource_type) {
            return Err(Error::NotScalable(resource_type.to_string()));
        }
        let api = self.api(gvr, namespaced, namespace);
        let mut pp = PatchParams::default();
        if dry_run {
            pp.dry_run = true;
        }
        let payload = serde_json::json!({ "spec": { "replicas": replicas } });
        api.patch_scale(name, &pp, &Patch::Merge(&payload))
            .await
            .map_err(|e| Error::upstream(format!("scale {resource_type}/{name}"), e))?;
        let effective = Self::effective_namespace(namespaced, namespace);
        Ok(metadata::build(namespaced, namespace, effective, resource_type, false))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_resource_kind_is_best_effort_titlecase_singular() {
        let gvr = Gvr::new("apps", "v1", "deployments");
        let ar = to_api_resource(&gvr);
        assert_eq!(ar.kind, "Deployment");
        assert_eq!(ar.plural, "deployments");
        assert_eq!(ar.group, "apps");
    }

    #[test]
    fn scalable_types_match_aliases() {
        assert!(Kernel::is_scalable("deploy"));
        assert!(Kernel::is_scalable("STS"));
        assert!(!Kernel::is_scalable("pods"));
    }
}
