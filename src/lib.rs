//! Multi-tenant Kubernetes-style cluster client adapter.
//!
//! Exposes a single uniform resource-operation surface over three
//! interchangeable client variants (kubeconfig multi-context, in-cluster
//! service account, per-request bearer token) plus a federated wrapper, all
//! composing the same Safety Gate, Resource-Type Resolver and Resource
//! Operation Kernel.

pub mod cache;
pub mod config;
pub mod error;
pub mod gvr;
pub mod hash;
pub mod kernel;
pub mod lazy;
pub mod metadata;
pub mod resolver;
pub mod resource_table;
pub mod safety;

pub mod clients;

pub use config::Config;
pub use error::{Error, Result};
pub use gvr::Gvr;
