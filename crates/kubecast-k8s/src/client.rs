//! Kubernetes-backed log source provider

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::{ListParams, LogParams};
use tracing::debug;

use kubecast_types::{LogTarget, TailOptions};

use crate::provider::{LogByteStream, LogSourceProvider};

/// Log source provider backed by the cluster API.
pub struct KubeProvider {
    client: kube::Client,
}

impl KubeProvider {
    /// Create a provider from the ambient kubeconfig.
    pub async fn new() -> Result<Self> {
        let client = kube::Client::try_default()
            .await
            .context("Failed to create Kubernetes client. Is kubectl configured?")?;

        Ok(Self { client })
    }

    /// Create a provider from an existing client.
    pub fn with_client(client: kube::Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl LogSourceProvider for KubeProvider {
    async fn open(&self, target: &LogTarget, tail: &TailOptions) -> Result<LogByteStream> {
        let params = LogParams {
            follow: tail.follow,
            container: Some(target.container.clone()),
            tail_lines: tail.tail_lines,
            ..Default::default()
        };

        let stream = self
            .pods(&target.namespace)
            .log_stream(&target.pod, &params)
            .await
            .context(format!("Failed to open log stream for {}", target))?;

        Ok(Box::pin(stream))
    }

    async fn resolve(
        &self,
        namespace: &str,
        image_selectors: &[String],
    ) -> Result<Vec<LogTarget>> {
        let list = self
            .pods(namespace)
            .list(&ListParams::default())
            .await
            .context(format!("Failed to list pods in {}", namespace))?;

        let targets = targets_from_pods(list.items, namespace, image_selectors);
        debug!(namespace, count = targets.len(), "resolved log targets");
        Ok(targets)
    }
}

/// Collect the (pod, container) pairs whose image matches any selector.
fn targets_from_pods(
    pods: Vec<Pod>,
    namespace: &str,
    image_selectors: &[String],
) -> Vec<LogTarget> {
    let mut targets = Vec::new();

    for pod in pods {
        let Some(pod_name) = pod.metadata.name else {
            continue;
        };

        // Only running pods have a stream worth opening.
        let running = pod.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Running");
        if !running {
            continue;
        }

        let Some(spec) = pod.spec else {
            continue;
        };

        for container in &spec.containers {
            let Some(image) = &container.image else {
                continue;
            };
            if image_selectors.iter().any(|sel| image_matches(image, sel)) {
                targets.push(LogTarget::new(
                    namespace.to_string(),
                    pod_name.clone(),
                    container.name.clone(),
                ));
            }
        }
    }

    targets
}

/// Match a container image against a selector: exact, or on the repository
/// part with the tag stripped. A ':' inside the registry host (a port) is
/// followed by '/', a tag separator is not.
fn image_matches(image: &str, selector: &str) -> bool {
    if image == selector {
        return true;
    }
    match image.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => repository == selector,
        _ => false,
    }
}
