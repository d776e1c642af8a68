//! Pod subresource operations: logs, exec, and port-forward
//! (`spec.md` §4.F `getLogs`/`exec`/`portForwardToPod`/`portForwardToService`).

use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::{Api, AttachParams, ListParams, LogParams};
use std::collections::BTreeMap;
use tokio::io::{self, AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::compat::FuturesAsyncReadCompatExt;
use tokio_util::sync::CancellationToken;

use super::Kernel;

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub follow: bool,
    pub previous: bool,
    pub timestamps: bool,
    pub since_time: Option<String>,
    pub since_seconds: Option<i64>,
    pub tail_lines: Option<i64>,
    pub container: Option<String>,
}

/// Result of a completed exec session (`spec.md` §4.F "exec").
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub exit_code: i32,
    pub captured_stdout: Option<Vec<u8>>,
    pub captured_stderr: Option<Vec<u8>>,
}

/// `"N"` (local==remote) or `"L:R"` (`spec.md` §4.F "portForwardToPod").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    pub local: u16,
    pub remote: u16,
}

impl PortSpec {
    pub fn parse(spec: &str) -> Result<Self> {
        match spec.split_once(':') {
            Some((l, r)) => {
                let local = l
                    .parse()
                    .map_err(|_| Error::UnknownResource(format!("invalid port spec: {spec}")))?;
                let remote = r
                    .parse()
                    .map_err(|_| Error::UnknownResource(format!("invalid port spec: {spec}")))?;
                Ok(PortSpec { local, remote })
            }
            None => {
                let port = spec
                    .parse()
                    .map_err(|_| Error::UnknownResource(format!("invalid port spec: {spec}")))?;
                Ok(PortSpec { local: port, remote: port })
            }
        }
    }
}

/// A live port-forward session (`spec.md` §3 "session handle"). Cancel
/// `stop` to tear down every forwarding loop; `ready` resolves once every
/// local listener is bound, or carries the bind error.
pub struct PortForwardSession {
    pub local_ports: Vec<u16>,
    pub remote_ports: Vec<u16>,
    pub stop: CancellationToken,
    pub ready: oneshot::Receiver<std::result::Result<(), String>>,
    pub task: JoinHandle<()>,
}

/// Parses `LogOptions::since_time` (RFC3339, `spec.md` §4.F "sinceTime")
/// into the `chrono::DateTime<Utc>` that `LogParams` expects.
fn parse_since_time(since_time: Option<&str>, pod: &str) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    since_time
        .map(|t| {
            chrono::DateTime::parse_from_rfc3339(t)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(|e| Error::UnknownResource(format!("invalid sinceTime '{t}' for getLogs pods/{pod}: {e}")))
        })
        .transpose()
}

impl Kernel {
    pub async fn get_logs(&self, namespace: &str, pod: &str, opts: LogOptions) -> Result<impl AsyncRead + Unpin> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let since_time = parse_since_time(opts.since_time.as_deref(), pod)?;
        let lp = LogParams {
            follow: opts.follow,
            previous: opts.previous,
            timestamps: opts.timestamps,
            since_seconds: opts.since_seconds,
            since_time,
            tail_lines: opts.tail_lines,
            container: opts.container,
            ..Default::default()
        };
        let reader = api
            .log_stream(pod, &lp)
            .await
            .map_err(|e| Error::upstream(format!("getLogs pods/{pod}"), e))?;
        Ok(reader.compat())
    }

    /// Opens a bidirectional exec channel; pipes `stdin` (if given) to the
    /// remote process and copies remote stdout/stderr into the returned
    /// captures. Resolves once the remote side closes.
    pub async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        command: Vec<String>,
        tty: bool,
        mut stdin: Option<impl AsyncRead + Unpin + Send + 'static>,
    ) -> Result<ExecResult> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut ap = if tty {
            AttachParams::interactive_tty()
        } else {
            AttachParams::default().stdout(true).stderr(true)
        };
        if let Some(c) = container {
            ap = ap.container(c);
        }

        let mut attached = api
            .exec(pod, command, &ap)
            .await
            .map_err(|e| Error::upstream(format!("exec pods/{pod}"), e))?;

        let mut stdin_task: Option<JoinHandle<()>> = None;
        if let (Some(mut reader), Some(mut writer)) = (stdin.take(), attached.stdin()) {
            stdin_task = Some(tokio::spawn(async move {
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            }));
        }

        let mut stdout_buf = Vec::new();
        let stdout_task = attached
            .stdout()
            .map(|mut reader| tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = tokio::io::copy(&mut reader, &mut buf).await;
                buf
            }));
        let mut stderr_buf = Vec::new();
        let stderr_task = attached
            .stderr()
            .map(|mut reader| tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = tokio::io::copy(&mut reader, &mut buf).await;
                buf
            }));

        let status = attached.take_status();
        let join_result = attached.join().await;
        if let Some(t) = stdin_task {
            t.abort();
        }
        if let Some(t) = stdout_task {
            stdout_buf = t.await.unwrap_or_default();
        }
        if let Some(t) = stderr_task {
            stderr_buf = t.await.unwrap_or_default();
        }
        if let Err(error) = join_result {
            return Err(Error::SessionTerminated(error.to_string()));
        }

        let exit_code = match status {
            Some(fut) => fut.await.map(|s| extract_exit_code(&s)).unwrap_or(0),
            None => 0,
        };

        Ok(ExecResult {
            exit_code,
            captured_stdout: Some(stdout_buf),
            captured_stderr: Some(stderr_buf),
        })
    }

    pub async fn port_forward_to_pod(&self, namespace: &str, pod: &str, ports: &[PortSpec]) -> Result<PortForwardSession> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let current = api
            .get(pod)
            .await
            .map_err(|e| Error::upstream(format!("portForwardToPod pods/{pod}"), e))?;
        let phase = current.status.as_ref().and_then(|s| s.phase.clone()).unwrap_or_default();
        if phase != "Running" {
            return Err(Error::SessionTerminated(format!(
                "pod '{pod}' is not Running (phase: {phase})"
            )));
        }

        let remote_ports: Vec<u16> = ports.iter().map(|p| p.remote).collect();
        let local_ports: Vec<u16> = ports.iter().map(|p| p.local).collect();
        let mut pf = api
            .portforward(pod, &remote_ports)
            .await
            .map_err(|e| Error::upstream(format!("portForwardToPod pods/{pod}"), e))?;

        let stop = CancellationToken::new();
        let (ready_tx, ready_rx) = oneshot::channel();

        let mut forwards = Vec::new();
        for spec in ports {
            match TcpListener::bind(("127.0.0.1", spec.local)).await {
                Ok(listener) => {
                    let stream = pf
                        .take_stream(spec.remote)
                        .ok_or_else(|| Error::SessionTerminated(format!("no stream for remote port {}", spec.remote)))?;
                    forwards.push((listener, stream));
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(format!("failed to bind local port {}: {e}", spec.local)));
                    return Ok(PortForwardSession {
                        local_ports,
                        remote_ports,
                        stop,
                        ready: ready_rx,
                        task: tokio::spawn(async {}),
                    });
                }
            }
        }
        let _ = ready_tx.send(Ok(()));

        let task_stop = stop.clone();
        let task = tokio::spawn(async move {
            let port_tasks: Vec<JoinHandle<()>> = forwards
                .into_iter()
                .map(|(listener, stream)| tokio::spawn(forward_port(listener, stream, task_stop.clone())))
                .collect();
            task_stop.cancelled().await;
            for t in port_tasks {
                t.abort();
            }
        });

        Ok(PortForwardSession {
            local_ports,
            remote_ports,
            stop,
            ready: ready_rx,
            task,
        })
    }

    pub async fn port_forward_to_service(&self, namespace: &str, service_name: &str, ports: &[PortSpec]) -> Result<PortForwardSession> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let service = services
            .get(service_name)
            .await
            .map_err(|e| Error::upstream(format!("portForwardToService services/{service_name}"), e))?;
        let selector: BTreeMap<String, String> = service
            .spec
            .and_then(|s| s.selector)
            .ok_or_else(|| Error::SessionTerminated(format!("service '{service_name}' has no selector")))?;

        let label_selector = selector
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let lp = ListParams::default().labels(&label_selector);
        let list = pods
            .list(&lp)
            .await
            .map_err(|e| Error::upstream(format!("portForwardToService services/{service_name}"), e))?;
        let running = list
            .items
            .into_iter()
            .find(|p| p.status.as_ref().and_then(|s| s.phase.clone()).as_deref() == Some("Running"))
            .ok_or_else(|| Error::SessionTerminated(format!("no Running pod backs service '{service_name}'")))?;
        let pod_name = running
            .metadata
            .name
            .ok_or_else(|| Error::SessionTerminated("matched pod has no name".to_string()))?;

        self.port_forward_to_pod(namespace, &pod_name, ports).await
    }
}

/// Accepts a single local connection and relays it against `remote` (one of
/// `Portforwarder`'s per-port duplex streams, which is itself single-use)
/// until either side closes or `stop` fires.
async fn forward_port(listener: TcpListener, mut remote: impl AsyncRead + AsyncWrite + Unpin, stop: CancellationToken) {
    let accepted = tokio::select! {
        _ = stop.cancelled() => return,
        accepted = listener.accept() => accepted,
    };
    let Ok((mut local, _addr)) = accepted else { return };
    tokio::select! {
        _ = stop.cancelled() => {}
        _ = io::copy_bidirectional(&mut local, &mut remote) => {}
    }
}

fn extract_exit_code(status: &k8s_openapi::apimachinery::pkg::apis::meta::v1::Status) -> i32 {
    status
        .details
        .as_ref()
        .and_then(|d| d.causes.as_ref())
        .and_then(|causes| causes.iter().find(|c| c.reason.as_deref() == Some("ExitCode")))
        .and_then(|c| c.message.as_ref())
        .and_then(|m| m.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_spec_parses_single_and_pair() {
        assert_eq!(PortSpec::parse("8080").unwrap(), PortSpec { local: 8080, remote: 8080 });
        assert_eq!(PortSpec::parse("8080:80").unwrap(), PortSpec { local: 8080, remote: 80 });
        assert!(PortSpec::parse("not-a-port").is_err());
    }

    #[test]
    fn since_time_none_parses_to_none() {
        assert_eq!(parse_since_time(None, "web-0").unwrap(), None);
    }

    #[test]
    fn since_time_parses_valid_rfc3339() {
        let parsed = parse_since_time(Some("2026-01-15T08:30:00Z"), "web-0").unwrap().unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-01-15T08:30:00+00:00");
    }

    #[test]
    fn since_time_rejects_malformed_timestamp() {
        assert!(matches!(parse_since_time(Some("not-a-timestamp"), "web-0"), Err(Error::UnknownResource(_))));
    }
}
