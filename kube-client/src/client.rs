use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use playground_tracker::{
    DocumentClient, RemoteError, RemoteErrorKind, TrackerDocument, TrackerError,
};
use reqwest::{Certificate, Identity, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::configmap::ConfigMap;
use crate::kubeconfig::{Auth, ClusterConnection, Kubeconfig};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Kubernetes `Status` body returned with API errors.
#[derive(Debug, Default, Deserialize)]
struct Status {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// [`DocumentClient`] backed by a ConfigMap on the cluster's API server.
#[derive(Debug, Clone)]
pub struct KubeConfigMapClient {
    http: reqwest::Client,
    server: Url,
    auth: Auth,
}

impl KubeConfigMapClient {
    /// Build a client from a kubeconfig file. `path` defaults to
    /// `$KUBECONFIG` / `~/.kube/config`, `context` to the current context.
    pub fn from_kubeconfig(path: Option<&Path>, context: Option<&str>) -> Result<Self, TrackerError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Kubeconfig::default_path().map_err(init_error)?,
        };
        tracing::debug!("Loading kubeconfig from {}", path.display());

        let connection = Kubeconfig::load(&path)
            .and_then(|config| config.resolve(context))
            .map_err(init_error)?;
        Self::new(connection)
    }

    pub fn new(connection: ClusterConnection) -> Result<Self, TrackerError> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("playground/", env!("CARGO_PKG_VERSION")));

        if let Some(ca_pem) = &connection.ca_pem {
            let ca = Certificate::from_pem(ca_pem).map_err(init_error)?;
            builder = builder.add_root_certificate(ca);
        }
        if connection.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Auth::ClientCertificate { cert_pem, key_pem } = &connection.auth {
            let mut pem = cert_pem.clone();
            pem.push(b'\n');
            pem.extend_from_slice(key_pem);
            builder = builder.identity(Identity::from_pem(&pem).map_err(init_error)?);
        }

        let http = builder.build().map_err(init_error)?;
        let mut server = connection.server;
        if !server.path().ends_with('/') {
            let path = format!("{}/", server.path());
            server.set_path(&path);
        }
        Ok(Self {
            http,
            server,
            auth: connection.auth,
        })
    }

    fn collection_url(&self, namespace: &str) -> Result<Url, RemoteError> {
        self.server
            .join(&format!("api/v1/namespaces/{namespace}/configmaps"))
            .map_err(|e| RemoteError::permanent(format!("invalid request URL: {e}")))
    }

    fn object_url(&self, namespace: &str, name: &str) -> Result<Url, RemoteError> {
        self.server
            .join(&format!("api/v1/namespaces/{namespace}/configmaps/{name}"))
            .map_err(|e| RemoteError::permanent(format!("invalid request URL: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::None | Auth::ClientCertificate { .. } => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        self.authorize(request)
            .send()
            .await
            .map_err(classify_transport)
    }
}

#[async_trait]
impl DocumentClient for KubeConfigMapClient {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<TrackerDocument>, RemoteError> {
        let url = self.object_url(namespace, name)?;
        let response = self.send(self.http.get(url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let cm = decode(response).await?;
        Ok(Some(cm.into()))
    }

    async fn create(&self, document: &TrackerDocument) -> Result<TrackerDocument, RemoteError> {
        let url = self.collection_url(&document.namespace)?;
        let mut body = ConfigMap::from(document);
        body.metadata.resource_version = None;

        let response = self.send(self.http.post(url).json(&body)).await?;
        Ok(decode(response).await?.into())
    }

    async fn update(&self, document: &TrackerDocument) -> Result<TrackerDocument, RemoteError> {
        if document.resource_version.is_none() {
            return Err(RemoteError::permanent(
                "refusing unconditional update without a resourceVersion",
            ));
        }
        let url = self.object_url(&document.namespace, &document.name)?;
        let body = ConfigMap::from(document);

        let response = self.send(self.http.put(url).json(&body)).await?;
        Ok(decode(response).await?.into())
    }
}

/// Map an API server status code to a failure kind.
pub fn classify_status(status: StatusCode) -> RemoteErrorKind {
    match status.as_u16() {
        404 => RemoteErrorKind::NotFound,
        409 => RemoteErrorKind::Conflict,
        400 | 401 | 403 | 405 | 422 => RemoteErrorKind::Permanent,
        408 | 429 | 500 | 502 | 503 | 504 => RemoteErrorKind::Transient,
        _ => RemoteErrorKind::Other,
    }
}

async fn decode(response: Response) -> Result<ConfigMap, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_from_response(status, response).await);
    }
    response
        .json::<ConfigMap>()
        .await
        .map_err(|e| RemoteError::new(RemoteErrorKind::Other, format!("invalid ConfigMap: {e}")))
}

async fn error_from_response(status: StatusCode, response: Response) -> RemoteError {
    let body = response.text().await.unwrap_or_default();
    let parsed: Status = serde_json::from_str(&body).unwrap_or_default();

    let message = match (parsed.reason, parsed.message) {
        (Some(reason), Some(message)) => format!("{reason}: {message}"),
        (None, Some(message)) => message,
        (Some(reason), None) => reason,
        (None, None) if body.trim().is_empty() => status.to_string(),
        (None, None) => format!("{status}: {}", body.trim()),
    };
    RemoteError::new(classify_status(status), message)
}

fn classify_transport(err: reqwest::Error) -> RemoteError {
    let kind = if err.is_timeout() || err.is_connect() {
        RemoteErrorKind::Transient
    } else {
        RemoteErrorKind::Other
    };
    RemoteError::new(kind, err.to_string())
}

fn init_error(err: impl std::fmt::Display) -> TrackerError {
    TrackerError::Initialization(err.to_string())
}
