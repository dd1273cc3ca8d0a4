//! Minimal kubeconfig reader.
//!
//! Resolves a context to the API server URL, CA bundle and credentials.
//! Supported credentials: bearer token (inline or `tokenFile`), client
//! certificate and key (inline data or file paths), and basic auth.
//! Exec and auth-provider plugins are not supported; such users resolve to
//! [`Auth::None`].

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum KubeconfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse kubeconfig: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("could not determine kubeconfig location (set KUBECONFIG or pass --kubeconfig)")]
    NoDefaultPath,

    #[error("no context selected and kubeconfig has no current-context")]
    NoContext,

    #[error("context '{0}' not found in kubeconfig")]
    MissingContext(String),

    #[error("cluster '{0}' not found in kubeconfig")]
    MissingCluster(String),

    #[error("user '{0}' not found in kubeconfig")]
    MissingUser(String),

    #[error("invalid base64 in {field}: {source}")]
    Base64 {
        field: &'static str,
        source: base64::DecodeError,
    },

    #[error("invalid server URL '{0}'")]
    InvalidServer(String),

    #[error("user '{user}' sets a client {present} without a client {missing}")]
    IncompleteClientIdentity {
        user: String,
        present: &'static str,
        missing: &'static str,
    },
}

/// Parsed kubeconfig file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Kubeconfig {
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
    #[serde(default)]
    pub current_context: Option<String>,
    /// Directory relative file references are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterEntry,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterEntry {
    pub server: String,
    #[serde(default)]
    pub certificate_authority: Option<PathBuf>,
    #[serde(default)]
    pub certificate_authority_data: Option<String>,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextEntry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextEntry {
    pub cluster: String,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedUser {
    pub name: String,
    #[serde(default)]
    pub user: UserEntry,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserEntry {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "tokenFile")]
    pub token_file: Option<PathBuf>,
    #[serde(default)]
    pub client_certificate: Option<PathBuf>,
    #[serde(default)]
    pub client_certificate_data: Option<String>,
    #[serde(default)]
    pub client_key: Option<PathBuf>,
    #[serde(default)]
    pub client_key_data: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Credentials attached to each request or to the TLS session.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Bearer(String),
    Basic { username: String, password: String },
    ClientCertificate { cert_pem: Vec<u8>, key_pem: Vec<u8> },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bearer(_) => write!(f, "Bearer(<redacted>)"),
            Self::Basic { username, .. } => write!(f, "Basic({username})"),
            Self::ClientCertificate { .. } => write!(f, "ClientCertificate"),
        }
    }
}

/// Everything needed to reach one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConnection {
    pub server: Url,
    pub ca_pem: Option<Vec<u8>>,
    pub insecure: bool,
    pub auth: Auth,
}

impl Kubeconfig {
    /// `$KUBECONFIG` (first entry) or `~/.kube/config`.
    pub fn default_path() -> Result<PathBuf, KubeconfigError> {
        if let Some(paths) = std::env::var_os("KUBECONFIG")
            && let Some(first) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty())
        {
            return Ok(first);
        }
        dirs::home_dir()
            .map(|home| home.join(".kube").join("config"))
            .ok_or(KubeconfigError::NoDefaultPath)
    }

    pub fn load(path: &Path) -> Result<Self, KubeconfigError> {
        let content = fs::read_to_string(path).map_err(|source| KubeconfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, KubeconfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Resolve `context` (or the current context) into a connection.
    pub fn resolve(&self, context: Option<&str>) -> Result<ClusterConnection, KubeconfigError> {
        let context_name = context
            .or(self.current_context.as_deref())
            .filter(|name| !name.is_empty())
            .ok_or(KubeconfigError::NoContext)?;
        let context = self
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .map(|c| &c.context)
            .ok_or_else(|| KubeconfigError::MissingContext(context_name.to_string()))?;
        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == context.cluster)
            .map(|c| &c.cluster)
            .ok_or_else(|| KubeconfigError::MissingCluster(context.cluster.clone()))?;

        let server = Url::parse(&cluster.server)
            .map_err(|_| KubeconfigError::InvalidServer(cluster.server.clone()))?;
        let ca_pem = self.material(
            cluster.certificate_authority_data.as_deref(),
            cluster.certificate_authority.as_deref(),
            "certificate-authority-data",
        )?;

        let auth = match &context.user {
            Some(user_name) => {
                let user = self
                    .users
                    .iter()
                    .find(|u| &u.name == user_name)
                    .map(|u| &u.user)
                    .ok_or_else(|| KubeconfigError::MissingUser(user_name.clone()))?;
                self.auth_for(user_name, user)?
            }
            None => Auth::None,
        };

        Ok(ClusterConnection {
            server,
            ca_pem,
            insecure: cluster.insecure_skip_tls_verify,
            auth,
        })
    }

    fn auth_for(&self, user_name: &str, user: &UserEntry) -> Result<Auth, KubeconfigError> {
        if let Some(token) = &user.token {
            return Ok(Auth::Bearer(token.trim().to_string()));
        }
        if let Some(path) = &user.token_file {
            let token = self.read_file(path)?;
            return Ok(Auth::Bearer(String::from_utf8_lossy(&token).trim().to_string()));
        }

        let cert = self.material(
            user.client_certificate_data.as_deref(),
            user.client_certificate.as_deref(),
            "client-certificate-data",
        )?;
        let key = self.material(
            user.client_key_data.as_deref(),
            user.client_key.as_deref(),
            "client-key-data",
        )?;
        let incomplete = |present, missing| KubeconfigError::IncompleteClientIdentity {
            user: user_name.to_string(),
            present,
            missing,
        };
        match (cert, key) {
            (Some(cert_pem), Some(key_pem)) => {
                return Ok(Auth::ClientCertificate { cert_pem, key_pem });
            }
            (Some(_), None) => return Err(incomplete("certificate", "key")),
            (None, Some(_)) => return Err(incomplete("key", "certificate")),
            (None, None) => {}
        }

        if let (Some(username), Some(password)) = (&user.username, &user.password) {
            return Ok(Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            });
        }
        Ok(Auth::None)
    }

    /// Inline base64 data wins over a file reference.
    fn material(
        &self,
        data: Option<&str>,
        file: Option<&Path>,
        field: &'static str,
    ) -> Result<Option<Vec<u8>>, KubeconfigError> {
        if let Some(data) = data {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(data.trim())
                .map_err(|source| KubeconfigError::Base64 { field, source })?;
            return Ok(Some(bytes));
        }
        file.map(|path| self.read_file(path)).transpose()
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, KubeconfigError> {
        let path = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        fs::read(&path).map_err(|source| KubeconfigError::Io { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: playground
clusters:
  - name: playground
    cluster:
      server: https://127.0.0.1:6443
      certificate-authority-data: Q0EtUEVN
  - name: other
    cluster:
      server: http://10.0.0.1:8080
      insecure-skip-tls-verify: true
contexts:
  - name: playground
    context:
      cluster: playground
      user: admin
  - name: other
    context:
      cluster: other
      user: basic
  - name: anonymous
    context:
      cluster: other
users:
  - name: admin
    user:
      token: secret-token
  - name: basic
    user:
      username: alice
      password: hunter2
"#;

    #[test]
    fn resolves_current_context_with_token_and_ca() {
        let config = Kubeconfig::from_yaml(CONFIG).unwrap();

        let conn = config.resolve(None).unwrap();

        assert_eq!(conn.server.as_str(), "https://127.0.0.1:6443/");
        assert_eq!(conn.ca_pem.as_deref(), Some(b"CA-PEM".as_slice()));
        assert!(!conn.insecure);
        assert_eq!(conn.auth, Auth::Bearer("secret-token".to_string()));
    }

    #[test]
    fn explicit_context_overrides_current() {
        let config = Kubeconfig::from_yaml(CONFIG).unwrap();

        let conn = config.resolve(Some("other")).unwrap();

        assert!(conn.insecure);
        assert_eq!(
            conn.auth,
            Auth::Basic {
                username: "alice".to_string(),
                password: "hunter2".to_string()
            }
        );
        assert_eq!(config.resolve(Some("anonymous")).unwrap().auth, Auth::None);
    }

    #[test]
    fn missing_context_is_reported() {
        let config = Kubeconfig::from_yaml(CONFIG).unwrap();
        let err = config.resolve(Some("nope")).unwrap_err();
        assert!(matches!(err, KubeconfigError::MissingContext(name) if name == "nope"));
    }

    #[test]
    fn empty_config_has_no_context() {
        let config = Kubeconfig::from_yaml("apiVersion: v1\nkind: Config\n").unwrap();
        assert!(matches!(config.resolve(None), Err(KubeconfigError::NoContext)));
    }

    #[test]
    fn relative_token_file_resolves_against_config_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("token"), "from-file\n").unwrap();
        let path = dir.path().join("config");
        fs::write(
            &path,
            r#"
current-context: c
clusters:
  - name: k
    cluster:
      server: https://example.test
contexts:
  - name: c
    context:
      cluster: k
      user: u
users:
  - name: u
    user:
      tokenFile: token
"#,
        )
        .unwrap();

        let conn = Kubeconfig::load(&path).unwrap().resolve(None).unwrap();

        assert_eq!(conn.auth, Auth::Bearer("from-file".to_string()));
    }

    #[test]
    fn client_certificate_without_key_is_rejected() {
        let config = Kubeconfig::from_yaml(
            r#"
current-context: c
clusters:
  - name: k
    cluster:
      server: https://example.test
contexts:
  - name: c
    context:
      cluster: k
      user: half
users:
  - name: half
    user:
      client-certificate-data: Q0VSVA==
      username: alice
      password: hunter2
"#,
        )
        .unwrap();

        let err = config.resolve(None).unwrap_err();

        assert!(
            matches!(
                &err,
                KubeconfigError::IncompleteClientIdentity { user, present: "certificate", missing: "key" }
                    if user == "half"
            ),
            "{err}"
        );
        assert_eq!(
            err.to_string(),
            "user 'half' sets a client certificate without a client key"
        );
    }

    #[test]
    fn debug_output_redacts_token() {
        let rendered = format!("{:?}", Auth::Bearer("secret".to_string()));
        assert!(!rendered.contains("secret"));
    }
}
