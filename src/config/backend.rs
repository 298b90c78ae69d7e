//! # Backend-specific configuration variants.
//!
//! [`Backend`] selects which kind of target a [`ConnectionConfig`](crate::ConnectionConfig)
//! describes and carries the parameters that only make sense for that kind.
//! Each variant knows its own validation rules; the shared fields (host,
//! credentials, retry knobs) live on the config itself.
//!
//! ## Required fields per variant
//! ```text
//! Database   connection_string
//!            | Oracle: tns_name | host + port + (service_name | sid | database)
//!            | Sqlite: database
//!            | other:  host + database + username + password
//! Api        http(s) host + auth-method credentials
//! Ssh        Password: username + password | PublicKey: key | Agent: username
//! Kubernetes Config: kubeconfig | in_cluster, Token: token, Certificate: cert + key,
//!            Basic: username + password
//! Aws        AccessKey: id + secret, Profile: profile, WebIdentity: role + token file,
//!            Sso: account + role + region + start url
//! ```

use crate::error::ConfigError;

/// Backend selected by a connection configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Backend {
    /// No backend-specific requirements beyond a host.
    #[default]
    Generic,
    /// Relational database.
    Database(DatabaseOptions),
    /// HTTP API.
    Api(ApiOptions),
    /// SSH host.
    Ssh(SshOptions),
    /// Container-orchestration cluster.
    Kubernetes(KubernetesOptions),
    /// Cloud-provider API.
    Aws(AwsOptions),
}

impl Backend {
    /// Returns a short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Backend::Generic => "generic",
            Backend::Database(_) => "database",
            Backend::Api(_) => "api",
            Backend::Ssh(_) => "ssh",
            Backend::Kubernetes(_) => "kubernetes",
            Backend::Aws(_) => "aws",
        }
    }

    /// Port used when the config does not set one explicitly.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Backend::Database(db) => db.kind.default_port(),
            Backend::Ssh(_) => Some(22),
            Backend::Kubernetes(_) => Some(6443),
            Backend::Generic | Backend::Api(_) | Backend::Aws(_) => None,
        }
    }

    /// Whether the shared `host` field must be present for this backend.
    pub(crate) fn requires_host(&self) -> bool {
        match self {
            Backend::Generic | Backend::Api(_) | Backend::Ssh(_) => true,
            Backend::Kubernetes(k) => k.auth != KubernetesAuth::Config,
            // Databases decide per kind; AWS resolves endpoints from the region.
            Backend::Database(_) | Backend::Aws(_) => false,
        }
    }

    /// Whether a trailing `/` should be stripped from the host.
    pub(crate) fn normalizes_host(&self) -> bool {
        matches!(self, Backend::Api(_) | Backend::Kubernetes(_))
    }

    /// Checks variant-specific requirements against the shared fields.
    pub(crate) fn validate(&self, shared: &Shared<'_>) -> Result<(), ConfigError> {
        match self {
            Backend::Generic => Ok(()),
            Backend::Database(db) => db.validate(shared),
            Backend::Api(api) => api.validate(shared),
            Backend::Ssh(ssh) => ssh.validate(shared),
            Backend::Kubernetes(k) => k.validate(shared),
            Backend::Aws(aws) => aws.validate(),
        }
    }
}

/// Shared config fields the variant rules consult.
pub(crate) struct Shared<'a> {
    pub host: &'a str,
    pub port: Option<u16>,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
}

fn present(v: Option<&str>) -> bool {
    v.is_some_and(|s| !s.is_empty())
}

fn present_owned(v: &Option<String>) -> bool {
    present(v.as_deref())
}

/// Collects missing field names and fails if any were found.
struct Missing {
    backend: &'static str,
    fields: Vec<&'static str>,
}

impl Missing {
    fn new(backend: &'static str) -> Self {
        Self {
            backend,
            fields: Vec::new(),
        }
    }

    fn require(mut self, ok: bool, field: &'static str) -> Self {
        if !ok {
            self.fields.push(field);
        }
        self
    }

    fn finish(self) -> Result<(), ConfigError> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing {
                backend: self.backend,
                fields: self.fields,
            })
        }
    }
}

// ---- Database ----

/// Supported database engines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DatabaseKind {
    #[default]
    Postgres,
    MySql,
    Oracle,
    MsSql,
    Sqlite,
}

impl DatabaseKind {
    fn default_port(&self) -> Option<u16> {
        match self {
            DatabaseKind::Postgres => Some(5432),
            DatabaseKind::MySql => Some(3306),
            DatabaseKind::MsSql => Some(1433),
            // Oracle listeners vary per install; the port must be explicit.
            DatabaseKind::Oracle | DatabaseKind::Sqlite => None,
        }
    }
}

/// Relational database parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatabaseOptions {
    pub kind: DatabaseKind,
    /// Full DSN; when set, no other field is required.
    pub connection_string: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    /// Oracle service name.
    pub service_name: Option<String>,
    /// Oracle SID.
    pub sid: Option<String>,
    /// Oracle TNS alias.
    pub tns_name: Option<String>,
}

impl DatabaseOptions {
    fn validate(&self, shared: &Shared<'_>) -> Result<(), ConfigError> {
        if present_owned(&self.connection_string) {
            return Ok(());
        }

        match self.kind {
            DatabaseKind::Sqlite => Missing::new("database")
                .require(present_owned(&self.database), "database")
                .finish(),
            DatabaseKind::Oracle => {
                if present_owned(&self.tns_name) {
                    return Ok(());
                }
                let has_service = present_owned(&self.service_name)
                    || present_owned(&self.sid)
                    || present_owned(&self.database);
                Missing::new("database")
                    .require(!shared.host.is_empty(), "host")
                    .require(shared.port.is_some(), "port")
                    .require(has_service, "service_name | sid | database")
                    .finish()
            }
            DatabaseKind::Postgres | DatabaseKind::MySql | DatabaseKind::MsSql => {
                Missing::new("database")
                    .require(!shared.host.is_empty(), "host")
                    .require(present_owned(&self.database), "database")
                    .require(present(shared.username), "username")
                    .require(present(shared.password), "password")
                    .finish()
            }
        }
    }
}

// ---- API ----

/// Authentication scheme for HTTP APIs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ApiAuth {
    #[default]
    None,
    Basic,
    Bearer,
    Jwt,
    ApiKey,
    OAuth2,
    Digest,
    Hmac,
}

/// Where an API key is sent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ApiKeyLocation {
    #[default]
    Header,
    Query,
}

/// HTTP API parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApiOptions {
    pub auth: ApiAuth,
    /// Bearer / JWT / OAuth2 token.
    pub auth_token: Option<String>,
    pub api_key: Option<String>,
    pub api_key_name: Option<String>,
    pub api_key_location: ApiKeyLocation,
    pub hmac_key: Option<String>,
    pub hmac_secret: Option<String>,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    pub oauth_scope: Option<String>,
    /// Headers sent with every request.
    pub default_headers: Vec<(String, String)>,
}

impl ApiOptions {
    fn validate(&self, shared: &Shared<'_>) -> Result<(), ConfigError> {
        if !shared.host.starts_with("http://") && !shared.host.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "host",
                reason: format!("expected an http(s) URL, got {:?}", shared.host),
            });
        }

        let check = Missing::new("api");
        let check = match self.auth {
            ApiAuth::None => check,
            ApiAuth::Basic | ApiAuth::Digest => check
                .require(present(shared.username), "username")
                .require(present(shared.password), "password"),
            ApiAuth::Bearer | ApiAuth::Jwt => {
                check.require(present_owned(&self.auth_token), "auth_token")
            }
            ApiAuth::ApiKey => check
                .require(present_owned(&self.api_key), "api_key")
                .require(present_owned(&self.api_key_name), "api_key_name"),
            ApiAuth::OAuth2 => check
                .require(present_owned(&self.oauth_client_id), "oauth_client_id")
                .require(present_owned(&self.oauth_client_secret), "oauth_client_secret"),
            ApiAuth::Hmac => check
                .require(present_owned(&self.hmac_key), "hmac_key")
                .require(present_owned(&self.hmac_secret), "hmac_secret"),
        };
        check.finish()?;

        if self.auth == ApiAuth::Jwt {
            let segments = self.auth_token.as_deref().unwrap_or_default().split('.').count();
            if segments != 3 {
                return Err(ConfigError::Invalid {
                    field: "auth_token",
                    reason: "JWT must have three dot-separated segments".into(),
                });
            }
        }
        Ok(())
    }
}

// ---- SSH ----

/// SSH authentication scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SshAuth {
    #[default]
    Password,
    PublicKey,
    Agent,
}

/// SSH host parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SshOptions {
    pub auth: SshAuth,
    /// Path to a private key file.
    pub key_filename: Option<String>,
    /// Inline (possibly encrypted) private key.
    pub private_key: Option<String>,
    pub passphrase: Option<String>,
    pub allow_agent: bool,
    pub look_for_keys: bool,
    pub banner_timeout_secs: u64,
}

impl SshOptions {
    fn validate(&self, shared: &Shared<'_>) -> Result<(), ConfigError> {
        let check = Missing::new("ssh");
        let check = match self.auth {
            SshAuth::Password => check
                .require(present(shared.username), "username")
                .require(present(shared.password), "password"),
            SshAuth::PublicKey => check.require(
                present_owned(&self.key_filename) || present_owned(&self.private_key),
                "key_filename | private_key",
            ),
            SshAuth::Agent => check.require(present(shared.username), "username"),
        };
        check.finish()
    }
}

// ---- Kubernetes ----

/// Kubernetes authentication scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KubernetesAuth {
    #[default]
    Config,
    Token,
    Certificate,
    Basic,
}

/// Kubernetes cluster parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct KubernetesOptions {
    pub auth: KubernetesAuth,
    pub kubeconfig_path: Option<String>,
    pub context: Option<String>,
    pub in_cluster: bool,
    pub api_token: Option<String>,
    pub ca_cert_path: Option<String>,
    pub client_cert_path: Option<String>,
    pub client_key_path: Option<String>,
    pub namespace: String,
    pub api_version: String,
}

impl Default for KubernetesOptions {
    fn default() -> Self {
        Self {
            auth: KubernetesAuth::Config,
            kubeconfig_path: None,
            context: None,
            in_cluster: false,
            api_token: None,
            ca_cert_path: None,
            client_cert_path: None,
            client_key_path: None,
            namespace: "default".into(),
            api_version: "v1".into(),
        }
    }
}

impl KubernetesOptions {
    fn validate(&self, shared: &Shared<'_>) -> Result<(), ConfigError> {
        let check = Missing::new("kubernetes");
        let check = match self.auth {
            KubernetesAuth::Config => check.require(
                present_owned(&self.kubeconfig_path) || self.in_cluster,
                "kubeconfig_path | in_cluster",
            ),
            KubernetesAuth::Token => check.require(present_owned(&self.api_token), "api_token"),
            KubernetesAuth::Certificate => check
                .require(present_owned(&self.client_cert_path), "client_cert_path")
                .require(present_owned(&self.client_key_path), "client_key_path"),
            KubernetesAuth::Basic => check
                .require(present(shared.username), "username")
                .require(present(shared.password), "password"),
        };
        check.finish()
    }
}

// ---- AWS ----

/// AWS credential source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AwsAuth {
    #[default]
    AccessKey,
    Profile,
    InstanceRole,
    WebIdentity,
    Sso,
}

/// AWS service parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct AwsOptions {
    pub auth: AwsAuth,
    pub region: String,
    pub service: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub profile_name: Option<String>,
    pub role_arn: Option<String>,
    pub web_identity_token_file: Option<String>,
    pub sso_account_id: Option<String>,
    pub sso_role_name: Option<String>,
    pub sso_region: Option<String>,
    pub sso_start_url: Option<String>,
    pub endpoint_url: Option<String>,
}

impl Default for AwsOptions {
    fn default() -> Self {
        Self {
            auth: AwsAuth::AccessKey,
            region: "us-east-1".into(),
            service: "s3".into(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            profile_name: None,
            role_arn: None,
            web_identity_token_file: None,
            sso_account_id: None,
            sso_role_name: None,
            sso_region: None,
            sso_start_url: None,
            endpoint_url: None,
        }
    }
}

impl AwsOptions {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.region.is_empty() {
            return Err(ConfigError::Invalid {
                field: "region",
                reason: "must not be empty".into(),
            });
        }

        let check = Missing::new("aws");
        let check = match self.auth {
            AwsAuth::AccessKey => check
                .require(present_owned(&self.access_key_id), "access_key_id")
                .require(present_owned(&self.secret_access_key), "secret_access_key"),
            AwsAuth::Profile => check.require(present_owned(&self.profile_name), "profile_name"),
            AwsAuth::InstanceRole => check,
            AwsAuth::WebIdentity => check
                .require(present_owned(&self.role_arn), "role_arn")
                .require(
                    present_owned(&self.web_identity_token_file),
                    "web_identity_token_file",
                ),
            AwsAuth::Sso => check
                .require(present_owned(&self.sso_account_id), "sso_account_id")
                .require(present_owned(&self.sso_role_name), "sso_role_name")
                .require(present_owned(&self.sso_region), "sso_region")
                .require(present_owned(&self.sso_start_url), "sso_start_url"),
        };
        check.finish()
    }
}
