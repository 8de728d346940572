//! OAuth2 credential lifecycle for an installed application.
//!
//! The credential is kept as a JSON blob on disk. On each run it is loaded,
//! refreshed when expired, or replaced through the browser consent flow with
//! a one-shot loopback HTTP server receiving the authorization code.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::{DriveError, Result};
use crate::models::{ClientSecrets, ClientSecretsFile, OAuthErrorResponse, TokenResponse};

/// Tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const STATE_LEN: usize = 32;

const SUCCESS_PAGE: &str = "The authentication flow has completed. You may close this window.";

/// Persisted OAuth2 credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix time in seconds at which the access token expires.
    #[serde(default)]
    pub expires_at: Option<u64>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    fn from_token(token: TokenResponse, secrets: &ClientSecrets, scopes: &[String]) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_in.map(|secs| unix_now() + secs),
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes: scopes.to_vec(),
        }
    }

    /// A credential without an expiry never expires.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => unix_now() + EXPIRY_MARGIN.as_secs() >= expires_at,
            None => false,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Loads, refreshes, and persists the credential.
pub struct CredentialStore {
    config: AuthConfig,
    http: Client,
}

impl CredentialStore {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Return a usable credential, logging in interactively if there is no
    /// stored one that is valid or refreshable. The result is always written
    /// back to disk.
    pub async fn obtain(&self) -> Result<Credential> {
        let stored = match self.load() {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "ignoring unreadable stored credential");
                None
            }
        };

        let credential = match stored {
            Some(credential) if credential.is_valid() => {
                debug!("using stored credential");
                credential
            }
            Some(credential) if credential.is_expired() && credential.refresh_token.is_some() => {
                info!("stored credential expired, refreshing");
                self.refresh(credential).await?
            }
            _ => self.login().await?,
        };

        self.save(&credential)?;
        Ok(credential)
    }

    /// Read the stored credential. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<Credential>> {
        let path = &self.config.token_path;
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(DriveError::CredentialsFileError {
                    path: path.clone(),
                    source,
                })
            }
        };
        let credential: Credential = serde_json::from_str(&content)?;
        Ok(Some(credential))
    }

    /// Write the credential, readable by the owner only.
    pub fn save(&self, credential: &Credential) -> Result<()> {
        let path = &self.config.token_path;
        let file_error = |source| DriveError::CredentialsFileError {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(file_error)?;
            }
        }

        let content = serde_json::to_string_pretty(credential)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path).map_err(file_error)?;

        // `mode` only applies on creation; tighten a file left by an older run.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(file_error)?;
        }

        file.write_all(content.as_bytes()).map_err(file_error)?;

        debug!(path = %path.display(), "saved credential");
        Ok(())
    }

    /// Exchange the refresh token for a new access token.
    pub async fn refresh(&self, mut credential: Credential) -> Result<Credential> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or_else(|| DriveError::TokenRefreshError("no refresh token".to_string()))?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", credential.client_id.as_str()),
            ("client_secret", credential.client_secret.as_str()),
        ];
        let token = self
            .request_token(&credential.token_uri, &params)
            .await
            .map_err(DriveError::TokenRefreshError)?;

        credential.access_token = token.access_token;
        credential.expires_at = token.expires_in.map(|secs| unix_now() + secs);
        if let Some(refresh_token) = token.refresh_token {
            credential.refresh_token = Some(refresh_token);
        }

        Ok(credential)
    }

    /// Run the browser consent flow and exchange the resulting code.
    async fn login(&self) -> Result<Credential> {
        let secrets = load_client_secrets(&self.config.client_secrets_path)?;
        let flow = LoopbackLogin::bind().await?;
        let url = flow.authorization_url(&secrets, &self.config.scopes)?;

        println!("Please visit this URL to authorize this application:");
        println!("{}\n", url);
        info!(port = flow.port(), "waiting for authorization callback");

        let code = flow.wait_for_code().await?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", flow.redirect_uri()),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
        ];
        let token = self
            .request_token(&secrets.token_uri, &params)
            .await
            .map_err(|e| DriveError::AuthenticationError(format!("code exchange failed: {}", e)))?;

        Ok(Credential::from_token(token, &secrets, &self.config.scopes))
    }

    /// POST to the token endpoint, describing any failure as a message.
    async fn request_token(
        &self,
        token_uri: &str,
        params: &[(&str, &str)],
    ) -> std::result::Result<TokenResponse, String> {
        let response = self
            .http
            .post(token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<OAuthErrorResponse>(&body) {
                Ok(oauth_error) => format!("Status {}: {}", status, oauth_error),
                Err(_) => format!("Status {}: {}", status, body),
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| e.to_string())
    }
}

/// Read the OAuth client configuration. Its absence is fatal.
pub fn load_client_secrets(path: &Path) -> Result<ClientSecrets> {
    if !path.exists() {
        return Err(DriveError::MissingClientSecrets {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path).map_err(|source| DriveError::CredentialsFileError {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ClientSecretsFile = serde_json::from_str(&content)?;

    file.into_secrets().ok_or_else(|| {
        DriveError::AuthenticationError(format!(
            "{} has neither an 'installed' nor a 'web' client section",
            path.display()
        ))
    })
}

/// One-shot loopback server receiving the OAuth redirect.
pub struct LoopbackLogin {
    listener: TcpListener,
    redirect_uri: String,
    state: String,
}

impl LoopbackLogin {
    /// Listen on an OS-chosen port on the loopback interface.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.map_err(|e| {
            DriveError::AuthenticationError(format!("failed to start local server: {}", e))
        })?;
        let port = listener
            .local_addr()
            .map_err(|e| {
                DriveError::AuthenticationError(format!("local server has no address: {}", e))
            })?
            .port();
        let state = (0..STATE_LEN).map(|_| fastrand::alphanumeric()).collect();

        Ok(Self {
            listener,
            redirect_uri: format!("http://127.0.0.1:{}/", port),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.listener.local_addr().map(|addr| addr.port()).unwrap_or(0)
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Consent page URL for the given client and scopes.
    pub fn authorization_url(&self, secrets: &ClientSecrets, scopes: &[String]) -> Result<Url> {
        let scope = scopes.join(" ");
        Url::parse_with_params(
            &secrets.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", secrets.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", self.state.as_str()),
            ],
        )
        .map_err(|e| DriveError::AuthenticationError(format!("invalid auth_uri: {}", e)))
    }

    /// Serve requests until one carries the authorization code or an error.
    ///
    /// Connections that do not send a readable request line are answered
    /// with 400 and ignored.
    pub async fn wait_for_code(&self) -> Result<String> {
        loop {
            let (mut stream, peer) = self.listener.accept().await.map_err(|e| {
                DriveError::AuthenticationError(format!("local server stopped accepting: {}", e))
            })?;
            let target = match read_request_target(&mut stream).await {
                Ok(target) => target,
                Err(err) => {
                    debug!(%peer, error = %err, "unreadable callback request");
                    respond(&mut stream, "400 Bad Request", "Bad request").await;
                    continue;
                }
            };
            debug!(%peer, %target, "callback request");

            match parse_callback(&target, &self.state) {
                Ok(Some(code)) => {
                    respond(&mut stream, "200 OK", SUCCESS_PAGE).await;
                    return Ok(code);
                }
                Ok(None) => respond(&mut stream, "404 Not Found", "Not found").await,
                Err(err) => {
                    respond(&mut stream, "400 Bad Request", &err.to_string()).await;
                    return Err(err);
                }
            }
        }
    }
}

/// Request target of the first line, e.g. `/?code=...` from `GET /?code=... HTTP/1.1`.
async fn read_request_target(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut request_line = String::new();
    BufReader::new(stream).read_line(&mut request_line).await?;

    Ok(request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string())
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    if let Err(err) = stream.write_all(response.as_bytes()).await {
        debug!(error = %err, "failed to answer callback request");
    }
    let _ = stream.shutdown().await;
}

/// Extract the authorization code from a redirect target.
///
/// `Ok(None)` means the request is unrelated (e.g. a favicon fetch).
fn parse_callback(target: &str, expected_state: &str) -> Result<Option<String>> {
    let url = match Url::parse("http://127.0.0.1").and_then(|base| base.join(target)) {
        Ok(url) => url,
        Err(_) => return Ok(None),
    };
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        return Err(DriveError::AuthenticationError(format!(
            "authorization denied: {}",
            error
        )));
    }

    let Some(code) = params.get("code") else {
        return Ok(None);
    };

    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(DriveError::AuthenticationError(
            "state mismatch in authorization response".to_string(),
        ));
    }

    Ok(Some(code.clone()))
}
