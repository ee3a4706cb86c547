use super::SCOPES;
use crate::config::PathsConfig;
use crate::error::{AppError, Result};
use crate::models::Credential;
use crate::store::{JsonFile, Store};
use async_trait::async_trait;
use oauth2::{
    AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, PkceCodeChallenge, RedirectUrl, RefreshToken, Scope, StandardRevocableToken,
    TokenResponse, TokenUrl,
    basic::{
        BasicClient, BasicErrorResponse, BasicRevocationErrorResponse,
        BasicTokenIntrospectionResponse, BasicTokenResponse,
    },
};
use reqwest::redirect::Policy;
use std::path::{Path, PathBuf};
use tiny_http::{Response, Server};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Capability to mint Google credentials, either by refreshing or by asking the user
#[async_trait]
pub trait TokenProvider {
    async fn refresh(&self, credential: &Credential) -> Result<Credential>;

    /// Interactive authorization for `scopes`
    async fn authorize(&self, scopes: &[&str]) -> Result<Credential>;
}

/// Return a valid credential covering `required`, refreshing or re-authorizing as needed.
///
/// A credential that is returned from the store untouched is not saved again; any
/// refreshed or newly authorized credential is persisted before it is returned.
pub async fn obtain_credentials<S, P>(
    store: &S,
    provider: &P,
    required: &[&str],
) -> Result<Credential>
where
    S: Store<Credential> + Sync,
    P: TokenProvider + Sync,
{
    let cached = match store.load() {
        Ok(cached) => cached,
        Err(e) => {
            warn!("Ignoring unreadable token cache: {}", e);
            None
        }
    };

    let credential = match cached {
        None => {
            debug!("No cached credential found, authorizing with Google...");
            provider.authorize(required).await?
        }
        Some(cached) if !cached.covers(required) => {
            debug!("Cached credential lacks required scopes, authorizing with Google...");
            provider.authorize(required).await?
        }
        Some(cached) if !cached.is_expired() => {
            debug!("Using cached Google credential");
            return Ok(cached);
        }
        Some(cached) if cached.refresh_token.is_some() => {
            debug!("Access token expired, refreshing...");
            match provider.refresh(&cached).await {
                Ok(refreshed) => {
                    debug!("Token refresh successful");
                    refreshed
                }
                Err(e) => {
                    debug!("Token refresh failed ({}), re-authorizing...", e);
                    provider.authorize(required).await?
                }
            }
        }
        Some(_) => {
            debug!("Access token expired without refresh token, authorizing with Google...");
            provider.authorize(required).await?
        }
    };

    store.save(&credential)?;

    Ok(credential)
}

/// Build a credential from a token endpoint response.
///
/// When refreshing, Google usually omits the refresh token and scopes, so those are
/// carried over from `previous`. The new expiry always lies beyond the previous one.
fn credential_from_response(
    token: &BasicTokenResponse,
    previous: Option<&Credential>,
    requested: &[&str],
) -> Credential {
    let refresh_token = token
        .refresh_token()
        .map(|t| t.secret().clone())
        .or_else(|| previous.and_then(|p| p.refresh_token.clone()));

    let scopes = match token.scopes() {
        Some(scopes) => scopes.iter().map(|s| s.to_string()).collect(),
        None => match previous {
            Some(previous) => previous.scopes.clone(),
            None => requested.iter().map(|s| s.to_string()).collect(),
        },
    };

    let expires_in = token
        .expires_in()
        .map(|d| d.as_secs() as i64)
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    let mut expires_at = chrono::Utc::now().timestamp() + expires_in;
    if let Some(previous) = previous {
        expires_at = expires_at.max(previous.expires_at + 1);
    }

    Credential {
        access_token: token.access_token().secret().clone(),
        refresh_token,
        expires_at,
        scopes,
    }
}

// Type alias for the client when Auth and Token URLs are set
type ConfiguredClient = Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointSet,    // HasTokenUrl
>;

/// Installed-application OAuth2 flow against Google's endpoints
pub struct GoogleOAuth {
    client: ConfiguredClient,
    http_client: reqwest::Client,
}

impl GoogleOAuth {
    /// Build from a client secret file downloaded from the Google Cloud console
    pub async fn from_secret_file(path: &Path) -> Result<Self> {
        let secret = yup_oauth2::read_application_secret(path)
            .await
            .map_err(|e| {
                AppError::Auth(format!("Failed to read client secret {:?}: {}", path, e))
            })?;

        let auth_url = AuthUrl::new(secret.auth_uri)
            .map_err(|e| AppError::Auth(format!("Invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(secret.token_uri)
            .map_err(|e| AppError::Auth(format!("Invalid token URL: {}", e)))?;

        let client = BasicClient::new(ClientId::new(secret.client_id))
            .set_client_secret(ClientSecret::new(secret.client_secret))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url);

        let http_client = reqwest::ClientBuilder::new()
            .redirect(Policy::none())
            .build()
            .map_err(|e| AppError::Auth(format!("Failed to build reqwest client: {}", e)))?;

        Ok(Self {
            client,
            http_client,
        })
    }
}

#[async_trait]
impl TokenProvider for GoogleOAuth {
    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential
            .refresh_token
            .as_ref()
            .ok_or_else(|| AppError::Auth("No refresh token available".to_string()))?;

        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.clone()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to refresh token: {:?}", e)))?;

        Ok(credential_from_response(
            &token_result,
            Some(credential),
            &[],
        ))
    }

    async fn authorize(&self, scopes: &[&str]) -> Result<Credential> {
        // Loopback redirect on an ephemeral port
        let server = Server::http("127.0.0.1:0")
            .map_err(|e| AppError::Auth(format!("Failed to start callback server: {}", e)))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| AppError::Auth("Callback server has no TCP address".to_string()))?;

        let redirect_url = format!("http://127.0.0.1:{}/", port);
        let client = self.client.clone().set_redirect_uri(
            RedirectUrl::new(redirect_url)
                .map_err(|e| AppError::Auth(format!("Invalid redirect URL: {}", e)))?,
        );

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scopes.iter().map(|s| Scope::new(s.to_string())))
            .set_pkce_challenge(pkce_challenge)
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        println!("Open this URL in your browser:\n{}", auth_url);
        println!();
        println!("Waiting for authorization...");

        let code = loop {
            let request = server
                .recv()
                .map_err(|e| AppError::Auth(format!("Failed to receive request: {}", e)))?;

            let url = Url::parse(&format!("http://127.0.0.1:{}{}", port, request.url()))
                .map_err(|e| AppError::Auth(format!("Failed to parse callback URL: {}", e)))?;
            let param = |name: &str| {
                url.query_pairs()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.into_owned())
            };

            if let Some(error) = param("error") {
                let _ = request.respond(Response::from_string("Authorization was denied."));
                return Err(AppError::Auth(format!("Authorization denied: {}", error)));
            }

            // Browsers may ask for other paths such as /favicon.ico first
            let Some(code) = param("code") else {
                let _ = request.respond(Response::from_string("Not found").with_status_code(404));
                continue;
            };

            if param("state").as_deref() != Some(csrf_token.secret().as_str()) {
                return Err(AppError::Auth("CSRF token mismatch".to_string()));
            }

            request
                .respond(Response::from_string(
                    "Authentication successful! You can close this window.",
                ))
                .map_err(|e| AppError::Auth(format!("Failed to send response: {}", e)))?;

            break AuthorizationCode::new(code);
        };
        drop(server);

        let token_result = client
            .exchange_code(code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to exchange code: {:?}", e)))?;

        Ok(credential_from_response(&token_result, None, scopes))
    }
}

/// `GoogleOAuth` whose client secret file is only read once a token has to be minted
struct SecretFileOAuth {
    path: PathBuf,
    oauth: OnceCell<GoogleOAuth>,
}

impl SecretFileOAuth {
    fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            oauth: OnceCell::new(),
        }
    }

    async fn oauth(&self) -> Result<&GoogleOAuth> {
        self.oauth
            .get_or_try_init(|| GoogleOAuth::from_secret_file(&self.path))
            .await
    }
}

#[async_trait]
impl TokenProvider for SecretFileOAuth {
    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        self.oauth().await?.refresh(credential).await
    }

    async fn authorize(&self, scopes: &[&str]) -> Result<Credential> {
        self.oauth().await?.authorize(scopes).await
    }
}

/// Obtain a credential for every scope a run needs, using the configured files
#[instrument(name = "Authenticating to Google", skip_all)]
pub async fn authenticate(paths: &PathsConfig) -> Result<Credential> {
    let store = JsonFile::new(&paths.token_file);
    let provider = SecretFileOAuth::new(&paths.credentials_file);

    obtain_credentials(&store, &provider, SCOPES).await
}

/// Clear cached Google tokens by deleting the token cache file
#[instrument(name = "Clearing auth tokens for Google", skip_all)]
pub fn clear_tokens(paths: &PathsConfig) -> Result<()> {
    let store: JsonFile<Credential> = JsonFile::new(&paths.token_file);

    match store.clear()? {
        true => info!(path = ?store.path(), "Cleared Google cached tokens"),
        false => debug!(path = ?store.path(), "No Google tokens to clear"),
    }

    Ok(())
}
