use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use super::{IdentityProvider, IssuedToken, PasswordGrant, ProviderError, RoleInfo, UserProfile};
use crate::config::IdentityConfig;

pub const TOKEN_HEADER: &str = "X-Tapis-Token";

/// HTTP client for the Tapis v3 OAuth2 and Security Kernel APIs.
#[derive(Debug, Clone)]
pub struct TapisClient {
    http: Client,
    base_url: Url,
    tenant_id: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct NameList {
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    username: String,
}

#[derive(Debug, Deserialize)]
struct TokenResult {
    access_token: AccessToken,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
    expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    username: String,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<Profile> for UserProfile {
    fn from(p: Profile) -> Self {
        let name = [p.given_name, p.last_name]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            username: p.username,
            name,
            email: p.email.unwrap_or_default(),
        }
    }
}

impl TapisClient {
    pub fn new(config: &IdentityConfig) -> Result<Self, ProviderError> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }

        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            tenant_id: config.tenant_id.clone(),
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// `{base}/v3/<segments...>` with each segment percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::Decode("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push("v3")
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn get(&self, token: &str, url: Url) -> RequestBuilder {
        self.http.get(url).header(TOKEN_HEADER, token)
    }

    fn post(&self, token: &str, url: Url) -> RequestBuilder {
        self.http.post(url).header(TOKEN_HEADER, token)
    }

    pub(crate) async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ProviderError> {
        let response = request.send().await?;
        let body = Self::check(response).await?;
        serde_json::from_slice::<Envelope<T>>(&body)
            .map(|envelope| envelope.result)
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }

    /// Split non-success statuses into rejections and everything else.
    async fn check(response: Response) -> Result<Vec<u8>, ProviderError> {
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        if status.is_success() {
            return Ok(body);
        }

        let message = serde_json::from_slice::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
            }),
            _ => Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            }),
        }
    }
}

#[async_trait]
impl IdentityProvider for TapisClient {
    async fn username(&self, token: &str) -> Result<String, ProviderError> {
        let url = self.endpoint(&["oauth2", "userinfo"])?;
        let info: UserInfo = Self::send(self.get(token, url)).await?;
        Ok(info.username)
    }

    async fn user_roles(&self, token: &str, username: &str) -> Result<Vec<String>, ProviderError> {
        let url = self.endpoint(&["security", "user", "roles", username])?;
        let list: NameList =
            Self::send(self.get(token, url).query(&[("tenant", self.tenant_id.as_str())])).await?;
        Ok(list.names)
    }

    async fn password_grant(&self, grant: &PasswordGrant) -> Result<IssuedToken, ProviderError> {
        let url = self.endpoint(&["oauth2", "tokens"])?;
        let mut request = self.http.post(url).json(&json!({
            "username": grant.username,
            "password": grant.password,
            "grant_type": "password",
        }));
        if let Some(client_id) = &grant.client_id {
            request = request.basic_auth(client_id, grant.client_secret.as_ref());
        }

        let result: TokenResult = Self::send(request).await?;
        Ok(IssuedToken {
            access_token: result.access_token.access_token,
            expires_at: result.access_token.expires_at,
        })
    }

    async fn role_names(&self, token: &str) -> Result<Vec<String>, ProviderError> {
        let url = self.endpoint(&["security", "role", "names"])?;
        let list: NameList =
            Self::send(self.get(token, url).query(&[("tenant", self.tenant_id.as_str())])).await?;
        Ok(list.names)
    }

    async fn role(&self, token: &str, name: &str) -> Result<RoleInfo, ProviderError> {
        let url = self.endpoint(&["security", "role", name])?;
        Self::send(self.get(token, url).query(&[("tenant", self.tenant_id.as_str())])).await
    }

    async fn users_with_role(&self, token: &str, role: &str) -> Result<Vec<String>, ProviderError> {
        let url = self.endpoint(&["security", "role", "usersWithRole", role])?;
        let list: NameList =
            Self::send(self.get(token, url).query(&[("tenant", self.tenant_id.as_str())])).await?;
        Ok(list.names)
    }

    async fn profile(&self, token: &str, username: &str) -> Result<UserProfile, ProviderError> {
        let url = self.endpoint(&["oauth2", "profiles", username])?;
        let profile: Profile = Self::send(self.get(token, url)).await?;
        Ok(profile.into())
    }

    async fn grant_role(&self, token: &str, username: &str, role: &str) -> Result<(), ProviderError> {
        let url = self.endpoint(&["security", "user", "grantRole"])?;
        let _: Value = Self::send(self.post(token, url).json(&json!({
            "tenant": self.tenant_id,
            "user": username,
            "roleName": role,
        })))
        .await?;
        Ok(())
    }

    async fn revoke_role(&self, token: &str, username: &str, role: &str) -> Result<(), ProviderError> {
        let url = self.endpoint(&["security", "user", "revokeRole"])?;
        let _: Value = Self::send(self.post(token, url).json(&json!({
            "tenant": self.tenant_id,
            "user": username,
            "roleName": role,
        })))
        .await?;
        Ok(())
    }
}
