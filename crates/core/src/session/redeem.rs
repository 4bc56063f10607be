//! Credential redemption against the event server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{info, warn};
use url::Url;

use crate::{error::CredentialError, manifest::EventManifest, models::UserInfo};

/// Service that exchanges a credential for a user identity.
#[async_trait]
pub trait CredentialRedeemer: Send + Sync {
    /// Redeem `credential` for the event described by `manifest`.
    async fn redeem(
        &self,
        manifest: &EventManifest,
        credential: &str,
    ) -> Result<UserInfo, CredentialError>;
}

/// Redeems credentials against the event server's `status` endpoint.
#[derive(Debug, Clone)]
pub struct StatusRedeemer {
    http: reqwest::Client,
}

impl StatusRedeemer {
    /// Create a redeemer whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, CredentialError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| CredentialError::NetworkFailure(err.to_string()))?;
        Ok(Self { http })
    }

    /// Status URL for `credential` on the server of `manifest`.
    pub fn status_url(manifest: &EventManifest, credential: &str) -> Result<Url, CredentialError> {
        let mut url = manifest
            .server_base_url
            .join("status")
            .map_err(|err| CredentialError::NetworkFailure(err.to_string()))?;
        url.query_pairs_mut().append_pair("token", credential);
        Ok(url)
    }
}

#[async_trait]
impl CredentialRedeemer for StatusRedeemer {
    async fn redeem(
        &self,
        manifest: &EventManifest,
        credential: &str,
    ) -> Result<UserInfo, CredentialError> {
        let url = Self::status_url(manifest, credential)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| CredentialError::NetworkFailure(err.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let user: UserInfo = response
                    .json()
                    .await
                    .map_err(|err| CredentialError::NetworkFailure(err.to_string()))?;
                info!(event_id = %manifest.event_id, user_id = %user.user_id, "Credential redeemed");
                Ok(user)
            }
            StatusCode::GONE => Err(CredentialError::Expired),
            StatusCode::BAD_REQUEST
            | StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::NOT_FOUND => Err(CredentialError::Invalid),
            status => {
                warn!(event_id = %manifest.event_id, %status, "Unexpected redemption status");
                Err(CredentialError::NetworkFailure(format!(
                    "unexpected status {status}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::tests::sample_document;
    use crate::portal::client::tests::serve_once;

    fn manifest_at(base: &Url) -> EventManifest {
        let mut document = sample_document("SITCON_2019");
        document["server_base_url"] = serde_json::Value::String(base.to_string());
        EventManifest::parse(document).expect("sample manifest")
    }

    #[test]
    fn status_url_carries_encoded_token() -> anyhow::Result<()> {
        let manifest = manifest_at(&Url::parse("https://ccip.example.com/api/")?);
        let url = StatusRedeemer::status_url(&manifest, "a b&c")?;
        assert_eq!(
            url.as_str(),
            "https://ccip.example.com/api/status?token=a+b%26c"
        );
        Ok(())
    }

    #[tokio::test]
    async fn redeems_user_info() -> anyhow::Result<()> {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"user_id":"u-42","role":"staff","scenarios":[]}"#.to_string(),
        )
        .await?;
        let redeemer = StatusRedeemer::new(Duration::from_secs(5))?;
        let user = redeemer.redeem(&manifest_at(&base), "secret").await?;
        assert_eq!(user.user_id, "u-42");
        assert_eq!(user.role, "staff");
        assert_eq!(server.await?, "GET /status?token=secret HTTP/1.1");
        Ok(())
    }

    #[tokio::test]
    async fn maps_rejections() -> anyhow::Result<()> {
        let redeemer = StatusRedeemer::new(Duration::from_secs(5))?;
        for (status, expected) in [
            ("403 Forbidden", CredentialError::Invalid),
            ("410 Gone", CredentialError::Expired),
        ] {
            let (base, _server) = serve_once(status, "{}".to_string()).await?;
            let result = redeemer.redeem(&manifest_at(&base), "secret").await;
            assert_eq!(result, Err(expected));
        }

        let (base, _server) = serve_once("500 Internal Server Error", "{}".to_string()).await?;
        let result = redeemer.redeem(&manifest_at(&base), "secret").await;
        assert!(matches!(result, Err(CredentialError::NetworkFailure(_))));
        Ok(())
    }
}
