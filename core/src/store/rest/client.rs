//! HTTP client for the hosted data store.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use shared::VerifyMode;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::models::{
    ChildIdentity, LedgerEntry, Offer, Redemption, Reward, WalletAggregate,
};
use crate::store::rest::error::StoreError;
use crate::store::traits::{FamilyStore, LedgerStore, RewardStore, SecretStore, WalletStore};

/// Connection settings for the hosted store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    /// Service key sent as both `apikey` and bearer token
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// REST client implementing the full remote-store surface.
pub struct RestStore {
    config: StoreConfig,
    client: Client,
}

impl RestStore {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref api_key) = config.api_key {
            let bearer = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| StoreError::Config("API key is not a valid header value".into()))?;
            let apikey = header::HeaderValue::from_str(api_key)
                .map_err(|_| StoreError::Config("API key is not a valid header value".into()))?;
            headers.insert(header::AUTHORIZATION, bearer);
            headers.insert("apikey", apikey);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Read rows from a table with the given filter predicates.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let mut url = format!("{}/rest/v1/{}", self.config.base_url, table);
        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }

        let response = self.client.get(&url).send().await?;
        self.handle(response).await
    }

    /// Call a stored procedure.
    async fn rpc<T: DeserializeOwned>(
        &self,
        procedure: &str,
        args: serde_json::Value,
    ) -> Result<T, StoreError> {
        let url = format!(
            "{}/rest/v1/rpc/{}",
            self.config.base_url,
            urlencoding::encode(procedure)
        );
        let response = self.client.post(&url).json(&args).send().await?;
        self.handle(response).await
    }

    async fn handle<T: DeserializeOwned>(&self, response: Response) -> Result<T, StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            Err(StoreError::Server {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

fn any_of(values: &[String]) -> String {
    format!("in.({})", values.join(","))
}

fn either_id(child_ref: &str) -> String {
    format!("(id.eq.{ref_},child_uid.eq.{ref_})", ref_ = child_ref)
}

#[async_trait]
impl FamilyStore for RestStore {
    async fn family_id_for_code(&self, code: &str) -> Result<Option<Uuid>> {
        let found = self
            .rpc::<Option<Uuid>>("family_id_for_code", json!({ "code": code }))
            .await?;
        Ok(found)
    }

    async fn family_for_child(&self, child_ref: &str) -> Result<Option<Uuid>> {
        let rows: Vec<ChildIdentity> = self
            .select(
                "children",
                &[("or", either_id(child_ref)), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.into_iter().next().map(|c| c.family_id))
    }

    async fn list_children(&self, family_id: Uuid) -> Result<Vec<ChildIdentity>> {
        let rows = self
            .select(
                "children",
                &[
                    ("family_id", eq(&family_id.to_string())),
                    ("order", "created_at.asc".to_string()),
                ],
            )
            .await?;
        Ok(rows)
    }

    async fn child_by_id(&self, family_id: Uuid, child_ref: &str) -> Result<Option<ChildIdentity>> {
        let rows: Vec<ChildIdentity> = self
            .select(
                "children",
                &[
                    ("family_id", eq(&family_id.to_string())),
                    ("or", either_id(child_ref)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn child_by_nickname(
        &self,
        family_id: Uuid,
        nickname: &str,
    ) -> Result<Option<ChildIdentity>> {
        let rows: Vec<ChildIdentity> = self
            .select(
                "children",
                &[
                    ("family_id", eq(&family_id.to_string())),
                    ("nickname", format!("ilike.{}", nickname)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl LedgerStore for RestStore {
    async fn ledger_via_summary(&self, legacy_uid: &str) -> Result<Vec<LedgerEntry>> {
        let rows = self
            .rpc("child_points_summary", json!({ "child_uid": legacy_uid }))
            .await?;
        Ok(rows)
    }

    async fn ledger_for_children(&self, child_refs: &[String]) -> Result<Vec<LedgerEntry>> {
        let rows = self
            .select(
                "point_ledger",
                &[
                    ("child_uid", any_of(child_refs)),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl WalletStore for RestStore {
    async fn precomputed_wallet(&self, canonical_id: &str) -> Result<Option<WalletAggregate>> {
        let rows: Vec<WalletAggregate> = self
            .select(
                "wallet_totals",
                &[("child_id", eq(canonical_id)), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl RewardStore for RestStore {
    async fn list_rewards(&self, family_id: Uuid) -> Result<Vec<Reward>> {
        let rows = self
            .select("rewards", &[("family_id", eq(&family_id.to_string()))])
            .await?;
        Ok(rows)
    }

    async fn offers_for_children(&self, child_refs: &[String]) -> Result<Vec<Offer>> {
        let rows = self
            .select("offers", &[("child_uid", any_of(child_refs))])
            .await?;
        Ok(rows)
    }

    async fn redemptions_for_children(&self, child_refs: &[String]) -> Result<Vec<Redemption>> {
        let rows = self
            .select("redemptions", &[("child_uid", any_of(child_refs))])
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl SecretStore for RestStore {
    async fn verify_secret(&self, child_ref: &str, secret: &str, mode: VerifyMode) -> Result<bool> {
        let verified = self
            .rpc(
                "verify_child_secret",
                json!({ "child_ref": child_ref, "secret": secret, "mode": mode }),
            )
            .await?;
        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_predicates_render_postgrest_syntax() {
        assert_eq!(eq("abc"), "eq.abc");
        assert_eq!(
            any_of(&["a".to_string(), "b".to_string()]),
            "in.(a,b)"
        );
        assert_eq!(either_id("x"), "(id.eq.x,child_uid.eq.x)");
    }

    #[test]
    fn client_builds_with_and_without_key() {
        assert!(RestStore::new(StoreConfig::default()).is_ok());
        assert!(RestStore::new(StoreConfig {
            api_key: Some("service-key".to_string()),
            ..StoreConfig::default()
        })
        .is_ok());
    }
}
