//! API client for the entity REST API.
//!
//! This module provides an async HTTP client for communicating with the backend.
//! All methods are non-blocking and designed to run in a separate Tokio task,
//! driven by [`ApiCommand`]s and answering with [`ApiMessage`]s.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use tokio::sync::mpsc;

use crate::models::{Entity, NewEntity};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// API client for the entity backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client with the specified base URL
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn entity_url(&self) -> String {
        format!("{}/entity/", self.base_url)
    }

    /// Fetch all entities, newest first as ordered by the server
    pub async fn list_entities(&self) -> Result<Vec<Entity>> {
        let url = self.entity_url();
        tracing::debug!(%url, "listing entities");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to entity endpoint")?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse entity list response")
    }

    /// Create an entity and return the stored record
    pub async fn create_entity(&self, entity: &NewEntity) -> Result<Entity> {
        let url = self.entity_url();
        tracing::debug!(%url, name = %entity.name, "creating entity");

        let response = self
            .client
            .post(&url)
            .json(entity)
            .send()
            .await
            .context("Failed to send create entity request")?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse create entity response")
    }

    /// Health check - attempts to list entities
    pub async fn health_check(&self) -> bool {
        match self.list_entities().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "health check failed");
                false
            }
        }
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!(
                "API error: {} - {}",
                status,
                response.text().await.unwrap_or_default()
            );
        }
        Ok(response)
    }
}

/// Messages sent from API worker to the main TUI thread
#[derive(Debug, Clone)]
pub enum ApiMessage {
    /// Entity list has been loaded
    EntitiesLoaded(Vec<Entity>),
    /// An error occurred during API communication
    Error(String),
    /// API connection status changed
    ConnectionStatus(bool),
    /// Entity created successfully
    Created(Entity),
}

/// Commands sent from TUI to the API worker
#[derive(Debug, Clone)]
pub enum ApiCommand {
    /// Request to refresh the entity list
    RefreshEntities,
    /// Check API connection status
    CheckConnection,
    /// Create a new entity
    CreateEntity(NewEntity),
    /// Shutdown the API worker
    Shutdown,
}

/// Run the API worker task until `Shutdown` or until the command channel closes
pub async fn run_api_worker(
    client: ApiClient,
    tx: mpsc::Sender<ApiMessage>,
    mut rx: mpsc::Receiver<ApiCommand>,
) {
    while let Some(cmd) = rx.recv().await {
        tracing::debug!(?cmd, "api command");
        match cmd {
            ApiCommand::RefreshEntities => {
                let connected = client.health_check().await;
                tx.send(ApiMessage::ConnectionStatus(connected)).await.ok();
                if !connected {
                    tx.send(ApiMessage::Error("Cannot connect to API".to_string()))
                        .await
                        .ok();
                    continue;
                }
                match client.list_entities().await {
                    Ok(data) => {
                        tx.send(ApiMessage::EntitiesLoaded(data)).await.ok();
                    }
                    Err(e) => {
                        tx.send(ApiMessage::Error(e.to_string())).await.ok();
                    }
                }
            }
            ApiCommand::CheckConnection => {
                let connected = client.health_check().await;
                tx.send(ApiMessage::ConnectionStatus(connected)).await.ok();
            }
            ApiCommand::CreateEntity(dto) => match client.create_entity(&dto).await {
                Ok(entity) => {
                    tracing::info!(id = entity.id, "entity created");
                    tx.send(ApiMessage::Created(entity)).await.ok();
                }
                Err(e) => {
                    tracing::error!(error = %e, "create entity failed");
                    tx.send(ApiMessage::Error(format!("Create entity failed: {}", e)))
                        .await
                        .ok();
                }
            },
            ApiCommand::Shutdown => break,
        }
    }
    tracing::debug!("api worker stopped");
}
