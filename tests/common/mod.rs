#![allow(dead_code)]

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use taskbase_api::api;
use taskbase_api::config::RegistryConfig;
use taskbase_api::database::MemoryStore;
use taskbase_api::registry::{Registry, RegistryBuilder};

pub const TASK_DEFINITION: &str = r#"{
    "name": "Task",
    "type": "object",
    "properties": {
        "title": { "type": "string" },
        "code": { "type": "string", "unique": true },
        "points": { "type": "integer" },
        "done": { "type": "boolean", "default": false },
        "priority": { "type": "string", "enum": ["low", "medium", "high", "urgent"], "default": "medium" },
        "due": { "type": "string", "format": "date-time" },
        "subtasks": {
            "type": "array",
            "items": {
                "type": "object",
                "properties": { "name": { "type": "string" }, "done": { "type": "boolean" } }
            }
        }
    },
    "required": ["title"]
}"#;

/// Descriptor directory plus the registry built from it
pub struct TestRegistry {
    pub dir: TempDir,
    pub store: MemoryStore,
    pub registry: Arc<Registry>,
}

/// Write `files` into a fresh directory and build a registry over it
pub fn registry_with(files: &[(&str, &str)]) -> Result<TestRegistry> {
    let dir = tempfile::tempdir()?;
    for (name, body) in files {
        fs::write(dir.path().join(name), body).with_context(|| format!("writing {}", name))?;
    }

    let config = RegistryConfig { definitions_dir: dir.path().to_path_buf(), ..Default::default() };
    let store = MemoryStore::new();
    let registry = RegistryBuilder::new(config, Arc::new(store.clone())).discover().build();

    Ok(TestRegistry { dir, store, registry: Arc::new(registry) })
}

/// The full HTTP router over an in-memory store
pub struct TestApp {
    pub router: Router,
    pub registry: Arc<Registry>,
    _dir: TempDir,
}

impl TestApp {
    pub fn new(files: &[(&str, &str)]) -> Result<Self> {
        let built = registry_with(files)?;
        Ok(Self {
            router: api::router(built.registry.clone()),
            registry: built.registry,
            _dir: built.dir,
        })
    }

    pub fn with_tasks() -> Result<Self> {
        Self::new(&[("Task.json", TASK_DEFINITION)])
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let payload = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok((status, payload))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Register an account and return its token
    pub async fn register(&self, email: &str, password: &str) -> Result<(StatusCode, Value)> {
        self.request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": email, "password": password, "full_name": "Test User" })),
        )
        .await
    }

    pub async fn token(&self) -> Result<String> {
        let email = format!("user-{}@example.com", uuid::Uuid::new_v4().simple());
        let (status, payload) = self.register(&email, "correct horse battery").await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, payload);
        payload["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("token missing from register response")
    }
}
