//! Schema Registry HTTP 客户端
//!
//! 使用 Confluent REST API：
//! - `POST /subjects/{subject}/versions` 注册
//! - `POST /subjects/{subject}` 查询已注册 schema
//! - `GET /schemas/ids/{id}` 按 id 获取

use std::time::Duration;

use async_trait::async_trait;
use courier_config::SchemaRegistryConfig;
use courier_errors::{AppError, AppResult};
use courier_ports::SchemaRegistry;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

pub const SCHEMA_REGISTRY_CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";

const ACCEPT_TYPES: &str =
    "application/vnd.schemaregistry.v1+json, application/vnd.schemaregistry+json, application/json";

#[derive(Debug, Serialize)]
struct SchemaRequest<'a> {
    schema: &'a str,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: i32,
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    schema: String,
}

/// Registry 返回的错误体
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error_code: i32,
    message: String,
}

/// Basic 认证凭证
#[derive(Clone)]
struct BasicAuth {
    user: String,
    password: Option<Secret<String>>,
}

/// Schema Registry HTTP 客户端
pub struct HttpSchemaRegistry {
    base_url: Url,
    http_client: reqwest::Client,
    auth: Option<BasicAuth>,
}

impl HttpSchemaRegistry {
    /// 创建客户端（不发起请求）
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            AppError::config(format!("Invalid schema registry url '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::config(format!(
                "Schema registry url '{}' cannot be a base url",
                base_url
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            http_client,
            auth: None,
        })
    }

    /// 从配置创建
    pub fn from_config(config: &SchemaRegistryConfig) -> AppResult<Self> {
        let mut client = Self::new(&config.url, config.request_timeout())?;
        if let Some(user) = &config.basic_auth_user {
            client = client.with_basic_auth(user.clone(), config.basic_auth_password.clone());
        }

        info!(url = %client.base_url, "Schema registry client created");
        Ok(client)
    }

    pub fn with_basic_auth(mut self, user: impl Into<String>, password: Option<Secret<String>>) -> Self {
        self.auth = Some(BasicAuth {
            user: user.into(),
            password,
        });
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 检查 Registry 是否可达
    pub async fn check(&self) -> AppResult<()> {
        let _: Vec<String> = self.send(self.request(Method::GET, &["subjects"])?).await?;
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::config("Schema registry url cannot be a base url"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> AppResult<RequestBuilder> {
        let mut request = self
            .http_client
            .request(method, self.endpoint(segments)?)
            .header(ACCEPT, ACCEPT_TYPES);

        if let Some(auth) = &self.auth {
            request = request.basic_auth(
                &auth.user,
                auth.password.as_ref().map(|p| p.expose_secret().as_str()),
            );
        }

        Ok(request)
    }

    fn with_schema(request: RequestBuilder, schema: &str) -> AppResult<RequestBuilder> {
        let body = serde_json::to_vec(&SchemaRequest { schema })
            .map_err(|e| AppError::serialization(format!("Failed to encode request: {}", e)))?;
        Ok(request.header(CONTENT_TYPE, SCHEMA_REGISTRY_CONTENT_TYPE).body(body))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = request.send().await.map_err(|e| {
            AppError::schema_unavailable(format!("Schema registry request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        response.json().await.map_err(|e| {
            AppError::schema_unavailable(format!("Failed to parse schema registry response: {}", e))
        })
    }

    async fn error_from(response: Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let detail = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(error) => format!("{} (error code {})", error.message, error.error_code),
            Err(_) => body,
        };

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = %status, "Schema registry rejected credentials");
        }

        AppError::schema_unavailable(format!("Schema registry returned {}: {}", status, detail))
    }
}

#[async_trait]
impl SchemaRegistry for HttpSchemaRegistry {
    async fn register(&self, subject: &str, schema: &str) -> AppResult<i32> {
        let request = self.request(Method::POST, &["subjects", subject, "versions"])?;
        let response: IdResponse = self.send(Self::with_schema(request, schema)?).await?;

        debug!(subject = subject, schema_id = response.id, "Schema registered");
        Ok(response.id)
    }

    async fn lookup(&self, subject: &str, schema: &str) -> AppResult<i32> {
        let request = self.request(Method::POST, &["subjects", subject])?;
        let response: IdResponse = self.send(Self::with_schema(request, schema)?).await?;

        debug!(subject = subject, schema_id = response.id, "Schema found");
        Ok(response.id)
    }

    async fn schema_by_id(&self, id: i32) -> AppResult<String> {
        let id = id.to_string();
        let request = self.request(Method::GET, &["schemas", "ids", &id])?;
        let response: SchemaResponse = self.send(request).await?;
        Ok(response.schema)
    }
}
