//! services/client/src/adapters/http.rs
//!
//! This module contains the HTTP adapter for the backend API.
//! It implements the `BackendService` port from the `core` crate.

use std::sync::Arc;

use async_trait::async_trait;
use campus_assistant_core::domain::{AuthGrant, Document, UserRecord};
use campus_assistant_core::ports::{
    BackendService, PortError, PortResult, PreferenceStore, KEY_AUTH_TOKEN,
};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

//=========================================================================================
// Request Payload Types
//=========================================================================================

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct AnswerRequest<'a> {
    question: &'a str,
    top_k: u32,
    length: &'a str,
}

#[derive(Serialize)]
struct QuizGenerationRequest<'a> {
    question: &'a str,
    q_type: &'a str,
    count: u32,
    top_k: u32,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `BackendService` over HTTP with `reqwest`.
///
/// The persisted credential is read from the preference store on every
/// request and attached as a Bearer header, so the adapter never caches a
/// token a sibling context may have cleared.
#[derive(Clone)]
pub struct HttpBackendAdapter {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn PreferenceStore>,
}

impl HttpBackendAdapter {
    /// Creates a new `HttpBackendAdapter`.
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        store: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            store,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn credential(&self) -> Option<String> {
        self.store.get(KEY_AUTH_TOKEN).ok().flatten()
    }

    /// Sends a request and checks the status, without reading the body.
    async fn send_unit(&self, request: reqwest::RequestBuilder) -> PortResult<()> {
        self.send(request).await.map(|_| ())
    }

    /// Sends a request and decodes the JSON body.
    async fn send_json(&self, request: reqwest::RequestBuilder) -> PortResult<Value> {
        let response = self.send(request).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| PortError::Malformed(e.to_string()))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> PortResult<reqwest::Response> {
        let request = match self.credential() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| PortError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(PortError::Unauthorized),
            status if !status.is_success() => Err(PortError::Transport(format!(
                "backend returned {}",
                status
            ))),
            _ => Ok(response),
        }
    }
}

//=========================================================================================
// `BackendService` Trait Implementation
//=========================================================================================

#[async_trait]
impl BackendService for HttpBackendAdapter {
    async fn who_am_i(&self) -> PortResult<Value> {
        let body = self.send_json(self.http.get(self.url("/auth/me"))).await?;
        // The endpoint wraps the identity in a `user` field.
        Ok(body.get("user").cloned().unwrap_or(Value::Null))
    }

    async fn login(&self, email: &str, password: &str) -> PortResult<AuthGrant> {
        let body = self
            .send_json(
                self.http
                    .post(self.url("/auth/login"))
                    .json(&LoginRequest { email, password }),
            )
            .await?;
        grant_from_body(body)
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> PortResult<AuthGrant> {
        let body = self
            .send_json(
                self.http
                    .post(self.url("/auth/register"))
                    .json(&RegisterRequest { name, email, password }),
            )
            .await?;
        grant_from_body(body)
    }

    async fn logout(&self) -> PortResult<()> {
        self.send_unit(self.http.post(self.url("/auth/logout"))).await
    }

    async fn list_documents(&self) -> PortResult<Vec<Document>> {
        let body = self.send_json(self.http.get(self.url("/documents"))).await?;

        // The listing may be bare or wrapped in `documents`/`docs`.
        let items = body
            .as_array()
            .or_else(|| body.get("documents").and_then(Value::as_array))
            .or_else(|| body.get("docs").and_then(Value::as_array))
            .ok_or_else(|| {
                PortError::Malformed("document listing was not an array".to_string())
            })?;

        Ok(items.iter().filter_map(document_from_value).collect())
    }

    async fn upload_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        title: Option<&str>,
    ) -> PortResult<()> {
        let file_part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let form = Form::new().part("file", file_part);
        let mut request = self.http.post(self.url("/upload")).multipart(form);
        if let Some(title) = title {
            // The backend reads the title from the query string.
            request = request.query(&[("title", title)]);
        }

        self.send_unit(request).await
    }

    async fn delete_document(&self, document_id: &str) -> PortResult<()> {
        self.send_unit(
            self.http
                .delete(self.url(&format!("/documents/{}", document_id))),
        )
        .await
    }

    async fn answer(&self, question: &str, top_k: u32, length: &str) -> PortResult<Value> {
        self.send_json(
            self.http
                .post(self.url("/answer"))
                .json(&AnswerRequest { question, top_k, length }),
        )
        .await
    }

    async fn summarize(&self, question: &str, top_k: u32, length: &str) -> PortResult<Value> {
        self.send_json(
            self.http
                .post(self.url("/summarize"))
                .json(&AnswerRequest { question, top_k, length }),
        )
        .await
    }

    async fn generate_quiz(
        &self,
        question: &str,
        q_type: &str,
        count: u32,
        top_k: u32,
    ) -> PortResult<Value> {
        self.send_json(
            self.http
                .post(self.url("/generate_quiz"))
                .json(&QuizGenerationRequest { question, q_type, count, top_k }),
        )
        .await
    }
}

//=========================================================================================
// Body Mapping Helpers
//=========================================================================================

/// Builds an auth grant from a login/register body. A missing or empty
/// token is malformed; the caller must not change any local state.
fn grant_from_body(body: Value) -> PortResult<AuthGrant> {
    let token = body
        .get("token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PortError::Malformed("auth response had no token".to_string()))?
        .to_string();

    let user = body.get("user").and_then(UserRecord::from_identity);
    Ok(AuthGrant { token, user })
}

fn document_from_value(item: &Value) -> Option<Document> {
    let obj = item.as_object()?;
    let id = obj
        .get("_id")
        .or_else(|| obj.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let Some(id) = id else {
        warn!("Skipping document record without an id: {item}");
        return None;
    };

    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
    Some(Document {
        id,
        title: text("title"),
        filename: text("filename"),
        page_count: obj.get("num_pages").and_then(Value::as_i64),
        chunk_count: obj.get("num_chunks").and_then(Value::as_i64),
    })
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grants_require_a_non_empty_token() {
        for body in [json!({}), json!({ "token": "" }), json!({ "token": "  " })] {
            assert!(matches!(
                grant_from_body(body),
                Err(PortError::Malformed(_))
            ));
        }

        let grant = grant_from_body(json!({
            "token": "jwt-token",
            "user": { "email": "a@b.c" },
        }))
        .unwrap();
        assert_eq!(grant.token, "jwt-token");
        assert_eq!(grant.user.unwrap().email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn document_records_map_backend_field_names() {
        let doc = document_from_value(&json!({
            "_id": "doc-1",
            "title": "Lecture 1",
            "filename": "uploads/doc-1.pdf",
            "num_pages": 12,
            "num_chunks": 40,
        }))
        .unwrap();
        assert_eq!(doc.id, "doc-1");
        assert_eq!(doc.title.as_deref(), Some("Lecture 1"));
        assert_eq!(doc.page_count, Some(12));
        assert_eq!(doc.chunk_count, Some(40));

        assert!(document_from_value(&json!({ "title": "no id" })).is_none());
        assert!(document_from_value(&json!("not an object")).is_none());
    }
}
