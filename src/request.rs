use std::error::Error;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::App;
use crate::error::RequestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub path: String,
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn get(path: &str) -> RequestOptions {
        RequestOptions {
            path: path.to_owned(),
            method: Method::Get,
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn delete(path: &str) -> RequestOptions {
        RequestOptions {
            method: Method::Delete,
            ..RequestOptions::get(path)
        }
    }

    pub fn post(path: &str, body: Value) -> RequestOptions {
        RequestOptions {
            method: Method::Post,
            body: Some(body),
            ..RequestOptions::get(path)
        }
    }

    pub fn put(path: &str, body: Value) -> RequestOptions {
        RequestOptions {
            method: Method::Put,
            body: Some(body),
            ..RequestOptions::get(path)
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> RequestOptions {
        self.headers.push((key.to_owned(), value.to_owned()));
        self
    }
}

/// Fully resolved request, ready for a transport.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub url: String,
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// The network stack lives outside this crate; anything that can deliver a
/// prepared request satisfies the seam.
pub trait Transport {
    fn send(
        &self,
        request: &PreparedRequest,
    ) -> Result<HttpResponse, Box<dyn Error + Send + Sync + 'static>>;
}

pub struct Client<T: Transport> {
    base_url: String,
    timeout_ms: u64,
    user_id: Option<String>,
    transport: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl<T: Transport> Client<T> {
    pub fn new(app: &App, user_id: Option<String>, transport: T) -> Client<T> {
        Client {
            base_url: app.base_url.clone(),
            timeout_ms: app.timeout_ms,
            user_id,
            transport,
        }
    }

    /// Session identity rides along on every call: query parameter for GET
    /// and DELETE, body field for POST and PUT (only when not already set).
    pub fn prepare(&self, options: RequestOptions) -> PreparedRequest {
        let RequestOptions {
            mut path,
            method,
            mut body,
            headers,
        } = options;

        if let Some(user_id) = &self.user_id {
            match method {
                Method::Get | Method::Delete => {
                    let sep = if path.contains('?') { '&' } else { '?' };
                    path = format!("{}{}user_id={}", path, sep, urlencoding::encode(user_id));
                }
                Method::Post | Method::Put => {
                    let body = body.get_or_insert_with(|| Value::Object(Default::default()));
                    if let Value::Object(map) = body {
                        if !map.contains_key("user_id") {
                            map.insert("user_id".to_owned(), Value::String(user_id.clone()));
                        }
                    }
                }
            }
        }

        let mut merged = vec![("Content-Type".to_owned(), "application/json".to_owned())];
        for (key, value) in headers {
            set_header(&mut merged, key, value);
        }

        PreparedRequest {
            url: format!("{}{}", self.base_url, path),
            method,
            body,
            headers: merged,
            timeout_ms: self.timeout_ms,
        }
    }

    /// Sends the request; anything other than 200 becomes a typed error
    /// carrying the server-supplied message when one decodes.
    pub fn send(&self, options: RequestOptions) -> Result<HttpResponse, RequestError> {
        let request = self.prepare(options);
        let response = self
            .transport
            .send(&request)
            .map_err(RequestError::Transport)?;

        if response.status != 200 {
            tracing::warn!(
                status = response.status,
                method = request.method.as_str(),
                url = %request.url,
                "request failed"
            );
            let message = serde_json::from_str::<ErrorBody>(&response.body)
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| "request failed".to_owned());
            return Err(RequestError::Status {
                status: response.status,
                message,
            });
        }

        Ok(response)
    }

    pub fn get_json<D: DeserializeOwned>(&self, path: &str) -> Result<D, RequestError> {
        let response = self.send(RequestOptions::get(path))?;
        Ok(serde_json::from_str(&response.body)?)
    }
}

fn set_header(headers: &mut Vec<(String, String)>, key: String, value: String) {
    for (existing_key, existing_value) in headers.iter_mut() {
        if existing_key.eq_ignore_ascii_case(&key) {
            *existing_value = value;
            return;
        }
    }
    headers.push((key, value));
}
