use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Post,
    Get,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Post => "POST",
            Method::Get => "GET",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POST" => Ok(Method::Post),
            "GET" => Ok(Method::Get),
            other => Err(other.to_owned()),
        }
    }
}

/// One item of the workload, as the replay tool will issue it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    /// Header lines in emission order.
    pub headers: Vec<(String, String)>,
    /// Path of the payload file. Write requests of one run share the same allocation.
    pub body: Option<Arc<Path>>,
}

impl Request {
    /// A write of `key{key}` whose body is read from `payload` at replay time.
    pub fn store(base_url: &str, key: u64, content_type: &str, payload: &Arc<Path>) -> Self {
        Request {
            method: Method::Post,
            url: format!("{base_url}/store/{}", key_name(key)),
            headers: vec![("Content-Type".to_owned(), content_type.to_owned())],
            body: Some(Arc::clone(payload)),
        }
    }

    pub fn get(base_url: &str, key: u64) -> Self {
        Request {
            method: Method::Get,
            url: format!("{base_url}/get/{}", key_name(key)),
            headers: Vec::new(),
            body: None,
        }
    }

    /// The key identifier is the last path segment of the target.
    pub fn key(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or_default()
    }
}

pub fn key_name(key: u64) -> String {
    format!("key{key}")
}
