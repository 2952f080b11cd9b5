//! Plaintext target descriptor read by the replay tool.
//!
//! Every request is one block, terminated by a blank line:
//!
//! ```text
//! POST http://127.0.0.1:3000/store/key1
//! Content-Type: text/plain
//! @./test_value.json
//!
//! GET http://127.0.0.1:3000/get/key7
//!
//! ```
//!
//! Bodies are never inlined, `@<path>` points at a file the replay tool reads.

use crate::output::write_atomic;
use crate::request::{Method, Request};
use anyhow::{Context, Result, bail};
use std::collections::{BTreeSet, HashSet};
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use thousands::Separable;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: unknown method `{method}`")]
    UnknownMethod { line: usize, method: String },
    #[error("line {line}: request line has no url")]
    MissingUrl { line: usize },
    #[error("line {line}: unexpected `{token}` after the url")]
    TrailingToken { line: usize, token: String },
    #[error("line {line}: malformed header `{text}`")]
    MalformedHeader { line: usize, text: String },
    #[error("line {line}: request already has a body reference")]
    DuplicateBody { line: usize },
}

pub fn write_requests<'a>(
    w: &mut dyn Write,
    requests: impl IntoIterator<Item = &'a Request>,
) -> std::io::Result<()> {
    for r in requests {
        writeln!(w, "{} {}", r.method, r.url)?;
        for (name, value) in &r.headers {
            writeln!(w, "{name}: {value}")?;
        }
        if let Some(body) = &r.body {
            writeln!(w, "@{}", body.display())?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Writes all requests to `path`, replacing it atomically. Payload files are not checked.
pub fn save<'a>(path: &Path, requests: impl IntoIterator<Item = &'a Request>) -> Result<()> {
    write_atomic(path, |w| write_requests(w, requests))?;
    info!(path = %path.display(), "wrote descriptor");
    Ok(())
}

pub fn parse(text: &str) -> Result<Vec<Request>, ParseError> {
    let mut requests = Vec::new();
    let mut current: Option<Request> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end_matches('\r');

        if line.trim().is_empty() {
            requests.extend(current.take());
            continue;
        }

        let Some(req) = current.as_mut() else {
            current = Some(parse_request_line(line, line_no)?);
            continue;
        };

        if let Some(path) = line.strip_prefix('@') {
            if req.body.is_some() {
                return Err(ParseError::DuplicateBody { line: line_no });
            }
            req.body = Some(Arc::from(PathBuf::from(path)));
        } else {
            let header = line.split_once(':').and_then(|(name, value)| {
                let name = name.trim();
                (!name.is_empty() && !name.contains(char::is_whitespace))
                    .then(|| (name.to_owned(), value.trim().to_owned()))
            });
            match header {
                Some(h) => req.headers.push(h),
                None => {
                    return Err(ParseError::MalformedHeader {
                        line: line_no,
                        text: line.to_owned(),
                    });
                }
            }
        }
    }
    requests.extend(current);
    Ok(requests)
}

fn parse_request_line(line: &str, line_no: usize) -> Result<Request, ParseError> {
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let method: Method = method.parse().map_err(|method| ParseError::UnknownMethod {
        line: line_no,
        method,
    })?;
    let url = parts.next().ok_or(ParseError::MissingUrl { line: line_no })?;
    if let Some(token) = parts.next() {
        return Err(ParseError::TrailingToken {
            line: line_no,
            token: token.to_owned(),
        });
    }
    Ok(Request {
        method,
        url: url.to_owned(),
        headers: Vec::new(),
        body: None,
    })
}

pub fn load(path: &Path) -> Result<Vec<Request>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read descriptor {}", path.display()))?;
    let requests =
        parse(&text).with_context(|| format!("failed to parse descriptor {}", path.display()))?;
    debug!(path = %path.display(), requests = requests.len(), "loaded descriptor");
    Ok(requests)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DescriptorReport {
    pub blocks: u64,
    pub posts: u64,
    pub gets: u64,
    pub distinct_keys: u64,
    /// GET blocks carrying a body reference; replay tools usually ignore it.
    pub gets_with_body: u64,
    pub payloads: BTreeSet<PathBuf>,
}

impl Display for DescriptorReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "blocks: {} | POST: {} | GET: {} | distinct keys: {}",
            self.blocks.separate_with_underscores(),
            self.posts.separate_with_underscores(),
            self.gets.separate_with_underscores(),
            self.distinct_keys.separate_with_underscores()
        )?;
        if self.gets_with_body > 0 {
            writeln!(
                f,
                "GET requests with a body reference: {}",
                self.gets_with_body.separate_with_underscores()
            )?;
        }
        let payloads: Vec<String> = self.payloads.iter().map(|p| p.display().to_string()).collect();
        write!(f, "payloads: {}", payloads.join(", "))
    }
}

pub fn summarize(requests: &[Request]) -> DescriptorReport {
    let mut report = DescriptorReport::default();
    let mut keys = HashSet::new();
    for r in requests {
        report.blocks += 1;
        match r.method {
            Method::Post => report.posts += 1,
            Method::Get => {
                report.gets += 1;
                if r.body.is_some() {
                    report.gets_with_body += 1;
                }
            }
        }
        keys.insert(r.key());
        if let Some(body) = &r.body {
            report.payloads.insert(body.to_path_buf());
        }
    }
    report.distinct_keys = keys.len() as u64;
    report
}

/// Loads a descriptor and verifies that every payload it references exists.
/// Relative payload paths are resolved against the descriptor's directory.
pub fn check(path: &Path) -> Result<DescriptorReport> {
    let requests = load(path)?;
    let report = summarize(&requests);
    let base = path.parent().unwrap_or(Path::new(""));
    for payload in &report.payloads {
        let resolved = base.join(payload);
        if !resolved.is_file() {
            bail!(
                "payload {} referenced by {} does not exist (looked for {})",
                payload.display(),
                path.display(),
                resolved.display()
            );
        }
    }
    Ok(report)
}
