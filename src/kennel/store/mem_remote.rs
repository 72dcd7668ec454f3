//! In-memory stand-in for the GitHub contents API.
//!
//! Speaks the same URLs and JSON shapes as the real service under a `mem://`
//! scheme, including git-style blob shas, wrapped base64, the blob fallback for
//! large files and sha-checked updates. Used by the test suites and by
//! embedders that want a remote without a network.

use super::transport::{HttpResponse, Transport};
use crate::config::RemoteConfig;
use crate::error::{KennelError, Result};
use crate::model::Document;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::BTreeMap;

const API_BASE: &str = "mem://api";
const RAW_BASE: &str = "mem://raw";
const OWNER: &str = "breeder";
const REPO: &str = "site";
const BRANCH: &str = "main";

struct StoredFile {
    bytes: Vec<u8>,
    sha: String,
}

impl StoredFile {
    fn new(bytes: Vec<u8>) -> Self {
        let sha = blob_sha(&bytes);
        Self { bytes, sha }
    }
}

struct State {
    files: BTreeMap<String, StoredFile>,
    offline: bool,
    inline_limit: usize,
    accepted_token: Option<String>,
    pending_edit: Option<(String, Vec<u8>)>,
    fail_next_get: Option<u16>,
    fail_next_put: Option<u16>,
    puts: usize,
}

pub struct MemContentsApi {
    state: RefCell<State>,
}

impl Default for MemContentsApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MemContentsApi {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                files: BTreeMap::new(),
                offline: false,
                inline_limit: 1024 * 1024,
                accepted_token: None,
                pending_edit: None,
                fail_next_get: None,
                fail_next_put: None,
                puts: 0,
            }),
        }
    }

    /// Remote settings pointing at this instance.
    pub fn remote_config() -> RemoteConfig {
        RemoteConfig {
            owner: OWNER.to_string(),
            repo: REPO.to_string(),
            branch: BRANCH.to_string(),
            api_base: API_BASE.to_string(),
            raw_base: RAW_BASE.to_string(),
            ..Default::default()
        }
    }

    pub fn seed_document(&self, path: &str, doc: &Document) {
        let bytes = serde_json::to_vec_pretty(doc).unwrap_or_default();
        self.seed_bytes(path, &bytes);
    }

    pub fn seed_bytes(&self, path: &str, bytes: &[u8]) {
        self.state
            .borrow_mut()
            .files
            .insert(path.to_string(), StoredFile::new(bytes.to_vec()));
    }

    pub fn document(&self, path: &str) -> Option<Document> {
        serde_json::from_slice(&self.file_bytes(path)?).ok()
    }

    pub fn file_bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.state.borrow().files.get(path).map(|f| f.bytes.clone())
    }

    pub fn sha(&self, path: &str) -> Option<String> {
        self.state.borrow().files.get(path).map(|f| f.sha.clone())
    }

    /// Every request fails at the transport level while set.
    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    /// Files larger than this are served without inline content.
    pub fn set_inline_limit(&self, bytes: usize) {
        self.state.borrow_mut().inline_limit = bytes;
    }

    /// Only PUTs carrying this token are accepted. Unset accepts any token.
    pub fn require_token(&self, token: &str) {
        self.state.borrow_mut().accepted_token = Some(token.to_string());
    }

    /// Simulates another writer committing `doc` right before the next PUT.
    pub fn edit_before_next_put(&self, path: &str, doc: &Document) {
        let bytes = serde_json::to_vec_pretty(doc).unwrap_or_default();
        self.state.borrow_mut().pending_edit = Some((path.to_string(), bytes));
    }

    /// The next GET answers with `status` instead of the file.
    pub fn fail_next_get(&self, status: u16) {
        self.state.borrow_mut().fail_next_get = Some(status);
    }

    pub fn fail_next_put(&self, status: u16) {
        self.state.borrow_mut().fail_next_put = Some(status);
    }

    /// PUT requests received, accepted or not.
    pub fn put_count(&self) -> usize {
        self.state.borrow().puts
    }

    fn check_online(&self) -> Result<()> {
        if self.state.borrow().offline {
            return Err(KennelError::Transport("network unreachable".to_string()));
        }
        Ok(())
    }

    fn contents_get(&self, path: &str) -> HttpResponse {
        let state = self.state.borrow();
        let Some(file) = state.files.get(path) else {
            return not_found();
        };
        let inline = file.bytes.len() <= state.inline_limit;
        let body = json!({
            "name": path.rsplit('/').next().unwrap_or(path),
            "path": path,
            "sha": file.sha,
            "size": file.bytes.len(),
            "type": "file",
            "encoding": if inline { "base64" } else { "none" },
            "content": if inline { wrapped_base64(&file.bytes) } else { String::new() },
        });
        HttpResponse::new(200, body.to_string())
    }

    fn blob_get(&self, sha: &str) -> HttpResponse {
        let state = self.state.borrow();
        match state.files.values().find(|f| f.sha == sha) {
            Some(file) => HttpResponse::new(
                200,
                json!({
                    "sha": file.sha,
                    "size": file.bytes.len(),
                    "encoding": "base64",
                    "content": wrapped_base64(&file.bytes),
                })
                .to_string(),
            ),
            None => not_found(),
        }
    }

    fn raw_get(&self, path: &str) -> HttpResponse {
        match self.state.borrow().files.get(path) {
            Some(file) => HttpResponse::new(200, String::from_utf8_lossy(&file.bytes)),
            None => HttpResponse::new(404, "404: Not Found"),
        }
    }

    fn contents_put(&self, path: &str, token: &str, body: &serde_json::Value) -> HttpResponse {
        let mut state = self.state.borrow_mut();
        state.puts += 1;

        if let Some((edit_path, bytes)) = state.pending_edit.take() {
            state.files.insert(edit_path, StoredFile::new(bytes));
        }
        if let Some(status) = state.fail_next_put.take() {
            return HttpResponse::new(status, r#"{"message":"Server Error"}"#);
        }
        if let Some(accepted) = &state.accepted_token {
            if accepted != token {
                return HttpResponse::new(401, r#"{"message":"Bad credentials"}"#);
            }
        }

        let Some(bytes) = body["content"]
            .as_str()
            .and_then(|c| STANDARD.decode(c).ok())
        else {
            return HttpResponse::new(422, r#"{"message":"content is not valid Base64"}"#);
        };
        let sent_sha = body["sha"].as_str();
        match (state.files.get(path), sent_sha) {
            (Some(current), Some(sha)) if current.sha != sha => {
                return HttpResponse::new(
                    409,
                    format!(r#"{{"message":"{path} does not match {sha}"}}"#),
                )
            }
            (Some(_), None) => {
                return HttpResponse::new(422, r#"{"message":"\"sha\" wasn't supplied."}"#)
            }
            _ => {}
        }

        let created = !state.files.contains_key(path);
        let file = StoredFile::new(bytes);
        let sha = file.sha.clone();
        state.files.insert(path.to_string(), file);
        HttpResponse::new(
            if created { 201 } else { 200 },
            json!({ "content": { "path": path, "sha": sha }, "commit": { "message": body["message"] } })
                .to_string(),
        )
    }
}

impl Transport for MemContentsApi {
    fn get(&self, url: &str, _token: Option<&str>) -> Result<HttpResponse> {
        self.check_online()?;
        if let Some(status) = self.state.borrow_mut().fail_next_get.take() {
            return Ok(HttpResponse::new(status, r#"{"message":"Server Error"}"#));
        }
        let (url, _query) = url.split_once('?').unwrap_or((url, ""));
        let repo_root = format!("{API_BASE}/repos/{OWNER}/{REPO}/");
        let raw_root = format!("{RAW_BASE}/{OWNER}/{REPO}/{BRANCH}/");

        if let Some(rest) = url.strip_prefix(&repo_root) {
            if let Some(path) = rest.strip_prefix("contents/") {
                return Ok(self.contents_get(path));
            }
            if let Some(sha) = rest.strip_prefix("git/blobs/") {
                return Ok(self.blob_get(sha));
            }
        }
        if let Some(path) = url.strip_prefix(&raw_root) {
            return Ok(self.raw_get(path));
        }
        Ok(not_found())
    }

    fn put(&self, url: &str, token: &str, body: &serde_json::Value) -> Result<HttpResponse> {
        self.check_online()?;
        let contents_root = format!("{API_BASE}/repos/{OWNER}/{REPO}/contents/");
        match url.strip_prefix(&contents_root) {
            Some(path) => Ok(self.contents_put(path, token, body)),
            None => Ok(not_found()),
        }
    }
}

fn not_found() -> HttpResponse {
    HttpResponse::new(404, r#"{"message":"Not Found"}"#)
}

/// Git blob id, computed the way git does but over SHA-256.
fn blob_sha(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("blob {}\0", bytes.len()).as_bytes());
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// The API wraps base64 content at 60 columns.
fn wrapped_base64(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / 60 + 1);
    for (i, chunk) in encoded.as_bytes().chunks(60).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&String::from_utf8_lossy(chunk));
    }
    out.push('\n');
    out
}

/// Wraps the in-memory API to script what happens around individual GETs:
/// transport outages, and another writer committing right after a read.
#[cfg(test)]
pub(crate) struct Interleaved {
    api: std::rc::Rc<MemContentsApi>,
    failing_gets: std::cell::Cell<usize>,
    commit_after_get: RefCell<Option<(String, Document)>>,
}

#[cfg(test)]
impl Interleaved {
    pub fn new(api: std::rc::Rc<MemContentsApi>) -> Self {
        Self {
            api,
            failing_gets: std::cell::Cell::new(0),
            commit_after_get: RefCell::new(None),
        }
    }

    /// The next `count` GETs fail at the transport level.
    pub fn fail_gets(&self, count: usize) {
        self.failing_gets.set(count);
    }

    /// Another writer commits `doc` at `path` as soon as the next GET returns.
    pub fn commit_after_next_get(&self, path: &str, doc: &Document) {
        *self.commit_after_get.borrow_mut() = Some((path.to_string(), doc.clone()));
    }
}

#[cfg(test)]
impl Transport for Interleaved {
    fn get(&self, url: &str, token: Option<&str>) -> Result<HttpResponse> {
        let failing = self.failing_gets.get();
        if failing > 0 {
            self.failing_gets.set(failing - 1);
            return Err(KennelError::Transport("connection reset".to_string()));
        }
        let resp = self.api.get(url, token)?;
        if let Some((path, doc)) = self.commit_after_get.borrow_mut().take() {
            self.api.seed_document(&path, &doc);
        }
        Ok(resp)
    }

    fn put(&self, url: &str, token: &str, body: &serde_json::Value) -> Result<HttpResponse> {
        self.api.put(url, token, body)
    }
}
