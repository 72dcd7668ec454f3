//! # Remote Document Store
//!
//! One JSON document in a GitHub repository, read and written through the
//! contents API. Updates carry the blob `sha` last seen for the file; GitHub
//! rejects a stale `sha`, which is how concurrent writers are detected.
//!
//! Reads degrade to the empty document instead of failing: callers get "no
//! data available", never an error. [`RemoteDocumentStore::try_read`] keeps the
//! distinction between "unavailable" and "empty" for the callers that need it.
//!
//! Nothing here retries. A failed write is reported and the next attempt is a
//! new user action.

use super::transport::{HttpResponse, Transport};
use crate::config::RemoteConfig;
use crate::credentials::CredentialProvider;
use crate::error::{KennelError, Result};
use crate::model::Document;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::rc::Rc;
use tracing::{debug, error, info, warn};

/// A file entry as returned by `GET /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Deserialize)]
struct ContentsEntry {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct BlobEntry {
    content: String,
}

/// The remote document together with the revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    pub document: Document,
    pub sha: String,
}

/// A document file and its revision. `document` is `None` when the file
/// exists but does not hold a readable document.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteHead {
    pub sha: String,
    pub document: Option<Document>,
}

/// Result of a document write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteWrite {
    Committed { sha: String },
    /// The revision token was stale: someone else wrote first.
    Conflict,
    Failed(String),
}

impl RemoteWrite {
    pub fn is_committed(&self) -> bool {
        matches!(self, RemoteWrite::Committed { .. })
    }
}

pub struct RemoteDocumentStore<T: Transport> {
    transport: T,
    credentials: Rc<dyn CredentialProvider>,
    config: RemoteConfig,
}

impl<T: Transport> RemoteDocumentStore<T> {
    pub fn new(transport: T, credentials: Rc<dyn CredentialProvider>, config: RemoteConfig) -> Self {
        Self {
            transport,
            credentials,
            config,
        }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn has_credential(&self) -> bool {
        self.credentials.is_present()
    }

    fn api_root(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo
        )
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/contents/{}", self.api_root(), path.trim_start_matches('/'))
    }

    /// Public URL of a file on the configured branch.
    pub fn raw_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.config.raw_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            self.config.branch,
            path.trim_start_matches('/')
        )
    }

    /// Current entry for `path`. `Ok(None)` only when the file does not exist;
    /// any other non-success answer is an error, so callers never mistake an
    /// outage for a missing document.
    fn fetch_entry(&self, path: &str, token: Option<&str>) -> Result<Option<ContentsEntry>> {
        let url = format!("{}?ref={}", self.contents_url(path), self.config.branch);
        let resp = self.transport.get(&url, token)?;
        if resp.status == 404 {
            debug!(path, "no file at path");
            return Ok(None);
        }
        if !resp.is_success() {
            return Err(KennelError::Transport(format!(
                "contents lookup for {path} returned HTTP {}: {}",
                resp.status,
                snippet(&resp.body)
            )));
        }
        serde_json::from_str::<ContentsEntry>(&resp.body)
            .map(Some)
            .map_err(|e| KennelError::Transport(format!("unexpected contents response: {e}")))
    }

    /// Base64 payload of an entry. Files over 1 MB come back without inline
    /// content and have to be fetched through the blob endpoint.
    fn entry_payload(&self, entry: &ContentsEntry, token: Option<&str>) -> Result<String> {
        if entry.encoding == "base64" && (!entry.content.is_empty() || entry.size == 0) {
            return Ok(entry.content.clone());
        }
        let url = format!("{}/git/blobs/{}", self.api_root(), entry.sha);
        let resp = self.transport.get(&url, token)?;
        if !resp.is_success() {
            return Err(KennelError::Transport(format!(
                "blob lookup returned HTTP {}",
                resp.status
            )));
        }
        serde_json::from_str::<BlobEntry>(&resp.body)
            .map(|blob| blob.content)
            .map_err(|e| KennelError::Transport(format!("unexpected blob response: {e}")))
    }

    /// The document and the revision it was read at, in one round trip.
    /// `Ok(None)` when the file does not exist yet.
    pub fn read_for_update(&self) -> Result<Option<RemoteHead>> {
        let token = self.credentials.get();
        let Some(entry) = self.fetch_entry(&self.config.path, token.as_deref())? else {
            return Ok(None);
        };
        let payload = self.entry_payload(&entry, token.as_deref())?;
        let document = match decode_document(&payload) {
            Ok(document) => Some(document),
            Err(e) => {
                warn!(error = %e, "remote document could not be decoded");
                None
            }
        };
        Ok(Some(RemoteHead {
            sha: entry.sha,
            document,
        }))
    }

    /// Credentialed read that keeps "unavailable" (`Ok(None)` or `Err`)
    /// apart from an actually empty document.
    pub fn try_read(&self) -> Result<Option<RemoteFile>> {
        Ok(self.read_for_update()?.and_then(|head| {
            head.document.map(|document| RemoteFile {
                document,
                sha: head.sha,
            })
        }))
    }

    /// Current document, or the empty default on any failure.
    pub fn read(&self) -> Document {
        match self.try_read() {
            Ok(Some(file)) => file.document,
            Ok(None) => Document::default(),
            Err(e) => {
                warn!(error = %e, "remote read failed");
                Document::default()
            }
        }
    }

    /// Unauthenticated read from the raw mirror.
    pub fn try_read_public(&self) -> Result<Option<Document>> {
        let resp = self.transport.get(&self.raw_url(&self.config.path), None)?;
        if !resp.is_success() {
            debug!(status = resp.status, "public mirror has no document");
            return Ok(None);
        }
        match serde_json::from_str(&resp.body) {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                warn!(error = %e, "public document could not be parsed");
                Ok(None)
            }
        }
    }

    pub fn read_public(&self) -> Document {
        match self.try_read_public() {
            Ok(Some(document)) => document,
            Ok(None) => Document::default(),
            Err(e) => {
                warn!(error = %e, "public read failed");
                Document::default()
            }
        }
    }

    /// Write the document at whatever revision is current right now. Only for
    /// callers that did not read the document first; everyone else should
    /// pass the revision they read to [`RemoteDocumentStore::write_at`].
    pub fn write(&self, doc: &Document) -> Result<RemoteWrite> {
        let token = self.credentials.get().ok_or(KennelError::NoCredential)?;
        let sha = match self.fetch_entry(&self.config.path, Some(&token)) {
            Ok(entry) => entry.map(|e| e.sha),
            Err(e) => {
                error!(error = %e, "revision lookup failed");
                return Ok(RemoteWrite::Failed(e.to_string()));
            }
        };
        self.write_at(doc, sha.as_deref())
    }

    /// Write the document over revision `expected_sha` (`None`: the file must
    /// not exist yet). Any commit since that revision makes GitHub reject the
    /// write, which surfaces as [`RemoteWrite::Conflict`].
    pub fn write_at(&self, doc: &Document, expected_sha: Option<&str>) -> Result<RemoteWrite> {
        let token = self.credentials.get().ok_or(KennelError::NoCredential)?;

        let content = serde_json::to_string_pretty(doc)?;
        let message = format!("Update site data - {}", Utc::now().to_rfc3339());
        let body = put_body(&message, content.as_bytes(), &self.config.branch, expected_sha);

        let outcome = match self
            .transport
            .put(&self.contents_url(&self.config.path), &token, &body)
        {
            Ok(resp) => classify_put(resp),
            Err(e) => RemoteWrite::Failed(e.to_string()),
        };
        match &outcome {
            RemoteWrite::Committed { sha } => {
                info!(sha = %sha, items = doc.item_count(), "document committed")
            }
            RemoteWrite::Conflict => warn!("document changed remotely, write rejected"),
            RemoteWrite::Failed(reason) => error!(%reason, "document write failed"),
        }
        Ok(outcome)
    }

    /// Commit a binary file at `{asset_dir}/{name}` and return its public URL.
    pub fn commit_asset(&self, bytes: &[u8], name: &str) -> Result<String> {
        let token = self.credentials.get().ok_or(KennelError::NoCredential)?;
        let path = if self.config.asset_dir.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.config.asset_dir.trim_matches('/'), name)
        };

        let sha = self.fetch_entry(&path, Some(&token))?.map(|e| e.sha);
        let body = put_body(
            &format!("Upload {path}"),
            bytes,
            &self.config.branch,
            sha.as_deref(),
        );
        let resp = self.transport.put(&self.contents_url(&path), &token, &body)?;
        match classify_put(resp) {
            RemoteWrite::Committed { .. } => {
                let url = self.raw_url(&path);
                info!(%url, "asset committed");
                Ok(url)
            }
            RemoteWrite::Conflict => Err(KennelError::RevisionConflict),
            RemoteWrite::Failed(reason) => Err(KennelError::Store(format!(
                "asset upload failed: {reason}"
            ))),
        }
    }
}

fn put_body(message: &str, bytes: &[u8], branch: &str, sha: Option<&str>) -> serde_json::Value {
    let mut body = json!({
        "message": message,
        "content": STANDARD.encode(bytes),
        "branch": branch,
    });
    if let Some(sha) = sha {
        body["sha"] = json!(sha);
    }
    body
}

fn classify_put(resp: HttpResponse) -> RemoteWrite {
    if resp.is_success() {
        let sha = serde_json::from_str::<serde_json::Value>(&resp.body)
            .ok()
            .and_then(|v| v["content"]["sha"].as_str().map(str::to_string))
            .unwrap_or_default();
        return RemoteWrite::Committed { sha };
    }
    match resp.status {
        409 | 422 => RemoteWrite::Conflict,
        status => RemoteWrite::Failed(format!("HTTP {status}: {}", snippet(&resp.body))),
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

/// Decode the API's base64 (wrapped at 60 columns) and parse the UTF-8 JSON.
pub(crate) fn decode_document(payload: &str) -> Result<Document> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| KennelError::Store(format!("invalid base64 content: {e}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| KennelError::Store(format!("document is not UTF-8: {e}")))?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use crate::model::{ItemId, NewItem};
    use crate::store::mem_remote::MemContentsApi;

    fn remote(token: Option<&str>) -> (Rc<MemContentsApi>, RemoteDocumentStore<Rc<MemContentsApi>>) {
        let api = Rc::new(MemContentsApi::new());
        let creds: Rc<dyn CredentialProvider> = Rc::new(StaticCredentials::new(token));
        let store = RemoteDocumentStore::new(api.clone(), creds, MemContentsApi::remote_config());
        (api, store)
    }

    fn doc_named(names: &[&str]) -> Document {
        let mut doc = Document::new();
        for (i, name) in names.iter().enumerate() {
            doc.items.push(
                NewItem {
                    name: name.to_string(),
                    ..Default::default()
                }
                .into_item(ItemId(i as u64 + 1)),
            );
        }
        doc
    }

    #[test]
    fn non_ascii_round_trip() {
        let (_, store) = remote(Some("tok"));
        let mut doc = doc_named(&["Дружок", "Snø 🐾"]);
        doc.items[0].description = "Щенок русского той-терьера".to_string();

        assert!(store.write(&doc).unwrap().is_committed());
        assert_eq!(store.read(), doc);
        assert_eq!(store.read_public(), doc);
    }

    #[test]
    fn write_without_token_is_refused() {
        let (api, store) = remote(None);
        assert!(matches!(
            store.write(&doc_named(&["A"])),
            Err(KennelError::NoCredential)
        ));
        assert_eq!(api.put_count(), 0);
    }

    #[test]
    fn reads_do_not_need_a_token() {
        let (api, store) = remote(None);
        api.seed_document("data.json", &doc_named(&["A", "B"]));
        assert_eq!(store.read().item_count(), 2);
        assert_eq!(store.read_public().item_count(), 2);
    }

    #[test]
    fn missing_document_reads_as_empty() {
        let (_, store) = remote(Some("tok"));
        assert!(store.try_read().unwrap().is_none());
        assert_eq!(store.read(), Document::default());
        assert_eq!(store.read_public(), Document::default());
    }

    #[test]
    fn offline_reads_as_empty() {
        let (api, store) = remote(Some("tok"));
        api.seed_document("data.json", &doc_named(&["A"]));
        api.set_offline(true);
        assert!(store.try_read().is_err());
        assert_eq!(store.read(), Document::default());
        assert!(matches!(store.write(&doc_named(&["B"])), Ok(RemoteWrite::Failed(_))));
    }

    #[test]
    fn update_carries_current_sha() {
        let (api, store) = remote(Some("tok"));
        api.seed_document("data.json", &doc_named(&["A"]));
        let before = api.sha("data.json").unwrap();

        let outcome = store.write(&doc_named(&["A", "B"])).unwrap();
        let after = api.sha("data.json").unwrap();
        assert_ne!(before, after);
        assert_eq!(outcome, RemoteWrite::Committed { sha: after });
    }

    #[test]
    fn concurrent_write_between_lookup_and_put_is_a_conflict() {
        let (api, store) = remote(Some("tok"));
        api.seed_document("data.json", &doc_named(&["A"]));
        api.edit_before_next_put("data.json", &doc_named(&["A", "B", "C"]));

        assert_eq!(store.write(&doc_named(&["mine"])).unwrap(), RemoteWrite::Conflict);
        assert_eq!(store.read().item_count(), 3);
    }

    #[test]
    fn write_at_a_superseded_revision_is_a_conflict() {
        let (api, store) = remote(Some("tok"));
        api.seed_document("data.json", &doc_named(&["A"]));
        let head = store.read_for_update().unwrap().unwrap();
        api.seed_document("data.json", &doc_named(&["A", "B"]));

        assert_eq!(
            store.write_at(&doc_named(&["mine"]), Some(&head.sha)).unwrap(),
            RemoteWrite::Conflict
        );
        // creating over an existing file is rejected too
        assert_eq!(
            store.write_at(&doc_named(&["mine"]), None).unwrap(),
            RemoteWrite::Conflict
        );
        assert_eq!(store.read().item_count(), 2);
    }

    #[test]
    fn server_errors_on_read_are_not_a_missing_document() {
        let (api, store) = remote(Some("tok"));
        api.seed_document("data.json", &doc_named(&["A"]));
        api.fail_next_get(503);
        assert!(matches!(store.try_read(), Err(KennelError::Transport(_))));
        assert_eq!(store.try_read().unwrap().unwrap().document.item_count(), 1);
    }

    #[test]
    fn server_error_is_a_failed_write() {
        let (api, store) = remote(Some("tok"));
        api.fail_next_put(500);
        assert!(matches!(
            store.write(&doc_named(&["A"])).unwrap(),
            RemoteWrite::Failed(reason) if reason.contains("500")
        ));
    }

    #[test]
    fn large_documents_are_read_through_blobs() {
        let (api, store) = remote(Some("tok"));
        api.set_inline_limit(16);
        let doc = doc_named(&["A long enough name to exceed the inline limit"]);
        api.seed_document("data.json", &doc);
        assert_eq!(store.read(), doc);
    }

    #[test]
    fn corrupt_remote_reads_as_unavailable() {
        let (api, store) = remote(Some("tok"));
        api.seed_bytes("data.json", b"not json at all");
        assert!(store.try_read().unwrap().is_none());
        let head = store.read_for_update().unwrap().unwrap();
        assert!(head.document.is_none());
        // still writable: the write only needs the sha
        assert!(store.write(&doc_named(&["A"])).unwrap().is_committed());
    }

    #[test]
    fn commit_asset_returns_raw_url() {
        let (api, store) = remote(Some("tok"));
        let url = store.commit_asset(b"\x89PNG", "1_a.png").unwrap();
        assert_eq!(url, store.raw_url("pets/images/1_a.png"));
        assert_eq!(api.file_bytes("pets/images/1_a.png").unwrap(), b"\x89PNG");
    }

    #[test]
    fn decode_tolerates_line_wrapping() {
        let encoded = STANDARD.encode(r#"{"users":{},"pets":[]}"#);
        let wrapped = format!("{}\n{}\n", &encoded[..10], &encoded[10..]);
        assert_eq!(decode_document(&wrapped).unwrap(), Document::default());
    }
}
