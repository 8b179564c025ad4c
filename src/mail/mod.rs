//! Mail Source Adapter (§4.2). Normalizes a remote mailbox provider behind
//! one trait so the pipeline never depends on a specific vendor API,
//! grounded on the source system's `EmailMessageAdapted`/`EmailMessageLike`
//! adaptor pair (`mail.py`) — there it adapted IMAP and Graph message types
//! to one interface; here the adapter trait plays the same role with a
//! single Graph-backed implementation, since the legacy IMAP path was
//! already dead code upstream.

pub mod bounce;
pub mod graph_client;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use graph_client::GraphMailAdapter;

#[derive(Debug, Error)]
pub enum MailAdapterError {
    #[error("mail provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("mail provider returned an error response: {0}")]
    Provider(String),
    #[error("mail provider returned a malformed response: {0}")]
    Malformed(String),
}

/// One email message normalized to the adapter invariant (§4.2): whatever
/// the upstream shape, every field is present, defaulting to empty rather
/// than surfacing as an error.
#[derive(Debug, Clone, Default)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub recipients: String,
    pub date_received: String,
    pub is_read: bool,
    pub body: String,
}

/// Options for one `read_batches` call, mirroring
/// `endless_email_read_generator`'s parameters.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub n: usize,
    pub batch_size: usize,
    pub most_recent_first: bool,
    pub unseen_only: bool,
    pub folders: Vec<String>,
    pub set_to_read: bool,
    pub remove_undelivered: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            n: 9999,
            batch_size: 50,
            most_recent_first: true,
            unseen_only: true,
            folders: vec!["inbox".to_string(), "junkemail".to_string()],
            set_to_read: true,
            remove_undelivered: true,
        }
    }
}

/// The remote mailbox, behind one interface regardless of provider.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Fetch up to `options.n` messages across as many pages as the
    /// provider yields, applying the bounce-lexicon post-filter and issuing
    /// the delete/mark-read mutation batches for excluded/read messages
    /// (§4.2). Each element of the returned `Vec` is one page (≤
    /// `batch_size`); the caller enqueues page by page to preserve
    /// within-batch ordering (§5).
    ///
    /// `stop` is polled between pages (§5, §9): a cancellation mid-scan
    /// returns whatever pages were already fetched rather than losing them
    /// or blocking until the full scan completes.
    async fn read_batches(
        &self,
        options: ReadOptions,
        stop: &CancellationToken,
    ) -> Result<Vec<Vec<MailMessage>>, MailAdapterError>;

    /// Send a notification email (§4.7). Failure is the caller's to log and
    /// decide whether to retry — the adapter itself never retries (§4.2).
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<bool, MailAdapterError>;
}
