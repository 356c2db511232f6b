//! PII Shield - masking client
//!
//! Session controller, category registry, masked-output segmentation, and
//! the HTTP client for a remote PII masking service.

pub mod category;
pub mod clipboard;
pub mod config;
pub mod dashboard;
pub mod detection;
pub mod error;
pub mod segment;
pub mod service;
pub mod session;

pub use category::{Category, CategoryRegistry, CategoryRejected};
pub use clipboard::ClipboardManager;
pub use config::Config;
pub use detection::{Detection, MaskResponse};
pub use error::{ServiceError, SessionError, ValidationError};
pub use segment::{segment_masked_text, Span, SpanKind, MASK_MARKER};
pub use service::{FileUpload, HttpPiiClient, PiiService};
pub use session::{MaskOutcome, MaskingSession, RequestStatus};
