//! Masking session controller
//!
//! Owns everything the client shows: the source text, the category
//! selection, and the lifecycle of the current mask request. Network calls
//! are split into a `begin_*` step that hands out a ticket carrying copies
//! of the request data, and a `finish_*` step that applies the settled
//! result. The async drivers at the bottom chain the two for callers that
//! can await in place.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::category::{Category, CategoryRegistry, CategoryRejected};
use crate::detection::{tally_detections, Detection, MaskResponse};
use crate::error::{ServiceError, SessionError, ValidationError};
use crate::segment::{segment_masked_text, Span};
use crate::service::{FileUpload, PiiService};

/// A successful mask result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskOutcome {
    pub masked_text: String,
    pub detections: Vec<Detection>,
    /// The text that was submitted to produce this result
    pub source_text: String,
}

/// State of the mask request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Loading,
    Succeeded(MaskOutcome),
    Failed(SessionError),
}

impl RequestStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

/// Handle for an upload that has been started
#[derive(Debug)]
pub struct UploadTicket {
    file_name: String,
}

impl UploadTicket {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Handle for the mask request in flight, with the data to send
#[derive(Debug)]
pub struct MaskTicket {
    id: u64,
    text: String,
    categories: Vec<String>,
}

impl MaskTicket {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

/// Session state for one user of the client
#[derive(Debug)]
pub struct MaskingSession {
    source_text: String,
    uploaded_file_name: Option<String>,
    categories: CategoryRegistry,
    status: RequestStatus,
    /// Message shown without changing `status`: validation failures, and
    /// upload failures that arrive while a mask request is loading
    notice: Option<SessionError>,
    pending_uploads: usize,
    next_request_id: u64,
    in_flight: Option<u64>,
}

impl MaskingSession {
    /// New session with the default categories
    pub fn new() -> Self {
        Self::with_categories(CategoryRegistry::with_defaults())
    }

    pub fn with_categories(categories: CategoryRegistry) -> Self {
        Self {
            source_text: String::new(),
            uploaded_file_name: None,
            categories,
            status: RequestStatus::Idle,
            notice: None,
            pending_uploads: 0,
            next_request_id: 0,
            in_flight: None,
        }
    }

    // ---- source text -------------------------------------------------

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Replace the source text. The last result stays visible; see
    /// [`MaskingSession::is_output_stale`].
    pub fn set_source_text(&mut self, text: impl Into<String>) {
        self.source_text = text.into();
    }

    pub fn uploaded_file_name(&self) -> Option<&str> {
        self.uploaded_file_name.as_deref()
    }

    /// Forget the uploaded file and the text extracted from it
    pub fn remove_file(&mut self) {
        self.uploaded_file_name = None;
        self.source_text.clear();
    }

    // ---- categories --------------------------------------------------

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn toggle_category(&mut self, id: &str) -> Option<bool> {
        self.categories.toggle(id)
    }

    pub fn set_category_active(&mut self, id: &str, active: bool) -> bool {
        self.categories.set_active(id, active)
    }

    pub fn add_category(&mut self, raw_label: &str) -> Result<&Category, CategoryRejected> {
        self.categories.add(raw_label)
    }

    /// Ids of active categories in display order, as sent to the service
    pub fn active_categories(&self) -> Vec<String> {
        self.categories.active_ids()
    }

    // ---- status and results ------------------------------------------

    pub fn status(&self) -> &RequestStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, RequestStatus::Loading)
    }

    pub fn is_uploading(&self) -> bool {
        self.pending_uploads > 0
    }

    pub fn outcome(&self) -> Option<&MaskOutcome> {
        match &self.status {
            RequestStatus::Succeeded(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn masked_text(&self) -> Option<&str> {
        self.outcome().map(|o| o.masked_text.as_str())
    }

    pub fn detections(&self) -> &[Detection] {
        self.outcome().map(|o| o.detections.as_slice()).unwrap_or(&[])
    }

    /// The error to display, if any. A notice takes precedence over a
    /// failed request.
    pub fn error(&self) -> Option<&SessionError> {
        match (&self.notice, &self.status) {
            (Some(notice), _) => Some(notice),
            (None, RequestStatus::Failed(err)) => Some(err),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error().map(SessionError::user_message)
    }

    /// Highlight spans of the current masked text
    pub fn output_spans(&self) -> Option<Vec<Span<'_>>> {
        self.masked_text().map(segment_masked_text)
    }

    /// Detections per category in the current result
    pub fn detection_tally(&self) -> BTreeMap<String, usize> {
        tally_detections(self.detections())
    }

    /// Whether the visible result was computed from different text than
    /// what is in the input now
    pub fn is_output_stale(&self) -> bool {
        self.outcome()
            .map(|o| o.source_text != self.source_text)
            .unwrap_or(false)
    }

    /// Whether the mask action should be offered
    pub fn can_submit(&self) -> bool {
        !self.is_busy() && !self.source_text.trim().is_empty()
    }

    /// Whether an upload or a mask request is pending
    pub fn is_busy(&self) -> bool {
        self.is_loading() || self.is_uploading()
    }

    // ---- upload lifecycle --------------------------------------------

    /// Record that an upload of `file_name` has started. Any error on
    /// display is cleared.
    pub fn begin_upload(&mut self, file_name: impl Into<String>) -> UploadTicket {
        self.pending_uploads += 1;
        self.notice = None;
        if matches!(self.status, RequestStatus::Failed(_)) {
            self.status = RequestStatus::Idle;
        }

        let file_name = file_name.into();
        info!("Upload started: {}", file_name);
        UploadTicket { file_name }
    }

    /// Apply a settled upload. Settlements are applied in the order they
    /// arrive, so the last one to settle wins.
    pub fn finish_upload(&mut self, ticket: UploadTicket, result: Result<String, ServiceError>) {
        self.pending_uploads = self.pending_uploads.saturating_sub(1);

        match result {
            Ok(text) => {
                info!("Upload finished: {} ({} chars)", ticket.file_name, text.len());
                self.source_text = text;
                self.uploaded_file_name = Some(ticket.file_name);
                self.clear_upload_error();
            }
            Err(err) => {
                warn!("Upload failed: {}: {}", ticket.file_name, err);
                let err = SessionError::Upload(err);
                if self.is_loading() {
                    self.notice = Some(err);
                } else {
                    self.status = RequestStatus::Failed(err);
                }
            }
        }
    }

    fn clear_upload_error(&mut self) {
        if matches!(self.notice, Some(SessionError::Upload(_))) {
            self.notice = None;
        }
        if matches!(self.status, RequestStatus::Failed(SessionError::Upload(_))) {
            self.status = RequestStatus::Idle;
        }
    }

    // ---- mask lifecycle ----------------------------------------------

    /// Validate and start a mask request.
    ///
    /// Returns `Ok(None)` without side effects when a request is already
    /// loading. Validation failures are recorded as a notice and leave the
    /// request status untouched.
    pub fn begin_mask(&mut self) -> Result<Option<MaskTicket>, ValidationError> {
        if self.is_loading() {
            debug!("Mask request ignored: another request is in flight");
            return Ok(None);
        }

        let categories = self.active_categories();
        let validation = if self.source_text.trim().is_empty() {
            Some(ValidationError::NoText)
        } else if categories.is_empty() {
            Some(ValidationError::NoActiveCategory)
        } else {
            None
        };
        if let Some(err) = validation {
            debug!("Mask request rejected: {}", err);
            self.notice = Some(err.into());
            return Err(err);
        }

        let id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight = Some(id);
        self.notice = None;
        self.status = RequestStatus::Loading;

        info!(
            "Mask request {} started: {} chars, categories [{}]",
            id,
            self.source_text.len(),
            categories.join(", ")
        );
        Ok(Some(MaskTicket {
            id,
            text: self.source_text.clone(),
            categories,
        }))
    }

    /// Apply a settled mask request. Returns false when the ticket is not
    /// the request in flight and the result was discarded.
    pub fn finish_mask(
        &mut self,
        ticket: MaskTicket,
        result: Result<MaskResponse, ServiceError>,
    ) -> bool {
        if self.in_flight != Some(ticket.id) || !self.is_loading() {
            debug!("Discarding result of stale mask request {}", ticket.id);
            return false;
        }
        self.in_flight = None;
        // The settled request is now the only outcome shown
        self.clear_upload_error();

        self.status = match result {
            Ok(response) => {
                info!(
                    "Mask request {} succeeded: {} detections",
                    ticket.id,
                    response.detections.len()
                );
                RequestStatus::Succeeded(MaskOutcome {
                    masked_text: response.masked_text,
                    detections: response.detections,
                    source_text: ticket.text,
                })
            }
            Err(err) => {
                warn!("Mask request {} failed: {}", ticket.id, err);
                RequestStatus::Failed(SessionError::Mask(err))
            }
        };
        true
    }

    // ---- async drivers -----------------------------------------------

    /// Upload `upload` through `service` and apply the extracted text
    pub async fn acquire_from_file<S: PiiService>(&mut self, service: &S, upload: FileUpload) {
        let ticket = self.begin_upload(upload.file_name.clone());
        let result = service.extract_text(upload).await;
        self.finish_upload(ticket, result);
    }

    /// Validate, call `service`, and apply the result
    pub async fn request_mask<S: PiiService>(&mut self, service: &S) -> Result<(), ValidationError> {
        if let Some(ticket) = self.begin_mask()? {
            let result = service
                .mask(ticket.text.clone(), ticket.categories.clone())
                .await;
            self.finish_mask(ticket, result);
        }
        Ok(())
    }
}

impl Default for MaskingSession {
    fn default() -> Self {
        Self::new()
    }
}
