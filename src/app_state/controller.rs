use crate::app_state::events::{Effect, Event, Seq};
use crate::app_state::{AppState, DownloadResult, Thumbnail, UiState, VideoPreview};
use crate::client::{ClientError, humanize_error, validate_url};

const MSG_EMPTY_URL: &str = "Please enter a video URL";
const MSG_INVALID_URL: &str = "Please enter a valid video URL";
const MSG_NO_QUALITY: &str = "Please select a video quality first";

/// Owns [`AppState`] and moves it through the download flow.
///
/// `handle` never performs I/O: it mutates the state and returns the
/// effects the caller must run. Request results carry the sequence number
/// they were issued with; anything but the latest outstanding one is dropped.
#[derive(Debug, Default)]
pub struct Controller {
    state: AppState,
    next_seq: Seq,
    /// Outstanding preview request and the URL it was issued for
    pending_preview: Option<(Seq, String)>,
    pending_download: Option<Seq>,
    /// Sequence of the request that produced the stored preview
    preview_seq: Option<Seq>,
    /// Download that produced the current success region
    success_seq: Option<Seq>,
    /// Download whose artifact is being saved
    saving_artifact: Option<Seq>,
    fetch_thumbnails: bool,
}

impl Controller {
    pub fn new(fetch_thumbnails: bool) -> Self {
        Self {
            fetch_thumbnails,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Text field access for key handling; not part of the region state
    pub fn input_mut(&mut self) -> &mut crate::app_state::UrlInput {
        &mut self.state.input
    }

    fn issue_seq(&mut self) -> Seq {
        self.next_seq += 1;
        self.next_seq
    }

    fn is_pending_preview(&self, seq: Seq) -> bool {
        matches!(&self.pending_preview, Some((pending, _)) if *pending == seq)
    }

    fn show_error(&mut self, error: &ClientError) {
        self.state.ui = UiState::Error(humanize_error(error));
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Submit(url) => self.submit(url),
            Event::PreviewLoaded { seq, preview } => self.preview_loaded(seq, preview),
            Event::PreviewFailed { seq, error } => {
                if self.is_pending_preview(seq) {
                    self.pending_preview = None;
                    tracing::info!(seq, error = %error, "Preview failed");
                    self.show_error(&error);
                } else {
                    tracing::debug!(seq, "Discarding superseded preview failure");
                }
                Vec::new()
            }
            Event::SelectFormat(format_id) => {
                self.select_format(&format_id);
                Vec::new()
            }
            Event::MoveSelection(delta) => {
                self.move_selection(delta);
                Vec::new()
            }
            Event::ConfirmDownload => self.confirm_download(),
            Event::DownloadFinished { seq, result } => {
                if self.finish_download(seq) {
                    self.download_finished(seq, result);
                }
                Vec::new()
            }
            Event::DownloadFailed { seq, error } => {
                if self.finish_download(seq) {
                    tracing::info!(seq, error = %error, "Download failed");
                    self.show_error(&error);
                }
                Vec::new()
            }
            Event::ThumbnailLoaded { seq, lines } => {
                if self.preview_seq == Some(seq) {
                    self.state.thumbnail = Thumbnail::Ready(lines);
                }
                Vec::new()
            }
            Event::ThumbnailFailed { seq } => {
                if self.preview_seq == Some(seq) {
                    self.state.thumbnail = Thumbnail::Unavailable;
                }
                Vec::new()
            }
            Event::SaveArtifact => self.save_artifact(),
            Event::ArtifactSaved { seq, path } => {
                if self.finish_artifact(seq) {
                    self.state.notice = Some(format!("Saved to {}", path.display()));
                }
                Vec::new()
            }
            Event::ArtifactFailed { seq, error } => {
                if self.finish_artifact(seq) {
                    self.state.notice = Some(humanize_error(&error));
                }
                Vec::new()
            }
            Event::Retry => {
                if matches!(self.state.ui, UiState::Error(_)) {
                    self.state.ui = UiState::Idle;
                }
                Vec::new()
            }
            Event::Reset => self.reset(),
            Event::Quit => {
                self.state.should_quit = true;
                vec![Effect::CancelInFlight]
            }
        }
    }

    fn submit(&mut self, url: String) -> Vec<Effect> {
        if self.state.download_busy {
            return Vec::new();
        }

        let url = url.trim().to_string();
        let rejected = if url.is_empty() {
            Some(MSG_EMPTY_URL)
        } else if !validate_url(&url) {
            Some(MSG_INVALID_URL)
        } else {
            None
        };

        if let Some(message) = rejected {
            // A local rejection also supersedes any preview still in flight
            self.pending_preview = None;
            self.show_error(&ClientError::validation(message));
            return Vec::new();
        }

        let seq = self.issue_seq();
        self.pending_preview = Some((seq, url.clone()));
        self.state.ui = UiState::Loading;
        tracing::debug!(seq, %url, "Preview requested");

        vec![Effect::FetchPreview { seq, url }]
    }

    fn preview_loaded(&mut self, seq: Seq, preview: VideoPreview) -> Vec<Effect> {
        let url = match self.pending_preview.take() {
            Some((pending, url)) if pending == seq => url,
            other => {
                self.pending_preview = other;
                tracing::debug!(seq, "Discarding superseded preview");
                return Vec::new();
            }
        };

        let mut effects = Vec::new();
        self.state.thumbnail = if !self.fetch_thumbnails {
            Thumbnail::None
        } else if preview.thumbnail_url.is_empty() {
            Thumbnail::Unavailable
        } else {
            effects.push(Effect::FetchThumbnail {
                seq,
                url: preview.thumbnail_url.clone(),
            });
            Thumbnail::Loading
        };

        // Replace whole; nothing from the previous preview survives
        self.state.preview_url = Some(url);
        self.state.selection = Default::default();
        self.state.notice = None;
        self.success_seq = None;
        self.saving_artifact = None;
        let first = preview.formats.first().map(|f| f.format_id.clone());
        self.state.preview = Some(preview);
        self.preview_seq = Some(seq);
        self.state.ui = UiState::PreviewShown;

        if let Some(format_id) = first {
            self.select_format(&format_id);
        }

        effects
    }

    fn select_format(&mut self, format_id: &str) {
        if self.state.download_busy
            || !matches!(self.state.ui, UiState::PreviewShown | UiState::DownloadReady)
        {
            return;
        }

        let Some(format) = self
            .state
            .preview
            .as_ref()
            .and_then(|p| p.formats.iter().find(|f| f.format_id == format_id))
        else {
            tracing::debug!(format_id, "Ignoring unknown format");
            return;
        };

        self.state.selection.selected_quality = Some(format.quality_label.clone());
        self.state.selection.selected_format_id = Some(format.format_id.clone());
        self.state.ui = UiState::DownloadReady;
    }

    fn move_selection(&mut self, delta: isize) {
        let Some(preview) = &self.state.preview else {
            return;
        };
        if preview.formats.is_empty() {
            return;
        }

        let last = preview.formats.len() as isize - 1;
        let target = match self.state.selected_index() {
            Some(current) => (current as isize + delta).clamp(0, last),
            None => 0,
        };
        let format_id = preview.formats[target as usize].format_id.clone();
        self.select_format(&format_id);
    }

    fn confirm_download(&mut self) -> Vec<Effect> {
        if self.state.download_busy
            || !matches!(self.state.ui, UiState::PreviewShown | UiState::DownloadReady)
        {
            return Vec::new();
        }

        let (Some(quality), Some(format_id)) = (
            self.state.selection.selected_quality.clone(),
            self.state.selection.selected_format_id.clone(),
        ) else {
            self.show_error(&ClientError::validation(MSG_NO_QUALITY));
            return Vec::new();
        };

        let Some(url) = self.state.preview_url.clone() else {
            self.show_error(&ClientError::validation(MSG_INVALID_URL));
            return Vec::new();
        };

        let seq = self.issue_seq();
        self.pending_download = Some(seq);
        self.success_seq = None;
        self.saving_artifact = None;
        self.state.download_busy = true;
        tracing::debug!(seq, %quality, %format_id, "Download requested");

        vec![Effect::StartDownload {
            seq,
            url,
            quality,
            format_id: Some(format_id),
        }]
    }

    /// Settle a download response; busy is cleared whatever the outcome
    fn finish_download(&mut self, seq: Seq) -> bool {
        if self.pending_download != Some(seq) {
            tracing::debug!(seq, "Discarding superseded download result");
            return false;
        }
        self.pending_download = None;
        self.state.download_busy = false;
        true
    }

    fn download_finished(&mut self, seq: Seq, result: DownloadResult) {
        if result.success {
            let filename = result.filename.filter(|name| !name.trim().is_empty());
            tracing::info!(seq, ?filename, "Download ready");
            self.success_seq = Some(seq);
            self.state.notice = result.message;
            self.state.ui = UiState::Success(filename);
        } else {
            let message = result
                .message
                .unwrap_or_else(|| "Download failed".to_string());
            self.show_error(&ClientError::Application(message));
        }
    }

    /// Only a named artifact of the current success can be saved
    fn save_artifact(&mut self) -> Vec<Effect> {
        let (UiState::Success(Some(filename)), Some(seq)) = (&self.state.ui, self.success_seq)
        else {
            return Vec::new();
        };
        if self.saving_artifact == Some(seq) {
            return Vec::new();
        }

        self.saving_artifact = Some(seq);
        self.state.notice = Some(format!("Saving {}...", filename));
        vec![Effect::SaveArtifact {
            seq,
            filename: filename.clone(),
        }]
    }

    fn finish_artifact(&mut self, seq: Seq) -> bool {
        if self.saving_artifact != Some(seq) || self.success_seq != Some(seq) {
            tracing::debug!(seq, "Discarding save result for a replaced download");
            return false;
        }
        self.saving_artifact = None;
        true
    }

    fn reset(&mut self) -> Vec<Effect> {
        self.pending_preview = None;
        self.pending_download = None;
        self.preview_seq = None;
        self.success_seq = None;
        self.saving_artifact = None;

        self.state.preview = None;
        self.state.preview_url = None;
        self.state.selection = Default::default();
        self.state.thumbnail = Thumbnail::None;
        self.state.download_busy = false;
        self.state.notice = None;
        self.state.ui = UiState::Idle;

        vec![Effect::CancelInFlight]
    }
}
