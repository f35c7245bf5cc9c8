use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub mod controller;
pub mod events;

pub use controller::Controller;

/// Metadata and formats returned by the preview endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoPreview {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub uploader: String,
    /// Already formatted by the backend ("3:33", "1:02:10")
    #[serde(default, rename = "duration_formatted")]
    pub duration: String,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default, rename = "thumbnail")]
    pub thumbnail_url: String,
    /// In backend order; the first entry is the default choice
    #[serde(default)]
    pub formats: Vec<FormatOption>,
}

/// One selectable quality. Identity is `format_id`; labels may repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatOption {
    #[serde(rename = "quality")]
    pub quality_label: String,
    pub format_id: String,
    #[serde(default, rename = "filesize_formatted")]
    pub file_size: String,
}

/// Response of the download endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub success: bool,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Opaque health payload; only its arrival matters
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus(pub serde_json::Value);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub selected_quality: Option<String>,
    pub selected_format_id: Option<String>,
}

/// Which part of the flow the user is in
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UiState {
    #[default]
    Idle,
    Loading,
    PreviewShown,
    DownloadReady,
    Error(String),
    /// Server file name; `None` when the server did not report one
    Success(Option<String>),
}

/// Derived screen regions; the URL entry form is always on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Loading,
    Preview,
    DownloadOptions,
    Error,
    Success,
}

pub type RegionSet = SmallVec<[Region; 2]>;

impl UiState {
    /// Regions that must be visible in this state, and only those
    pub fn visible_regions(&self) -> RegionSet {
        let mut regions = RegionSet::new();
        match self {
            UiState::Idle => {}
            UiState::Loading => regions.push(Region::Loading),
            UiState::PreviewShown => regions.push(Region::Preview),
            UiState::DownloadReady => {
                regions.push(Region::Preview);
                regions.push(Region::DownloadOptions);
            }
            UiState::Error(_) => regions.push(Region::Error),
            UiState::Success(_) => regions.push(Region::Success),
        }
        regions
    }
}

/// Thumbnail lifecycle for the current preview
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Thumbnail {
    #[default]
    None,
    Loading,
    Ready(Vec<String>),
    Unavailable,
}

/// URL entry field
#[derive(Debug, Clone, Default)]
pub struct UrlInput {
    pub text: String,
    /// Keystrokes go to the field instead of the shortcuts
    pub editing: bool,
}

/// A rendered row of the quality list
#[derive(Debug, Clone, PartialEq)]
pub struct FormatRow<'a> {
    pub label: &'a str,
    pub size: &'a str,
    pub selected: bool,
}

/// Everything the renderer reads. Mutated only through [`Controller`].
#[derive(Debug, Default)]
pub struct AppState {
    pub ui: UiState,
    pub preview: Option<VideoPreview>,
    pub selection: SelectionState,
    pub thumbnail: Thumbnail,
    pub input: UrlInput,
    /// URL the current preview was fetched for
    pub preview_url: Option<String>,
    /// A download request is in flight; the confirm control is disabled
    pub download_busy: bool,
    /// Status line under the success region (artifact saves)
    pub notice: Option<String>,
    pub should_quit: bool,
}

impl AppState {
    pub fn visible_regions(&self) -> RegionSet {
        self.ui.visible_regions()
    }

    pub fn is_visible(&self, region: Region) -> bool {
        self.visible_regions().contains(&region)
    }

    /// Quality list in backend order with the selection marked
    pub fn format_rows(&self) -> Vec<FormatRow<'_>> {
        let selected = self.selection.selected_format_id.as_deref();
        self.preview
            .iter()
            .flat_map(|preview| preview.formats.iter())
            .map(|format| FormatRow {
                label: &format.quality_label,
                size: &format.file_size,
                selected: Some(format.format_id.as_str()) == selected,
            })
            .collect()
    }

    pub fn selected_format(&self) -> Option<&FormatOption> {
        let id = self.selection.selected_format_id.as_deref()?;
        self.preview
            .as_ref()?
            .formats
            .iter()
            .find(|format| format.format_id == id)
    }

    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selection.selected_format_id.as_deref()?;
        self.preview
            .as_ref()?
            .formats
            .iter()
            .position(|format| format.format_id == id)
    }

    /// ("Quality: 1080p", "Size: 50MB") for the current selection
    pub fn selection_summary(&self) -> Option<(String, String)> {
        let format = self.selected_format()?;
        let size = if format.file_size.is_empty() {
            "unknown"
        } else {
            format.file_size.as_str()
        };
        Some((
            format!("Quality: {}", format.quality_label),
            format!("Size: {}", size),
        ))
    }
}
