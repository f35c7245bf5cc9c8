use std::path::PathBuf;

use crate::app_state::{DownloadResult, VideoPreview};
use crate::client::ClientError;

/// Request sequence number; only results tagged with the latest one apply
pub type Seq = u64;

/// Everything the controller reacts to: user intents and request outcomes
#[derive(Debug)]
pub enum Event {
    /// Submit the URL entered in the form
    Submit(String),
    PreviewLoaded { seq: Seq, preview: VideoPreview },
    PreviewFailed { seq: Seq, error: ClientError },
    /// Pick a quality by format id
    SelectFormat(String),
    /// Move the selection one row up (-1) or down (+1)
    MoveSelection(isize),
    ConfirmDownload,
    DownloadFinished { seq: Seq, result: DownloadResult },
    DownloadFailed { seq: Seq, error: ClientError },
    ThumbnailLoaded { seq: Seq, lines: Vec<String> },
    ThumbnailFailed { seq: Seq },
    /// Save the finished artifact locally
    SaveArtifact,
    ArtifactSaved { seq: Seq, path: PathBuf },
    ArtifactFailed { seq: Seq, error: ClientError },
    Retry,
    Reset,
    Quit,
}

/// Work the controller asks the runner to perform
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchPreview { seq: Seq, url: String },
    StartDownload {
        seq: Seq,
        url: String,
        quality: String,
        format_id: Option<String>,
    },
    FetchThumbnail { seq: Seq, url: String },
    /// Save the artifact of the download tagged `seq`
    SaveArtifact { seq: Seq, filename: String },
    /// Abort every in-flight request
    CancelInFlight,
}

/// Input events from the terminal
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// Key was pressed
    Key(crossterm::event::KeyEvent),
    /// Terminal was resized
    Resize(u16, u16),
}
