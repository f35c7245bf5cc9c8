use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app_state::events::{Effect, Event};
use crate::client::VideoBackend;
use crate::thumbnail;

const THUMBNAIL_WIDTH: u32 = 40;
const THUMBNAIL_HEIGHT: u32 = 14;

/// Executes controller effects as background tasks and reports the
/// outcome back as [`Event`]s
pub struct EffectRunner {
    backend: Arc<dyn VideoBackend>,
    app_tx: mpsc::UnboundedSender<Event>,
    download_dir: PathBuf,
    preview_task: Option<JoinHandle<()>>,
    download_task: Option<JoinHandle<()>>,
    side_tasks: Vec<JoinHandle<()>>,
}

impl EffectRunner {
    pub fn new(
        backend: Arc<dyn VideoBackend>,
        app_tx: mpsc::UnboundedSender<Event>,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            backend,
            app_tx,
            download_dir,
            preview_task: None,
            download_task: None,
            side_tasks: Vec::new(),
        }
    }

    pub fn run_all(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.run(effect);
        }
    }

    pub fn run(&mut self, effect: Effect) {
        self.side_tasks.retain(|handle| !handle.is_finished());

        match effect {
            Effect::FetchPreview { seq, url } => {
                // The controller ignores the old result anyway; stop paying for it
                if let Some(handle) = self.preview_task.take() {
                    handle.abort();
                }

                let backend = self.backend.clone();
                let app_tx = self.app_tx.clone();
                self.preview_task = Some(tokio::spawn(async move {
                    let event = match backend.fetch_preview(&url).await {
                        Ok(preview) => Event::PreviewLoaded { seq, preview },
                        Err(error) => Event::PreviewFailed { seq, error },
                    };
                    let _ = app_tx.send(event);
                }));
            }
            Effect::StartDownload {
                seq,
                url,
                quality,
                format_id,
            } => {
                let backend = self.backend.clone();
                let app_tx = self.app_tx.clone();
                self.download_task = Some(tokio::spawn(async move {
                    let event = match backend
                        .start_download(&url, &quality, format_id.as_deref())
                        .await
                    {
                        Ok(result) => Event::DownloadFinished { seq, result },
                        Err(error) => Event::DownloadFailed { seq, error },
                    };
                    let _ = app_tx.send(event);
                }));
            }
            Effect::FetchThumbnail { seq, url } => {
                let backend = self.backend.clone();
                let app_tx = self.app_tx.clone();
                self.side_tasks.push(tokio::spawn(async move {
                    let event = match load_thumbnail(backend.as_ref(), &url).await {
                        Ok(lines) => Event::ThumbnailLoaded { seq, lines },
                        Err(e) => {
                            tracing::warn!(%url, error = %e, "Thumbnail unavailable");
                            Event::ThumbnailFailed { seq }
                        }
                    };
                    let _ = app_tx.send(event);
                }));
            }
            Effect::SaveArtifact { seq, filename } => {
                let backend = self.backend.clone();
                let app_tx = self.app_tx.clone();
                let dir = self.download_dir.clone();
                self.side_tasks.push(tokio::spawn(async move {
                    let event = match backend.save_artifact(&filename, &dir).await {
                        Ok(path) => Event::ArtifactSaved { seq, path },
                        Err(error) => {
                            tracing::warn!(%filename, error = %error, "Saving artifact failed");
                            Event::ArtifactFailed { seq, error }
                        }
                    };
                    let _ = app_tx.send(event);
                }));
            }
            Effect::CancelInFlight => self.cancel_all(),
        }
    }

    pub fn cancel_all(&mut self) {
        let handles = self
            .preview_task
            .take()
            .into_iter()
            .chain(self.download_task.take())
            .chain(self.side_tasks.drain(..));

        for handle in handles {
            handle.abort();
        }
    }

    /// Log backend health once; failures never reach the UI
    pub fn spawn_health_check(&self) -> JoinHandle<()> {
        let backend = self.backend.clone();
        tokio::spawn(async move {
            match backend.check_health().await {
                Ok(status) => tracing::info!(status = %status.0, "Backend is healthy"),
                Err(e) => tracing::warn!(error = %e, "Backend health check failed"),
            }
        })
    }
}

async fn load_thumbnail(backend: &dyn VideoBackend, url: &str) -> anyhow::Result<Vec<String>> {
    let bytes = backend.fetch_thumbnail(url).await?;
    let lines = tokio::task::spawn_blocking(move || {
        thumbnail::bytes_to_ascii(&bytes, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT)
    })
    .await??;
    Ok(lines)
}

impl Drop for EffectRunner {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
