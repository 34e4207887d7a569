///! Standings session controller
///!
///! Owns the current record set and labels, feeds them to the renderer and
///! forwards export requests. Outcomes of user actions are reported through
///! a [`Notifier`].

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use standings_common::{LabelSet, LayoutVariant, Notification, NotificationLevel, TeamRecord};

use super::export::{ExportedImage, Exporter};
use super::renderer::{RenderedCard, StandingsRenderer};
use super::standings::{parse_standings_csv, parse_standings_file};
use crate::config::StandingsConfig;
use crate::error::{Result, StandingsError};

pub const MSG_LOAD_OK: &str = "CSV file loaded successfully!";
pub const MSG_PARSE_FAILED: &str = "Failed to parse CSV file";
pub const MSG_READ_FAILED: &str = "Failed to read CSV file";
pub const MSG_EXPORT_OK: &str = "Image downloaded successfully!";
pub const MSG_EXPORT_FAILED: &str = "Failed to generate image";

/// Sink for transient user-facing messages
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => tracing::info!("{}", notification.message),
            NotificationLevel::Error => tracing::error!("{}", notification.message),
        }
    }
}

/// Bounded queue of recent notifications, drained by the UI
pub struct RecentNotifications {
    queue: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl RecentNotifications {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Take every pending notification, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecentNotifications {
    fn notify(&self, notification: Notification) {
        tracing::debug!("Notification: {:?}", notification);
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(notification);
    }
}

pub struct StandingsController {
    records: Vec<TeamRecord>,
    labels: LabelSet,
    variant: LayoutVariant,
    renderer: StandingsRenderer,
    exporter: Exporter,
    notifier: Arc<dyn Notifier>,
}

impl StandingsController {
    pub fn new(
        renderer: StandingsRenderer,
        exporter: Exporter,
        notifier: Arc<dyn Notifier>,
        labels: LabelSet,
        variant: LayoutVariant,
    ) -> Self {
        Self {
            records: Vec::new(),
            labels,
            variant,
            renderer,
            exporter,
            notifier,
        }
    }

    pub fn from_config(config: &StandingsConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(
            StandingsRenderer::from_config(&config.render),
            Exporter::from_config(&config.export, &config.render.fonts_dir, &config.render.font_family),
            notifier,
            config.labels.to_label_set(),
            config.render.variant,
        )
    }

    pub fn records(&self) -> &[TeamRecord] {
        &self.records
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn variant(&self) -> LayoutVariant {
        self.variant
    }

    /// Replace the whole record set.
    pub fn replace_records(&mut self, records: Vec<TeamRecord>) {
        tracing::debug!("Replacing {} records with {}", self.records.len(), records.len());
        self.records = records;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.labels.title = title.into();
    }

    pub fn set_subtitle(&mut self, subtitle: impl Into<String>) {
        self.labels.subtitle = subtitle.into();
    }

    /// Set the period (day / stage) label.
    pub fn set_label(&mut self, period_label: impl Into<String>) {
        self.labels.period_label = period_label.into();
    }

    pub fn set_variant(&mut self, variant: LayoutVariant) {
        self.variant = variant;
    }

    /// Parse uploaded CSV content and replace the record set.
    ///
    /// On failure the current records are kept.
    pub fn load_csv_bytes(&mut self, content: &[u8]) -> Result<usize> {
        let parsed = parse_standings_csv(content);
        self.apply_parsed(parsed)
    }

    fn apply_parsed(&mut self, parsed: Result<Vec<TeamRecord>>) -> Result<usize> {
        match parsed {
            Ok(records) => Ok(self.accept_records(records)),
            Err(e) => {
                tracing::error!("Error parsing CSV: {}", e);
                self.notifier.notify(Notification::error(MSG_PARSE_FAILED));
                Err(e)
            }
        }
    }

    /// Read and load a CSV file. `None` (nothing picked) does nothing.
    pub async fn load_csv_file(&mut self, path: Option<&Path>) -> Result<Option<usize>> {
        let Some(path) = path else {
            return Ok(None);
        };

        match parse_standings_file(path).await {
            Ok(records) => Ok(Some(self.accept_records(records))),
            Err(e) => {
                tracing::error!("Error loading CSV {:?}: {}", path, e);
                let message = match &e {
                    StandingsError::Read { .. } => MSG_READ_FAILED,
                    _ => MSG_PARSE_FAILED,
                };
                self.notifier.notify(Notification::error(message));
                Err(e)
            }
        }
    }

    fn accept_records(&mut self, records: Vec<TeamRecord>) -> usize {
        let count = records.len();
        self.replace_records(records);
        self.notifier.notify(Notification::success(MSG_LOAD_OK));
        count
    }

    /// Render the current state.
    pub fn render(&self) -> RenderedCard {
        self.renderer.render(&self.records, &self.labels, self.variant)
    }

    /// Export is only offered once at least one record is loaded.
    pub fn can_export(&self) -> bool {
        !self.records.is_empty()
    }

    /// Rasterize the current card and save it to the output directory.
    pub async fn request_export(&self) -> Result<Option<ExportedImage>> {
        if !self.can_export() {
            return Ok(None);
        }
        let card = self.render();
        let outcome = self.exporter.export(Some(&card)).await;
        self.report_export(outcome)
    }

    /// Rasterize the current card in memory, for downloads served directly.
    pub async fn request_export_bytes(&self) -> Result<Option<ExportedImage>> {
        if !self.can_export() {
            return Ok(None);
        }
        let card = self.render();
        let outcome = self.exporter.export_bytes(Some(&card)).await;
        self.report_export(outcome)
    }

    fn report_export(&self, outcome: Result<Option<ExportedImage>>) -> Result<Option<ExportedImage>> {
        match &outcome {
            Ok(Some(image)) => {
                tracing::info!("Exported {} ({} bytes)", image.file_name, image.bytes.len());
                self.notifier.notify(Notification::success(MSG_EXPORT_OK));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Error generating image: {}", e);
                self.notifier.notify(Notification::error(MSG_EXPORT_FAILED));
            }
        }
        outcome
    }
}
