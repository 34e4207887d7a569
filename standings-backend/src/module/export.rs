///! Standings image export
///!
///! Rasterizes a rendered card (2x, solid background, JPEG q95 by default)
///! and saves it as `standings-<epoch-millis>.jpg`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use resvg::tiny_skia;
use resvg::usvg::{fontdb, Options, Tree};

use super::renderer::RenderedCard;
use crate::config::ExportConfig;
use crate::error::{Result, StandingsError};

/// Rasterization parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    pub scale: f32,
    /// JPEG quality, 1-100
    pub quality: u8,
    pub background: (u8, u8, u8),
}

impl RasterOptions {
    pub const DEFAULT_BACKGROUND: (u8, u8, u8) = (0xf5, 0xf5, 0xf5);

    pub fn from_config(config: &ExportConfig) -> Self {
        let background = parse_hex_color(&config.background).unwrap_or_else(|| {
            tracing::warn!(
                "Invalid export background {:?}, using #f5f5f5",
                config.background
            );
            Self::DEFAULT_BACKGROUND
        });

        Self {
            scale: if config.scale > 0.0 { config.scale } else { 2.0 },
            quality: config.quality.clamp(1, 100),
            background,
        }
    }
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            quality: 95,
            background: Self::DEFAULT_BACKGROUND,
        }
    }
}

/// Parse "#rrggbb", "rrggbb" or "#rgb".
pub fn parse_hex_color(text: &str) -> Option<(u8, u8, u8)> {
    let hex = text.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        6 => Some((
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        3 => {
            let mut channels = hex.chars().map(|c| {
                let v = c.to_digit(16).unwrap_or(0) as u8;
                v * 16 + v
            });
            Some((channels.next()?, channels.next()?, channels.next()?))
        }
        _ => None,
    }
}

/// Turns an SVG document into encoded image bytes.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, svg: &str, options: &RasterOptions) -> Result<Vec<u8>>;
}

/// resvg + tiny-skia rasterizer producing JPEG output
pub struct ResvgJpegRasterizer {
    fontdb: Arc<fontdb::Database>,
    font_family: String,
}

impl ResvgJpegRasterizer {
    pub fn new(fonts_dir: impl AsRef<Path>, font_family: impl Into<String>) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        let fonts_dir = fonts_dir.as_ref();
        if fonts_dir.is_dir() {
            db.load_fonts_dir(fonts_dir);
        }
        tracing::debug!("Loaded {} font faces (extra dir {:?})", db.len(), fonts_dir);

        Self {
            fontdb: Arc::new(db),
            font_family: font_family.into(),
        }
    }

    fn render_pixmap(&self, svg: &str, options: &RasterOptions) -> Result<tiny_skia::Pixmap> {
        let mut usvg_options = Options::default();
        usvg_options.font_family = self.font_family.clone();
        usvg_options.fontdb = self.fontdb.clone();

        let tree = Tree::from_str(svg, &usvg_options)
            .map_err(|e| StandingsError::Capture(format!("Failed to parse SVG: {}", e)))?;

        let size = tree.size();
        let width = (size.width() * options.scale).ceil() as u32;
        let height = (size.height() * options.scale).ceil() as u32;

        let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
            StandingsError::Capture(format!("Failed to allocate {}x{} pixmap", width, height))
        })?;

        let (r, g, b) = options.background;
        pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));

        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(options.scale, options.scale),
            &mut pixmap.as_mut(),
        );

        Ok(pixmap)
    }
}

impl Rasterizer for ResvgJpegRasterizer {
    fn rasterize(&self, svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
        let pixmap = self.render_pixmap(svg, options)?;

        let rgb: Vec<u8> = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue()]
            })
            .collect();

        let image = image::RgbImage::from_raw(pixmap.width(), pixmap.height(), rgb)
            .ok_or_else(|| StandingsError::Encode("Pixel buffer size mismatch".to_string()))?;

        let mut bytes = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, options.quality)
            .encode_image(&image)
            .map_err(|e| StandingsError::Encode(e.to_string()))?;

        Ok(bytes)
    }
}

/// An encoded standings image
#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Where the image was saved, if it was written to disk
    pub path: Option<PathBuf>,
}

/// `standings-<unix-epoch-millis>.jpg`
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("standings-{}.jpg", now.timestamp_millis())
}

/// Export trigger: render target in, image file out
pub struct Exporter {
    rasterizer: Arc<dyn Rasterizer>,
    options: RasterOptions,
    output_dir: PathBuf,
}

impl Exporter {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        options: RasterOptions,
        output_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            rasterizer,
            options,
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn from_config(config: &ExportConfig, fonts_dir: &str, font_family: &str) -> Self {
        Self::new(
            Arc::new(ResvgJpegRasterizer::new(fonts_dir, font_family)),
            RasterOptions::from_config(config),
            &config.output_dir,
        )
    }

    /// Rasterize without touching the filesystem.
    ///
    /// Returns `Ok(None)` when there is nothing to capture.
    pub async fn export_bytes(&self, target: Option<&RenderedCard>) -> Result<Option<ExportedImage>> {
        let Some(card) = target else {
            return Ok(None);
        };
        if !card.has_content() {
            return Ok(None);
        }

        let rasterizer = self.rasterizer.clone();
        let options = self.options.clone();
        let svg = card.svg.clone();

        let bytes = tokio::task::spawn_blocking(move || rasterizer.rasterize(&svg, &options))
            .await
            .map_err(|e| StandingsError::Capture(format!("Rasterizer task failed: {}", e)))??;

        tracing::debug!(
            "Rasterized {} rows into {} bytes",
            card.row_count(),
            bytes.len()
        );

        Ok(Some(ExportedImage {
            file_name: export_file_name(Utc::now()),
            bytes,
            path: None,
        }))
    }

    /// Rasterize and save into the output directory.
    pub async fn export(&self, target: Option<&RenderedCard>) -> Result<Option<ExportedImage>> {
        let Some(mut image) = self.export_bytes(target).await? else {
            return Ok(None);
        };

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| StandingsError::Write {
                path: self.output_dir.clone(),
                source,
            })?;

        let path = self.output_dir.join(&image.file_name);
        if let Err(source) = tokio::fs::write(&path, &image.bytes).await {
            // Never leave a truncated image behind
            tokio::fs::remove_file(&path).await.ok();
            return Err(StandingsError::Write { path, source });
        }

        tracing::info!("Saved standings image: {:?}", path);
        image.path = Some(path);
        Ok(Some(image))
    }
}
