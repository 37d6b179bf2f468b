//! CLI subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod output;
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use tally_core::ocr::fragments_from_json;
use tally_core::{
    CardReader, CardReading, FixedFragments, FormSchema, PureOcrSource, TallyConfig,
};

/// Image extensions handed to the OCR engine.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp"];

/// What a card input file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A photo of the card.
    Image,
    /// Fragments already recognized, as JSON.
    Fragments,
}

impl InputKind {
    pub fn of(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        if extension == "json" {
            Some(InputKind::Fragments)
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Some(InputKind::Image)
        } else {
            None
        }
    }
}

/// Configuration from `--config`, else the default file, else built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<TallyConfig> {
    if let Some(path) = config_path {
        let path = Path::new(path);
        if path.exists() {
            return TallyConfig::from_file(path).map_err(|e| {
                anyhow::anyhow!("Failed to read config {}: {}", path.display(), e)
            });
        }
        debug!("Config {} not found, using defaults", path.display());
        return Ok(TallyConfig::default());
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using config from {}", default_path.display());
        Ok(TallyConfig::from_file(&default_path)?)
    } else {
        Ok(TallyConfig::default())
    }
}

pub fn load_schema(path: &Path) -> anyhow::Result<FormSchema> {
    if !path.exists() {
        anyhow::bail!("Schema file not found: {}", path.display());
    }
    FormSchema::from_file(path)
        .map_err(|e| anyhow::anyhow!("Invalid schema {}: {}", path.display(), e))
}

/// Reads card inputs of either kind, loading OCR models on first use.
pub struct CardSource<'a> {
    config: &'a TallyConfig,
    model_dir: PathBuf,
    fragments: CardReader<FixedFragments>,
    native: Option<CardReader<PureOcrSource>>,
}

impl<'a> CardSource<'a> {
    pub fn new(config: &'a TallyConfig, model_dir: Option<PathBuf>) -> Self {
        Self {
            config,
            model_dir: model_dir.unwrap_or_else(|| config.ocr.model_dir.clone()),
            fragments: CardReader::new(FixedFragments::default(), config),
            native: None,
        }
    }

    pub fn read(&mut self, path: &Path, schema: &FormSchema) -> anyhow::Result<CardReading> {
        match InputKind::of(path) {
            Some(InputKind::Fragments) => {
                let json = fs::read_to_string(path)?;
                let fragments = fragments_from_json(&json)?;
                debug!("Loaded {} fragments from {}", fragments.len(), path.display());
                Ok(self.fragments.read_fragments(fragments, schema)?)
            }
            Some(InputKind::Image) => Ok(self.native_reader()?.read_path(path, schema)?),
            None => anyhow::bail!("Unsupported file format: {}", path.display()),
        }
    }

    fn native_reader(&mut self) -> anyhow::Result<&CardReader<PureOcrSource>> {
        let reader = match self.native.take() {
            Some(reader) => reader,
            None => {
                let source = PureOcrSource::from_dir(&self.model_dir, &self.config.ocr)
                    .map_err(|e| {
                        anyhow::anyhow!(
                            "OCR models not available at {}: {}",
                            self.model_dir.display(),
                            e
                        )
                    })?;
                CardReader::new(source, self.config)
            }
        };
        let reader: &CardReader<PureOcrSource> = self.native.insert(reader);
        Ok(reader)
    }
}
