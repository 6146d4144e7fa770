//! Turning user input into study text
//!
//! Text is passed through, URLs are fetched and reduced to their article
//! text, and files go through OCR. Outlines are expanded into notes.

pub mod article;
mod batch;
mod data_uri;
mod fetch;

pub use batch::{process_sequentially, BatchOutcome, FileFailure};
pub use data_uri::DataUri;
pub use fetch::PageFetcher;

use crate::config::AcquisitionConfig;
use crate::domain::SourceType;
use crate::errors::{AppError, Result};
use crate::flows::AiFlows;
use crate::validation::{FileUpload, FormInput, TextMaterialInput, UrlMaterialInput};

/// Text ready to become a study material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredContent {
    pub title: String,
    pub source_type: SourceType,
    pub source_url: Option<String>,
    pub text: String,
}

#[derive(Clone)]
pub struct ContentAcquirer {
    flows: AiFlows,
    fetcher: PageFetcher,
    config: AcquisitionConfig,
}

impl ContentAcquirer {
    pub fn new(flows: AiFlows, config: AcquisitionConfig) -> Result<Self> {
        let fetcher = PageFetcher::new(&config)?;
        Ok(Self {
            flows,
            fetcher,
            config,
        })
    }

    pub async fn from_text(&self, input: &TextMaterialInput) -> Result<AcquiredContent> {
        input.check()?;
        let text = self
            .outline_step(input.content.clone(), SourceType::Text)
            .await?;
        Ok(AcquiredContent {
            title: input.title.clone(),
            source_type: SourceType::Text,
            source_url: None,
            text,
        })
    }

    pub async fn from_url(&self, input: &UrlMaterialInput) -> Result<AcquiredContent> {
        input.check()?;
        let page_text = self.fetcher.extract_text(&input.url).await?;
        let text = self.outline_step(page_text, SourceType::Url).await?;
        Ok(AcquiredContent {
            title: input.title.clone(),
            source_type: SourceType::Url,
            source_url: Some(input.url.clone()),
            text,
        })
    }

    /// OCR an upload. `source` is either `File` or `Outline`; outlines are
    /// always expanded into notes. The file name becomes the title.
    ///
    /// The model calls for one file are bounded by `file_timeout_secs`.
    pub async fn from_file(&self, upload: &FileUpload, source: SourceType) -> Result<AcquiredContent> {
        if !matches!(source, SourceType::File | SourceType::Outline) {
            return Err(AppError::validation(
                "source",
                "File uploads must use the file or outline source.",
            ));
        }
        upload.check_with_limit(self.config.max_upload_bytes)?;

        let limit = self.config.file_timeout();
        tokio::time::timeout(limit, self.read_file(upload, source))
            .await
            .map_err(|_| AppError::FileExtraction {
                file_name: upload.file_name.clone(),
                message: format!("timed out after {} seconds", limit.as_secs()),
            })?
    }

    async fn read_file(&self, upload: &FileUpload, source: SourceType) -> Result<AcquiredContent> {
        let media = DataUri::encode(&upload.mime_type, &upload.bytes).into_media();
        let raw_text = self.flows.extract_content_from_file(media).await?;
        let text = self.outline_step(raw_text, source).await?;

        Ok(AcquiredContent {
            title: upload.file_name.clone(),
            source_type: source,
            source_url: None,
            text,
        })
    }

    /// Expand outlines into notes. Explicit outline uploads always expand;
    /// other text is classified only when detection is enabled, and the
    /// source type is left as it was.
    async fn outline_step(&self, text: String, source: SourceType) -> Result<String> {
        let expand = match source {
            SourceType::Outline => true,
            _ if self.config.detect_outlines => self.flows.is_content_outline(&text).await,
            _ => false,
        };

        if !expand {
            return Ok(text);
        }
        tracing::info!(source = source.as_str(), "Expanding outline into notes");
        self.flows.generate_notes_from_outline(&text).await
    }
}
