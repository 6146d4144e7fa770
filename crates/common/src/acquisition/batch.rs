use serde::Serialize;
use std::future::Future;

use crate::domain::StudyMaterial;
use crate::errors::Result;
use crate::validation::FileUpload;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub file_name: String,
    pub message: String,
}

/// Result of a multi-file upload: every material created and every file
/// that failed
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub created: Vec<StudyMaterial>,
    pub failures: Vec<FileFailure>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// One line naming exactly the files that failed, if any did
    pub fn summary(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let names: Vec<&str> = self.failures.iter().map(|f| f.file_name.as_str()).collect();
        let noun = if names.len() == 1 { "file" } else { "files" };
        Some(format!(
            "Failed to process {} {}: {}",
            names.len(),
            noun,
            names.join(", ")
        ))
    }
}

/// Run `create` on each upload in order, one at a time. A failure is
/// recorded and the next file is still processed.
pub async fn process_sequentially<F, Fut>(uploads: Vec<FileUpload>, mut create: F) -> BatchOutcome
where
    F: FnMut(FileUpload) -> Fut,
    Fut: Future<Output = Result<StudyMaterial>>,
{
    let mut outcome = BatchOutcome::default();
    for upload in uploads {
        let file_name = upload.file_name.clone();
        match create(upload).await {
            Ok(material) => outcome.created.push(material),
            Err(err) => {
                tracing::warn!(file_name = %file_name, error = %err, "File upload failed");
                outcome.failures.push(FileFailure {
                    file_name,
                    message: err.to_string(),
                });
            }
        }
    }
    outcome
}
