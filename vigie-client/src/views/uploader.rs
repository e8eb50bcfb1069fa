//! Historical data import (`.csv` / `.json` only).

use std::path::Path;
use tracing::info;

use crate::api::{MaintenanceApi, SharedApi};
use crate::error::ViewError;
use crate::models::UploadSummary;
use crate::validation::check_upload_file_name;

pub struct DataUploader<A> {
    api: SharedApi<A>,
}

impl<A: MaintenanceApi> DataUploader<A> {
    pub fn new(api: SharedApi<A>) -> Self {
        Self { api }
    }

    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<UploadSummary, ViewError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        check_upload_file_name(&file_name)?;
        let content = tokio::fs::read(path).await?;
        self.upload_bytes(&file_name, content).await
    }

    pub async fn upload_bytes(&self, file_name: &str, content: Vec<u8>) -> Result<UploadSummary, ViewError> {
        check_upload_file_name(file_name)?;
        let size = content.len();
        let summary = self.api.upload_historical_data(file_name, content).await?;
        info!("[upload] {file_name} ({size} bytes): {} readings processed", summary.readings_processed);
        Ok(summary)
    }
}
