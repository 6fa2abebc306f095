use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

pub const DOWNLOAD_FILE_NAME: &str = "website.html";
pub const HTML_CONTENT_TYPE: &str = "text/html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadFile {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Packages the artifact as `website.html`. Returns `None` when there is
/// nothing to export.
pub fn export_artifact(artifact: &str) -> Option<DownloadFile> {
    if artifact.is_empty() {
        return None;
    }

    Some(DownloadFile {
        file_name: DOWNLOAD_FILE_NAME,
        content_type: HTML_CONTENT_TYPE,
        body: artifact.as_bytes().to_vec(),
    })
}

impl DownloadFile {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }
}

impl IntoResponse for DownloadFile {
    fn into_response(self) -> Response {
        let disposition = self.content_disposition();
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, self.content_type.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
            self.body,
        )
            .into_response()
    }
}
