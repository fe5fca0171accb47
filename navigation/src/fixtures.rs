//! Pre-recorded responses served in place of the upstream when a local
//! deployment cannot reach it.

use crate::api_manager::ApiError;
use crate::response::ApiResponse;
use crate::transport::TransportError;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct FixtureStore {
    dir: PathBuf,
}

impl FixtureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FixtureStore { dir: dir.into() }
    }

    /// `/api/v1/global-menu` + `fi` -> `api-v1-global-menu-fi.json`
    pub fn file_name(endpoint: &str, langcode: &str) -> String {
        format!(
            "{}-{langcode}.json",
            endpoint.trim_start_matches('/').replace('/', "-")
        )
    }

    pub fn path(&self, endpoint: &str, langcode: &str) -> PathBuf {
        self.dir.join(Self::file_name(endpoint, langcode))
    }

    pub fn load(
        &self,
        endpoint: &str,
        langcode: &str,
        cause: &TransportError,
    ) -> Result<ApiResponse, ApiError> {
        let path = self.path(endpoint, langcode);

        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ApiError::FixtureNotFound {
                    message: cause.message.clone(),
                    file: Self::file_name(endpoint, langcode),
                    endpoint: endpoint.to_string(),
                });
            }
            Err(err) => return Err(ApiError::Fixture(err.to_string())),
        };

        ApiResponse::from_json(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}
