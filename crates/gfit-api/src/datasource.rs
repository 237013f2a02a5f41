// Data-source registration
//
// A derived data source is created once per account; every later creation
// attempt answers HTTP 409 ALREADY_EXISTS with the existing id embedded
// in the human-readable message. That string contract is fragile, so the
// extraction lives in one function with explicit markers.

use tracing::debug;

use crate::client::FitClient;
use crate::error::Error;
use crate::models::{CreateDataSourceResponse, DataSourceDescriptor};

/// Marker preceding the stream id in the 409 conflict message.
const EXISTS_PREFIX: &str = "Data Source: ";
/// Marker following the stream id in the 409 conflict message.
const EXISTS_SUFFIX: &str = " already exists";

/// Pull the existing stream id out of a conflict message like
/// `"Data Source: derived:...:MyDataSource already exists"`.
///
/// Returns `None` when the message does not match the known format --
/// the API changed its wording and the contract needs updating.
fn extract_existing_stream_id(message: &str) -> Option<&str> {
    message
        .strip_prefix(EXISTS_PREFIX)?
        .strip_suffix(EXISTS_SUFFIX)
}

impl FitClient {
    /// Register the step data source, or resolve the id of the one that
    /// already exists. Idempotent: repeated calls yield the same id.
    ///
    /// `POST users/me/dataSources`
    pub async fn ensure_data_source(&self) -> Result<String, Error> {
        let url = self.api_url("users/me/dataSources")?;
        let descriptor = DataSourceDescriptor::step_counter();

        match self
            .post_json::<CreateDataSourceResponse>(url, &descriptor)
            .await
        {
            Ok(created) => {
                debug!("data source created: {}", created.data_stream_id);
                Ok(created.data_stream_id)
            }
            Err(Error::Api {
                status: 409,
                code: Some(ref code),
                ref message,
            }) if code == "ALREADY_EXISTS" => {
                debug!("data source already exists, extracting id");
                extract_existing_stream_id(message)
                    .map(str::to_owned)
                    .ok_or_else(|| Error::DataSource {
                        message: format!("conflict message in unexpected format: {message}"),
                    })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_between_markers() {
        assert_eq!(
            extract_existing_stream_id("Data Source: XYZ already exists"),
            Some("XYZ")
        );
    }

    #[test]
    fn extracts_composite_stream_id() {
        let message = "Data Source: derived:com.google.step_count.delta:1099052750196:\
                       Pavlis:gFit stepper:1000001:MyDataSource already exists";
        let id = extract_existing_stream_id(message).expect("known format");
        assert!(id.starts_with("derived:com.google.step_count.delta:"));
        assert!(id.ends_with(":MyDataSource"));
    }

    #[test]
    fn rejects_unknown_wording() {
        assert_eq!(extract_existing_stream_id("Data Source: XYZ is taken"), None);
        assert_eq!(extract_existing_stream_id("Source XYZ already exists"), None);
        assert_eq!(extract_existing_stream_id(""), None);
    }
}
