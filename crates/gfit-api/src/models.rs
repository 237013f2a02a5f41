//! Wire types for the OAuth2 token endpoint and the Fitness REST API.
//!
//! The Fitness API speaks camelCase JSON and returns 64-bit timestamps as
//! strings in responses (but accepts them as numbers in requests), so
//! request and response points are modeled separately.

use serde::{Deserialize, Serialize};

/// The data type for step-count deltas.
pub const STEP_COUNT_DATA_TYPE: &str = "com.google.step_count.delta";

/// The merged estimated-steps source used for aggregate reads.
pub const ESTIMATED_STEPS_SOURCE: &str =
    "derived:com.google.step_count.delta:com.google.android.gms:estimated_steps";

/// One day, the fixed aggregate bucket duration.
pub const ONE_DAY_MILLIS: i64 = 86_400_000;

// ── OAuth2 token endpoint ────────────────────────────────────────────

/// Successful response from the token endpoint (snake_case on the wire).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Access + refresh token pair issued by the consent flow.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

// ── Error envelope ───────────────────────────────────────────────────

/// Google API error envelope: `{"error": {"code", "status", "message"}}`.
#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: u16,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: String,
}

// ── Data source registration ─────────────────────────────────────────

/// A derived data source descriptor, registered once per account.
///
/// The composite stream id the API derives from this descriptor looks like
/// `derived:com.google.step_count.delta:<project>:<manufacturer>:<model>:<uid>:<name>`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceDescriptor {
    pub data_stream_name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub application: Application,
    pub data_type: DataTypeSpec,
    pub device: Device,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub details_url: String,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataTypeSpec {
    pub field: Vec<DataTypeField>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataTypeField {
    pub name: String,
    pub format: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub manufacturer: String,
    pub model: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub uid: String,
    pub version: String,
}

impl DataSourceDescriptor {
    /// The fixed step-count descriptor this client registers.
    pub fn step_counter() -> Self {
        Self {
            data_stream_name: "MyDataSource".into(),
            source_type: "derived".into(),
            application: Application {
                details_url: "http://example.com".into(),
                name: "gFit stepper".into(),
                version: "1".into(),
            },
            data_type: DataTypeSpec {
                field: vec![DataTypeField {
                    name: "steps".into(),
                    format: "integer".into(),
                }],
                name: STEP_COUNT_DATA_TYPE.into(),
            },
            device: Device {
                manufacturer: "Pavlis".into(),
                model: "gFit stepper".into(),
                device_type: "tablet".into(),
                uid: "1000001".into(),
                version: "1.0".into(),
            },
        }
    }
}

/// Successful data-source creation response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDataSourceResponse {
    pub data_stream_id: String,
}

// ── Aggregate query ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRequest {
    pub aggregate_by: Vec<AggregateBy>,
    pub bucket_by_time: BucketByTime,
    pub start_time_millis: i64,
    pub end_time_millis: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateBy {
    pub data_type_name: String,
    pub data_source_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketByTime {
    pub duration_millis: i64,
}

/// Aggregate query result: buckets of datasets of points.
///
/// Timestamps come back as decimal strings. The shape is passed through
/// to the caller undisturbed; [`AggregateResponse::total_steps`] is the
/// only convenience offered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResponse {
    #[serde(default)]
    pub bucket: Vec<AggregateBucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateBucket {
    #[serde(default)]
    pub start_time_millis: Option<String>,
    #[serde(default)]
    pub end_time_millis: Option<String>,
    #[serde(default)]
    pub dataset: Vec<Dataset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub data_source_id: Option<String>,
    #[serde(default)]
    pub point: Vec<ResponsePoint>,
}

/// A data point as echoed by the API (string nanos).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePoint {
    #[serde(default)]
    pub start_time_nanos: Option<String>,
    #[serde(default)]
    pub end_time_nanos: Option<String>,
    #[serde(default)]
    pub data_type_name: Option<String>,
    #[serde(default)]
    pub origin_data_source_id: Option<String>,
    #[serde(default)]
    pub value: Vec<DataValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    #[serde(default)]
    pub int_val: Option<i64>,
    #[serde(default)]
    pub fp_val: Option<f64>,
}

impl AggregateResponse {
    /// Sum every integer value across all buckets and datasets.
    pub fn total_steps(&self) -> i64 {
        self.bucket
            .iter()
            .flat_map(|b| &b.dataset)
            .flat_map(|d| &d.point)
            .flat_map(|p| &p.value)
            .filter_map(|v| v.int_val)
            .sum()
    }
}

impl AggregateBucket {
    /// Sum of integer values within this bucket only.
    pub fn steps(&self) -> i64 {
        self.dataset
            .iter()
            .flat_map(|d| &d.point)
            .flat_map(|p| &p.value)
            .filter_map(|v| v.int_val)
            .sum()
    }
}

// ── Dataset patch ────────────────────────────────────────────────────

/// Request body for `PATCH .../datasets/{start}-{end}` (numeric nanos).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetPatch {
    pub data_source_id: String,
    pub max_end_time_ns: i64,
    pub min_start_time_ns: i64,
    pub point: Vec<WritePoint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WritePoint {
    pub data_type_name: String,
    pub start_time_nanos: i64,
    pub end_time_nanos: i64,
    pub origin_data_source_id: String,
    pub value: Vec<WriteValue>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteValue {
    pub int_val: i64,
}

/// Echoed dataset after a patch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetPatchResponse {
    #[serde(default)]
    pub data_source_id: Option<String>,
    #[serde(default)]
    pub min_start_time_ns: Option<String>,
    #[serde(default)]
    pub max_end_time_ns: Option<String>,
    #[serde(default)]
    pub point: Vec<ResponsePoint>,
}

impl DatasetPatchResponse {
    /// The first echoed integer value, if any.
    pub fn first_int_val(&self) -> Option<i64> {
        self.point
            .first()
            .and_then(|p| p.value.first())
            .and_then(|v| v.int_val)
    }
}
