// Step-count endpoints
//
// Aggregate reads come from the merged estimated-steps source; writes go
// to our own derived data source and are verified against the echoed
// response, since the API has been seen silently accepting values.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::client::FitClient;
use crate::error::Error;
use crate::models::{
    AggregateBy, AggregateRequest, AggregateResponse, BucketByTime, DatasetPatch,
    DatasetPatchResponse, ESTIMATED_STEPS_SOURCE, ONE_DAY_MILLIS, STEP_COUNT_DATA_TYPE,
    WritePoint, WriteValue,
};
use crate::time::{NANOS_PER_MILLI, to_millis};

impl FitClient {
    /// Aggregate step counts over `[start, end)`, bucketed into 24-hour
    /// windows. The decoded response is returned as-is; its shape is not
    /// validated beyond JSON structure.
    ///
    /// `POST users/me/dataset:aggregate`
    pub async fn get_steps(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<AggregateResponse, Error> {
        let url = self.api_url("users/me/dataset:aggregate")?;
        let request = AggregateRequest {
            aggregate_by: vec![AggregateBy {
                data_type_name: STEP_COUNT_DATA_TYPE.into(),
                data_source_id: ESTIMATED_STEPS_SOURCE.into(),
            }],
            bucket_by_time: BucketByTime {
                duration_millis: ONE_DAY_MILLIS,
            },
            start_time_millis: to_millis(start),
            end_time_millis: to_millis(end),
        };

        self.post_json(url, &request).await
    }

    /// Write a single step-count data point over `[start, end)` and
    /// verify the server echoed the same value back.
    ///
    /// `PATCH users/me/dataSources/{id}/datasets/{startMs}-{endMs}`
    pub async fn set_steps(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        steps: i64,
    ) -> Result<DatasetPatchResponse, Error> {
        let start_ms = to_millis(start);
        let end_ms = to_millis(end);

        let url = self.api_url(&format!(
            "users/me/dataSources/{}/datasets/{start_ms}-{end_ms}",
            self.data_source_id()
        ))?;

        let patch = DatasetPatch {
            data_source_id: self.data_source_id().to_owned(),
            max_end_time_ns: end_ms * NANOS_PER_MILLI,
            min_start_time_ns: start_ms * NANOS_PER_MILLI,
            point: vec![WritePoint {
                data_type_name: STEP_COUNT_DATA_TYPE.into(),
                start_time_nanos: start_ms * NANOS_PER_MILLI,
                end_time_nanos: end_ms * NANOS_PER_MILLI,
                origin_data_source_id: String::new(),
                value: vec![WriteValue { int_val: steps }],
            }],
        };

        let echoed: DatasetPatchResponse = self.patch_json(url, &patch).await?;

        match echoed.first_int_val() {
            Some(val) if val == steps => {
                debug!("wrote {steps} steps over {start_ms}-{end_ms}");
                Ok(echoed)
            }
            got => Err(Error::WriteVerification {
                expected: steps,
                got,
            }),
        }
    }
}
