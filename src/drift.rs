use crate::aws::{
    AwsCloudFormationClient, DescribeStackResourceDriftsInput, DetectStackDriftInput,
    DriftDetectionStatus, StackResourceDrift,
};
use crate::error::Error;
use crate::paginate::paginate;
use crate::stacks::StackManager;
use futures::FutureExt;
use std::time::Duration;

pub(crate) const DETECTION_IN_PROGRESS: &str = "DETECTION_IN_PROGRESS";

impl<C> StackManager<C>
where
    C: AwsCloudFormationClient,
{
    /// Kick off drift detection and return the detection id without waiting
    /// for the job to finish.
    #[tracing::instrument(skip(self))]
    pub(crate) async fn detect_drift(
        &self,
        stack_name: &str,
        resource_ids: &[String],
    ) -> Result<String, Error> {
        if stack_name.is_empty() {
            return Err(Error::InvalidInput("missing stack name".to_string()));
        }

        let input = DetectStackDriftInput {
            stack_name: stack_name.to_string(),
            logical_resource_ids: resource_ids.to_vec(),
        };
        let detection_id = self.client().detect_stack_drift(input).await?;
        tracing::info!(%detection_id, "drift detection started");
        Ok(detection_id)
    }

    /// Latest drift result for each resource in the stack.
    pub(crate) async fn describe_resource_drifts(
        &self,
        stack_name: &str,
        status_filter: &[String],
    ) -> Result<Vec<StackResourceDrift>, Error> {
        if stack_name.is_empty() {
            return Err(Error::InvalidInput("missing stack name".to_string()));
        }

        paginate(|next_token| {
            let input = DescribeStackResourceDriftsInput {
                stack_name: stack_name.to_string(),
                status_filter: status_filter.to_vec(),
                next_token,
            };
            self.client().describe_stack_resource_drifts(input).boxed()
        })
        .await
        .into_result()
    }

    pub(crate) async fn drift_status(&self, detection_id: &str) -> Result<DriftDetectionStatus, Error> {
        if detection_id.is_empty() {
            return Err(Error::InvalidInput("missing drift detection id".to_string()));
        }
        self.client()
            .describe_stack_drift_detection_status(detection_id.to_string())
            .await
    }

    /// Poll a detection job until it leaves the in-progress state.
    #[tracing::instrument(skip(self))]
    pub(crate) async fn wait_for_drift_detection(
        &self,
        detection_id: &str,
        interval: Duration,
    ) -> Result<DriftDetectionStatus, Error> {
        loop {
            let status = self.drift_status(detection_id).await?;
            if status.detection_status != DETECTION_IN_PROGRESS {
                tracing::debug!(status = %status.detection_status, "drift detection finished");
                return Ok(status);
            }
            tracing::trace!("sleeping");
            tokio::time::sleep(interval).await;
        }
    }
}
