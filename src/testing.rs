//! In-memory CloudFormation used by the unit tests.

use crate::aws::{
    AwsCloudFormationClient, AwsResult, DeleteStackInput, DescribeStackEventsInput,
    DescribeStackResourceDriftsInput, DescribeStacksInput, DetectStackDriftInput,
    DriftDetectionStatus, ListStacksInput, Stack, StackEvent, StackId, StackInput, StackResource,
    StackResourceDrift, StackSummary, TemplateSummary,
};
use crate::error::Error;
use crate::paginate::Page;
use crate::template::TemplateSource;
use crate::waiter::OperationKind;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

pub(crate) fn stack_missing() -> Error {
    Error::Validation("Stack with id demo does not exist".to_string())
}

pub(crate) fn access_denied() -> Error {
    Error::Service {
        code: "AccessDenied".to_string(),
        message: "not authorized".to_string(),
    }
}

pub(crate) fn event_at(
    stack_name: &str,
    timestamp: DateTime<Utc>,
    logical_id: &str,
    status: &str,
) -> StackEvent {
    StackEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        stack_name: stack_name.to_string(),
        timestamp,
        logical_resource_id: Some(logical_id.to_string()),
        physical_resource_id: None,
        resource_type: Some("AWS::S3::Bucket".to_string()),
        resource_status: Some(status.to_string()),
        resource_status_reason: None,
    }
}

pub(crate) fn summary(name: &str, status: &str) -> StackSummary {
    StackSummary {
        stack_id: Some(format!("arn:aws:cloudformation:eu-west-2:123456789012:stack/{}", name)),
        stack_name: name.to_string(),
        stack_status: status.to_string(),
        stack_status_reason: None,
        creation_time: Utc::now(),
        last_updated_time: None,
        drift_status: None,
    }
}

pub(crate) fn stack(name: &str, status: &str) -> Stack {
    Stack {
        stack_id: Some(format!("arn:aws:cloudformation:eu-west-2:123456789012:stack/{}", name)),
        stack_name: name.to_string(),
        description: None,
        stack_status: status.to_string(),
        stack_status_reason: None,
        creation_time: Utc::now(),
        last_updated_time: None,
        parameters: BTreeMap::new(),
        tags: BTreeMap::new(),
        outputs: Vec::new(),
        capabilities: Vec::new(),
        drift_status: None,
    }
}

#[derive(Default)]
struct State {
    calls: HashMap<&'static str, usize>,
    page_size: Option<usize>,

    summaries: Vec<StackSummary>,
    stacks: Vec<Stack>,
    resources: Vec<StackResource>,
    capabilities: Vec<String>,
    fail_pages_after: Option<usize>,

    created: Vec<StackInput>,
    updated: Vec<StackInput>,
    deleted: Vec<DeleteStackInput>,

    // newest last; served newest first like the real service
    events: Vec<StackEvent>,
    pending_events: VecDeque<Vec<StackEvent>>,
    event_rounds: usize,
    fail_events: Option<(usize, fn() -> Error)>,

    drift_requests: Vec<DetectStackDriftInput>,
    resource_drifts: Vec<StackResourceDrift>,
    drift_statuses: VecDeque<DriftDetectionStatus>,

    release_wait_after: usize,
    wait_error: Option<fn() -> Error>,
    waits: Vec<(String, OperationKind)>,
}

/// Scriptable stand in for CloudFormation.
///
/// Event listings reveal one pending batch per round (a round being a
/// request without a continuation token), and the wait primitive only
/// returns once enough rounds have been served.
#[derive(Default)]
pub(crate) struct FakeCloudFormation {
    state: Mutex<State>,
    rounds: Notify,
}

impl FakeCloudFormation {
    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    fn record(&self, name: &'static str) {
        self.with_state(|s| *s.calls.entry(name).or_default() += 1);
    }

    pub(crate) fn calls(&self, name: &'static str) -> usize {
        self.with_state(|s| s.calls.get(name).copied().unwrap_or_default())
    }

    pub(crate) fn event_rounds(&self) -> usize {
        self.with_state(|s| s.event_rounds)
    }

    pub(crate) fn set_page_size(&self, size: usize) {
        self.with_state(|s| s.page_size = Some(size));
    }

    pub(crate) fn set_summaries(&self, summaries: Vec<StackSummary>) {
        self.with_state(|s| s.summaries = summaries);
    }

    pub(crate) fn set_stacks(&self, stacks: Vec<Stack>) {
        self.with_state(|s| s.stacks = stacks);
    }

    pub(crate) fn set_resources(&self, resources: Vec<StackResource>) {
        self.with_state(|s| s.resources = resources);
    }

    pub(crate) fn set_capabilities(&self, capabilities: &[&str]) {
        self.with_state(|s| s.capabilities = capabilities.iter().map(|c| c.to_string()).collect());
    }

    /// Fail every listing page requested after `pages` have been served.
    pub(crate) fn fail_pages_after(&self, pages: usize) {
        self.with_state(|s| s.fail_pages_after = Some(pages));
    }

    pub(crate) fn publish_events(&self, events: Vec<StackEvent>) {
        self.with_state(|s| s.events.extend(events));
    }

    /// Queue a batch of events to appear on a later round.
    pub(crate) fn queue_events(&self, batch: Vec<StackEvent>) {
        self.with_state(|s| s.pending_events.push_back(batch));
    }

    /// Fail event listings once `rounds` rounds have succeeded.
    pub(crate) fn fail_events_after(&self, rounds: usize, make: fn() -> Error) {
        self.with_state(|s| s.fail_events = Some((rounds, make)));
    }

    pub(crate) fn set_resource_drifts(&self, drifts: Vec<StackResourceDrift>) {
        self.with_state(|s| s.resource_drifts = drifts);
    }

    pub(crate) fn queue_drift_status(&self, status: DriftDetectionStatus) {
        self.with_state(|s| s.drift_statuses.push_back(status));
    }

    /// Let the wait primitive return after `rounds` event rounds.
    pub(crate) fn release_wait_after(&self, rounds: usize) {
        self.with_state(|s| s.release_wait_after = rounds);
    }

    pub(crate) fn fail_wait_with(&self, make: fn() -> Error) {
        self.with_state(|s| s.wait_error = Some(make));
    }

    pub(crate) fn created(&self) -> Vec<StackInput> {
        self.with_state(|s| s.created.clone())
    }

    pub(crate) fn updated(&self) -> Vec<StackInput> {
        self.with_state(|s| s.updated.clone())
    }

    pub(crate) fn deleted(&self) -> Vec<DeleteStackInput> {
        self.with_state(|s| s.deleted.clone())
    }

    pub(crate) fn drift_requests(&self) -> Vec<DetectStackDriftInput> {
        self.with_state(|s| s.drift_requests.clone())
    }

    pub(crate) fn waits(&self) -> Vec<(String, OperationKind)> {
        self.with_state(|s| s.waits.clone())
    }

    fn page<T: Clone>(&self, items: &[T], token: Option<String>) -> AwsResult<Page<T>> {
        let (page_size, fail_after) = self.with_state(|s| (s.page_size, s.fail_pages_after));
        let start: usize = token.map(|t| t.parse().unwrap()).unwrap_or_default();
        let page_size = page_size.unwrap_or(usize::MAX);
        if let Some(limit) = fail_after {
            if start / page_size.max(1) >= limit {
                return Err(Error::Transport("connection reset".to_string()));
            }
        }
        let end = start.saturating_add(page_size).min(items.len());
        let next_token = if end < items.len() {
            Some(end.to_string())
        } else {
            None
        };
        Ok(Page::new(items[start..end].to_vec(), next_token))
    }
}

#[async_trait::async_trait]
impl AwsCloudFormationClient for FakeCloudFormation {
    async fn list_stacks(&self, input: ListStacksInput) -> AwsResult<Page<StackSummary>> {
        self.record("list_stacks");
        let summaries = self.with_state(|s| s.summaries.clone());
        let summaries: Vec<_> = summaries
            .into_iter()
            .filter(|s| {
                input.status_filter.is_empty() || input.status_filter.contains(&s.stack_status)
            })
            .collect();
        self.page(&summaries, input.next_token)
    }

    async fn describe_stacks(&self, input: DescribeStacksInput) -> AwsResult<Page<Stack>> {
        self.record("describe_stacks");
        let stacks = self.with_state(|s| s.stacks.clone());
        match input.stack_name {
            Some(name) => {
                let found: Vec<_> = stacks.into_iter().filter(|s| s.stack_name == name).collect();
                if found.is_empty() {
                    return Err(Error::Validation(format!("Stack with id {} does not exist", name)));
                }
                Ok(Page::new(found, None))
            }
            None => self.page(&stacks, input.next_token),
        }
    }

    async fn create_stack(&self, input: StackInput) -> AwsResult<StackId> {
        self.record("create_stack");
        let stack_id = format!(
            "arn:aws:cloudformation:eu-west-2:123456789012:stack/{}/{}",
            input.stack_name,
            uuid::Uuid::new_v4()
        );
        self.with_state(|s| {
            let mut created = stack(&input.stack_name, "CREATE_IN_PROGRESS");
            created.stack_id = Some(stack_id.clone());
            created.tags = input.tags.iter().map(|t| (t.key.clone(), t.value.clone())).collect();
            s.stacks.push(created);
            s.created.push(input);
        });
        Ok(StackId {
            stack_id: Some(stack_id),
        })
    }

    async fn update_stack(&self, input: StackInput) -> AwsResult<StackId> {
        self.record("update_stack");
        self.with_state(|s| {
            let existing = s.stacks.iter().find(|st| st.stack_name == input.stack_name);
            match existing {
                Some(st) => {
                    let id = st.stack_id.clone();
                    s.updated.push(input);
                    Ok(StackId { stack_id: id })
                }
                None => Err(Error::Validation(format!(
                    "Stack [{}] does not exist",
                    input.stack_name
                ))),
            }
        })
    }

    async fn delete_stack(&self, input: DeleteStackInput) -> AwsResult<()> {
        self.record("delete_stack");
        self.with_state(|s| s.deleted.push(input));
        Ok(())
    }

    async fn validate_template(&self, _template: TemplateSource) -> AwsResult<TemplateSummary> {
        self.record("validate_template");
        let capabilities = self.with_state(|s| s.capabilities.clone());
        Ok(TemplateSummary {
            capabilities,
            ..Default::default()
        })
    }

    async fn describe_stack_events(
        &self,
        input: DescribeStackEventsInput,
    ) -> AwsResult<Page<StackEvent>> {
        self.record("describe_stack_events");
        let is_round = input.next_token.is_none();
        let outcome = self.with_state(|s| {
            if is_round {
                if let Some((after, make)) = s.fail_events {
                    if s.event_rounds >= after {
                        s.event_rounds += 1;
                        return Err(make());
                    }
                }
                s.event_rounds += 1;
                if let Some(batch) = s.pending_events.pop_front() {
                    s.events.extend(batch);
                }
            }
            let mut newest_first = s.events.clone();
            newest_first.reverse();
            Ok(newest_first)
        });
        if is_round {
            self.rounds.notify_waiters();
        }
        self.page(&outcome?, input.next_token)
    }

    async fn describe_stack_resources(
        &self,
        _stack_name: String,
    ) -> AwsResult<Vec<StackResource>> {
        self.record("describe_stack_resources");
        Ok(self.with_state(|s| s.resources.clone()))
    }

    async fn detect_stack_drift(&self, input: DetectStackDriftInput) -> AwsResult<String> {
        self.record("detect_stack_drift");
        let id = uuid::Uuid::new_v4().to_string();
        self.with_state(|s| s.drift_requests.push(input));
        Ok(id)
    }

    async fn describe_stack_resource_drifts(
        &self,
        input: DescribeStackResourceDriftsInput,
    ) -> AwsResult<Page<StackResourceDrift>> {
        self.record("describe_stack_resource_drifts");
        let drifts: Vec<_> = self
            .with_state(|s| s.resource_drifts.clone())
            .into_iter()
            .filter(|d| {
                input.status_filter.is_empty() || input.status_filter.contains(&d.drift_status)
            })
            .collect();
        self.page(&drifts, input.next_token)
    }

    async fn describe_stack_drift_detection_status(
        &self,
        detection_id: String,
    ) -> AwsResult<DriftDetectionStatus> {
        self.record("describe_stack_drift_detection_status");
        self.with_state(|s| {
            let status = if s.drift_statuses.len() > 1 {
                s.drift_statuses.pop_front()
            } else {
                s.drift_statuses.front().cloned()
            };
            status
                .map(|mut st| {
                    st.detection_id = detection_id.clone();
                    st
                })
                .ok_or_else(|| Error::Validation(format!("no detection {}", detection_id)))
        })
    }

    async fn wait_until_complete(
        &self,
        stack_name: String,
        kind: OperationKind,
        _max_wait: Duration,
    ) -> AwsResult<()> {
        self.record("wait_until_complete");
        self.with_state(|s| s.waits.push((stack_name, kind)));
        loop {
            let notified = self.rounds.notified();
            let ready = self.with_state(|s| s.event_rounds >= s.release_wait_after);
            if ready {
                break;
            }
            notified.await;
        }
        match self.with_state(|s| s.wait_error) {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }
}
