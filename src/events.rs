use crate::aws::{AwsCloudFormationClient, DescribeStackEventsInput, StackEvent};
use crate::error::Error;
use crate::paginate::paginate;
use chrono::{DateTime, Utc};
use futures::FutureExt;

/// Fetch every event for the stack newer than `since`, oldest first.
///
/// With `since` unset nothing is filtered out. The watermark is only read,
/// so this is safe to call repeatedly from a polling loop.
#[tracing::instrument(skip(client))]
pub(crate) async fn fetch_events(
    client: &impl AwsCloudFormationClient,
    stack_name: &str,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<StackEvent>, Error> {
    let events = paginate(|next_token| {
        let input = DescribeStackEventsInput {
            stack_name: stack_name.to_string(),
            next_token,
        };
        client.describe_stack_events(input).boxed()
    })
    .await
    .into_result()?;

    let mut events: Vec<_> = match since {
        Some(since) => events.into_iter().filter(|e| e.timestamp > since).collect(),
        None => events,
    };
    events.sort_by_key(|e| e.timestamp);

    tracing::debug!(nevents = events.len(), "fetched events");
    Ok(events)
}
