use crate::aws::StackEvent;
use crate::stack_status::StackStatus;
use crate::waiter::OperationKind;
use chrono::SecondsFormat;
use std::convert::TryFrom;
use std::fmt::Debug;
use termcolor::WriteColor;

/// Writes the live event feed shown while waiting on a stack.
pub(crate) struct Writer<W>(W);

impl<W> Writer<W>
where
    W: WriteColor,
{
    pub(crate) fn new(inner: W) -> Self {
        Self(inner)
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.0
    }

    /// `[ stack | <kind> ] <name>\t<timestamp>\t<logical id>\t<status>[\t<reason>]`
    pub(crate) fn write_event(
        &mut self,
        kind: OperationKind,
        stack_name: &str,
        event: &StackEvent,
    ) -> std::io::Result<()> {
        let resource_name = event.logical_resource_id.as_deref().unwrap_or_default();
        let status = event.resource_status.as_deref().unwrap_or_default();

        write!(
            self.0,
            "[ stack | {kind} ] {stack_name}\t{timestamp}\t{resource_name}\t",
            kind = kind,
            stack_name = stack_name,
            timestamp = event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            resource_name = resource_name,
        )?;

        let color = StackStatus::try_from(status)
            .ok()
            .and_then(|s| s.color_spec());
        if let Some(spec) = color {
            self.0.set_color(&spec)?;
        }
        write!(self.0, "{}", status)?;
        self.0.reset()?;

        match event.resource_status_reason.as_deref() {
            Some(reason) => writeln!(self.0, "\t{}", reason)?,
            None => writeln!(self.0)?,
        }
        self.0.flush()
    }
}

impl<W> Debug for Writer<W> {
    fn fmt(&self, w: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        w.write_str("writer")
    }
}
