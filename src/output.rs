use crate::aws::{
    DriftDetectionStatus, Stack, StackEvent, StackResource, StackResourceDrift, StackSummary,
    TemplateSummary,
};
use chrono::{DateTime, SecondsFormat, Utc};
use eyre::{eyre, Result, WrapErr};
use serde::Serialize;
use std::io::Write;
use std::str::FromStr;
use term_table::row::Row;
use term_table::table_cell::TableCell;
use term_table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Yaml,
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yaml" => Ok(OutputFormat::Yaml),
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            other => Err(eyre!("unknown output format {:?}, expected yaml, json or table", other)),
        }
    }
}

/// Records that can be laid out as rows of a table.
pub(crate) trait Tabular {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

impl Tabular for StackSummary {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Status", "Created", "Updated", "Drift"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.stack_name.clone(),
            self.stack_status.clone(),
            time(&self.creation_time),
            self.last_updated_time.as_ref().map(time).unwrap_or_default(),
            opt(&self.drift_status),
        ]
    }
}

impl Tabular for Stack {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Status", "Reason", "Created", "Parameters", "Tags"]
    }

    fn row(&self) -> Vec<String> {
        let pairs = |m: &std::collections::BTreeMap<String, String>| {
            m.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("\n")
        };
        vec![
            self.stack_name.clone(),
            self.stack_status.clone(),
            opt(&self.stack_status_reason),
            time(&self.creation_time),
            pairs(&self.parameters),
            pairs(&self.tags),
        ]
    }
}

impl Tabular for StackEvent {
    fn headers() -> Vec<&'static str> {
        vec!["Timestamp", "Resource", "Status", "Reason"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            time(&self.timestamp),
            opt(&self.logical_resource_id),
            opt(&self.resource_status),
            opt(&self.resource_status_reason),
        ]
    }
}

impl Tabular for StackResource {
    fn headers() -> Vec<&'static str> {
        vec!["Resource", "Type", "Physical ID", "Status"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.logical_resource_id.clone(),
            self.resource_type.clone(),
            opt(&self.physical_resource_id),
            self.resource_status.clone(),
        ]
    }
}

impl Tabular for StackResourceDrift {
    fn headers() -> Vec<&'static str> {
        vec!["Resource", "Type", "Drift", "Differences"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.logical_resource_id.clone(),
            self.resource_type.clone(),
            self.drift_status.clone(),
            self.property_differences
                .iter()
                .map(|d| format!("{} ({})", d.property_path, d.difference_type))
                .collect::<Vec<_>>()
                .join("\n"),
        ]
    }
}

impl Tabular for DriftDetectionStatus {
    fn headers() -> Vec<&'static str> {
        vec!["Detection ID", "Detection", "Drift", "Drifted resources", "Reason"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.detection_id.clone(),
            self.detection_status.clone(),
            opt(&self.stack_drift_status),
            self.drifted_stack_resource_count
                .map(|n| n.to_string())
                .unwrap_or_default(),
            opt(&self.detection_status_reason),
        ]
    }
}

impl Tabular for TemplateSummary {
    fn headers() -> Vec<&'static str> {
        vec!["Description", "Capabilities", "Parameters"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            opt(&self.description),
            self.capabilities.join("\n"),
            self.parameters
                .iter()
                .filter_map(|p| p.key.clone())
                .collect::<Vec<_>>()
                .join("\n"),
        ]
    }
}

/// Render records in the requested format.
pub(crate) fn render<T>(format: OutputFormat, records: &[T]) -> Result<String>
where
    T: Serialize + Tabular,
{
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(records).wrap_err("serialising yaml"),
        OutputFormat::Json => serde_json::to_string_pretty(records).wrap_err("serialising json"),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.add_row(Row::new(T::headers().into_iter().map(TableCell::new)));
            for record in records {
                table.add_row(Row::new(record.row().into_iter().map(TableCell::new)));
            }
            Ok(table.render())
        }
    }
}

pub(crate) fn print<T>(mut w: impl Write, format: OutputFormat, records: &[T]) -> Result<()>
where
    T: Serialize + Tabular,
{
    let rendered = render(format, records)?;
    writeln!(w, "{}", rendered.trim_end()).wrap_err("printing output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn parses_formats() {
        assert_eq!("yaml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn json_output_is_an_array_of_records() {
        let records = vec![testing::summary("demo", "CREATE_COMPLETE")];
        let rendered = render(OutputFormat::Json, &records).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value[0]["stack_name"], "demo");
        assert_eq!(value[0]["stack_status"], "CREATE_COMPLETE");
    }

    #[test]
    fn yaml_output_contains_fields() {
        let records = vec![testing::stack("demo", "UPDATE_COMPLETE")];
        let rendered = render(OutputFormat::Yaml, &records).unwrap();
        assert!(rendered.contains("stack_name: demo"));
        assert!(rendered.contains("stack_status: UPDATE_COMPLETE"));
    }

    #[test]
    fn table_output_has_header_and_rows() {
        let records = vec![
            testing::summary("alpha", "CREATE_COMPLETE"),
            testing::summary("beta", "ROLLBACK_COMPLETE"),
        ];
        let rendered = render(OutputFormat::Table, &records).unwrap();
        assert!(rendered.contains("Name"));
        assert!(rendered.contains("alpha"));
        assert!(rendered.contains("ROLLBACK_COMPLETE"));
    }
}
