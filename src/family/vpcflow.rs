use super::{BucketLayout, LogFamily};
use crate::store::Partition;
use chrono::DateTime;
use serde::Serialize;
use tracing::warn;

const FIELD_COUNT: usize = 14;
const SOURCE_TAG: &str = "vpc";

/// One parsed flow-log line. Field order follows the fixed v2 schema;
/// `start`/`end` are converted from epoch seconds to ISO-8601 UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowRecord {
    pub version: String,
    pub account_id: String,
    pub interface_id: String,
    pub srcaddr: String,
    pub dstaddr: String,
    pub srcport: String,
    pub dstport: String,
    pub protocol: String,
    pub packets: String,
    pub bytes: String,
    pub start: String,
    pub end: String,
    pub action: String,
    pub log_status: String,
    pub source: String,
}

pub struct VpcFlowFamily;

impl VpcFlowFamily {
    fn full_prefix(&self, layout: &BucketLayout, account_id: &str, region: &str) -> String {
        format!(
            "{}AWSLogs/{}{}/{}/{}/",
            layout.prefix,
            layout.suffix,
            account_id,
            self.service(),
            region
        )
    }
}

impl LogFamily for VpcFlowFamily {
    fn service(&self) -> &'static str {
        "vpcflowlogs"
    }

    fn source(&self) -> &'static str {
        SOURCE_TAG
    }

    fn object_prefix(&self, layout: &BucketLayout, partition: &Partition, date: &str) -> String {
        format!(
            "{}{}/{}_{}_{}_{}",
            self.full_prefix(layout, &partition.account_id, &partition.region),
            date,
            partition.account_id,
            self.service(),
            partition.region,
            partition.flow_log_id
        )
    }

    fn parse_object(&self, raw: &[u8]) -> Vec<serde_json::Value> {
        parse_lines(&String::from_utf8_lossy(raw))
            .iter()
            .filter_map(|record| serde_json::to_value(record).ok())
            .collect()
    }
}

/// Parse every well-formed line of one object's content.
pub fn parse_lines(content: &str) -> Vec<FlowRecord> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<FlowRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != FIELD_COUNT {
        warn!(
            expected = FIELD_COUNT,
            got = fields.len(),
            "skipping malformed flow log line"
        );
        return None;
    }

    let start = epoch_to_iso(fields[10])?;
    let end = epoch_to_iso(fields[11])?;

    Some(FlowRecord {
        version: fields[0].to_string(),
        account_id: fields[1].to_string(),
        interface_id: fields[2].to_string(),
        srcaddr: fields[3].to_string(),
        dstaddr: fields[4].to_string(),
        srcport: fields[5].to_string(),
        dstport: fields[6].to_string(),
        protocol: fields[7].to_string(),
        packets: fields[8].to_string(),
        bytes: fields[9].to_string(),
        start,
        end,
        action: fields[12].to_string(),
        log_status: fields[13].to_string(),
        source: SOURCE_TAG.to_string(),
    })
}

fn epoch_to_iso(value: &str) -> Option<String> {
    let secs: i64 = match value.parse() {
        Ok(secs) => secs,
        Err(_) => {
            warn!(value, "skipping line with non-numeric timestamp");
            return None;
        }
    };
    DateTime::from_timestamp(secs, 0).map(|ts| ts.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LINE: &str = "2 123456789123 eni-12345678912345678 0.0.0.0 0.0.0.0 3500 52000 6 39 4698 1622505433 1622505730 ACCEPT OK";

    #[test]
    fn test_parse_single_line() {
        let records = parse_lines(SAMPLE_LINE);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.version, "2");
        assert_eq!(record.account_id, "123456789123");
        assert_eq!(record.interface_id, "eni-12345678912345678");
        assert_eq!(record.srcport, "3500");
        assert_eq!(record.dstport, "52000");
        assert_eq!(record.protocol, "6");
        assert_eq!(record.packets, "39");
        assert_eq!(record.bytes, "4698");
        assert_eq!(record.start, "2021-06-01T00:17:13Z");
        assert_eq!(record.end, "2021-06-01T00:22:10Z");
        assert_eq!(record.action, "ACCEPT");
        assert_eq!(record.log_status, "OK");
        assert_eq!(record.source, "vpc");
    }

    #[test]
    fn test_malformed_line_is_skipped_not_fatal() {
        let content = format!("{}\nshort line\n{}\n", SAMPLE_LINE, SAMPLE_LINE);
        let records = parse_lines(&content);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_non_numeric_timestamp_is_skipped() {
        let bad = SAMPLE_LINE.replace("1622505433", "not-a-number");
        assert!(parse_lines(&bad).is_empty());
    }

    #[test]
    fn test_blank_lines_ignored() {
        let content = format!("\n{}\n\n", SAMPLE_LINE);
        assert_eq!(parse_lines(&content).len(), 1);
    }

    #[test]
    fn test_parse_object_tags_source() {
        let values = VpcFlowFamily.parse_object(SAMPLE_LINE.as_bytes());
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["source"], "vpc");
        assert_eq!(values[0]["account_id"], "123456789123");
    }

    #[test]
    fn test_object_prefix_layout() {
        let layout = BucketLayout {
            bucket: "test-bucket".into(),
            prefix: "".into(),
            suffix: "".into(),
        };
        let partition = Partition::new("123456789", "us-east-1", "fl-1234");

        let prefix = VpcFlowFamily.object_prefix(&layout, &partition, "2019/04/15");
        assert_eq!(
            prefix,
            "AWSLogs/123456789/vpcflowlogs/us-east-1/2019/04/15/123456789_vpcflowlogs_us-east-1_fl-1234"
        );
    }

    #[test]
    fn test_object_prefix_with_prefix_and_suffix() {
        let layout = BucketLayout {
            bucket: "test-bucket".into(),
            prefix: "vpc/".into(),
            suffix: "org-1/".into(),
        };
        let partition = Partition::new("123456789", "us-east-1", "fl-1234");

        let prefix = VpcFlowFamily.object_prefix(&layout, &partition, "2019/04/15");
        assert_eq!(
            prefix,
            "vpc/AWSLogs/org-1/123456789/vpcflowlogs/us-east-1/2019/04/15/123456789_vpcflowlogs_us-east-1_fl-1234"
        );
    }

    #[test]
    fn test_bucket_path() {
        let layout = BucketLayout {
            bucket: "test-bucket".into(),
            prefix: "".into(),
            suffix: "".into(),
        };
        assert_eq!(layout.bucket_path(), "test-bucket/");
    }
}
