/// Starter config written by `floe config init`.
pub fn generate_starter_config() -> &'static str {
    r#"# floe configuration
#
# Collects AWS VPC Flow Logs from S3, forwards parsed records, and tracks
# processed objects in a local DuckDB table so re-runs never repeat work.

bucket:
  # S3 bucket holding the flow logs.
  name: my-flow-logs
  # Optional key prefix ahead of the AWSLogs/ root.
  prefix: ""
  # Optional organization path between AWSLogs/ and the account id.
  suffix: ""

aws:
  # Credential precedence: access_key+secret_key, then profile, then the
  # SDK default chain. $env{VAR} is expanded at load time.
  # access_key: $env{AWS_ACCESS_KEY_ID}
  # secret_key: $env{AWS_SECRET_ACCESS_KEY}
  # profile: default
  #
  # Leave empty to discover accounts and regions from the bucket layout.
  accounts: []
  regions: []

database:
  path: ~/.local/share/floe/floe.duckdb
  table: vpcflow
  # Tracking rows kept per (account, region, flow-log-id) partition.
  retain_rows: 500

scan:
  # Lower bound for the scan window, YYYYMMDD.
  # only_logs_after: "20240101"
  reparse: false
  date_format: "%Y/%m/%d"

sink:
  # stdout or file
  type: stdout
  # path: ~/floe-events.jsonl
"#
}
