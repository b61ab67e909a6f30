//! Instance record dataset.
//!
//! The orchestrator drops a JSON document describing every provisioned
//! instance: a `record_keys` header naming the columns and `record_infos`
//! rows of values. Each row yields one name of the form
//! `<id>.<instance_group>.<network>.<deployment>.<local domain>` pointing
//! at the instance ip. Malformed rows are skipped with a warning so one
//! bad row never takes DNS down.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::names::fqdn;

#[derive(Error, Debug, Clone)]
pub enum RecordsError {
    #[error("Failed to read records file {0}: {1}")]
    FileRead(String, String),

    #[error("Failed to parse records file: {0}")]
    Parse(String),

    #[error("Records file is missing required column '{0}'")]
    MissingColumn(String),
}

#[derive(Debug, Deserialize)]
struct RecordsDocument {
    record_keys: Vec<String>,
    record_infos: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub id: String,
    pub group: String,
    pub network: String,
    pub deployment: String,
    pub ip: String,
}

impl InstanceRecord {
    pub fn name(&self, domain: &str) -> String {
        fqdn(&format!(
            "{}.{}.{}.{}.{}",
            self.id, self.group, self.network, self.deployment, domain
        ))
    }
}

/// Immutable snapshot of the records file, indexed for lookup under one
/// local domain.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<InstanceRecord>,
    by_name: HashMap<String, Vec<String>>,
}

impl RecordSet {
    /// Parses the records document, indexing names under `domain`.
    pub fn from_json(raw: &str, domain: &str) -> Result<Self, RecordsError> {
        let document: RecordsDocument =
            serde_json::from_str(raw).map_err(|e| RecordsError::Parse(e.to_string()))?;

        let id = column(&document.record_keys, "id")?;
        let group = column(&document.record_keys, "instance_group")?;
        let network = column(&document.record_keys, "network")?;
        let deployment = column(&document.record_keys, "deployment")?;
        let ip = column(&document.record_keys, "ip")?;

        let mut records = Vec::with_capacity(document.record_infos.len());
        for (row_index, row) in document.record_infos.iter().enumerate() {
            let cells = [
                cell(row, id),
                cell(row, group),
                cell(row, network),
                cell(row, deployment),
                cell(row, ip),
            ];
            match cells {
                [Some(id), Some(group), Some(network), Some(deployment), Some(ip)] => {
                    records.push(InstanceRecord {
                        id: id.to_string(),
                        group: group.to_string(),
                        network: network.to_string(),
                        deployment: deployment.to_string(),
                        ip: ip.to_string(),
                    });
                }
                _ => {
                    warn!(row = row_index, "Skipping malformed record row");
                }
            }
        }

        let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
        for record in &records {
            by_name
                .entry(record.name(domain))
                .or_default()
                .push(record.ip.clone());
        }

        Ok(Self { records, by_name })
    }

    /// Ips registered for `name`, empty when the name is unknown.
    /// Lookup is case-insensitive.
    pub fn resolve(&self, name: &str) -> Vec<String> {
        self.by_name.get(&fqdn(name)).cloned().unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&fqdn(name))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn column(keys: &[String], name: &str) -> Result<usize, RecordsError> {
    keys.iter()
        .position(|k| k == name)
        .ok_or_else(|| RecordsError::MissingColumn(name.to_string()))
}

fn cell(row: &[Value], index: usize) -> Option<&str> {
    row.get(index).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDS: &str = r#"{
        "record_keys": ["id", "instance_group", "network", "deployment", "ip"],
        "record_infos": [
            ["node-0", "web", "default", "shop", "10.0.0.5"],
            ["node-1", "web", "default", "shop", "10.0.0.6"],
            ["node-0", "db", "default", "shop", "10.0.1.5"]
        ]
    }"#;

    #[test]
    fn test_parses_rows_into_records() {
        let set = RecordSet::from_json(RECORDS, "fleet.").unwrap();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_resolve_by_instance_name() {
        let set = RecordSet::from_json(RECORDS, "fleet.").unwrap();
        assert_eq!(
            set.resolve("node-0.web.default.shop.fleet."),
            vec!["10.0.0.5"]
        );
    }

    #[test]
    fn test_resolve_groups_ips_for_shared_names() {
        let doc = r#"{
            "record_keys": ["id", "instance_group", "network", "deployment", "ip"],
            "record_infos": [
                ["node-0", "web", "default", "shop", "10.0.0.5"],
                ["node-0", "web", "default", "shop", "10.0.0.6"]
            ]
        }"#;
        let set = RecordSet::from_json(doc, "fleet.").unwrap();
        assert_eq!(
            set.resolve("node-0.web.default.shop.fleet."),
            vec!["10.0.0.5", "10.0.0.6"]
        );
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let set = RecordSet::from_json(RECORDS, "fleet.").unwrap();
        assert_eq!(
            set.resolve("Node-0.WEB.default.shop.Fleet."),
            vec!["10.0.0.5"]
        );
    }

    #[test]
    fn test_resolve_unknown_name_is_empty() {
        let set = RecordSet::from_json(RECORDS, "fleet.").unwrap();
        assert!(set.resolve("missing.web.default.shop.fleet.").is_empty());
        assert!(set.resolve("fleet.").is_empty());
    }

    #[test]
    fn test_skips_rows_with_non_string_cells() {
        let doc = r#"{
            "record_keys": ["id", "instance_group", "network", "deployment", "ip"],
            "record_infos": [
                ["node-0", "web", "default", "shop", "10.0.0.5"],
                ["node-1", 42, "default", "shop", "10.0.0.6"],
                ["node-2", "web", "default", "shop"]
            ]
        }"#;
        let set = RecordSet::from_json(doc, "fleet.").unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.resolve("node-0.web.default.shop.fleet."),
            vec!["10.0.0.5"]
        );
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let doc = r#"{
            "record_keys": ["id", "instance_group", "deployment", "ip"],
            "record_infos": []
        }"#;
        assert!(matches!(
            RecordSet::from_json(doc, "fleet."),
            Err(RecordsError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(matches!(
            RecordSet::from_json("{broken", "fleet."),
            Err(RecordsError::Parse(_))
        ));
    }
}
