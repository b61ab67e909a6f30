//! Operator-defined alias mappings.
//!
//! An alias maps one domain name to one or more target names. Targets may
//! themselves be aliases in the on-disk form; before the server uses a
//! configuration it must be reduced so no target needs further expansion.
//! A leading `_.` label acts as a single-label wildcard: `_.web.fleet.`
//! matches `0.web.fleet.`, and targets starting with `_.` receive the
//! matched label in its place.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::names::{fqdn, split_first_label};

const WILDCARD_LABEL: &str = "_";

#[derive(Error, Debug, Clone)]
pub enum AliasError {
    #[error("Failed to parse alias config: {0}")]
    Parse(String),

    #[error("Alias '{0}' has no targets")]
    EmptyTargets(String),

    #[error("Duplicate alias definition: {0}")]
    DuplicateAlias(String),

    #[error("Alias cycle detected at '{0}'")]
    Cycle(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasConfig {
    aliases: BTreeMap<String, Vec<String>>,
}

impl AliasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object of `alias -> [targets]`. Names are
    /// canonicalized to lowercase FQDN form on the way in.
    pub fn from_json(raw: &str) -> Result<Self, AliasError> {
        let parsed: BTreeMap<String, Vec<String>> =
            serde_json::from_str(raw).map_err(|e| AliasError::Parse(e.to_string()))?;

        let mut config = Self::new();
        for (alias, targets) in parsed {
            config.insert(&alias, &targets)?;
        }
        Ok(config)
    }

    pub fn insert(&mut self, alias: &str, targets: &[String]) -> Result<(), AliasError> {
        if targets.is_empty() {
            return Err(AliasError::EmptyTargets(alias.to_string()));
        }
        let alias = fqdn(alias);
        if self.aliases.contains_key(&alias) {
            return Err(AliasError::DuplicateAlias(alias));
        }
        let targets = targets.iter().map(|t| fqdn(t)).collect();
        self.aliases.insert(alias, targets);
        Ok(())
    }

    /// Folds `other` into `self`. An alias defined on both sides is a
    /// configuration error, not a silent override.
    pub fn merge(&mut self, other: AliasConfig) -> Result<(), AliasError> {
        for (alias, targets) in other.aliases {
            if self.aliases.contains_key(&alias) {
                return Err(AliasError::DuplicateAlias(alias));
            }
            self.aliases.insert(alias, targets);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Target names for `name`, or an empty vec when it is not an alias.
    /// Exact entries win over a `_.` wildcard entry on the same parent.
    pub fn resolutions(&self, name: &str) -> Vec<String> {
        let name = fqdn(name);
        if let Some(targets) = self.aliases.get(&name) {
            return targets.clone();
        }

        if let Some((label, parent)) = split_first_label(&name) {
            let wildcard = format!("{}.{}", WILDCARD_LABEL, parent);
            if let Some(targets) = self.aliases.get(&wildcard) {
                return targets
                    .iter()
                    .map(|target| substitute_wildcard(target, label))
                    .collect();
            }
        }

        Vec::new()
    }

    /// True when no target is itself an alias key, so resolution never
    /// needs a second pass.
    pub fn is_reduced(&self) -> bool {
        self.aliases
            .values()
            .flatten()
            .all(|target| !self.aliases.contains_key(target))
    }

    /// Flattens alias-of-alias chains until the configuration is reduced.
    /// A chain that revisits an alias is a cycle and fails.
    pub fn reduced_form(&self) -> Result<AliasConfig, AliasError> {
        let mut reduced = AliasConfig::new();
        for (alias, targets) in &self.aliases {
            let mut visiting = HashSet::new();
            visiting.insert(alias.clone());
            let flattened = self.flatten(targets, &mut visiting)?;
            reduced.aliases.insert(alias.clone(), flattened);
        }
        Ok(reduced)
    }

    fn flatten(
        &self,
        targets: &[String],
        visiting: &mut HashSet<String>,
    ) -> Result<Vec<String>, AliasError> {
        let mut out = Vec::new();
        for target in targets {
            match self.aliases.get(target) {
                Some(nested) => {
                    if !visiting.insert(target.clone()) {
                        return Err(AliasError::Cycle(target.clone()));
                    }
                    out.extend(self.flatten(nested, visiting)?);
                    visiting.remove(target);
                }
                None => out.push(target.clone()),
            }
        }
        Ok(out)
    }
}

fn substitute_wildcard(target: &str, label: &str) -> String {
    match split_first_label(target) {
        Some((first, rest)) if first == WILDCARD_LABEL => format!("{}.{}", label, rest),
        _ => target.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entries: &[(&str, &[&str])]) -> AliasConfig {
        let mut c = AliasConfig::new();
        for (alias, targets) in entries {
            let targets: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
            c.insert(alias, &targets).unwrap();
        }
        c
    }

    #[test]
    fn test_from_json_canonicalizes_names() {
        let c = AliasConfig::from_json(r#"{"Alias.Fleet": ["Target.Fleet."]}"#).unwrap();
        assert_eq!(c.resolutions("alias.fleet."), vec!["target.fleet."]);
    }

    #[test]
    fn test_from_json_rejects_malformed_document() {
        assert!(matches!(
            AliasConfig::from_json("{not json"),
            Err(AliasError::Parse(_))
        ));
        assert!(matches!(
            AliasConfig::from_json(r#"["not", "an", "object"]"#),
            Err(AliasError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_target_list_is_an_error() {
        assert!(matches!(
            AliasConfig::from_json(r#"{"a.fleet.": []}"#),
            Err(AliasError::EmptyTargets(_))
        ));
    }

    #[test]
    fn test_resolutions_exact_match() {
        let c = config(&[("db.fleet.", &["primary.db.fleet.", "replica.db.fleet."])]);
        assert_eq!(
            c.resolutions("db.fleet."),
            vec!["primary.db.fleet.", "replica.db.fleet."]
        );
    }

    #[test]
    fn test_resolutions_miss_returns_empty() {
        let c = config(&[("db.fleet.", &["primary.db.fleet."])]);
        assert!(c.resolutions("web.fleet.").is_empty());
    }

    #[test]
    fn test_resolutions_is_case_insensitive() {
        let c = config(&[("db.fleet.", &["primary.db.fleet."])]);
        assert_eq!(c.resolutions("DB.Fleet."), vec!["primary.db.fleet."]);
    }

    #[test]
    fn test_wildcard_substitutes_first_label() {
        let c = config(&[("_.web.fleet.", &["_.web.cluster.internal."])]);
        assert_eq!(
            c.resolutions("3.web.fleet."),
            vec!["3.web.cluster.internal."]
        );
    }

    #[test]
    fn test_wildcard_leaves_literal_targets_alone() {
        let c = config(&[("_.web.fleet.", &["lb.cluster.internal."])]);
        assert_eq!(c.resolutions("0.web.fleet."), vec!["lb.cluster.internal."]);
    }

    #[test]
    fn test_exact_entry_wins_over_wildcard() {
        let c = config(&[
            ("_.web.fleet.", &["_.web.cluster.internal."]),
            ("0.web.fleet.", &["special.cluster.internal."]),
        ]);
        assert_eq!(
            c.resolutions("0.web.fleet."),
            vec!["special.cluster.internal."]
        );
    }

    #[test]
    fn test_is_reduced() {
        let reduced = config(&[("a.fleet.", &["x.cluster.internal."])]);
        assert!(reduced.is_reduced());

        let chained = config(&[
            ("a.fleet.", &["b.fleet."]),
            ("b.fleet.", &["x.cluster.internal."]),
        ]);
        assert!(!chained.is_reduced());
    }

    #[test]
    fn test_reduced_form_flattens_chains() {
        let chained = config(&[
            ("a.fleet.", &["b.fleet.", "direct.cluster.internal."]),
            ("b.fleet.", &["x.cluster.internal.", "y.cluster.internal."]),
        ]);
        let reduced = chained.reduced_form().unwrap();
        assert!(reduced.is_reduced());
        assert_eq!(
            reduced.resolutions("a.fleet."),
            vec![
                "x.cluster.internal.",
                "y.cluster.internal.",
                "direct.cluster.internal.",
            ]
        );
    }

    #[test]
    fn test_reduced_form_detects_cycles() {
        let cyclic = config(&[("a.fleet.", &["b.fleet."]), ("b.fleet.", &["a.fleet."])]);
        assert!(matches!(cyclic.reduced_form(), Err(AliasError::Cycle(_))));
    }

    #[test]
    fn test_merge_combines_distinct_aliases() {
        let mut base = config(&[("a.fleet.", &["x.cluster.internal."])]);
        let other = config(&[("b.fleet.", &["y.cluster.internal."])]);
        base.merge(other).unwrap();
        assert_eq!(base.resolutions("a.fleet."), vec!["x.cluster.internal."]);
        assert_eq!(base.resolutions("b.fleet."), vec!["y.cluster.internal."]);
    }

    #[test]
    fn test_merge_rejects_duplicate_alias() {
        let mut base = config(&[("a.fleet.", &["x.cluster.internal."])]);
        let other = config(&[("a.fleet.", &["y.cluster.internal."])]);
        assert!(matches!(
            base.merge(other),
            Err(AliasError::DuplicateAlias(_))
        ));
    }
}
