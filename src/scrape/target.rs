use std::collections::BTreeMap;

use log::warn;
use url::Url;

use crate::discover::TargetGroup;
use crate::error::{Error, Result};
use crate::labels::{Label, Labels};
use crate::scrape::{
    ScrapeConfig, ADDRESS_LABEL, INSTANCE_LABEL, JOB_LABEL, METRICS_PATH_LABEL,
    RESERVED_LABEL_PREFIX, SCHEME_LABEL,
};

/// One network endpoint ready to be fetched, carrying the public label set
/// used to tag its samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    labels: Labels,
    address: String,
    url: String,
}

impl ResolvedTarget {
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn hash(&self) -> u64 {
        self.labels.hash()
    }
}

/// Materializes a group snapshot into fetchable targets. Targets that fail
/// label population (no address, unparsable URL) are dropped with a warning.
pub(crate) fn targets_from_group(group: &TargetGroup, cfg: &ScrapeConfig) -> Vec<ResolvedTarget> {
    let mut targets = Vec::with_capacity(group.targets.len());
    for target_labels in &group.targets {
        // Precedence: config labels < group labels < per-target labels.
        let mut merged: BTreeMap<&str, &str> = cfg
            .labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        for (name, value) in &group.labels {
            merged.insert(name, value);
        }
        for (name, value) in target_labels {
            merged.insert(name, value);
        }
        let lset = Labels::new(
            merged
                .into_iter()
                .map(|(name, value)| Label::new(name, value))
                .collect(),
        );

        match populate_labels(lset, cfg) {
            Ok(target) => targets.push(target),
            Err(err) => {
                warn!(
                    "dropping target; job={} source={}: {}",
                    cfg.job_name, group.source, err
                );
            }
        }
    }
    targets
}

/// Applies defaulting and hygiene to a merged label set and builds the
/// fetch URL: scheme and metrics path default from the config, `job` and
/// `instance` are filled in when unset, and all reserved (`__`-prefixed)
/// labels are stripped from the public set.
pub(crate) fn populate_labels(mut lset: Labels, cfg: &ScrapeConfig) -> Result<ResolvedTarget> {
    let address = match lset.get(ADDRESS_LABEL) {
        Some(addr) => addr.to_string(),
        None => return Err(Error::NoAddress(lset.to_string())),
    };

    if lset.get(SCHEME_LABEL).is_none() {
        lset.set(SCHEME_LABEL, &cfg.scheme);
    }
    if lset.get(METRICS_PATH_LABEL).is_none() {
        lset.set(METRICS_PATH_LABEL, &cfg.metrics_path);
    }
    if lset.get(JOB_LABEL).is_none() {
        lset.set(JOB_LABEL, &cfg.job_name);
    }
    if lset.get(INSTANCE_LABEL).is_none() {
        lset.set(INSTANCE_LABEL, &address);
    }

    let scheme = lset.get(SCHEME_LABEL).unwrap_or("http").to_string();
    let path = lset.get(METRICS_PATH_LABEL).unwrap_or("/metrics").to_string();
    let url = format!("{}://{}{}", scheme, address, path);
    if let Err(err) = Url::parse(&url) {
        return Err(Error::InvalidConfig(format!("bad target url {}: {}", url, err)));
    }

    lset.retain(|l| !l.name.starts_with(RESERVED_LABEL_PREFIX));

    Ok(ResolvedTarget {
        labels: lset,
        address,
        url,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::discover::LabelSet;

    fn label_set(pairs: &[(&str, &str)]) -> LabelSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn config() -> ScrapeConfig {
        ScrapeConfig {
            instance: "primary".to_string(),
            job_name: "node".to_string(),
            labels: label_set(&[("env", "prod"), ("zone", "eu-1")]),
            ..Default::default()
        }
    }

    #[test]
    fn merges_with_target_labels_winning() {
        let group = TargetGroup {
            source: "static/0".to_string(),
            targets: vec![label_set(&[
                ("__address__", "10.0.0.1:9100"),
                ("zone", "us-2"),
            ])],
            labels: label_set(&[("env", "staging"), ("team", "infra")]),
        };

        let targets = targets_from_group(&group, &config());
        assert_eq!(targets.len(), 1);
        let t = &targets[0];
        // config < group < target
        assert_eq!(t.labels().get("env"), Some("staging"));
        assert_eq!(t.labels().get("zone"), Some("us-2"));
        assert_eq!(t.labels().get("team"), Some("infra"));
    }

    #[test]
    fn defaults_job_instance_and_url() {
        let group = TargetGroup {
            source: "static/0".to_string(),
            targets: vec![label_set(&[("__address__", "10.0.0.1:9100")])],
            labels: HashMap::new(),
        };

        let targets = targets_from_group(&group, &config());
        let t = &targets[0];
        assert_eq!(t.address(), "10.0.0.1:9100");
        assert_eq!(t.url(), "http://10.0.0.1:9100/metrics");
        assert_eq!(t.labels().get("job"), Some("node"));
        assert_eq!(t.labels().get("instance"), Some("10.0.0.1:9100"));
    }

    #[test]
    fn strips_reserved_labels_from_public_set() {
        let lset = Labels::new(vec![
            Label::new("__address__", "10.0.0.1:9100"),
            Label::new("__meta_docker_container", "web"),
            Label::new("__scheme__", "https"),
            Label::new("port", "9100"),
        ]);
        let target = populate_labels(lset, &config()).unwrap();
        assert!(target.labels().get("__meta_docker_container").is_none());
        assert!(target.labels().get("__address__").is_none());
        assert_eq!(target.labels().get("port"), Some("9100"));
        assert_eq!(target.url(), "https://10.0.0.1:9100/metrics");
    }

    #[test]
    fn drops_target_without_address() {
        let group = TargetGroup {
            source: "static/0".to_string(),
            targets: vec![label_set(&[("job", "node")])],
            labels: HashMap::new(),
        };
        assert!(targets_from_group(&group, &config()).is_empty());
    }
}
