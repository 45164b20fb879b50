use prometheus::{CounterVec, Opts, Registry};

/// Per-job scraper self-metrics.
#[derive(Clone)]
pub struct Metrics {
    pub scrapes: CounterVec,
    pub scrape_failures: CounterVec,
    pub appended_samples: CounterVec,
    pub rollbacks: CounterVec,
}

impl Metrics {
    pub(crate) fn new(reg: Option<&Registry>) -> Metrics {
        let scrapes = register_counter_vec(
            "autoscrape_scrapes_total",
            "Total number of scrape cycles executed.",
            &["job"],
            reg,
        );
        let scrape_failures = register_counter_vec(
            "autoscrape_scrape_failures_total",
            "Total number of scrape cycles that did not commit.",
            &["job"],
            reg,
        );
        let appended_samples = register_counter_vec(
            "autoscrape_appended_samples_total",
            "Total number of samples committed to instance storage.",
            &["job"],
            reg,
        );
        let rollbacks = register_counter_vec(
            "autoscrape_rollbacks_total",
            "Total number of scrape transactions rolled back.",
            &["job"],
            reg,
        );

        Metrics {
            scrapes,
            scrape_failures,
            appended_samples,
            rollbacks,
        }
    }
}

fn register_counter_vec(
    name: &str,
    help: &str,
    labels: &[&str],
    reg: Option<&Registry>,
) -> CounterVec {
    let counter =
        CounterVec::new(Opts::new(name, help), labels).expect("failed to create CounterVec");

    if let Some(reg) = reg {
        reg.register(Box::new(counter.clone()))
            .expect("failed to register CounterVec");
    }
    counter
}
