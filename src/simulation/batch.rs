//! Runs every configured algorithm over the same data, one thread each.
//!
//! The warm-up is drawn once and shared, so all algorithms start from the
//! same state. Each algorithm writes `<output>/<name>.txt`; a failure in one
//! is logged and reported without stopping the others.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{error, info};

use super::{CumulativeMetric, Dataset, RecommendationLoop, Warmup};
use crate::config::{Registry, SimulationConfig};
use crate::error::Result;
use crate::io::{self, IterationLogWriter};
use crate::recommender::{InteractiveRecommender, NotReciprocal};

/// Result of one algorithm in a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub name: String,
    /// Iterations written to the log, replayed ones included.
    pub result: Result<usize>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Loads `user<TAB>item<TAB>value` data the way `config` describes it.
pub fn load_dataset<P: AsRef<Path>>(config: &SimulationConfig, path: P) -> Result<Arc<Dataset>> {
    let triples = io::load_triples_file(path)?;
    let dataset = Dataset::from_triples(triples, config.relevance_threshold).contact(config.contact);
    info!(
        users = dataset.num_users(),
        items = dataset.num_items(),
        ratings = dataset.ratings().num_preferences(),
        relevant = dataset.num_relevant(),
        "loaded dataset"
    );
    Ok(Arc::new(dataset))
}

/// Batch of simulations sharing a dataset, warm-up and output directory.
pub struct Batch {
    config: SimulationConfig,
    dataset: Arc<Dataset>,
    registry: Registry,
    warmup: Warmup,
    output: PathBuf,
}

impl Batch {
    pub fn new(config: SimulationConfig, dataset: Arc<Dataset>, output: impl Into<PathBuf>) -> Self {
        let warmup = match &config.warmup {
            Some(warmup) => {
                let mut rng = StdRng::seed_from_u64(config.seed);
                Warmup::sample(&dataset, warmup.fraction, warmup.mode, &mut rng)
            }
            None => Warmup::empty(&dataset),
        };
        let registry = config.registry();
        Self {
            config,
            dataset,
            registry,
            warmup,
            output: output.into(),
        }
    }

    /// Replaces the algorithm registry, e.g. to add custom recommenders.
    #[must_use]
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn warmup(&self) -> &Warmup {
        &self.warmup
    }

    pub fn log_path(&self, name: &str) -> PathBuf {
        self.output.join(format!("{name}.txt"))
    }

    fn not_reciprocal(&self) -> bool {
        self.config.not_reciprocal && self.dataset.is_contact()
    }

    /// Runs every registered algorithm in parallel.
    pub fn run(&self) -> Result<Vec<BatchOutcome>> {
        std::fs::create_dir_all(&self.output)?;
        let names: Vec<String> = self.registry.names().map(str::to_string).collect();
        info!(
            algorithms = names.len(),
            output = %self.output.display(),
            "starting batch"
        );

        let outcomes: Vec<BatchOutcome> = names
            .into_par_iter()
            .map(|name| {
                let result = self.run_one(&name);
                if let Err(err) = &result {
                    error!(algorithm = %name, error = %err, "simulation failed");
                }
                BatchOutcome { name, result }
            })
            .collect();

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        info!(total = outcomes.len(), failed, "batch finished");
        Ok(outcomes)
    }

    /// Runs a single algorithm, resuming from its log when configured to.
    pub fn run_one(&self, name: &str) -> Result<usize> {
        let mut recommender = self.registry.build(name, &self.dataset, self.config.seed)?;
        if self.not_reciprocal() {
            recommender = Box::new(NotReciprocal::new(recommender, Arc::clone(&self.dataset)));
        }
        let mut simulation = self.simulation(recommender);

        let path = self.log_path(name);
        let logged = if self.config.resume {
            io::read_iteration_log_file(&path)?
        } else {
            Vec::new()
        };

        // the log is rewritten from scratch, replayed rows first
        let pairs: Vec<(usize, usize)> = logged.iter().map(|p| (p.uidx, p.iidx)).collect();
        let replayed = simulation.replay(&pairs);
        let mut writer = IterationLogWriter::create(&path)?;
        writer.write_header(simulation.metric_names())?;
        for (mut record, pair) in replayed.into_iter().zip(&logged) {
            record.elapsed_ms = pair.timestamp;
            writer.write(&record)?;
        }
        if !logged.is_empty() {
            info!(algorithm = name, replayed = logged.len(), "resumed from log");
        }

        let ran = simulation.run(&mut writer)?;
        writer.close()?;
        Ok(logged.len() + ran)
    }

    fn simulation(&self, recommender: Box<dyn InteractiveRecommender>) -> RecommendationLoop {
        let metrics: IndexMap<String, Box<dyn CumulativeMetric>> = self
            .config
            .metrics
            .iter()
            .map(|kind| (kind.name().to_string(), kind.build(&self.dataset)))
            .collect();
        RecommendationLoop::new(
            Arc::clone(&self.dataset),
            recommender,
            self.config.selector.build(),
            self.config.end.build(),
            metrics,
            &self.warmup,
            self.not_reciprocal(),
            self.config.seed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Arc<Dataset> {
        let raw = [
            ("u0", "i0", 1.0),
            ("u0", "i1", 0.0),
            ("u1", "i1", 1.0),
            ("u2", "i2", 1.0),
        ];
        Arc::new(Dataset::from_triples(
            raw.iter().map(|&(u, i, v)| (u.to_string(), i.to_string(), v)),
            1.0,
        ))
    }

    fn config(extra: &str) -> SimulationConfig {
        SimulationConfig::from_json(&format!(
            r#"{{
                "seed": 5,
                "selector": "round_robin",
                "metrics": ["recall", "gini"],
                {extra}
                "algorithms": {{
                    "random": {{"type": "random"}},
                    "ucb": {{"type": "ucb1"}},
                    "club": {{"type": "club"}}
                }}
            }}"#
        ))
        .unwrap()
    }

    fn rows(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_batch_writes_one_log_per_algorithm() {
        let dir = tempfile::tempdir().unwrap();
        let batch = Batch::new(config(""), dataset(), dir.path());
        let outcomes = batch.run().unwrap();

        let names: Vec<&str> = outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["random", "ucb", "club"]);
        for outcome in &outcomes {
            // 3 users x 3 items
            assert_eq!(*outcome.result.as_ref().unwrap(), 9);
            let rows = rows(&batch.log_path(&outcome.name));
            assert_eq!(rows[0], "iteration\tuidx\tiidx\trecall\tgini\telapsed_ms");
            assert_eq!(rows.len(), 10);
            let last: Vec<&str> = rows[9].split('\t').collect();
            assert_eq!(last[0], "9");
            assert_eq!(last[3], "1");
        }
    }

    #[test]
    fn test_resume_keeps_logged_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ucb.txt");
        std::fs::write(
            &path,
            "iteration\tuidx\tiidx\trecall\tgini\telapsed_ms\n1\t2\t0\t0\t0\t17\n",
        )
        .unwrap();

        let batch = Batch::new(config(r#""resume": true,"#), dataset(), dir.path());
        assert_eq!(batch.run_one("ucb").unwrap(), 9);

        let rows = rows(&path);
        assert_eq!(rows.len(), 10);
        assert!(rows[1].starts_with("1\t2\t0\t"));
        assert!(rows[1].ends_with("\t17"));
        let later: Vec<(usize, usize)> = rows[2..]
            .iter()
            .map(|row| {
                let cols: Vec<&str> = row.split('\t').collect();
                (cols[1].parse().unwrap(), cols[2].parse().unwrap())
            })
            .collect();
        assert!(!later.contains(&(2, 0)));
    }

    #[test]
    fn test_unknown_algorithm_is_reported_per_task() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        registry.register("broken", |_dataset: &Arc<Dataset>, _seed| {
            Err(crate::error::SimError::invalid("nope"))
        });
        let batch = Batch::new(config(""), dataset(), dir.path()).with_registry(registry);
        let outcomes = batch.run().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].is_ok());
        assert!(batch.run_one("missing").is_err());
    }

    #[test]
    fn test_warmup_is_shared() {
        let dir = tempfile::tempdir().unwrap();
        let batch = Batch::new(
            config(r#""warmup": {"fraction": 0.5},"#),
            dataset(),
            dir.path(),
        );
        assert_eq!(batch.warmup().full.len(), 2);
        let outcomes = batch.run().unwrap();
        // 9 pairs minus the 2 consumed by the warm-up
        assert!(outcomes.iter().all(|o| *o.result.as_ref().unwrap() == 7));
    }
}
