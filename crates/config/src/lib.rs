#![forbid(unsafe_code)]

mod error;
mod instance;
mod thresholds;

pub use error::Error;
pub use instance::{DEFAULT_CONCURRENCY, Instance};
pub use thresholds::Thresholds;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::path::Path;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Time between two probe cycles. **Measured in seconds**.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub interval: Duration,

    /// Process groups to watch. Each instance produces at most one event per
    /// cycle.
    pub instances: Vec<Instance>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            instances: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. Missing fields are filled with
    /// defaults and the result is validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Config = toml_edit::de::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let toml = toml_edit::ser::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from multiple TOML files. Later files override
    /// earlier ones; `[[instances]]` tables accumulate.
    pub fn load_multiple<T, U>(paths: U) -> Result<Self, Error>
    where
        T: AsRef<Path>,
        U: IntoIterator<Item = T>,
    {
        let mut merged = toml_edit::DocumentMut::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                continue;
            }
            let text = std::fs::read_to_string(path)?;
            let doc: toml_edit::DocumentMut = text.parse()?;
            merge_document(&mut merged, doc);
        }
        let mut config: Config = toml_edit::de::from_str(&merged.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Normalize every instance in place and reject invalid ones.
    pub fn validate(&mut self) -> Result<(), Error> {
        for (index, instance) in self.instances.iter_mut().enumerate() {
            instance
                .normalize()
                .map_err(|reason| Error::InvalidInstance { index, reason })?;
        }
        Ok(())
    }
}

fn merge_document(target: &mut toml_edit::DocumentMut, source: toml_edit::DocumentMut) {
    for (key, item) in source.iter() {
        merge_item(
            target.entry(key).or_insert(toml_edit::Item::None),
            item.clone(),
        );
    }
}

fn merge_item(target: &mut toml_edit::Item, source: toml_edit::Item) {
    use toml_edit::Item;
    match (target, source) {
        (Item::Table(target_table), Item::Table(source_table)) => {
            for (key, item) in source_table.iter() {
                merge_item(target_table.entry(key).or_insert(Item::None), item.clone());
            }
        }
        (Item::ArrayOfTables(target_array), Item::ArrayOfTables(source_array)) => {
            for table in source_array.iter() {
                target_array.push(table.clone());
            }
        }
        (target_item, source_item) => {
            *target_item = source_item;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.instances.push(Instance {
            search_exec_name: "nginx".into(),
            open_files: Thresholds::new(80.0, 90.0),
            ..Default::default()
        });
        config.validate().unwrap();
        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    fn load_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[[instances]]\nsearch_cmdline = \" java -jar \"\n\
             [instances.open_files]\ncritical_ge = 90.0\n",
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.interval, Duration::from_secs(30));
        assert_eq!(cfg.instances.len(), 1);
        let instance = &cfg.instances[0];
        assert_eq!(instance.search_cmdline, "java -jar");
        assert_eq!(instance.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(instance.open_files, Thresholds::new(0.0, 90.0));
        assert!(instance.title_rule.is_empty());
    }

    #[test]
    fn load_rejects_invalid_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[[instances]]\nsearch_exec_name = \"a\"\n\
             [instances.open_files]\nwarn_ge = 90.0\ncritical_ge = 80.0\n\
             [[instances]]\nsearch_exec_name = \"b\"\n",
        )
        .unwrap();

        match Config::load(&path) {
            Err(Error::InvalidInstance { index, .. }) => assert_eq!(index, 0),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn load_multiple_merges() {
        let dir = tempdir().unwrap();
        let path1 = dir.path().join("a.toml");
        let path2 = dir.path().join("b.toml");
        let missing = dir.path().join("missing.toml");

        std::fs::write(
            &path1,
            "interval = 60\n[[instances]]\nsearch_exec_name = \"nginx\"\n\
             [instances.open_files]\nwarn_ge = 80.0\n",
        )
        .unwrap();
        std::fs::write(
            &path2,
            "interval = 15\n[[instances]]\nsearch_pid_file = \"/run/redis.pid\"\n\
             labels = { team = \"cache\" }\n[instances.open_files]\ncritical_ge = 95.0\n",
        )
        .unwrap();

        let cfg = Config::load_multiple([path1, missing, path2]).unwrap();
        assert_eq!(cfg.interval, Duration::from_secs(15));
        assert_eq!(cfg.instances.len(), 2);
        assert_eq!(cfg.instances[0].search_exec_name, "nginx");
        assert_eq!(cfg.instances[1].search_pid_file, "/run/redis.pid");
        assert_eq!(
            cfg.instances[1].labels.get("team").map(String::as_str),
            Some("cache")
        );
    }
}
