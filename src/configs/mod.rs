use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Error, ErrorKind};
use std::path;

/// A structure to hold environment settings. Backed by an optional
/// settings.json file in the current directory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Configs {
    pub verbose_mode: bool,
    pub max_procs: isize,
}

impl Configs {
    pub fn new() -> Configs {
        Configs {
            verbose_mode: false,
            max_procs: -1,
        }
    }

    /// The number of worker threads to use; all available cores unless
    /// `max_procs` caps it.
    pub fn num_procs(&self) -> usize {
        let mut num_procs = num_cpus::get() as isize;
        if self.max_procs > 0 && self.max_procs < num_procs {
            num_procs = self.max_procs;
        }
        num_procs.max(1) as usize
    }

    pub fn from_json(contents: &str) -> Result<Configs, Error> {
        serde_json::from_str(contents).map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("Failed to parse settings.json file: {}", e),
            )
        })
    }
}

impl Default for Configs {
    fn default() -> Configs {
        Configs::new()
    }
}

/// Reads the settings.json file from the current directory. Defaults are
/// returned when the file does not exist.
pub fn get_configs() -> Result<Configs, Error> {
    let config_file = std::env::current_dir()?.join("settings.json");
    read_configs(&config_file)
}

pub fn read_configs(config_file: &path::Path) -> Result<Configs, Error> {
    match fs::read_to_string(config_file) {
        Ok(contents) => Configs::from_json(&contents),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Configs::new()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod test {
    use super::{read_configs, Configs};
    use std::path::Path;

    #[test]
    fn test_missing_settings_file_gives_defaults() {
        let configs = read_configs(Path::new("no/such/dir/settings.json")).unwrap();
        assert_eq!(configs, Configs::new());
        assert!(configs.num_procs() >= 1);
    }

    #[test]
    fn test_partial_settings() {
        let configs = Configs::from_json("{\"verbose_mode\": true}").unwrap();
        assert!(configs.verbose_mode);
        assert_eq!(configs.max_procs, -1);

        let configs = Configs::from_json("{\"max_procs\": 1}").unwrap();
        assert_eq!(configs.num_procs(), 1);
    }

    #[test]
    fn test_malformed_settings() {
        assert!(Configs::from_json("{\"verbose_mode\": ").is_err());
    }
}
