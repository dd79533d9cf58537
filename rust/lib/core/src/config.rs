use std::path::PathBuf;

/// Storage configuration shared by the relation graph crates.
///
/// The embedding binary parses these from command-line arguments, then
/// passes them to storage layer initialization.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Directory holding persistent state.
    pub data_dir: Option<PathBuf>,

    /// Path to the redb database file.
    /// Defaults to `{data_dir}/relations.redb` if not specified.
    pub db_path: Option<PathBuf>,
}

impl ServiceConfig {
    /// Parse configuration from command-line arguments.
    ///
    /// Supported flags:
    /// - `--data-dir=PATH`
    /// - `--db=PATH`
    ///
    /// Unknown arguments are ignored so that modules can add their own flags.
    pub fn from_args(args: &[String]) -> Self {
        let mut config = ServiceConfig::default();

        for arg in args {
            if let Some(val) = arg.strip_prefix("--data-dir=") {
                config.data_dir = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--db=") {
                config.db_path = Some(PathBuf::from(val));
            }
        }

        config
    }

    /// Resolve the redb database path, falling back to `{data_dir}/relations.redb`.
    pub fn resolve_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.resolve_data_subpath("relations.redb"))
    }

    fn resolve_data_subpath(&self, name: &str) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(|d| d.join(name))
            .unwrap_or_else(|| PathBuf::from(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args() {
        let args = vec![
            "--data-dir=/tmp/relgraph".to_string(),
            "--page-size=25".to_string(),
        ];
        let config = ServiceConfig::from_args(&args);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/relgraph")));
        assert_eq!(config.db_path, None);
    }

    #[test]
    fn test_resolve_defaults() {
        let config = ServiceConfig {
            data_dir: Some(PathBuf::from("/data")),
            ..Default::default()
        };
        assert_eq!(config.resolve_db_path(), PathBuf::from("/data/relations.redb"));

        let bare = ServiceConfig::default();
        assert_eq!(bare.resolve_db_path(), PathBuf::from("relations.redb"));
    }

    #[test]
    fn test_explicit_db_wins() {
        let config = ServiceConfig::from_args(&[
            "--data-dir=/data".to_string(),
            "--db=/elsewhere/graph.redb".to_string(),
        ]);
        assert_eq!(config.resolve_db_path(), PathBuf::from("/elsewhere/graph.redb"));
    }
}
