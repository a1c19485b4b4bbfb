use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, SourceError};

/// Environment variable holding the storage root.
pub const ROOT_ENV: &str = "CORPUSCULA_ROOT";
/// Config file name, looked up in the home directory.
pub const CONFIG_FILE: &str = ".corpuscula";
pub const CORPUS_DNAME: &str = "corpus";
pub const UD_DNAME: &str = "_UD";

const ROOT_KEY: &str = "ROOT_DIR";
const CONFIG_HEADER: &str = "# Config file for the corpuscula storage. Don't change it manually.";

/// Location of the local corpus storage.
///
/// Resolved in order from an explicit path, [`ROOT_ENV`], the
/// tab-separated [`CONFIG_FILE`] in the home directory and finally the
/// current directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        let config_file = default_config_path();
        Self::resolve_with(
            explicit,
            |key| env::var(key).ok(),
            config_file.as_deref(),
        )
    }

    /// [`resolve`](Self::resolve) with the environment lookup and config
    /// file location supplied by the caller.
    pub fn resolve_with<F>(
        explicit: Option<PathBuf>,
        env_lookup: F,
        config_file: Option<&Path>,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = explicit {
            debug!("storage root given explicitly: {}", root.display());
            return Ok(Self::new(root));
        }
        if let Some(root) = env_lookup(ROOT_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("storage root taken from {ROOT_ENV}");
            return Ok(Self::new(root.trim()));
        }
        if let Some(path) = config_file.filter(|p| p.is_file()) {
            if let Some(root) = read_root(path)? {
                debug!("storage root taken from {}", path.display());
                return Ok(Self::new(root));
            }
        }
        let cwd = env::current_dir()?;
        debug!("storage root defaults to {}", cwd.display());
        Ok(Self::new(cwd))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/corpus/<dname>`.
    pub fn corpus_dir(&self, dname: &str) -> PathBuf {
        self.root.join(CORPUS_DNAME).join(dname)
    }

    /// `<root>/corpus/<dname>/<fname>`. The file need not exist.
    pub fn corpus_path(&self, dname: &str, fname: &str) -> PathBuf {
        self.corpus_dir(dname).join(fname)
    }

    /// Directory of a Universal Dependencies corpus.
    pub fn ud_dir(&self, corpus_name: &str) -> PathBuf {
        self.root.join(CORPUS_DNAME).join(UD_DNAME).join(corpus_name)
    }

    /// Persist the root to `config_file`. Other keys are kept, duplicate
    /// `ROOT_DIR` lines are dropped.
    pub fn save(&self, config_file: &Path) -> Result<()> {
        let root = self
            .root
            .to_str()
            .ok_or_else(|| SourceError::Config(format!("{} is not UTF-8", self.root.display())))?
            .trim()
            .to_string();

        let mut lines = vec![CONFIG_HEADER.to_string()];
        let mut stored = false;
        if config_file.is_file() {
            for line in fs::read_to_string(config_file)?.lines() {
                let Some((key, value)) = line.split_once('\t') else {
                    continue;
                };
                if key == ROOT_KEY {
                    if stored {
                        continue;
                    }
                    stored = true;
                    lines.push(format!("{ROOT_KEY}\t{root}"));
                } else {
                    lines.push(format!("{key}\t{}", value.trim()));
                }
            }
        }
        if !stored {
            lines.push(format!("{ROOT_KEY}\t{root}"));
        }
        let mut text = lines.join("\n");
        text.push('\n');
        fs::write(config_file, text)?;
        info!("storage root {} saved to {}", root, config_file.display());
        Ok(())
    }
}

/// `~/.corpuscula`, when a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(CONFIG_FILE))
}

/// First `ROOT_DIR` entry of a config file.
pub fn read_root(config_file: &Path) -> Result<Option<PathBuf>> {
    let text = fs::read_to_string(config_file)?;
    let root = text
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('\t'))
        .find(|(key, _)| *key == ROOT_KEY)
        .map(|(_, value)| PathBuf::from(value.trim()));
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn explicit_root_wins() {
        let env = |_: &str| Some("/from/env".to_string());
        let cfg = StorageConfig::resolve_with(Some("/explicit".into()), env, None).unwrap();
        assert_eq!(cfg.root(), Path::new("/explicit"));
    }

    #[test]
    fn environment_beats_config_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE);
        fs::write(&file, "ROOT_DIR\t/from/file\n").unwrap();
        let env = |key: &str| (key == ROOT_ENV).then(|| "/from/env".to_string());
        let cfg = StorageConfig::resolve_with(None, env, Some(&file)).unwrap();
        assert_eq!(cfg.root(), Path::new("/from/env"));

        let cfg = StorageConfig::resolve_with(None, no_env, Some(&file)).unwrap();
        assert_eq!(cfg.root(), Path::new("/from/file"));
    }

    #[test]
    fn falls_back_to_current_dir() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nothing");
        let cfg = StorageConfig::resolve_with(None, no_env, Some(&missing)).unwrap();
        assert_eq!(cfg.root(), env::current_dir().unwrap());
    }

    #[test]
    fn save_keeps_other_keys() {
        let dir = tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE);
        let text = "# old header\nPROXY\thttp://p \nROOT_DIR\t/old\nROOT_DIR\t/older\n";
        fs::write(&file, text).unwrap();
        StorageConfig::new("/new/root").save(&file).unwrap();

        let text = fs::read_to_string(&file).unwrap();
        assert_eq!(
            text,
            format!("{CONFIG_HEADER}\nPROXY\thttp://p\nROOT_DIR\t/new/root\n")
        );
        assert_eq!(read_root(&file).unwrap(), Some(PathBuf::from("/new/root")));
    }

    #[test]
    fn save_creates_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE);
        StorageConfig::new("/data").save(&file).unwrap();
        assert_eq!(read_root(&file).unwrap(), Some(PathBuf::from("/data")));
    }

    #[test]
    fn storage_layout() {
        let cfg = StorageConfig::new("/data");
        assert_eq!(
            cfg.corpus_path("syntagrus", "train.conllu"),
            Path::new("/data/corpus/syntagrus/train.conllu")
        );
        assert_eq!(cfg.ud_dir("UD_Russian-Taiga"), Path::new("/data/corpus/_UD/UD_Russian-Taiga"));
    }
}
