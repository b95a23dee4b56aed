//! Reflection persistence

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use eyre::{Context, Result};
use tracing::{debug, info};

/// Directory under the base dir that holds every saved reflection
pub const REFLECTIONS_SUBDIR: &str = "reflections";

/// File name timestamp, second resolution
const FILE_STAMP: &str = "%Y%m%d-%H%M%S";

/// Writes reflections to `<base>/reflections/<ken>/<stamp>.md`
#[derive(Debug, Clone)]
pub struct ReflectionStore {
    base_dir: PathBuf,
}

impl ReflectionStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Directory holding the reflections for one ken
    ///
    /// The ken is split on `/`, so `core/foo` nests two levels deep. Empty
    /// segments are dropped.
    pub fn ken_dir(&self, ken: &str) -> PathBuf {
        ken.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.base_dir.join(REFLECTIONS_SUBDIR), |dir, segment| dir.join(segment))
    }

    /// Save a reflection stamped with the current local time
    pub fn save(&self, ken: &str, task: &str, reflection: &str) -> Result<PathBuf> {
        self.save_at(ken, task, reflection, Local::now())
    }

    /// Save a reflection stamped with `at`
    ///
    /// Fails if a reflection with the same stamp already exists.
    pub fn save_at(&self, ken: &str, task: &str, reflection: &str, at: DateTime<Local>) -> Result<PathBuf> {
        debug!(%ken, %at, "ReflectionStore::save_at: called");
        let dir = self.ken_dir(ken);
        fs::create_dir_all(&dir).context(format!("Failed to create reflection directory: {}", dir.display()))?;

        let path = dir.join(format!("{}.md", at.format(FILE_STAMP)));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .context(format!("Failed to create reflection file: {}", path.display()))?;
        file.write_all(render(ken, task, reflection, &at).as_bytes())
            .context(format!("Failed to write reflection file: {}", path.display()))?;

        info!(path = %path.display(), "Reflection saved");
        Ok(path)
    }
}

fn render(ken: &str, task: &str, reflection: &str, at: &DateTime<Local>) -> String {
    format!(
        "# Reflection: {}\n\n**Timestamp**: {}\n**Task**: {}\n\n---\n\n{}\n",
        ken,
        at.to_rfc3339(),
        task,
        reflection
    )
}
