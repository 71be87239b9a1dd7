use rand::Rng;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Pool of stimulus images drawn without replacement.
///
/// When the configured trial count exceeds the number of unique files the
/// pool runs in repetition mode: exhausting it triggers a fresh scan of the
/// source directory before the next draw, so every refill cycle presents the
/// full set before any repeat.
#[derive(Debug)]
pub struct AssetPool {
    root: PathBuf,
    available: Vec<PathBuf>,
    unique: usize,
    with_repetition: bool,
    trials: usize,
}

impl AssetPool {
    pub fn scan(root: impl Into<PathBuf>, trials: usize) -> io::Result<Self> {
        let mut pool = Self {
            root: root.into(),
            available: Vec::new(),
            unique: 0,
            with_repetition: false,
            trials,
        };
        pool.rescan()?;
        Ok(pool)
    }

    /// Re-walk the source directory. Repetition mode is recomputed here so a
    /// directory that grew mid-run can leave it. A missing directory yields
    /// an empty pool, not an error.
    fn rescan(&mut self) -> io::Result<()> {
        self.available.clear();
        if self.root.is_dir() {
            collect_images(&self.root, &mut self.available)?;
        } else {
            warn!(dir = %self.root.display(), "image directory does not exist");
        }
        self.unique = self.available.len();
        self.with_repetition = self.trials > self.unique;
        debug!(
            count = self.unique,
            repetition = self.with_repetition,
            "scanned image directory"
        );
        Ok(())
    }

    /// Uniform draw without replacement. Yields `None` once no assets are
    /// available and the pool is not in repetition mode, or when the
    /// directory holds no images at all.
    pub fn choose<R: Rng>(&mut self, rng: &mut R) -> io::Result<Option<PathBuf>> {
        if self.available.is_empty() && self.with_repetition {
            self.rescan()?;
        }
        if self.available.is_empty() {
            return Ok(None);
        }
        let idx = rng.random_range(0..self.available.len());
        Ok(Some(self.available.swap_remove(idx)))
    }

    /// Admit a path to the available set without rescanning.
    pub fn add(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.available.contains(&path) {
            self.available.push(path);
        }
    }

    /// Withdraw a path from the available set.
    pub fn remove(&mut self, path: &Path) {
        self.available.retain(|p| p != path);
    }

    pub fn available(&self) -> usize {
        self.available.len()
    }

    pub fn unique(&self) -> usize {
        self.unique
    }

    pub fn with_repetition(&self) -> bool {
        self.with_repetition
    }
}

/// Recursive scan. A file qualifies if its name contains ".jpg" or ".png";
/// the match is a case-sensitive substring test, not extension parsing.
fn collect_images(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_images(&path, out)?;
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.contains(".jpg") || name.contains(".png") {
                out.push(path);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn scan_matches_substring_and_recurses() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.jpg");
        touch(dir.path(), "b.png");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "archive.jpg.bak");
        touch(dir.path(), "SHOUTY.JPG");
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub"), "c.jpg");

        let pool = AssetPool::scan(dir.path(), 1).unwrap();
        // ".jpg.bak" still contains the ".jpg" substring; ".JPG" does not.
        assert_eq!(pool.unique(), 4);
    }

    #[test]
    fn draws_each_asset_at_most_once() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.jpg", "c.png"] {
            touch(dir.path(), name);
        }
        let mut pool = AssetPool::scan(dir.path(), 3).unwrap();
        assert!(!pool.with_repetition());

        let mut rng = SmallRng::seed_from_u64(3);
        let mut seen = HashSet::new();
        for _ in 0..3 {
            let drawn = pool.choose(&mut rng).unwrap().unwrap();
            assert!(seen.insert(drawn));
        }
        assert_eq!(pool.choose(&mut rng).unwrap(), None);
    }

    #[test]
    fn refills_exactly_on_exhaustion() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.jpg");
        touch(dir.path(), "b.jpg");
        let mut pool = AssetPool::scan(dir.path(), 5).unwrap();
        assert!(pool.with_repetition());

        let mut rng = SmallRng::seed_from_u64(5);
        // Each refill cycle presents the full set before any repeat.
        for _ in 0..2 {
            let cycle: HashSet<_> = (0..2)
                .map(|_| pool.choose(&mut rng).unwrap().unwrap())
                .collect();
            assert_eq!(cycle.len(), 2);
        }
        assert!(pool.choose(&mut rng).unwrap().is_some());
    }

    #[test]
    fn empty_directory_yields_none() {
        let dir = TempDir::new().unwrap();
        let mut pool = AssetPool::scan(dir.path(), 10).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(pool.choose(&mut rng).unwrap(), None);
    }

    #[test]
    fn missing_directory_is_an_empty_pool() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nowhere");
        let mut pool = AssetPool::scan(gone, 2).unwrap();
        let mut rng = SmallRng::seed_from_u64(9);
        assert_eq!(pool.choose(&mut rng).unwrap(), None);
    }

    #[test]
    fn add_and_remove_mutate_availability() {
        let dir = TempDir::new().unwrap();
        let mut pool = AssetPool::scan(dir.path(), 0).unwrap();
        pool.add("extra.png");
        pool.add("extra.png");
        assert_eq!(pool.available(), 1);
        pool.remove(Path::new("extra.png"));
        assert_eq!(pool.available(), 0);
    }
}
