//! # Persistence Module
//!
//! Voxel arrays of chunks that left the streaming radius, keyed by
//! [`chunk_key`]. The whole map is read once when the world opens and written
//! once when it closes, as a single JSON object:
//!
//! ```json
//! { "0,-1,3": [0, 0, 2, ...], "1,-1,3": [...] }
//! ```
//!
//! A missing, unreadable or malformed file is logged and treated as an empty
//! world, so generation simply takes over.

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{info, warn};

use super::{
    block::BlockId,
    chunk::{chunk_key, parse_chunk_key, ChunkCoordinate, CHUNK_SIZE},
};
use crate::error::EngineError;

/// Saved voxel arrays plus the file they belong to.
#[derive(Debug)]
pub struct PersistedWorldData {
    path: PathBuf,
    chunks: HashMap<ChunkCoordinate, Vec<BlockId>>,
}

impl PersistedWorldData {
    /// Creates an empty store that will save to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        PersistedWorldData {
            path: path.into(),
            chunks: HashMap::new(),
        }
    }

    /// Loads `path` if it exists.
    ///
    /// Never fails: read or decode problems are logged and yield an empty store.
    /// Individual entries with a bad key or the wrong length are skipped.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !path.exists() {
            info!("No save file at {}, starting empty", path.display());
            return Self::empty(path);
        }

        match Self::read(&path) {
            Ok(raw) => {
                let chunks = Self::validate(raw);
                info!("Loaded {} saved chunks from {}", chunks.len(), path.display());
                PersistedWorldData { path, chunks }
            }
            Err(err) => {
                warn!("Ignoring unreadable save file: {}", err);
                Self::empty(path)
            }
        }
    }

    fn read(path: &Path) -> Result<HashMap<String, Vec<BlockId>>, EngineError> {
        let file = File::open(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn validate(raw: HashMap<String, Vec<BlockId>>) -> HashMap<ChunkCoordinate, Vec<BlockId>> {
        raw.into_iter()
            .filter_map(|(key, voxels)| {
                let Some(position) = parse_chunk_key(&key) else {
                    warn!("Skipping saved chunk with malformed key '{}'", key);
                    return None;
                };
                if voxels.len() != CHUNK_SIZE as usize {
                    warn!(
                        "Skipping saved chunk {} with {} voxels, expected {}",
                        key,
                        voxels.len(),
                        CHUNK_SIZE
                    );
                    return None;
                }
                Some((position, voxels))
            })
            .collect()
    }

    /// File the data is saved to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved voxels of a chunk.
    pub fn get(&self, position: ChunkCoordinate) -> Option<&[BlockId]> {
        self.chunks.get(&position).map(Vec::as_slice)
    }

    /// Stores a copy of a chunk's voxels, replacing any earlier copy.
    pub fn insert(&mut self, position: ChunkCoordinate, voxels: &[BlockId]) {
        match self.chunks.get_mut(&position) {
            Some(saved) => saved.copy_from_slice(voxels),
            None => {
                self.chunks.insert(position, voxels.to_vec());
            }
        }
    }

    /// Whether a chunk has saved voxels.
    pub fn contains(&self, position: ChunkCoordinate) -> bool {
        self.chunks.contains_key(&position)
    }

    /// Number of saved chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether nothing is saved.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Writes everything to disk.
    ///
    /// The data goes to a sibling temporary file first and is then renamed over
    /// the target, so a crash mid-write leaves the previous save intact.
    ///
    /// # Errors
    /// [`EngineError::Io`] if the directory, file or rename fails;
    /// [`EngineError::SaveFormat`] if encoding fails.
    pub fn save(&self) -> Result<(), EngineError> {
        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source| EngineError::Io { path, source }
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let raw: HashMap<String, &Vec<BlockId>> = self
            .chunks
            .iter()
            .map(|(position, voxels)| (chunk_key(*position), voxels))
            .collect();

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let file = File::create(&temp_path).map_err(io_error(&temp_path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &raw)?;
        writer.flush().map_err(io_error(&temp_path))?;
        drop(writer);

        fs::rename(&temp_path, &self.path).map_err(io_error(&self.path))?;
        info!("Saved {} chunks to {}", self.chunks.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use cgmath::Point3;

    use super::*;

    fn temp_save_path(name: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        std::env::temp_dir().join(format!(
            "voxel-streaming-{}-{}-{}.json",
            name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ))
    }

    fn voxels(fill: BlockId) -> Vec<BlockId> {
        vec![fill; CHUNK_SIZE as usize]
    }

    #[test]
    fn save_then_open_round_trips() {
        let path = temp_save_path("round-trip");
        let mut data = PersistedWorldData::empty(&path);
        let mut chunk = voxels(0);
        chunk[17] = 3;
        data.insert(Point3::new(-1, 0, 4), &chunk);
        data.insert(Point3::new(2, 2, 2), &voxels(2));
        data.save().unwrap();

        let reopened = PersistedWorldData::open(&path);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(Point3::new(-1, 0, 4)), Some(&chunk[..]));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn insert_overwrites_previous_copy() {
        let mut data = PersistedWorldData::empty(temp_save_path("overwrite"));
        data.insert(Point3::new(0, 0, 0), &voxels(2));
        data.insert(Point3::new(0, 0, 0), &voxels(4));
        assert_eq!(data.len(), 1);
        assert_eq!(data.get(Point3::new(0, 0, 0)).unwrap()[0], 4);
    }

    #[test]
    fn missing_file_opens_empty() {
        let data = PersistedWorldData::open(temp_save_path("missing"));
        assert!(data.is_empty());
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let path = temp_save_path("corrupt");
        fs::write(&path, b"{ not json").unwrap();
        let data = PersistedWorldData::open(&path);
        assert!(data.is_empty());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn bad_entries_are_skipped() {
        let path = temp_save_path("bad-entries");
        let good = serde_json::to_string(&voxels(2)).unwrap();
        fs::write(
            &path,
            format!(r#"{{"0,0,0": {good}, "1,0,0": [1, 2, 3], "nope": {good}}}"#),
        )
        .unwrap();

        let data = PersistedWorldData::open(&path);
        assert_eq!(data.len(), 1);
        assert!(data.contains(Point3::new(0, 0, 0)));
        fs::remove_file(&path).unwrap();
    }
}
