use std::{
    collections::HashMap,
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
};

use walkdir::WalkDir;

use super::SampleProvider;
use crate::{
    grain::GrainRecord,
    utils::{
        buffer::append_interleaved_channel,
        decoder::{AudioDecoder, DecodedAudio},
    },
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Resolves grain records to audio files below a search root and slices their frame ranges.
///
/// Files are matched by file name: the directory part of a record's path is ignored, so
/// catalogues which got created on another machine still resolve. Each file is decoded once and
/// cached. Only the first channel of multi-channel files is used.
pub struct FileSampleProvider {
    root: PathBuf,
    index: Option<HashMap<OsString, PathBuf>>,
    cache: HashMap<PathBuf, Arc<Vec<f32>>>,
}

impl FileSampleProvider {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            index: None,
            cache: HashMap::new(),
        }
    }

    /// The directory which gets searched for source files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find the file for the given record path below the search root.
    pub fn resolve(&mut self, file: &Path) -> Result<PathBuf, Error> {
        let not_found = || Error::MediaFileNotFound(file.display().to_string());
        let file_name = file.file_name().ok_or_else(not_found)?;
        let root = &self.root;
        let index = self.index.get_or_insert_with(|| {
            let index = WalkDir::new(root)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| (e.file_name().to_os_string(), e.into_path()))
                .collect::<HashMap<_, _>>();
            log::debug!(
                "Indexed {} files below '{}'",
                index.len(),
                root.display()
            );
            index
        });
        index.get(file_name).cloned().ok_or_else(not_found)
    }

    fn decoded_channel(&mut self, path: &Path) -> Result<Arc<Vec<f32>>, Error> {
        if let Some(samples) = self.cache.get(path) {
            return Ok(Arc::clone(samples));
        }
        log::debug!("Decoding '{}'", path.display());
        let DecodedAudio {
            channel_count,
            samples: interleaved,
            ..
        } = AudioDecoder::from_file(path)?.decode_all()?;
        let samples = if channel_count == 1 {
            interleaved
        } else {
            let mut first_channel = Vec::with_capacity(interleaved.len() / channel_count.max(1));
            append_interleaved_channel(&interleaved, channel_count, 0, &mut first_channel);
            first_channel
        };
        let samples = Arc::new(samples);
        self.cache.insert(path.to_path_buf(), Arc::clone(&samples));
        Ok(samples)
    }
}

impl SampleProvider for FileSampleProvider {
    fn samples(&mut self, record: &GrainRecord) -> Result<Arc<Vec<f32>>, Error> {
        let path = self.resolve(record.file())?;
        let samples = self.decoded_channel(&path)?;
        if record.end_frame() > samples.len() {
            return Err(Error::GrainOutOfRange {
                id: record.id(),
                end_frame: record.end_frame(),
                frame_count: samples.len(),
            });
        }
        Ok(Arc::new(
            samples[record.start_frame()..record.end_frame()].to_vec(),
        ))
    }
}

// -------------------------------------------------------------------------------------------------
