use std::{error, fmt, io};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by grainweave.
///
/// Numeric degeneracies (NaN or infinite samples and energy measurements) are never reported as
/// errors: they get absorbed locally by zero substitution or clamped reciprocals, so a long render
/// always completes.
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    EmptyInput(String),
    ShapeError(String),
    ParameterError(String),
    GrainNotRealized(u64),
    UnresolvedPosition(usize),
    GrainOutOfRange {
        id: u64,
        end_frame: usize,
        frame_count: usize,
    },
    MediaFileNotFound(String),
    MediaFileProbeError,
    AudioDecodingError(Box<dyn error::Error + Send + Sync>),
    OutputError(Box<dyn error::Error + Send + Sync>),
    IoError(io::Error),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput(str) => write!(f, "Empty input: {str}"),
            Self::ShapeError(str) => write!(f, "Invalid buffer shape: {str}"),
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
            Self::GrainNotRealized(id) => {
                write!(f, "Grain with id {id} has no sample buffer attached")
            }
            Self::UnresolvedPosition(index) => {
                write!(f, "Grain at sequence index {index} has no resolved position")
            }
            Self::GrainOutOfRange {
                id,
                end_frame,
                frame_count,
            } => write!(
                f,
                "Grain with id {id} ends at frame {end_frame}, but its file only has {frame_count} frames"
            ),
            Self::MediaFileNotFound(name) => write!(f, "Audio file '{name}' not found"),
            Self::MediaFileProbeError => write!(f, "Audio file failed to probe"),
            Self::AudioDecodingError(err) | Self::OutputError(err) => err.fmt(f),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}
