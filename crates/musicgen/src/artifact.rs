use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use rand::Rng;
use sonata_config::ArtifactConfig;

use crate::{
    error::ArtifactWriteError,
    waveform::{SAMPLE_RATE, Waveform, f32_to_pcm16},
};

const FILE_PREFIX: &str = "music_";
const FILE_EXTENSION: &str = ".wav";

/// Attempts at drawing an unused file name before giving up
const NAME_ATTEMPTS: u32 = 4;

/// A generated audio file in the scratch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub file_name: String,
}

/// Scratch directory holding one WAV file per generation
#[derive(Debug)]
pub struct ArtifactStore {
    directory: PathBuf,
    delete_after_send: bool,
}

impl ArtifactStore {
    pub fn new(config: &ArtifactConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            delete_after_send: config.delete_after_send,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create the scratch directory if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created
    pub fn ensure_dir(&self) -> Result<(), ArtifactWriteError> {
        fs::create_dir_all(&self.directory).map_err(|source| ArtifactWriteError::Io {
            path: self.directory.clone(),
            source,
        })
    }

    /// Write a waveform as 16-bit PCM WAV under a fresh random name
    ///
    /// # Errors
    ///
    /// Returns an error if the waveform is not at the artifact sample rate,
    /// no unused name is found, or the file cannot be written
    pub fn save(&self, waveform: &Waveform) -> Result<Artifact, ArtifactWriteError> {
        if waveform.sample_rate() != SAMPLE_RATE {
            return Err(ArtifactWriteError::SampleRate(waveform.sample_rate()));
        }

        let (file, artifact) = self.create_unique()?;

        if let Err(e) = write_wav(file, waveform, &artifact.path) {
            // Never leave a truncated file behind
            let _ = fs::remove_file(&artifact.path);
            return Err(e);
        }

        tracing::info!(path = %artifact.path.display(), "music saved");
        Ok(artifact)
    }

    fn create_unique(&self) -> Result<(File, Artifact), ArtifactWriteError> {
        for _ in 0..NAME_ATTEMPTS {
            let file_name = random_file_name();
            let path = self.directory.join(&file_name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((file, Artifact { path, file_name })),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::warn!(file_name, "artifact name collision, drawing another");
                }
                Err(source) => return Err(ArtifactWriteError::Io { path, source }),
            }
        }

        Err(ArtifactWriteError::NameExhausted(NAME_ATTEMPTS))
    }

    /// Read an artifact's bytes for delivery
    ///
    /// With `delete_after_send` the file is removed once read.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read
    pub async fn read(&self, artifact: &Artifact) -> io::Result<Vec<u8>> {
        let bytes = tokio::fs::read(&artifact.path).await?;

        if self.delete_after_send
            && let Err(e) = tokio::fs::remove_file(&artifact.path).await
        {
            tracing::warn!(path = %artifact.path.display(), error = %e, "failed to delete delivered artifact");
        }

        Ok(bytes)
    }

    /// Delete artifacts last modified more than `retention` ago
    ///
    /// Files that do not look like artifacts are left alone. Returns the
    /// number of files removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed
    pub fn sweep(&self, retention: Duration) -> io::Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;

        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;

            let is_artifact = entry.file_name().to_str().is_some_and(is_artifact_name);
            if !is_artifact {
                continue;
            }

            let expired = entry
                .metadata()
                .and_then(|metadata| metadata.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age >= retention);

            if expired {
                match fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!(path = %entry.path().display(), error = %e, "failed to sweep artifact"),
                }
            }
        }

        Ok(removed)
    }
}

fn write_wav(file: File, waveform: &Waveform, path: &Path) -> Result<(), ArtifactWriteError> {
    let encode_error = |source| ArtifactWriteError::Encode {
        path: path.to_path_buf(),
        source,
    };

    let spec = hound::WavSpec {
        channels: waveform.channels(),
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::new(BufWriter::new(file), spec).map_err(encode_error)?;
    for &sample in waveform.samples() {
        writer.write_sample(f32_to_pcm16(sample)).map_err(encode_error)?;
    }
    writer.finalize().map_err(encode_error)
}

/// `music_` followed by 32 random bits as lowercase hex
fn random_file_name() -> String {
    let id: u32 = rand::rng().random();
    format!("{FILE_PREFIX}{id:08x}{FILE_EXTENSION}")
}

/// Whether a file name matches `music_[0-9a-f]{8}.wav`
pub fn is_artifact_name(name: &str) -> bool {
    name.strip_prefix(FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(FILE_EXTENSION))
        .is_some_and(|id| id.len() == 8 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')))
}
