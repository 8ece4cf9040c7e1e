//! Batch extraction.
//!
//! [`Extractor`] writes a set of entries below a destination directory. A
//! failing entry is recorded in the [`ExtractionReport`] and never stops the
//! rest of the batch.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::entry::Entry;
use crate::{ErrorKind, Result};

/// What to do when the target file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Overwrite {
    /// Leave the existing file and count the entry as skipped.
    Skip,
    /// Truncate and rewrite the file.
    #[default]
    Replace,
}

/// Batch extraction settings.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Recreate the entry's folder below the destination.
    pub preserve_folder: bool,
    pub overwrite: Overwrite,
    /// Worker threads; 0 uses the rayon default, 1 runs on the calling thread.
    pub workers: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            preserve_folder: true,
            overwrite: Overwrite::Replace,
            workers: 0,
        }
    }
}

/// Cooperative cancellation flag shared with a running batch.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the batch before the next entry starts.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A batch entry that could not be extracted.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExtractFailure {
    pub index: usize,
    pub path: String,
    pub kind: ErrorKind,
    pub detail: String,
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExtractionReport {
    pub succeeded: usize,
    pub skipped: usize,
    /// Entries never started because the batch was cancelled.
    pub not_started: usize,
    /// Failed entries ordered by entry index.
    pub failures: Vec<ExtractFailure>,
    pub cancelled: bool,
    pub bytes_written: u64,
}

impl ExtractionReport {
    /// Number of entries the batch was given.
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.not_started + self.failures.len()
    }

    /// Whether every entry was written or skipped.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Result of extracting one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Written(PathBuf),
    Skipped(PathBuf),
}

type ProgressFn<'a> = Box<dyn Fn(&Entry, usize, usize) + Send + Sync + 'a>;

/// Extracts batches of entries.
///
/// # Example
///
/// ```no_run
/// use bsarc_ba2::{Archive, ExtractOptions, Extractor};
///
/// let archive = Archive::open("Fallout4 - Meshes.ba2")?;
/// let report = Extractor::new(ExtractOptions::default())
///     .with_progress(|entry, done, total| println!("[{done}/{total}] {}", entry.full_path()))
///     .run(archive.iter(), "out")?;
/// println!("{} written, {} failed", report.succeeded, report.failures.len());
/// # Ok::<(), bsarc_ba2::Error>(())
/// ```
pub struct Extractor<'a> {
    options: ExtractOptions,
    cancel: CancellationToken,
    progress: Option<ProgressFn<'a>>,
}

#[derive(Default)]
struct BatchState {
    done: AtomicUsize,
    succeeded: AtomicUsize,
    skipped: AtomicUsize,
    not_started: AtomicUsize,
    bytes_written: AtomicU64,
    failures: Mutex<Vec<ExtractFailure>>,
}

impl<'a> Extractor<'a> {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Use an externally controlled cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Called after each entry finishes with `(entry, done, total)`.
    ///
    /// With more than one worker the callback runs on worker threads, in no
    /// particular order.
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(&Entry, usize, usize) + Send + Sync + 'a,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// The token checked before each entry starts.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract `entries` below `destination`.
    ///
    /// Only failing to create `destination` or the worker pool is an error;
    /// per-entry failures end up in the report.
    pub fn run<'e, I, P>(&self, entries: I, destination: P) -> Result<ExtractionReport>
    where
        I: IntoIterator<Item = &'e Entry>,
        P: AsRef<Path>,
    {
        let destination = destination.as_ref();
        ensure_dir(destination)?;

        let entries: Vec<&Entry> = entries.into_iter().collect();
        let total = entries.len();
        let state = BatchState::default();

        debug!(
            entries = total,
            workers = self.options.workers,
            destination = %destination.display(),
            "starting extraction"
        );

        let process = |entry: &Entry| self.process(entry, destination, total, &state);

        if self.options.workers == 1 {
            entries.iter().for_each(|&entry| process(entry));
        } else {
            self.run_pool(&entries, &process)?;
        }

        let mut failures = state.failures.into_inner();
        failures.sort_by_key(|f| f.index);

        let report = ExtractionReport {
            succeeded: state.succeeded.into_inner(),
            skipped: state.skipped.into_inner(),
            not_started: state.not_started.into_inner(),
            failures,
            cancelled: self.cancel.is_cancelled(),
            bytes_written: state.bytes_written.into_inner(),
        };

        debug!(
            succeeded = report.succeeded,
            skipped = report.skipped,
            failed = report.failures.len(),
            not_started = report.not_started,
            "extraction finished"
        );

        Ok(report)
    }

    #[cfg(feature = "parallel")]
    fn run_pool<F>(&self, entries: &[&Entry], process: &F) -> Result<()>
    where
        F: Fn(&Entry) + Sync,
    {
        use rayon::prelude::*;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers)
            .build()
            .map_err(|e| crate::Error::WorkerPool(e.to_string()))?;

        pool.install(|| entries.par_iter().for_each(|&entry| process(entry)));
        Ok(())
    }

    #[cfg(not(feature = "parallel"))]
    fn run_pool<F>(&self, entries: &[&Entry], process: &F) -> Result<()>
    where
        F: Fn(&Entry) + Sync,
    {
        entries.iter().for_each(|&entry| process(entry));
        Ok(())
    }

    fn process(&self, entry: &Entry, destination: &Path, total: usize, state: &BatchState) {
        if self.cancel.is_cancelled() {
            state.not_started.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let result = entry.extract_with(
            destination,
            self.options.preserve_folder,
            None,
            self.options.overwrite,
        );

        match result {
            Ok(Outcome::Written(_)) => {
                state.succeeded.fetch_add(1, Ordering::Relaxed);
                state
                    .bytes_written
                    .fetch_add(entry.bytes_written(), Ordering::Relaxed);
            }
            Ok(Outcome::Skipped(path)) => {
                debug!(entry = entry.index(), path = %path.display(), "target exists, skipped");
                state.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(
                    entry = entry.index(),
                    path = %entry.full_path(),
                    error = %e,
                    "failed to extract entry"
                );
                state.failures.lock().push(ExtractFailure {
                    index: entry.index(),
                    path: entry.full_path().to_string(),
                    kind: e.kind(),
                    detail: e.to_string(),
                });
            }
        }

        let done = state.done.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(progress) = &self.progress {
            progress(entry, done, total);
        }
    }
}

/// Create `path` and its parents. Another thread creating the same
/// directory concurrently is not an error.
pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{Ba2Builder, TextureSpec};
    use crate::{Archive, ArchiveConfig};
    use bsarc_dds::DxgiFormat;

    fn ten_files() -> Ba2Builder {
        (0..10).fold(Ba2Builder::general(1), |builder, i| {
            builder.file(
                &format!(r"meshes\set{}\part{}.nif", i % 3, i),
                format!("payload number {i} ").repeat(16).into_bytes(),
                true,
            )
        })
    }

    fn open(dir: &Path, builder: &Ba2Builder) -> Archive {
        let path = builder.write(dir);
        Archive::open(path).unwrap()
    }

    #[test]
    fn test_batch_continues_past_failure() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ten_files();
        let mut bytes = builder.build();
        let offset = builder.payload_offset(5) as usize;
        bytes[offset..offset + 2].copy_from_slice(&[0xFF, 0xFF]);
        let path = dir.path().join("corrupt.ba2");
        fs::write(&path, bytes).unwrap();
        let archive = Archive::open(&path).unwrap();

        let out = dir.path().join("out");
        let options = ExtractOptions {
            workers: 1,
            ..Default::default()
        };
        let report = Extractor::new(options).run(archive.iter(), &out).unwrap();

        assert_eq!(report.succeeded, 9);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.index, 5);
        assert_eq!(failure.path, archive.get(5).unwrap().full_path());
        assert_eq!(failure.kind, ErrorKind::Codec);
        assert!(!report.cancelled);
        assert_eq!(report.total(), 10);
        assert!(out.join("meshes").join("set1").join("part4.nif").is_file());
        assert!(!out.join("meshes").join("set2").join("part5.nif").exists());
    }

    #[test]
    fn test_implausible_texture_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        let spec = TextureSpec::new(32, 32, 6, DxgiFormat::BC1_UNORM).chunked(3);
        let builder = Ba2Builder::dx10(1)
            .texture(r"textures\bad.dds", spec, true)
            .texture(r"textures\good.dds", spec, true);
        let mut bytes = builder.build();
        for chunk in 0..3 {
            let at = builder.record_offset(0) as usize + 24 + chunk * 24 + 12;
            bytes[at..at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        }
        let path = dir.path().join("huge.ba2");
        fs::write(&path, bytes).unwrap();
        let archive = Archive::open(&path).unwrap();

        let out = dir.path().join("out");
        let options = ExtractOptions {
            workers: 1,
            ..Default::default()
        };
        let report = Extractor::new(options).run(archive.iter(), &out).unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 0);
        assert_eq!(report.failures[0].kind, ErrorKind::Codec);
        assert!(out.join("textures").join("good.dds").is_file());
        assert!(!out.join("textures").join("bad.dds").exists());
    }

    #[test]
    fn test_parallel_batch() {
        let dir = tempfile::tempdir().unwrap();
        let archive = open(dir.path(), &ten_files());
        let out = dir.path().join("out");

        let options = ExtractOptions {
            workers: 4,
            ..Default::default()
        };
        let report = Extractor::new(options).run(archive.iter(), &out).unwrap();

        assert_eq!(report.succeeded, 10);
        assert!(report.is_complete());
        let expected: u64 = archive.iter().map(|e| e.real_size()).sum();
        assert_eq!(report.bytes_written, expected);

        for entry in archive.iter() {
            let written = fs::read(entry.output_path(&out, true, None).unwrap()).unwrap();
            assert_eq!(written, entry.read_content().unwrap());
        }
    }

    #[test]
    fn test_flat_layout() {
        let dir = tempfile::tempdir().unwrap();
        let archive = open(dir.path(), &ten_files());
        let out = dir.path().join("flat");

        let options = ExtractOptions {
            preserve_folder: false,
            ..Default::default()
        };
        let report = Extractor::new(options).run(archive.iter(), &out).unwrap();

        assert_eq!(report.succeeded, 10);
        assert!(out.join("part7.nif").is_file());
        assert!(!out.join("meshes").exists());
    }

    #[test]
    fn test_skip_existing() {
        let dir = tempfile::tempdir().unwrap();
        let archive = open(dir.path(), &ten_files());
        let out = dir.path().join("out");

        let existing = archive.get(2).unwrap().output_path(&out, true, None).unwrap();
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, b"keep me").unwrap();

        let options = ExtractOptions {
            overwrite: Overwrite::Skip,
            ..Default::default()
        };
        let report = Extractor::new(options).run(archive.iter(), &out).unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.succeeded, 9);
        assert_eq!(fs::read(&existing).unwrap(), b"keep me");

        let report = Extractor::new(ExtractOptions::default())
            .run(archive.iter(), &out)
            .unwrap();
        assert_eq!(report.succeeded, 10);
        assert_ne!(fs::read(&existing).unwrap(), b"keep me");
    }

    #[test]
    fn test_cancellation_stops_remaining_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = open(dir.path(), &ten_files());
        let out = dir.path().join("out");

        let token = CancellationToken::new();
        let seen = AtomicUsize::new(0);
        let options = ExtractOptions {
            workers: 1,
            ..Default::default()
        };
        let report = Extractor::new(options)
            .with_cancellation(token.clone())
            .with_progress(|_, done, total| {
                assert_eq!(total, 10);
                seen.store(done, Ordering::Relaxed);
                if done == 3 {
                    token.cancel();
                }
            })
            .run(archive.iter(), &out)
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.not_started, 7);
        assert_eq!(seen.load(Ordering::Relaxed), 3);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_unsafe_path_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let archive = open(
            dir.path(),
            &Ba2Builder::general(1)
                .file(r"..\..\escape.txt", b"nope".to_vec(), false)
                .file("ok.txt", b"fine".to_vec(), false),
        );
        let out = dir.path().join("nested").join("out");

        let report = Extractor::new(ExtractOptions::default())
            .run(archive.iter(), &out)
            .unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, ErrorKind::Format);
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_closed_archive_entries_fail() {
        let dir = tempfile::tempdir().unwrap();
        let archive = open(dir.path(), &ten_files());
        archive.close();

        let report = Extractor::new(ExtractOptions::default())
            .run(archive.iter(), dir.path().join("out"))
            .unwrap();

        assert_eq!(report.failures.len(), 10);
        assert!(report
            .failures
            .iter()
            .all(|f| f.kind == ErrorKind::ClosedArchive));
        assert!(report.failures.windows(2).all(|w| w[0].index < w[1].index));
    }

    #[test]
    fn test_match_last_write_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = ten_files().write(dir.path());
        let old = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_500_000_000);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let config = ArchiveConfig {
            match_last_write_time: true,
        };
        let archive = Archive::open_with(&path, config).unwrap();
        assert_eq!(archive.last_write_time(), old);

        let out = dir.path().join("out");
        let written = archive.get(0).unwrap().extract_to(&out, true).unwrap();
        assert_eq!(fs::metadata(&written).unwrap().modified().unwrap(), old);

        archive.set_match_last_write_time(false);
        let written = archive.get(1).unwrap().extract_to(&out, true).unwrap();
        assert_ne!(fs::metadata(&written).unwrap().modified().unwrap(), old);
    }

    #[test]
    fn test_single_entry_extract_with_new_name() {
        let dir = tempfile::tempdir().unwrap();
        let archive = open(dir.path(), &ten_files());
        let out = dir.path().join("out");

        let entry = archive.get(4).unwrap();
        let written = entry.extract(&out, false, Some("renamed.nif")).unwrap();
        assert_eq!(written, out.join("renamed.nif"));
        assert_eq!(fs::read(&written).unwrap(), entry.read_content().unwrap());
        assert_eq!(entry.bytes_written(), entry.real_size());

        // extracting again replaces the file with identical content
        let again = entry.extract(&out, false, Some("renamed.nif")).unwrap();
        assert_eq!(fs::read(again).unwrap(), entry.read_content().unwrap());
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
