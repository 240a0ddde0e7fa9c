//! Scans a directory tree for embedded Xenos shader containers, translates
//! each distinct one, and writes the aggregated translated source to an
//! output directory (`§6`).
//!
//! Deliberately stops at emitting translated source text plus the feature
//! mask: no DXIL/SPIR-V/AIR compilation and no entropy compression of the
//! output cache (`§1`, `§6` Non-goals).

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use xxhash_rust::xxh3::xxh3_64;

use xenos_container::ShaderContainer;
use xenos_shader::{TranslateOptions, Translator};

const SCAN_ALIGNMENT: usize = 4;

#[derive(Debug, Parser)]
#[command(author, version, about = "Translate Xenos shader microcode embedded in a directory tree")]
struct Cli {
    /// Directory to scan for files containing embedded shader containers.
    input_dir: PathBuf,

    /// Directory translated source files are written to.
    output_dir: PathBuf,

    /// Enables the extended-profile heuristics and feature set.
    #[arg(long)]
    extended_profile: bool,

    /// Number of worker threads. Defaults to the number of CPUs.
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(Debug, Clone)]
struct Candidate {
    source_file: PathBuf,
    offset: usize,
}

fn find_candidates(data: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut i = 0usize;
    while i + ShaderContainer::HEADER_SIZE <= data.len() {
        if ShaderContainer::parse(&data[i..]).is_ok() {
            offsets.push(i);
        }
        i += SCAN_ALIGNMENT;
    }
    offsets
}

fn scan_directory(root: &Path) -> anyhow::Result<Vec<Candidate>> {
    let mut candidates = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                let data = fs::read(&path)?;
                for offset in find_candidates(&data) {
                    candidates.push(Candidate { source_file: path.clone(), offset });
                }
            }
        }
    }

    Ok(candidates)
}

/// Extracts the container's declared byte range starting at `offset`, for
/// content-hash dedup, without fully parsing it yet.
fn container_span<'a>(data: &'a [u8], offset: usize) -> Option<&'a [u8]> {
    let container = ShaderContainer::parse(&data[offset..]).ok()?;
    let end = offset + container.physical_size() as usize;
    data.get(offset..end.min(data.len()))
}

struct WorkItem {
    candidate: Candidate,
    bytes: Vec<u8>,
}

fn run_worker(
    queue: Arc<Mutex<Vec<WorkItem>>>,
    output_dir: PathBuf,
    options: TranslateOptions,
    results: mpsc::Sender<anyhow::Result<String>>,
) {
    let mut translator = Translator::new(options);
    loop {
        let item = {
            let mut queue = queue.lock().unwrap();
            queue.pop()
        };
        let Some(item) = item else { break };

        let name = format!(
            "{}_{:08x}",
            item.candidate.source_file.file_stem().and_then(|s| s.to_str()).unwrap_or("shader"),
            item.candidate.offset
        );

        let outcome = translator.translate(&item.bytes).map(|output| {
            let path = output_dir.join(format!("{name}.hlsl"));
            (path, output.source, output.feature_mask)
        });

        let result = match outcome {
            Ok((path, source, feature_mask)) => {
                let header = format!("// feature_mask = 0x{:08x}\n", feature_mask.bits());
                fs::write(&path, header + &source).map(|_| name.clone()).map_err(anyhow::Error::from)
            }
            Err(err) => {
                warn!(file = %item.candidate.source_file.display(), offset = item.candidate.offset, error = %err, "translation failed");
                Err(anyhow::anyhow!(err))
            }
        };

        let _ = results.send(result);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    fs::create_dir_all(&cli.output_dir)?;

    info!(dir = %cli.input_dir.display(), "scanning for shader containers");
    let candidates = scan_directory(&cli.input_dir)?;
    info!(found = candidates.len(), "candidate shader offsets found");

    let mut seen_hashes = HashSet::new();
    let mut queue = Vec::new();
    for candidate in candidates {
        let data = fs::read(&candidate.source_file)?;
        let Some(span) = container_span(&data, candidate.offset) else {
            continue;
        };
        let hash = xxh3_64(span);
        if !seen_hashes.insert(hash) {
            continue;
        }
        queue.push(WorkItem { candidate, bytes: span.to_vec() });
    }

    info!(distinct = queue.len(), "distinct shaders to translate");

    let progress = ProgressBar::new(queue.len() as u64);
    progress.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}").unwrap());

    let jobs = cli.jobs.unwrap_or_else(|| thread::available_parallelism().map(|n| n.get()).unwrap_or(4));
    let options = TranslateOptions { extended_profile: cli.extended_profile };
    let queue = Arc::new(Mutex::new(queue));
    let (tx, rx) = mpsc::channel();

    let mut handles = Vec::new();
    for _ in 0..jobs {
        let queue = Arc::clone(&queue);
        let output_dir = cli.output_dir.clone();
        let tx = tx.clone();
        handles.push(thread::spawn(move || run_worker(queue, output_dir, options, tx)));
    }
    drop(tx);

    let mut translated = 0usize;
    let mut failed = 0usize;
    for result in rx {
        progress.inc(1);
        match result {
            Ok(name) => {
                progress.set_message(name);
                translated += 1;
            }
            Err(_) => failed += 1,
        }
    }

    for handle in handles {
        let _ = handle.join();
    }
    progress.finish_with_message("done");

    info!(translated, failed, "translation pass complete");
    Ok(())
}
