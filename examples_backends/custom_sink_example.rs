use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing_cloud_logging::core::{Core, CoreConfig};
use tracing_cloud_logging::field::Field;
use tracing_cloud_logging::operation::{operation_cont, operation_end, operation_start};
use tracing_cloud_logging::record::Entry;
use tracing_cloud_logging::resource::{EnvResourceDetector, ResourceDetector};
use tracing_cloud_logging::severity::Level;
use tracing_cloud_logging::sink::WriteSyncer;

/// Example of plugging in a custom destination by implementing
/// `WriteSyncer` directly. Imagine this forwards lines to some agent
/// socket; here it keeps them in memory and counts flushes.
#[derive(Default)]
struct MemorySink {
    lines: Mutex<Vec<String>>,
    flushes: AtomicU64,
}

impl WriteSyncer for MemorySink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let line = String::from_utf8_lossy(buf).into_owned();
        self.lines
            .lock()
            .map_err(|_| io::Error::other("sink poisoned"))?
            .push(line);
        Ok(buf.len())
    }

    fn sync(&self) -> io::Result<()> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink = Arc::new(MemorySink::default());

    let config = CoreConfig::default()
        .with_initial_field("env", "staging")
        .detect_resource(&EnvResourceDetector);
    println!("detected resource: {:?}", EnvResourceDetector.detect());

    let core = Core::new(sink.clone(), Level::Info, config);

    core.with([operation_start("import-7", "importer")])
        .write(&Entry::new(Level::Info, "import started"), &[])?;
    core.with([operation_cont("import-7", "importer")])
        .write(&Entry::new(Level::Info, "batch done"), &[Field::u64("rows", 500)])?;
    core.with([operation_end("import-7", "importer")])
        .write(&Entry::new(Level::Fatal, "import aborted"), &[])?;

    for line in sink.lines.lock().map_err(|_| "sink poisoned")?.iter() {
        print!("{line}");
    }
    println!("flushes: {}", sink.flushes.load(Ordering::Relaxed));
    Ok(())
}
