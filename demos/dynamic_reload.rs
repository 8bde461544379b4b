//! # Demo: dynamic_reload
//!
//! Reconfigure a running `ReaderService` without restarting it.
//!
//! Demonstrates how to:
//! - Start a `ReaderService` over an in-memory `SharedProfiles` source.
//! - Swap the profile set at runtime and trigger the reload signal.
//! - Watch the reconciler add/remove readers while others keep running.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► write two CSV files into a temp directory
//!   ├─► start ReaderService with profile {cdr-a}
//!   ├─► set profiles {cdr-a, cdr-b} ─► reload ─► reconciler adds cdr-b
//!   ├─► set profiles {cdr-b}        ─► reload ─► reconciler removes cdr-a
//!   └─► trigger shutdown, join with grace
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example dynamic_reload --features logging
//! ```

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use ingestvisor::{
    Bus, Config, ConfigSource, Event, EventKind, LogWriter, ReaderParams, ReaderProfile,
    ReaderService, Service, SharedProfiles, ShutdownCoordinator, Subscribe, SubscriberSet,
    FORMAT_FILE_CSV,
};

fn csv_profile(id: &str, dir: &std::path::Path, file: &str) -> ReaderProfile {
    ReaderProfile {
        id: id.to_string(),
        enabled: true,
        group: dir.display().to_string(),
        format: FORMAT_FILE_CSV.to_string(),
        params: ReaderParams {
            source: dir.join(file).display().to_string(),
            separator: ',',
        },
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1) Two small CSV sources on disk
    let dir = tempfile::tempdir()?;
    for (file, rows) in [("a.csv", 3), ("b.csv", 2)] {
        let mut f = std::fs::File::create(dir.path().join(file))?;
        for i in 0..rows {
            writeln!(f, "{file},{i},ok")?;
        }
    }

    // 2) Runtime plumbing: bus, log subscriber, shutdown coordinator
    let cfg = Config::default();
    let bus = Bus::new(cfg.bus_capacity);
    let shutdown = ShutdownCoordinator::new();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    Arc::new(SubscriberSet::new(subs, bus.clone())).listen(shutdown.child_token());

    // 3) Reader service over an in-memory profile source
    let profiles = SharedProfiles::new(vec![csv_profile("cdr-a", dir.path(), "a.csv")]);
    let (records_tx, mut records_rx) = tokio::sync::mpsc::channel(64);

    let readers = ReaderService::builder(
        "readers",
        Arc::clone(&profiles) as Arc<dyn ConfigSource>,
        bus.clone(),
        shutdown.clone(),
    )
    .with_sink(records_tx)
    .build();

    // 4) Print ingested records on the side
    tokio::spawn(async move {
        while let Some(record) = records_rx.recv().await {
            println!("[record] source={} fields={:?}", record.source, record.fields);
        }
    });

    readers.start().await?;

    // 5) Add cdr-b while cdr-a keeps running
    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("[demo] add cdr-b");
    profiles.set(vec![
        csv_profile("cdr-a", dir.path(), "a.csv"),
        csv_profile("cdr-b", dir.path(), "b.csv"),
    ]);
    readers.reload().await?;

    // 6) Remove cdr-a; cdr-b is untouched
    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("[demo] remove cdr-a");
    profiles.set(vec![csv_profile("cdr-b", dir.path(), "b.csv")]);
    readers.reload().await?;

    // 7) Shut everything down
    tokio::time::sleep(Duration::from_millis(300)).await;
    readers.stop().await?;
    bus.publish(Event::new(EventKind::ShutdownRequested));
    tokio::time::sleep(Duration::from_millis(50)).await; // let the log drain
    shutdown.trigger();
    shutdown.join_with_grace(cfg.grace).await?;

    println!("[demo] finished: registry drained, loops joined.");
    Ok(())
}
