//! Load meshes through a decode worker and print a JSON summary of each.
//!
//! Run: `cargo run -p segmesh --features tools --bin inspect_mesh -- <url>...`
//!
//! URLs may be `http(s)://`, `file://` or plain filesystem paths. Exits with
//! a non-zero status if any mesh fails to load.

use std::process::ExitCode;

use segmesh::{DecodedMesh, LoadTracker, MeshType, WorkerConfig, WorkerHandle};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        eprintln!("usage: inspect_mesh <url>...");
        return Ok(ExitCode::FAILURE);
    }

    let config = WorkerConfig {
        workers: urls.len().min(4),
        ..WorkerConfig::default()
    };
    let workers = WorkerHandle::spawn(&config)?;

    let tracker = LoadTracker::new();
    tracker.subscribe(|new, old| tracing::debug!("Load state {old:?} -> {new:?}"));

    let mut failures = 0;
    for url in &urls {
        match tracker
            .track(workers.load_by_url(url, MeshType::NgPrecomp))
            .await
        {
            Some(Ok(mesh)) => println!("{}", serde_json::to_string_pretty(&summary(url, &mesh))?),
            Some(Err(e)) => {
                eprintln!("{url}: {e}");
                failures += 1;
            }
            None => {
                eprintln!("{url}: another load is in progress");
                failures += 1;
            }
        }
    }

    workers.shutdown();
    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn summary(url: &str, mesh: &DecodedMesh) -> serde_json::Value {
    let bounds = mesh.bounds().map(|(min, max)| {
        serde_json::json!({
            "min": [min.x, min.y, min.z],
            "max": [max.x, max.y, max.z],
        })
    });
    serde_json::json!({
        "url": url,
        "vertex_count": mesh.num_vertices,
        "triangle_count": mesh.triangle_count(),
        "bounds": bounds,
        "color": mesh.color.get(0..3),
    })
}
