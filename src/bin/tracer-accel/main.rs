//! tracer-accel CLI - build acceleration structures over procedural scenes.

use anyhow::{bail, Context};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tracer_accel::prelude::*;

/// Environment variable overriding the `-v/-q` log level.
const LOG_ENV: &str = "TRACER_ACCEL_LOG";

struct Options {
    settings: AccelSettings,
    triangles: usize,
    seed: u64,
    save_config: Option<PathBuf>,
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered_args.push(arg),
        }
    }
    init_tracing(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "build" | "b" => parse_options(&filtered_args[1..]).and_then(|o| cmd_build(&o)),
        "stats" | "s" => parse_options(&filtered_args[1..]).and_then(|o| cmd_stats(&o)),
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_help() {
    println!("tracer-accel - acceleration structure builder");
    println!();
    println!("USAGE:");
    println!("    tracer-accel [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    b, build    Build one structure and print its buffers");
    println!("    s, stats    Build every structure/heuristic pair and compare");
    println!("    h, help     Show this help");
    println!();
    println!("BUILD OPTIONS:");
    println!("    --config <file>         Load settings from JSON");
    println!("    --structure <kind>      bvh | kd | none");
    println!("    --heuristic <name>      primitive | sah");
    println!("    --max-depth <n>         Depth cap override (1-64)");
    println!("    --triangles <n>         Scattered triangles to generate (default 10000)");
    println!("    --seed <n>              Random seed (default 1)");
    println!("    --save-config <file>    Write the effective settings as JSON");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose   Debug output");
    println!("    -vv, --trace    Trace output");
    println!("    -q, --quiet     Errors only");
    println!();
    println!("ENVIRONMENT:");
    println!("    {}  tracing filter, overrides -v/-q (e.g. tracer_accel=debug)", LOG_ENV);
}

fn parse_options(args: &[&str]) -> anyhow::Result<Options> {
    let mut opts = Options {
        settings: AccelSettings::default(),
        triangles: 10_000,
        seed: 1,
        save_config: None,
    };

    // --config first, so explicit flags override the file.
    if let Some(i) = args.iter().position(|&a| a == "--config") {
        let path = args.get(i + 1).context("--config needs a file")?;
        opts.settings = AccelSettings::load(path)
            .with_context(|| format!("loading settings from {}", path))?;
    }

    let mut i = 0;
    while i < args.len() {
        let flag = args[i];
        let value = || args.get(i + 1).copied().with_context(|| format!("{} needs a value", flag));
        match flag {
            "--config" => {}
            "--structure" => {
                opts.settings.structure = match value()? {
                    "bvh" => AccelKind::Bvh,
                    "kd" | "kd_tree" | "kdtree" => AccelKind::KdTree,
                    "none" => AccelKind::None,
                    other => bail!("unknown structure: {}", other),
                }
            }
            "--heuristic" => {
                opts.settings.heuristic = match value()? {
                    "primitive" | "median" => Heuristic::Primitive,
                    "sah" => Heuristic::Sah,
                    other => bail!("unknown heuristic: {}", other),
                }
            }
            "--max-depth" => opts.settings.max_depth = Some(value()?.parse().context("--max-depth")?),
            "--triangles" => opts.triangles = value()?.parse().context("--triangles")?,
            "--seed" => opts.seed = value()?.parse().context("--seed")?,
            "--save-config" => opts.save_config = Some(PathBuf::from(value()?)),
            other => bail!("unknown option: {}", other),
        }
        i += 2;
    }

    opts.settings.validate()?;
    Ok(opts)
}

fn scene(opts: &Options) -> Scene {
    tracing::debug!(triangles = opts.triangles, seed = opts.seed, "generating scene");
    Scene::with_meshes(vec![procedural::scatter(opts.triangles, 100.0, 0.5, opts.seed)])
}

fn cmd_build(opts: &Options) -> anyhow::Result<()> {
    if let Some(path) = &opts.save_config {
        opts.settings
            .save(path)
            .with_context(|| format!("saving settings to {}", path.display()))?;
        tracing::info!("saved settings to {}", path.display());
    }

    let mut scene = scene(opts);
    let loaded = scene.build(&opts.settings)?;
    let packed = loaded.packed();
    let bounds = loaded.bounds();

    println!(
        "Structure: {} ({})",
        opts.settings.structure.label(),
        opts.settings.heuristic.label()
    );
    println!("Triangles: {}", loaded.geometry().triangle_count());
    println!("Bounds:    {:?} - {:?}", bounds.min, bounds.max);
    println!(
        "Nodes:     {} x {} bytes = {} bytes",
        packed.nodes.len(),
        packed.node_stride(),
        packed.nodes_bytes().len()
    );
    println!(
        "Indices:   {} ({} bytes)",
        packed.index_count,
        packed.indices_bytes().len()
    );
    println!(
        "Vertices:  {} ({} bytes)",
        loaded.geometry().vertices().len(),
        loaded.geometry().vertices_bytes().len()
    );
    if let Some(accel) = loaded.accel() {
        print_stats(accel.stats());
    }
    Ok(())
}

fn print_stats(stats: &BuildStats) {
    println!("Leaves:    {}", stats.leaf_count);
    println!("Depth:     {} ({} leaves at cap)", stats.max_depth, stats.depth_capped_leaves);
    println!("Degenerate splits: {}", stats.degenerate_splits);
    println!("Duplicated triangles: {}", stats.duplicated_triangles);
    println!("Build time: {:.2?}", stats.build_time);
}

fn cmd_stats(opts: &Options) -> anyhow::Result<()> {
    let mut scene = scene(opts);

    println!(
        "{:<8} {:<10} {:>8} {:>8} {:>6} {:>10} {:>6} {:>12}",
        "accel", "heuristic", "nodes", "leaves", "depth", "indices", "dups", "time"
    );
    for structure in [AccelKind::Bvh, AccelKind::KdTree] {
        for heuristic in [Heuristic::Primitive, Heuristic::Sah] {
            let settings = AccelSettings {
                structure,
                heuristic,
                ..opts.settings.clone()
            };
            let loaded = scene.build(&settings)?;
            let Some(accel) = loaded.accel() else {
                continue;
            };
            let s = accel.stats();
            println!(
                "{:<8} {:<10} {:>8} {:>8} {:>6} {:>10} {:>6} {:>12}",
                structure.label(),
                heuristic.label(),
                s.node_count,
                s.leaf_count,
                s.max_depth,
                s.index_count,
                s.duplicated_triangles,
                format!("{:.2?}", s.build_time)
            );
        }
    }
    Ok(())
}
