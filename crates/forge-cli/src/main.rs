use std::sync::Arc;

use forge_adapters::{DefaultPipelineProvider, RecordingSceneHost};
use forge_core::{BuildConfig, BuildEngine};

fn main() {
    // Cargar .env si existe para obtener la configuración MAPFORGE_*
    let _ = dotenvy::dotenv();
    // CLI mínima: `forge-cli build --map <RUTA> [--workers <N>] [--bucket <N>] [--disable <STEP>] [--verbose]`
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "build" {
        let mut config = BuildConfig::from_env();
        let mut i = 2;
        while i < args.len() {
            match args[i].as_str() {
                "--map" => {
                    i += 1;
                    if i < args.len() { config.map_path = Some(args[i].clone()); }
                }
                "--workers" => {
                    i += 1;
                    if i < args.len() {
                        if let Ok(n) = args[i].parse::<usize>() { config.workers = n; }
                    }
                }
                "--bucket" => {
                    i += 1;
                    if i < args.len() {
                        if let Ok(n) = args[i].parse::<usize>() { config.bucket_size = n; }
                    }
                }
                "--disable" => {
                    i += 1;
                    if i < args.len() { config.disabled_steps.push(args[i].clone()); }
                }
                "--verbose" => {
                    config.verbose = true;
                }
                _ => {}
            }
            i += 1;
        }

        if config.map_path.is_none() {
            eprintln!("Uso: forge-cli build --map <RUTA> [--workers <N>] [--bucket <N>] [--disable <STEP>] [--verbose]");
            std::process::exit(2);
        }

        // El toggle verbose sube el filtro del logger; RUST_LOG lo puede
        // refinar por módulo.
        let mut logs = env_logger::Builder::new();
        logs.filter_level(config.log_filter());
        logs.parse_default_env();
        logs.init();

        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => { eprintln!("[forge build] runtime error: {e}"); std::process::exit(5); }
        };
        let host = Arc::new(RecordingSceneHost::new());
        let mut engine = BuildEngine::from_provider(config, &DefaultPipelineProvider, host.clone());
        match runtime.block_on(engine.run()) {
            Ok(report) => {
                println!("build {} completo en {}ms", report.build_id,
                         (report.finished_at - report.started_at).num_milliseconds());
                println!("  nodos ensamblados: {}", report.tree.node_count());
                println!("  attaches al host:  {}", host.attach_count());
                for key in report.context.keys() {
                    println!("  contexto: {key}");
                }
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("[forge build] error: {e}");
                std::process::exit(4);
            }
        }
    } else {
        eprintln!("Uso: forge-cli build --map <RUTA> [--workers <N>] [--bucket <N>] [--disable <STEP>] [--verbose]");
        std::process::exit(2);
    }
}
