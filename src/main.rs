use lull::cli::Args;
use lull::config::{self, PathConfig, Settings};
use lull::core::cache::GenericCache;
use lull::core::event_bus::SceneTransition;
use lull::core::loader::SceneLoader;
use lull::core::service::{ContentService, FixedClock, SystemClock};
use lull::core::store::JsonSceneStore;
use lull::entities::{Scene, UserPreferences};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

fn init_logging(args: &Args, path_config: &PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file("lull.log", path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

fn print_scene(prefix: &str, scene: &Scene) {
    println!(
        "{prefix}{:<16} {:<10} {:>6.0}s {} {}",
        scene.name,
        scene.kind,
        scene.duration.as_secs_f64(),
        if scene.is_active { " " } else { "x" },
        scene.id
    );
}

fn resolve_scene(service: &ContentService, query: &str) -> Result<Scene> {
    let found = match query.parse::<Uuid>() {
        Ok(id) => service.find_scene(id),
        Err(_) => service.find_scene_by_name(query),
    };
    match found {
        Some(scene) => Ok(scene.clone()),
        None => bail!("No scene matches '{}'", query),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }
    init_logging(&args, &path_config)?;

    let settings = Settings::load_for(&path_config)?;
    let scenes_dir = settings.scenes_dir(&path_config);
    debug!("Scene storage: {}", scenes_dir.display());

    let cache = Arc::new(GenericCache::new(settings.cache_capacity));
    let loader = SceneLoader::spawn(Box::new(JsonSceneStore::new(&scenes_dir)), cache, settings.catalog_name.clone());
    let mut service = match args.hour {
        Some(hour) => ContentService::new(loader).with_clock(FixedClock(hour)),
        None => ContentService::new(loader).with_clock(SystemClock),
    };

    service.events().subscribe::<SceneTransition, _>(|t| {
        info!("transition {:?} -> {:?} ({:?})", t.previous, t.current, t.state);
    });

    if args.migrate {
        let count = service.migrate().context("Migration failed")?;
        println!("Migrated {} scenes", count);
    }

    service.load_scenes().context("Cannot load scene catalog")?;

    if args.backup {
        match service.backup() {
            Some(path) => println!("Backup written to {}", path.display()),
            None => println!("Nothing backed up"),
        }
    }

    if args.list || args.no_action() {
        for scene in service.available_scenes() {
            print_scene("  ", scene);
        }
    }

    if let Some(query) = &args.play {
        let scene = resolve_scene(&service, query)?;
        service.start_scene(&scene)?;
        if let Some(current) = service.current_scene() {
            print_scene("> ", current);
        }
    }

    if args.recommend {
        let prefs = UserPreferences::from_ids(args.prefer.iter().copied());
        match service.recommend_next_scene(&prefs) {
            Some(scene) => print_scene("next ", scene),
            None => println!("No scene to recommend"),
        }
    }

    if args.schedule {
        match service.schedule_scene_for_current_time() {
            Some(scene) => print_scene("now ", scene),
            None => println!("No scene scheduled for this hour"),
        }
    }

    if args.status {
        println!("{}", serde_json::to_string_pretty(&service.snapshot())?);
    }

    Ok(())
}
