use std::env;
use std::path::PathBuf;

use engine::{
    compile_def_database, resolve_app_paths, AppError, DefDatabase, LoopConfig, ScriptedInput,
    WorldDef, ROOT_ENV_VAR,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, GameplayScene};

const SEED_ENV_VAR: &str = "TILEBOUND_SEED";
const MAX_TICKS_ENV_VAR: &str = "TILEBOUND_MAX_TICKS";
const INPUT_SCRIPT_ENV_VAR: &str = "TILEBOUND_INPUT_SCRIPT";
const SNAPSHOT_PATH_ENV_VAR: &str = "TILEBOUND_SNAPSHOT_PATH";
const DEFAULT_SEED: u64 = 0x7113_B0D5;
const DEMO_INPUT_SCRIPT: &str = include_str!("../../../../assets/base/demo_input.json");

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: GameplayScene,
    pub(crate) input: ScriptedInput,
    pub(crate) snapshot_path: Option<PathBuf>,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Tilebound Startup ===");

    let (defs, world) = load_content()?;
    let atlas = world.build_atlas()?;
    let seed = env_u64(SEED_ENV_VAR).unwrap_or(DEFAULT_SEED);
    let input = load_input_script()?;
    let config = LoopConfig {
        max_ticks: env_u64(MAX_TICKS_ENV_VAR),
        ..LoopConfig::default()
    };
    info!(
        seed,
        script_ticks = input.total_ticks(),
        max_ticks = ?config.max_ticks,
        maps = atlas.map_ids().count(),
        hostile_defs = defs.hostiles().len(),
        item_defs = defs.items().len(),
        "startup_config"
    );

    Ok(AppWiring {
        config,
        scene: gameplay::build_scene(defs, atlas, seed),
        input,
        snapshot_path: env::var_os(SNAPSHOT_PATH_ENV_VAR).map(PathBuf::from),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Content from the project root when one is found, otherwise the copies built into the binary.
/// An explicitly configured root that is invalid is an error.
fn load_content() -> Result<(DefDatabase, WorldDef), AppError> {
    match resolve_app_paths() {
        Ok(paths) => {
            info!(root = %paths.root.display(), "content_root_resolved");
            let defs = compile_def_database(&paths)?;
            let world = WorldDef::load(&paths.world_file())?;
            Ok((defs, world))
        }
        Err(err) if env::var_os(ROOT_ENV_VAR).is_some() => Err(err.into()),
        Err(err) => {
            warn!(error = %err, "content_root_missing_using_builtin");
            Ok((DefDatabase::builtin()?, WorldDef::builtin()?))
        }
    }
}

fn load_input_script() -> Result<ScriptedInput, AppError> {
    match env::var_os(INPUT_SCRIPT_ENV_VAR) {
        Some(path) => {
            let path = PathBuf::from(path);
            info!(path = %path.display(), "input_script_selected");
            Ok(ScriptedInput::load(&path)?)
        }
        None => Ok(ScriptedInput::from_json_str(DEMO_INPUT_SCRIPT)?),
    }
}

fn env_u64(var: &'static str) -> Option<u64> {
    let raw = env::var(var).ok()?;
    parse_u64_setting(var, &raw)
}

/// Malformed values are logged and ignored so the default applies.
fn parse_u64_setting(var: &'static str, raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(var, value = raw, error = %err, "env_setting_ignored");
            None
        }
    }
}
