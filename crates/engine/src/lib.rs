use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;
pub mod world;

pub use app::{
    run_app, run_app_with_metrics, AppError, EntityId, EntityIdAllocator, InputAction,
    InputScriptError, InputSnapshot, InputSource, InputStep, LoopConfig, LoopMetricsSnapshot,
    LoopOutcome, MetricsHandle, Scene, SceneCommand, ScriptedInput, Vec2,
};
pub use content::{
    compile_def_database, compile_def_database_from_str, write_text_atomic, ContentCompileError,
    ContentErrorCode, DefDatabase, DefId, HostileArchetype, ItemDef, ItemKind, PlayerDef,
    SourceLocation,
};
pub use world::{
    MapAtlas, MapDef, MapId, MapTransitionManager, NpcPlacement, Portal, PortalDef, PortalTable,
    RegionDef, SpawnerDef, TerrainKind, TerrainProps, TileCoord, TileInfo, TileMap, TilemapError,
    TransitionArrival, TransitionState, WorldDef, WorldLoadError, DEFAULT_TRANSITION_SECONDS,
};

pub const ROOT_ENV_VAR: &str = "TILEBOUND_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub content_dir: PathBuf,
}

impl AppPaths {
    pub fn world_file(&self) -> PathBuf {
        self.content_dir.join("world.json")
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "TILEBOUND_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and assets/base/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and assets/base/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/tilebound\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let content_dir = root.join("assets").join("base");
    Ok(AppPaths { root, content_dir })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_content = path.join("assets").join("base").is_dir();

    cargo_toml && has_content
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let cwd = env::current_dir().expect("cwd");
        assert!(!is_repo_marker(&cwd.join("definitely_not_a_marker")));
    }

    #[test]
    fn repo_marker_requires_base_content_dir() {
        let temp = TempDir::new().expect("temp");
        fs::write(temp.path().join("Cargo.toml"), "[workspace]").expect("write");
        assert!(!is_repo_marker(temp.path()));

        fs::create_dir_all(temp.path().join("assets").join("base")).expect("mkdir");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn world_file_lives_in_content_dir() {
        let paths = AppPaths {
            root: PathBuf::from("root"),
            content_dir: PathBuf::from("root").join("assets").join("base"),
        };
        assert!(paths.world_file().ends_with(Path::new("base").join("world.json")));
    }
}
