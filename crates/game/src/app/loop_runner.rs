use std::io;
use std::path::Path;
use std::process::ExitCode;

use engine::{run_app_with_metrics, write_text_atomic, MetricsHandle};
use tracing::{error, info};

use super::bootstrap::AppWiring;
use super::gameplay::SceneSnapshot;

pub(crate) fn run(mut app: AppWiring) -> ExitCode {
    let metrics = MetricsHandle::default();
    let outcome = run_app_with_metrics(app.config, &mut app.scene, &mut app.input, metrics.clone());
    let final_metrics = metrics.snapshot();
    info!(
        outcome = ?outcome,
        ticks = outcome.ticks(),
        tps = final_metrics.tps,
        tick_time_ms = final_metrics.tick_time_ms,
        "run_finished"
    );

    let Some(path) = app.snapshot_path.as_deref() else {
        return ExitCode::SUCCESS;
    };
    if let Err(err) = write_snapshot(&app.scene.snapshot(), path) {
        error!(error = %err, path = %path.display(), "snapshot_write_failed");
        return ExitCode::FAILURE;
    }
    info!(path = %path.display(), "snapshot_written");
    ExitCode::SUCCESS
}

fn write_snapshot(snapshot: &SceneSnapshot, path: &Path) -> io::Result<()> {
    let json = snapshot.to_json_pretty()?;
    write_text_atomic(path, &json)
}

#[cfg(test)]
mod tests {
    use engine::{DefDatabase, WorldDef};
    use tempfile::TempDir;

    use super::*;
    use crate::app::gameplay;

    #[test]
    fn snapshot_is_written_as_json() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("out").join("snapshot.json");
        let atlas = WorldDef::builtin()
            .expect("world")
            .build_atlas()
            .expect("atlas");
        let scene = gameplay::build_scene(DefDatabase::builtin().expect("defs"), atlas, 1);

        write_snapshot(&scene.snapshot(), &path).expect("write");

        let raw = std::fs::read_to_string(&path).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["active_map"], "meadow");
        assert_eq!(value["tick"], 0);
    }
}
