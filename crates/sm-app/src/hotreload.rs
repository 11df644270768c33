use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use sm_core::config::MonitorConfig;

/// Apply the command-line overrides on top of a loaded config.
///
/// `--threshold` pins the sensitivity for the whole run: it wins over the
/// file at startup and on every reload.
#[must_use]
pub fn with_overrides(mut config: MonitorConfig, threshold: Option<f32>) -> MonitorConfig {
    if let Some(t) = threshold {
        config.threshold = t.clamp(0.0, 120.0);
    }
    config
}

/// Recharge le fichier config et publie le résultat dans l'ArcSwap.
///
/// On error the previous config stays in place.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn reload_config(
    path: &Path,
    config: &ArcSwap<MonitorConfig>,
    threshold_override: Option<f32>,
) -> Result<()> {
    let new_config = with_overrides(sm_core::config::load_config(path)?, threshold_override);
    log::info!(
        "Config rechargée depuis {} (seuil {:.0})",
        path.display(),
        new_config.threshold
    );
    config.store(Arc::new(new_config));
    Ok(())
}

/// Lance un watcher qui surveille le fichier config et met à jour l'ArcSwap.
///
/// Only the sensitivity threshold is picked up live by the monitor; other
/// fields apply at the next start.
///
/// Retourne le Watcher (doit rester vivant tant que l'app tourne).
///
/// # Errors
/// Returns an error if the watcher cannot be created or the path cannot be watched.
pub fn spawn_config_watcher(
    config_path: &Path,
    config: &Arc<ArcSwap<MonitorConfig>>,
    threshold_override: Option<f32>,
) -> Result<impl Watcher + use<>> {
    let config = Arc::clone(config);
    let path = config_path.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let Ok(event) = res else { return };
        if !matches!(event.kind, EventKind::Modify(_)) {
            return;
        }
        if let Err(e) = reload_config(&path, &config, threshold_override) {
            log::warn!("Erreur de rechargement config : {e}");
            // On garde l'ancienne config. Pas de panic.
        }
    })?;

    watcher.watch(config_path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
