use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use clap::Parser;
use sm_audio::capture::AudioCapture;
use sm_audio::subprocess::ProcessClassifier;
use sm_core::{MonitorConfig, Vocabulary};

pub mod cli;
pub mod hotreload;
pub mod report;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    cli.validate()?;

    // 3. Charger la config
    let (config, config_path) = resolve_config(&cli)?;
    let config = hotreload::with_overrides(config, cli.threshold);
    let sample_rate = config.sample_rate;
    let config = Arc::new(ArcSwap::from_pointee(config));

    // 4. Hot-reload config (thread interne notify)
    let _watcher = config_path.as_deref().and_then(|path| {
        hotreload::spawn_config_watcher(path, &config, cli.threshold)
            .map_err(|e| log::warn!("Hot-reload indisponible : {e}"))
            .ok()
    });

    // 5. Collaborateurs externes : vocabulaire, classifieur, capture
    let vocabulary = Vocabulary::load(&cli.vocabulary)?;
    let classifier =
        ProcessClassifier::spawn(&cli.classifier_cmd, &cli.classifier_args, vocabulary)?;
    let (capture, reader) =
        AudioCapture::start_default(sample_rate).context("Démarrage de la capture impossible")?;
    log::info!("Capture active @ {} Hz", capture.sample_rate());

    // 6. Arrêt propre sur Ctrl-C
    let (stop_tx, stop_rx) = flume::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .context("Impossible d'installer le handler Ctrl-C")?;

    // 7. Démarrer le moniteur
    let mut handle = sm_audio::spawn_monitor(reader, classifier, Arc::clone(&config))?;

    // 8. Boucle de rapport
    let interval = Duration::from_millis(cli.report_interval_ms);
    loop {
        match stop_rx.recv_timeout(interval) {
            Err(flume::RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => break,
        }
        if !handle.is_running() {
            log::error!("Le moniteur s'est arrêté de lui-même");
            break;
        }

        for event in handle.events().try_iter() {
            report::log_event(&event);
        }
        let snap = handle.snapshot();
        if cli.json {
            match report::render_json(snap) {
                Ok(line) => println!("{line}"),
                Err(e) => log::warn!("Sérialisation JSON impossible : {e}"),
            }
        } else {
            print!("{}", report::render_text(snap));
        }
    }

    // 9. Arrêt : moniteur d'abord, capture ensuite
    handle.stop();
    drop(capture);
    log::info!("soundmon terminé");
    Ok(())
}

/// Resolve config: preset takes priority over --config.
///
/// Returns the config and the file to watch for hot-reload, if any.
fn resolve_config(cli: &cli::Cli) -> Result<(MonitorConfig, Option<PathBuf>)> {
    if let Some(ref name) = cli.preset {
        let path = PathBuf::from(format!("config/presets/{name}.toml"));
        if path.exists() {
            let config = sm_core::config::load_config(&path)?;
            Ok((config, Some(path)))
        } else {
            anyhow::bail!("Preset inconnu : {name}. Voir config/presets/ (ex: default, minimal)");
        }
    } else if cli.config.exists() {
        let config = sm_core::config::load_config(&cli.config)?;
        Ok((config, Some(cli.config.clone())))
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok((MonitorConfig::default(), None))
    }
}
