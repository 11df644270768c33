use std::path::PathBuf;

use clap::Parser;

/// soundmon — Live sound monitor with crowd-noise alerting.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Programme d'inférence externe (lit les fenêtres sur stdin, écrit les scores sur stdout).
    #[arg(long)]
    pub classifier_cmd: String,

    /// Argument passé au programme d'inférence (répétable).
    #[arg(long = "classifier-arg", allow_hyphen_values = true)]
    pub classifier_args: Vec<String>,

    /// Class map CSV (index,mid,display_name) aligned with the classifier output.
    #[arg(long)]
    pub vocabulary: PathBuf,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Charger un preset nommé (ignore --config).
    #[arg(long)]
    pub preset: Option<String>,

    /// Seuil de sensibilité initial (0–120).
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Émettre chaque snapshot en JSON (une ligne par rapport).
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Période d'affichage en millisecondes.
    #[arg(long, default_value_t = 1000)]
    pub report_interval_ms: u64,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Validate numeric arguments.
    ///
    /// # Errors
    /// Returns an error if the threshold or report interval is out of range.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(t) = self.threshold {
            if !(0.0..=120.0).contains(&t) {
                anyhow::bail!("--threshold doit être entre 0 et 120 (reçu {t})");
            }
        }
        if self.report_interval_ms == 0 {
            anyhow::bail!("--report-interval-ms doit être > 0");
        }
        Ok(())
    }
}
