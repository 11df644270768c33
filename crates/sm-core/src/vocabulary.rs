use std::path::Path;

use anyhow::{Context, Result};

use crate::error::CoreError;
use crate::frame::LabelScore;

/// Ordered label names matching the classifier output positions.
///
/// Malformed entries are kept as empty holes so that index `i` always lines
/// up with score `i`; holes are skipped when pairing scores with labels.
///
/// # Example
/// ```
/// use sm_core::vocabulary::Vocabulary;
/// let csv = "index,mid,display_name\n0,/m/09x0r,Speech\n1,/m/03qtwd,Crowd\n";
/// let vocab = Vocabulary::from_class_map_csv(csv).unwrap();
/// assert_eq!(vocab.len(), 2);
/// assert_eq!(vocab.name(1), Some("Crowd"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    names: Vec<String>,
}

impl Vocabulary {
    /// Build from names already in output order.
    ///
    /// # Errors
    /// Returns `CoreError::EmptyVocabulary` if no usable name remains.
    pub fn from_names<I, S>(names: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .collect();
        if names.iter().all(String::is_empty) {
            return Err(CoreError::EmptyVocabulary);
        }
        Ok(Self { names })
    }

    /// Parse a class-map CSV: a header line, then `index,mid,display_name` rows.
    ///
    /// Display names may be double-quoted and contain commas.
    ///
    /// # Errors
    /// Returns `CoreError::EmptyVocabulary` if no row carries a usable name.
    pub fn from_class_map_csv(text: &str) -> Result<Self, CoreError> {
        let names = text
            .lines()
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .map(|line| split_csv_fields(line).into_iter().nth(2).unwrap_or_default());
        let vocab = Self::from_names(names)?;
        let holes = vocab.names.iter().filter(|n| n.is_empty()).count();
        if holes > 0 {
            log::warn!("Vocabulaire : {holes} entrées illisibles ignorées");
        }
        Ok(vocab)
    }

    /// Load a class-map CSV from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or holds no usable label.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::VocabularyLoad(e.to_string()))
            .with_context(|| format!("Impossible de lire {}", path.display()))?;
        let vocab = Self::from_class_map_csv(&text)
            .with_context(|| format!("Vocabulaire invalide dans {}", path.display()))?;
        log::info!("Vocabulaire chargé : {} labels depuis {}", vocab.len(), path.display());
        Ok(vocab)
    }

    /// Number of output positions, holes included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// `true` if the vocabulary has no position at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name at output position `index`, `None` for holes and out-of-range.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names
            .get(index)
            .map(String::as_str)
            .filter(|n| !n.is_empty())
    }

    /// Pair a score vector with the labels, skipping holes.
    #[must_use]
    pub fn label_scores(&self, scores: &[f32]) -> Vec<LabelScore> {
        self.names
            .iter()
            .zip(scores)
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, &score)| LabelScore::new(name.clone(), score))
            .collect()
    }
}

/// Split one CSV line, honouring double quotes and `""` escapes.
fn split_csv_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
