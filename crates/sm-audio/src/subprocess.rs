// Classifier adapter backed by an external inference process.
//
// Protocol, one exchange per window:
//   stdin  : u32 LE sample count, then count × f32 LE samples
//   stdout : one text line of scores separated by whitespace or commas,
//            in vocabulary order
//
// The model stays loaded in the child between windows. The child is killed
// and reaped when the classifier is dropped.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use anyhow::{Context, Result};
use sm_core::{ClassificationError, ClassificationWindow, Classifier, LabelScore, Vocabulary};

/// Classifier talking to a long-lived child process over stdin/stdout.
///
/// # Example
/// ```no_run
/// use sm_audio::subprocess::ProcessClassifier;
/// use sm_core::Vocabulary;
/// use std::path::Path;
///
/// let vocab = Vocabulary::load(Path::new("yamnet_class_map.csv")).unwrap();
/// let classifier = ProcessClassifier::spawn("python3", &["yamnet_server.py".into()], vocab).unwrap();
/// ```
pub struct ProcessClassifier {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    vocabulary: Vocabulary,
    bytes: Vec<u8>,
    line: String,
}

impl ProcessClassifier {
    /// Launch the inference process.
    ///
    /// # Errors
    /// Returns an error if the program cannot be started.
    pub fn spawn(program: &str, args: &[String], vocabulary: Vocabulary) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Impossible de lancer le classifieur '{program}'"))?;

        let stdin = child.stdin.take().context("stdin du classifieur indisponible")?;
        let stdout = child.stdout.take().context("stdout du classifieur indisponible")?;
        log::info!(
            "Classifieur externe lancé : {program} (pid {}, {} labels)",
            child.id(),
            vocabulary.len()
        );

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            vocabulary,
            bytes: Vec::new(),
            line: String::new(),
        })
    }

    fn exchange(&mut self, window: &ClassificationWindow) -> Result<Vec<f32>, ClassificationError> {
        encode_window(window.samples(), &mut self.bytes);
        self.stdin
            .write_all(&self.bytes)
            .and_then(|()| self.stdin.flush())
            .map_err(|e| ClassificationError::Failed(format!("écriture stdin : {e}")))?;

        self.line.clear();
        let n = self
            .stdout
            .read_line(&mut self.line)
            .map_err(|e| ClassificationError::Failed(format!("lecture stdout : {e}")))?;
        if n == 0 {
            return Err(ClassificationError::Failed(
                "le classifieur a fermé sa sortie".into(),
            ));
        }
        parse_scores(&self.line)
    }
}

impl Classifier for ProcessClassifier {
    fn classify(
        &mut self,
        window: ClassificationWindow,
    ) -> Result<Vec<LabelScore>, ClassificationError> {
        let scores = self.exchange(&window)?;
        if scores.len() != self.vocabulary.len() {
            return Err(ClassificationError::MalformedOutput {
                expected: self.vocabulary.len(),
                got: scores.len(),
            });
        }
        Ok(self.vocabulary.label_scores(&scores))
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

impl Drop for ProcessClassifier {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        log::debug!("Classifieur externe arrêté");
    }
}

/// Serialize a window as `u32` LE length followed by `f32` LE samples.
fn encode_window(samples: &[f32], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(4 + samples.len() * 4);
    let len = u32::try_from(samples.len()).unwrap_or(u32::MAX);
    out.extend_from_slice(&len.to_le_bytes());
    for s in samples.iter().take(len as usize) {
        out.extend_from_slice(&s.to_le_bytes());
    }
}

/// Parse one line of scores; tolerates surrounding brackets.
fn parse_scores(line: &str) -> Result<Vec<f32>, ClassificationError> {
    line.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f32>()
                .map_err(|_| ClassificationError::Failed(format!("score illisible : {t:?}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_length_prefix_and_samples() {
        let mut out = Vec::new();
        encode_window(&[1.0, -0.5], &mut out);
        assert_eq!(out.len(), 12);
        assert_eq!(&out[..4], &2u32.to_le_bytes());
        assert_eq!(&out[4..8], &1.0f32.to_le_bytes());
        assert_eq!(&out[8..], &(-0.5f32).to_le_bytes());
    }

    #[test]
    fn parses_whitespace_and_commas() {
        assert_eq!(parse_scores("0.1 0.2,0.3\n").unwrap(), vec![0.1, 0.2, 0.3]);
        assert_eq!(parse_scores("[0.5, 0.25]").unwrap(), vec![0.5, 0.25]);
        assert!(parse_scores("").unwrap().is_empty());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_scores("0.1 nope"),
            Err(ClassificationError::Failed(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn round_trip_through_a_shell_child() {
        // Discards the request and answers with fixed scores.
        let script = "while true; do head -c 12 > /dev/null || exit 0; echo '0.9 0.1'; done";
        let vocab = Vocabulary::from_names(["Crowd", "Speech"]).unwrap();
        let mut classifier =
            ProcessClassifier::spawn("sh", &["-c".into(), script.into()], vocab).unwrap();
        let labels = classifier
            .classify(ClassificationWindow::new(vec![0.0, 0.0]))
            .unwrap();
        assert_eq!(labels[0], LabelScore::new("Crowd", 0.9));
        assert_eq!(labels[1], LabelScore::new("Speech", 0.1));
    }

    #[cfg(unix)]
    #[test]
    fn size_mismatch_is_malformed() {
        let script = "while true; do head -c 8 > /dev/null || exit 0; echo '0.9'; done";
        let vocab = Vocabulary::from_names(["Crowd", "Speech"]).unwrap();
        let mut classifier =
            ProcessClassifier::spawn("sh", &["-c".into(), script.into()], vocab).unwrap();
        let err = classifier
            .classify(ClassificationWindow::new(vec![0.0]))
            .unwrap_err();
        assert_eq!(
            err,
            ClassificationError::MalformedOutput {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let vocab = Vocabulary::from_names(["Crowd"]).unwrap();
        assert!(ProcessClassifier::spawn("/nonexistent/classifier-bin", &[], vocab).is_err());
    }
}
