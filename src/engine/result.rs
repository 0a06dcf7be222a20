use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Output of a completed run.
///
/// Every vector is in evaluation order. `points`/`values` start with the
/// initial design; `guesses`/`guess_values`/`inference_values` start with
/// one entry per initial point; the timing vectors hold one entry per
/// iteration.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoResult {
    /// Incumbent (posterior-mean maximizer) after each iteration.
    pub guesses: Vec<Vec<f64>>,
    /// Posterior mean at each incumbent, in objective units.
    pub guess_values: Vec<f64>,
    /// Every evaluated point.
    pub points: Vec<Vec<f64>>,
    /// Raw objective value at every evaluated point.
    pub values: Vec<f64>,
    /// Time spent choosing and fitting per iteration.
    pub choose_time: Vec<Duration>,
    /// Time spent computing the incumbent per iteration.
    pub extra_time: Vec<Duration>,
    /// Inference objective at each incumbent.
    pub inference_values: Vec<f64>,
}

impl BoResult {
    /// The final incumbent and its inference value.
    #[must_use]
    pub fn final_guess(&self) -> Option<(&[f64], f64)> {
        let x = self.guesses.last()?;
        let v = self.inference_values.last()?;
        Some((x.as_slice(), *v))
    }

    /// The best evaluated point and its value.
    #[must_use]
    pub fn best_observed(&self) -> Option<(&[f64], f64)> {
        self.points
            .iter()
            .zip(&self.values)
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(core::cmp::Ordering::Equal))
            .map(|(x, v)| (x.as_slice(), *v))
    }

    /// Number of completed iterations.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.choose_time.len()
    }
}

/// Current snapshot schema version.
#[cfg(feature = "serde")]
const SNAPSHOT_VERSION: u32 = 1;

/// A versioned on-disk snapshot of a [`BoResult`].
///
/// # Schema versioning
///
/// The `version` field enables future schema evolution without breaking
/// existing files. The current version is `1`.
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
pub struct ResultSnapshot {
    /// Schema version.
    pub version: u32,
    /// Dimensionality of the stored points.
    pub dim: usize,
    /// The stored result.
    pub result: BoResult,
}

#[cfg(feature = "serde")]
impl BoResult {
    /// Saves the result as JSON.
    ///
    /// The file is written to a temporary sibling first and renamed into
    /// place.
    ///
    /// # Errors
    ///
    /// [`Error::Io`](crate::Error::Io) or [`Error::Serde`](crate::Error::Serde).
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let path = path.as_ref();
        let snapshot = ResultSnapshot {
            version: SNAPSHOT_VERSION,
            dim: self.points.first().map_or(0, Vec::len),
            result: self.clone(),
        };
        let parent = path.parent().unwrap_or(std::path::Path::new("."));
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));
        let file = std::fs::File::create(&tmp_path)?;
        serde_json::to_writer_pretty(file, &snapshot)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Loads a result saved with [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// [`Error::Io`](crate::Error::Io), [`Error::Serde`](crate::Error::Serde),
    /// or [`Error::InvalidConfig`](crate::Error::InvalidConfig) for an
    /// unsupported schema version.
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let file = std::fs::File::open(path)?;
        let snapshot: ResultSnapshot = serde_json::from_reader(std::io::BufReader::new(file))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(crate::Error::InvalidConfig(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BoResult {
        BoResult {
            guesses: vec![vec![0.1], vec![0.4]],
            guess_values: vec![0.5, 0.9],
            points: vec![vec![0.1], vec![0.7]],
            values: vec![0.5, 1.5],
            choose_time: vec![Duration::from_millis(3)],
            extra_time: vec![Duration::from_millis(1)],
            inference_values: vec![0.5, 0.8],
        }
    }

    #[test]
    fn accessors() {
        let r = sample();
        assert_eq!(r.iterations(), 1);
        assert_eq!(r.final_guess(), Some((&[0.4][..], 0.8)));
        assert_eq!(r.best_observed(), Some((&[0.7][..], 1.5)));
        assert_eq!(BoResult::default().final_guess(), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn save_load_preserves_result() {
        let dir = std::env::temp_dir().join(format!("bayesopt-result-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("run.json");
        let r = sample();
        r.save(&path).unwrap();
        assert_eq!(BoResult::load(&path).unwrap(), r);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
