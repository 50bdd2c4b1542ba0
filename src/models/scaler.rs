use serde::{Deserialize, Serialize};
use stats::population_std;

use super::{ModelError, check_matrix};

/// Per-column standardization `(x - mean) / scale` over a row-major matrix.
///
/// `scale` is the population standard deviation; columns without variance keep
/// a scale of 1 and standardize to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: &[f64], n_features: usize) -> Result<Self, ModelError> {
        let n_rows = check_matrix(x, n_features)?;

        let mut mean = vec![0.0; n_features];
        let mut scale = vec![1.0; n_features];
        let mut column = Vec::with_capacity(n_rows);

        for j in 0..n_features {
            column.clear();
            column.extend(x.iter().skip(j).step_by(n_features));
            let m = column.iter().sum::<f64>() / n_rows as f64;
            let sd = population_std(&column, m);
            mean[j] = m;
            if sd > 0.0 && sd.is_finite() {
                scale[j] = sd;
            }
        }

        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        self.check_width(x)?;
        Ok(x.iter()
            .enumerate()
            .map(|(i, &v)| {
                let j = i % self.n_features();
                (v - self.mean[j]) / self.scale[j]
            })
            .collect())
    }

    pub fn inverse_transform(&self, z: &[f64]) -> Result<Vec<f64>, ModelError> {
        self.check_width(z)?;
        Ok(z.iter()
            .enumerate()
            .map(|(i, &v)| {
                let j = i % self.n_features();
                v * self.scale[j] + self.mean[j]
            })
            .collect())
    }

    pub fn fit_transform(x: &[f64], n_features: usize) -> Result<(Self, Vec<f64>), ModelError> {
        let scaler = Self::fit(x, n_features)?;
        let z = scaler.transform(x)?;
        Ok((scaler, z))
    }

    fn check_width(&self, x: &[f64]) -> Result<(), ModelError> {
        let n = self.n_features();
        if n == 0 || x.len() % n != 0 {
            return Err(ModelError::FeatureCount {
                features: x.len(),
                expected: n,
            });
        }
        Ok(())
    }
}
