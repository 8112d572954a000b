//! Column-wise min-max scaling to [0, 1].

use crate::domain::errors::ForecastError;
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Per-column min/max bounds fit on one request's data.
///
/// Columns with zero range keep a unit range, so a constant column maps to 0 and
/// inverts back exactly.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    min: Array1<f64>,
    range: Array1<f64>,
}

impl MinMaxScaler {
    /// Fit bounds over `data` (rows are observations, columns are features).
    pub fn fit(data: ArrayView2<'_, f64>) -> Result<Self, ForecastError> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(ForecastError::Validation(
                "cannot fit a scaler on an empty series".to_string(),
            ));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Validation(
                "series contains non-finite values".to_string(),
            ));
        }

        let min = data.fold_axis(Axis(0), f64::INFINITY, |&acc, &v| acc.min(v));
        let max = data.fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v));
        let range = (&max - &min).mapv(|r| if r == 0.0 { 1.0 } else { r });

        Ok(Self { min, range })
    }

    /// Fit on a single series treated as one column.
    pub fn fit_series(series: &[f64]) -> Result<Self, ForecastError> {
        let column = Array2::from_shape_vec((series.len(), 1), series.to_vec())
            .map_err(|e| ForecastError::Internal(e.to_string()))?;
        Self::fit(column.view())
    }

    pub fn n_features(&self) -> usize {
        self.min.len()
    }

    pub fn transform(&self, data: ArrayView2<'_, f64>) -> Array2<f64> {
        (&data - &self.min) / &self.range
    }

    pub fn transform_value(&self, column: usize, value: f64) -> f64 {
        (value - self.min[column]) / self.range[column]
    }

    pub fn inverse_value(&self, column: usize, scaled: f64) -> f64 {
        scaled * self.range[column] + self.min[column]
    }

    pub fn transform_series(&self, series: &[f64]) -> Vec<f64> {
        series.iter().map(|&v| self.transform_value(0, v)).collect()
    }

    pub fn inverse_series(&self, scaled: &[f64]) -> Vec<f64> {
        scaled.iter().map(|&v| self.inverse_value(0, v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_series_round_trip() {
        let series = vec![101.5, 99.2, 130.0, 87.25, 112.0];
        let scaler = MinMaxScaler::fit_series(&series).unwrap();

        let scaled = scaler.transform_series(&series);
        assert!(scaled.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((scaled[3] - 0.0).abs() < 1e-12);
        assert!((scaled[2] - 1.0).abs() < 1e-12);

        let restored = scaler.inverse_series(&scaled);
        for (a, b) in series.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let data = array![[0.5, 1.0], [-0.5, 1.0], [0.0, 1.0]];
        let scaler = MinMaxScaler::fit(data.view()).unwrap();
        let scaled = scaler.transform(data.view());

        assert_eq!(scaled.column(1).to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(scaled.column(0).to_vec(), vec![1.0, 0.0, 0.5]);
        assert_eq!(scaler.inverse_value(1, 0.0), 1.0);
    }

    #[test]
    fn test_empty_series_rejected() {
        assert!(MinMaxScaler::fit_series(&[]).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(MinMaxScaler::fit_series(&[1.0, f64::NAN]).is_err());
    }
}
