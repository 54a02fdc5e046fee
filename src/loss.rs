use ndarray::{Array2, ArrayView2};

/// Mean squared error over all elements of the batch.
pub fn mse(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
    (&y_pred - &y)
        .mapv(|x| x.powi(2))
        .mean()
        .unwrap_or_default()
}

/// Loss gradient with respect to the predictions: `(y_pred - y) / batch`.
pub fn mse_gradient(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
    (&y_pred - &y) / y_pred.nrows() as f32
}
