use ndarray::Array2;

/// Installs `env_logger` once so `RUST_LOG=norlys_secs=trace cargo test` shows the engine logs.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Helper function for approximate comparison of a matrix against nested vectors
pub fn assert_matrix_approx_eq(result: &Array2<f64>, expected: &[Vec<f64>], tolerance: f64) {
    assert_eq!(result.nrows(), expected.len(), "Number of rows mismatch");
    for (i, row) in expected.iter().enumerate() {
        assert_eq!(
            result.ncols(),
            row.len(),
            "Number of columns mismatch in row {}",
            i
        );
        for (j, &value) in row.iter().enumerate() {
            let diff = (result[[i, j]] - value).abs();

            assert!(
                diff < tolerance,
                "Mismatch at [{}][{}]: result = {:.6}, expected = {:.6}, diff = {:.6}",
                i,
                j,
                result[[i, j]],
                value,
                diff
            );
        }
    }
}
