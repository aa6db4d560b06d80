//! Output column naming.

/// Render a float parameter for a column name.
///
/// Whole numbers keep one decimal (`1.0`, `0.0`); everything else uses the
/// shortest round-trip representation (`0.5`, `0.1`, `0.25`).
pub fn format_param(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// `<pred_name>_neutralized_<proportion>`
pub fn neutralized_column(pred_name: &str, proportion: f64) -> String {
    format!("{pred_name}_neutralized_{}", format_param(proportion))
}

/// `prediction_<pred_name>_<model_id>_FP_<max_exposure>`
pub fn penalized_column(pred_name: &str, model_id: &str, max_exposure: f64) -> String {
    format!(
        "prediction_{pred_name}_{model_id}_FP_{}",
        format_param(max_exposure)
    )
}
