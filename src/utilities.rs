/// Log-log interpolation.
///
/// Given arrays of x and y values, interpolate on a log-log scale to find the y value at x_new.
/// If x_new is outside the range of x, returns the first or last y value.
/// All x and y values must be positive; a zero y on either side of the interval gives zero.
pub fn interpolate_log_log(x: &[f64], y: &[f64], x_new: f64) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    if x.len() == 1 || x_new <= x[0] {
        return y[0];
    }
    if x_new >= x[x.len() - 1] {
        return y[y.len() - 1];
    }

    // Binary search for interval: find largest i with x[i] <= x_new
    let mut low = 0usize;
    let mut high = x.len() - 1;
    while high - low > 1 {
        let mid = (low + high) >> 1;
        if x[mid] <= x_new {
            low = mid;
        } else {
            high = mid;
        }
    }
    let (x1, x2) = (x[low], x[low + 1]);
    let (y1, y2) = (y[low], y[low + 1]);
    if y1 <= 0.0 || y2 <= 0.0 {
        return 0.0;
    }
    let slope = (y2 / y1).ln() / (x2 / x1).ln();
    y1 * (x_new / x1).powf(slope)
}
