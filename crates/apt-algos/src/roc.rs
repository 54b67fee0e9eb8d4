//! ROC-curve reduction over a ranking plus ground-truth `.apt` labels (C8).

use crate::rank::Ranking;

/// Produces ROC points `(x, y)` with `x = cumulative_non_apt / (N - A)` and
/// `y = cumulative_apt / A`, starting at `(0, 0)` and advancing by one
/// index-bucket at a time (every domain sharing a bucket updates the
/// counters together, then one point is emitted).
pub fn roc_points(ranking: &Ranking, total_domains: usize, total_apt: usize) -> Vec<(f64, f64)> {
    let mut points = vec![(0.0, 0.0)];
    if total_domains == 0 || total_apt == 0 {
        return points;
    }

    let non_apt_total = (total_domains - total_apt) as f64;
    let apt_total = total_apt as f64;
    let mut cumulative_non_apt = 0.0;
    let mut cumulative_apt = 0.0;

    for (_, names) in &ranking.buckets {
        for name in names {
            if name.ends_with(".apt") {
                cumulative_apt += 1.0;
            } else {
                cumulative_non_apt += 1.0;
            }
        }
        let x = if non_apt_total > 0.0 {
            cumulative_non_apt / non_apt_total
        } else {
            0.0
        };
        let y = cumulative_apt / apt_total;
        points.push((x, y));
    }

    points
}

/// Serializes ROC points as `"x,y\n"` lines, UTF-8, no header.
pub fn roc_csv(points: &[(f64, f64)]) -> String {
    let mut csv = String::new();
    for (x, y) in points {
        csv.push_str(&format!("{x},{y}\n"));
    }
    csv
}
