/// Minimum-cost assignment of rows to columns.
///
/// Potentials-based O(n²·m) algorithm over owned vectors. Requires
/// `rows <= cols`; callers pad to a square matrix. Returns the column chosen
/// for every row. Non-finite costs are treated as `f64::MAX / 4`.
pub fn hungarian(cost: &[Vec<f64>]) -> Vec<usize> {
    let n = cost.len();
    if n == 0 {
        return Vec::new();
    }
    let m = cost[0].len();
    debug_assert!(n <= m, "hungarian needs rows <= cols");
    debug_assert!(cost.iter().all(|row| row.len() == m));

    let at = |row: usize, col: usize| {
        let value = cost[row][col];
        if value.is_finite() { value } else { f64::MAX / 4.0 }
    };

    // Index 0 is the virtual column, real rows and columns start at 1.
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; m + 1];
    let mut owner = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for row in 1..=n {
        owner[0] = row;
        let mut col0 = 0;
        let mut min_slack = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[col0] = true;
            let row0 = owner[col0];
            let mut delta = f64::INFINITY;
            let mut col1 = 0;
            for col in 1..=m {
                if used[col] {
                    continue;
                }
                let slack = at(row0 - 1, col - 1) - u[row0] - v[col];
                if slack < min_slack[col] {
                    min_slack[col] = slack;
                    way[col] = col0;
                }
                if min_slack[col] < delta {
                    delta = min_slack[col];
                    col1 = col;
                }
            }
            if col1 == 0 {
                // Only reachable with rows > cols.
                break;
            }
            for col in 0..=m {
                if used[col] {
                    u[owner[col]] += delta;
                    v[col] -= delta;
                } else {
                    min_slack[col] -= delta;
                }
            }
            col0 = col1;
            if owner[col0] == 0 {
                break;
            }
        }

        // Flip the augmenting path.
        loop {
            let prev = way[col0];
            owner[col0] = owner[prev];
            col0 = prev;
            if col0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0; n];
    for col in 1..=m {
        if owner[col] != 0 {
            assignment[owner[col] - 1] = col - 1;
        }
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn total(cost: &[Vec<f64>], assignment: &[usize]) -> f64 {
        assignment
            .iter()
            .enumerate()
            .map(|(row, &col)| cost[row][col])
            .sum()
    }

    fn brute_force(cost: &[Vec<f64>]) -> f64 {
        fn go(cost: &[Vec<f64>], row: usize, used: &mut Vec<bool>, acc: f64, best: &mut f64) {
            if row == cost.len() {
                *best = best.min(acc);
                return;
            }
            for col in 0..used.len() {
                if !used[col] {
                    used[col] = true;
                    go(cost, row + 1, used, acc + cost[row][col], best);
                    used[col] = false;
                }
            }
        }
        let mut best = f64::INFINITY;
        let cols = cost.first().map_or(0, |row| row.len());
        go(cost, 0, &mut vec![false; cols], 0.0, &mut best);
        best
    }

    #[test]
    fn test_known_matrix() {
        let cost = vec![
            vec![4.0, 1.0, 3.0],
            vec![2.0, 0.0, 5.0],
            vec![3.0, 2.0, 2.0],
        ];
        let assignment = hungarian(&cost);
        assert_eq!(assignment, vec![1, 0, 2]);
        assert_eq!(total(&cost, &assignment), 5.0);
    }

    #[test]
    fn test_empty() {
        assert!(hungarian(&[]).is_empty());
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let n = rng.random_range(1..=5);
            let m = rng.random_range(n..=6);
            let cost: Vec<Vec<f64>> = (0..n)
                .map(|_| (0..m).map(|_| rng.random_range(-50.0..50.0)).collect())
                .collect();

            let assignment = hungarian(&cost);
            let mut seen = assignment.clone();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), n, "columns reused: {:?}", assignment);
            assert!((total(&cost, &assignment) - brute_force(&cost)).abs() < 1e-6);
        }
    }
}
