//! Gaussian elimination over a prime field.

use crate::field::FieldElement;
use crate::Result;
use ndarray::Array2;

/// Transform `matrix` in place into its reduced row echelon form.
///
/// Returns the pivot column of every non-zero row, in row order.
pub fn rref(matrix: &mut Array2<FieldElement>) -> Result<Vec<usize>> {
    let (rows, cols) = matrix.dim();
    let mut pivots = Vec::with_capacity(rows.min(cols));
    let mut r = 0;
    for c in 0..cols {
        if r == rows {
            break;
        }
        let Some(pivot) = (r..rows).find(|i| !matrix[[*i, c]].is_zero()) else {
            continue;
        };
        if pivot != r {
            for j in 0..cols {
                matrix.swap([pivot, j], [r, j]);
            }
        }

        let inv = matrix[[r, c]].inv()?;
        matrix.row_mut(r).iter_mut().for_each(|a| *a *= inv);

        for i in (0..rows).filter(|i| *i != r) {
            let factor = matrix[[i, c]];
            if factor.is_zero() {
                continue;
            }
            for j in c..cols {
                let v = matrix[[r, j]];
                matrix[[i, j]] -= factor * v;
            }
        }

        pivots.push(c);
        r += 1;
    }
    Ok(pivots)
}

/// Find a solution of the linear system given by the augmented matrix
/// `[A | b]`, setting every free variable to `free_value`.
///
/// Returns `None` when the system is inconsistent.
pub fn some_solution(
    system: &Array2<FieldElement>,
    free_value: FieldElement,
) -> Result<Option<Vec<FieldElement>>> {
    let (_, cols) = system.dim();
    if cols == 0 {
        return Ok(Some(vec![]));
    }
    let variables = cols - 1;

    let mut reduced = system.clone();
    let pivots = rref(&mut reduced)?;
    if pivots.last() == Some(&variables) {
        return Ok(None);
    }

    let mut is_pivot = vec![false; variables];
    pivots.iter().for_each(|c| is_pivot[*c] = true);

    let mut solution = vec![free_value; variables];
    for (r, c) in pivots.iter().enumerate() {
        let mut value = reduced[[r, variables]];
        for j in (c + 1..variables).filter(|j| !is_pivot[*j]) {
            value -= reduced[[r, j]] * free_value;
        }
        solution[*c] = value;
    }
    Ok(Some(solution))
}
