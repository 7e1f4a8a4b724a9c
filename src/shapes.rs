//! Tetromino catalog: the 7 shapes and their canonical bounding-box matrices.

/// Occupied sub-cells of a piece's bounding box in its current orientation.
/// Row-major, `matrix[row][col]`; dimensions swap on rotation.
pub type ShapeMatrix = Vec<Vec<bool>>;

/// Tetromino kinds, in fixed index order 0..6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tetromino {
    I,
    T,
    L,
    J,
    O,
    S,
    Z,
}

impl Tetromino {
    pub const ALL: [Self; 7] = [Self::I, Self::T, Self::L, Self::J, Self::O, Self::S, Self::Z];

    /// Canonical (unrotated) matrix. Minimal bounding box; spawn centering
    /// and rotation correctness depend on these exact patterns.
    pub fn base_matrix(self) -> ShapeMatrix {
        let rows: &[&[u8]] = match self {
            Self::I => &[&[1, 1, 1, 1]],
            Self::T => &[&[1, 1, 1], &[0, 1, 0]],
            Self::L => &[&[1, 1, 1], &[1, 0, 0]],
            Self::J => &[&[1, 1, 1], &[0, 0, 1]],
            Self::O => &[&[1, 1], &[1, 1]],
            Self::S => &[&[0, 1, 1], &[1, 1, 0]],
            Self::Z => &[&[1, 1, 0], &[0, 1, 1]],
        };
        rows.iter()
            .map(|row| row.iter().map(|&c| c != 0).collect())
            .collect()
    }

    /// Colour index 0..6 for theme.piece_color():
    /// cyan, purple, orange, blue, yellow, green, red.
    pub fn color_index(self) -> u8 {
        match self {
            Self::I => 0,
            Self::T => 1,
            Self::L => 2,
            Self::J => 3,
            Self::O => 4,
            Self::S => 5,
            Self::Z => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrices_are_rectangular_four_cell() {
        for kind in Tetromino::ALL {
            let m = kind.base_matrix();
            let w = m[0].len();
            assert!(m.iter().all(|row| row.len() == w), "{kind:?} not rectangular");
            let cells: usize = m.iter().flatten().filter(|&&c| c).count();
            assert_eq!(cells, 4, "{kind:?} is not a tetromino");
        }
    }

    #[test]
    fn test_index_order_matches_color_index() {
        for (i, kind) in Tetromino::ALL.iter().enumerate() {
            assert_eq!(kind.color_index() as usize, i);
        }
    }
}
