use crate::AmgError;

/// Near-kernel vectors of a block, stored column by column
#[derive(Debug, Clone, PartialEq)]
pub struct NullSpace {
    rows: usize,
    dim: usize,
    values: Vec<f64>,
}

impl NullSpace {
    pub fn zeros(rows: usize, dim: usize) -> Self {
        Self {
            rows,
            dim,
            values: vec![0.0; rows * dim],
        }
    }

    /// Translations: one unit vector per velocity component, replicated over the nodes
    pub fn translations(rows: usize, dofs_per_node: usize) -> Result<Self, AmgError> {
        if dofs_per_node == 0 {
            return Err(AmgError::config("null space dimension not given"));
        }
        if rows % dofs_per_node != 0 {
            return Err(AmgError::Structure(format!(
                "{} velocity rows are not a multiple of {} dofs per node",
                rows, dofs_per_node
            )));
        }

        let mut ns = Self::zeros(rows, dofs_per_node);
        for row in 0..rows {
            ns.set(row, row % dofs_per_node, 1.0);
        }
        Ok(ns)
    }

    /// The constant vector
    pub fn constant(rows: usize) -> Self {
        Self {
            rows,
            dim: 1,
            values: vec![1.0; rows],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[col * self.rows + row]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[col * self.rows + row] = value;
    }

    pub fn column(&self, col: usize) -> &[f64] {
        &self.values[col * self.rows..(col + 1) * self.rows]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn velocity_translations() {
        let ns = NullSpace::translations(6, 3).unwrap();

        assert_eq!(ns.dim(), 3);
        assert_eq!(ns.column(0), &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(ns.column(2), &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn zero_dimension_is_config_error() {
        let err = NullSpace::translations(6, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("null space dimension not given"));
    }

    #[test]
    fn pressure_constant() {
        let ns = NullSpace::constant(4);
        assert_eq!(ns.dim(), 1);
        assert!(ns.column(0).iter().all(|v| *v == 1.0));
    }
}
