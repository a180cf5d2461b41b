use crate::braess_sarazin::BraessSarazinSmoother;
use crate::prolongator::Transfer;
use sparse_matrix::BlockMatrix;
use std::sync::Arc;

/// One non-coarsest level of the hierarchy
pub struct Level {
    pub(super) a: BlockMatrix,
    pub(super) velocity: Transfer,
    pub(super) pressure: Transfer,
    pub(super) smoother: Arc<BraessSarazinSmoother>,
}

impl Level {
    pub fn blocks(&self) -> &BlockMatrix {
        &self.a
    }

    pub fn velocity_transfer(&self) -> &Transfer {
        &self.velocity
    }

    pub fn pressure_transfer(&self) -> &Transfer {
        &self.pressure
    }

    pub fn pre_smoother(&self) -> &Arc<BraessSarazinSmoother> {
        &self.smoother
    }

    /// The same object as [Level::pre_smoother]
    pub fn post_smoother(&self) -> &Arc<BraessSarazinSmoother> {
        &self.smoother
    }
}
