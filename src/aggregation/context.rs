use super::{aggregate, resolve_global_aggregates, AggregationParams, GlobalAggregates};
use crate::comm::Communicator;
use crate::{AmgError, NullSpace};
use sparse_matrix::CrsMatrix;

/// Scoped aggregation session.
///
/// Acquired once per setup; all aggregation calls go through it and it is released when dropped,
/// on the success path as well as on an early `?` return.
pub struct AggregationContext<'c> {
    comm: &'c dyn Communicator,
}

impl<'c> AggregationContext<'c> {
    pub fn acquire(comm: &'c dyn Communicator) -> Self {
        log::debug!(
            "aggregation context initialized (rank {} of {})",
            comm.rank(),
            comm.num_ranks()
        );
        Self { comm }
    }

    pub fn communicator(&self) -> &dyn Communicator {
        self.comm
    }

    /// Aggregate a block and resolve the global aggregate ids
    pub fn aggregate(
        &self,
        a: &CrsMatrix,
        params: &AggregationParams,
        block_size: usize,
        nullspace: &NullSpace,
    ) -> Result<GlobalAggregates, AmgError> {
        let local = aggregate(a, params, block_size, nullspace)?;
        let global = resolve_global_aggregates(&local, self.comm);

        log::debug!(
            "{} aggregation of {} rows: {} local / {} global aggregates",
            params.kind,
            a.num_rows(),
            global.num_local,
            global.num_global
        );
        Ok(global)
    }
}

impl Drop for AggregationContext<'_> {
    fn drop(&mut self) {
        log::debug!("aggregation context finalized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::tests::grid_laplacian;
    use crate::SerialComm;

    #[test]
    fn calls_go_through_the_context() {
        let comm = SerialComm;
        let context = AggregationContext::acquire(&comm);
        let a = grid_laplacian(4, 4, 1);

        let aggs = context
            .aggregate(&a, &AggregationParams::default(), 1, &NullSpace::constant(16))
            .unwrap();
        assert_eq!(aggs.partition.len(), 16);
        assert_eq!(aggs.num_local, aggs.num_global);
        assert_eq!(context.communicator().num_ranks(), 1);

        // a failed call leaves the context usable
        let bad = context.aggregate(&a, &AggregationParams::default(), 1, &NullSpace::zeros(16, 0));
        assert!(bad.is_err());
        let again = context
            .aggregate(&a, &AggregationParams::default(), 1, &NullSpace::constant(16))
            .unwrap();
        assert_eq!(again.partition, aggs.partition);
    }
}
