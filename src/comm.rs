//! Collective operations needed by the setup phase.

/// Rank-decomposition seam: each rank owns a row partition of every matrix
pub trait Communicator: Send + Sync {
    fn rank(&self) -> usize;

    fn num_ranks(&self) -> usize;

    /// All-gather of one count per rank (blocking); entry `r` is rank `r`'s value
    fn gather_counts(&self, local: usize) -> Vec<usize>;

    /// Global sum of one count per rank
    fn sum_all(&self, local: usize) -> usize {
        self.gather_counts(local).iter().sum()
    }
}

/// Single-rank communicator
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn num_ranks(&self) -> usize {
        1
    }

    fn gather_counts(&self, local: usize) -> Vec<usize> {
        vec![local]
    }
}

/// Exclusive prefix sum of `counts` at `rank`, and the total over all ranks
pub fn exclusive_offset(counts: &[usize], rank: usize) -> (usize, usize) {
    let offset = counts.iter().take(rank).sum();
    let total = counts.iter().sum();
    (offset, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_reduction() {
        let comm = SerialComm;
        assert_eq!(comm.gather_counts(7), vec![7]);
        assert_eq!(comm.sum_all(7), 7);
    }

    #[test]
    fn prefix_offsets() {
        let counts = [4, 0, 3, 5];
        assert_eq!(exclusive_offset(&counts, 0), (0, 12));
        assert_eq!(exclusive_offset(&counts, 2), (4, 12));
        assert_eq!(exclusive_offset(&counts, 3), (7, 12));
    }
}
