//! Deterministic 2-means clustering.
//!
//! Shared by jersey/background separation inside a crop and by the split of
//! jersey colors into teams. Samples are the rows of an `n x d` matrix.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

#[derive(Debug, Clone, PartialEq)]
pub struct KMeans2 {
    /// `2 x d`, row `k` is the centroid of cluster `k`.
    pub centroids: Array2<f32>,
    /// Cluster of every input row.
    pub labels: Vec<usize>,
}

#[inline]
fn sq_dist(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl KMeans2 {
    /// Clusters `samples` into two groups.
    ///
    /// Seeds are the first row and the row farthest from it (lowest index on
    /// ties). A sample equidistant from both centroids joins cluster 0, and a
    /// cluster left empty keeps its previous centroid. Returns `None` for
    /// fewer than two rows or zero columns.
    pub fn fit(samples: ArrayView2<'_, f32>, max_iterations: usize) -> Option<Self> {
        let (n, d) = samples.dim();
        if n < 2 || d == 0 {
            return None;
        }

        let first = samples.row(0);
        let mut far = 0;
        let mut far_dist = 0.0;
        for (i, row) in samples.axis_iter(Axis(0)).enumerate() {
            let dist = sq_dist(first, row);
            if dist > far_dist {
                far = i;
                far_dist = dist;
            }
        }

        let mut centroids = Array2::zeros((2, d));
        centroids.row_mut(0).assign(&first);
        centroids.row_mut(1).assign(&samples.row(far));

        let mut model = Self {
            centroids,
            labels: vec![usize::MAX; n],
        };

        for _ in 0..max_iterations.max(1) {
            let mut changed = false;
            for (i, row) in samples.axis_iter(Axis(0)).enumerate() {
                let label = model.predict(row);
                if model.labels[i] != label {
                    model.labels[i] = label;
                    changed = true;
                }
            }

            if !changed {
                break;
            }

            model.update_centroids(samples);
        }

        Some(model)
    }

    fn update_centroids(&mut self, samples: ArrayView2<'_, f32>) {
        let d = samples.ncols();
        let mut sums = Array2::<f32>::zeros((2, d));
        let mut counts = [0usize; 2];

        for (row, &label) in samples.axis_iter(Axis(0)).zip(self.labels.iter()) {
            let mut acc = sums.row_mut(label);
            acc += &row;
            counts[label] += 1;
        }

        for (k, &count) in counts.iter().enumerate() {
            if count > 0 {
                let mean = sums.row(k).mapv(|v| v / count as f32);
                self.centroids.row_mut(k).assign(&mean);
            }
        }
    }

    /// Nearer centroid under Euclidean distance, cluster 0 on ties.
    #[inline]
    pub fn predict(&self, sample: ArrayView1<'_, f32>) -> usize {
        let d0 = sq_dist(self.centroids.row(0), sample);
        let d1 = sq_dist(self.centroids.row(1), sample);

        if d1 < d0 {
            1
        } else {
            0
        }
    }

    #[inline]
    pub fn centroid(&self, k: usize) -> ArrayView1<'_, f32> {
        self.centroids.row(k)
    }

    /// Number of members per cluster.
    pub fn counts(&self) -> [usize; 2] {
        let mut counts = [0; 2];
        for &l in &self.labels {
            counts[l] += 1;
        }

        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separates_two_blobs() {
        let samples = array![
            [0.0, 0.0, 0.0],
            [250.0, 250.0, 250.0],
            [2.0, 1.0, 0.0],
            [248.0, 252.0, 250.0],
            [1.0, 0.0, 3.0],
        ];

        let model = KMeans2::fit(samples.view(), 100).unwrap();

        assert_eq!(model.labels, vec![0, 1, 0, 1, 0]);
        assert_eq!(model.centroid(0), array![1.0, 1.0 / 3.0, 1.0].view());
        assert_eq!(model.centroid(1), array![249.0, 251.0, 250.0].view());
        assert_eq!(model.counts(), [3, 2]);
    }

    #[test]
    fn test_is_deterministic() {
        let samples = array![[10.0, 0.0], [0.0, 10.0], [5.0, 5.0], [9.0, 1.0], [1.0, 9.0]];

        let a = KMeans2::fit(samples.view(), 100).unwrap();
        let b = KMeans2::fit(samples.view(), 100).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_identical_samples_share_cluster_zero() {
        let samples = array![[7.0, 7.0], [7.0, 7.0], [7.0, 7.0]];
        let model = KMeans2::fit(samples.view(), 10).unwrap();

        assert_eq!(model.labels, vec![0, 0, 0]);
        assert_eq!(model.centroid(1), array![7.0, 7.0].view());
    }

    #[test]
    fn test_needs_two_samples() {
        let samples = array![[1.0, 2.0, 3.0]];

        assert!(KMeans2::fit(samples.view(), 10).is_none());
    }

    #[test]
    fn test_predict_tie_goes_to_first_cluster() {
        let model = KMeans2 {
            centroids: array![[0.0], [2.0]],
            labels: vec![],
        };

        assert_eq!(model.predict(array![1.0].view()), 0);
        assert_eq!(model.predict(array![1.5].view()), 1);
    }
}
