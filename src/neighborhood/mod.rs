//! Neighbourhood machinery
//!
//! Sparse distance metrics used by the clustering bandits, the incrementally
//! updateable user similarity, and the user-based kNN recommender built on it.

pub mod distance;
pub mod knn;
pub mod similarity;

pub use distance::{DistanceMetric, Euclidean, Manhattan};
pub use knn::UserKnn;
pub use similarity::{UpdateableSimilarity, VectorCosineSimilarity};
