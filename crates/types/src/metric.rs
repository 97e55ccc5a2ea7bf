use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TypeError;

/// The similarity metric of a vector index
///
/// Distance metrics (`L2`, `JACCARD`, `HAMMING`) report larger scores for
/// farther vectors. Similarity metrics (`IP`, `COSINE`) report larger scores
/// for closer vectors. Every score comparison made by the search iterator goes
/// through the helpers below so that the direction is never hard-coded.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Metric {
	L2,
	Ip,
	Cosine,
	Jaccard,
	Hamming,
}

impl Metric {
	/// Whether a larger score means the hit is farther from the query.
	pub fn larger_is_farther(&self) -> bool {
		match self {
			Metric::L2 | Metric::Jaccard | Metric::Hamming => true,
			Metric::Ip | Metric::Cosine => false,
		}
	}

	/// Returns true when `a` is strictly farther from the query than `b`.
	pub fn is_farther(&self, a: f32, b: f32) -> bool {
		if self.larger_is_farther() {
			a > b
		} else {
			a < b
		}
	}

	/// The distance between a nearer score and a farther score, measured
	/// outwards. Non-negative when the scores are correctly ordered.
	pub fn spread(&self, nearer: f32, farther: f32) -> f32 {
		if self.larger_is_farther() {
			farther - nearer
		} else {
			nearer - farther
		}
	}

	/// Moves a score outwards, away from the query, by `by`.
	pub fn extend(&self, score: f32, by: f32) -> f32 {
		if self.larger_is_farther() {
			score + by
		} else {
			score - by
		}
	}
}

impl FromStr for Metric {
	type Err = TypeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"L2" => Ok(Metric::L2),
			"IP" => Ok(Metric::Ip),
			"COSINE" => Ok(Metric::Cosine),
			"JACCARD" => Ok(Metric::Jaccard),
			"HAMMING" => Ok(Metric::Hamming),
			_ => Err(TypeError::UnsupportedMetric(s.to_owned())),
		}
	}
}

impl fmt::Display for Metric {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Metric::L2 => f.write_str("L2"),
			Metric::Ip => f.write_str("IP"),
			Metric::Cosine => f.write_str("COSINE"),
			Metric::Jaccard => f.write_str("JACCARD"),
			Metric::Hamming => f.write_str("HAMMING"),
		}
	}
}
