use crate::{cover::CoverImage, theme::Rgb};
use image::RgbaImage;
use std::cmp::Reverse;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("cover image {0} is not loaded")]
    NotReady(String),
    #[error("cover image {0} has no opaque pixels")]
    NoPixels(String),
}

/// Picks the representative color of a fully decoded cover.
pub trait ColorExtractor {
    fn dominant_color(&self, image: &CoverImage) -> Result<Rgb, ExtractError>;
}

/// Clusters a strided sample of the cover's pixels and returns the centroid
/// of the most populated cluster.
#[derive(Debug, Clone, Copy)]
pub struct KMeansExtractor {
    pub max_samples: usize,
    pub clusters: usize,
    pub max_iter: usize,
}

impl Default for KMeansExtractor {
    fn default() -> Self {
        Self {
            max_samples: 6_000,
            clusters: 5,
            max_iter: 10,
        }
    }
}

impl ColorExtractor for KMeansExtractor {
    fn dominant_color(&self, image: &CoverImage) -> Result<Rgb, ExtractError> {
        let name = image.source().display().to_string();
        let pixels = image
            .pixels()
            .filter(|_| image.is_ready())
            .ok_or_else(|| ExtractError::NotReady(name.clone()))?;

        let samples = sample_pixels(pixels, self.max_samples);
        if samples.is_empty() {
            return Err(ExtractError::NoPixels(name));
        }

        let k = self.clusters.min(samples.len()).max(1);
        let mut clusters = kmeans_clusters(&samples, k, self.max_iter);
        clusters.sort_by_key(|cluster| Reverse(cluster.count));
        clusters
            .first()
            .filter(|cluster| cluster.count > 0)
            .map(|cluster| color_from_centroid(cluster.centroid))
            .ok_or(ExtractError::NoPixels(name))
    }
}

#[derive(Clone, Copy)]
struct Cluster {
    centroid: [f32; 3],
    count: usize,
}

fn sample_pixels(image: &RgbaImage, max_samples: usize) -> Vec<[f32; 3]> {
    if max_samples == 0 {
        return Vec::new();
    }

    let total = image.pixels().len();
    if total == 0 {
        return Vec::new();
    }

    let step = (total / max_samples).max(1);
    let mut samples = Vec::with_capacity(max_samples.min(total));

    for pixel in image.pixels().step_by(step) {
        let [r, g, b, a] = pixel.0;
        if a < 16 {
            continue;
        }
        samples.push([r as f32, g as f32, b as f32]);
        if samples.len() >= max_samples {
            break;
        }
    }

    samples
}

fn squared_distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr * dr + dg * dg + db * db
}

fn nearest_centroid(sample: &[f32; 3], centroids: &[[f32; 3]]) -> usize {
    let mut best = 0usize;
    let mut best_dist = f32::MAX;
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(sample, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }
    best
}

fn kmeans_clusters(samples: &[[f32; 3]], k: usize, max_iter: usize) -> Vec<Cluster> {
    if samples.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut centroids: Vec<[f32; 3]> = (0..k)
        .map(|i| samples[((i * samples.len()) / k).min(samples.len() - 1)])
        .collect();

    for iter in 0..max_iter {
        let mut sums = vec![[0f32; 3]; k];
        let mut counts = vec![0usize; k];

        for sample in samples {
            let best = nearest_centroid(sample, &centroids);
            for channel in 0..3 {
                sums[best][channel] += sample[channel];
            }
            counts[best] += 1;
        }

        let mut changed = false;
        for i in 0..k {
            if counts[i] == 0 {
                centroids[i] = samples[(i + iter) % samples.len()];
                changed = true;
                continue;
            }
            let n = counts[i] as f32;
            let updated = [sums[i][0] / n, sums[i][1] / n, sums[i][2] / n];
            if squared_distance(&centroids[i], &updated) > 1e-2 {
                changed = true;
            }
            centroids[i] = updated;
        }

        if !changed {
            break;
        }
    }

    let mut counts = vec![0usize; k];
    for sample in samples {
        counts[nearest_centroid(sample, &centroids)] += 1;
    }

    centroids
        .into_iter()
        .zip(counts)
        .map(|(centroid, count)| Cluster { centroid, count })
        .collect()
}

fn color_from_centroid(centroid: [f32; 3]) -> Rgb {
    let channel = |v: f32| v.clamp(0.0, 255.0).round() as u8;
    Rgb::new(channel(centroid[0]), channel(centroid[1]), channel(centroid[2]))
}
