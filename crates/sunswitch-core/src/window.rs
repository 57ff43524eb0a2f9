// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of SunSwitch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use crate::error::{SwitchError, SwitchResult};
use std::collections::VecDeque;
use sunswitch_types::{Sample, Statistics};

/// Samples reserved up front; larger windows grow as they fill
const PREALLOCATE: usize = 128;

/// Fixed-capacity FIFO of the most recent power samples (oldest first)
#[derive(Debug, Clone)]
pub struct RollingWindow {
    samples: VecDeque<Sample>,

    /// Maximum number of samples to keep
    capacity: usize,
}

impl RollingWindow {
    /// Create an empty window; a capacity of zero is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(PREALLOCATE)),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest on overflow
    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);

        // Maintain size limit
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Change capacity, keeping the most recent samples that still fit
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Samples in arrival order
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn mean(&self) -> SwitchResult<f64> {
        if self.samples.is_empty() {
            return Err(SwitchError::EmptyWindow);
        }
        let sum: f64 = self.samples.iter().map(|s| s.power_watts).sum();
        Ok(sum / self.samples.len() as f64)
    }

    pub fn median(&self) -> SwitchResult<f64> {
        if self.samples.is_empty() {
            return Err(SwitchError::EmptyWindow);
        }
        let mut values: Vec<f64> = self.samples.iter().map(|s| s.power_watts).collect();
        values.sort_by(f64::total_cmp);

        let mid = values.len().div_euclid(2);
        if values.len().is_multiple_of(2) {
            Ok((values[mid - 1] + values[mid]) / 2.0)
        } else {
            Ok(values[mid])
        }
    }

    /// Mean and median of the current contents
    pub fn statistics(&self) -> SwitchResult<Statistics> {
        Ok(Statistics {
            mean_watts: self.mean()?,
            median_watts: self.median()?,
        })
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};

    fn window_with(capacity: usize, values: &[f64]) -> RollingWindow {
        let start = Utc::now();
        let mut window = RollingWindow::new(capacity);
        for (i, value) in values.iter().enumerate() {
            window.push(Sample::new(
                start + TimeDelta::seconds(i as i64 * 60),
                *value,
            ));
        }
        window
    }

    #[test]
    fn test_empty_window_errors() {
        let window = RollingWindow::new(5);
        assert!(matches!(window.mean(), Err(SwitchError::EmptyWindow)));
        assert!(matches!(window.median(), Err(SwitchError::EmptyWindow)));
        assert!(window.statistics().is_err());
    }

    #[test]
    fn test_mean() {
        let window = window_with(5, &[100.0, 200.0, 300.0]);
        assert!((window.mean().unwrap() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_median_odd_count() {
        let window = window_with(5, &[500.0, 100.0, 300.0]);
        assert!((window.median().unwrap() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_median_even_count() {
        let window = window_with(5, &[400.0, 100.0, 300.0, 200.0]);
        assert!((window.median().unwrap() - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_median_rejects_single_spike() {
        // A cloud edge spike drags the mean but not the median
        let window = window_with(5, &[1000.0, 1000.0, 5000.0, 1000.0, 1000.0]);
        assert!((window.median().unwrap() - 1000.0).abs() < 1e-9);
        assert!((window.mean().unwrap() - 1800.0).abs() < 1e-9);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let capacity = 4;
        let mut window = RollingWindow::new(capacity);
        let start = Utc::now();

        for i in 0..20 {
            window.push(Sample::new(start + TimeDelta::seconds(i), i as f64));
            assert!(window.len() <= capacity);
        }
    }

    #[test]
    fn test_keeps_last_n_in_arrival_order() {
        for extra in 0..6 {
            let capacity = 5;
            let values: Vec<f64> = (0..capacity + extra).map(|v| v as f64).collect();
            let window = window_with(capacity, &values);

            let kept: Vec<f64> = window.samples().map(|s| s.power_watts).collect();
            assert_eq!(kept, values[extra..].to_vec(), "after {extra} extra pushes");
            assert!(window.is_full());
        }
    }

    #[test]
    fn test_zero_capacity_is_one() {
        let window = window_with(0, &[10.0, 20.0]);
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.len(), 1);
        assert!((window.mean().unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_huge_capacity_does_not_preallocate() {
        let mut window = RollingWindow::new(usize::MAX);
        window.push(Sample::new(Utc::now(), 42.0));

        assert_eq!(window.capacity(), usize::MAX);
        assert_eq!(window.len(), 1);
        assert!(!window.is_full());
    }

    #[test]
    fn test_resize_keeps_most_recent() {
        let mut window = window_with(5, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        window.resize(2);

        let kept: Vec<f64> = window.samples().map(|s| s.power_watts).collect();
        assert_eq!(kept, vec![4.0, 5.0]);

        window.resize(10);
        assert_eq!(window.len(), 2);
        assert!(!window.is_full());
    }
}
