use serde::Serialize;

/// Loss recorded for an epoch whose forward pass failed. Finite so history
/// consumers can still serialize and plot it.
pub const FAILED_EPOCH_LOSS: f32 = f32::MAX;

/// One entry of the loss history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochLoss {
    pub epoch: usize,
    pub loss: f32,
}

/// Bookkeeping for one training run. Reset wholesale at the start of every
/// `train` call and never read by layer actors.
#[derive(Debug, Default)]
pub struct TrainingState {
    epoch: usize,
    history: Vec<EpochLoss>,
    learning_rate: f32,
}

impl TrainingState {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            epoch: 0,
            history: Vec::new(),
            learning_rate,
        }
    }

    /// Appends one epoch result. History stays chronological.
    pub fn record(&mut self, epoch: usize, loss: f32) {
        self.epoch = epoch;
        self.history.push(EpochLoss { epoch, loss });
    }

    /// The last completed epoch, or zero before any completes.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Chronological loss history: index 0 is epoch 1.
    pub fn history(&self) -> &[EpochLoss] {
        &self.history
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}
