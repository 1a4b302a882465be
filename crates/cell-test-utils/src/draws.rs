//! Scripted uniform draws.

use cell_tower::admission::UniformDraw;
use std::collections::VecDeque;

/// Returns the scripted values in order, then repeats the last one.
///
/// An empty script draws 0.5, which lands in the connect band under the
/// default bands and any failure probability below 0.5.
#[derive(Debug, Clone)]
pub struct ScriptedDraws {
    script: VecDeque<f64>,
    last: f64,
    drawn: usize,
}

impl ScriptedDraws {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            script: values.into_iter().collect(),
            last: 0.5,
            drawn: 0,
        }
    }

    /// The same value for every draw.
    pub fn constant(value: f64) -> Self {
        Self::new([value])
    }

    /// Number of draws taken so far.
    pub fn drawn(&self) -> usize {
        self.drawn
    }
}

impl UniformDraw for ScriptedDraws {
    fn next_unit(&mut self) -> f64 {
        self.drawn += 1;
        if let Some(value) = self.script.pop_front() {
            self.last = value;
        }
        self.last
    }
}
