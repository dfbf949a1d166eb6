//! Per-sample text dumps of generated output
//!
//! Writes a fixed-layout sub-rectangle of pixel values for each generated
//! sample: one file per sample, one line per channel, values rescaled from
//! the generator's [-1, 1] output range to [0, 1].

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{ensure, Context};
use tch::{Device, Tensor};

/// Sub-rectangle of pixels dumped per channel
#[derive(Debug, Clone, Copy)]
pub struct DumpWindow {
    /// Number of rows dumped, clipped to the sample height
    pub rows: i64,
    /// Number of columns dumped, clipped to the sample width
    pub cols: i64,
}

impl Default for DumpWindow {
    fn default() -> Self {
        Self { rows: 20, cols: 10 }
    }
}

/// Write one text dump per sample into the output directory
///
/// # Arguments
///
/// * `samples` - Tensor of shape (batch, channels, height, width) with
///   values in [-1, 1]
/// * `dir` - Per-run output directory, created if absent
/// * `window` - Pixel sub-rectangle dumped per channel
///
/// # Returns
///
/// Number of files written
pub fn write_sample_dumps(
    samples: &Tensor,
    dir: &Path,
    window: DumpWindow,
) -> anyhow::Result<usize> {
    let size = samples.size();
    ensure!(
        size.len() == 4,
        "expected samples of shape (batch, channels, height, width), got {:?}",
        size
    );
    let (batch, channels, height, width) = (size[0], size[1], size[2], size[3]);
    let rows = window.rows.min(height);
    let cols = window.cols.min(width);

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    // Rescale [-1, 1] -> [0, 1] on the host before flattening.
    let rescaled = ((samples.detach().to_device(Device::Cpu) + 1.0) / 2.0).contiguous();
    let values = Vec::<f32>::try_from(&rescaled.flatten(0, -1))?;

    for sample in 0..batch {
        let mut content = String::new();
        for channel in 0..channels {
            for row in 0..rows {
                for col in 0..cols {
                    let idx = ((sample * channels + channel) * height + row) * width + col;
                    write!(content, "{} ", values[idx as usize])?;
                }
            }
            content.push('\n');
        }

        let path = dir.join(format!("results_{sample}.out"));
        std::fs::write(&path, &content)
            .with_context(|| format!("failed to write sample dump {}", path.display()))?;
    }

    Ok(batch as usize)
}
