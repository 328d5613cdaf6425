//! Head-orientation sensing: raw sample types, Madgwick-based fusion, and a
//! non-blocking client that publishes the latest fused orientation.

pub mod fusion;
pub mod types;

use fusion::OrientationFusion;
use tokio::sync::{mpsc, watch};
use types::{Orientation, RawImuSample};

/// A motion-sensor device boundary. Implementations block in `read_sample`
/// on their own task; the frame loop never touches them directly.
pub trait SensorDevice: Send + 'static {
    /// Next raw sample. `Ok(None)` means the stream ended.
    fn read_sample(&mut self) -> anyhow::Result<Option<RawImuSample>>;
}

enum SensorCommand {
    Reset,
}

/// Handle to the sensor processing task.
///
/// The task reads the device, runs fusion and publishes each orientation on
/// a watch channel, so `orientation()` is a non-blocking latest-value read.
/// A missing sensor is a valid, permanently degraded state (`absent()`):
/// reads return identity and the frame loop falls back to mouse/gamepad look.
pub struct SensorClient {
    orientation_rx: watch::Receiver<Orientation>,
    command_tx: mpsc::UnboundedSender<SensorCommand>,
    attached: bool,
    _task: Option<tokio::task::JoinHandle<()>>,
}

impl SensorClient {
    /// Start the read/fuse/publish task for an attached device.
    pub fn spawn(device: impl SensorDevice, beta: f32, calibration_samples: u32) -> Self {
        let (orientation_tx, orientation_rx) = watch::channel(Orientation::default());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task = tokio::task::spawn_blocking(move || {
            sensor_read_loop(device, orientation_tx, command_rx, beta, calibration_samples)
        });

        Self {
            orientation_rx,
            command_tx,
            attached: true,
            _task: Some(task),
        }
    }

    /// No sensor present. Orientation reads return identity forever.
    pub fn absent() -> Self {
        let (_, orientation_rx) = watch::channel(Orientation::default());
        let (command_tx, _) = mpsc::unbounded_channel();
        Self {
            orientation_rx,
            command_tx,
            attached: false,
            _task: None,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Latest fused orientation (non-blocking).
    pub fn orientation(&self) -> Orientation {
        *self.orientation_rx.borrow()
    }

    /// Recenter yaw so the current heading becomes forward.
    pub fn reset(&self) {
        let _ = self.command_tx.send(SensorCommand::Reset);
    }
}

fn sensor_read_loop(
    mut device: impl SensorDevice,
    orientation_tx: watch::Sender<Orientation>,
    mut command_rx: mpsc::UnboundedReceiver<SensorCommand>,
    beta: f32,
    calibration_samples: u32,
) {
    let mut fusion = OrientationFusion::new(beta, calibration_samples);
    let mut sample_count: u64 = 0;

    loop {
        while let Ok(cmd) = command_rx.try_recv() {
            match cmd {
                SensorCommand::Reset => fusion.reset(),
            }
        }

        match device.read_sample() {
            Ok(Some(sample)) => {
                if let Some(orientation) = fusion.update(&sample) {
                    if orientation_tx.send(orientation).is_err() {
                        // All clients dropped.
                        break;
                    }
                }
                sample_count += 1;
                if sample_count % 1000 == 0 {
                    tracing::debug!(sample_count, "sensor samples processed");
                }
            }
            Ok(None) => {
                tracing::warn!("sensor stream ended");
                break;
            }
            Err(e) => {
                tracing::error!(?e, "sensor read error");
                break;
            }
        }
    }
}
