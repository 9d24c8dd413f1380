//! Devices frames are served on

use std::fmt;

use rdm_core::{Frame, Residency, Result};

/// Memory a frame can be placed in
pub trait Device: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Move the frame's buffers onto this device
    fn to_device(&self, frame: &mut Frame) -> Result<()>;

    /// Page-lock the host memory backing the frame
    fn pin_memory(&self, frame: &mut Frame) -> Result<()>;
}

/// The host CPU: frames stay in host memory
#[derive(Debug, Clone, Copy, Default)]
pub struct HostDevice;

impl Device for HostDevice {
    fn name(&self) -> &str {
        "cpu"
    }

    /// Frames already live on the host, pinned or not
    fn to_device(&self, _frame: &mut Frame) -> Result<()> {
        Ok(())
    }

    fn pin_memory(&self, frame: &mut Frame) -> Result<()> {
        if frame.residency == Residency::Host {
            frame.residency = Residency::Pinned;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use rdm_core::RdmError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Accelerator stand-in counting transfers
    #[derive(Debug, Default)]
    pub struct FakeAccelerator {
        pub uploads: AtomicUsize,
        pub pins: AtomicUsize,
        out_of_memory: AtomicBool,
    }

    impl FakeAccelerator {
        /// Make every following upload fail, or succeed again
        pub fn set_out_of_memory(&self, full: bool) {
            self.out_of_memory.store(full, Ordering::SeqCst);
        }

        pub fn uploads(&self) -> usize {
            self.uploads.load(Ordering::SeqCst)
        }

        pub fn pins(&self) -> usize {
            self.pins.load(Ordering::SeqCst)
        }
    }

    impl Device for FakeAccelerator {
        fn name(&self) -> &str {
            "fake-accelerator"
        }

        fn to_device(&self, frame: &mut Frame) -> Result<()> {
            if self.out_of_memory.load(Ordering::SeqCst) {
                return Err(RdmError::Device("out of device memory".to_string()));
            }
            self.uploads.fetch_add(1, Ordering::SeqCst);
            frame.residency = Residency::Device;
            Ok(())
        }

        fn pin_memory(&self, frame: &mut Frame) -> Result<()> {
            self.pins.fetch_add(1, Ordering::SeqCst);
            frame.residency = Residency::Pinned;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_host_device_pins_and_keeps_host() {
        let mut frame = Frame::new(Array3::zeros((2, 2, 3)));
        HostDevice.to_device(&mut frame).unwrap();
        assert_eq!(frame.residency, Residency::Host);

        HostDevice.pin_memory(&mut frame).unwrap();
        assert_eq!(frame.residency, Residency::Pinned);

        HostDevice.to_device(&mut frame).unwrap();
        assert_eq!(frame.residency, Residency::Pinned);
        assert_eq!(HostDevice.name(), "cpu");
    }
}
