use std::time::{Duration, Instant};

/// Monotonic run clock with a precision sleep.
///
/// The trait exists so the sequencing logic can be driven by a deterministic
/// clock in tests; `sleep` is the single suspension point a trial uses for
/// its jittered delay.
pub trait Timer {
    /// Seconds elapsed since construction or the last `reset`.
    fn now_secs(&self) -> f64;
    /// Rewind the clock zero point to now.
    fn reset(&mut self);
    /// Block for `duration` with the best precision the platform offers.
    fn sleep(&self, duration: Duration);
}

/// Platform-backed timer with sub-millisecond sleep precision.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "windows")]
        self.windows_sleep(duration);
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(target_os = "macos")]
        self.macos_sleep(duration);
        #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }

    #[cfg(target_os = "windows")]
    fn windows_sleep(&self, duration: Duration) {
        use windows::core::PCWSTR;
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::{
            CreateWaitableTimerW, SetWaitableTimer, WaitForSingleObject, INFINITE,
        };

        unsafe {
            let Ok(timer) = CreateWaitableTimerW(None, true, PCWSTR::null()) else {
                std::thread::sleep(duration);
                return;
            };

            // Relative due time, in 100 ns intervals.
            let due_time = -(duration.as_nanos() as i64 / 100);

            if SetWaitableTimer(timer, &due_time, 0, None, None, false).is_ok() {
                WaitForSingleObject(timer, INFINITE);
            } else {
                std::thread::sleep(duration);
            }

            let _ = CloseHandle(timer);
        }
    }

    #[cfg(target_os = "macos")]
    fn macos_sleep(&self, duration: Duration) {
        use mach2::mach_time::{mach_absolute_time, mach_timebase_info, mach_timebase_info_data_t};
        use std::thread;

        if duration.as_nanos() < 100_000 {
            unsafe {
                let start = mach_absolute_time();
                let mut timebase = mach_timebase_info_data_t { numer: 0, denom: 0 };
                mach_timebase_info(&mut timebase);

                let target_ticks =
                    duration.as_nanos() as u64 * timebase.denom as u64 / timebase.numer as u64;

                while mach_absolute_time() - start < target_ticks {
                    std::hint::spin_loop();
                }
            }
        } else {
            thread::sleep(duration);
        }
    }
}

impl Timer for HighPrecisionTimer {
    fn now_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn reset(&mut self) {
        self.start = Instant::now();
    }

    fn sleep(&self, duration: Duration) {
        self.high_precision_sleep(duration)
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_rewinds_the_zero_point() {
        let mut timer = HighPrecisionTimer::new();
        std::thread::sleep(Duration::from_millis(20));
        assert!(timer.now_secs() >= 0.02);
        timer.reset();
        assert!(timer.now_secs() < 0.02);
    }

    #[test]
    fn sleep_waits_at_least_the_requested_duration() {
        let timer = HighPrecisionTimer::new();
        let before = Instant::now();
        timer.sleep(Duration::from_millis(15));
        assert!(before.elapsed() >= Duration::from_millis(15));
    }
}
