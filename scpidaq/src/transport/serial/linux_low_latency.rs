use std::io;
use std::mem::MaybeUninit;
use std::os::raw::c_schar;
use std::os::unix::io::AsRawFd;

use libc::{c_char, c_int, c_short, c_uint, c_ulong};

/// `struct serial_struct` from `linux/serial.h`.
#[repr(C)]
#[allow(dead_code)]
struct SerialInfo {
    kind: c_int,
    line: c_int,
    port: c_uint,
    irq: c_int,
    flags: c_int,
    xmit_fifo_size: c_int,
    custom_divisor: c_int,
    baud_base: c_int,
    close_delay: c_short,
    io_type: c_schar,
    reserved_char: c_schar,
    hub6: c_int,
    closing_wait: c_short,
    closing_wait2: c_short,
    iomem_base: *mut c_char,
    iomem_reg_shift: c_short,
    port_high: c_int,
    iomap_base: c_ulong,
}

const ASYNC_LOW_LATENCY: c_int = 1 << 13;
const TIOCSSERIAL: c_ulong = 0x541F;

/// Set or clear `ASYNC_LOW_LATENCY` on a tty. Without it, USB adapters hold back received
/// bytes for up to 16 ms, which is paid again on every `READ?`.
///
/// Returns whether the flag was set before.
pub(crate) fn set_low_latency<T: AsRawFd>(port: &T, enable: bool) -> io::Result<bool> {
    let fd = port.as_raw_fd();
    let mut info = MaybeUninit::<SerialInfo>::zeroed();
    // SAFETY: TIOCGSERIAL fills a `serial_struct` and `info` is large enough to hold one.
    if unsafe { libc::ioctl(fd, libc::TIOCGSERIAL, info.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: zeroed is a valid bit pattern for every field, the ioctl succeeded.
    let mut info = unsafe { info.assume_init() };

    let was_set = info.flags & ASYNC_LOW_LATENCY != 0;
    if was_set == enable {
        return Ok(was_set);
    }
    if enable {
        info.flags |= ASYNC_LOW_LATENCY;
    } else {
        info.flags &= !ASYNC_LOW_LATENCY;
    }
    // SAFETY: `info` is a valid `serial_struct` read back from the same fd.
    if unsafe { libc::ioctl(fd, TIOCSSERIAL, &info as *const SerialInfo) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(was_set)
}
