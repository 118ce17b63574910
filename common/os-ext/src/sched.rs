use std::{io, mem::{size_of, zeroed}};

/// Call sched_getaffinity(2) for the calling thread.
///
/// Instead of the CPU mask, returns the number of CPUs in the mask.
/// This is the number of CPUs the calling thread may be scheduled on,
/// which can be smaller than the number of CPUs online,
/// for example when running under taskset(1) or in a container.
pub fn sched_getaffinity_count() -> io::Result<usize>
{
    // SAFETY: cpu_set_t is a plain bit mask.
    let mut set: libc::cpu_set_t = unsafe { zeroed() };

    // SAFETY: The size matches the mask we pass.
    let result = unsafe {
        libc::sched_getaffinity(0, size_of::<libc::cpu_set_t>(), &mut set)
    };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: The mask was filled in by sched_getaffinity(2).
    let count = unsafe { libc::CPU_COUNT(&set) };

    Ok(count as usize)
}
